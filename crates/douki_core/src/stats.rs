//! Order statistics used by the delay estimator.

/// Default IQR multiplier used to build the acceptance fence.
pub const DEFAULT_IQR_MULTIPLIER: f64 = 1.5;

/// Drop samples outside an interquartile fence.
///
/// Samples are sorted, `q1` is taken at rank `floor(n * factor)` and `q3` at
/// rank `ceil(n * (1 - factor))`, and everything inside
/// `[q1 - multiplier * iqr, q3 + multiplier * iqr]` is kept. The quartiles are
/// picked by rank without interpolation, which makes the fence generous for
/// small inputs. The result is returned sorted ascending.
pub fn filter_outliers(samples: &[f64], factor: f64, multiplier: f64) -> Vec<f64> {
    let mut values: Vec<f64> = samples.iter().copied().filter(|v| !v.is_nan()).collect();
    if values.is_empty() {
        return values;
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let n = values.len();
    let last = n - 1;
    let q1_rank = ((n as f64 * factor).floor() as usize).min(last);
    let q3_rank = ((n as f64 * (1.0 - factor)).ceil() as usize).min(last);

    let q1 = values[q1_rank];
    let q3 = values[q3_rank];
    let iqr = q3 - q1;

    let min_value = q1 - iqr * multiplier;
    let max_value = q3 + iqr * multiplier;

    values.retain(|&x| x >= min_value && x <= max_value);
    values
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Standard deviation over the whole population (divides by `n`).
///
/// Returns `NaN` for an empty slice.
pub fn standard_deviation(samples: &[f64]) -> f64 {
    let Some(avg) = mean(samples) else {
        return f64::NAN;
    };

    let variance = samples
        .iter()
        .map(|x| (x - avg).powi(2))
        .sum::<f64>()
        / samples.len() as f64;

    variance.sqrt()
}
