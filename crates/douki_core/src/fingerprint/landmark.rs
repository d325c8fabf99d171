//! Streaming landmark fingerprinter.
//!
//! Audio is cut into Hann-windowed frames. Each frame contributes up to
//! [`MAX_PEAKS_PER_FRAME`] spectral peaks that rise above a slowly decaying
//! masking threshold. Once a peak is old enough that later frames can no
//! longer mask it, it is paired with earlier peaks close in time and
//! frequency and every pair becomes one hash.

use std::collections::VecDeque;
use std::f64::consts::PI;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use super::types::Fingerprint;

/// Sample rate the fingerprinter is tuned for.
pub const DEFAULT_SAMPLE_RATE: u32 = 22050;

/// FFT window length in samples.
pub const NFFT: usize = 512;

/// Samples between consecutive frames.
pub const HOP_SIZE: usize = NFFT / 2;

const HALF_BINS: usize = NFFT / 2;
const MAX_PEAKS_PER_FRAME: usize = 5;
const MAX_PAIRS_PER_PEAK: usize = 3;
const PAIR_WINDOW_FRAMES: usize = 96;
const PAIR_WINDOW_BINS: usize = 60;
/// Frames a peak stays prunable before it is hashed.
const PRUNING_FRAMES: usize = 24;
const MASK_HALF_WIDTH: usize = 3;
const MASK_CURVATURE: f64 = 0.3;
const INITIAL_THRESHOLD: f64 = -3.0;
const MIN_MAGNITUDE: f64 = 1e-6;
const LOWEST_FREQUENCY_HZ: f64 = 100.0;
const HIGHEST_FREQUENCY_HZ: f64 = 2000.0;

/// Per-frame threshold decay (log domain).
fn mask_decay_log() -> f64 {
    0.995f64.ln()
}

#[derive(Debug, Clone, Copy)]
struct Peak {
    bin: usize,
    magnitude: f64,
}

#[derive(Debug)]
struct Mark {
    frame: u32,
    peaks: Vec<Peak>,
}

/// Incremental fingerprinter over mono signed 16-bit little-endian PCM.
pub struct LandmarkFingerprinter {
    sample_rate: u32,
    fft: Arc<dyn Fft<f64>>,
    window: Vec<f64>,
    mask: Vec<f64>,
    threshold: Vec<f64>,
    min_bin: usize,
    max_bin: usize,
    samples: VecDeque<f64>,
    leftover: Option<u8>,
    marks: VecDeque<Mark>,
    frame: u32,
}

impl LandmarkFingerprinter {
    pub fn new() -> Self {
        Self::with_sample_rate(DEFAULT_SAMPLE_RATE)
    }

    pub fn with_sample_rate(sample_rate: u32) -> Self {
        let fft = FftPlanner::new().plan_fft_forward(NFFT);
        let window = (0..NFFT)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / (NFFT - 1) as f64).cos()))
            .collect();
        let mask = (0..=2 * MASK_HALF_WIDTH)
            .map(|i| {
                let distance = i as f64 - MASK_HALF_WIDTH as f64;
                -MASK_CURVATURE * distance * distance
            })
            .collect();

        let bin_hz = sample_rate as f64 / NFFT as f64;
        let min_bin = (LOWEST_FREQUENCY_HZ / bin_hz).floor() as usize;
        let max_bin = ((HIGHEST_FREQUENCY_HZ / bin_hz).floor() as usize).min(HALF_BINS);

        Self {
            sample_rate,
            fft,
            window,
            mask,
            threshold: vec![INITIAL_THRESHOLD; HALF_BINS],
            min_bin,
            max_bin,
            samples: VecDeque::with_capacity(NFFT * 2),
            leftover: None,
            marks: VecDeque::with_capacity(PAIR_WINDOW_FRAMES + PRUNING_FRAMES + 2),
            frame: 0,
        }
    }

    /// Seconds per fingerprint offset unit.
    pub fn timing_factor(&self) -> f64 {
        HOP_SIZE as f64 / self.sample_rate as f64
    }

    /// Feed raw `s16le` bytes. Chunks may split samples.
    pub fn process_bytes(&mut self, bytes: &[u8]) -> Vec<Fingerprint> {
        let mut data = bytes;
        let mut decoded = Vec::with_capacity(bytes.len() / 2 + 1);

        if let Some(low) = self.leftover.take() {
            match data.split_first() {
                Some((&high, rest)) => {
                    decoded.push(i16::from_le_bytes([low, high]));
                    data = rest;
                }
                None => {
                    self.leftover = Some(low);
                    return Vec::new();
                }
            }
        }

        let mut pairs = data.chunks_exact(2);
        decoded.extend(pairs.by_ref().map(|p| i16::from_le_bytes([p[0], p[1]])));
        self.leftover = pairs.remainder().first().copied();

        self.process_samples(&decoded)
    }

    /// Feed decoded samples.
    pub fn process_samples(&mut self, samples: &[i16]) -> Vec<Fingerprint> {
        let mut out = Vec::new();
        for &sample in samples {
            self.samples.push_back(f64::from(sample) / 32768.0);
            if self.samples.len() == NFFT {
                self.process_frame(&mut out);
                self.samples.drain(..HOP_SIZE);
            }
        }
        out
    }

    fn process_frame(&mut self, out: &mut Vec<Fingerprint>) {
        let mut buffer: Vec<Complex<f64>> = self
            .samples
            .iter()
            .zip(&self.window)
            .map(|(&s, &w)| Complex::new(s * w, 0.0))
            .collect();
        self.fft.process(&mut buffer);

        // Damp low bins and boost high ones so peaks spread across the band.
        let spectrum: Vec<f64> = buffer[..HALF_BINS]
            .iter()
            .enumerate()
            .map(|(i, c)| c.norm() * 2.0 / NFFT as f64 * ((i + 16) as f64).sqrt())
            .collect();

        let peaks = self.find_peaks(&spectrum);
        self.raise_threshold(&peaks);
        self.marks.push_back(Mark {
            frame: self.frame,
            peaks,
        });
        self.prune_recent_marks();

        if self.marks.len() > PRUNING_FRAMES {
            self.emit_pairs(out);
        }

        let decay = mask_decay_log();
        for t in &mut self.threshold {
            *t += decay;
        }
        while self.marks.len() > PAIR_WINDOW_FRAMES + PRUNING_FRAMES + 1 {
            self.marks.pop_front();
        }
        self.frame += 1;
    }

    /// Strongest local maxima of the spectrum above the threshold.
    fn find_peaks(&self, spectrum: &[f64]) -> Vec<Peak> {
        let excess: Vec<f64> = spectrum
            .iter()
            .zip(&self.threshold)
            .map(|(&v, &t)| (v.max(MIN_MAGNITUDE).ln() - t).max(0.0))
            .collect();

        let mut peaks: Vec<Peak> = (self.min_bin + 1..self.max_bin.saturating_sub(1))
            .filter(|&i| excess[i] > excess[i - 1] && excess[i] > excess[i + 1])
            .map(|bin| Peak {
                bin,
                magnitude: spectrum[bin],
            })
            .collect();
        peaks.sort_by(|a, b| b.magnitude.total_cmp(&a.magnitude));
        peaks.truncate(MAX_PEAKS_PER_FRAME);
        peaks
    }

    fn raise_threshold(&mut self, peaks: &[Peak]) {
        for peak in peaks {
            let level = peak.magnitude.ln();
            let lo = peak.bin.saturating_sub(MASK_HALF_WIDTH);
            let hi = (peak.bin + MASK_HALF_WIDTH).min(self.max_bin);
            for bin in lo..hi {
                let mask = self.mask[bin + MASK_HALF_WIDTH - peak.bin];
                self.threshold[bin] = self.threshold[bin].max(level + mask);
            }
        }
    }

    /// Drop recent peaks that the current threshold masks.
    fn prune_recent_marks(&mut self) {
        let decay = mask_decay_log();
        let threshold = &self.threshold;
        for (age, mark) in self.marks.iter_mut().rev().take(PRUNING_FRAMES).enumerate() {
            mark.peaks
                .retain(|p| p.magnitude.ln() >= threshold[p.bin] + decay * age as f64);
        }
    }

    /// Hash the mark that just left the pruning window against earlier ones.
    fn emit_pairs(&self, out: &mut Vec<Fingerprint>) {
        let anchor_index = self.marks.len() - 1 - PRUNING_FRAMES;
        let anchor = &self.marks[anchor_index];
        let earliest = anchor_index.saturating_sub(PAIR_WINDOW_FRAMES);

        for peak in &anchor.peaks {
            let mut pairs = 0;
            'search: for index in (earliest..=anchor_index).rev() {
                let other = &self.marks[index];
                let dt = (anchor.frame - other.frame) as usize;
                for earlier in &other.peaks {
                    if earlier.bin == peak.bin || earlier.bin.abs_diff(peak.bin) >= PAIR_WINDOW_BINS {
                        continue;
                    }
                    let hash = earlier.bin + HALF_BINS * (peak.bin + HALF_BINS * dt);
                    out.push(Fingerprint::new(anchor.frame, hash as u32));
                    pairs += 1;
                    if pairs >= MAX_PAIRS_PER_PEAK {
                        break 'search;
                    }
                }
            }
        }
    }
}

impl Default for LandmarkFingerprinter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tones(seconds: f64) -> Vec<i16> {
        let rate = DEFAULT_SAMPLE_RATE as f64;
        let bin_hz = rate / NFFT as f64;
        (0..(seconds * rate) as usize)
            .map(|n| {
                let t = n as f64 / rate;
                let a = (2.0 * PI * 10.0 * bin_hz * t).sin();
                let b = (2.0 * PI * 20.0 * bin_hz * t).sin();
                (8000.0 * (a + b)) as i16
            })
            .collect()
    }

    fn to_bytes(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn timing_factor_matches_hop() {
        let fp = LandmarkFingerprinter::new();
        assert!((fp.timing_factor() - 256.0 / 22050.0).abs() < 1e-12);
    }

    #[test]
    fn silence_has_no_landmarks() {
        let mut fp = LandmarkFingerprinter::new();
        assert!(fp.process_samples(&vec![0; 22050 * 2]).is_empty());
    }

    #[test]
    fn tones_produce_ordered_landmarks() {
        let mut fp = LandmarkFingerprinter::new();
        let prints = fp.process_samples(&two_tones(2.0));
        assert!(!prints.is_empty());
        assert!(prints.windows(2).all(|w| w[0].offset <= w[1].offset));
    }

    #[test]
    fn chunking_does_not_change_output() {
        let bytes = to_bytes(&two_tones(1.5));

        let mut whole = LandmarkFingerprinter::new();
        let expected = whole.process_bytes(&bytes);

        let mut streamed = LandmarkFingerprinter::new();
        let mut actual = Vec::new();
        for chunk in bytes.chunks(333) {
            actual.extend(streamed.process_bytes(chunk));
        }

        assert_eq!(actual, expected);
    }
}
