//! Douki command line.
//!
//! Two steps: `generate-sync-data` stores fingerprinted sections of a release
//! whose subtitle is already timed, `generate-subtitles` finds those sections
//! in another release and writes a subtitle timed against it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use douki_core::config::{ConfigManager, Settings, DEFAULT_CONFIG_FILE};
use douki_core::fingerprint::FfmpegFingerprintSource;
use douki_core::logging::{init_tracing, init_tracing_with_file, LogLevel};
use douki_core::media::FfmpegBackend;
use douki_core::pipeline::{
    generate_sync_data, synchronize, GenerateRequest, SubtitleOutcome, SyncOutcome, SyncRequest,
};
use douki_core::subtitles::RandomStyleIds;
use douki_core::timestamp::parse_timestamp;

#[derive(Parser, Debug)]
#[command(name = "douki", version, about = "Synchronize subtitles to new releases using audio fingerprints")]
struct Cli {
    /// Config file, created with defaults when missing
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a fingerprinted section of a release with a timed subtitle
    GenerateSyncData {
        /// Release the section is cut from
        source: PathBuf,

        /// Section id (default: next free number)
        #[arg(short, long)]
        name: Option<String>,

        /// Sync data directory (default: paths.data_dir)
        #[arg(short = 'd', long)]
        data_dir: Option<PathBuf>,

        /// Section start, e.g. 1:30 or 0:01:30.50
        #[arg(short, long, value_parser = parse_timestamp)]
        start: Option<f64>,

        /// Section end (default: end of the source)
        #[arg(short = 't', long, value_parser = parse_timestamp)]
        end: Option<f64>,

        /// Subtitle timed against the source (default: its own subtitle stream)
        #[arg(long)]
        subtitle: Option<PathBuf>,

        /// Subtitle stored when the section has too little dialogue
        #[arg(long)]
        template: Option<PathBuf>,

        /// Don't write the Aegisub keyframes file
        #[arg(long)]
        skip_keyframes: bool,
    },

    /// Write a subtitle for a release from the stored sections found in it
    GenerateSubtitles {
        /// Release to synchronize against
        source: PathBuf,

        /// Sync data directory (default: paths.data_dir)
        #[arg(short = 's', long)]
        source_dir: Option<PathBuf>,

        /// Output .ass file or directory (default: paths.output_dir)
        #[arg(short = 't', long)]
        target: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ConfigManager::new(&cli.config);
    config
        .load_or_create()
        .with_context(|| format!("Failed to load config '{}'", cli.config.display()))?;
    let settings = config.settings().clone();

    let level = cli.log_level.unwrap_or(settings.logging.level);
    let _guard = if settings.logging.log_to_file {
        let guard = init_tracing_with_file(level, &config.logs_dir())
            .with_context(|| format!("Failed to open log dir '{}'", config.logs_dir().display()))?;
        Some(guard)
    } else {
        init_tracing(level);
        None
    };

    match cli.command {
        Command::GenerateSyncData {
            source,
            name,
            data_dir,
            start,
            end,
            subtitle,
            template,
            skip_keyframes,
        } => {
            let request = GenerateRequest {
                source,
                subtitle,
                template,
                name,
                data_dir: data_dir.unwrap_or_else(|| PathBuf::from(&settings.paths.data_dir)),
                start,
                end,
                skip_keyframes,
            };
            run_generate(&request, &settings)
        }
        Command::GenerateSubtitles {
            source,
            source_dir,
            target,
        } => {
            let request = SyncRequest {
                source,
                sync_dir: source_dir.unwrap_or_else(|| PathBuf::from(&settings.paths.data_dir)),
                target: target.unwrap_or_else(|| PathBuf::from(&settings.paths.output_dir)),
            };
            run_synchronize(&request, &settings)
        }
    }
}

fn run_generate(request: &GenerateRequest, settings: &Settings) -> Result<()> {
    let backend = FfmpegBackend::from(&settings.extraction);
    let fingerprinter = FfmpegFingerprintSource::from(&settings.extraction);

    let outcome = generate_sync_data(request, &backend, &fingerprinter, settings)
        .with_context(|| format!("Failed to generate sync data from '{}'", request.source.display()))?;

    println!(
        "Section {}: {:.3}s to {:.3}s, {} fingerprints{}",
        outcome.id,
        outcome.plan.start,
        outcome.end,
        outcome.fingerprint_count,
        if outcome.plan.needs_reencode { " (re-encoded)" } else { "" }
    );
    match outcome.subtitle {
        SubtitleOutcome::Stored { entries } => println!("Subtitle stored with {} events", entries),
        SubtitleOutcome::Template => println!("Subtitle replaced by template"),
        SubtitleOutcome::Missing => println!("No usable subtitle; section will not be synchronized"),
    }
    for attachment in &outcome.attachments {
        println!("Attachment: {}", attachment.display());
    }
    Ok(())
}

fn run_synchronize(request: &SyncRequest, settings: &Settings) -> Result<()> {
    let fingerprinter = FfmpegFingerprintSource::from(&settings.extraction);

    let outcome = synchronize(request, &fingerprinter, settings, &mut RandomStyleIds)
        .with_context(|| format!("Failed to synchronize '{}'", request.source.display()))?;

    match outcome {
        SyncOutcome::NoMatch => println!("No matches found"),
        SyncOutcome::Synced {
            subtitle,
            attachments,
            matches,
        } => {
            for m in &matches {
                println!(
                    "{}: {:.3}s to {:.3}s, delay {:.3}s ({} matches)",
                    m.id, m.result.from, m.result.to, m.result.delay, m.result.match_count
                );
            }
            println!("{}", subtitle.display());
            for attachment in &attachments {
                println!("Attachment: {}", attachment.display());
            }
        }
    }
    Ok(())
}
