use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::{Parser, Subcommand};
use data_sonifier_core::{
    EngineConfig, Narrator, Sample, SonificationService, SonifyError, TimerDevice, ValueRange,
};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

fn main() -> data_sonifier_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match cli.config.as_deref() {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Play { input, min, max } => run_play(config, &input, min, max),
        Commands::Note { name, duration } => run_note(config, &name, duration),
        Commands::Buckets => run_buckets(config),
        Commands::Speak { text } => run_speak(config, text),
    }
}

fn build_service(config: EngineConfig) -> data_sonifier_core::Result<SonificationService> {
    SonificationService::new(config, Arc::new(TimerDevice::new()), Arc::new(LogNarrator))
}

fn run_play(
    config: EngineConfig,
    input: &Path,
    min: Option<f64>,
    max: Option<f64>,
) -> data_sonifier_core::Result<()> {
    tracing::info!(?input, "playing series");

    let range = match (min, max) {
        (Some(min), Some(max)) => Some(ValueRange::new(min, max)?),
        (None, None) => None,
        _ => {
            return Err(SonifyError::invalid(
                "--min and --max must be given together",
            ))
        }
    };

    let series = read_series(input)?;
    let service = build_service(config)?;
    service.play_series(&series, range)?;
    wait_for_playback(&service)
}

fn run_note(config: EngineConfig, name: &str, duration: u64) -> data_sonifier_core::Result<()> {
    let service = build_service(config)?;
    service.play_note(name, duration)?;
    wait_for_playback(&service)
}

fn run_buckets(config: EngineConfig) -> data_sonifier_core::Result<()> {
    let service = build_service(config)?;
    for (index, frequency) in service.buckets()?.iter().enumerate() {
        println!("{index:>3}  {frequency:>10.3} Hz");
    }
    Ok(())
}

fn run_speak(config: EngineConfig, text: String) -> data_sonifier_core::Result<()> {
    let service = build_service(config)?;
    service.speak(text)?.wait()
}

fn wait_for_playback(service: &SonificationService) -> data_sonifier_core::Result<()> {
    let scheduler = service.scheduler();
    while !scheduler.wait_until_idle(Duration::from_millis(250))? {}
    match scheduler.take_failure()? {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Accepts `[[t, v], ...]` as well as `[{"timestamp": t, "value": v}, ...]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SeriesPoint {
    Pair(i64, f64),
    Sample(Sample),
}

fn read_series(path: &Path) -> data_sonifier_core::Result<Vec<Sample>> {
    let raw = std::fs::read_to_string(path)?;
    let points: Vec<SeriesPoint> = serde_json::from_str(&raw)?;
    Ok(points
        .into_iter()
        .map(|point| match point {
            SeriesPoint::Pair(timestamp, value) => Sample::new(timestamp, value),
            SeriesPoint::Sample(sample) => sample,
        })
        .collect())
}

/// Narrator without a speech backend: the text goes to the log.
struct LogNarrator;

impl Narrator for LogNarrator {
    fn speak(&self, text: &str) -> Result<(), String> {
        tracing::info!(text, "narration");
        Ok(())
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Listen to numeric time series", long_about = None)]
struct Cli {
    /// JSON engine configuration; defaults apply to missing fields.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sonify a JSON series and wait until it has played.
    Play {
        /// JSON array of `[timestamp, value]` pairs or sample objects.
        input: PathBuf,
        /// Lower bound of the value range, instead of the observed minimum.
        #[arg(long, requires = "max", allow_negative_numbers = true)]
        min: Option<f64>,
        /// Upper bound of the value range, instead of the observed maximum.
        #[arg(long, requires = "min", allow_negative_numbers = true)]
        max: Option<f64>,
    },
    /// Play a single named note such as `C` or `F#`.
    Note {
        name: String,
        /// Duration in milliseconds.
        #[arg(short, long, default_value_t = 200)]
        duration: u64,
    },
    /// Print the harmonic bucket frequencies of the configured scale.
    Buckets,
    /// Narrate a line of text.
    Speak { text: String },
}
