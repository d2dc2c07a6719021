//! fxreshape CLI: fetch, reshape and inspect forex minute data.
//!
//! Commands:
//! - `sync`: fetch missing daily archives, then reshape the new ones
//! - `fetch`: only fetch missing archives
//! - `reshape`: fan archives out into per-instrument files
//! - `load`: load one instrument and summarize the series
//! - `overlay`: compute a Supertrend overlay and print its tail
//! - `status`: list per-instrument files and their sizes
//! - `pip`: print an instrument's pip factor

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use fxreshape_core::data::{
    archive_date, fetch_missing, list_archives, sync, FetchSummary, ForexiteSource, OverlayCache,
    ReshapeSummary, Reshaper, SeriesCache, StdoutProgress, SyncSummary,
};
use fxreshape_core::domain::pip_factor;
use fxreshape_core::PipelineConfig;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "fxreshape",
    about = "fxreshape: daily forex archives to per-instrument minute series"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Path to a TOML config file. Flags below override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Archive directory. Defaults to ./forexite.
    #[arg(long, global = true)]
    archive_dir: Option<PathBuf>,

    /// Per-instrument file directory. Defaults to ./csv.
    #[arg(long, global = true)]
    csv_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch missing archives, then reshape the newly fetched ones.
    ///
    /// When nothing new was fetched, every local archive is reshaped.
    Sync {
        #[command(flatten)]
        fetch: FetchArgs,

        /// Print run summaries as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Download archives missing from the look-back window.
    Fetch {
        #[command(flatten)]
        fetch: FetchArgs,

        /// Print the run summary as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Reshape archives into per-instrument files.
    Reshape {
        /// Archives to process. Defaults to every archive in the archive directory.
        archives: Vec<PathBuf>,

        /// Print the run summary as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Load an instrument and print a summary of the series.
    Load {
        /// Instrument code (e.g., EURUSD).
        instrument: String,

        /// Aggregate into buckets of this many minutes.
        #[arg(long)]
        resample: Option<u32>,
    },
    /// Compute a Supertrend overlay and print its last rows.
    Overlay {
        /// Instrument code (e.g., EURUSD).
        instrument: String,

        /// ATR band multiplier.
        #[arg(long)]
        multiplier: f64,

        /// ATR look-back in bars.
        #[arg(long)]
        length: usize,

        /// Aggregate into buckets of this many minutes.
        #[arg(long)]
        resample: Option<u32>,

        /// Number of rows to print.
        #[arg(long, default_value_t = 10)]
        tail: usize,
    },
    /// Show archive coverage and list per-instrument files with their sizes.
    Status,
    /// Print the pip factor of an instrument.
    Pip {
        /// Instrument code (e.g., USDJPY).
        instrument: String,
    },
}

#[derive(Args)]
struct FetchArgs {
    /// Look-back window in calendar days. Defaults to 2555.
    #[arg(long)]
    window_days: Option<u32>,

    /// Reference date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    today: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.global)?;
    debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Sync { fetch, json } => {
            let summary = run_sync(&config, &fetch)?;
            if json {
                print_json(&summary)?;
            }
            Ok(())
        }
        Commands::Fetch { fetch, json } => {
            let summary = run_fetch(&config, &fetch)?;
            if json {
                print_json(&summary)?;
            }
            Ok(())
        }
        Commands::Reshape { archives, json } => {
            let summary = run_reshape(&config, &archives)?;
            if json {
                print_json(&summary)?;
            }
            Ok(())
        }
        Commands::Load {
            instrument,
            resample,
        } => run_load(&config, &instrument, resample.or(config.resample_minutes)),
        Commands::Overlay {
            instrument,
            multiplier,
            length,
            resample,
            tail,
        } => run_overlay(
            &config,
            &instrument,
            multiplier,
            length,
            resample.or(config.resample_minutes),
            tail,
        ),
        Commands::Status => run_status(&config),
        Commands::Pip { instrument } => {
            println!("{instrument}: {}", pip_factor(&instrument));
            Ok(())
        }
    }
}

fn load_config(args: &GlobalArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = &args.archive_dir {
        config.archive_dir = dir.clone();
    }
    if let Some(dir) = &args.csv_dir {
        config.csv_dir = dir.clone();
    }
    Ok(config)
}

/// Reference date and window length for a fetch, from flags or config.
fn fetch_window(config: &PipelineConfig, args: &FetchArgs) -> Result<(NaiveDate, u32)> {
    let today = args
        .today
        .as_deref()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("--today must be YYYY-MM-DD")?
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    Ok((today, args.window_days.unwrap_or(config.window_days)))
}

fn run_fetch(config: &PipelineConfig, args: &FetchArgs) -> Result<FetchSummary> {
    let (today, window_days) = fetch_window(config, args)?;
    let source = ForexiteSource::from_config(config)?;
    let summary = fetch_missing(&source, &config.archive_dir, today, window_days, &StdoutProgress)
        .context("fetching archives")?;
    Ok(summary)
}

fn run_sync(config: &PipelineConfig, args: &FetchArgs) -> Result<SyncSummary> {
    let (today, window_days) = fetch_window(config, args)?;
    let source = ForexiteSource::from_config(config)?;
    let reshaper = Reshaper::from_config(config);
    let summary = sync(&source, &reshaper, today, window_days, &StdoutProgress)
        .context("syncing archives")?;
    Ok(summary)
}

fn run_reshape(config: &PipelineConfig, archives: &[PathBuf]) -> Result<ReshapeSummary> {
    let reshaper = Reshaper::from_config(config);
    let summary = reshaper
        .reshape(archives, &StdoutProgress)
        .context("reshaping archives")?;
    Ok(summary)
}

fn run_load(config: &PipelineConfig, instrument: &str, resample: Option<u32>) -> Result<()> {
    let mut cache = SeriesCache::from_config(config);
    let Some(series) = cache
        .load(instrument, resample)
        .with_context(|| format!("loading {instrument}"))?
    else {
        bail!("no data for {instrument} in {}", config.csv_dir.display());
    };

    println!();
    println!("=== {} ===", series.instrument());
    match series.resample() {
        Some(m) if m > 0 => println!("Resample:       {m} min"),
        _ => println!("Resample:       none"),
    }
    println!("Bars:           {}", series.len());
    if let (Some(first), Some(last)) = (series.first(), series.last()) {
        println!("Period:         {} to {}", first.timestamp, last.timestamp);
        println!();
        println!(
            "{:<20} {:>12} {:>12} {:>12} {:>12}",
            "Timestamp", "Open", "High", "Low", "Close"
        );
        println!("{}", "-".repeat(72));
        for bar in [first, last] {
            println!(
                "{:<20} {:>12} {:>12} {:>12} {:>12}",
                bar.timestamp.to_string(),
                bar.open,
                bar.high,
                bar.low,
                bar.close
            );
        }
    }
    println!();
    Ok(())
}

fn run_overlay(
    config: &PipelineConfig,
    instrument: &str,
    multiplier: f64,
    length: usize,
    resample: Option<u32>,
    tail: usize,
) -> Result<()> {
    let mut cache = OverlayCache::new(SeriesCache::from_config(config));
    let Some(overlay) = cache
        .get_overlay(instrument, multiplier, length, resample)
        .with_context(|| format!("computing overlay for {instrument}"))?
    else {
        bail!("no data for {instrument} in {}", config.csv_dir.display());
    };

    println!();
    println!(
        "=== {} {} (multiplier {multiplier}, length {length}) ===",
        overlay.instrument(),
        overlay.indicator()
    );
    println!(
        "{:<20} {:>12} {:>12} {:>12} {:>12} {:>12} {:>4}",
        "Timestamp", "Open", "High", "Low", "Close", "Overlay", "Dir"
    );
    println!("{}", "-".repeat(90));
    for row in overlay.tail(tail) {
        println!(
            "{:<20} {:>12} {:>12} {:>12} {:>12} {:>12.5} {:>4}",
            row.timestamp.to_string(),
            row.open,
            row.high,
            row.low,
            row.close,
            row.overlay,
            row.direction
        );
    }
    println!();
    Ok(())
}

fn run_status(config: &PipelineConfig) -> Result<()> {
    let archives = list_archives(&config.archive_dir)?;
    let dates: Vec<NaiveDate> = archives.iter().filter_map(|p| archive_date(p)).collect();
    match (dates.first(), dates.last()) {
        (Some(first), Some(last)) => println!(
            "Archives: {} in {} ({first} to {last})",
            archives.len(),
            config.archive_dir.display()
        ),
        _ => println!("Archives: none in {}", config.archive_dir.display()),
    }

    let csv_dir = config.csv_dir.as_path();
    if !csv_dir.exists() {
        println!("CSV directory does not exist: {}", csv_dir.display());
        return Ok(());
    }

    let mut rows: Vec<(String, u64)> = Vec::new();
    for entry in std::fs::read_dir(csv_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        let Some(instrument) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let size = std::fs::metadata(&path)?.len();
        rows.push((instrument.to_string(), size));
    }

    if rows.is_empty() {
        println!("No instrument files in {}", csv_dir.display());
        return Ok(());
    }

    rows.sort_by(|a, b| a.0.cmp(&b.0));
    let total_size: u64 = rows.iter().map(|(_, s)| s).sum();

    println!("Directory: {}", csv_dir.display());
    println!("Instruments: {}", rows.len());
    println!("Total size: {}", format_size(total_size));
    println!();
    println!("{:<10} {:>6} {:>10}", "Instrument", "Pip", "Size");
    println!("{}", "-".repeat(28));
    for (instrument, size) in &rows {
        println!(
            "{:<10} {:>6} {:>10}",
            instrument,
            pip_factor(instrument),
            format_size(*size)
        );
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
