//! Command-line interface for the Voltcraft log parser.
//!
//! Decodes every log file in a directory, merges the samples and writes the
//! parameter history and consumption statistics.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::{error, info, warn, LevelFilter};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use voltcraft_parser::{
    stats, DecoderConfig, ErrorPolicy, HistoryWriter, OutputFormat, PowerLogReader, PowerSample,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Csv,
    Json,
    Parquet,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Text => OutputFormat::Text,
            Format::Csv => OutputFormat::Csv,
            Format::Json => OutputFormat::Json,
            Format::Parquet => OutputFormat::Parquet,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Decode Voltcraft Energy Logger 4000 files",
    long_about = "Decodes every Voltcraft Energy Logger 4000 data file in a directory, merges the \
                  samples chronologically and writes the parameter history and statistics."
)]
struct Args {
    /// Directory containing Voltcraft data files
    #[arg(value_name = "IN_DIR", default_value = ".")]
    in_dir: PathBuf,

    /// Output directory for history and statistics
    #[arg(short, long, value_name = "OUT_ROOT", default_value = ".")]
    out_root: PathBuf,

    /// History output format (repeatable)
    #[arg(short, long = "format", value_enum, default_values_t = [Format::Text, Format::Csv])]
    formats: Vec<Format>,

    /// Number of rows per Parquet file chunk
    #[arg(long, default_value = "50000")]
    chunk_size: usize,

    /// Skip to the next start marker instead of rejecting a damaged file
    #[arg(long)]
    resync: bool,

    /// Lowest plausible mains voltage
    #[arg(long, default_value = "150.0")]
    min_voltage: f64,

    /// Highest plausible mains voltage
    #[arg(long, default_value = "250.0")]
    max_voltage: f64,

    /// Log decoder details
    #[arg(short, long)]
    verbose: bool,
}

fn decode_one_file(path: &Path, config: &DecoderConfig) -> Result<Vec<PowerSample>> {
    let start_time = Instant::now();
    let log = PowerLogReader::from_file(path)?
        .with_config(config.clone())
        .read_all()?;

    for (i, block) in log.blocks.iter().enumerate() {
        info!(
            "   ├─ Block {}: {} start, {} samples, {}",
            i,
            block.start_time,
            block.samples.len(),
            block.status
        );
        if block.warning_count > 0 {
            warn!("   ├─ {} implausible sample(s)", block.warning_count);
        }
    }
    if log.skipped_bytes > 0 {
        warn!("   ├─ Skipped {} unreadable bytes", log.skipped_bytes);
    }
    if let Some(e) = &log.stopped_by {
        warn!("   ├─ Ignored the rest of the file: {}", e);
    }
    info!("   └─ ✓ Decoded in {:.2?}", start_time.elapsed());

    Ok(log.into_samples())
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(if args.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .format_timestamp(None)
        .init();

    if !args.in_dir.is_dir() {
        anyhow::bail!("'{}' is not a valid directory", args.in_dir.display());
    }
    if args.min_voltage > args.max_voltage {
        anyhow::bail!("--min-voltage must not exceed --max-voltage");
    }

    let config = DecoderConfig::builder()
        .error_policy(if args.resync {
            ErrorPolicy::Resynchronize
        } else {
            ErrorPolicy::Abort
        })
        .voltage_range(args.min_voltage..=args.max_voltage)
        .build();

    // The device names its files A0000001, A0000002, ... without an extension.
    let mut files: Vec<PathBuf> = fs::read_dir(&args.in_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    if files.is_empty() {
        info!("No files found in {}", args.in_dir.display());
        return Ok(());
    }

    info!("📂 Reading {} file(s) from {}", files.len(), args.in_dir.display());
    info!("📁 Output directory: {}", args.out_root.display());

    let total_start = Instant::now();
    let mut samples = Vec::new();
    let mut decoded_files = 0;

    for (idx, path) in files.iter().enumerate() {
        info!("[{}/{}] {}", idx + 1, files.len(), path.display());
        match decode_one_file(path, &config) {
            Ok(mut file_samples) => {
                samples.append(&mut file_samples);
                decoded_files += 1;
            }
            Err(e) => error!("   └─ ✗ {}", e),
        }
    }

    if samples.is_empty() {
        warn!("No valid Voltcraft data files found.");
        return Ok(());
    }

    stats::prepare(&mut samples);
    info!("Merged {} unique samples", samples.len());

    let formats: Vec<OutputFormat> = args.formats.iter().copied().map(Into::into).collect();
    let writer = HistoryWriter::new(&args.out_root)
        .formats(&formats)
        .chunk_size(args.chunk_size);

    let write_stats = writer.write(&samples)?;
    info!("{}", write_stats.summary());
    if let Some(path) = writer.write_statistics(&samples)? {
        info!("Statistics written to {}", path.display());
    }

    info!(
        "🏁 Processed {} file(s) in {:.2?}",
        decoded_files,
        total_start.elapsed()
    );

    Ok(())
}
