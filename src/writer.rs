//! High-level API for writing decoded samples and statistics to disk.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::formats::{csv, json, parquet::ParquetFormatter, text};
use crate::models::{OutputFormat, PowerSample};
use crate::stats::Statistics;

pub const HISTORY_FILE_STEM: &str = "voltcraft_history";
pub const STATS_FILE: &str = "voltcraft_stats.txt";

/// Writer for sample history in one or more output formats.
///
/// # Examples
///
/// ```no_run
/// use voltcraft_parser::{HistoryWriter, OutputFormat, PowerLogReader};
///
/// let samples = PowerLogReader::from_file("A0000001")?.read_all()?.into_samples();
///
/// let stats = HistoryWriter::new("./output")
///     .formats(&[OutputFormat::Csv, OutputFormat::Parquet])
///     .write(&samples)?;
/// println!("{}", stats.summary());
/// # Ok::<(), voltcraft_parser::Error>(())
/// ```
pub struct HistoryWriter {
    output_directory: PathBuf,
    formats: Vec<OutputFormat>,
    chunk_size: usize,
}

impl HistoryWriter {
    /// Create a writer for the given directory. Defaults to text and CSV output.
    pub fn new<P: AsRef<Path>>(output_directory: P) -> Self {
        Self {
            output_directory: output_directory.as_ref().to_path_buf(),
            formats: vec![OutputFormat::Text, OutputFormat::Csv],
            chunk_size: 50_000,
        }
    }

    pub fn formats(mut self, formats: &[OutputFormat]) -> Self {
        self.formats = formats.to_vec();
        self
    }

    /// Rows per Parquet file. Default is 50,000.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Write the samples in every configured format.
    ///
    /// # Errors
    ///
    /// Returns an error if the output directory cannot be created or any
    /// output file cannot be written.
    pub fn write(&self, samples: &[PowerSample]) -> Result<WriteStats> {
        fs::create_dir_all(&self.output_directory)?;

        let mut files = Vec::new();
        for format in &self.formats {
            let written = self
                .write_format(*format, samples)
                .map_err(|e| Error::OutputError(format!("{:?}: {}", format, e)))?;
            files.extend(written);
        }

        Ok(WriteStats {
            num_samples: samples.len(),
            files,
        })
    }

    fn write_format(
        &self,
        format: OutputFormat,
        samples: &[PowerSample],
    ) -> anyhow::Result<Vec<PathBuf>> {
        let path = self
            .output_directory
            .join(format!("{}.{}", HISTORY_FILE_STEM, format.extension()));
        let files = match format {
            OutputFormat::Parquet => {
                ParquetFormatter::new(&self.output_directory, self.chunk_size).convert(samples)?
            }
            OutputFormat::Text => {
                text::write_history(create(&path)?, samples)?;
                vec![path]
            }
            OutputFormat::Csv => {
                csv::write_history(create(&path)?, samples)?;
                vec![path]
            }
            OutputFormat::Json => {
                json::write_history(create(&path)?, samples)?;
                vec![path]
            }
        };
        Ok(files)
    }

    /// Write the statistics report for chronologically sorted samples.
    ///
    /// Returns `None` without touching the disk when there are no samples.
    pub fn write_statistics(&self, samples: &[PowerSample]) -> Result<Option<PathBuf>> {
        let stats = Statistics::new(samples);
        let Some(overall) = stats.overall() else {
            return Ok(None);
        };

        fs::create_dir_all(&self.output_directory)?;
        let path = self.output_directory.join(STATS_FILE);
        text::write_statistics(create(&path)?, &overall, &stats.daily(), &stats.blackouts())
            .map_err(|e| Error::OutputError(e.to_string()))?;
        Ok(Some(path))
    }
}

fn create(path: &Path) -> std::io::Result<BufWriter<File>> {
    Ok(BufWriter::new(File::create(path)?))
}

/// Statistics about a write operation.
#[derive(Debug, Clone)]
pub struct WriteStats {
    pub num_samples: usize,
    pub files: Vec<PathBuf>,
}

impl WriteStats {
    /// Get a human-readable summary of the write operation.
    pub fn summary(&self) -> String {
        format!(
            "Wrote {} samples across {} file(s)",
            self.num_samples,
            self.files.len()
        )
    }
}
