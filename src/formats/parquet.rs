use anyhow::Result;
use arrow::array::{ArrayRef, Float64Array, RecordBatch, TimestampSecondArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use log::info;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::fs::{create_dir_all, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::models::PowerSample;

pub struct ParquetFormatter {
    output_directory: PathBuf,
    chunk_size: usize,
}

impl ParquetFormatter {
    pub fn new<P: AsRef<Path>>(output_directory: P, chunk_size: usize) -> Self {
        Self {
            output_directory: output_directory.as_ref().to_path_buf(),
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn schema() -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new(
                "timestamp",
                DataType::Timestamp(TimeUnit::Second, None),
                false,
            ),
            Field::new("index", DataType::UInt64, false),
            Field::new("voltage", DataType::Float64, false),
            Field::new("current", DataType::Float64, false),
            Field::new("power_factor", DataType::Float64, false),
            Field::new("power", DataType::Float64, false),
            Field::new("apparent_power", DataType::Float64, false),
        ]))
    }

    /// Writes the samples as `history_partNNN.parquet` chunk files and returns their paths.
    pub fn convert(&self, samples: &[PowerSample]) -> Result<Vec<PathBuf>> {
        if samples.is_empty() {
            anyhow::bail!("No samples to write to Parquet");
        }

        create_dir_all(&self.output_directory)?;

        let total_chunks = samples.len().div_ceil(self.chunk_size);
        info!("Writing {} samples as {} Parquet chunk(s)", samples.len(), total_chunks);

        let mut paths = Vec::with_capacity(total_chunks);
        for (i, chunk) in samples.chunks(self.chunk_size).enumerate() {
            info!("Writing chunk {}/{}, {} rows", i + 1, total_chunks, chunk.len());

            let output_path = self
                .output_directory
                .join(format!("history_part{:03}.parquet", i));
            self.write_chunk_to_parquet(chunk, &output_path)?;
            paths.push(output_path);
        }

        Ok(paths)
    }

    fn write_chunk_to_parquet(&self, samples: &[PowerSample], output_path: &Path) -> Result<()> {
        let schema = Self::schema();

        let column = |f: fn(&PowerSample) -> f64| -> ArrayRef {
            Arc::new(Float64Array::from_iter_values(samples.iter().map(f)))
        };

        let timestamps: ArrayRef = Arc::new(TimestampSecondArray::from_iter_values(
            samples.iter().map(|s| s.timestamp.and_utc().timestamp()),
        ));
        let indices: ArrayRef = Arc::new(UInt64Array::from_iter_values(
            samples.iter().map(|s| s.index),
        ));

        let arrays = vec![
            timestamps,
            indices,
            column(|s| s.voltage),
            column(|s| s.current),
            column(|s| s.power_factor),
            column(|s| s.power),
            column(|s| s.apparent_power),
        ];

        let batch = RecordBatch::try_new(schema.clone(), arrays)?;

        let file = File::create(output_path)?;
        let props = WriterProperties::builder().build();
        let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;

        writer.write(&batch)?;
        writer.close()?;

        Ok(())
    }
}
