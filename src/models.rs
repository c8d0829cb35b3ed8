use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Error;
use crate::fields::{BlockStartTime, RawPowerSample};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Text,
    Csv,
    Json,
    Parquet,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Parquet => "parquet",
        }
    }
}

/// One decoded measurement, taken one minute after its predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerSample {
    /// Position within the block, starting at 0
    pub index: u64,
    pub timestamp: NaiveDateTime,
    /// Volts
    pub voltage: f64,
    /// Amperes
    pub current: f64,
    /// cos(phi)
    pub power_factor: f64,
    /// Active power, kW
    pub power: f64,
    /// Apparent power, kVA
    pub apparent_power: f64,
}

impl PowerSample {
    pub fn from_raw(index: u64, timestamp: NaiveDateTime, raw: &RawPowerSample) -> Self {
        Self {
            index,
            timestamp,
            voltage: raw.voltage(),
            current: raw.current(),
            power_factor: raw.power_factor(),
            power: raw.power(),
            apparent_power: raw.apparent_power(),
        }
    }
}

/// How a block ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockStatus {
    /// The end marker `FF FF FF FF` was found.
    Completed,
    /// The source ran out before an end marker. `trailing_bytes` is the size
    /// of the incomplete record that was dropped.
    Truncated { trailing_bytes: usize },
    /// A new block's start marker appeared where a sample was expected.
    Interrupted,
}

impl BlockStatus {
    pub fn is_clean(&self) -> bool {
        !matches!(self, BlockStatus::Truncated { .. })
    }
}

impl fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockStatus::Completed => write!(f, "completed"),
            BlockStatus::Truncated { trailing_bytes } => {
                write!(f, "truncated ({} trailing bytes)", trailing_bytes)
            }
            BlockStatus::Interrupted => write!(f, "interrupted by next block"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum WarningKind {
    /// Voltage outside the configured plausibility window
    VoltageOutOfRange { voltage: f64 },
    /// Power factor above 1.00
    PowerFactorOutOfRange { power_factor: f64 },
}

/// A decoded sample whose values look implausible. The sample is still emitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SemanticWarning {
    pub index: u64,
    pub offset: u64,
    pub kind: WarningKind,
}

impl fmt::Display for SemanticWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            WarningKind::VoltageOutOfRange { voltage } => write!(
                f,
                "sample {} at offset {}: implausible voltage {:.1}V",
                self.index, self.offset, voltage
            ),
            WarningKind::PowerFactorOutOfRange { power_factor } => write!(
                f,
                "sample {} at offset {}: power factor {:.2} above 1.00",
                self.index, self.offset, power_factor
            ),
        }
    }
}

/// A fully decoded block.
#[derive(Debug, Clone, Serialize)]
pub struct DecodedBlock {
    /// Byte offset of the block's start marker
    pub offset: u64,
    pub start_time: BlockStartTime,
    pub status: BlockStatus,
    pub samples: Vec<PowerSample>,
    /// The first implausible samples, up to the configured limit
    pub warnings: Vec<SemanticWarning>,
    /// All implausible samples, including those not kept in `warnings`
    pub warning_count: u64,
}

#[derive(Debug, Default)]
pub struct DecodedLog {
    pub blocks: Vec<DecodedBlock>,
    /// Bytes skipped while resynchronising after framing errors
    pub skipped_bytes: u64,
    /// The error that ended decoding early. Blocks before it are kept.
    pub stopped_by: Option<Error>,
}

impl DecodedLog {
    pub fn samples(&self) -> impl Iterator<Item = &PowerSample> {
        self.blocks.iter().flat_map(|b| b.samples.iter())
    }

    pub fn sample_count(&self) -> usize {
        self.blocks.iter().map(|b| b.samples.len()).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.stopped_by.is_none() && self.blocks.iter().all(|b| b.status.is_clean())
    }

    pub fn into_samples(self) -> Vec<PowerSample> {
        self.blocks.into_iter().flat_map(|b| b.samples).collect()
    }
}
