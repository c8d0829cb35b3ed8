//! # Voltcraft Parser
//!
//! A Rust library for decoding the binary logs written by the Voltcraft
//! Energy Logger 4000 and turning them into timestamped electrical samples.
//!
//! ## Features
//!
//! - **Streaming decode**: samples are decoded one record at a time, from a
//!   buffer or any [`std::io::Read`]
//! - **Multi-block logs**: concatenated and power-cycle-interrupted blocks
//! - **Loss-aware**: truncated blocks keep their samples and say so
//! - **Statistics**: energy totals, daily breakdown and blackout detection
//! - **Export**: text, CSV, JSON and Parquet
//!
//! ## Log Format
//!
//! ```text
//! E0 C5 EA          start marker
//! MM DD YY hh mm    block start time (year is YY + 2000)
//! VV VV CC CC PF    sample, repeated once per minute (big-endian)
//! FF FF FF FF       end marker
//! ```
//!
//! Voltage is `VVVV / 10` volts, current `CCCC / 1000` amperes and power
//! factor `PF / 100`. Active power (kW) and apparent power (kVA) are derived.
//!
//! ## Quick Start
//!
//! ```no_run
//! use voltcraft_parser::{HistoryWriter, PowerLogReader};
//!
//! let reader = PowerLogReader::from_file("A0000001")?;
//! let log = reader.read_all()?;
//!
//! println!("Read {} samples", log.sample_count());
//!
//! HistoryWriter::new("output").write(&log.into_samples())?;
//! # Ok::<(), voltcraft_parser::Error>(())
//! ```
//!
//! ## Lazy Decoding
//!
//! For constant-memory processing, drive the block parser directly:
//!
//! ```
//! use voltcraft_parser::block::RecordParser;
//!
//! let data = [
//!     0xE0, 0xC5, 0xEA, 6, 15, 23, 14, 30,
//!     0x09, 0xC4, 0x03, 0xE8, 0x64,
//!     0xFF, 0xFF, 0xFF, 0xFF,
//! ];
//! let mut parser = RecordParser::from_slice(&data);
//! while let Some(block) = parser.next_block() {
//!     let mut block = block?;
//!     println!("Block starting {}", block.start_time());
//!     for sample in block.by_ref() {
//!         let sample = sample?;
//!         println!("{} {:.3}kW", sample.timestamp, sample.power);
//!     }
//!     println!("{:?}", block.status());
//! }
//! # Ok::<(), voltcraft_parser::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! ```no_run
//! use voltcraft_parser::{Error, PowerLogReader};
//!
//! match PowerLogReader::from_file("A0000001").and_then(|r| r.read_all()) {
//!     Ok(log) => println!("{} blocks", log.blocks.len()),
//!     Err(Error::Framing { offset, .. }) => eprintln!("Not a Voltcraft log (offset {})", offset),
//!     Err(err) => eprintln!("Error: {}", err),
//! }
//! ```

// Public API modules
pub mod config;
pub mod error;
pub mod reader;
pub mod writer;

// Re-export commonly used types
pub use config::{DecoderConfig, DecoderConfigBuilder, ErrorPolicy};
pub use error::{Error, Result};
pub use reader::PowerLogReader;
pub use writer::{HistoryWriter, WriteStats};

pub use models::{
    BlockStatus, DecodedBlock, DecodedLog, OutputFormat, PowerSample, SemanticWarning,
    WarningKind,
};

// Lower-level building blocks
pub mod block;
pub mod cursor;
pub mod fields;
pub mod formats;
pub mod models;
pub mod stats;
