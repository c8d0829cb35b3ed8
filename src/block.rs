//! Block framing state machine.
//!
//! A Voltcraft log is a sequence of blocks:
//!
//! ```text
//! E0 C5 EA | MM DD YY hh mm | (VV VV CC CC PF)* | FF FF FF FF
//! ```
//!
//! [`RecordParser`] walks this layout over any [`ByteSource`]. Samples are
//! decoded one record at a time and handed out through [`SampleStream`], so
//! nothing about a block is buffered beyond the record being decoded.

use chrono::NaiveDateTime;
use log::{debug, warn};

use crate::config::DecoderConfig;
use crate::cursor::{ByteCursor, ByteSource, SourceError};
use crate::error::{Error, Result};
use crate::fields::{decode_date, decode_sample, BlockStartTime, HEADER_LEN, SAMPLE_LEN};
use crate::models::{BlockStatus, PowerSample, SemanticWarning, WarningKind};

pub const START_MARKER: [u8; 3] = [0xE0, 0xC5, 0xEA];
pub const END_MARKER: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    AwaitingStart,
    ReadingHeader,
    ReadingSamples,
    Terminated(BlockStatus),
    Failed,
}

/// Decodes blocks from a byte source.
///
/// # Examples
///
/// ```
/// use voltcraft_parser::block::RecordParser;
/// use voltcraft_parser::BlockStatus;
///
/// let data = [
///     0xE0, 0xC5, 0xEA, // start marker
///     6, 15, 23, 14, 30, // 2023-06-15 14:30
///     0x09, 0xC4, 0x03, 0xE8, 0x64, // 250.0V 1.000A cosPHI 1.00
///     0xFF, 0xFF, 0xFF, 0xFF,
/// ];
/// let mut parser = RecordParser::from_slice(&data);
/// let mut stream = parser.samples()?;
/// let sample = stream.next().unwrap()?;
/// assert_eq!(sample.power, 0.25);
/// assert!(stream.next().is_none());
/// assert_eq!(stream.status(), Some(BlockStatus::Completed));
/// # Ok::<(), voltcraft_parser::Error>(())
/// ```
pub struct RecordParser<S> {
    source: S,
    config: DecoderConfig,
    state: ParserState,
    block_offset: u64,
    start_time: Option<BlockStartTime>,
    base: Option<NaiveDateTime>,
    index: u64,
    warnings: Vec<SemanticWarning>,
    warning_count: u64,
}

impl<'a> RecordParser<ByteCursor<'a>> {
    pub fn from_slice(data: &'a [u8]) -> Self {
        Self::new(ByteCursor::new(data))
    }
}

impl<S: ByteSource> RecordParser<S> {
    pub fn new(source: S) -> Self {
        Self::with_config(source, DecoderConfig::default())
    }

    pub fn with_config(source: S, config: DecoderConfig) -> Self {
        Self {
            source,
            config,
            state: ParserState::AwaitingStart,
            block_offset: 0,
            start_time: None,
            base: None,
            index: 0,
            warnings: Vec::new(),
            warning_count: 0,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Header of the current block, available once sample reading has begun.
    pub fn start_time(&self) -> Option<BlockStartTime> {
        self.start_time
    }

    pub fn status(&self) -> Option<BlockStatus> {
        match self.state {
            ParserState::Terminated(status) => Some(status),
            _ => None,
        }
    }

    /// Number of samples in the current block. Only known once it has terminated.
    pub fn sample_count(&self) -> Option<u64> {
        self.status().map(|_| self.index)
    }

    /// The first warnings of the current block, at most
    /// [`DecoderConfig::max_warnings`] of them.
    pub fn warnings(&self) -> &[SemanticWarning] {
        &self.warnings
    }

    /// Number of implausible samples in the current block, reported or not.
    pub fn warning_count(&self) -> u64 {
        self.warning_count
    }

    /// Byte offset of the current block's start marker.
    pub fn block_offset(&self) -> u64 {
        self.block_offset
    }

    pub fn position(&self) -> u64 {
        self.source.position()
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Recognises the start marker and decodes the block header.
    ///
    /// A block still being read is skipped to its end first.
    ///
    /// # Errors
    ///
    /// - [`Error::Framing`] if the next bytes are not the start marker
    /// - [`Error::TruncatedStream`] if the header is cut short
    /// - [`Error::InvalidTimestamp`] if the header is not a real date and time
    pub fn begin_block(&mut self) -> Result<BlockStartTime> {
        match self.state {
            ParserState::ReadingSamples => self.skip_samples()?,
            ParserState::Failed => {
                return Err(Error::Other(
                    "parser failed; resynchronize before starting a new block".to_string(),
                ))
            }
            _ => {}
        }

        self.state = ParserState::AwaitingStart;
        self.block_offset = self.source.position();
        self.start_time = None;
        self.base = None;
        self.index = 0;
        self.warnings.clear();
        self.warning_count = 0;

        let offset = self.block_offset;
        let marker = match self.source.peek_bytes(START_MARKER.len()) {
            Ok(bytes) => bytes.to_vec(),
            Err(SourceError::InsufficientData { available, .. }) => {
                let found = self.source.peek_bytes(available).map(|b| b.to_vec());
                self.state = ParserState::Failed;
                return Err(Error::Framing {
                    offset,
                    found: found.unwrap_or_default(),
                });
            }
            Err(e) => return Err(self.fail(e)),
        };
        if marker != START_MARKER {
            self.state = ParserState::Failed;
            return Err(Error::Framing {
                offset,
                found: marker,
            });
        }
        self.source.advance(START_MARKER.len());
        self.state = ParserState::ReadingHeader;

        let header = self
            .source
            .read_array::<HEADER_LEN>()
            .map_err(|e| self.fail(e))?;
        let start_time = decode_date(header);
        let base = start_time.to_datetime().ok_or_else(|| {
            self.state = ParserState::Failed;
            Error::InvalidTimestamp {
                offset,
                header: start_time,
            }
        })?;

        debug!("Block at offset {} starts {}", offset, start_time);
        self.start_time = Some(start_time);
        self.base = Some(base);
        self.state = ParserState::ReadingSamples;
        Ok(start_time)
    }

    /// Decodes the next sample of the current block.
    ///
    /// Returns `None` once the block has terminated (see [`Self::status`]).
    pub fn next_sample(&mut self) -> Option<Result<PowerSample>> {
        if self.state != ParserState::ReadingSamples {
            return None;
        }
        let base = self.base?;

        match self.source.peek_bytes(END_MARKER.len()) {
            Ok(bytes) if bytes == END_MARKER => {
                self.source.advance(END_MARKER.len());
                self.terminate(BlockStatus::Completed);
                return None;
            }
            Ok(_) | Err(SourceError::InsufficientData { .. }) => {}
            Err(e) => return Some(Err(self.fail(e))),
        }

        if self.config.split_on_start_marker {
            match self.source.peek_bytes(START_MARKER.len()) {
                Ok(bytes) if bytes == START_MARKER => {
                    self.terminate(BlockStatus::Interrupted);
                    return None;
                }
                Ok(_) | Err(SourceError::InsufficientData { .. }) => {}
                Err(e) => return Some(Err(self.fail(e))),
            }
        }

        let offset = self.source.position();
        let record = match self.source.read_array::<SAMPLE_LEN>() {
            Ok(record) => record,
            Err(SourceError::InsufficientData { .. }) => {
                return match self.source.drain() {
                    Ok(trailing_bytes) => {
                        warn!(
                            "Block at offset {} ends without end marker after {} samples",
                            self.block_offset, self.index
                        );
                        self.terminate(BlockStatus::Truncated { trailing_bytes });
                        None
                    }
                    Err(e) => Some(Err(self.fail(e))),
                };
            }
            Err(e) => return Some(Err(self.fail(e))),
        };

        let Some(timestamp) = BlockStartTime::sample_time(base, self.index) else {
            self.state = ParserState::Failed;
            let offset = self.block_offset;
            return self
                .start_time
                .map(|header| Err(Error::InvalidTimestamp { offset, header }));
        };
        let sample = PowerSample::from_raw(self.index, timestamp, &decode_sample(record));
        self.check_plausibility(&sample, offset);
        self.index += 1;
        Some(Ok(sample))
    }

    /// Begins a block and returns its lazy sample sequence.
    pub fn samples(&mut self) -> Result<SampleStream<'_, S>> {
        let start_time = self.begin_block()?;
        Ok(SampleStream {
            parser: self,
            start_time,
        })
    }

    /// Begins the next block, or returns `None` if the source is exhausted.
    pub fn next_block(&mut self) -> Option<Result<SampleStream<'_, S>>> {
        if self.state == ParserState::ReadingSamples {
            if let Err(e) = self.skip_samples() {
                return Some(Err(e));
            }
        }
        match self.source.at_end() {
            Ok(true) => None,
            Ok(false) => Some(self.samples()),
            Err(e) => Some(Err(self.fail(e))),
        }
    }

    /// Scans forward to the next start marker.
    ///
    /// Returns the number of bytes skipped, or `None` if the source ran out
    /// without another marker (everything left was consumed).
    pub fn resynchronize(&mut self) -> Result<Option<u64>> {
        let mut skipped = 0u64;
        loop {
            match self.source.peek_bytes(START_MARKER.len()) {
                Ok(bytes) if bytes == START_MARKER => {
                    self.state = ParserState::AwaitingStart;
                    if skipped > 0 {
                        warn!(
                            "Resynchronized at offset {} after skipping {} bytes",
                            self.source.position(),
                            skipped
                        );
                    }
                    return Ok(Some(skipped));
                }
                Ok(_) => {
                    self.source.advance(1);
                    skipped += 1;
                }
                Err(SourceError::InsufficientData { .. }) => {
                    let rest = self.source.drain().map_err(|e| self.fail(e))?;
                    self.state = ParserState::AwaitingStart;
                    warn!(
                        "No further start marker; dropped {} bytes",
                        skipped + rest as u64
                    );
                    return Ok(None);
                }
                Err(e) => return Err(self.fail(e)),
            }
        }
    }

    fn skip_samples(&mut self) -> Result<()> {
        while let Some(sample) = self.next_sample() {
            sample?;
        }
        Ok(())
    }

    fn terminate(&mut self, status: BlockStatus) {
        debug!(
            "Block at offset {} {} with {} samples",
            self.block_offset, status, self.index
        );
        self.state = ParserState::Terminated(status);
    }

    fn fail(&mut self, err: SourceError) -> Error {
        self.state = ParserState::Failed;
        match err {
            SourceError::InsufficientData {
                offset,
                needed,
                available,
            } => Error::TruncatedStream {
                offset,
                needed,
                available,
            },
            SourceError::Io(e) => Error::Io(e),
        }
    }

    fn check_plausibility(&mut self, sample: &PowerSample, offset: u64) {
        let kind = if !self.config.voltage_range.contains(&sample.voltage) {
            Some(WarningKind::VoltageOutOfRange {
                voltage: sample.voltage,
            })
        } else if sample.power_factor > 1.0 {
            Some(WarningKind::PowerFactorOutOfRange {
                power_factor: sample.power_factor,
            })
        } else {
            None
        };

        let Some(kind) = kind else {
            return;
        };
        self.warning_count += 1;

        if self.warnings.len() < self.config.max_warnings {
            let warning = SemanticWarning {
                index: sample.index,
                offset,
                kind,
            };
            warn!("{}", warning);
            self.warnings.push(warning);
        } else if self.warning_count == self.warnings.len() as u64 + 1 {
            warn!(
                "Block at offset {}: further implausible samples are only counted",
                self.block_offset
            );
        }
    }
}

/// Lazy, single-pass sequence of the samples in one block.
///
/// Dropping the stream early is safe; the parser skips the rest of the block
/// when asked for the next one.
pub struct SampleStream<'p, S: ByteSource> {
    parser: &'p mut RecordParser<S>,
    start_time: BlockStartTime,
}

impl<S: ByteSource> SampleStream<'_, S> {
    pub fn start_time(&self) -> BlockStartTime {
        self.start_time
    }

    /// Byte offset of the block's start marker.
    pub fn offset(&self) -> u64 {
        self.parser.block_offset()
    }

    /// Terminal status, once the last sample has been pulled.
    pub fn status(&self) -> Option<BlockStatus> {
        self.parser.status()
    }

    /// Total number of samples, once the block has terminated.
    pub fn sample_count(&self) -> Option<u64> {
        self.parser.sample_count()
    }

    pub fn warnings(&self) -> &[SemanticWarning] {
        self.parser.warnings()
    }

    pub fn warning_count(&self) -> u64 {
        self.parser.warning_count()
    }
}

impl<S: ByteSource> Iterator for SampleStream<'_, S> {
    type Item = Result<PowerSample>;

    fn next(&mut self) -> Option<Self::Item> {
        self.parser.next_sample()
    }
}
