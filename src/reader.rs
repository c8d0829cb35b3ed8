//! High-level API for reading Voltcraft log files.

use log::{debug, warn};
use memmap2::Mmap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::block::{RecordParser, SampleStream};
use crate::config::{DecoderConfig, ErrorPolicy};
use crate::cursor::{ByteCursor, ByteSource, ReaderSource};
use crate::error::{Error, Result};
use crate::models::{DecodedBlock, DecodedLog};

enum Backing {
    Owned(Vec<u8>),
    Mapped(Mmap),
}

impl Backing {
    fn bytes(&self) -> &[u8] {
        match self {
            Backing::Owned(data) => data.as_slice(),
            Backing::Mapped(mmap) => &mmap[..],
        }
    }
}

/// A reader that decodes every block of a Voltcraft log.
///
/// # Examples
///
/// ```no_run
/// use voltcraft_parser::PowerLogReader;
///
/// let reader = PowerLogReader::from_file("A0000001")?;
/// let log = reader.read_all()?;
/// println!("Read {} samples in {} blocks", log.sample_count(), log.blocks.len());
/// # Ok::<(), voltcraft_parser::Error>(())
/// ```
pub struct PowerLogReader {
    data: Backing,
    config: DecoderConfig,
}

impl PowerLogReader {
    /// Create a reader over a memory-mapped log file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or mapped.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        // Empty files cannot be mapped on every platform.
        if file.metadata()?.len() == 0 {
            return Ok(Self::from_bytes(Vec::new()));
        }
        // SAFETY: the map is read-only and lives no longer than this reader.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            data: Backing::Mapped(mmap),
            config: DecoderConfig::default(),
        })
    }

    /// Create a reader over raw bytes.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data: Backing::Owned(data),
            config: DecoderConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DecoderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn len(&self) -> usize {
        self.data.bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if the data starts with a block start marker.
    pub fn is_valid(&self) -> bool {
        self.data.bytes().starts_with(&crate::block::START_MARKER)
    }

    /// Decode all blocks into memory.
    ///
    /// # Errors
    ///
    /// I/O errors are always returned. With [`ErrorPolicy::Abort`] a framing
    /// or header error in the first block is returned; a later one ends
    /// decoding and is kept in [`DecodedLog::stopped_by`] alongside the
    /// blocks already decoded. With [`ErrorPolicy::Resynchronize`] decode
    /// errors skip ahead to the next start marker.
    pub fn read_all(&self) -> Result<DecodedLog> {
        decode_blocks(self.parser())
    }

    /// Get a block parser over the data for lazy, block-by-block decoding.
    pub fn parser(&self) -> RecordParser<ByteCursor<'_>> {
        RecordParser::with_config(ByteCursor::new(self.data.bytes()), self.config.clone())
    }
}

/// Decode all blocks from a streaming reader without holding the log in memory
/// beyond the decoded samples.
pub fn read_from<R: Read>(reader: R, config: DecoderConfig) -> Result<DecodedLog> {
    decode_blocks(RecordParser::with_config(ReaderSource::new(reader), config))
}

fn decode_blocks<S: ByteSource>(mut parser: RecordParser<S>) -> Result<DecodedLog> {
    let policy = parser.config().error_policy;
    let mut log = DecodedLog::default();

    loop {
        let decoded = match parser.next_block() {
            None => break,
            Some(Ok(stream)) => collect_block(stream),
            Some(Err(e)) => Err(e),
        };

        match decoded {
            Ok(block) => {
                debug!(
                    "Decoded block {} ({} samples, {})",
                    log.blocks.len(),
                    block.samples.len(),
                    block.status
                );
                log.blocks.push(block);
            }
            Err(Error::Io(e)) => return Err(Error::Io(e)),
            Err(e) if policy == ErrorPolicy::Resynchronize => {
                warn!("{}", e);
                let before = parser.position();
                let found = parser.resynchronize()?;
                log.skipped_bytes += parser.position() - before;
                if found.is_none() {
                    break;
                }
            }
            Err(e) if log.blocks.is_empty() => return Err(e),
            Err(e) => {
                warn!("Stopped after {} block(s): {}", log.blocks.len(), e);
                log.stopped_by = Some(e);
                break;
            }
        }
    }

    Ok(log)
}

fn collect_block<S: ByteSource>(mut stream: SampleStream<'_, S>) -> Result<DecodedBlock> {
    let mut samples = Vec::new();
    for sample in stream.by_ref() {
        samples.push(sample?);
    }

    Ok(DecodedBlock {
        offset: stream.offset(),
        start_time: stream.start_time(),
        status: stream
            .status()
            .ok_or_else(|| Error::Other("block did not terminate".to_string()))?,
        samples,
        warnings: stream.warnings().to_vec(),
        warning_count: stream.warning_count(),
    })
}
