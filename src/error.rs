//! Error types for the Voltcraft log parser library.

use crate::fields::BlockStartTime;

/// Result type alias for Voltcraft log operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when decoding or exporting Voltcraft logs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The start marker `E0 C5 EA` was not found where a block must begin.
    #[error("Framing error at offset {offset}: expected start marker, found {found:02X?}")]
    Framing { offset: u64, found: Vec<u8> },

    /// The byte source ran out before a block header was complete.
    #[error("Truncated stream at offset {offset}: needed {needed} bytes, {available} available")]
    TruncatedStream {
        offset: u64,
        needed: usize,
        available: usize,
    },

    /// The block header does not describe a real calendar date and time.
    #[error("Invalid block timestamp at offset {offset}: {header}")]
    InvalidTimestamp { offset: u64, header: BlockStartTime },

    /// I/O error occurred while reading or writing
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Output format error (e.g., Parquet or CSV write error)
    #[error("Output error: {0}")]
    OutputError(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framing_error_shows_found_bytes() {
        let err = Error::Framing {
            offset: 0,
            found: vec![0xDE, 0xAD, 0xBE],
        };
        assert_eq!(
            err.to_string(),
            "Framing error at offset 0: expected start marker, found [DE, AD, BE]"
        );
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
