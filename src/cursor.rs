//! Bounds-checked byte sources for the block decoder.
//!
//! The decoder pulls fixed-size fields from a [`ByteSource`]. Two sources are
//! provided: [`ByteCursor`] over an in-memory buffer, and [`ReaderSource`]
//! which pulls from any [`std::io::Read`] while holding only the bytes of the
//! field currently being peeked.

use std::io::{self, Read};

/// Failure of a byte source to deliver the requested bytes.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("insufficient data at offset {offset}: needed {needed} bytes, {available} available")]
    InsufficientData {
        offset: u64,
        needed: usize,
        available: usize,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A pull-based source of bytes with a read position.
pub trait ByteSource {
    /// Returns the next `n` bytes without advancing.
    fn peek_bytes(&mut self, n: usize) -> Result<&[u8], SourceError>;

    /// Advances past `n` bytes that were previously peeked.
    fn advance(&mut self, n: usize);

    /// Number of bytes consumed so far.
    fn position(&self) -> u64;

    /// True once every byte of the source has been consumed.
    fn at_end(&mut self) -> Result<bool, SourceError>;

    /// Returns the next `n` bytes and advances past them.
    fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, SourceError> {
        let bytes = self.peek_bytes(n)?.to_vec();
        self.advance(n);
        Ok(bytes)
    }

    /// Reads exactly `N` bytes into a fixed-size array.
    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], SourceError>
    where
        Self: Sized,
    {
        let mut out = [0u8; N];
        out.copy_from_slice(self.peek_bytes(N)?);
        self.advance(N);
        Ok(out)
    }

    /// Consumes everything left in the source, returning how many bytes were dropped.
    fn drain(&mut self) -> Result<usize, SourceError> {
        let mut dropped = 0;
        while !self.at_end()? {
            self.advance(1);
            dropped += 1;
        }
        Ok(dropped)
    }
}

/// A read position over an immutable in-memory buffer.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Returns the next `n` bytes with the buffer's lifetime, without advancing.
    pub fn peek_slice(&self, n: usize) -> Result<&'a [u8], SourceError> {
        if self.remaining() < n {
            return Err(SourceError::InsufficientData {
                offset: self.pos as u64,
                needed: n,
                available: self.remaining(),
            });
        }
        Ok(&self.data[self.pos..self.pos + n])
    }

    pub fn is_empty(&self) -> bool {
        self.pos == self.data.len()
    }
}

impl ByteSource for ByteCursor<'_> {
    fn peek_bytes(&mut self, n: usize) -> Result<&[u8], SourceError> {
        self.peek_slice(n)
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.data.len());
    }

    fn position(&self) -> u64 {
        self.pos as u64
    }

    fn at_end(&mut self) -> Result<bool, SourceError> {
        Ok(self.is_empty())
    }

    fn drain(&mut self) -> Result<usize, SourceError> {
        let dropped = self.remaining();
        self.pos = self.data.len();
        Ok(dropped)
    }
}

/// A byte source pulling from a reader on demand.
///
/// Only the bytes needed to satisfy the largest outstanding peek are kept in
/// memory, so arbitrarily long logs decode in constant space.
pub struct ReaderSource<R> {
    inner: R,
    buf: Vec<u8>,
    pos: u64,
    eof: bool,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(8),
            pos: 0,
            eof: false,
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn fill(&mut self, n: usize) -> io::Result<()> {
        let mut chunk = [0u8; 64];
        while self.buf.len() < n && !self.eof {
            let want = (n - self.buf.len()).min(chunk.len());
            match self.inner.read(&mut chunk[..want]) {
                Ok(0) => self.eof = true,
                Ok(read) => self.buf.extend_from_slice(&chunk[..read]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {
    fn peek_bytes(&mut self, n: usize) -> Result<&[u8], SourceError> {
        self.fill(n)?;
        if self.buf.len() < n {
            return Err(SourceError::InsufficientData {
                offset: self.pos,
                needed: n,
                available: self.buf.len(),
            });
        }
        Ok(&self.buf[..n])
    }

    fn advance(&mut self, n: usize) {
        let n = n.min(self.buf.len());
        self.buf.drain(..n);
        self.pos += n as u64;
    }

    fn position(&self) -> u64 {
        self.pos
    }

    fn at_end(&mut self) -> Result<bool, SourceError> {
        self.fill(1)?;
        Ok(self.buf.is_empty())
    }
}
