use crate::error::{Capability, Error, Result};

use super::{SeekOrigin, Stream, clamp_seek};

/// A stream backed by a growable in-memory byte vector.
#[derive(Debug, Clone)]
pub struct MemoryStream {
    bytes: Vec<u8>,
    position: usize,
    writable: bool,
    closed: bool,
}

impl MemoryStream {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        MemoryStream {
            bytes: Vec::with_capacity(capacity),
            position: 0,
            writable: true,
            closed: false,
        }
    }

    /// A stream over existing bytes that refuses writes.
    pub fn read_only(bytes: Vec<u8>) -> Self {
        MemoryStream {
            bytes,
            position: 0,
            writable: false,
            closed: false,
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.bytes
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::Closed);
        }
        Ok(())
    }
}

impl Default for MemoryStream {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<u8>> for MemoryStream {
    fn from(bytes: Vec<u8>) -> Self {
        MemoryStream {
            bytes,
            position: 0,
            writable: true,
            closed: false,
        }
    }
}

impl Stream for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.check_open()?;
        let available = self.bytes.len().saturating_sub(self.position);
        let n = available.min(buf.len());
        buf[..n].copy_from_slice(&self.bytes[self.position..self.position + n]);
        self.position += n;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.check_open()?;
        if !self.writable {
            return Err(Error::NotSupported(Capability::Write));
        }

        let end = self.position + buf.len();
        if end > self.bytes.len() {
            self.bytes.resize(end, 0);
        }
        self.bytes[self.position..end].copy_from_slice(buf);
        self.position = end;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position as u64
    }

    fn len(&self) -> Result<u64> {
        self.check_open()?;
        Ok(self.bytes.len() as u64)
    }

    fn set_len(&mut self, len: u64) -> Result<()> {
        self.check_open()?;
        if !self.writable {
            return Err(Error::NotSupported(Capability::Write));
        }

        self.bytes.resize(len as usize, 0);
        self.position = self.position.min(self.bytes.len());
        Ok(())
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> Result<u64> {
        self.check_open()?;
        let position = clamp_seek(
            offset,
            origin,
            self.position as u64,
            self.bytes.len() as u64,
        );
        self.position = position as usize;
        Ok(position)
    }

    fn can_read(&self) -> bool {
        !self.closed
    }

    fn can_seek(&self) -> bool {
        !self.closed
    }

    fn can_write(&self) -> bool {
        !self.closed && self.writable
    }

    fn flush(&mut self) -> Result<()> {
        self.check_open()
    }

    fn close(&mut self) -> Result<()> {
        self.bytes = Vec::new();
        self.position = 0;
        self.closed = true;
        Ok(())
    }
}
