use crate::codec::ByteBuffer;
use crate::error::{Capability, Error, Result};

use super::{SeekOrigin, Stream};

pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Adds a byte-level buffer in front of another stream.
///
/// One buffer is shared between reading and writing. Pending writes are
/// pushed down before any read or seek, and bytes read ahead but not yet
/// handed out are given back to the inner stream before a write.
pub struct BufferedStream<S: Stream> {
    inner: Option<S>,
    buffer: ByteBuffer,
    read_pos: usize,
    read_len: usize,
    write_len: usize,
}

impl<S: Stream> BufferedStream<S> {
    pub fn new(inner: S) -> Self {
        Self::with_capacity(inner, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_capacity(inner: S, capacity: usize) -> Self {
        BufferedStream {
            inner: Some(inner),
            buffer: ByteBuffer::new(capacity.max(1)),
            read_pos: 0,
            read_len: 0,
            write_len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn get_ref(&self) -> Option<&S> {
        self.inner.as_ref()
    }

    /// Pushes buffered state down and hands back the inner stream.
    pub fn into_inner(mut self) -> Result<S> {
        self.flush_write()?;
        self.flush_read()?;
        self.inner.take().ok_or(Error::Closed)
    }

    fn inner_ref(&self) -> Result<&S> {
        self.inner.as_ref().ok_or(Error::Closed)
    }

    fn inner_mut(&mut self) -> Result<&mut S> {
        self.inner.as_mut().ok_or(Error::Closed)
    }

    fn unread(&self) -> usize {
        self.read_len - self.read_pos
    }

    fn flush_write(&mut self) -> Result<()> {
        if self.write_len > 0 {
            let inner = self.inner.as_mut().ok_or(Error::Closed)?;
            inner.write(&self.buffer[..self.write_len])?;
            self.write_len = 0;
        }
        Ok(())
    }

    /// Rewinds the inner stream over bytes read ahead but never returned.
    fn flush_read(&mut self) -> Result<()> {
        let unread = self.unread();
        if unread > 0 {
            let inner = self.inner_mut()?;
            if !inner.can_seek() {
                return Err(Error::NotSupported(Capability::Seek));
            }
            inner.seek(-(unread as i64), SeekOrigin::Current)?;
        }
        self.read_pos = 0;
        self.read_len = 0;
        Ok(())
    }
}

impl<S: Stream> Stream for BufferedStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.can_read() {
            return Err(Error::NotSupported(Capability::Read));
        }
        self.flush_write()?;

        if self.unread() == 0 {
            self.read_pos = 0;
            self.read_len = 0;

            // large requests skip the buffer entirely
            if buf.len() >= self.buffer.len() {
                return self.inner_mut()?.read(buf);
            }

            let inner = self.inner.as_mut().ok_or(Error::Closed)?;
            self.read_len = inner.read(&mut self.buffer)?;
            if self.read_len == 0 {
                return Ok(0);
            }
        }

        let n = buf.len().min(self.unread());
        buf[..n].copy_from_slice(&self.buffer[self.read_pos..self.read_pos + n]);
        self.read_pos += n;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        if !self.can_write() {
            return Err(Error::NotSupported(Capability::Write));
        }
        if self.read_len > 0 {
            self.flush_read()?;
        }

        if self.write_len + buf.len() > self.buffer.len() {
            self.flush_write()?;
        }
        if buf.len() >= self.buffer.len() {
            return self.inner_mut()?.write(buf);
        }

        self.buffer[self.write_len..self.write_len + buf.len()].copy_from_slice(buf);
        self.write_len += buf.len();
        if self.write_len == self.buffer.len() {
            self.flush_write()?;
        }
        Ok(())
    }

    fn position(&self) -> u64 {
        match &self.inner {
            Some(inner) => {
                inner.position() - self.unread() as u64 + self.write_len as u64
            }
            None => 0,
        }
    }

    fn len(&self) -> Result<u64> {
        let inner = self.inner_ref()?;
        let len = inner.len()?;
        if self.write_len > 0 {
            return Ok(len.max(inner.position() + self.write_len as u64));
        }
        Ok(len)
    }

    fn set_len(&mut self, len: u64) -> Result<()> {
        self.flush_write()?;
        self.flush_read()?;
        self.inner_mut()?.set_len(len)
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> Result<u64> {
        if !self.can_seek() {
            return Err(Error::NotSupported(Capability::Seek));
        }
        self.flush_write()?;

        // fold the read-ahead into the relative offset instead of seeking twice
        let offset = match origin {
            SeekOrigin::Current => offset - self.unread() as i64,
            _ => offset,
        };
        self.read_pos = 0;
        self.read_len = 0;
        self.inner_mut()?.seek(offset, origin)
    }

    fn can_read(&self) -> bool {
        self.inner.as_ref().is_some_and(|s| s.can_read())
    }

    fn can_seek(&self) -> bool {
        self.inner.as_ref().is_some_and(|s| s.can_seek())
    }

    fn can_write(&self) -> bool {
        self.inner.as_ref().is_some_and(|s| s.can_write())
    }

    fn flush(&mut self) -> Result<()> {
        self.flush_write()?;
        self.flush_read()?;
        self.inner_mut()?.flush()
    }

    fn close(&mut self) -> Result<()> {
        if self.inner.is_some() {
            self.flush()?;
        }
        if let Some(mut inner) = self.inner.take() {
            inner.close()?;
        }
        Ok(())
    }
}

impl<S: Stream> Drop for BufferedStream<S> {
    fn drop(&mut self) {
        if self.inner.is_some() {
            let _ = self.flush_write();
            let _ = self.flush_read();
        }
    }
}
