use crate::error::{Capability, Error, Result};

pub mod buffered;
pub mod file;
pub mod memory;

pub use buffered::BufferedStream;
pub use file::{FileAccess, FileMode, FileStream};
pub use memory::MemoryStream;

const COPY_BUFFER_SIZE: usize = 4096;

/// Reference point for a seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    Begin,
    Current,
    End,
}

/// A byte-oriented medium the bit codec reads from and writes to.
///
/// Operations that need a capability the stream lacks fail with
/// [`Error::NotSupported`]. A `read` may return fewer bytes than asked for,
/// and returns 0 only at the end of the data.
pub trait Stream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Writes the whole buffer or fails.
    fn write(&mut self, buf: &[u8]) -> Result<()>;

    fn position(&self) -> u64;

    fn len(&self) -> Result<u64>;

    fn set_len(&mut self, len: u64) -> Result<()>;

    /// Moves the position and returns the new absolute position.
    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> Result<u64>;

    fn can_read(&self) -> bool;

    fn can_seek(&self) -> bool;

    fn can_write(&self) -> bool;

    fn flush(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()>;

    /// Reads one byte, or `None` at the end of the data.
    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.write(&[byte])
    }

    /// Copies everything from the current position to the end into `dest`.
    fn copy_to(&mut self, dest: &mut dyn Stream) -> Result<u64> {
        if !self.can_read() {
            return Err(Error::NotSupported(Capability::Read));
        }
        if !dest.can_write() {
            return Err(Error::NotSupported(Capability::Write));
        }

        let mut buf = vec![0u8; COPY_BUFFER_SIZE];
        let mut copied = 0u64;
        loop {
            let nread = self.read(&mut buf)?;
            if nread == 0 {
                return Ok(copied);
            }
            dest.write(&buf[..nread])?;
            copied += nread as u64;
        }
    }
}

/// Resolves a seek request against a position and length, clamping the
/// result into `[0, len]`.
pub(crate) fn clamp_seek(offset: i64, origin: SeekOrigin, position: u64, len: u64) -> u64 {
    let base = match origin {
        SeekOrigin::Begin => 0i128,
        SeekOrigin::Current => position as i128,
        SeekOrigin::End => len as i128,
    };
    (base + offset as i128).clamp(0, len as i128) as u64
}

macro_rules! forward_stream {
    () => {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            (**self).read(buf)
        }

        fn write(&mut self, buf: &[u8]) -> Result<()> {
            (**self).write(buf)
        }

        fn position(&self) -> u64 {
            (**self).position()
        }

        fn len(&self) -> Result<u64> {
            (**self).len()
        }

        fn set_len(&mut self, len: u64) -> Result<()> {
            (**self).set_len(len)
        }

        fn seek(&mut self, offset: i64, origin: SeekOrigin) -> Result<u64> {
            (**self).seek(offset, origin)
        }

        fn can_read(&self) -> bool {
            (**self).can_read()
        }

        fn can_seek(&self) -> bool {
            (**self).can_seek()
        }

        fn can_write(&self) -> bool {
            (**self).can_write()
        }

        fn flush(&mut self) -> Result<()> {
            (**self).flush()
        }

        fn close(&mut self) -> Result<()> {
            (**self).close()
        }
    };
}

impl<S: Stream + ?Sized> Stream for &mut S {
    forward_stream!();
}

impl<S: Stream + ?Sized> Stream for Box<S> {
    forward_stream!();
}
