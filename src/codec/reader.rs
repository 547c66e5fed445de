use crate::error::{Capability, Error, Result};
use crate::stream::{SeekOrigin, Stream};

use super::ByteBuffer;
use super::bits::{RangedInt, bytes_to_bits, get_bit, range_width};

/// Default and smallest window. A 32-bit value starting at bit 7 of a byte
/// spans 5 bytes, so the window always has room for any single read.
pub const DEFAULT_CAPACITY: usize = 8;

/// Unpacks values written by a [`BitWriter`](super::BitWriter).
///
/// Bytes are pulled from the stream into a lookahead window and handed out
/// bit by bit. Every read is all or nothing: when the stream runs out before
/// the requested bits are available the read returns `Ok(None)` and the
/// cursor stays where it was.
///
/// Because of the lookahead the stream usually sits ahead of what has been
/// consumed. [`flush`](BitReader::flush), seeking, `into_inner` and drop give
/// the unconsumed bytes back by seeking the stream.
pub struct BitReader<S: Stream> {
    stream: Option<S>,
    window: ByteBuffer,
    bytes_read: usize,
    byte_offset: usize,
    bit_offset: u8,
}

impl<S: Stream> BitReader<S> {
    pub fn new(stream: S) -> Self {
        Self::with_capacity(stream, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(stream: S, capacity: usize) -> Self {
        BitReader {
            stream: Some(stream),
            window: ByteBuffer::new(capacity.max(DEFAULT_CAPACITY)),
            bytes_read: 0,
            byte_offset: 0,
            bit_offset: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.window.len()
    }

    pub fn get_ref(&self) -> Option<&S> {
        self.stream.as_ref()
    }

    /// Gives unconsumed bytes back to the stream and returns it.
    pub fn into_inner(mut self) -> Result<S> {
        self.give_back()?;
        self.stream.take().ok_or(Error::Detached)
    }

    /// Drops the window, then closes and detaches the stream.
    pub fn close(&mut self) -> Result<()> {
        self.clear_window();
        if let Some(mut stream) = self.stream.take() {
            stream.close()?;
        }
        Ok(())
    }

    /// Rewinds the stream to the first byte not fully consumed through the
    /// reader, drops the window, and flushes the stream. Bits already read
    /// from a partially consumed byte stay consumed.
    pub fn flush(&mut self) -> Result<()> {
        let bit_offset = self.bit_offset;
        self.give_back()?;
        // same state a bit seek leaves: empty window, residual bit offset
        self.bit_offset = bit_offset;
        self.stream()?.flush()
    }

    /// Byte-level seek.
    pub fn seek(&mut self, offset: i64, origin: SeekOrigin) -> Result<u64> {
        if !self.stream()?.can_seek() {
            return Err(Error::NotSupported(Capability::Seek));
        }

        self.give_back()?;
        self.stream()?.seek(offset, origin)
    }

    /// Position of the next bit to be read, counted from the start of the
    /// stream.
    pub fn bit_position(&self) -> Result<u64> {
        let stream = self.stream.as_ref().ok_or(Error::Detached)?;
        let byte = stream.position() - self.bytes_read as u64 + self.byte_offset as u64;
        Ok(bytes_to_bits(byte) + self.bit_offset as u64)
    }

    /// Moves the cursor to an arbitrary bit and returns the new absolute bit
    /// position.
    pub fn seek_bits(&mut self, bits: i64, origin: SeekOrigin) -> Result<u64> {
        if !self.stream()?.can_seek() {
            return Err(Error::NotSupported(Capability::Seek));
        }

        let current = self.bit_position()?;
        self.give_back()?;

        let stream = self.stream()?;
        let base = match origin {
            SeekOrigin::Begin => 0,
            SeekOrigin::Current => current as i128,
            SeekOrigin::End => bytes_to_bits(stream.len()?) as i128,
        };
        let target = base + bits as i128;
        if target < 0 {
            return Err(Error::InvalidArgument("seek before start of stream"));
        }

        let target = target as u64;
        stream.seek((target / 8) as i64, SeekOrigin::Begin)?;
        self.bit_offset = (target % 8) as u8;
        Ok(target)
    }

    /// The next byte, without moving the cursor.
    pub fn peek(&mut self) -> Result<Option<u8>> {
        if !self.ensure(8)? {
            return Ok(None);
        }
        let (value, _, _) = self.extract(8);
        Ok(Some(value as u8))
    }

    pub fn read_bool(&mut self) -> Result<Option<bool>> {
        Ok(self.read_bits(1)?.map(|bit| bit == 1))
    }

    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        self.read()
    }

    pub fn read_char(&mut self) -> Result<Option<i8>> {
        self.read()
    }

    /// Reads a value written with the full range of its type.
    pub fn read<T: RangedInt>(&mut self) -> Result<Option<T>> {
        self.read_in_range(T::min_value(), T::max_value())
    }

    /// Reads a value written with the same `[min, max]` bounds. Different
    /// bounds are not detected and decode to some other value.
    pub fn read_in_range<T: RangedInt>(&mut self, min: T, max: T) -> Result<Option<T>> {
        let width = range_width(min, max)?;
        Ok(self.read_bits(width)?.map(|offset| T::from_offset(min, offset)))
    }

    pub fn read_float(&mut self) -> Result<Option<f32>> {
        Ok(self.read::<u32>()?.map(f32::from_bits))
    }

    /// Fills `buf` with bytes until it is full or the data ends, and returns
    /// how many were read.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut count = 0;
        while count < buf.len() {
            match self.read_byte()? {
                Some(byte) => buf[count] = byte,
                None => break,
            }
            count += 1;
        }
        Ok(count)
    }

    /// Reads up to and including a zero terminator. `None` if the data ends
    /// first.
    pub fn read_string(&mut self) -> Result<Option<String>> {
        let mut bytes = Vec::new();
        loop {
            match self.read_byte()? {
                None => return Ok(None),
                Some(0) => break,
                Some(byte) => bytes.push(byte),
            }
        }
        Ok(Some(String::from_utf8(bytes)?))
    }

    /// Reads `count` bits, most significant first, into the low bits of the
    /// result.
    pub fn read_bits(&mut self, count: u32) -> Result<Option<u32>> {
        if count > 32 {
            return Err(Error::InvalidArgument("cannot read more than 32 bits at once"));
        }
        if count == 0 {
            return Ok(Some(0));
        }
        if !self.ensure(count)? {
            return Ok(None);
        }

        let (value, byte_offset, bit_offset) = self.extract(count);
        self.byte_offset = byte_offset;
        self.bit_offset = bit_offset;
        Ok(Some(value))
    }

    fn stream(&mut self) -> Result<&mut S> {
        self.stream.as_mut().ok_or(Error::Detached)
    }

    fn unread_bits(&self) -> usize {
        bytes_to_bits((self.bytes_read - self.byte_offset) as u64) as usize
            - self.bit_offset as usize
    }

    /// Makes sure at least `bits` unread bits sit in the window, pulling from
    /// the stream as needed. Never moves the logical cursor.
    fn ensure(&mut self, bits: u32) -> Result<bool> {
        if self.bytes_read == 0 {
            // an empty window keeps the bit offset left by a bit seek
            self.fill()?;
        } else if self.byte_offset >= self.bytes_read {
            self.clear_window();
            self.fill()?;
        }
        if self.bytes_read == 0 {
            return Ok(false);
        }

        if self.unread_bits() < bits as usize {
            if self.byte_offset > 0 {
                self.window.shift_left(self.byte_offset);
                self.bytes_read -= self.byte_offset;
                self.byte_offset = 0;
            }
            self.fill()?;
        }
        Ok(self.unread_bits() >= bits as usize)
    }

    /// Tops the window up from the stream.
    fn fill(&mut self) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::Detached)?;
        if !stream.can_read() {
            return Err(Error::NotSupported(Capability::Read));
        }

        while self.bytes_read < self.window.len() {
            let nread = stream.read(&mut self.window[self.bytes_read..])?;
            if nread == 0 {
                break;
            }
            self.bytes_read += nread;
        }
        Ok(())
    }

    /// Collects `count` bits from the cursor onwards and returns them with the
    /// cursor just past them. The caller has checked they are available.
    fn extract(&self, count: u32) -> (u32, usize, u8) {
        let mut byte_offset = self.byte_offset;
        let mut bit_offset = self.bit_offset;
        let mut value = 0u32;

        for i in (0..count).rev() {
            value |= (get_bit(self.window[byte_offset], bit_offset) as u32) << i;
            bit_offset += 1;
            if bit_offset == 8 {
                bit_offset = 0;
                byte_offset += 1;
            }
        }
        (value, byte_offset, bit_offset)
    }

    /// Seeks the stream back over bytes sitting unconsumed in the window, then
    /// empties it.
    fn give_back(&mut self) -> Result<()> {
        let unread = self.bytes_read.saturating_sub(self.byte_offset);
        if unread > 0 {
            let stream = self.stream()?;
            if !stream.can_seek() {
                return Err(Error::NotSupported(Capability::Seek));
            }
            stream.seek(-(unread as i64), SeekOrigin::Current)?;
        }
        self.clear_window();
        Ok(())
    }

    fn clear_window(&mut self) {
        self.bytes_read = 0;
        self.byte_offset = 0;
        self.bit_offset = 0;
    }
}

impl<S: Stream> Drop for BitReader<S> {
    fn drop(&mut self) {
        if self.stream.is_some() {
            let _ = self.give_back();
        }
    }
}
