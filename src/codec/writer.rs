use crate::error::{Capability, Error, Result};
use crate::stream::{SeekOrigin, Stream};

use super::ByteBuffer;
use super::bits::{RangedInt, bytes_to_bits, range_width, set_bit};

/// 64 bits, enough for any single value without an intermediate flush.
pub const DEFAULT_CAPACITY: usize = 8;

/// Packs values into the fewest bits their declared range allows and writes
/// them to a [`Stream`], most significant bit first.
///
/// Bits are collected in a small buffer that is written out whenever it
/// fills, on [`flush`](BitWriter::flush), before a seek, and on drop. A final
/// partial byte is padded with zeros in its low bits.
///
/// The writer does not need to own the stream: pass `&mut stream` to borrow it.
pub struct BitWriter<S: Stream> {
    stream: Option<S>,
    buffer: ByteBuffer,
    byte_offset: usize,
    bit_offset: u8,
    // set after a bit seek, the buffer mirrors what is already in the stream
    read_back: bool,
}

impl<S: Stream> BitWriter<S> {
    pub fn new(stream: S) -> Self {
        Self::with_capacity(stream, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(stream: S, capacity: usize) -> Self {
        BitWriter {
            stream: Some(stream),
            buffer: ByteBuffer::new(capacity.max(1)),
            byte_offset: 0,
            bit_offset: 0,
            read_back: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// The underlying stream, or `None` once the writer has been closed.
    pub fn get_ref(&self) -> Option<&S> {
        self.stream.as_ref()
    }

    /// Writes out pending bits and returns the stream.
    pub fn into_inner(mut self) -> Result<S> {
        self.write_pending()?;
        self.stream.take().ok_or(Error::Detached)
    }

    /// Writes out pending bits, then closes and detaches the stream.
    pub fn close(&mut self) -> Result<()> {
        if self.stream.is_some() {
            self.write_pending()?;
        }
        if let Some(mut stream) = self.stream.take() {
            stream.close()?;
        }
        Ok(())
    }

    /// Writes every buffered byte, including a partially filled one, and
    /// flushes the stream.
    pub fn flush(&mut self) -> Result<()> {
        self.stream()?;
        self.flush_write()?;
        self.stream()?.flush()
    }

    /// Byte-level seek. Pending bits are written first.
    pub fn seek(&mut self, offset: i64, origin: SeekOrigin) -> Result<u64> {
        if !self.stream()?.can_seek() {
            return Err(Error::NotSupported(Capability::Seek));
        }

        self.write_pending()?;
        self.read_back = false;
        self.stream()?.seek(offset, origin)
    }

    /// Position of the next bit to be written, counted from the start of the
    /// stream.
    pub fn bit_position(&self) -> Result<u64> {
        let stream = self.stream.as_ref().ok_or(Error::Detached)?;
        Ok(bytes_to_bits(stream.position() + self.byte_offset as u64) + self.bit_offset as u64)
    }

    /// Moves the cursor to an arbitrary bit and returns the new absolute bit
    /// position.
    ///
    /// The bytes at the target are read back into the buffer first, so bits on
    /// either side of the ones written afterwards keep their values. This needs
    /// a stream that can both read and seek. Seeking past the end pads the
    /// stream with zero bytes.
    pub fn seek_bits(&mut self, bits: i64, origin: SeekOrigin) -> Result<u64> {
        let stream = self.stream()?;
        if !stream.can_read() {
            return Err(Error::NotSupported(Capability::Read));
        }
        if !stream.can_seek() {
            return Err(Error::NotSupported(Capability::Seek));
        }

        let current = self.bit_position()?;
        self.write_pending()?;

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
        let byte = target / 8;
        let landed = stream.seek(byte as i64, SeekOrigin::Begin)?;
        if landed < byte {
            stream.write(&vec![0; (byte - landed) as usize])?;
        }

        self.load_existing()?;
        self.byte_offset = 0;
        self.bit_offset = (target % 8) as u8;
        self.read_back = true;
        Ok(target)
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_bits(value as u32, 1)
    }

    pub fn write_byte(&mut self, value: u8) -> Result<()> {
        self.write(value)
    }

    pub fn write_char(&mut self, value: i8) -> Result<()> {
        self.write(value)
    }

    /// Writes a value using the full range of its type.
    pub fn write<T: RangedInt>(&mut self, value: T) -> Result<()> {
        self.write_in_range(value, T::min_value(), T::max_value())
    }

    /// Writes `value` as its offset from `min`, in just enough bits for the
    /// inclusive range `[min, max]`. The reader must use the same bounds.
    pub fn write_in_range<T: RangedInt>(&mut self, value: T, min: T, max: T) -> Result<()> {
        let width = range_width(min, max)?;
        if value < min || value > max {
            return Err(Error::InvalidArgument("value outside of declared range"));
        }
        self.write_bits(value.offset_from(min), width)
    }

    /// The IEEE-754 bit pattern, 32 bits.
    pub fn write_float(&mut self, value: f32) -> Result<()> {
        self.write(value.to_bits())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        for &byte in bytes {
            self.write_byte(byte)?;
        }
        Ok(())
    }

    /// The UTF-8 bytes followed by a zero terminator.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        if value.contains('\0') {
            return Err(Error::InvalidArgument("string contains a nul byte"));
        }
        self.write_bytes(value.as_bytes())?;
        self.write_byte(0)
    }

    /// Writes the `count` least significant bits of `value`, most significant
    /// first.
    pub fn write_bits(&mut self, value: u32, count: u32) -> Result<()> {
        if count > 32 {
            return Err(Error::InvalidArgument("cannot write more than 32 bits at once"));
        }
        if !self.stream()?.can_write() {
            return Err(Error::NotSupported(Capability::Write));
        }

        if count == 8 && self.bit_offset == 0 {
            self.buffer[self.byte_offset] = value as u8;
            self.byte_offset += 1;
            if self.byte_offset == self.buffer.len() {
                self.flush_write()?;
            }
            return Ok(());
        }

        for i in (0..count).rev() {
            set_bit(
                &mut self.buffer[self.byte_offset],
                self.bit_offset,
                (value >> i) & 1 == 1,
            );
            self.advance()?;
        }
        Ok(())
    }

    fn stream(&mut self) -> Result<&mut S> {
        self.stream.as_mut().ok_or(Error::Detached)
    }

    fn advance(&mut self) -> Result<()> {
        self.bit_offset += 1;
        if self.bit_offset == 8 {
            self.bit_offset = 0;
            self.byte_offset += 1;
            if self.byte_offset == self.buffer.len() {
                self.flush_write()?;
            }
        }
        Ok(())
    }

    fn flush_write(&mut self) -> Result<()> {
        self.write_pending()?;
        if self.read_back {
            self.load_existing()?;
        }
        Ok(())
    }

    /// Writes the touched part of the buffer and resets the cursor.
    fn write_pending(&mut self) -> Result<()> {
        let length = self.byte_offset + (self.bit_offset > 0) as usize;
        if length > 0 {
            let stream = self.stream.as_mut().ok_or(Error::Detached)?;
            stream.write(&self.buffer[..length])?;
        }
        self.buffer.clear();
        self.byte_offset = 0;
        self.bit_offset = 0;
        Ok(())
    }

    /// Fills the buffer with the bytes at the current stream position and
    /// seeks back, so the next write lands on top of them.
    fn load_existing(&mut self) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::Detached)?;
        self.buffer.clear();

        let mut filled = 0;
        while filled < self.buffer.len() {
            let nread = stream.read(&mut self.buffer[filled..])?;
            if nread == 0 {
                break;
            }
            filled += nread;
        }
        if filled > 0 {
            stream.seek(-(filled as i64), SeekOrigin::Current)?;
        }
        Ok(())
    }
}

impl<S: Stream> Drop for BitWriter<S> {
    fn drop(&mut self) {
        if self.stream.is_some() {
            let _ = self.write_pending();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryStream;

    /// Write-only, unseekable sink.
    struct Sink(Vec<u8>);

    impl Stream for Sink {
        fn read(&mut self, _buf: &mut [u8]) -> Result<usize> {
            Err(Error::NotSupported(Capability::Read))
        }
        fn write(&mut self, buf: &[u8]) -> Result<()> {
            self.0.extend_from_slice(buf);
            Ok(())
        }
        fn position(&self) -> u64 {
            self.0.len() as u64
        }
        fn len(&self) -> Result<u64> {
            Ok(self.0.len() as u64)
        }
        fn set_len(&mut self, _len: u64) -> Result<()> {
            Err(Error::NotSupported(Capability::Seek))
        }
        fn seek(&mut self, _offset: i64, _origin: SeekOrigin) -> Result<u64> {
            Err(Error::NotSupported(Capability::Seek))
        }
        fn can_read(&self) -> bool {
            false
        }
        fn can_seek(&self) -> bool {
            false
        }
        fn can_write(&self) -> bool {
            true
        }
        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
        fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn written(f: impl FnOnce(&mut BitWriter<&mut MemoryStream>)) -> Vec<u8> {
        let mut ms = MemoryStream::new();
        {
            let mut bw = BitWriter::new(&mut ms);
            f(&mut bw);
            bw.flush().unwrap();
        }
        ms.into_inner()
    }

    #[test]
    fn bits_are_msb_first() {
        let bytes = written(|bw| {
            bw.write_bits(0b101, 3).unwrap();
            bw.write_bits(0b11, 2).unwrap();
        });
        assert_eq!(bytes, vec![0b1011_1000]);
    }

    #[test]
    fn values_straddle_bytes() {
        let bytes = written(|bw| {
            bw.write_bool(true).unwrap();
            bw.write_byte(0xFF).unwrap();
            bw.write_byte(0x00).unwrap();
            bw.write_byte(0x0A).unwrap();
        });
        assert_eq!(bytes, vec![0xFF, 0x80, 0x05, 0x00]);
    }

    #[test]
    fn ranged_values_use_minimal_width() {
        let bytes = written(|bw| {
            bw.write_in_range(5u32, 2, 7).unwrap();
            assert_eq!(bw.bit_position().unwrap(), 3);
            bw.write_in_range(-1i32, -4, 3).unwrap();
            assert_eq!(bw.bit_position().unwrap(), 6);
        });
        // 5 - 2 = 0b011, -1 - -4 = 0b011
        assert_eq!(bytes, vec![0b0110_1100]);
    }

    #[test]
    fn full_range_widths() {
        let bytes = written(|bw| {
            bw.write(u32::MAX).unwrap();
            bw.write(i16::MIN).unwrap();
            bw.write_char(-1).unwrap();
        });
        assert_eq!(bytes, vec![0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x7F]);
    }

    #[test]
    fn float_is_its_bit_pattern() {
        let bytes = written(|bw| bw.write_float(1.0).unwrap());
        assert_eq!(bytes, 1.0f32.to_bits().to_be_bytes().to_vec());
    }

    #[test]
    fn string_is_nul_terminated() {
        let bytes = written(|bw| bw.write_string("hi").unwrap());
        assert_eq!(bytes, b"hi\0".to_vec());
    }

    #[test]
    fn buffer_spills_when_full() {
        let mut ms = MemoryStream::new();
        let mut bw = BitWriter::with_capacity(&mut ms, 2);
        bw.write_bytes(&[1, 2, 3]).unwrap();
        assert_eq!(bw.get_ref().unwrap().as_slice(), &[1, 2]);
        assert_eq!(bw.bit_position().unwrap(), 24);
        bw.flush().unwrap();
        drop(bw);
        assert_eq!(ms.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn drop_writes_pending_bits() {
        let mut ms = MemoryStream::new();
        {
            let mut bw = BitWriter::new(&mut ms);
            bw.write_bits(0b1, 1).unwrap();
        }
        assert_eq!(ms.as_slice(), &[0x80]);
    }

    #[test]
    fn bit_seek_overwrites_in_place() {
        let bytes = written(|bw| {
            bw.write_byte(0).unwrap();
            bw.write_byte(0).unwrap();

            bw.seek_bits(2, SeekOrigin::Begin).unwrap();
            bw.write_bool(true).unwrap();
            assert_eq!(bw.seek_bits(4, SeekOrigin::Current).unwrap(), 7);
            bw.write_bool(true).unwrap();
            bw.write_bool(true).unwrap();
            assert_eq!(bw.seek_bits(-2, SeekOrigin::End).unwrap(), 14);
            bw.write_bool(true).unwrap();
        });
        assert_eq!(bytes, vec![0b0010_0001, 0b1000_0010]);
    }

    #[test]
    fn bit_seek_preserves_neighbouring_bits() {
        let mut ms = MemoryStream::from(vec![0xFF; 12]);
        {
            let mut bw = BitWriter::with_capacity(&mut ms, 2);
            bw.seek_bits(3, SeekOrigin::Begin).unwrap();
            bw.write_bits(0, 2).unwrap();
            // runs off the end of the two byte buffer while overwriting
            bw.seek_bits(62, SeekOrigin::Begin).unwrap();
            bw.write_bits(0, 12).unwrap();
            bw.flush().unwrap();
        }
        let mut expected = vec![0xFF; 12];
        expected[0] = 0b1110_0111;
        expected[7] = 0b1111_1100;
        expected[8] = 0;
        expected[9] = 0b0011_1111;
        assert_eq!(ms.as_slice(), expected.as_slice());
    }

    #[test]
    fn bit_seek_past_end_pads_with_zeros() {
        let bytes = written(|bw| {
            bw.seek_bits(17, SeekOrigin::Begin).unwrap();
            bw.write_bool(true).unwrap();
        });
        assert_eq!(bytes, vec![0, 0, 0b0100_0000]);
    }

    #[test]
    fn bit_seek_before_start_is_rejected() {
        let mut ms = MemoryStream::new();
        let mut bw = BitWriter::new(&mut ms);
        assert!(matches!(
            bw.seek_bits(-1, SeekOrigin::Begin),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn out_of_range_value_is_rejected() {
        let mut ms = MemoryStream::new();
        let mut bw = BitWriter::new(&mut ms);
        assert!(matches!(
            bw.write_in_range(8u32, 2, 7),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            bw.write_in_range(3u32, 7, 7),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            bw.write_bits(0, 33),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn read_only_stream_cannot_be_written() {
        let mut bw = BitWriter::new(MemoryStream::read_only(vec![]));
        assert!(matches!(
            bw.write_bool(true),
            Err(Error::NotSupported(Capability::Write))
        ));
    }

    #[test]
    fn unseekable_stream() {
        let mut bw = BitWriter::new(Sink(Vec::new()));
        bw.write_in_range(3u8, 0, 3).unwrap();
        assert!(matches!(
            bw.seek(0, SeekOrigin::Begin),
            Err(Error::NotSupported(Capability::Seek))
        ));
        assert!(matches!(
            bw.seek_bits(0, SeekOrigin::Begin),
            Err(Error::NotSupported(Capability::Read))
        ));
        let sink = bw.into_inner().unwrap();
        assert_eq!(sink.0, vec![0b1100_0000]);
    }

    #[test]
    fn closed_writer_is_detached() {
        let mut ms = MemoryStream::new();
        let mut bw = BitWriter::new(&mut ms);
        bw.write_byte(1).unwrap();
        bw.close().unwrap();
        assert!(bw.get_ref().is_none());
        assert!(matches!(bw.write_byte(2), Err(Error::Detached)));
        assert!(matches!(bw.flush(), Err(Error::Detached)));
        drop(bw);
        assert!(!ms.can_write());
    }

    #[test]
    fn byte_seek_writes_pending_first() {
        let bytes = written(|bw| {
            bw.write_bytes(&[1, 2, 3]).unwrap();
            bw.seek(1, SeekOrigin::Begin).unwrap();
            bw.write_byte(9).unwrap();
        });
        assert_eq!(bytes, vec![1, 9, 3]);
    }
}
