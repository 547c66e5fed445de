pub mod bits;
mod buffer;
pub mod reader;
pub mod writer;

pub use bits::{
    RangedInt, bits_required, bits_required_range, bits_to_bytes, bytes_to_bits, get_bit,
    range_width, set_bit,
};
pub use buffer::ByteBuffer;
pub use reader::BitReader;
pub use writer::BitWriter;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{MemoryStream, SeekOrigin, Stream};

    #[test]
    fn writer_reader_share_a_stream() {
        let mut ms = MemoryStream::new();

        let mut bw = BitWriter::new(&mut ms);
        bw.write_bool(true).unwrap();
        bw.write_in_range(200u16, 100, 300).unwrap();
        bw.write_in_range(-3i8, -8, 7).unwrap();
        bw.write_string("bits").unwrap();
        bw.write_float(-2.5).unwrap();
        bw.flush().unwrap();
        drop(bw);

        ms.seek(0, SeekOrigin::Begin).unwrap();
        let mut br = BitReader::new(&mut ms);
        assert_eq!(br.read_bool().unwrap(), Some(true));
        assert_eq!(br.read_in_range(100u16, 300).unwrap(), Some(200));
        assert_eq!(br.read_in_range(-8i8, 7).unwrap(), Some(-3));
        assert_eq!(br.read_string().unwrap().as_deref(), Some("bits"));
        assert_eq!(br.read_float().unwrap(), Some(-2.5));
        assert_eq!(br.read_bool().unwrap(), Some(false));
    }

    #[test]
    fn encoded_size_is_the_sum_of_widths() {
        let mut ms = MemoryStream::new();
        {
            let mut bw = BitWriter::new(&mut ms);
            for v in 0..10u32 {
                bw.write_in_range(v, 0, 9).unwrap();
            }
            assert_eq!(bw.bit_position().unwrap(), 40);
        }
        assert_eq!(ms.len().unwrap(), bits_to_bytes(40));
    }
}
