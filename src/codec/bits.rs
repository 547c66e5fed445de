use num::{Bounded, Integer, PrimInt};

use crate::error::{Error, Result};

/// Spans at or above this are always given the full 32 bits.
pub const FULL_WIDTH_SPAN: u32 = 0x7FF_FFFF;

pub fn bytes_to_bits(bytes: u64) -> u64 {
    bytes * 8
}

/// Rounds up, a partial byte still occupies a whole one.
pub fn bits_to_bytes(bits: u64) -> u64 {
    Integer::div_ceil(&bits, &8)
}

/// Number of bits needed to tell apart `distinct_values` values (0..n-1).
pub fn bits_required(distinct_values: u32) -> Result<u32> {
    if distinct_values <= 1 {
        return Err(Error::InvalidArgument(
            "there should be more than 1 distinct value",
        ));
    }

    // largest representable value, all ones in the bits we need
    let mut max = distinct_values - 1;
    for index in 0..32 {
        if max & !1 == 0 {
            return Ok(index + 1);
        }
        max >>= 1;
    }
    Ok(32)
}

/// Number of bits needed for any value in the inclusive range `[min, max]`.
pub fn bits_required_range(min: u32, max: u32) -> Result<u32> {
    if max <= min {
        return Err(Error::InvalidArgument("max should be greater than min"));
    }
    if max - min >= FULL_WIDTH_SPAN {
        return Ok(32);
    }
    bits_required(max - min + 1)
}

/// Bit `index` of `byte`, where 0 is the most significant bit.
#[inline]
pub fn get_bit(byte: u8, index: u8) -> bool {
    debug_assert!(index < 8);
    (byte >> (7 - index)) & 1 == 1
}

/// Assigns bit `index` of `byte`, where 0 is the most significant bit.
#[inline]
pub fn set_bit(byte: &mut u8, index: u8, value: bool) {
    debug_assert!(index < 8);
    let mask = 1u8 << (7 - index);
    if value {
        *byte |= mask;
    } else {
        *byte &= !mask;
    }
}

/// An integer that can be packed relative to the minimum of its declared range.
///
/// The offset is `value - min` computed with wrapping arithmetic in the
/// unsigned type of the same width, so the full signed range of every type
/// maps onto `0..=MAX` of its unsigned twin without overflow.
pub trait RangedInt: PrimInt + Bounded {
    fn offset_from(self, min: Self) -> u32;

    fn from_offset(min: Self, offset: u32) -> Self;
}

macro_rules! ranged_int {
    ($($t:ty => $u:ty),* $(,)?) => {$(
        impl RangedInt for $t {
            #[inline]
            fn offset_from(self, min: Self) -> u32 {
                (self as $u).wrapping_sub(min as $u) as u32
            }

            #[inline]
            fn from_offset(min: Self, offset: u32) -> Self {
                (min as $u).wrapping_add(offset as $u) as $t
            }
        }
    )*};
}

ranged_int!(u8 => u8, i8 => u8, u16 => u16, i16 => u16, u32 => u32, i32 => u32);

/// Bit width of a typed range, shared by the writer and the reader.
pub fn range_width<T: RangedInt>(min: T, max: T) -> Result<u32> {
    if max <= min {
        return Err(Error::InvalidArgument("max should be greater than min"));
    }
    bits_required_range(0, max.offset_from(min))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_bit_conversion() {
        assert_eq!(bits_to_bytes(8), 1);
        assert_eq!(bits_to_bytes(5), 1);
        assert_eq!(bits_to_bytes(0), 0);
        assert_eq!(bits_to_bytes(9), 2);
        assert_eq!(bytes_to_bits(1), 8);
        assert_eq!(bytes_to_bits(3), 24);
    }

    #[test]
    fn distinct_values() {
        assert_eq!(bits_required(2).unwrap(), 1);
        assert_eq!(bits_required(3).unwrap(), 2);
        assert_eq!(bits_required(4).unwrap(), 2);
        assert_eq!(bits_required(5).unwrap(), 3);
        assert_eq!(bits_required(256).unwrap(), 8);
        assert_eq!(bits_required(257).unwrap(), 9);
        assert_eq!(bits_required(u32::MAX).unwrap(), 32);
    }

    #[test]
    fn too_few_distinct_values() {
        assert!(matches!(bits_required(0), Err(Error::InvalidArgument(_))));
        assert!(matches!(bits_required(1), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn range_widths() {
        assert_eq!(bits_required_range(2, 7).unwrap(), 3);
        assert_eq!(bits_required_range(0, 1).unwrap(), 1);
        assert_eq!(bits_required_range(0, 255).unwrap(), 8);
        assert_eq!(bits_required_range(100, 355).unwrap(), 8);
        assert_eq!(bits_required_range(0, u32::MAX).unwrap(), 32);
    }

    #[test]
    fn range_width_matches_log2() {
        for span in 1u32..5000 {
            let expected = 32 - span.leading_zeros();
            assert_eq!(bits_required_range(0, span).unwrap(), expected, "span {span}");
        }
    }

    #[test]
    fn wide_spans_take_all_bits() {
        assert_eq!(bits_required_range(0, FULL_WIDTH_SPAN - 1).unwrap(), 27);
        assert_eq!(bits_required_range(0, FULL_WIDTH_SPAN).unwrap(), 32);
        assert_eq!(bits_required_range(5, FULL_WIDTH_SPAN + 5).unwrap(), 32);
    }

    #[test]
    fn empty_range_is_rejected() {
        assert!(matches!(
            bits_required_range(7, 7),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            bits_required_range(9, 2),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn bit_numbering() {
        let byte = 0b1000_0010;
        assert!(get_bit(byte, 0));
        assert!(!get_bit(byte, 1));
        assert!(get_bit(byte, 6));
        assert!(!get_bit(byte, 7));

        let mut b = 0u8;
        set_bit(&mut b, 2, true);
        set_bit(&mut b, 7, true);
        assert_eq!(b, 0b0010_0001);
        set_bit(&mut b, 2, false);
        assert_eq!(b, 0b0000_0001);
    }

    #[test]
    fn signed_offsets() {
        assert_eq!((-10i8).offset_from(i8::MIN), 118);
        assert_eq!(i8::from_offset(i8::MIN, 118), -10);
        assert_eq!(i32::MAX.offset_from(i32::MIN), u32::MAX);
        assert_eq!(i32::from_offset(i32::MIN, u32::MAX), i32::MAX);
        assert_eq!(5i16.offset_from(-3), 8);
        assert_eq!(i16::from_offset(-3, 8), 5);
    }

    #[test]
    fn typed_widths() {
        assert_eq!(range_width(u8::MIN, u8::MAX).unwrap(), 8);
        assert_eq!(range_width(i8::MIN, i8::MAX).unwrap(), 8);
        assert_eq!(range_width(i16::MIN, i16::MAX).unwrap(), 16);
        assert_eq!(range_width(i32::MIN, i32::MAX).unwrap(), 32);
        assert_eq!(range_width(-4i32, 3).unwrap(), 3);
        assert_eq!(range_width(8u32, 9).unwrap(), 1);
        assert!(range_width(3i32, -3).is_err());
    }
}
