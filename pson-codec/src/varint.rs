//! Base-128 variable-length integers and zig-zag mapping.
//!
//! Each byte carries 7 data bits, least significant group first. The high bit
//! is set iff another byte follows (unsigned LEB128).

use bytes::{Buf, BufMut};
use std::ops::{BitOrAssign, Shl, ShrAssign};

const DATA_BITS_PER_BYTE: usize = 7;
const DATA_BITS_MASK: u8 = 0x7F;
const CONTINUATION_BIT_MASK: u8 = 0x80;

/// Failure modes of [`read`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    /// The buffer ended before the final byte.
    EndOfBuffer,
    /// The encoding sets bits beyond the width of the target type.
    Overflow,
    /// The value has a shorter encoding.
    Overlong,
}

/// Unsigned integers that can be varint encoded.
pub trait UInt:
    Copy
    + From<u8>
    + Sized
    + ShrAssign<usize>
    + Shl<usize, Output = Self>
    + BitOrAssign<Self>
    + PartialOrd
{
    fn leading_zeros(self) -> u32;

    /// Least significant byte.
    fn as_u8(self) -> u8;
}

macro_rules! impl_uint {
    ($type:ty) => {
        impl UInt for $type {
            #[inline]
            fn leading_zeros(self) -> u32 {
                self.leading_zeros()
            }

            #[inline]
            fn as_u8(self) -> u8 {
                self as u8
            }
        }
    };
}
impl_uint!(u32);
impl_uint!(u64);

/// Signed integers with a zig-zag mapping onto the unsigned type of equal width.
///
/// `zigzag(n) = (n << 1) ^ (n >> (w - 1))`, which interleaves non-negative and
/// negative values: 0, -1, 1, -2, 2, ...
pub trait SInt<U: UInt> {
    fn as_zigzag(&self) -> U;

    fn un_zigzag(value: U) -> Self;
}

macro_rules! impl_sint {
    ($type:ty, $utype:ty) => {
        impl SInt<$utype> for $type {
            #[inline]
            fn as_zigzag(&self) -> $utype {
                let shr = std::mem::size_of::<$utype>() * 8 - 1;
                ((self << 1) ^ (self >> shr)) as $utype
            }

            #[inline]
            fn un_zigzag(value: $utype) -> Self {
                ((value >> 1) as $type) ^ (-((value & 1) as $type))
            }
        }
    };
}
impl_sint!(i32, u32);
impl_sint!(i64, u64);

/// Writes an unsigned varint, low groups first.
pub fn write<T: UInt>(mut value: T, buf: &mut impl BufMut) {
    let high = T::from(CONTINUATION_BIT_MASK);
    while value >= high {
        buf.put_u8(value.as_u8() | CONTINUATION_BIT_MASK);
        value >>= DATA_BITS_PER_BYTE;
    }
    buf.put_u8(value.as_u8());
}

/// Reads an unsigned varint in its shortest form.
///
/// A trailing zero group is [`ReadError::Overlong`]; groups that do not fit in
/// `T` are [`ReadError::Overflow`].
pub fn read<T: UInt>(buf: &mut impl Buf) -> Result<T, ReadError> {
    let width = std::mem::size_of::<T>() * 8;
    let mut value = T::from(0);
    let mut shift = 0;

    loop {
        if !buf.has_remaining() {
            return Err(ReadError::EndOfBuffer);
        }
        let byte = buf.get_u8();
        let group = byte & DATA_BITS_MASK;
        let last = byte & CONTINUATION_BIT_MASK == 0;

        // Once at most 7 bits of T are left, this group must be the last
        // and must fit in them.
        let room = width - shift;
        if room <= DATA_BITS_PER_BYTE && (!last || group >> room != 0) {
            return Err(ReadError::Overflow);
        }

        if last {
            if group == 0 && shift > 0 {
                return Err(ReadError::Overlong);
            }
            value |= T::from(group) << shift;
            return Ok(value);
        }

        value |= T::from(group) << shift;
        shift += DATA_BITS_PER_BYTE;
    }
}

/// Number of bytes needed to encode `value`.
pub fn size<T: UInt>(value: T) -> usize {
    let total_bits = std::mem::size_of::<T>() * 8;
    let data_bits = total_bits - value.leading_zeros() as usize;
    usize::max(1, data_bits.div_ceil(DATA_BITS_PER_BYTE))
}

/// Writes a signed integer as a zig-zag varint.
pub fn write_signed<U: UInt, S: SInt<U>>(value: S, buf: &mut impl BufMut) {
    write(value.as_zigzag(), buf);
}

/// Reads a zig-zag varint into a signed integer.
pub fn read_signed<U: UInt, S: SInt<U>>(buf: &mut impl Buf) -> Result<S, ReadError> {
    Ok(S::un_zigzag(read(buf)?))
}
