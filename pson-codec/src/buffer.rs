//! Growable byte buffer with a read cursor and a switchable byte order.
//!
//! The codec writes and reads through this type. Fixed-width floats honour the
//! buffer's current [`ByteOrder`]; encoders and decoders pin the order to
//! little-endian for the duration of one call through [`ByteBuffer::scoped`],
//! which restores the previous order when the guard drops, including on early
//! `?` returns.

use crate::error::CodecError;
use crate::varint::{self, ReadError};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::ops::{Deref, DerefMut};

/// Byte order applied to fixed-width reads and writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ByteOrder {
    #[default]
    Big,
    Little,
}

/// A byte buffer that is appended to at the end and read from a cursor.
#[derive(Debug, Clone, Default)]
pub struct ByteBuffer {
    data: BytesMut,
    offset: usize,
    order: ByteOrder,
}

impl ByteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Wraps existing bytes for reading, cursor at the start.
    pub fn wrap(bytes: &[u8]) -> Self {
        Self {
            data: BytesMut::from(bytes),
            ..Self::default()
        }
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    pub fn set_order(&mut self, order: ByteOrder) {
        self.order = order;
    }

    /// Switches to `order` until the returned guard is dropped.
    pub fn scoped(&mut self, order: ByteOrder) -> OrderGuard<'_> {
        let saved = self.order;
        self.order = order;
        OrderGuard { buf: self, saved }
    }

    /// Read cursor position.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left between the cursor and the end.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Total bytes written.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// All written bytes, regardless of the cursor.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the buffer, returning the bytes from the cursor onward.
    pub fn freeze(mut self) -> Bytes {
        self.data.split_off(self.offset).freeze()
    }

    /// Drops written bytes past `len`.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
        self.offset = self.offset.min(len);
    }

    /// Moves the read cursor back to `offset`.
    pub(crate) fn rewind(&mut self, offset: usize) {
        self.offset = offset.min(self.offset);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.data.put_u8(value);
    }

    pub fn write_f32(&mut self, value: f32) {
        match self.order {
            ByteOrder::Little => self.data.put_f32_le(value),
            ByteOrder::Big => self.data.put_f32(value),
        }
    }

    pub fn write_f64(&mut self, value: f64) {
        match self.order {
            ByteOrder::Little => self.data.put_f64_le(value),
            ByteOrder::Big => self.data.put_f64(value),
        }
    }

    pub fn write_slice(&mut self, bytes: &[u8]) {
        self.data.put_slice(bytes);
    }

    pub fn write_varint32(&mut self, value: u32) {
        varint::write(value, &mut self.data);
    }

    pub fn write_varint64(&mut self, value: u64) {
        varint::write(value, &mut self.data);
    }

    pub fn write_zigzag32(&mut self, value: i32) {
        varint::write_signed::<u32, i32>(value, &mut self.data);
    }

    pub fn write_zigzag64(&mut self, value: i64) {
        varint::write_signed::<u64, i64>(value, &mut self.data);
    }

    /// Writes a length-prefixed byte string.
    pub fn write_vbytes(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        let len = u32::try_from(bytes.len())
            .map_err(|_| CodecError::LengthTooLarge { len: bytes.len() })?;
        self.write_varint32(len);
        self.write_slice(bytes);
        Ok(())
    }

    fn ensure(&self, needed: usize) -> Result<(), CodecError> {
        let remaining = self.remaining();
        if remaining < needed {
            return Err(CodecError::Underrun {
                needed,
                remaining,
                offset: self.offset,
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        self.ensure(1)?;
        let byte = self.data[self.offset];
        self.offset += 1;
        Ok(byte)
    }

    pub fn read_f32(&mut self) -> Result<f32, CodecError> {
        let order = self.order;
        let mut chunk = self.read_array::<4>()?;
        Ok(match order {
            ByteOrder::Little => chunk.get_f32_le(),
            ByteOrder::Big => chunk.get_f32(),
        })
    }

    pub fn read_f64(&mut self) -> Result<f64, CodecError> {
        let order = self.order;
        let mut chunk = self.read_array::<8>()?;
        Ok(match order {
            ByteOrder::Little => chunk.get_f64_le(),
            ByteOrder::Big => chunk.get_f64(),
        })
    }

    fn read_array<const N: usize>(&mut self) -> Result<&[u8], CodecError> {
        self.ensure(N)?;
        let start = self.offset;
        self.offset += N;
        Ok(&self.data[start..start + N])
    }

    /// Reads `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes, CodecError> {
        self.ensure(len)?;
        let start = self.offset;
        self.offset += len;
        Ok(Bytes::copy_from_slice(&self.data[start..start + len]))
    }

    fn read_varint_with<T>(
        &mut self,
        read: impl FnOnce(&mut &[u8]) -> Result<T, ReadError>,
    ) -> Result<T, CodecError> {
        let start = self.offset;
        let mut slice = &self.data[start..];
        let before = slice.len();
        match read(&mut slice) {
            Ok(value) => {
                let consumed = before - slice.remaining();
                self.offset += consumed;
                Ok(value)
            }
            Err(ReadError::EndOfBuffer) => Err(CodecError::Underrun {
                needed: before + 1,
                remaining: before,
                offset: start,
            }),
            Err(ReadError::Overflow | ReadError::Overlong) => {
                Err(CodecError::InvalidVarint { offset: start })
            }
        }
    }

    pub fn read_varint32(&mut self) -> Result<u32, CodecError> {
        self.read_varint_with(|buf| varint::read::<u32>(buf))
    }

    pub fn read_varint64(&mut self) -> Result<u64, CodecError> {
        self.read_varint_with(|buf| varint::read::<u64>(buf))
    }

    pub fn read_zigzag32(&mut self) -> Result<i32, CodecError> {
        self.read_varint_with(|buf| varint::read_signed::<u32, i32>(buf))
    }

    pub fn read_zigzag64(&mut self) -> Result<i64, CodecError> {
        self.read_varint_with(|buf| varint::read_signed::<u64, i64>(buf))
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_vstring(&mut self) -> Result<String, CodecError> {
        let len = self.read_varint32()? as usize;
        self.ensure(len)?;
        let start = self.offset;
        let text = std::str::from_utf8(&self.data[start..start + len])
            .map_err(|_| CodecError::InvalidUtf8 { offset: start })?
            .to_owned();
        self.offset += len;
        Ok(text)
    }
}

impl From<Bytes> for ByteBuffer {
    fn from(bytes: Bytes) -> Self {
        Self::wrap(&bytes)
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self {
            data: BytesMut::from(&bytes[..]),
            ..Self::default()
        }
    }
}

/// Restores a buffer's byte order when dropped.
pub struct OrderGuard<'a> {
    buf: &'a mut ByteBuffer,
    saved: ByteOrder,
}

impl Deref for OrderGuard<'_> {
    type Target = ByteBuffer;

    fn deref(&self) -> &ByteBuffer {
        self.buf
    }
}

impl DerefMut for OrderGuard<'_> {
    fn deref_mut(&mut self) -> &mut ByteBuffer {
        self.buf
    }
}

impl Drop for OrderGuard<'_> {
    fn drop(&mut self) {
        self.buf.order = self.saved;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_order_is_big_endian() {
        let mut buf = ByteBuffer::new();
        assert_eq!(buf.order(), ByteOrder::Big);
        buf.write_f32(0.25);
        assert_eq!(buf.as_slice(), &[0x3E, 0x80, 0x00, 0x00]);
    }

    #[test]
    fn test_scoped_order_restores_on_drop() {
        let mut buf = ByteBuffer::new();
        {
            let mut le = buf.scoped(ByteOrder::Little);
            assert_eq!(le.order(), ByteOrder::Little);
            le.write_f32(0.25);
        }
        assert_eq!(buf.order(), ByteOrder::Big);
        assert_eq!(buf.as_slice(), &[0x00, 0x00, 0x80, 0x3E]);
    }

    #[test]
    fn test_scoped_order_restores_on_error() {
        fn failing(buf: &mut ByteBuffer) -> Result<u8, CodecError> {
            let mut le = buf.scoped(ByteOrder::Little);
            le.read_f64()?;
            Ok(0)
        }

        let mut buf = ByteBuffer::wrap(&[0x01]);
        buf.set_order(ByteOrder::Big);
        assert!(matches!(failing(&mut buf), Err(CodecError::Underrun { .. })));
        assert_eq!(buf.order(), ByteOrder::Big);
    }

    #[test]
    fn test_float_roundtrip_both_orders() {
        for order in [ByteOrder::Big, ByteOrder::Little] {
            let mut buf = ByteBuffer::new();
            buf.set_order(order);
            buf.write_f32(1.5);
            buf.write_f64(0.011);
            assert_eq!(buf.read_f32().unwrap(), 1.5);
            assert_eq!(buf.read_f64().unwrap(), 0.011);
            assert_eq!(buf.remaining(), 0);
        }
    }

    #[test]
    fn test_underrun_reports_offset() {
        let mut buf = ByteBuffer::wrap(&[0xAA, 0xBB]);
        buf.read_u8().unwrap();
        let err = buf.read_bytes(4).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Underrun {
                needed: 4,
                remaining: 1,
                offset: 1
            }
        ));
        // Cursor is untouched by the failed read
        assert_eq!(buf.offset(), 1);
    }

    #[test]
    fn test_varints_advance_cursor() {
        let mut buf = ByteBuffer::new();
        buf.write_varint32(300);
        buf.write_zigzag32(-2);
        buf.write_zigzag64(i64::MAX);
        buf.write_varint64(u64::MAX);

        assert_eq!(buf.read_varint32().unwrap(), 300);
        assert_eq!(buf.offset(), 2);
        assert_eq!(buf.read_zigzag32().unwrap(), -2);
        assert_eq!(buf.read_zigzag64().unwrap(), i64::MAX);
        assert_eq!(buf.read_varint64().unwrap(), u64::MAX);
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_truncated_varint_is_underrun() {
        let mut buf = ByteBuffer::wrap(&[0x80]);
        assert!(matches!(
            buf.read_varint32(),
            Err(CodecError::Underrun { offset: 0, .. })
        ));
    }

    #[test]
    fn test_overflowing_varint_is_invalid() {
        let mut buf = ByteBuffer::wrap(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]);
        assert!(matches!(
            buf.read_varint32(),
            Err(CodecError::InvalidVarint { offset: 0 })
        ));
    }

    #[test]
    fn test_overlong_varint_is_invalid() {
        let mut buf = ByteBuffer::wrap(&[0x01, 0x80, 0x00]);
        assert_eq!(buf.read_varint32().unwrap(), 1);
        assert!(matches!(
            buf.read_zigzag64(),
            Err(CodecError::InvalidVarint { offset: 1 })
        ));
        assert_eq!(buf.offset(), 1);
    }

    #[test]
    fn test_vstring() {
        let mut buf = ByteBuffer::new();
        buf.write_vbytes("héllo".as_bytes()).unwrap();
        assert_eq!(buf.as_slice()[0], 6);
        assert_eq!(buf.read_vstring().unwrap(), "héllo");
    }

    #[test]
    fn test_vstring_invalid_utf8() {
        let mut buf = ByteBuffer::wrap(&[0x02, 0xC3, 0x28]);
        assert!(matches!(
            buf.read_vstring(),
            Err(CodecError::InvalidUtf8 { offset: 1 })
        ));
    }

    #[test]
    fn test_freeze_skips_consumed_bytes() {
        let mut buf = ByteBuffer::wrap(&[1, 2, 3]);
        buf.read_u8().unwrap();
        assert_eq!(buf.freeze().as_ref(), &[2, 3]);
    }
}
