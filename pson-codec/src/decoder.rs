//! PSON bytes to value tree.

use crate::buffer::{ByteBuffer, ByteOrder};
use crate::config::{Mode, Options};
use crate::dictionary::DecoderDictionary;
use crate::error::CodecError;
use crate::tag::{self, Tag, MAX_INLINE};
use crate::value::{Object, Value};

/// Decodes values, maintaining the index-to-string side of the dictionary.
#[derive(Debug, Clone)]
pub struct Decoder {
    dict: DecoderDictionary,
    mode: Mode,
    options: Options,
}

impl Decoder {
    /// Creates a decoder seeded with `dictionary`.
    pub fn new<I, S>(dictionary: I, mode: Mode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_options(dictionary, mode, Options::default())
    }

    pub fn with_options<I, S>(dictionary: I, mode: Mode, options: Options) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dict: DecoderDictionary::new(dictionary),
            mode,
            options,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Current dictionary entries in index order.
    pub fn dictionary(&self) -> &[String] {
        self.dict.entries()
    }

    /// Decodes exactly one value from `bytes`.
    ///
    /// Bytes left over after the value are an error.
    pub fn decode(&mut self, bytes: &[u8]) -> Result<Value, CodecError> {
        let checkpoint = self.dict.len();
        let mut buf = ByteBuffer::wrap(bytes);
        let value = self.decode_from(&mut buf)?;
        if buf.remaining() > 0 {
            self.dict.truncate(checkpoint);
            return Err(CodecError::TrailingBytes {
                remaining: buf.remaining(),
            });
        }
        Ok(value)
    }

    /// Decodes the next value at `buf`'s cursor, leaving the cursor after it.
    ///
    /// On error the cursor and the dictionary are left as they were.
    pub fn decode_from(&mut self, buf: &mut ByteBuffer) -> Result<Value, CodecError> {
        let checkpoint = self.dict.len();
        let start = buf.offset();

        let mut le = buf.scoped(ByteOrder::Little);
        let result = self.decode_value(&mut le, 0);
        if let Err(e) = &result {
            tracing::debug!(
                "decode failed at offset {}, dropping {} new dictionary entries: {}",
                le.offset(),
                self.dict.len() - checkpoint,
                e
            );
            self.dict.truncate(checkpoint);
            le.rewind(start);
        }
        result
    }

    fn decode_value(&mut self, buf: &mut ByteBuffer, depth: usize) -> Result<Value, CodecError> {
        let offset = buf.offset();
        let byte = buf.read_u8()?;
        if byte <= MAX_INLINE {
            return Ok(Value::Integer(tag::inline_value(byte)));
        }
        let tag = Tag::try_from(byte).map_err(|tag| CodecError::MalformedTag { tag, offset })?;

        Ok(match tag {
            Tag::Null => Value::Null,
            Tag::True => Value::Bool(true),
            Tag::False => Value::Bool(false),
            Tag::EmptyObject => Value::Object(Object::new()),
            Tag::EmptyArray => Value::Array(Vec::new()),
            Tag::Object => {
                let depth = self.enter(depth)?;
                let count = buf.read_varint32()? as usize;
                // Every member needs at least two bytes
                let mut obj = Object::with_capacity(count.min(buf.remaining() / 2));
                for _ in 0..count {
                    let key = self.decode_key(buf)?;
                    let value = self.decode_value(buf, depth)?;
                    obj.push(key, value);
                }
                Value::Object(obj)
            }
            Tag::Array => {
                let depth = self.enter(depth)?;
                let len = buf.read_varint32()? as usize;
                let mut items = Vec::with_capacity(len.min(buf.remaining()));
                for _ in 0..len {
                    items.push(self.decode_value(buf, depth)?);
                }
                Value::Array(items)
            }
            Tag::Integer => Value::Integer(buf.read_zigzag32()? as i64),
            Tag::Long => Value::Integer(buf.read_zigzag64()?),
            Tag::Float => Value::Float(buf.read_f32()? as f64),
            Tag::Double => Value::Float(buf.read_f64()?),
            Tag::EmptyString | Tag::String | Tag::StringAdd | Tag::StringGet => {
                Value::String(self.read_string(tag, buf)?)
            }
            Tag::Binary => {
                let len = buf.read_varint32()? as usize;
                Value::Binary(buf.read_bytes(len)?)
            }
        })
    }

    /// Object keys may only use the string tags.
    fn decode_key(&mut self, buf: &mut ByteBuffer) -> Result<String, CodecError> {
        let offset = buf.offset();
        let byte = buf.read_u8()?;
        match Tag::try_from(byte) {
            Ok(
                tag @ (Tag::EmptyString | Tag::String | Tag::StringAdd | Tag::StringGet),
            ) => self.read_string(tag, buf),
            _ => Err(CodecError::MalformedTag { tag: byte, offset }),
        }
    }

    fn read_string(&mut self, tag: Tag, buf: &mut ByteBuffer) -> Result<String, CodecError> {
        match tag {
            Tag::StringAdd => {
                let s = buf.read_vstring()?;
                self.dict.push(s.clone());
                Ok(s)
            }
            Tag::StringGet => {
                let offset = buf.offset();
                let index = buf.read_varint32()?;
                match self.dict.get(index) {
                    Some(s) => Ok(s.to_owned()),
                    None => Err(CodecError::DictionaryIndexOutOfRange {
                        index,
                        len: self.dict.len(),
                        offset,
                    }),
                }
            }
            Tag::String => buf.read_vstring(),
            _ => Ok(String::new()),
        }
    }

    fn enter(&self, depth: usize) -> Result<usize, CodecError> {
        let depth = depth + 1;
        if depth > self.options.max_depth {
            return Err(CodecError::DepthLimitExceeded {
                max: self.options.max_depth,
            });
        }
        Ok(depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn static_decoder() -> Decoder {
        Decoder::new(Vec::<String>::new(), Mode::Static)
    }

    fn decode(bytes: &[u8]) -> Result<Value, CodecError> {
        static_decoder().decode(bytes)
    }

    #[test]
    fn test_canonical_small_values() {
        assert_eq!(decode(&[0xF0]).unwrap(), Value::Null);
        assert_eq!(decode(&[0xF1]).unwrap(), Value::Bool(true));
        assert_eq!(decode(&[0xF2]).unwrap(), Value::Bool(false));
        assert_eq!(decode(&[0xF3]).unwrap(), Value::Object(Object::new()));
        assert_eq!(decode(&[0xF4]).unwrap(), Value::Array(vec![]));
        assert_eq!(decode(&[0xF5]).unwrap(), Value::from(""));
    }

    #[test]
    fn test_inline_integers() {
        assert_eq!(decode(&[0x00]).unwrap(), Value::Integer(0));
        assert_eq!(decode(&[0x01]).unwrap(), Value::Integer(-1));
        assert_eq!(decode(&[0xEE]).unwrap(), Value::Integer(119));
        assert_eq!(decode(&[0xEF]).unwrap(), Value::Integer(-120));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(decode(&[0xF8, 0xF0, 0x01]).unwrap(), Value::Integer(120));
        assert_eq!(decode(&[0xF9, 0x02]).unwrap(), Value::Integer(1));
        assert_eq!(
            decode(&[0xFA, 0x00, 0x00, 0x80, 0x3E]).unwrap(),
            Value::Float(0.25)
        );
        assert_eq!(
            decode(&[0xFB, 0xBA, 0x49, 0x0C, 0x02, 0x2B, 0x87, 0x86, 0x3F]).unwrap(),
            Value::Float(0.011)
        );
    }

    #[test]
    fn test_object_and_array() {
        let value = decode(&[0xF6, 0x01, 0xFC, 0x01, b'a', 0xFC, 0x01, b'b']).unwrap();
        assert_eq!(value.get("a"), Some(&Value::from("b")));

        let value = decode(&[0xF7, 0x03, 0x02, 0x04, 0x06]).unwrap();
        assert_eq!(
            value,
            Value::Array(vec![Value::from(1), Value::from(2), Value::from(3)])
        );
    }

    #[test]
    fn test_binary() {
        let value = decode(&[0xFF, 0x04, 0xFF, 0xFF, 0xFF, 0xFF]).unwrap();
        assert_eq!(value.as_bytes().unwrap().as_ref(), &[0xFF; 4]);
    }

    #[test]
    fn test_string_add_appends_in_order() {
        let mut dec = Decoder::new(["seed"], Mode::Progressive);
        let bytes = [
            0xF6, 0x02, 0xFD, 0x01, b'x', 0x02, 0xFD, 0x01, b'y', 0xFE, 0x01,
        ];
        let value = dec.decode(&bytes).unwrap();
        assert_eq!(dec.dictionary(), &["seed", "x", "y"]);
        assert_eq!(value.get("x"), Some(&Value::Integer(1)));
        // "y" maps to the entry learned earlier in the same message
        assert_eq!(value.get("y"), Some(&Value::from("x")));
    }

    #[test]
    fn test_mixed_key_tags() {
        let mut dec = Decoder::new(["k1"], Mode::Progressive);
        let bytes = [
            0xF6, 0x03, 0xFE, 0x00, 0x00, 0xFC, 0x02, b'k', b'2', 0x02, 0xF5, 0x04,
        ];
        let value = dec.decode(&bytes).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.keys().collect::<Vec<_>>(), vec!["k1", "k2", ""]);
        assert_eq!(dec.dictionary(), &["k1"]);
    }

    #[test]
    fn test_out_of_range_reference_fails() {
        let result = decode(&[0xFE, 0x00]);
        assert!(matches!(
            result,
            Err(CodecError::DictionaryIndexOutOfRange {
                index: 0,
                len: 0,
                offset: 1
            })
        ));

        let mut dec = Decoder::new(["only"], Mode::Static);
        let result = dec.decode(&[0xF6, 0x01, 0xFE, 0x05, 0xF0]);
        assert!(matches!(
            result,
            Err(CodecError::DictionaryIndexOutOfRange { index: 5, len: 1, .. })
        ));
    }

    #[test]
    fn test_non_string_key_rejected() {
        let result = decode(&[0xF6, 0x01, 0x02, 0xF0]);
        assert!(matches!(
            result,
            Err(CodecError::MalformedTag { tag: 0x02, offset: 2 })
        ));
    }

    #[test]
    fn test_underrun() {
        assert!(matches!(decode(&[]), Err(CodecError::Underrun { .. })));
        assert!(matches!(
            decode(&[0xFB, 0x00, 0x00]),
            Err(CodecError::Underrun { offset: 1, .. })
        ));
        assert!(matches!(
            decode(&[0xF7, 0x02, 0x00]),
            Err(CodecError::Underrun { .. })
        ));
        assert!(matches!(
            decode(&[0xFC, 0x05, b'a']),
            Err(CodecError::Underrun { .. })
        ));
    }

    #[test]
    fn test_overlong_varints_rejected() {
        // INTEGER 0 padded to three bytes
        assert!(matches!(
            decode(&[0xF8, 0x80, 0x80, 0x00]),
            Err(CodecError::InvalidVarint { offset: 1 })
        ));
        // STRING whose length 1 is padded to two bytes
        assert!(matches!(
            decode(&[0xFC, 0x81, 0x00, b'a']),
            Err(CodecError::InvalidVarint { offset: 1 })
        ));
    }

    #[test]
    fn test_huge_declared_length_fails_fast() {
        let result = decode(&[0xF7, 0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
        assert!(matches!(result, Err(CodecError::Underrun { .. })));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut dec = Decoder::new(Vec::<String>::new(), Mode::Progressive);
        let result = dec.decode(&[0xFD, 0x01, b'a', 0x00]);
        assert!(matches!(
            result,
            Err(CodecError::TrailingBytes { remaining: 1 })
        ));
        assert!(dec.dictionary().is_empty());
    }

    #[test]
    fn test_failed_decode_rolls_back_dictionary() {
        let mut dec = Decoder::new(Vec::<String>::new(), Mode::Progressive);
        let bytes = [0xF6, 0x02, 0xFD, 0x01, b'a', 0x00, 0xFE, 0x07];
        assert!(dec.decode(&bytes).is_err());
        assert!(dec.dictionary().is_empty());
    }

    #[test]
    fn test_decode_from_sequential_values() {
        let mut dec = static_decoder();
        let mut buf = ByteBuffer::wrap(&[0xF1, 0x02, 0xFC, 0x01, b'z']);
        assert_eq!(dec.decode_from(&mut buf).unwrap(), Value::Bool(true));
        assert_eq!(dec.decode_from(&mut buf).unwrap(), Value::Integer(1));
        assert_eq!(dec.decode_from(&mut buf).unwrap(), Value::from("z"));
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_decode_from_rewinds_on_error() {
        let mut dec = static_decoder();
        let mut buf = ByteBuffer::wrap(&[0xF1, 0xF7, 0x02, 0x00]);
        dec.decode_from(&mut buf).unwrap();
        assert!(dec.decode_from(&mut buf).is_err());
        assert_eq!(buf.offset(), 1);
        assert_eq!(buf.order(), ByteOrder::Big);
    }

    #[test]
    fn test_depth_limit() {
        let options = Options {
            max_depth: 3,
            ..Options::default()
        };
        let mut dec = Decoder::with_options(Vec::<String>::new(), Mode::Static, options);
        // [[[1]]] is fine, [[[[1]]]] is not
        assert!(dec.decode(&[0xF7, 0x01, 0xF7, 0x01, 0xF7, 0x01, 0x02]).is_ok());
        let result = dec.decode(&[0xF7, 0x01, 0xF7, 0x01, 0xF7, 0x01, 0xF7, 0x01, 0x02]);
        assert!(matches!(
            result,
            Err(CodecError::DepthLimitExceeded { max: 3 })
        ));
    }

    #[test]
    fn test_adversarial_nesting_does_not_overflow_stack() {
        let mut bytes = Vec::new();
        for _ in 0..100_000 {
            bytes.extend_from_slice(&[0xF7, 0x01]);
        }
        bytes.push(0x00);
        let result = decode(&bytes);
        assert!(matches!(result, Err(CodecError::DepthLimitExceeded { .. })));
    }
}
