//! Encoder and decoder pairs sharing dictionary semantics.

use crate::buffer::ByteBuffer;
use crate::config::{CodecConfig, Mode, Options};
use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::{CodecError, ConfigError};
use crate::value::{freeze, unfreeze, Value};
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;

/// One encoder and one decoder built from the same initial dictionary and mode.
///
/// In progressive mode, decoding the output of this pair's own encoder in the
/// order it was produced keeps both dictionaries in lockstep.
#[derive(Debug, Clone)]
pub struct Pair {
    encoder: Encoder,
    decoder: Decoder,
}

impl Pair {
    pub fn new<I, S>(mode: Mode, dictionary: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_options(mode, dictionary, Options::default())
    }

    pub fn with_options<I, S>(mode: Mode, dictionary: I, options: Options) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let dictionary: Vec<String> = dictionary.into_iter().map(Into::into).collect();
        Self {
            encoder: Encoder::with_options(dictionary.clone(), mode, options),
            decoder: Decoder::with_options(dictionary, mode, options),
        }
    }

    /// A pair whose dictionary never grows.
    pub fn fixed<I, S>(dictionary: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Mode::Static, dictionary)
    }

    /// A pair whose dictionary grows as new strings are encoded.
    pub fn progressive<I, S>(dictionary: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Mode::Progressive, dictionary)
    }

    /// Builds a pair from configuration, reading the dictionary file if one is set.
    pub fn from_config(config: &CodecConfig) -> Result<Self, ConfigError> {
        Ok(Self::with_options(
            config.mode,
            config.initial_dictionary()?,
            config.options(),
        ))
    }

    pub fn mode(&self) -> Mode {
        self.encoder.mode()
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn encode(&mut self, value: &Value) -> Result<Bytes, CodecError> {
        self.encoder.encode(value)
    }

    pub fn encode_into(&mut self, value: &Value, buf: &mut ByteBuffer) -> Result<(), CodecError> {
        self.encoder.encode_into(value, buf)
    }

    /// Encodes straight to an owned byte vector.
    pub fn to_vec(&mut self, value: &Value) -> Result<Vec<u8>, CodecError> {
        Ok(self.encode(value)?.to_vec())
    }

    /// Encodes any JSON-serializable value.
    pub fn encode_json<T: serde::Serialize>(&mut self, value: &T) -> Result<Bytes, CodecError> {
        let value = Value::try_from(serde_json::to_value(value)?)?;
        self.encode(&value)
    }

    pub fn decode(&mut self, bytes: &[u8]) -> Result<Value, CodecError> {
        self.decoder.decode(bytes)
    }

    pub fn decode_from(&mut self, buf: &mut ByteBuffer) -> Result<Value, CodecError> {
        self.decoder.decode_from(buf)
    }

    /// Decodes into any JSON-deserializable type.
    pub fn decode_json<T: serde::de::DeserializeOwned>(
        &mut self,
        bytes: &[u8],
    ) -> Result<T, CodecError> {
        let value = self.decode(bytes)?;
        Ok(serde_json::from_value(serde_json::Value::from(value))?)
    }

    /// Keeps `value`'s keys and everything below it out of the dictionary.
    pub fn exclude(&self, value: &mut Value) {
        freeze(value);
    }

    /// Undoes [`Pair::exclude`].
    pub fn include(&self, value: &mut Value) {
        unfreeze(value);
    }
}

/// A [`Pair`] behind a mutex, for sharing one session between threads.
///
/// Each call holds the lock for the whole encode or decode, so dictionary
/// indices are assigned and learned in a single total order.
#[derive(Debug, Clone)]
pub struct SharedPair {
    inner: Arc<Mutex<Pair>>,
}

impl SharedPair {
    pub fn new(pair: Pair) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pair)),
        }
    }

    pub fn encode(&self, value: &Value) -> Result<Bytes, CodecError> {
        self.inner.lock().encode(value)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        self.inner.lock().decode(bytes)
    }

    /// Encodes and immediately decodes, advancing both dictionaries together.
    pub fn roundtrip(&self, value: &Value) -> Result<(Bytes, Value), CodecError> {
        let mut pair = self.inner.lock();
        let bytes = pair.encode(value)?;
        let decoded = pair.decode(&bytes)?;
        Ok((bytes, decoded))
    }

    /// Runs `f` with exclusive access to the pair.
    pub fn with<R>(&self, f: impl FnOnce(&mut Pair) -> R) -> R {
        let mut pair = self.inner.lock();
        f(&mut *pair)
    }
}

impl From<Pair> for SharedPair {
    fn from(pair: Pair) -> Self {
        Self::new(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Object;
    use serde::{Deserialize, Serialize};
    use std::thread;

    fn sample() -> Value {
        Value::try_from(serde_json::json!({
            "hello": "world!",
            "time": 1234567890,
            "float": 0.01234,
            "boolean": true,
            "otherbool": false,
            "null": null,
            "obj": {"what": "that"},
            "arr": [1, 2, 3],
        }))
        .unwrap()
    }

    #[test]
    fn test_static_roundtrip_with_dictionary() {
        let mut pair = Pair::fixed([
            "hello",
            "time",
            "float",
            "boolean",
            "otherbool",
            "null",
            "obj",
            "what",
            "arr",
        ]);
        let data = sample();
        let bytes = pair.encode(&data).unwrap();
        assert_eq!(pair.decode(&bytes).unwrap(), data);

        let plain = Pair::fixed(Vec::<String>::new()).encode(&data).unwrap();
        assert!(bytes.len() < plain.len());
    }

    #[test]
    fn test_progressive_roundtrip_shrinks() {
        let mut pair = Pair::progressive(Vec::<String>::new());
        let data = sample();

        let first = pair.encode(&data).unwrap();
        assert_eq!(pair.decode(&first).unwrap(), data);

        let second = pair.encode(&data).unwrap();
        assert_eq!(pair.decode(&second).unwrap(), data);
        assert!(second.len() < first.len());
        assert_eq!(pair.encoder().dictionary(), pair.decoder().dictionary());
    }

    #[test]
    fn test_static_pair_output_is_stable() {
        let mut pair = Pair::fixed(["time"]);
        let data = sample();
        let first = pair.encode(&data).unwrap();
        let second = pair.encode(&data).unwrap();
        assert_eq!(first, second);
        assert_eq!(pair.encoder().dictionary(), &["time"]);
    }

    #[test]
    fn test_exclude_and_include() {
        let mut pair = Pair::progressive(Vec::<String>::new());
        let mut value = Value::Object([("once", 1)].into_iter().collect::<Object>());

        pair.exclude(&mut value);
        let bytes = pair.encode(&value).unwrap();
        assert!(!bytes.contains(&0xFD));
        assert!(pair.encoder().dictionary().is_empty());

        pair.include(&mut value);
        let bytes = pair.encode(&value).unwrap();
        assert!(bytes.contains(&0xFD));
        assert_eq!(pair.encoder().dictionary(), &["once"]);
    }

    #[test]
    fn test_serde_bridge() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Reading {
            sensor: String,
            value: f64,
            tags: Vec<String>,
        }

        let reading = Reading {
            sensor: "t-1".into(),
            value: 21.5,
            tags: vec!["indoor".into()],
        };

        let mut pair = Pair::progressive(Vec::<String>::new());
        let bytes = pair.encode_json(&reading).unwrap();
        let decoded: Reading = pair.decode_json(&bytes).unwrap();
        assert_eq!(decoded, reading);
    }

    #[test]
    fn test_from_config() {
        let config = CodecConfig {
            mode: Mode::Progressive,
            dictionary: vec!["a".into()],
            ..CodecConfig::default()
        };
        let pair = Pair::from_config(&config).unwrap();
        assert_eq!(pair.mode(), Mode::Progressive);
        assert_eq!(pair.encoder().dictionary(), &["a"]);
        assert_eq!(pair.decoder().dictionary(), &["a"]);
    }

    #[test]
    fn test_to_vec() {
        let mut pair = Pair::fixed(Vec::<String>::new());
        assert_eq!(pair.to_vec(&Value::Null).unwrap(), vec![0xF0]);
    }

    #[test]
    fn test_shared_pair_across_threads() {
        let shared = SharedPair::new(Pair::progressive(Vec::<String>::new()));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        let value = Value::Object(
                            [(format!("key-{}", i % 5), Value::from(t))]
                                .into_iter()
                                .collect(),
                        );
                        let (_, decoded) = shared.roundtrip(&value).unwrap();
                        assert_eq!(decoded, value);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        shared.with(|pair| {
            assert_eq!(pair.encoder().dictionary(), pair.decoder().dictionary());
            assert_eq!(pair.encoder().dictionary().len(), 5);
        });
    }
}
