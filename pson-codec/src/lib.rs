//! # pson-codec
//!
//! Encoder and decoder for PSON, a compact binary encoding of the JSON data model.
//!
//! This crate provides:
//! - Single-byte tags with inline small integers and zig-zag varints
//! - Static and progressive string dictionaries kept in lockstep by a [`Pair`]
//! - Freezing of subtrees to keep one-off keys out of the dictionary
//! - YAML/environment configuration and an annotated message dump
//!
//! ```
//! use pson_codec::{Pair, Value};
//!
//! let mut pair = Pair::progressive(["id"]);
//! let value = Value::try_from(serde_json::json!({"id": 7, "name": "x"})).unwrap();
//! let bytes = pair.encode(&value).unwrap();
//! assert_eq!(pair.decode(&bytes).unwrap(), value);
//! ```

pub mod buffer;
pub mod config;
pub mod decoder;
pub mod dictionary;
pub mod encoder;
pub mod error;
pub mod inspect;
pub mod pair;
pub mod tag;
pub mod value;
pub mod varint;

pub use buffer::{ByteBuffer, ByteOrder};
pub use config::{CodecConfig, Mode, Options, DEFAULT_MAX_DEPTH};
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::{CodecError, ConfigError};
pub use pair::{Pair, SharedPair};
pub use tag::Tag;
pub use value::{freeze, unfreeze, Object, Value};
