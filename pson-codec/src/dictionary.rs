//! Shared string dictionaries.
//!
//! The encoder side maps strings to indices; the decoder side is the mirror
//! array. Both are append-only and assign indices in first-seen order, so
//! index `i` names the same string on both sides once they have processed the
//! same sequence of messages.

use crate::error::CodecError;
use std::collections::HashMap;

/// String-to-index side of the dictionary, owned by an encoder.
#[derive(Debug, Clone, Default)]
pub struct EncoderDictionary {
    index: HashMap<String, u32>,
    entries: Vec<String>,
}

impl EncoderDictionary {
    /// Seeds the dictionary with `initial` in order.
    ///
    /// A string listed twice resolves to its last position; the decoder keeps
    /// both positions, so either index decodes to the same string.
    pub fn new<I, S>(initial: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut dict = Self::default();
        for entry in initial {
            let entry = entry.into();
            dict.index.insert(entry.clone(), dict.entries.len() as u32);
            dict.entries.push(entry);
        }
        dict
    }

    pub fn get(&self, value: &str) -> Option<u32> {
        self.index.get(value).copied()
    }

    /// Assigns the next free index to `value`.
    pub fn insert(&mut self, value: &str) -> Result<u32, CodecError> {
        let next = u32::try_from(self.entries.len()).map_err(|_| CodecError::DictionaryFull)?;
        self.index.insert(value.to_owned(), next);
        self.entries.push(value.to_owned());
        tracing::trace!("dictionary: added {:?} at {}", value, next);
        Ok(next)
    }

    /// Next index that [`EncoderDictionary::insert`] would assign.
    pub fn next_index(&self) -> usize {
        self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in index order, suitable for seeding a later session.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Drops every entry at or after `len`.
    pub(crate) fn truncate(&mut self, len: usize) {
        let removed: Vec<String> = self.entries.drain(len.min(self.entries.len())..).collect();
        for value in removed {
            // A removed duplicate may have shadowed an earlier position
            match self.entries.iter().rposition(|entry| *entry == value) {
                Some(i) => self.index.insert(value, i as u32),
                None => self.index.remove(&value),
            };
        }
    }
}

/// Index-to-string side of the dictionary, owned by a decoder.
#[derive(Debug, Clone, Default)]
pub struct DecoderDictionary {
    entries: Vec<String>,
}

impl DecoderDictionary {
    pub fn new<I, S>(initial: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: initial.into_iter().map(Into::into).collect(),
        }
    }

    pub fn get(&self, index: u32) -> Option<&str> {
        self.entries.get(index as usize).map(String::as_str)
    }

    /// Appends `value` at the index equal to the current length.
    pub fn push(&mut self, value: String) -> usize {
        let index = self.entries.len();
        tracing::trace!("dictionary: learned {:?} at {}", value, index);
        self.entries.push(value);
        index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }
}
