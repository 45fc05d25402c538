//! Codec configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via PSON_CONFIG)
//! 3. Environment variables

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default limit on nested arrays and objects.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Dictionary growth policy shared by both halves of a pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// The initial dictionary never grows.
    #[default]
    Static,
    /// New strings are assigned the next free index as they are encoded.
    Progressive,
}

impl Mode {
    pub fn is_progressive(&self) -> bool {
        matches!(self, Mode::Progressive)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Static => write!(f, "static"),
            Mode::Progressive => write!(f, "progressive"),
        }
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "static" => Ok(Mode::Static),
            "progressive" => Ok(Mode::Progressive),
            other => Err(ConfigError::InvalidValue("mode", other.to_string())),
        }
    }
}

/// Per-encoder/decoder tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Maximum nesting of arrays and objects accepted on encode and decode.
    pub max_depth: usize,
    /// In progressive mode, also add string values to the dictionary, not
    /// only object keys.
    pub intern_values: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            intern_values: true,
        }
    }
}

/// Codec configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Dictionary growth policy.
    pub mode: Mode,
    /// Inline initial dictionary entries.
    pub dictionary: Vec<String>,
    /// JSON file holding an array of further initial entries.
    pub dictionary_file: Option<PathBuf>,
    /// Maximum nesting depth.
    pub max_depth: usize,
    /// Whether progressive mode interns string values as well as keys.
    pub intern_values: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Static,
            dictionary: Vec::new(),
            dictionary_file: None,
            max_depth: DEFAULT_MAX_DEPTH,
            intern_values: true,
        }
    }
}

impl CodecConfig {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("PSON_CONFIG") {
            config = Self::from_file(&path)?;
        }

        config.apply_env_overrides();

        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: CodecConfig = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    /// Loads configuration from environment variables only.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(mode) = std::env::var("PSON_MODE") {
            match mode.parse() {
                Ok(parsed) => self.mode = parsed,
                Err(e) => tracing::warn!("Ignoring PSON_MODE: {}", e),
            }
        }

        if let Ok(path) = std::env::var("PSON_DICTIONARY") {
            self.dictionary_file = Some(PathBuf::from(path));
        }

        if let Ok(depth) = std::env::var("PSON_MAX_DEPTH") {
            if let Ok(n) = depth.parse() {
                self.max_depth = n;
            }
        }

        if let Ok(intern) = std::env::var("PSON_INTERN_VALUES") {
            self.intern_values = intern == "true" || intern == "1";
        }
    }

    /// Encoder/decoder options derived from this configuration.
    pub fn options(&self) -> Options {
        Options {
            max_depth: self.max_depth,
            intern_values: self.intern_values,
        }
    }

    /// Inline dictionary entries followed by the entries of `dictionary_file`.
    pub fn initial_dictionary(&self) -> Result<Vec<String>, ConfigError> {
        let mut entries = self.dictionary.clone();
        if let Some(path) = &self.dictionary_file {
            entries.extend(load_dictionary(path)?);
        }
        Ok(entries)
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Ok(())
    }
}

/// Reads a dictionary file: a JSON array of strings.
pub fn load_dictionary(path: impl AsRef<Path>) -> Result<Vec<String>, ConfigError> {
    let path = path.as_ref();
    let content =
        std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
    serde_json::from_str(&content)
        .map_err(|e| ConfigError::Dictionary(path.to_path_buf(), e.to_string()))
}
