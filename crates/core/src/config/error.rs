//! Errors raised while loading `.osae/config.toml`.

use std::path::PathBuf;
use thiserror::Error;

/// The configuration file exists but cannot be used.
///
/// A missing file is not an error; the loader falls back to defaults.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Not TOML, or a field has the wrong type or an unknown enum value.
    #[error("cannot parse {path}: {source}")]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Well-formed, but a value the worker or the poll loop cannot run with.
    #[error("invalid setting in {path}: {reason}")]
    InvalidConfig { path: PathBuf, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
