use std::path::PathBuf;

use thiserror::Error;

use crate::record::EntityKind;

/// Boxed failure reported by a resolution strategy (HTTP, JSON, date parsing, ...).
pub type Cause = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum AzelyError {
    #[error("Parse error: could not parse query {query:?}")]
    Parse { query: String },
    #[error("Not found: {key:?} is not defined in {}", path.display())]
    NotFound { key: String, path: PathBuf },
    #[error("Resolution error: failed to resolve {kind} {key:?}: {cause}")]
    Resolution {
        key: String,
        kind: EntityKind,
        #[source]
        cause: Cause,
    },
    #[error("Cache corrupt: {}: {message}", path.display())]
    CacheCorrupt { path: PathBuf, message: String },
    #[error("Schema error: not a valid {kind} record: {message}")]
    Schema { kind: EntityKind, message: String },
    #[error("Config error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AzelyError>;

impl AzelyError {
    pub(crate) fn resolution(key: &str, kind: EntityKind, cause: impl Into<Cause>) -> Self {
        Self::Resolution { key: key.to_owned(), kind, cause: cause.into() }
    }
}

// Helper conversions
impl From<config::ConfigError> for AzelyError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
