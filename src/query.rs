//! Query strings of the form `[<source>:][<body>][!]`.
//!
//! * `source` names a user-defined TOML file to read the record from.
//! * `body` is the lookup key (a place, an object name or a time expression).
//! * a trailing `!` forces the cached record to be recomputed.

use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{AzelyError, Result};
use crate::record::Record;

lazy_static! {
    static ref QUERY: Regex = Regex::new(r"^\s*((.+):)?([^!]+)(!)?\s*$").unwrap();
}

const TOML_SUFFIX: &str = "toml";

/// What a caller hands to the resolver: either text still to be resolved or a
/// record the caller already has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Raw(String),
    Explicit(Record),
}
impl From<&str> for Query {
    fn from(raw: &str) -> Self {
        Query::Raw(raw.to_owned())
    }
}
impl From<String> for Query {
    fn from(raw: String) -> Self {
        Query::Raw(raw)
    }
}
impl From<Record> for Query {
    fn from(record: Record) -> Self {
        Query::Explicit(record)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    key: String,
    source: Option<String>,
    force_update: bool,
}
impl ParsedQuery {
    /// The "use defaults" query, an empty key with no source.
    pub fn empty() -> Self {
        Self { key: String::new(), source: None, force_update: false }
    }
    pub fn key(&self) -> &str {
        &self.key
    }
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
    pub fn force_update(&self) -> bool {
        self.force_update
    }
    /// Folds the source back into the key, for bodies that legitimately
    /// contain a colon (e.g. `00:00 today`).
    pub fn without_source(&self) -> Self {
        match &self.source {
            Some(source) => Self {
                key: format!("{}:{}", source, self.key),
                source: None,
                force_update: self.force_update,
            },
            None => self.clone(),
        }
    }
}

pub fn parse(raw: &str) -> Result<ParsedQuery> {
    let parse_error = || AzelyError::Parse { query: raw.to_owned() };
    let captures = QUERY.captures(raw).ok_or_else(parse_error)?;
    let key = captures.get(3).map(|m| m.as_str().trim()).unwrap_or_default();
    if key.is_empty() {
        return Err(parse_error());
    }
    Ok(ParsedQuery {
        key: key.to_owned(),
        source: captures.get(2).map(|m| m.as_str().to_owned()),
        force_update: captures.get(4).is_some(),
    })
}

/// The file name a `source` stands for, with `.toml` added unless already
/// present (`my.observatories` becomes `my.observatories.toml`).
pub fn source_path(source: &str) -> PathBuf {
    let path = PathBuf::from(source);
    if path.extension().is_some_and(|ext| ext == TOML_SUFFIX) {
        path
    } else {
        PathBuf::from(format!("{source}.{TOML_SUFFIX}"))
    }
}

/// Finds the user file a `source` refers to, first as given and then inside
/// `dir`.
pub fn locate_source(source: &str, dir: &Path) -> Option<PathBuf> {
    let path = source_path(source);
    if path.is_file() {
        return Some(path);
    }
    let in_dir = dir.join(&path);
    in_dir.is_file().then_some(in_dir)
}
