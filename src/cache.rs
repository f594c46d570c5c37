//! Persisted record cache.
//!
//! The cache is a single TOML document whose top-level tables are named after
//! entity kinds (`[location]`, `[object]`, `[time]`). Inside a table every query
//! key maps to at most one flat record:
//!
//! ```toml
//! [location."ALMA AOS"]
//! name = "ALMA AOS"
//! longitude = "-67.7539"
//! latitude = "-23.0231"
//! ```
//!
//! Every call reads the whole file, works on the document in memory and, when
//! something changed, writes the whole document back. There is no locking, so
//! only one process should write a given file at a time.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{AzelyError, Result};
use crate::record::{EntityKind, Record};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordCache {
    path: PathBuf,
}

impl RecordCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read-only lookup of a single entry.
    pub fn get(&self, table: &str, key: &str) -> Result<Option<Record>> {
        let document = self.load()?;
        self.entry(&document, table, key)
    }

    /// Lookup of a record stored as a top-level table (`[ASTE]`), the layout
    /// of hand-written user files.
    pub fn get_top_level(&self, key: &str) -> Result<Option<Record>> {
        let document = self.load()?;
        match document.get(key) {
            Some(value) => Record::from_toml(value)
                .map(Some)
                .ok_or_else(|| self.corrupt(format!("[{key}] is not a flat table"))),
            None => Ok(None),
        }
    }

    /// Returns the record cached under `table.key`, running `compute` only when
    /// the entry is missing or `overwrite` is set.
    ///
    /// * present, `overwrite == false`: the stored record, `compute` is not called
    /// * present, `overwrite == true`: the computed record replaces the stored one
    /// * missing, `append == true`: the computed record is stored
    /// * missing, `append == false`: the computed record is returned but not stored
    ///
    /// A failing `compute` leaves the file untouched and its error is returned
    /// as is.
    pub fn get_or_create<F>(
        &self,
        table: &str,
        key: &str,
        append: bool,
        overwrite: bool,
        compute: F,
    ) -> Result<Record>
    where
        F: FnOnce() -> Result<Record>,
    {
        let mut document = self.load()?;
        let cached = self.entry(&document, table, key)?;
        let present = cached.is_some();
        if let Some(record) = cached {
            if !overwrite {
                debug!(table, key, path = %self.path.display(), "cache hit");
                return Ok(record);
            }
        }
        let record = compute()?;
        if !present && !append {
            debug!(table, key, "cache miss, not appending");
            return Ok(record);
        }
        let entries = document
            .entry(table)
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        match entries.as_table_mut() {
            Some(entries) => {
                entries.insert(key.to_owned(), record.to_toml());
            }
            None => return Err(self.corrupt(format!("[{table}] is not a table"))),
        }
        self.store(&document)?;
        info!(table, key, replaced = present, path = %self.path.display(), "cached record");
        Ok(record)
    }

    fn load(&self) -> Result<toml::Table> {
        match fs::read_to_string(&self.path) {
            Ok(text) => text
                .parse::<toml::Table>()
                .map_err(|e| self.corrupt(e.to_string())),
            // a cache that was never written is an empty one
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(toml::Table::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn entry(&self, document: &toml::Table, table: &str, key: &str) -> Result<Option<Record>> {
        let entries = match document.get(table) {
            Some(value) => value
                .as_table()
                .ok_or_else(|| self.corrupt(format!("[{table}] is not a table")))?,
            None => return Ok(None),
        };
        match entries.get(key) {
            Some(value) => Record::from_toml(value)
                .map(Some)
                .ok_or_else(|| self.corrupt(format!("[{table}] entry {key:?} is not a flat table"))),
            None => Ok(None),
        }
    }

    // Serialized in full first, then swapped in by rename so a failed write
    // never truncates the previous contents.
    fn store(&self, document: &toml::Table) -> Result<()> {
        let text = toml::to_string(document)
            .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temporary = self.path.with_file_name(format!(".{file_name}.tmp"));
        fs::write(&temporary, text)?;
        fs::rename(&temporary, &self.path)?;
        Ok(())
    }

    fn corrupt(&self, message: String) -> AzelyError {
        AzelyError::CacheCorrupt { path: self.path.clone(), message }
    }
}

/// Whether misses are stored and whether hits are recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub append: bool,
    pub overwrite: bool,
}
impl Default for CachePolicy {
    fn default() -> Self {
        Self { append: true, overwrite: false }
    }
}

/// A cache bound to a policy, memoizing whatever `compute` closure it is given
/// under the kind's table.
#[derive(Debug, Clone, Copy)]
pub struct CachedResolver<'c> {
    cache: &'c RecordCache,
    policy: CachePolicy,
}
impl<'c> CachedResolver<'c> {
    pub fn new(cache: &'c RecordCache, policy: CachePolicy) -> Self {
        Self { cache, policy }
    }
    pub fn policy(&self) -> CachePolicy {
        self.policy
    }
    pub fn resolve<F>(&self, kind: EntityKind, key: &str, compute: F) -> Result<Record>
    where
        F: FnOnce() -> Result<Record>,
    {
        self.cache.get_or_create(
            kind.table(),
            key,
            self.policy.append,
            self.policy.overwrite,
            compute,
        )
    }
}
