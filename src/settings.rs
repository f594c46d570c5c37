//! Process-wide settings, resolved once at start-up and passed around
//! explicitly.
//!
//! Layering (later wins):
//! 1. built-in defaults
//! 2. `<dir>/config.toml`, if present
//! 3. `AZELY_*` environment variables (e.g. `AZELY_TIMEOUT=5`)
//!
//! The directory itself comes from `AZELY_DIR`, then `$XDG_CONFIG_HOME/azely`,
//! then `$HOME/.config/azely`.

use std::env;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use tracing::info;

use crate::error::{AzelyError, Result};

const APP: &str = "azely";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    /// Directory holding the configuration, the default cache and user files.
    pub dir: PathBuf,
    /// File name of the default cache inside `dir`.
    pub cache_file: String,
    /// Network timeout in seconds.
    pub timeout: f64,
    /// Frame requested from the object name resolver.
    pub frame: String,
    /// Regex separating the items of a time query.
    pub separator: String,
    /// Whether cache misses are stored.
    pub append: bool,
    pub google_api: Option<String>,
    pub ipinfo_api: Option<String>,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::load_from(default_dir()?)
    }

    /// Loads settings rooted at `dir`, still honoring `config.toml` there and
    /// the environment.
    pub fn load_from(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let settings = Config::builder()
            .set_default("dir", dir.to_string_lossy().into_owned())?
            .set_default("cache_file", "cache.toml")?
            .set_default("timeout", 10.0)?
            .set_default("frame", "icrs")?
            .set_default("separator", r"\s*;\s*")?
            .set_default("append", true)?
            .add_source(File::from(dir.join(CONFIG_FILE)).required(false))
            .add_source(Environment::with_prefix("AZELY").try_parsing(true))
            .build()?;
        let settings: Self = settings.try_deserialize()?;
        settings.timeout()?;
        Ok(settings)
    }

    /// Defaults only, ignoring files and the environment.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache_file: String::from("cache.toml"),
            timeout: 10.0,
            frame: String::from("icrs"),
            separator: String::from(r"\s*;\s*"),
            append: true,
            google_api: None,
            ipinfo_api: None,
        }
    }

    pub fn cache_path(&self) -> PathBuf {
        self.dir.join(&self.cache_file)
    }

    /// The network timeout, which must be a positive number of seconds.
    pub fn timeout(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.timeout)
            .ok()
            .filter(|timeout| !timeout.is_zero())
            .ok_or_else(|| AzelyError::Config(format!("timeout must be positive, got {}", self.timeout)))
    }

    /// Creates the directory and an empty cache file when missing.
    pub fn ensure_cache(&self) -> Result<PathBuf> {
        let path = self.cache_path();
        if !path.exists() {
            fs::create_dir_all(&self.dir)?;
            OpenOptions::new().create(true).append(true).open(&path)?;
            info!(path = %path.display(), "created cache file");
        }
        Ok(path)
    }
}

fn default_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os("AZELY_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Some(config_home) = env::var_os("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(config_home).join(APP));
    }
    env::var_os("HOME")
        .map(|home| PathBuf::from(home).join(".config").join(APP))
        .ok_or_else(|| AzelyError::Config(String::from("cannot locate a home directory")))
}
