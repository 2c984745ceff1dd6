//! `kbase.toml` loading.
//!
//! Resolution order: defaults, then the config file, then `KBASE_*`
//! environment variables, then command-line flags (applied by the caller).

use anyhow::{Context, Result};
use kbase_chunker::ChunkerConfig;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

pub const CONFIG_FILE: &str = "kbase.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub chunker: ChunkerConfig,
    pub ingest: IngestConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Extension allow-list; every file is read when unset.
    pub extensions: Option<Vec<String>>,
    /// Extra ignore globs on top of the built-ins and `.ingestignore`.
    pub ignore: Vec<String>,
    pub manifest: PathBuf,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            extensions: None,
            ignore: Vec::new(),
            manifest: PathBuf::from(kbase_ingest::DEFAULT_MANIFEST),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(kbase_store::DEFAULT_PATH),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// An explicit path must exist. Without one, `kbase.toml` in the working
    /// directory is used when present, defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None if Path::new(CONFIG_FILE).exists() => Self::from_file(Path::new(CONFIG_FILE)),
            None => Ok(Self::default()),
        }
    }

    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|key| env::var(key).ok())
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = var("KBASE_CHUNK_SIZE") {
            self.chunker.chunk_size = v
                .trim()
                .parse()
                .with_context(|| format!("KBASE_CHUNK_SIZE={v:?} is not a number"))?;
        }
        if let Some(v) = var("KBASE_OVERLAP") {
            self.chunker.overlap = v
                .trim()
                .parse()
                .with_context(|| format!("KBASE_OVERLAP={v:?} is not a number"))?;
        }
        if let Some(v) = var("KBASE_DB") {
            self.store.path = PathBuf::from(v);
        }
        Ok(())
    }
}
