use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::{fs, path::Path};
use tracing::warn;

/// Per-root ignore file, one glob per line.
pub const IGNORE_FILE: &str = ".ingestignore";

const BUILTINS: &[&str] = &[
    ".git/",
    "target/",
    "node_modules/",
    ".DS_Store",
    "Thumbs.db",
    "*.lock",
    "*.tmp",
    "*.log",
    "*.swp",
    "*.swo",
    "index/",
    ".vscode/",
    ".idea/",
    ".env",
    ".env.local",
    ".ingestignore",
    "ingest_manifest.json",
];

/// Glob set matched against root-relative, `/`-separated paths.
pub struct IgnoreSet {
    set: GlobSet,
}

impl IgnoreSet {
    /// Built-in patterns, then `.ingestignore` under `root` if present, then
    /// `extra`. A pattern ending in `/` ignores the directory at any depth.
    pub fn load(root: &Path, extra: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for p in BUILTINS {
            add_pattern(&mut builder, p)?;
        }

        let f = root.join(IGNORE_FILE);
        if let Ok(txt) = fs::read_to_string(&f) {
            for line in txt.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Err(e) = add_pattern(&mut builder, line) {
                    warn!(file = %f.display(), pattern = line, "skipping bad ignore pattern: {e:#}");
                }
            }
        }

        for p in extra {
            add_pattern(&mut builder, p)?;
        }

        let set = builder.build().context("building ignore set")?;
        Ok(Self { set })
    }

    pub fn is_match(&self, rel: &str) -> bool {
        let cleaned = rel.strip_prefix("./").unwrap_or(rel);
        self.set.is_match(cleaned) || cleaned.split('/').any(|c| self.set.is_match(c))
    }
}

fn add_pattern(builder: &mut GlobSetBuilder, pattern: &str) -> Result<()> {
    match pattern.strip_suffix('/') {
        Some(dir) => {
            let dir = dir.trim_start_matches('/');
            builder.add(glob(&format!("**/{dir}"))?);
            builder.add(glob(&format!("**/{dir}/**"))?);
        }
        None => {
            builder.add(glob(pattern)?);
        }
    }
    Ok(())
}

fn glob(pattern: &str) -> Result<Glob> {
    Glob::new(pattern).with_context(|| format!("invalid glob {pattern:?}"))
}
