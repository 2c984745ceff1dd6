//! Document ingestion: walk a knowledge-base tree, skip ignored and binary
//! files, chunk everything else.

use anyhow::{Context, Result};
use kbase_chunker::{ChunkRecord, Chunker};
use memchr::memchr;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

mod ignore;

pub use ignore::{IgnoreSet, IGNORE_FILE};

pub const DEFAULT_MANIFEST: &str = "ingest_manifest.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: String, // relative to the ingest root, '/' separated
    pub hash: String, // blake3 of file bytes
    pub size: usize,
    pub chunks: Vec<ChunkRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Only files with one of these extensions (no leading dot) are read.
    pub extensions: Option<Vec<String>>,
    pub extra_ignores: Vec<String>,
}

impl IngestOptions {
    fn accepts(&self, path: &Path) -> bool {
        let Some(allowed) = &self.extensions else {
            return true;
        };
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        allowed
            .iter()
            .any(|a| a.trim_start_matches('.').eq_ignore_ascii_case(&ext))
    }
}

#[derive(Debug, Default)]
pub struct Ingested {
    pub documents: Vec<Document>,
    /// Files that were unreadable or not text (NUL bytes or invalid UTF-8).
    pub skipped: usize,
}

#[derive(Serialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub documents: usize,
    pub chunks: usize,
    pub bytes: usize,
    pub skipped: usize,
}

impl Ingested {
    pub fn stats(&self) -> IngestStats {
        IngestStats {
            documents: self.documents.len(),
            chunks: self.documents.iter().map(|d| d.chunks.len()).sum(),
            bytes: self.documents.iter().map(|d| d.size).sum(),
            skipped: self.skipped,
        }
    }
}

pub fn ingest<P: AsRef<Path>>(root: P, chunker: &Chunker, opts: &IngestOptions) -> Result<Ingested> {
    let root = root.as_ref();
    let ignore = IgnoreSet::load(root, &opts.extra_ignores)?;
    info!(root = %root.display(), chunk_size = chunker.chunk_size(), overlap = chunker.overlap(), "ingesting");

    let mut out = Ingested::default();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !ignore.is_match(&relativize(e.path(), root)));

    for entry in walker {
        let entry = entry.with_context(|| format!("walking {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !opts.accepts(path) {
            continue;
        }
        let rel = relativize(path, root);
        match load_file(path, &rel, chunker) {
            Some(doc) => {
                debug!(path = %doc.path, size = doc.size, chunks = doc.chunks.len(), "chunked");
                out.documents.push(doc);
            }
            None => out.skipped += 1,
        }
    }
    // walk order puts `a/x.md` before `a-b.md`; manifests are path-ordered
    out.documents.sort_by(|a, b| a.path.cmp(&b.path));

    let stats = out.stats();
    info!(
        documents = stats.documents,
        chunks = stats.chunks,
        bytes = stats.bytes,
        skipped = stats.skipped,
        "ingest finished"
    );
    Ok(out)
}

/// Like [`read_document`], but an unreadable file is logged and skipped
/// instead of failing the whole walk.
fn load_file(path: &Path, rel: &str, chunker: &Chunker) -> Option<Document> {
    match read_document(path, rel, chunker) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(path = rel, "skipping unreadable file: {e:#}");
            None
        }
    }
}

/// Read and chunk one file. `None` when the file is not text.
pub fn read_document(path: &Path, rel: &str, chunker: &Chunker) -> Result<Option<Document>> {
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    // crude binary gate: NUL byte present -> skip
    if memchr(0, &data).is_some() {
        debug!(path = rel, "skipping binary file");
        return Ok(None);
    }
    let hash = blake3::hash(&data).to_hex().to_string();
    let size = data.len();
    let text = match String::from_utf8(data) {
        Ok(text) => text,
        Err(_) => {
            warn!(path = rel, "skipping file that is not valid UTF-8");
            return Ok(None);
        }
    };
    Ok(Some(Document {
        path: rel.to_string(),
        hash,
        size,
        chunks: chunker.records(text.as_str()),
    }))
}

pub fn dump_json<P: AsRef<Path>>(docs: &[Document], path: P) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(docs)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Vec<Document>> {
    let path = path.as_ref();
    let txt = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let docs = serde_json::from_str(&txt).with_context(|| format!("parsing {}", path.display()))?;
    Ok(docs)
}

fn relativize(p: &Path, root: &Path) -> String {
    let rel = p.strip_prefix(root).unwrap_or(p);
    let mut s = rel.display().to_string();
    if cfg!(windows) {
        s = s.replace('\\', "/");
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, data: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, data).unwrap();
    }

    fn paths(ingested: &Ingested) -> Vec<&str> {
        ingested.documents.iter().map(|d| d.path.as_str()).collect()
    }

    #[test]
    fn test_ingest_chunks_text_and_skips_the_rest() -> Result<()> {
        let dir = tempdir()?;
        let root = dir.path();
        write(root, "faq/pricing.md", b"Plans start at $20.\n\nAnnual billing saves 15%.");
        write(root, "playbooks/cold-call.txt", b"Open with a question.");
        write(root, "logo.png", b"\x89PNG\x00\x00binary");
        write(root, "latin1.txt", b"caf\xe9");
        write(root, ".git/config", b"[core]");
        write(root, "node_modules/pkg/readme.md", b"vendored");
        write(root, "empty.md", b"   \n\n");

        let chunker = Chunker::default();
        let ingested = ingest(root, &chunker, &IngestOptions::default())?;

        assert_eq!(
            paths(&ingested),
            vec!["empty.md", "faq/pricing.md", "playbooks/cold-call.txt"]
        );
        assert_eq!(ingested.skipped, 2);

        let empty = &ingested.documents[0];
        assert!(empty.chunks.is_empty());

        let faq = &ingested.documents[1];
        assert_eq!(faq.hash, blake3::hash(b"Plans start at $20.\n\nAnnual billing saves 15%.").to_hex().to_string());
        assert_eq!(faq.chunks.len(), 1);
        assert_eq!(faq.chunks[0].text, "Plans start at $20.\n\nAnnual billing saves 15%.");

        let stats = ingested.stats();
        assert_eq!(stats.documents, 3);
        assert_eq!(stats.chunks, 2);
        assert_eq!(stats.skipped, 2);
        Ok(())
    }

    #[test]
    fn test_ingest_respects_ignore_file_and_options() -> Result<()> {
        let dir = tempdir()?;
        let root = dir.path();
        write(root, IGNORE_FILE, b"drafts/\n");
        write(root, "drafts/new-pitch.md", b"wip");
        write(root, "scripts/discovery.md", b"Ask about budget.");
        write(root, "scripts/discovery.html", b"<p>Ask about budget.</p>");
        write(root, "scripts/old.md", b"outdated");

        let opts = IngestOptions {
            extensions: Some(vec![".md".to_string()]),
            extra_ignores: vec!["scripts/old.md".to_string()],
        };
        let ingested = ingest(root, &Chunker::default(), &opts)?;
        assert_eq!(paths(&ingested), vec!["scripts/discovery.md"]);
        Ok(())
    }

    #[test]
    fn test_ingest_uses_chunker_settings() -> Result<()> {
        let dir = tempdir()?;
        let root = dir.path();
        let body = ["a".repeat(30), "b".repeat(30), "c".repeat(30)].join("\n\n");
        write(root, "training/module-1.md", body.as_bytes());

        let chunker = Chunker::new(40, 5)?;
        let ingested = ingest(root, &chunker, &IngestOptions::default())?;
        let chunks = &ingested.documents[0].chunks;
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars <= 40));
        assert_eq!(chunks[2].ordinal, 2);
        assert!(chunks[1].text.starts_with("aaaaa\n\nbbb"));
        Ok(())
    }

    #[test]
    fn test_documents_are_sorted_by_full_path() -> Result<()> {
        let dir = tempdir()?;
        let root = dir.path();
        write(root, "a/x.md", b"nested");
        write(root, "a-b.md", b"sibling");
        write(root, "a.md", b"first");

        let ingested = ingest(root, &Chunker::default(), &IngestOptions::default())?;
        assert_eq!(paths(&ingested), vec!["a-b.md", "a.md", "a/x.md"]);
        Ok(())
    }

    #[test]
    fn test_unreadable_file_is_skipped() -> Result<()> {
        let dir = tempdir()?;
        let root = dir.path();
        write(root, "faq/refunds.md", b"30 days.");

        let chunker = Chunker::default();
        // reading a directory as a file fails
        assert!(read_document(&root.join("faq"), "faq", &chunker).is_err());
        assert!(load_file(&root.join("faq"), "faq", &chunker).is_none());
        let doc = load_file(&root.join("faq/refunds.md"), "faq/refunds.md", &chunker);
        assert_eq!(doc.map(|d| d.chunks.len()), Some(1));
        Ok(())
    }

    #[test]
    fn test_manifest_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let root = dir.path().join("kb");
        write(&root, "faq.md", b"Q: Do you integrate with WhatsApp?\n\nA: Yes.");
        let ingested = ingest(&root, &Chunker::default(), &IngestOptions::default())?;

        let manifest = dir.path().join(DEFAULT_MANIFEST);
        dump_json(&ingested.documents, &manifest)?;
        let loaded = load_json(&manifest)?;
        assert_eq!(loaded, ingested.documents);
        Ok(())
    }
}
