use anyhow::{bail, Context, Result};
use kbase_chunker::Chunker;
use kbase_ingest::{Document, IngestOptions};
use kbase_store::{blake32, parse_id, DocId, DocumentMeta, Store, StoredChunk};
use std::{
    collections::HashSet,
    fs,
    io::{self, Read},
    path::Path,
};
use tracing::info;

use crate::config::Config;

pub fn ingest_options(config: &Config) -> IngestOptions {
    IngestOptions {
        extensions: config.ingest.extensions.clone(),
        extra_ignores: config.ingest.ignore.clone(),
    }
}

/// Chunk a single file, or stdin when `file` is `None` or `-`.
pub fn run_chunk(file: Option<&Path>, chunker: &Chunker, json: bool) -> Result<()> {
    let text = match file {
        Some(p) if p != Path::new("-") => {
            fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?
        }
        _ => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).context("reading stdin")?;
            buf
        }
    };

    let records = chunker.records(text.as_str());
    info!(chunks = records.len(), "chunked input");
    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    for r in &records {
        println!("--- chunk {} ({} chars) ---", r.ordinal, r.chars);
        println!("{}", r.text);
    }
    Ok(())
}

pub fn run_ingest(root: &Path, out: &Path, chunker: &Chunker, opts: &IngestOptions) -> Result<()> {
    let ingested = kbase_ingest::ingest(root, chunker, opts)?;
    kbase_ingest::dump_json(&ingested.documents, out)?;
    let stats = ingested.stats();
    println!(
        "Ingested {} documents ({} chunks) -> {}",
        stats.documents,
        stats.chunks,
        out.display()
    );
    Ok(())
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub stored: usize,
    pub chunks: usize,
    pub pruned: usize,
}

/// Persist documents into the store, dropping any stored document that is
/// not part of `docs` (deleted or changed since the last run).
pub fn index_documents(store: &Store, docs: &[Document]) -> Result<IndexReport> {
    let mut report = IndexReport::default();
    let mut live = HashSet::with_capacity(docs.len());

    for doc in docs {
        let id = document_id(doc)?;
        live.insert(id);
        let chunks = doc
            .chunks
            .iter()
            .map(|r| {
                let ordinal = u32::try_from(r.ordinal).context("chunk ordinal overflows u32")?;
                Ok(StoredChunk::new(ordinal, r.text.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        let meta = DocumentMeta {
            path: doc.path.clone(),
            size: doc.size,
            chunk_count: u32::try_from(chunks.len()).context("chunk count overflows u32")?,
        };
        store.put_document(id, &meta, &chunks)?;
        report.stored += 1;
        report.chunks += chunks.len();
    }

    for (id, meta) in store.documents()? {
        if !live.contains(&id) {
            info!(path = %meta.path, "pruning stale document");
            store.remove_document(&id)?;
            report.pruned += 1;
        }
    }
    Ok(report)
}

pub fn run_index(
    root: &Path,
    manifest: Option<&Path>,
    db: &Path,
    chunker: &Chunker,
    opts: &IngestOptions,
) -> Result<()> {
    let docs = match manifest {
        Some(m) => kbase_ingest::load_json(m)?,
        None => kbase_ingest::ingest(root, chunker, opts)?.documents,
    };
    let store = Store::open(db)?;
    let report = index_documents(&store, &docs)?;
    info!(stored = report.stored, chunks = report.chunks, pruned = report.pruned, "index updated");
    println!(
        "Indexed {} documents ({} chunks, {} pruned) at {}",
        report.stored,
        report.chunks,
        report.pruned,
        db.display()
    );
    Ok(())
}

pub fn run_show(path: &str, db: &Path) -> Result<()> {
    let store = Store::open(db)?;
    let Some((id, meta)) = store.find_by_path(path)? else {
        bail!("{path} is not indexed in {}", db.display());
    };
    println!("{} ({} bytes, {} chunks)", meta.path, meta.size, meta.chunk_count);
    for c in store.chunks(&id)? {
        println!("--- chunk {} ---", c.ordinal);
        println!("{}", c.text);
    }
    Ok(())
}

pub fn run_stats(db: &Path) -> Result<()> {
    let stats = Store::open(db)?.stats()?;
    println!("documents: {}", stats.documents);
    println!("chunks:    {}", stats.chunks);
    Ok(())
}

/// id = blake3(path || 0 || content hash), so identical files at different
/// paths stay separate documents.
fn document_id(doc: &Document) -> Result<DocId> {
    let content = parse_id(&doc.hash)?;
    let mut src = Vec::with_capacity(doc.path.len() + 1 + content.len());
    src.extend_from_slice(doc.path.as_bytes());
    src.push(0);
    src.extend_from_slice(&content);
    Ok(blake32(&src))
}
