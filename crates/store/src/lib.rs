//! ReDB-backed chunk store, default location ./index/kv.redb
//! Tables:
//!   documents: key=document id (32 bytes), val=bincode(DocumentMeta)
//!   chunks: key=document id ++ ordinal (u32, big endian), val=bincode(StoredChunk)
//!
//! Big-endian ordinals keep a document's chunks contiguous and in order.

use anyhow::{anyhow, Context, Result};
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::debug;

const DOCUMENTS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("documents");
const CHUNKS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("chunks");

pub const DEFAULT_PATH: &str = "index/kv.redb";

pub type DocId = [u8; 32];

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DocumentMeta {
    pub path: String,
    pub size: usize,
    pub chunk_count: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StoredChunk {
    pub ordinal: u32,
    pub text: String,
    pub hash: [u8; 32], // blake3 of text
}

impl StoredChunk {
    pub fn new(ordinal: u32, text: impl Into<String>) -> Self {
        let text = text.into();
        let hash = blake32(text.as_bytes());
        Self { ordinal, text, hash }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub documents: usize,
    pub chunks: usize,
}

pub struct Store {
    db: Database,
}

impl Store {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let db = Database::builder()
            .create(path)
            .with_context(|| format!("opening {}", path.display()))?;
        // create tables if not exist
        let tx = db.begin_write()?;
        {
            tx.open_table(DOCUMENTS)?;
            tx.open_table(CHUNKS)?;
        }
        tx.commit()?;
        Ok(Self { db })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(DEFAULT_PATH)
    }

    /// Write a document and its chunks in one transaction, replacing whatever
    /// was stored under `id` before.
    pub fn put_document(&self, id: DocId, meta: &DocumentMeta, chunks: &[StoredChunk]) -> Result<()> {
        let tx = self.db.begin_write()?;
        {
            let mut docs = tx.open_table(DOCUMENTS)?;
            let mut t = tx.open_table(CHUNKS)?;

            let (lo, hi) = chunk_range(&id);
            let stale: Vec<Vec<u8>> = t
                .range(lo.as_slice()..=hi.as_slice())?
                .map(|item| item.map(|(k, _)| k.value().to_vec()))
                .collect::<Result<_, _>>()?;
            for key in &stale {
                t.remove(key.as_slice())?;
            }

            for c in chunks {
                let val = bincode::serialize(c)?;
                t.insert(chunk_key(&id, c.ordinal).as_slice(), val.as_slice())?;
            }
            let val = bincode::serialize(meta)?;
            docs.insert(id.as_slice(), val.as_slice())?;
        }
        tx.commit()?;
        debug!(path = %meta.path, chunks = chunks.len(), "stored document");
        Ok(())
    }

    pub fn document(&self, id: &DocId) -> Result<Option<DocumentMeta>> {
        let tx = self.db.begin_read()?;
        let t = tx.open_table(DOCUMENTS)?;
        match t.get(id.as_slice())? {
            Some(v) => Ok(Some(bincode::deserialize(v.value())?)),
            None => Ok(None),
        }
    }

    /// All documents, ordered by path.
    pub fn documents(&self) -> Result<Vec<(DocId, DocumentMeta)>> {
        let tx = self.db.begin_read()?;
        let table = tx.open_table(DOCUMENTS)?;
        let mut out = Vec::new();
        for item in table.iter()? {
            let (k, v) = item?;
            let mut key = [0u8; 32];
            key.copy_from_slice(k.value());
            let meta: DocumentMeta = bincode::deserialize(v.value())?;
            out.push((key, meta));
        }
        out.sort_by(|a, b| a.1.path.cmp(&b.1.path));
        Ok(out)
    }

    /// Document stored under `path`, if any.
    pub fn find_by_path(&self, path: &str) -> Result<Option<(DocId, DocumentMeta)>> {
        let tx = self.db.begin_read()?;
        let table = tx.open_table(DOCUMENTS)?;
        for item in table.iter()? {
            let (k, v) = item?;
            let meta: DocumentMeta = bincode::deserialize(v.value())?;
            if meta.path == path {
                let mut key = [0u8; 32];
                key.copy_from_slice(k.value());
                return Ok(Some((key, meta)));
            }
        }
        Ok(None)
    }

    /// Chunks of `id` in ordinal order.
    pub fn chunks(&self, id: &DocId) -> Result<Vec<StoredChunk>> {
        let tx = self.db.begin_read()?;
        let t = tx.open_table(CHUNKS)?;
        let (lo, hi) = chunk_range(id);
        let mut out = Vec::new();
        for item in t.range(lo.as_slice()..=hi.as_slice())? {
            let (_, v) = item?;
            out.push(bincode::deserialize(v.value())?);
        }
        Ok(out)
    }

    /// Drop a document and its chunks. Returns whether it existed.
    pub fn remove_document(&self, id: &DocId) -> Result<bool> {
        let tx = self.db.begin_write()?;
        let existed;
        {
            let mut docs = tx.open_table(DOCUMENTS)?;
            let mut t = tx.open_table(CHUNKS)?;
            existed = docs.remove(id.as_slice())?.is_some();

            let (lo, hi) = chunk_range(id);
            let keys: Vec<Vec<u8>> = t
                .range(lo.as_slice()..=hi.as_slice())?
                .map(|item| item.map(|(k, _)| k.value().to_vec()))
                .collect::<Result<_, _>>()?;
            for key in &keys {
                t.remove(key.as_slice())?;
            }
        }
        tx.commit()?;
        Ok(existed)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let tx = self.db.begin_read()?;
        let docs = tx.open_table(DOCUMENTS)?;
        let chunks = tx.open_table(CHUNKS)?;
        Ok(StoreStats {
            documents: docs.iter()?.count(),
            chunks: chunks.iter()?.count(),
        })
    }
}

fn chunk_key(id: &DocId, ordinal: u32) -> [u8; 36] {
    let mut key = [0u8; 36];
    key[..32].copy_from_slice(id);
    key[32..].copy_from_slice(&ordinal.to_be_bytes());
    key
}

fn chunk_range(id: &DocId) -> ([u8; 36], [u8; 36]) {
    (chunk_key(id, 0), chunk_key(id, u32::MAX))
}

// helpers
pub fn blake32(bytes: &[u8]) -> [u8; 32] {
    blake3::hash(bytes).as_bytes().to_owned()
}

pub fn parse_id(h: &str) -> Result<DocId> {
    let bytes = hex::decode(h).with_context(|| format!("bad hex id {h:?}"))?;
    let arr: DocId = bytes
        .as_slice()
        .try_into()
        .map_err(|_| anyhow!("id must be 32 bytes, got {}", bytes.len()))?;
    Ok(arr)
}
