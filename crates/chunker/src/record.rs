use serde::{Deserialize, Serialize};

/// One chunk of a document, ready for embedding or storage.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChunkRecord {
    pub ordinal: usize,
    pub text: String,
    pub chars: usize,
    pub hash: String, // blake3 of text
}

impl ChunkRecord {
    pub fn new(ordinal: usize, text: String) -> Self {
        let hash = blake3::hash(text.as_bytes()).to_hex().to_string();
        let chars = text.chars().count();
        Self {
            ordinal,
            text,
            chars,
            hash,
        }
    }
}
