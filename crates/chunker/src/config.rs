//! Chunker settings as they appear in configuration files.

use crate::chunker::{Chunker, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
use crate::error::ChunkError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Maximum chars per chunk, overlap included.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Chars of the previous chunk repeated at the start of the next one.
    /// Must stay below `chunk_size`.
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

impl ChunkerConfig {
    pub fn validate(&self) -> Result<(), ChunkError> {
        self.build().map(|_| ())
    }

    pub fn build(&self) -> Result<Chunker, ChunkError> {
        Chunker::new(self.chunk_size, self.overlap)
    }
}

impl TryFrom<ChunkerConfig> for Chunker {
    type Error = ChunkError;

    fn try_from(config: ChunkerConfig) -> Result<Self, Self::Error> {
        config.build()
    }
}

impl From<Chunker> for ChunkerConfig {
    fn from(chunker: Chunker) -> Self {
        Self {
            chunk_size: chunker.chunk_size(),
            overlap: chunker.overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_overlap() -> usize {
    DEFAULT_OVERLAP
}
