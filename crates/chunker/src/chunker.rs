use crate::error::ChunkError;
use crate::normalize::{char_len, normalize, split_blocks, tail_chars, take_chars};
use crate::record::ChunkRecord;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_OVERLAP: usize = 200;

const BLOCK_SEP: &str = "\n\n";
const BLOCK_SEP_CHARS: usize = 2;

/// Splits text into bounded, overlapping windows.
///
/// A `Chunker` always holds `chunk_size > 0` and `overlap < chunk_size`, so
/// hard slicing advances by at least one char per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl Chunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkError> {
        if chunk_size == 0 {
            return Err(ChunkError::ZeroChunkSize);
        }
        if overlap >= chunk_size {
            return Err(ChunkError::OverlapTooLarge {
                overlap,
                chunk_size,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Chunk `text`. Absent text is treated as empty; the result is empty
    /// exactly when the normalized text is.
    pub fn chunk<'a>(&self, text: impl Into<Option<&'a str>>) -> Vec<String> {
        let normalized = normalize(text.into().unwrap_or(""));
        if normalized.is_empty() {
            return Vec::new();
        }
        if char_len(&normalized) <= self.chunk_size {
            return vec![normalized];
        }
        let packed = self.pack(&normalized);
        self.with_overlap(packed)
    }

    /// Same as [`Chunker::chunk`], tagged with ordinal and content hash.
    pub fn records<'a>(&self, text: impl Into<Option<&'a str>>) -> Vec<ChunkRecord> {
        self.chunk(text)
            .into_iter()
            .enumerate()
            .map(|(ordinal, text)| ChunkRecord::new(ordinal, text))
            .collect()
    }

    /// Greedy block packing. Output chunks carry no overlap yet.
    fn pack(&self, normalized: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut buf = String::new();
        let mut buf_len = 0usize;

        for block in split_blocks(normalized) {
            let block_len = char_len(block);
            let candidate_len = if buf.is_empty() {
                block_len
            } else {
                buf_len + BLOCK_SEP_CHARS + block_len
            };

            if candidate_len <= self.chunk_size {
                if !buf.is_empty() {
                    buf.push_str(BLOCK_SEP);
                }
                buf.push_str(block);
                buf_len = candidate_len;
                continue;
            }

            if !buf.is_empty() {
                out.push(std::mem::take(&mut buf));
                buf_len = 0;
            }
            if block_len > self.chunk_size {
                self.hard_slice(block, &mut out);
            } else {
                buf.push_str(block);
                buf_len = block_len;
            }
        }

        if !buf.is_empty() {
            out.push(buf);
        }
        out
    }

    /// Fixed windows of `chunk_size` chars, `chunk_size - overlap` apart.
    /// Stops after the first window that reaches the end of the block.
    fn hard_slice(&self, block: &str, out: &mut Vec<String>) {
        let bounds: Vec<usize> = block
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(block.len()))
            .collect();
        let total = bounds.len() - 1;
        let step = self.chunk_size - self.overlap;

        let mut start = 0usize;
        loop {
            let end = (start + self.chunk_size).min(total);
            out.push(block[bounds[start]..bounds[end]].to_string());
            if end == total {
                break;
            }
            start += step;
        }
    }

    /// Prefix each chunk after the first with the tail of its un-overlapped
    /// predecessor, then cut back to `chunk_size`.
    fn with_overlap(&self, packed: Vec<String>) -> Vec<String> {
        if packed.len() < 2 || self.overlap == 0 {
            return packed;
        }

        let mut out = Vec::with_capacity(packed.len());
        out.push(packed[0].clone());
        for pair in packed.windows(2) {
            let head = tail_chars(&pair[0], self.overlap);
            let mut joined = String::with_capacity(head.len() + BLOCK_SEP.len() + pair[1].len());
            joined.push_str(head);
            joined.push_str(BLOCK_SEP);
            joined.push_str(&pair[1]);
            out.push(take_chars(&joined, self.chunk_size).to_string());
        }
        out
    }
}

/// Chunk with the default size (1000) and overlap (200).
pub fn chunk_text(text: Option<&str>) -> Vec<String> {
    Chunker::default().chunk(text)
}
