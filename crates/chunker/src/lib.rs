//! Deterministic paragraph-aware chunker.
//! Strategy: normalize whitespace, greedily pack blank-line separated blocks
//! into windows of at most `chunk_size` chars, hard-slice blocks that are too
//! big on their own, then prefix every window after the first with the tail
//! of its predecessor.
//!
//! Lengths are counted in `char`s, so a chunk never splits a code point.
//!
//! ```
//! use kbase_chunker::Chunker;
//!
//! let chunks = Chunker::default().chunk("Hello world");
//! assert_eq!(chunks, vec!["Hello world".to_string()]);
//! ```

mod chunker;
mod config;
mod error;
mod normalize;
mod record;

pub use chunker::{chunk_text, Chunker, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
pub use config::ChunkerConfig;
pub use error::ChunkError;
pub use normalize::{char_len, normalize, split_blocks};
pub use record::ChunkRecord;
