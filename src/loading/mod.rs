//! Chunked, parallel dataset loading.
//!
//! Training files are split into bounded [`Chunk`]s of raw lines
//! ([`read_chunks`]), parsed concurrently by a bounded worker pool
//! synchronized through a [`CountingBarrier`] ([`parse_chunks`]), and merged
//! into the dataset store in original input order ([`merge_chunks`]).
//!
//! Workers never share mutable state: each task owns one chunk exclusively
//! for the duration of its parse step, and the submitting thread is the only
//! writer of the store. The parsed rows a chunk ends up holding are identical
//! whether parsing ran inline or on the pool; only chunk completion order may
//! vary during execution.

mod aggregate;
mod barrier;
mod chunk;
mod scheduler;

pub use aggregate::{merge_chunks, MergeError, MergeOutcome};
pub use barrier::CountingBarrier;
pub use chunk::{read_chunks, Chunk, DEFAULT_CHUNK_SIZE};
pub use scheduler::parse_chunks;
