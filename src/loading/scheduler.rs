//! Fan-out/fan-in scheduling of chunk parsing.

use crate::data::RowDecoder;

use super::{Chunk, CountingBarrier};

/// Parse every chunk's buffered lines, in place.
///
/// With `threads == 0` concurrency is disabled: chunks are parsed inline, in
/// list order. Otherwise a pool of `threads` workers parses chunks
/// concurrently. The barrier is created with the full chunk count before any
/// task is submitted, each worker signals it exactly once after parsing, and
/// the submitting thread blocks until the whole batch has drained.
///
/// Each task owns its chunk exclusively (`&mut` disjoint borrows), so the
/// rows a chunk ends up holding are identical row-for-row regardless of
/// `threads`; only the completion order across chunks may vary.
pub fn parse_chunks<D: RowDecoder>(chunks: &mut [Chunk], decoder: &D, threads: usize) {
    if threads == 0 {
        for chunk in chunks.iter_mut() {
            chunk.parse(decoder);
        }
        return;
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .expect("failed to build parse worker pool");

    let barrier = CountingBarrier::new(chunks.len());
    pool.scope(|scope| {
        for chunk in chunks.iter_mut() {
            let barrier = &barrier;
            scope.spawn(move |_| {
                chunk.parse(decoder);
                barrier.signal();
            });
        }
        barrier.wait();
    });
}
