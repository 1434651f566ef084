//! Completion counting for fanned-out parse work.

use std::sync::{Condvar, Mutex};

/// Blocks one thread until a fixed number of completion signals have arrived.
///
/// The count is fixed at construction: callers must create the barrier with
/// the true number of outstanding units *before* submitting any of them, so a
/// unit that finishes early can never signal into an uncounted barrier and a
/// signal can never be lost.
#[derive(Debug)]
pub struct CountingBarrier {
    remaining: Mutex<usize>,
    done: Condvar,
}

impl CountingBarrier {
    /// Create a barrier expecting exactly `count` signals.
    pub fn new(count: usize) -> Self {
        Self {
            remaining: Mutex::new(count),
            done: Condvar::new(),
        }
    }

    /// Record one unit of work as complete.
    ///
    /// # Panics
    ///
    /// Panics if called more times than the construction count; the count
    /// never goes negative.
    pub fn signal(&self) {
        let mut remaining = self.remaining.lock().expect("barrier lock poisoned");
        assert!(
            *remaining > 0,
            "CountingBarrier signaled more times than its count"
        );
        *remaining -= 1;
        if *remaining == 0 {
            self.done.notify_all();
        }
    }

    /// Block until every counted unit has signaled.
    ///
    /// Returns immediately when the barrier was created with a count of zero.
    /// There is no timeout; the wait ends only when the count reaches zero.
    pub fn wait(&self) {
        let mut remaining = self.remaining.lock().expect("barrier lock poisoned");
        while *remaining > 0 {
            remaining = self.done.wait(remaining).expect("barrier lock poisoned");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn zero_count_wait_returns_immediately() {
        CountingBarrier::new(0).wait();
    }

    #[test]
    fn wait_after_all_signals() {
        let barrier = CountingBarrier::new(3);
        barrier.signal();
        barrier.signal();
        barrier.signal();
        barrier.wait();
    }

    #[test]
    fn wait_blocks_until_last_signal() {
        let barrier = Arc::new(CountingBarrier::new(4));
        let mut handles = Vec::new();
        for i in 0..4u64 {
            let barrier = Arc::clone(&barrier);
            handles.push(thread::spawn(move || {
                thread::sleep(Duration::from_millis(5 * i));
                barrier.signal();
            }));
        }
        barrier.wait();
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    #[should_panic(expected = "more times than its count")]
    fn oversignal_panics() {
        let barrier = CountingBarrier::new(1);
        barrier.signal();
        barrier.signal();
    }
}
