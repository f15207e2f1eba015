//! A bounded recycling allocator for frame buffers.
//!
//! Grounded on the "message pool" described in the design: a process-global
//! free list keyed by size class, capped by total bytes outstanding so a
//! misbehaving client can't force unbounded allocation.

use std::sync::Mutex;

/// Buffers above this size are never pooled; they're allocated directly and
/// dropped on release.
const MAX_POOLED_SIZE: usize = 64 * 1024;

/// Total bytes of free (released) buffers the pool will hold onto.
const DEFAULT_TOTAL_CAP: usize = 4 * 1024 * 1024;

/// Rounds a requested length up to one of a small set of size classes, so
/// that buffers get reused across requests of similar but not identical size.
fn size_class(len: usize) -> usize {
    let mut class = 256;
    while class < len {
        class *= 2;
    }
    class
}

#[derive(Default)]
struct Inner {
    // Free buffers, bucketed by size class.
    free: std::collections::HashMap<usize, Vec<Vec<u8>>>,
    free_bytes: usize,
}

/// A process-global, size-classed buffer pool.
///
/// Shared via `Arc` by every session, per §4.B / §9 "Global state" — there is
/// exactly one message pool per [`super::Server`].
pub struct Pool {
    inner: Mutex<Inner>,
    total_cap: usize,
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool").field("total_cap", &self.total_cap).finish()
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::new(DEFAULT_TOTAL_CAP)
    }
}

impl Pool {
    /// Creates a pool with the given total-bytes cap for freed buffers.
    pub fn new(total_cap: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            total_cap,
        }
    }

    /// Returns a buffer of at least `len` bytes, reusing a pooled one if
    /// available, or allocating fresh otherwise.
    pub fn acquire(&self, len: usize) -> Vec<u8> {
        if len > MAX_POOLED_SIZE {
            return vec![0; len];
        }

        let class = size_class(len);
        let mut inner = self.inner.lock().unwrap();
        if let Some(bucket) = inner.free.get_mut(&class) {
            if let Some(mut buf) = bucket.pop() {
                inner.free_bytes = inner.free_bytes.saturating_sub(buf.capacity());
                buf.clear();
                buf.resize(len, 0);
                return buf;
            }
        }

        vec![0; len]
    }

    /// Returns a buffer to the pool, unless that would exceed the total-bytes
    /// cap, in which case it's simply dropped.
    pub fn release(&self, buf: Vec<u8>) {
        let cap = buf.capacity();
        if cap == 0 || cap > MAX_POOLED_SIZE {
            return;
        }

        let mut inner = self.inner.lock().unwrap();
        if inner.free_bytes + cap > self.total_cap {
            return;
        }

        inner.free_bytes += cap;
        inner.free.entry(size_class(cap)).or_default().push(buf);
    }

    /// Total bytes currently held in the free list.
    pub fn free_bytes(&self) -> usize {
        self.inner.lock().unwrap().free_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_returns_buffer_of_requested_length() {
        let pool = Pool::default();
        let buf = pool.acquire(100);
        assert_eq!(buf.len(), 100);
    }

    #[test]
    fn released_buffers_are_reused() {
        let pool = Pool::default();
        let buf = pool.acquire(100);
        let ptr = buf.as_ptr();
        pool.release(buf);

        assert!(pool.free_bytes() > 0);

        let reused = pool.acquire(100);
        assert_eq!(reused.as_ptr(), ptr);
    }

    #[test]
    fn oversized_buffers_are_never_pooled() {
        let pool = Pool::default();
        let buf = pool.acquire(MAX_POOLED_SIZE + 1);
        pool.release(buf);
        assert_eq!(pool.free_bytes(), 0);
    }

    #[test]
    fn release_above_total_cap_is_dropped() {
        let pool = Pool::new(10);
        let buf = pool.acquire(100);
        pool.release(buf);
        assert_eq!(pool.free_bytes(), 0);
    }
}
