//! Per-stream image buffer with timestamp-based ordering.
//!
//! Uses index-based separation for better performance:
//! - HeapRb stores lightweight metadata (timestamp + slab key)
//! - Slab stores the actual image payloads
//!
//! This avoids moving large payloads during buffer operations.

use std::fmt;

use contracts::StampedImage;
use ringbuf::{traits::*, HeapRb};
use slab::Slab;

/// Lightweight metadata stored in the ring buffer
#[derive(Debug, Clone, Copy)]
struct FrameMeta {
    /// Timestamp for ordering, nanoseconds
    timestamp_ns: i64,
    /// Key into the slab storage
    slab_key: usize,
}

/// Bounded buffer for one sensor stream
///
/// Holds unconsumed samples awaiting pairing. When full, the oldest entry is
/// evicted (capacity safety valve). Entries older than the synchronizer's
/// tolerance window are evicted explicitly via [`StreamBuffer::evict_stale`].
pub struct StreamBuffer {
    /// Ring buffer of metadata (timestamp + slab key)
    index: HeapRb<FrameMeta>,
    /// Actual payload storage
    storage: Slab<StampedImage>,
    dropped_count: u64,
    out_of_order_count: u64,
    last_timestamp: Option<i64>,
}

impl fmt::Debug for StreamBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamBuffer")
            .field("len", &self.index.occupied_len())
            .field("dropped", &self.dropped_count)
            .finish()
    }
}

impl StreamBuffer {
    /// Create a buffer holding at most `max_size` samples
    pub fn new(max_size: usize) -> Self {
        Self {
            index: HeapRb::new(max_size.max(1)),
            storage: Slab::with_capacity(max_size.max(1)),
            dropped_count: 0,
            out_of_order_count: 0,
            last_timestamp: None,
        }
    }

    /// Push a sample into the buffer
    ///
    /// If the buffer is full, the oldest sample is evicted and counted as
    /// dropped.
    pub fn push(&mut self, sample: StampedImage) {
        let timestamp_ns = sample.timestamp_ns;

        // Track out-of-order arrivals within the stream
        if let Some(last) = self.last_timestamp {
            if timestamp_ns < last {
                self.out_of_order_count += 1;
            }
        }
        self.last_timestamp = Some(timestamp_ns);

        if self.index.is_full() {
            if let Some(old_meta) = self.index.try_pop() {
                self.storage.remove(old_meta.slab_key);
            }
            self.dropped_count += 1;
        }

        let slab_key = self.storage.insert(sample);
        let _ = self.index.try_push(FrameMeta {
            timestamp_ns,
            slab_key,
        });
    }

    /// Newest held timestamp; among equals the most recently inserted wins
    pub fn newest_timestamp(&self) -> Option<i64> {
        let mut newest = None;
        for meta in self.index.iter() {
            match newest {
                Some(ts) if meta.timestamp_ns < ts => {}
                _ => newest = Some(meta.timestamp_ns),
            }
        }
        newest
    }

    /// Newest sample with timestamp in `[target - tolerance, target]`
    ///
    /// Among equal timestamps the most recently inserted wins, so a fresher
    /// value for the stream is always preferred.
    pub fn best_within(&self, target_ns: i64, tolerance_ns: i64) -> Option<&StampedImage> {
        let min_ts = target_ns - tolerance_ns;
        let mut best: Option<&FrameMeta> = None;
        for meta in self.index.iter() {
            if meta.timestamp_ns < min_ts || meta.timestamp_ns > target_ns {
                continue;
            }
            match best {
                Some(b) if meta.timestamp_ns < b.timestamp_ns => {}
                _ => best = Some(meta),
            }
        }
        best.and_then(|meta| self.storage.get(meta.slab_key))
    }

    /// Evict samples older than `cutoff_ns`, returning the evicted count
    pub fn evict_stale(&mut self, cutoff_ns: i64) -> usize {
        let mut evicted = 0;
        let remaining: Vec<FrameMeta> = self
            .index
            .pop_iter()
            .filter(|m| {
                if m.timestamp_ns >= cutoff_ns {
                    true
                } else {
                    self.storage.remove(m.slab_key);
                    evicted += 1;
                    false
                }
            })
            .collect();

        // Rebuild index (only moves small metadata, not payloads)
        for m in remaining {
            let _ = self.index.try_push(m);
        }

        self.dropped_count += evicted as u64;
        evicted
    }

    /// Remove consumed samples up to and including `up_to_ns`
    pub fn remove_consumed(&mut self, up_to_ns: i64) {
        let remaining: Vec<FrameMeta> = self
            .index
            .pop_iter()
            .filter(|m| {
                if m.timestamp_ns > up_to_ns {
                    true
                } else {
                    self.storage.remove(m.slab_key);
                    false
                }
            })
            .collect();

        for m in remaining {
            let _ = self.index.try_push(m);
        }
    }

    /// Number of buffered samples
    pub fn len(&self) -> usize {
        self.index.occupied_len()
    }

    /// True when nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Cumulative count of samples evicted as stale or by capacity pressure
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count
    }

    /// Cumulative count of out-of-order arrivals within the stream
    pub fn out_of_order_count(&self) -> u64 {
        self.out_of_order_count
    }
}
