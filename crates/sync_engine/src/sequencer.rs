//! Inertial/image sequencer.
//!
//! Merges the inertial stream with synchronized image batches so that the
//! consumer observes inertial samples in non-decreasing timestamp order
//! across the whole run, each delivered exactly once, and always before the
//! first image batch whose representative timestamp they precede.
//!
//! The two entry points are called from independent producer threads, but
//! never concurrently for the same instance (single logical consumer, as
//! guaranteed by the owning pipeline).

use std::collections::VecDeque;

use contracts::{ImuSample, SequencedUpdate, StampedImu, SyncedImageBatch};
use tracing::{debug, instrument, warn};

/// Sequencer construction parameters
#[derive(Debug, Clone, Copy)]
pub struct SequencerParams {
    /// Inertial buffer capacity; oldest samples are evicted past this.
    /// Capacity eviction is a safety valve, not a correctness mechanism.
    pub imu_buffer_size: usize,
    /// Lag beyond which a late inertial sample is reported as stale rather
    /// than merely out of cadence
    pub imu_jitter_threshold_ns: i64,
}

/// Inertial/image sequencer
pub struct Sequencer {
    params: SequencerParams,
    /// Buffered inertial samples, non-decreasing timestamp order
    imu_buffer: VecDeque<StampedImu>,
    /// Representative timestamp of the last emitted batch
    last_batch_ts: Option<i64>,
    /// Inertial samples dropped as late or by capacity pressure
    dropped_count: u64,
}

impl Sequencer {
    /// Create a sequencer
    pub fn new(params: SequencerParams) -> Self {
        Self {
            params,
            imu_buffer: VecDeque::with_capacity(params.imu_buffer_size.max(1)),
            last_batch_ts: None,
            dropped_count: 0,
        }
    }

    /// Number of buffered inertial samples
    pub fn buffered_imu(&self) -> usize {
        self.imu_buffer.len()
    }

    /// Inertial samples dropped so far (late arrivals + capacity evictions)
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count
    }

    /// Record one inertial sample
    ///
    /// The inertial stream is internally ordered; a violating arrival is
    /// still inserted at its ordered position so downstream guarantees hold.
    #[instrument(level = "trace", name = "sequencer_push_inertial", skip(self, sample))]
    pub fn push_inertial(&mut self, timestamp_ns: i64, sample: ImuSample) {
        if self.imu_buffer.len() >= self.params.imu_buffer_size.max(1) {
            // Capacity safety valve: evict oldest-first.
            if let Some(evicted) = self.imu_buffer.pop_front() {
                warn!(
                    timestamp_ns = evicted.timestamp_ns,
                    "inertial buffer full, evicting oldest sample"
                );
                self.dropped_count += 1;
                metrics::counter!("sequencer_imu_dropped_total", "reason" => "capacity")
                    .increment(1);
            }
        }

        let stamped = StampedImu {
            timestamp_ns,
            sample,
        };
        match self.imu_buffer.back() {
            Some(last) if last.timestamp_ns > timestamp_ns => {
                warn!(
                    timestamp_ns,
                    newest = last.timestamp_ns,
                    "inertial sample arrived out of order"
                );
                let pos = self
                    .imu_buffer
                    .partition_point(|s| s.timestamp_ns <= timestamp_ns);
                self.imu_buffer.insert(pos, stamped);
            }
            _ => self.imu_buffer.push_back(stamped),
        }
    }

    /// Merge a synchronized image batch with the buffered inertial samples
    ///
    /// Releases every buffered sample with timestamp at or before the
    /// batch's representative timestamp, in timestamp order. Samples that
    /// arrived too late to be released with their own batch (timestamp at or
    /// before the previous representative timestamp) can no longer be
    /// delivered without breaking global ordering; they are dropped and
    /// reported here.
    #[instrument(
        level = "debug",
        name = "sequencer_push_batch",
        skip(self, batch),
        fields(timestamp_ns = batch.timestamp_ns, batch_id = batch.batch_id)
    )]
    pub fn push_batch(&mut self, batch: SyncedImageBatch) -> SequencedUpdate {
        let representative = batch.timestamp_ns;

        if let Some(last_ts) = self.last_batch_ts {
            while let Some(front) = self.imu_buffer.front() {
                if front.timestamp_ns > last_ts {
                    break;
                }
                let lag = representative - front.timestamp_ns;
                if lag > self.params.imu_jitter_threshold_ns {
                    warn!(
                        timestamp_ns = front.timestamp_ns,
                        lag_ns = lag,
                        "dropping stale inertial sample"
                    );
                } else {
                    debug!(
                        timestamp_ns = front.timestamp_ns,
                        "dropping late inertial sample"
                    );
                }
                self.imu_buffer.pop_front();
                self.dropped_count += 1;
                metrics::counter!("sequencer_imu_dropped_total", "reason" => "late").increment(1);
            }
        }

        let released_len = self
            .imu_buffer
            .partition_point(|s| s.timestamp_ns <= representative);
        let imu: Vec<StampedImu> = self.imu_buffer.drain(..released_len).collect();

        self.last_batch_ts = Some(representative);
        metrics::histogram!("sequencer_imu_per_batch").record(imu.len() as f64);

        SequencedUpdate { imu, batch }
    }
}
