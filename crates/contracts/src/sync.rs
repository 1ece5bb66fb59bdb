//! Synchronization pipeline outputs: `SyncedImageBatch` and `SequencedUpdate`.

use crate::{StampedImage, StampedImu};

/// A time-aligned batch of images, one per qualifying stream
///
/// Invariants:
/// - all members lie within the configured jitter tolerance of
///   `timestamp_ns`, the representative timestamp (the maximum member
///   timestamp);
/// - a batch is emitted at most once per representative timestamp and only
///   when at least `min_streams` camera streams contributed;
/// - mask streams ride along with their camera and never count toward
///   `min_streams`.
#[derive(Debug, Clone)]
pub struct SyncedImageBatch {
    /// Representative timestamp (maximum member timestamp), nanoseconds
    pub timestamp_ns: i64,

    /// Batch sequence number (monotonically increasing)
    pub batch_id: u64,

    /// Member images, ordered by stream index
    pub images: Vec<StampedImage>,

    /// Sync diagnostics
    pub meta: SyncMeta,
}

/// Sync diagnostics carried with each batch
#[derive(Debug, Clone, Default)]
pub struct SyncMeta {
    /// Packets evicted as stale or by capacity pressure since the last batch
    pub dropped_count: u32,

    /// Per-member deviation from the representative timestamp, nanoseconds,
    /// in the same order as `SyncedImageBatch::images`
    pub jitter_ns: Vec<i64>,
}

/// The fused unit handed to the tracking step
///
/// Invariants:
/// - `imu` is in non-decreasing timestamp order;
/// - no inertial sample appears in two updates;
/// - no inertial sample is newer than `batch.timestamp_ns`.
#[derive(Debug, Clone)]
pub struct SequencedUpdate {
    /// Inertial samples with timestamps at or before the batch
    pub imu: Vec<StampedImu>,

    /// The synchronized image batch
    pub batch: SyncedImageBatch,
}
