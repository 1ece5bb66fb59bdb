//! Multi-camera synchronizer.
//!
//! Buffers per-stream image arrivals and emits a [`SyncedImageBatch`] once
//! enough camera streams hold a sample within the jitter tolerance of the
//! newest held timestamp. Mask streams (index >= camera count) are paired
//! with their camera and never count toward the required stream minimum.

use contracts::{ImageData, StampedImage, SyncMeta, SyncedImageBatch};
use tracing::{instrument, trace, warn};

use crate::buffer::StreamBuffer;

/// Synchronizer construction parameters
#[derive(Debug, Clone, Copy)]
pub struct SynchronizerParams {
    /// Number of camera streams
    pub num_cameras: usize,
    /// Number of mask streams (each paired with the camera of equal index)
    pub num_masks: usize,
    /// Largest timestamp deviation still considered simultaneous
    pub jitter_tolerance_ns: i64,
    /// Camera streams required to emit a batch
    pub min_streams: usize,
    /// Per-stream buffer capacity
    pub buffer_size: usize,
}

/// Multi-camera synchronizer
pub struct Synchronizer {
    params: SynchronizerParams,
    /// One slot per stream: cameras first, then masks
    slots: Vec<StreamBuffer>,
    /// Batch counter
    batch_counter: u64,
    /// Representative timestamp of the last emitted batch
    last_emitted_ts: Option<i64>,
    /// Drop total already reported through batch metadata
    reported_dropped: u64,
}

impl Synchronizer {
    /// Create a synchronizer for the given rig shape
    pub fn new(params: SynchronizerParams) -> Self {
        let num_streams = params.num_cameras + params.num_masks;
        let slots = (0..num_streams)
            .map(|_| StreamBuffer::new(params.buffer_size))
            .collect();
        Self {
            params,
            slots,
            batch_counter: 0,
            last_emitted_ts: None,
            reported_dropped: 0,
        }
    }

    /// Total stream count (cameras + masks)
    pub fn num_streams(&self) -> usize {
        self.slots.len()
    }

    /// Batches emitted so far
    pub fn batch_count(&self) -> u64 {
        self.batch_counter
    }

    /// Record a sample for `stream`
    ///
    /// Runs entirely on the calling thread. Returns the emitted batch when
    /// this arrival completes one; each call triggers at most one emission.
    #[instrument(
        level = "trace",
        name = "synchronizer_add_message",
        skip(self, image),
        fields(stream, timestamp_ns)
    )]
    pub fn add_message(
        &mut self,
        stream: usize,
        timestamp_ns: i64,
        image: ImageData,
    ) -> Option<SyncedImageBatch> {
        if stream >= self.slots.len() {
            warn!(stream, num_streams = self.slots.len(), "ignoring unknown stream");
            metrics::counter!("sync_unknown_stream_total").increment(1);
            return None;
        }

        self.slots[stream].push(StampedImage {
            stream,
            timestamp_ns,
            image,
        });
        metrics::counter!("sync_images_received_total").increment(1);

        self.try_emit()
    }

    /// Newest timestamp across all streams; among equals the most recently
    /// inserted wins (slot-local scan already prefers later insertions)
    fn newest_held_timestamp(&self) -> Option<i64> {
        let mut newest = None;
        for slot in &self.slots {
            if let Some(ts) = slot.newest_timestamp() {
                match newest {
                    Some(n) if ts < n => {}
                    _ => newest = Some(ts),
                }
            }
        }
        newest
    }

    fn try_emit(&mut self) -> Option<SyncedImageBatch> {
        let newest = self.newest_held_timestamp()?;
        let tolerance = self.params.jitter_tolerance_ns;

        // Streams lagging behind the newest arrival beyond tolerance are
        // treated as missed, bounding memory independent of batch cadence.
        let cutoff = newest.saturating_sub(tolerance);
        let mut evicted = 0;
        for slot in self.slots.iter_mut() {
            evicted += slot.evict_stale(cutoff);
        }
        if evicted > 0 {
            trace!(evicted, cutoff, "evicted stale samples");
            metrics::counter!("sync_images_dropped_total").increment(evicted as u64);
        }

        // Qualifying camera streams: newest sample within tolerance of the
        // newest held timestamp.
        let num_cameras = self.params.num_cameras;
        let mut members: Vec<StampedImage> = Vec::with_capacity(self.slots.len());
        let mut qualifying_cameras = 0usize;
        for camera in 0..num_cameras {
            if let Some(sample) = self.slots[camera].best_within(newest, tolerance) {
                members.push(sample.clone());
                qualifying_cameras += 1;
            }
        }

        if qualifying_cameras < self.params.min_streams {
            return None;
        }

        // Masks ride along with their qualifying camera.
        for member_idx in 0..qualifying_cameras {
            let camera = members[member_idx].stream;
            let mask_stream = num_cameras + camera;
            if mask_stream < self.slots.len() {
                if let Some(mask) = self.slots[mask_stream].best_within(newest, tolerance) {
                    members.push(mask.clone());
                }
            }
        }
        members.sort_by_key(|m| m.stream);

        // Representative timestamp: maximum member timestamp.
        let representative = members.iter().map(|m| m.timestamp_ns).max()?;

        // At most one emission per representative timestamp.
        if self.last_emitted_ts == Some(representative) {
            return None;
        }

        // Consume the emitted samples (and anything older in those slots).
        for member in &members {
            self.slots[member.stream].remove_consumed(member.timestamp_ns);
        }

        let total_dropped: u64 = self.slots.iter().map(|s| s.dropped_count()).sum();
        let dropped_count = total_dropped.saturating_sub(self.reported_dropped) as u32;
        self.reported_dropped = total_dropped;

        let jitter_ns: Vec<i64> = members
            .iter()
            .map(|m| representative - m.timestamp_ns)
            .collect();

        self.batch_counter += 1;
        self.last_emitted_ts = Some(representative);

        metrics::counter!("sync_batches_total").increment(1);
        for j in &jitter_ns {
            metrics::histogram!("sync_batch_jitter_ns").record(*j as f64);
        }

        Some(SyncedImageBatch {
            timestamp_ns: representative,
            batch_id: self.batch_counter,
            images: members,
            meta: SyncMeta {
                dropped_count,
                jitter_ns,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::ImageFormat;

    const MS: i64 = 1_000_000;

    fn image() -> ImageData {
        ImageData {
            width: 8,
            height: 8,
            format: ImageFormat::Mono8,
            data: Bytes::from_static(&[0u8; 64]),
        }
    }

    fn stereo_params() -> SynchronizerParams {
        SynchronizerParams {
            num_cameras: 2,
            num_masks: 0,
            jitter_tolerance_ns: 10 * MS,
            min_streams: 2,
            buffer_size: 16,
        }
    }

    #[test]
    fn emits_batch_within_tolerance() {
        let mut sync = Synchronizer::new(stereo_params());

        assert!(sync.add_message(0, 100 * MS, image()).is_none());
        let batch = sync.add_message(1, 105 * MS, image()).unwrap();

        assert_eq!(batch.timestamp_ns, 105 * MS);
        assert_eq!(batch.images.len(), 2);
        assert_eq!(batch.images[0].stream, 0);
        assert_eq!(batch.images[1].stream, 1);
        assert_eq!(batch.meta.jitter_ns, vec![5 * MS, 0]);
    }

    #[test]
    fn no_batch_without_counterpart() {
        let mut sync = Synchronizer::new(stereo_params());

        sync.add_message(0, 100 * MS, image());
        sync.add_message(1, 105 * MS, image());
        // Stream 0 alone at t=200ms: stream 1 has nothing within tolerance.
        assert!(sync.add_message(0, 200 * MS, image()).is_none());
        // Once stream 1 catches up, the batch appears.
        let batch = sync.add_message(1, 204 * MS, image()).unwrap();
        assert_eq!(batch.timestamp_ns, 204 * MS);
    }

    #[test]
    fn never_fewer_than_min_streams() {
        let mut sync = Synchronizer::new(stereo_params());
        for i in 0..20 {
            // Only stream 0 ever produces: batching must stall, not degrade.
            assert!(sync.add_message(0, (100 + i * 30) * MS, image()).is_none());
        }
        assert_eq!(sync.batch_count(), 0);
    }

    #[test]
    fn prefers_freshest_sample_per_stream() {
        let mut sync = Synchronizer::new(stereo_params());
        sync.add_message(0, 100 * MS, image());
        sync.add_message(0, 103 * MS, image());
        let batch = sync.add_message(1, 105 * MS, image()).unwrap();
        assert_eq!(batch.images[0].timestamp_ns, 103 * MS);
    }

    #[test]
    fn one_emission_per_representative_timestamp() {
        let mut sync = Synchronizer::new(SynchronizerParams {
            min_streams: 1,
            ..stereo_params()
        });
        let first = sync.add_message(0, 100 * MS, image());
        assert!(first.is_some());
        // Same representative timestamp on the other stream: no re-emission
        // with the already-consumed value; the new arrival alone qualifies,
        // but the representative timestamp is unchanged.
        assert!(sync.add_message(1, 100 * MS, image()).is_none());
    }

    #[test]
    fn mask_streams_ride_along() {
        let mut sync = Synchronizer::new(SynchronizerParams {
            num_cameras: 1,
            num_masks: 1,
            jitter_tolerance_ns: 10 * MS,
            min_streams: 1,
            buffer_size: 16,
        });

        // Mask alone must not trigger a batch.
        assert!(sync.add_message(1, 100 * MS, image()).is_none());
        let batch = sync.add_message(0, 102 * MS, image()).unwrap();
        assert_eq!(batch.images.len(), 2);
        assert_eq!(batch.images[1].stream, 1);
        assert_eq!(batch.timestamp_ns, 102 * MS);
    }

    #[test]
    fn stale_streams_are_dropped_not_held() {
        let mut sync = Synchronizer::new(stereo_params());
        sync.add_message(0, 100 * MS, image());
        // Stream 1 jumps far ahead: the stale stream-0 sample is evicted
        // instead of being held indefinitely.
        assert!(sync.add_message(1, 500 * MS, image()).is_none());
        let batch = sync.add_message(0, 498 * MS, image()).unwrap();
        assert_eq!(batch.timestamp_ns, 500 * MS);
        assert!(batch.images.iter().all(|m| m.timestamp_ns >= 498 * MS));
        assert_eq!(batch.meta.dropped_count, 1);
    }
}
