//! # Sync Engine
//!
//! Sensor synchronization and sequencing pipeline.
//!
//! Responsibilities:
//! - Buffer per-stream image arrivals and emit time-aligned batches
//!   ([`Synchronizer`])
//! - Merge the inertial stream with synchronized batches into strictly
//!   ordered [`SequencedUpdate`]s ([`Sequencer`])
//!
//! All merging runs synchronously on the calling producer's thread; there is
//! no internal worker. Each `add_message`/`push_batch` call may produce at
//! most one downstream value, returned to the caller for synchronous
//! delivery.
//!
//! ## Usage
//!
//! ```ignore
//! let mut sync = Synchronizer::new(params);
//! let mut seq = Sequencer::new(seq_params);
//!
//! if let Some(batch) = sync.add_message(stream, ts, image) {
//!     let update = seq.push_batch(batch);
//!     // hand update to the tracking step
//! }
//! ```

mod buffer;
mod sequencer;
mod synchronizer;

pub use sequencer::{Sequencer, SequencerParams};
pub use synchronizer::{Synchronizer, SynchronizerParams};

// Re-export contract types that appear in this crate's API
pub use contracts::{SequencedUpdate, StampedImage, StampedImu, SyncMeta, SyncedImageBatch};
