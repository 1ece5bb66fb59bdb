//! # Node
//!
//! Ties the pipeline together: readiness gating, one-shot initialization,
//! the per-batch tracking step, derived-state estimation and the
//! map-operation request surface.
//!
//! Producers (per-camera threads, the inertial thread, the camera-info
//! dispatch) call into [`FusionNode`] synchronously; the node serializes them
//! on an internal lock and runs the merge and tracking work on the calling
//! thread. Map operations bridge to the engine's asynchronous completions
//! through the `coordinator` crate.

mod error;
mod gate;
mod node;
mod rig;
mod transforms;

pub use error::NodeError;
pub use gate::{GateState, ReadinessGate};
pub use node::{FusionNode, OutputCallback, TrackingOutput};
pub use rig::{build_rig, imu_extrinsics};
pub use transforms::StaticTransforms;
