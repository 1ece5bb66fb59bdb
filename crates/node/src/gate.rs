//! Readiness and initialization gate.
//!
//! Initialization needs static metadata from every sensor before the engine
//! can be constructed: one camera-info per camera stream, plus a first
//! inertial message when fusion is enabled. The gate accumulates that
//! readiness and guards initialization so it runs exactly once per run.

use contracts::CameraInfo;
use tracing::{debug, warn};

/// Gate lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// One or more required streams have not delivered metadata yet
    AwaitingSensors,
    /// All metadata present; initialization has not completed
    Ready,
    /// One-time setup completed
    Initialized,
}

/// Sensor readiness accumulator and one-shot initialization guard
pub struct ReadinessGate {
    camera_names: Vec<String>,
    require_imu: bool,
    camera_infos: Vec<Option<CameraInfo>>,
    imu_seen: bool,
    initialized: bool,
}

impl ReadinessGate {
    pub fn new(camera_names: Vec<String>, require_imu: bool) -> Self {
        let num_cameras = camera_names.len();
        Self {
            camera_names,
            require_imu,
            camera_infos: vec![None; num_cameras],
            imu_seen: false,
            initialized: false,
        }
    }

    pub fn state(&self) -> GateState {
        if self.initialized {
            GateState::Initialized
        } else if self.missing().is_empty() {
            GateState::Ready
        } else {
            GateState::AwaitingSensors
        }
    }

    /// Required streams that have not delivered metadata yet
    pub fn missing(&self) -> Vec<String> {
        let mut missing: Vec<String> = self
            .camera_infos
            .iter()
            .enumerate()
            .filter(|(_, info)| info.is_none())
            .map(|(i, _)| self.camera_names[i].clone())
            .collect();
        if self.require_imu && !self.imu_seen {
            missing.push("imu".to_string());
        }
        missing
    }

    /// Record one camera-info message; the first per stream wins
    ///
    /// Returns true when this message completed the readiness set.
    pub fn observe_camera_info(&mut self, stream: usize, info: CameraInfo) -> bool {
        let Some(slot) = self.camera_infos.get_mut(stream) else {
            warn!(stream, "camera info for unknown stream, ignoring");
            return false;
        };
        if slot.is_some() {
            debug!(stream, "duplicate camera info, ignoring");
            return false;
        }
        *slot = Some(info);
        debug!(stream, "camera info recorded");
        self.state() == GateState::Ready
    }

    /// Record the first inertial message
    ///
    /// Returns true when this message completed the readiness set.
    pub fn observe_inertial(&mut self) -> bool {
        if self.imu_seen {
            return false;
        }
        self.imu_seen = true;
        debug!("first inertial sample recorded");
        self.state() == GateState::Ready
    }

    /// Claim the one-shot initialization
    ///
    /// Returns false when the gate is not ready or initialization already
    /// ran; a second `Ready` signal (e.g. a duplicate camera-info) must be a
    /// no-op, not a re-initialization.
    pub fn begin_initialization(&mut self) -> bool {
        if self.initialized {
            warn!("initialization requested again, ignoring");
            return false;
        }
        if self.state() != GateState::Ready {
            return false;
        }
        true
    }

    /// Mark setup complete. Not calling this after a failed
    /// `begin_initialization` leaves the gate in `Ready`, a fatal-for-this-run
    /// condition surfaced to the caller; the gate never retries on its own.
    pub fn complete_initialization(&mut self) {
        self.initialized = true;
    }

    /// Collected camera infos, stream-index order; `None` until all present
    pub fn camera_infos(&self) -> Option<Vec<CameraInfo>> {
        self.camera_infos.iter().cloned().collect()
    }

    /// Drop all accumulated state
    pub fn reset(&mut self) {
        for slot in self.camera_infos.iter_mut() {
            *slot = None;
        }
        self.imu_seen = false;
        self.initialized = false;
    }
}
