//! Tracking engine boundary
//!
//! The visual/inertial tracking engine is an external collaborator: it
//! ingests a rigid camera rig description, per-frame images and inertial
//! samples, and returns pose estimates and map persistence results. Its
//! internals are out of scope; this module only freezes the calling
//! contract.

use serde::{Deserialize, Serialize};

use crate::{CameraInfo, ContractError, RigidTransform, StampedImage, StampedImu};

/// Outcome of one tracking step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackStatus {
    /// Pose estimate is valid
    Ok,
    /// Visual tracking is lost; the caller should reset derived state
    Lost,
}

/// Pose estimate returned by [`TrackingEngine::track`]
#[derive(Debug, Clone)]
pub struct TrackEstimate {
    /// Tracking outcome
    pub status: TrackStatus,

    /// Estimated rig pose in the engine's odometry frame.
    /// Only meaningful when `status == TrackStatus::Ok`.
    pub pose: RigidTransform,

    /// 6x6 row-major pose covariance, when the engine provides one
    pub covariance: Option<[f64; 36]>,
}

/// Terminal status of an asynchronous map operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    /// Operation finished successfully
    Ok,
    /// Engine reported failure
    Failed,
    /// Localization ran to completion without finding a pose
    CannotLocalize,
    /// Force-resolved because the owning system shut down before the
    /// engine callback fired
    ShutDown,
}

impl OperationStatus {
    /// True only for [`OperationStatus::Ok`]
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Result delivered by a save-map completion callback
#[derive(Debug, Clone, Copy)]
pub struct SaveResponse {
    pub status: OperationStatus,
}

/// Result delivered by a localize completion callback
///
/// `pose` is expressed in the engine's own coordinate convention; callers
/// convert it before exposing it.
#[derive(Debug, Clone, Copy)]
pub struct LocalizeResponse {
    pub status: OperationStatus,
    pub pose: Option<RigidTransform>,
}

/// Completion callback for [`TrackingEngine::save_map`].
/// Invoked exactly once, from the engine's processing thread.
pub type SaveCompletion = Box<dyn FnOnce(SaveResponse) + Send>;

/// Completion callback for [`TrackingEngine::localize`].
/// Invoked exactly once, from the engine's processing thread.
pub type LocalizeCompletion = Box<dyn FnOnce(LocalizeResponse) + Send>;

/// One camera of the rig: static metadata plus its mounting transform
#[derive(Debug, Clone)]
pub struct RigCamera {
    /// Intrinsics and frame metadata
    pub info: CameraInfo,

    /// Pose of the camera's optical frame in the rig base frame
    pub rig_from_camera: RigidTransform,
}

/// Rigid multi-camera rig description handed to the engine at construction
#[derive(Debug, Clone, Default)]
pub struct CameraRig {
    pub cameras: Vec<RigCamera>,
}

impl CameraRig {
    pub fn num_cameras(&self) -> usize {
        self.cameras.len()
    }
}

/// Inertial sensor calibration forwarded to the engine
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ImuCalibration {
    pub gyroscope_noise_density: f64,
    pub gyroscope_random_walk: f64,
    pub accelerometer_noise_density: f64,
    pub accelerometer_random_walk: f64,
    /// Nominal sample frequency (Hz)
    pub frequency: f64,
}

impl Default for ImuCalibration {
    fn default() -> Self {
        Self {
            gyroscope_noise_density: 0.000244,
            gyroscope_random_walk: 0.000019393,
            accelerometer_noise_density: 0.001862,
            accelerometer_random_walk: 0.003,
            frequency: 200.0,
        }
    }
}

/// Engine construction options
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Enable the mapping/localization backend
    pub enable_mapping: bool,

    /// Fuse inertial samples into odometry
    pub enable_imu_fusion: bool,

    /// IMU calibration (meaningful only with `enable_imu_fusion`)
    pub imu_calibration: ImuCalibration,

    /// Pose of the inertial sensor in the rig base frame
    pub rig_from_imu: RigidTransform,

    /// Largest tolerated gap between consecutive tracked frames (ms)
    pub max_frame_delta_ms: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enable_mapping: true,
            enable_imu_fusion: false,
            imu_calibration: ImuCalibration::default(),
            rig_from_imu: RigidTransform::identity(),
            max_frame_delta_ms: 100.0,
        }
    }
}

/// The external tracking engine
///
/// A handle is created once per run via [`EngineFactory::create`] and
/// destroyed by dropping it. Calls are not reentrant: the owner must never
/// issue a second `track` while one is outstanding for the same handle.
///
/// `save_map` and `localize` return immediately; their completion callbacks
/// fire later from the engine's processing thread, possibly during an
/// unrelated subsequent `track` call. A synchronous `Err` from either means
/// the callback will never fire.
pub trait TrackingEngine: Send {
    /// Run one tracking step over a synchronized image set
    fn track(
        &mut self,
        images: &[StampedImage],
        timestamp_ns: i64,
    ) -> Result<TrackEstimate, ContractError>;

    /// Loop-closure-corrected pose in the engine's map frame
    fn refined_pose(&mut self) -> Result<RigidTransform, ContractError>;

    /// Register one inertial sample ahead of the tracking step at `batch_ts_ns`
    fn register_inertial(
        &mut self,
        batch_ts_ns: i64,
        sample: &StampedImu,
    ) -> Result<(), ContractError>;

    /// Persist the current map to `path`; completion is asynchronous
    fn save_map(&mut self, path: &std::path::Path, done: SaveCompletion)
        -> Result<(), ContractError>;

    /// Localize in a previously saved map around `hint` (engine convention);
    /// completion is asynchronous
    fn localize(
        &mut self,
        path: &std::path::Path,
        hint: &RigidTransform,
        done: LocalizeCompletion,
    ) -> Result<(), ContractError>;
}

/// Factory for tracking engine handles
pub trait EngineFactory: Send + Sync {
    /// Construct an engine for the given rig, or fail
    fn create(
        &self,
        rig: &CameraRig,
        config: &EngineConfig,
    ) -> Result<Box<dyn TrackingEngine>, ContractError>;
}
