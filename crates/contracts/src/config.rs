//! FusionBlueprint - Config Loader output
//!
//! Describes the complete fusion setup: camera rig, stream synchronization,
//! inertial fusion, estimation windows, mapping options.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ImuCalibration;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete fusion configuration blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Camera rig definition
    pub rig: RigConfig,

    /// Multi-camera synchronizer settings
    #[serde(default)]
    pub sync: SyncConfig,

    /// Inertial/image sequencer settings
    #[serde(default)]
    pub sequencer: SequencerConfig,

    /// Pose/velocity estimation windows
    #[serde(default)]
    pub estimation: EstimationConfig,

    /// Inertial fusion settings
    #[serde(default)]
    pub imu: ImuConfig,

    /// Mapping and localization settings
    #[serde(default)]
    pub mapping: MappingConfig,
}

impl FusionBlueprint {
    /// Number of camera streams in the rig
    pub fn num_cameras(&self) -> usize {
        self.rig.cameras.len()
    }

    /// Total stream count: cameras plus mask streams
    pub fn num_streams(&self) -> usize {
        self.num_cameras() + self.rig.num_input_masks
    }

    /// Camera streams required for a batch; defaults to the whole rig
    pub fn min_streams(&self) -> usize {
        self.sync.min_images.unwrap_or_else(|| self.num_cameras())
    }
}

/// Camera rig definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigConfig {
    /// Rig base frame; camera extrinsics are expressed relative to it
    #[serde(default = "default_base_frame")]
    pub base_frame: String,

    /// Map frame used for localization results
    #[serde(default = "default_map_frame")]
    pub map_frame: String,

    /// Camera stream definitions, in stream-index order
    pub cameras: Vec<CameraStreamConfig>,

    /// Number of mask streams accompanying the cameras
    #[serde(default)]
    pub num_input_masks: usize,
}

fn default_base_frame() -> String {
    "base_link".to_string()
}

fn default_map_frame() -> String {
    "map".to_string()
}

/// One camera stream of the rig
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraStreamConfig {
    /// Human-readable stream name, unique within the rig
    pub name: String,

    /// Optical frame override; when empty the frame from the first
    /// camera-info message is used
    #[serde(default)]
    pub optical_frame: String,

    /// Static extrinsic (base -> optical), used by static transform
    /// providers in mock/replay setups: translation in meters
    #[serde(default)]
    pub translation: [f64; 3],

    /// Static extrinsic rotation as roll/pitch/yaw in radians
    #[serde(default)]
    pub rotation_rpy: [f64; 3],
}

/// Multi-camera synchronizer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Largest timestamp deviation between images still considered
    /// simultaneous (milliseconds)
    pub matching_threshold_ms: f64,

    /// Per-stream buffer capacity; oldest entries are evicted past this
    pub image_buffer_size: usize,

    /// Camera streams required to emit a batch; `None` means all cameras
    #[serde(default)]
    pub min_images: Option<usize>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            matching_threshold_ms: 5.0,
            image_buffer_size: 100,
            min_images: None,
        }
    }
}

/// Inertial/image sequencer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequencerConfig {
    /// Inertial buffer capacity (capacity safety valve, oldest-first)
    pub imu_buffer_size: usize,

    /// Inertial jitter threshold (milliseconds)
    pub imu_jitter_threshold_ms: f64,

    /// Warn when consecutive tracked frames are further apart than this
    /// (milliseconds)
    pub image_jitter_threshold_ms: f64,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            imu_buffer_size: 50,
            imu_jitter_threshold_ms: 10.0,
            image_jitter_threshold_ms: 34.0,
        }
    }
}

/// Pose/velocity estimation windows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimationConfig {
    /// Pose cache window size (entries)
    pub pose_window: usize,

    /// Velocity cache window size (entries)
    pub velocity_window: usize,

    /// Capacity of the tracking execution-time statistics window
    pub timing_window: usize,
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            pose_window: 10,
            velocity_window: 10,
            timing_window: 100,
        }
    }
}

/// Inertial fusion settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImuConfig {
    /// Fuse inertial samples into tracking
    pub enable_fusion: bool,

    /// Inertial sensor frame; when empty the frame from the first inertial
    /// message is used
    #[serde(default)]
    pub frame: String,

    /// Sensor noise calibration
    #[serde(default)]
    pub calibration: ImuCalibration,
}

/// Mapping and localization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Enable the mapping/localization backend
    pub enable: bool,

    /// Map folder to localize in on startup, when set
    #[serde(default)]
    pub load_map_path: Option<PathBuf>,

    /// Kick off a localization attempt right after initialization
    #[serde(default)]
    pub localize_on_startup: bool,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            enable: true,
            load_map_path: None,
            localize_on_startup: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_streams_defaults_to_all_cameras() {
        let blueprint: FusionBlueprint = serde_json::from_str(
            r#"{ "rig": { "cameras": [ { "name": "cam0" }, { "name": "cam1" } ] } }"#,
        )
        .unwrap();
        assert_eq!(blueprint.num_cameras(), 2);
        assert_eq!(blueprint.min_streams(), 2);
        assert_eq!(blueprint.num_streams(), 2);
    }

    #[test]
    fn mask_streams_extend_stream_count() {
        let blueprint: FusionBlueprint = serde_json::from_str(
            r#"{
                "rig": {
                    "cameras": [ { "name": "cam0" } ],
                    "num_input_masks": 1
                },
                "sync": { "matching_threshold_ms": 5.0, "image_buffer_size": 10, "min_images": 1 }
            }"#,
        )
        .unwrap();
        assert_eq!(blueprint.num_streams(), 2);
        assert_eq!(blueprint.min_streams(), 1);
    }
}
