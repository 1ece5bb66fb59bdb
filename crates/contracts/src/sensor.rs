//! Raw sensor sample structures: camera images, masks, inertial samples.
//!
//! Stream indexing convention: camera streams occupy indices
//! `0..num_cameras`; mask streams occupy `num_cameras..2*num_cameras` and
//! mask stream `num_cameras + i` belongs to camera `i`.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Image data payload (zero-copy)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Pixel format
    pub format: ImageFormat,

    /// Raw pixel data
    pub data: Bytes,
}

/// Pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    Mono8,
    Rgb8,
    Bgra8,
    /// Single-channel mask: non-zero pixels are ignored by the tracker
    Mask8,
}

/// A camera image stamped with its stream index and acquisition time
#[derive(Debug, Clone)]
pub struct StampedImage {
    /// Stream index (camera, or mask offset by the camera count)
    pub stream: usize,

    /// Acquisition timestamp, nanoseconds
    pub timestamp_ns: i64,

    /// Image payload
    pub image: ImageData,
}

/// One inertial measurement
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ImuSample {
    /// Accelerometer reading (m/s²)
    pub linear_acceleration: [f64; 3],

    /// Gyroscope reading (rad/s)
    pub angular_velocity: [f64; 3],
}

/// An inertial sample stamped with its acquisition time
#[derive(Debug, Clone, Copy)]
pub struct StampedImu {
    /// Acquisition timestamp, nanoseconds
    pub timestamp_ns: i64,

    /// Measurement
    pub sample: ImuSample,
}

/// Static per-camera metadata delivered once at startup
///
/// Carries everything needed to describe one camera of the rig to the
/// tracking engine: intrinsics, resolution and the optical frame name used
/// for the extrinsic lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraInfo {
    /// Name of the camera's optical frame in the transform tree
    pub frame_id: String,

    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Focal lengths (fx, fy) in pixels
    pub focal: [f64; 2],

    /// Principal point (cx, cy) in pixels
    pub principal: [f64; 2],

    /// Distortion coefficients, model-defined ordering
    #[serde(default)]
    pub distortion: Vec<f64>,
}

/// Resolve which camera a stream index refers to.
///
/// Returns `(camera_index, is_mask)`, or `None` when the index lies outside
/// the rig entirely.
pub fn camera_for_stream(stream: usize, num_cameras: usize) -> Option<(usize, bool)> {
    if stream < num_cameras {
        Some((stream, false))
    } else if stream < 2 * num_cameras {
        Some((stream - num_cameras, true))
    } else {
        None
    }
}
