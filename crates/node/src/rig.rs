//! Camera rig assembly.
//!
//! Combines per-stream camera-info metadata with extrinsics resolved
//! through the transform provider. A configured `optical_frame` overrides
//! the frame carried by the camera-info message; when the lookup fails the
//! static extrinsics from the rig configuration are used instead.

use contracts::{
    transform_from_parts, CameraInfo, CameraRig, ContractError, FusionBlueprint, RigCamera,
    RigidTransform, TransformProvider,
};
use tracing::{debug, info};

/// Build the rig description handed to the engine at construction
pub fn build_rig(
    blueprint: &FusionBlueprint,
    infos: &[CameraInfo],
    transforms: &dyn TransformProvider,
) -> Result<CameraRig, ContractError> {
    let base = &blueprint.rig.base_frame;
    let mut cameras = Vec::with_capacity(infos.len());

    for (stream, info) in infos.iter().enumerate() {
        let camera_config = &blueprint.rig.cameras[stream];
        let optical_frame = if camera_config.optical_frame.is_empty() {
            info.frame_id.as_str()
        } else {
            camera_config.optical_frame.as_str()
        };

        let rig_from_camera = match transforms.lookup(base, optical_frame) {
            Ok(transform) => transform,
            Err(e) => {
                info!(
                    stream,
                    optical_frame,
                    error = %e,
                    "transform lookup failed, using configured static extrinsics"
                );
                transform_from_parts(camera_config.translation, camera_config.rotation_rpy)
            }
        };

        debug!(stream, optical_frame, "rig camera assembled");
        cameras.push(RigCamera {
            info: info.clone(),
            rig_from_camera,
        });
    }

    Ok(CameraRig { cameras })
}

/// Pose of the inertial sensor in the rig base frame
///
/// Identity when fusion is disabled or the frame cannot be resolved.
pub fn imu_extrinsics(
    blueprint: &FusionBlueprint,
    transforms: &dyn TransformProvider,
) -> RigidTransform {
    if !blueprint.imu.enable_fusion || blueprint.imu.frame.is_empty() {
        return RigidTransform::identity();
    }
    match transforms.lookup(&blueprint.rig.base_frame, &blueprint.imu.frame) {
        Ok(transform) => transform,
        Err(e) => {
            info!(
                frame = %blueprint.imu.frame,
                error = %e,
                "inertial extrinsics lookup failed, using identity"
            );
            RigidTransform::identity()
        }
    }
}
