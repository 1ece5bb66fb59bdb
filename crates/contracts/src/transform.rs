//! Rigid transforms and the transform-lookup capability.

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

use crate::ContractError;

/// A rigid transform: position + orientation relating two coordinate frames
pub type RigidTransform = Isometry3<f64>;

/// Build a rigid transform from a translation and roll/pitch/yaw (radians)
pub fn transform_from_parts(translation: [f64; 3], rpy: [f64; 3]) -> RigidTransform {
    Isometry3::from_parts(
        Translation3::new(translation[0], translation[1], translation[2]),
        UnitQuaternion::from_euler_angles(rpy[0], rpy[1], rpy[2]),
    )
}

/// Split a rigid transform into its six pose axes: (x, y, z, roll, pitch, yaw)
pub fn transform_axes(pose: &RigidTransform) -> [f64; 6] {
    let t = pose.translation.vector;
    let (roll, pitch, yaw) = pose.rotation.euler_angles();
    [t.x, t.y, t.z, roll, pitch, yaw]
}

/// Rotate a free vector by the rotation part of a transform
pub fn rotate_vector(pose: &RigidTransform, v: [f64; 3]) -> [f64; 3] {
    let out = pose.rotation * Vector3::new(v[0], v[1], v[2]);
    [out.x, out.y, out.z]
}

/// Transform lookup capability
///
/// Given two named frames, return the rigid transform placing `source` in
/// `target`, or fail. The tree behind the lookup is an external collaborator;
/// this core never publishes into it.
pub trait TransformProvider: Send + Sync {
    /// Latest transform of `source` expressed in `target`
    fn lookup(&self, target: &str, source: &str) -> Result<RigidTransform, ContractError>;
}
