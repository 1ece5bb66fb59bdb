//! # Estimation
//!
//! Sliding-window derived state on top of raw tracking output:
//! - [`PoseCache`]: timestamped pose window, finite-difference velocity and
//!   a pose covariance estimate
//! - [`VelocityCache`]: twist window and its twist covariance estimate
//!
//! Both caches are plain data transformations owned by the tracking step;
//! they hold no locks and never block. Reset on tracking loss.

mod pose_cache;
mod velocity_cache;

pub use pose_cache::PoseCache;
pub use velocity_cache::VelocityCache;

/// Six-axis quantity ordered x, y, z, roll, pitch, yaw
pub type Axes = [f64; 6];

/// Row-major 6x6 covariance matrix
pub type Covariance = [f64; 36];

/// Wrap an angle difference into `(-pi, pi]`
pub(crate) fn wrap_angle(delta: f64) -> f64 {
    let mut d = delta % std::f64::consts::TAU;
    if d > std::f64::consts::PI {
        d -= std::f64::consts::TAU;
    } else if d <= -std::f64::consts::PI {
        d += std::f64::consts::TAU;
    }
    d
}

/// Diagonal covariance from per-axis sample variance (n-1 degrees of
/// freedom). `samples` must contain at least two rows.
pub(crate) fn diagonal_covariance(samples: &[Axes]) -> Covariance {
    let n = samples.len() as f64;
    let mut mean = [0.0f64; 6];
    for row in samples {
        for axis in 0..6 {
            mean[axis] += row[axis];
        }
    }
    for m in mean.iter_mut() {
        *m /= n;
    }

    let mut cov = [0.0f64; 36];
    for axis in 0..6 {
        let var: f64 = samples
            .iter()
            .map(|row| {
                let d = row[axis] - mean[axis];
                d * d
            })
            .sum::<f64>()
            / (n - 1.0);
        cov[axis * 6 + axis] = var;
    }
    cov
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn wrap_angle_stays_in_range() {
        assert_relative_eq!(wrap_angle(0.1), 0.1);
        assert_relative_eq!(wrap_angle(std::f64::consts::PI + 0.1), -std::f64::consts::PI + 0.1);
        assert_relative_eq!(wrap_angle(-std::f64::consts::PI - 0.1), std::f64::consts::PI - 0.1);
    }

    #[test]
    fn diagonal_covariance_is_per_axis_variance() {
        let samples = [
            [1.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            [3.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        ];
        let cov = diagonal_covariance(&samples);
        // var([1, 3]) with n-1 d.o.f. = 2
        assert_relative_eq!(cov[0], 2.0);
        for axis in 1..6 {
            assert_relative_eq!(cov[axis * 6 + axis], 0.0);
        }
        // Off-diagonal entries stay zero
        assert_relative_eq!(cov[1], 0.0);
    }
}
