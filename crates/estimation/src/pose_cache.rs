//! Sliding-window pose cache.

use std::collections::VecDeque;

use contracts::{transform_axes, RigidTransform};

use crate::{diagonal_covariance, wrap_angle, Axes, Covariance};

const NS_PER_SEC: f64 = 1e9;

/// Sliding window of timestamped poses
///
/// Velocity is the finite difference between the oldest and newest retained
/// entries, which smooths single-frame jitter at the cost of responsiveness;
/// the window length is the tuning knob. Covariance is the diagonal of the
/// per-axis displacement sample variance across the window.
pub struct PoseCache {
    window: usize,
    entries: VecDeque<(i64, RigidTransform)>,
}

impl PoseCache {
    /// Create a cache retaining at most `window` entries
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(2),
            entries: VecDeque::with_capacity(window.max(2)),
        }
    }

    /// Append an entry, evicting the oldest when the window is full
    pub fn add(&mut self, timestamp_ns: i64, pose: RigidTransform) {
        if self.entries.len() >= self.window {
            self.entries.pop_front();
        }
        self.entries.push_back((timestamp_ns, pose));
    }

    /// Number of retained entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are retained
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear all entries; called on tracking loss and re-initialization
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Linear and angular velocity over the whole window
    ///
    /// All-zero with fewer than two entries, or when the window spans no
    /// time (duplicate timestamps).
    pub fn velocity(&self) -> Axes {
        let (Some(&(t0, oldest)), Some(&(t1, newest))) =
            (self.entries.front(), self.entries.back())
        else {
            return [0.0; 6];
        };
        if self.entries.len() < 2 || t1 <= t0 {
            return [0.0; 6];
        }

        let dt = (t1 - t0) as f64 / NS_PER_SEC;
        let from = transform_axes(&oldest);
        let to = transform_axes(&newest);

        let mut velocity = [0.0f64; 6];
        for axis in 0..3 {
            velocity[axis] = (to[axis] - from[axis]) / dt;
        }
        for axis in 3..6 {
            velocity[axis] = wrap_angle(to[axis] - from[axis]) / dt;
        }
        velocity
    }

    /// Diagonal pose covariance from per-axis displacement variance
    ///
    /// `None` with fewer than three entries: two displacement samples are
    /// the minimum for an n-1 variance.
    pub fn covariance(&self) -> Option<Covariance> {
        if self.entries.len() < 3 {
            return None;
        }

        let axes: Vec<Axes> = self
            .entries
            .iter()
            .map(|(_, pose)| transform_axes(pose))
            .collect();
        let displacements: Vec<Axes> = axes
            .windows(2)
            .map(|pair| {
                let mut d = [0.0f64; 6];
                for axis in 0..3 {
                    d[axis] = pair[1][axis] - pair[0][axis];
                }
                for axis in 3..6 {
                    d[axis] = wrap_angle(pair[1][axis] - pair[0][axis]);
                }
                d
            })
            .collect();

        Some(diagonal_covariance(&displacements))
    }
}
