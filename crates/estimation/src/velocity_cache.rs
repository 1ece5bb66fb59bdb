//! Sliding-window twist cache.

use std::collections::VecDeque;

use crate::{diagonal_covariance, Axes, Covariance};

/// Sliding window of six-axis twists
///
/// Holds the velocities produced by [`crate::PoseCache`] per tracking step
/// and estimates a twist covariance from their per-axis sample variance.
pub struct VelocityCache {
    window: usize,
    twists: VecDeque<Axes>,
}

impl VelocityCache {
    /// Create a cache retaining at most `window` twists
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(2),
            twists: VecDeque::with_capacity(window.max(2)),
        }
    }

    /// Append a twist, evicting the oldest when the window is full
    pub fn add(&mut self, twist: Axes) {
        if self.twists.len() >= self.window {
            self.twists.pop_front();
        }
        self.twists.push_back(twist);
    }

    /// Number of retained twists
    pub fn len(&self) -> usize {
        self.twists.len()
    }

    /// True when no twists are retained
    pub fn is_empty(&self) -> bool {
        self.twists.is_empty()
    }

    /// Clear all twists; called on tracking loss and re-initialization
    pub fn reset(&mut self) {
        self.twists.clear();
    }

    /// Diagonal twist covariance; `None` with fewer than two twists
    pub fn covariance(&self) -> Option<Covariance> {
        if self.twists.len() < 2 {
            return None;
        }
        let samples: Vec<Axes> = self.twists.iter().copied().collect();
        Some(diagonal_covariance(&samples))
    }
}
