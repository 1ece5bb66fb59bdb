//! Scripted mock tracking engine
//!
//! Implements the `TrackingEngine` contract without any real vision backend.
//! Used for tests and for running the pipeline without the external engine.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use contracts::{
    transform_from_parts, CameraRig, ContractError, EngineConfig, EngineFactory,
    LocalizeCompletion, LocalizeResponse, OperationStatus, RigidTransform, SaveCompletion,
    SaveResponse, StampedImage, StampedImu, TrackEstimate, TrackStatus, TrackingEngine,
};
use tracing::{debug, trace};

/// When deferred map-operation completions fire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionMode {
    /// Resolve pending completions at the start of the next `track` call,
    /// mirroring the real engine resolving map work on its processing thread
    NextTrack,
    /// Never resolve; exercises the shutdown force-completion path
    Never,
}

/// Mock engine behavior script
#[derive(Debug, Clone)]
pub struct MockEngineConfig {
    /// Track statuses returned in order; `Ok` once exhausted
    pub statuses: Vec<TrackStatus>,
    /// Rig translation per tracking step (meters)
    pub step_translation: [f64; 3],
    /// Attach a covariance to each estimate
    pub provide_covariance: bool,
    /// Reject `save_map` synchronously
    pub reject_save: bool,
    /// Reject `localize` synchronously
    pub reject_localize: bool,
    /// Localization completes with a pose (else `CannotLocalize`)
    pub localize_finds_pose: bool,
    /// Save completion status once it fires
    pub save_succeeds: bool,
    pub completion_mode: CompletionMode,
}

impl Default for MockEngineConfig {
    fn default() -> Self {
        Self {
            statuses: Vec::new(),
            step_translation: [0.1, 0.0, 0.0],
            provide_covariance: true,
            reject_save: false,
            reject_localize: false,
            localize_finds_pose: true,
            save_succeeds: true,
            completion_mode: CompletionMode::NextTrack,
        }
    }
}

/// Observable mock engine state, shared with the factory for assertions
#[derive(Debug, Default)]
pub struct MockState {
    pub engines_created: AtomicU64,
    pub track_calls: AtomicU64,
    pub imu_registered: AtomicU64,
    pub saved_paths: Mutex<Vec<PathBuf>>,
    pub localized_paths: Mutex<Vec<PathBuf>>,
}

enum Pending {
    Save(SaveCompletion),
    Localize {
        hint: RigidTransform,
        done: LocalizeCompletion,
    },
}

/// Scripted tracking engine
pub struct MockEngine {
    config: MockEngineConfig,
    state: Arc<MockState>,
    statuses: VecDeque<TrackStatus>,
    step: u64,
    pending: Vec<Pending>,
}

impl MockEngine {
    pub fn new(config: MockEngineConfig, state: Arc<MockState>) -> Self {
        let statuses = config.statuses.iter().copied().collect();
        Self {
            config,
            state,
            statuses,
            step: 0,
            pending: Vec::new(),
        }
    }

    fn current_pose(&self) -> RigidTransform {
        let s = self.step as f64;
        let [dx, dy, dz] = self.config.step_translation;
        transform_from_parts([s * dx, s * dy, s * dz], [0.0, 0.0, 0.0])
    }

    fn resolve_pending(&mut self) {
        for pending in self.pending.drain(..) {
            match pending {
                Pending::Save(done) => {
                    let status = if self.config.save_succeeds {
                        OperationStatus::Ok
                    } else {
                        OperationStatus::Failed
                    };
                    debug!(?status, "resolving deferred save");
                    done(SaveResponse { status });
                }
                Pending::Localize { hint, done } => {
                    let response = if self.config.localize_finds_pose {
                        LocalizeResponse {
                            status: OperationStatus::Ok,
                            pose: Some(hint),
                        }
                    } else {
                        LocalizeResponse {
                            status: OperationStatus::CannotLocalize,
                            pose: None,
                        }
                    };
                    debug!(status = ?response.status, "resolving deferred localize");
                    done(response);
                }
            }
        }
    }
}

impl TrackingEngine for MockEngine {
    fn track(
        &mut self,
        images: &[StampedImage],
        timestamp_ns: i64,
    ) -> Result<TrackEstimate, ContractError> {
        if images.is_empty() {
            return Err(ContractError::engine_rejected("track", "empty image set"));
        }

        if self.config.completion_mode == CompletionMode::NextTrack {
            self.resolve_pending();
        }

        self.step += 1;
        self.state.track_calls.fetch_add(1, Ordering::Relaxed);

        let status = self.statuses.pop_front().unwrap_or(TrackStatus::Ok);
        trace!(timestamp_ns, step = self.step, ?status, "mock track step");

        let covariance = self.config.provide_covariance.then(|| {
            let mut cov = [0.0f64; 36];
            for axis in 0..6 {
                cov[axis * 6 + axis] = 0.01;
            }
            cov
        });

        Ok(TrackEstimate {
            status,
            pose: self.current_pose(),
            covariance,
        })
    }

    fn refined_pose(&mut self) -> Result<RigidTransform, ContractError> {
        Ok(self.current_pose())
    }

    fn register_inertial(
        &mut self,
        batch_ts_ns: i64,
        sample: &StampedImu,
    ) -> Result<(), ContractError> {
        if sample.timestamp_ns > batch_ts_ns {
            return Err(ContractError::engine_rejected(
                "register_inertial",
                "sample newer than its batch",
            ));
        }
        self.state.imu_registered.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn save_map(&mut self, path: &Path, done: SaveCompletion) -> Result<(), ContractError> {
        if self.config.reject_save {
            return Err(ContractError::engine_rejected("save_map", "mock rejection"));
        }
        if let Ok(mut saved) = self.state.saved_paths.lock() {
            saved.push(path.to_path_buf());
        }
        self.pending.push(Pending::Save(done));
        Ok(())
    }

    fn localize(
        &mut self,
        path: &Path,
        hint: &RigidTransform,
        done: LocalizeCompletion,
    ) -> Result<(), ContractError> {
        if self.config.reject_localize {
            return Err(ContractError::engine_rejected("localize", "mock rejection"));
        }
        if let Ok(mut localized) = self.state.localized_paths.lock() {
            localized.push(path.to_path_buf());
        }
        self.pending.push(Pending::Localize { hint: *hint, done });
        Ok(())
    }
}

/// Factory producing [`MockEngine`] handles
pub struct MockEngineFactory {
    config: MockEngineConfig,
    state: Arc<MockState>,
    fail_create: bool,
}

impl MockEngineFactory {
    pub fn new(config: MockEngineConfig) -> Self {
        Self {
            config,
            state: Arc::new(MockState::default()),
            fail_create: false,
        }
    }

    /// Factory whose `create` always fails; exercises the gate's
    /// fatal-initialization path
    pub fn failing() -> Self {
        Self {
            config: MockEngineConfig::default(),
            state: Arc::new(MockState::default()),
            fail_create: true,
        }
    }

    /// Shared observable state for assertions
    pub fn state(&self) -> Arc<MockState> {
        Arc::clone(&self.state)
    }
}

impl Default for MockEngineFactory {
    fn default() -> Self {
        Self::new(MockEngineConfig::default())
    }
}

impl EngineFactory for MockEngineFactory {
    fn create(
        &self,
        rig: &CameraRig,
        _config: &EngineConfig,
    ) -> Result<Box<dyn TrackingEngine>, ContractError> {
        if self.fail_create {
            return Err(ContractError::EngineCreate {
                message: "mock factory configured to fail".into(),
            });
        }
        if rig.cameras.is_empty() {
            return Err(ContractError::EngineCreate {
                message: "rig has no cameras".into(),
            });
        }

        self.state.engines_created.fetch_add(1, Ordering::Relaxed);
        debug!(cameras = rig.num_cameras(), "mock engine created");
        Ok(Box::new(MockEngine::new(
            self.config.clone(),
            Arc::clone(&self.state),
        )))
    }
}
