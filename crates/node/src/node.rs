//! Fusion node: readiness gating, the tracking step and map operations.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use contracts::{
    CameraInfo, EngineConfig, EngineFactory, FusionBlueprint, ImageData, ImuSample,
    LocalizeResponse, OperationStatus, RigidTransform, SaveResponse, SequencedUpdate, TrackStatus,
    TrackingEngine, TransformProvider,
};
use coordinator::{Completion, Coordinator, OperationHandle};
use estimation::{PoseCache, VelocityCache};
use observability::RollingStats;
use sync_engine::{Sequencer, SequencerParams, Synchronizer, SynchronizerParams};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::error::NodeError;
use crate::gate::{GateState, ReadinessGate};
use crate::rig::{build_rig, imu_extrinsics};

/// Result of one successful tracking step
#[derive(Debug, Clone)]
pub struct TrackingOutput {
    /// Representative timestamp of the tracked batch
    pub timestamp_ns: i64,
    pub batch_id: u64,

    /// Rig pose in the odometry frame
    pub pose: RigidTransform,

    /// Loop-closure-corrected pose in the map frame, when available
    pub refined_pose: Option<RigidTransform>,

    /// Covariance reported by the engine itself, when provided
    pub engine_covariance: Option<[f64; 36]>,

    /// Finite-difference velocity over the pose window
    pub velocity: [f64; 6],

    /// Windowed pose covariance; identity until the window fills
    pub pose_covariance: [f64; 36],

    /// Windowed twist covariance; identity until the window fills
    pub velocity_covariance: [f64; 36],
}

/// Consumer of tracking outputs, invoked synchronously on the tracking thread
pub type OutputCallback = Box<dyn FnMut(&TrackingOutput) + Send>;

fn ms_to_ns(ms: f64) -> i64 {
    (ms * 1e6) as i64
}

fn identity_covariance() -> [f64; 36] {
    let mut cov = [0.0f64; 36];
    for axis in 0..6 {
        cov[axis * 6 + axis] = 1.0;
    }
    cov
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Split a one-shot completion so both the engine callback and the issuing
/// path can resolve it; whichever side fires first wins.
fn split_once<T: Send + 'static>(complete: Completion<T>) -> (Completion<T>, Completion<T>) {
    let shared = Arc::new(Mutex::new(Some(complete)));
    let left = {
        let shared = Arc::clone(&shared);
        Box::new(move |value: T| {
            if let Some(complete) = lock(&shared).take() {
                complete(value);
            }
        })
    };
    let right = Box::new(move |value: T| {
        if let Some(complete) = lock(&shared).take() {
            complete(value);
        }
    });
    (left, right)
}

/// Everything behind the node's lock
struct Pipeline {
    gate: ReadinessGate,
    synchronizer: Synchronizer,
    sequencer: Sequencer,
    engine: Option<Box<dyn TrackingEngine>>,
    pose_cache: PoseCache,
    velocity_cache: VelocityCache,
    timing: RollingStats,
    last_track_ts: Option<i64>,
    output: Option<OutputCallback>,
    pending_localize: Option<OperationHandle<LocalizeResponse>>,
}

/// The fusion node
///
/// Producers call in synchronously; the node serializes them on one internal
/// lock and runs merging and tracking on the calling thread. Blocking map
/// requests release the lock before waiting so the resolving tracking step
/// can proceed.
pub struct FusionNode {
    blueprint: FusionBlueprint,
    factory: Arc<dyn EngineFactory>,
    transforms: Arc<dyn TransformProvider>,
    coordinator: Arc<Coordinator>,
    pipeline: Mutex<Pipeline>,
}

impl FusionNode {
    pub fn new(
        blueprint: FusionBlueprint,
        factory: Arc<dyn EngineFactory>,
        transforms: Arc<dyn TransformProvider>,
    ) -> Arc<Self> {
        let synchronizer = Synchronizer::new(SynchronizerParams {
            num_cameras: blueprint.num_cameras(),
            num_masks: blueprint.rig.num_input_masks,
            jitter_tolerance_ns: ms_to_ns(blueprint.sync.matching_threshold_ms),
            min_streams: blueprint.min_streams(),
            buffer_size: blueprint.sync.image_buffer_size,
        });
        let sequencer = Sequencer::new(SequencerParams {
            imu_buffer_size: blueprint.sequencer.imu_buffer_size,
            imu_jitter_threshold_ns: ms_to_ns(blueprint.sequencer.imu_jitter_threshold_ms),
        });
        let camera_names = blueprint
            .rig
            .cameras
            .iter()
            .map(|c| c.name.clone())
            .collect();

        Arc::new(Self {
            pipeline: Mutex::new(Pipeline {
                gate: ReadinessGate::new(camera_names, blueprint.imu.enable_fusion),
                synchronizer,
                sequencer,
                engine: None,
                pose_cache: PoseCache::new(blueprint.estimation.pose_window),
                velocity_cache: VelocityCache::new(blueprint.estimation.velocity_window),
                timing: RollingStats::new(blueprint.estimation.timing_window),
                last_track_ts: None,
                output: None,
                pending_localize: None,
            }),
            blueprint,
            factory,
            transforms,
            coordinator: Coordinator::new(),
        })
    }

    /// Register the consumer of tracking outputs
    pub fn set_output(&self, callback: OutputCallback) {
        lock(&self.pipeline).output = Some(callback);
    }

    pub fn gate_state(&self) -> GateState {
        lock(&self.pipeline).gate.state()
    }

    /// Deliver one camera-info message
    ///
    /// The message completing the readiness set triggers the one-shot
    /// initialization. A failed initialization leaves the gate `Ready` and
    /// is not retried; the error is surfaced here.
    #[instrument(level = "debug", name = "node_camera_info", skip(self, info), fields(stream))]
    pub fn submit_camera_info(
        self: &Arc<Self>,
        stream: usize,
        info: CameraInfo,
    ) -> Result<(), NodeError> {
        let mut pipeline = lock(&self.pipeline);
        if pipeline.gate.state() == GateState::Initialized {
            debug!(stream, "camera info after initialization, ignoring");
            return Ok(());
        }
        if pipeline.gate.observe_camera_info(stream, info) {
            self.initialize(&mut pipeline)?;
        }
        Ok(())
    }

    /// Deliver one inertial sample
    pub fn submit_inertial(
        self: &Arc<Self>,
        timestamp_ns: i64,
        sample: ImuSample,
    ) -> Result<(), NodeError> {
        let mut pipeline = lock(&self.pipeline);
        if pipeline.gate.state() == GateState::Initialized {
            observability::record_imu_received();
            pipeline.sequencer.push_inertial(timestamp_ns, sample);
            return Ok(());
        }
        if pipeline.gate.observe_inertial() {
            self.initialize(&mut pipeline)?;
        }
        Ok(())
    }

    /// Deliver one image for `stream`
    ///
    /// Dropped silently until initialization completes.
    pub fn submit_image(&self, stream: usize, timestamp_ns: i64, image: ImageData) {
        let mut pipeline = lock(&self.pipeline);
        if pipeline.gate.state() != GateState::Initialized {
            trace!(stream, timestamp_ns, "image before initialization, dropping");
            return;
        }

        observability::record_image_received(stream);
        if let Some(batch) = pipeline.synchronizer.add_message(stream, timestamp_ns, image) {
            observability::record_sync_metrics(&batch.meta, batch.batch_id);
            let update = pipeline.sequencer.push_batch(batch);
            self.track_step(&mut pipeline, update);
        }
    }

    /// One-time setup, run while holding the pipeline lock
    fn initialize(self: &Arc<Self>, pipeline: &mut Pipeline) -> Result<(), NodeError> {
        if !pipeline.gate.begin_initialization() {
            return Ok(());
        }

        let Some(infos) = pipeline.gate.camera_infos() else {
            return Ok(());
        };
        let rig = build_rig(&self.blueprint, &infos, self.transforms.as_ref())?;
        let engine_config = EngineConfig {
            enable_mapping: self.blueprint.mapping.enable,
            enable_imu_fusion: self.blueprint.imu.enable_fusion,
            imu_calibration: self.blueprint.imu.calibration,
            rig_from_imu: imu_extrinsics(&self.blueprint, self.transforms.as_ref()),
            ..EngineConfig::default()
        };

        let engine = match self.factory.create(&rig, &engine_config) {
            Ok(engine) => engine,
            Err(e) => {
                // Fatal for this run: the gate stays Ready, no retry.
                error!(error = %e, "engine construction failed");
                return Err(e.into());
            }
        };

        pipeline.engine = Some(engine);
        pipeline.pose_cache.reset();
        pipeline.velocity_cache.reset();
        pipeline.gate.complete_initialization();
        info!(cameras = rig.num_cameras(), "fusion node initialized");

        if self.blueprint.mapping.localize_on_startup {
            if let Some(path) = self.blueprint.mapping.load_map_path.clone() {
                let node = Arc::clone(self);
                std::thread::spawn(move || {
                    info!(path = %path.display(), "startup localization");
                    match node.request_localize(&path, &RigidTransform::identity()) {
                        Ok(Some(_)) => info!("startup localization succeeded"),
                        Ok(None) => warn!("startup localization found no pose"),
                        Err(e) => warn!(error = %e, "startup localization failed"),
                    }
                });
            }
        }
        Ok(())
    }

    fn track_step(&self, pipeline: &mut Pipeline, update: SequencedUpdate) {
        let batch = update.batch;
        let timestamp_ns = batch.timestamp_ns;

        let Some(engine) = pipeline.engine.as_mut() else {
            return;
        };

        for sample in &update.imu {
            if let Err(e) = engine.register_inertial(timestamp_ns, sample) {
                warn!(
                    timestamp_ns = sample.timestamp_ns,
                    error = %e,
                    "inertial registration failed, continuing"
                );
            }
        }

        let started = Instant::now();
        let estimate = match engine.track(&batch.images, timestamp_ns) {
            Ok(estimate) => estimate,
            Err(e) => {
                error!(timestamp_ns, error = %e, "tracking step failed");
                return;
            }
        };
        let refined_pose = match estimate.status {
            TrackStatus::Ok => engine.refined_pose().ok(),
            TrackStatus::Lost => None,
        };
        let execution_ms = started.elapsed().as_secs_f64() * 1000.0;

        pipeline.timing.push(execution_ms);
        observability::record_track_result(estimate.status, execution_ms);

        let threshold_ms = self.blueprint.sequencer.image_jitter_threshold_ms;
        if let Some(last) = pipeline.last_track_ts {
            let delta_ns = timestamp_ns - last;
            if delta_ns > ms_to_ns(threshold_ms) {
                warn!(
                    delta_ms = delta_ns as f64 / 1e6,
                    threshold_ms, "inter-frame delta exceeds jitter threshold"
                );
            }
        }
        pipeline.last_track_ts = Some(timestamp_ns);

        Self::check_localization(pipeline);

        if estimate.status == TrackStatus::Lost {
            warn!(timestamp_ns, "tracking lost, resetting derived state");
            pipeline.pose_cache.reset();
            pipeline.velocity_cache.reset();
            return;
        }

        pipeline.pose_cache.add(timestamp_ns, estimate.pose);
        let velocity = pipeline.pose_cache.velocity();
        pipeline.velocity_cache.add(velocity);
        let pose_covariance = pipeline
            .pose_cache
            .covariance()
            .unwrap_or_else(identity_covariance);
        let velocity_covariance = pipeline
            .velocity_cache
            .covariance()
            .unwrap_or_else(identity_covariance);

        let output = TrackingOutput {
            timestamp_ns,
            batch_id: batch.batch_id,
            pose: estimate.pose,
            refined_pose,
            engine_covariance: estimate.covariance,
            velocity,
            pose_covariance,
            velocity_covariance,
        };
        if let Some(callback) = pipeline.output.as_mut() {
            callback(&output);
        }
    }

    /// Drain a completed asynchronous localization, if any
    fn check_localization(pipeline: &mut Pipeline) {
        let Some(handle) = &pipeline.pending_localize else {
            return;
        };
        let Some(response) = handle.poll() else {
            return;
        };
        match response.status {
            OperationStatus::Ok => info!("localization completed"),
            status => warn!(?status, "localization did not complete"),
        }
        observability::record_operation_resolved("localize", response.status.is_ok());
        pipeline.pending_localize = None;
    }

    /// Persist the current map, blocking until the engine resolves
    #[instrument(level = "info", name = "node_save_map", skip(self), fields(path = %path.display()))]
    pub fn request_save_map(&self, path: &Path) -> Result<(), NodeError> {
        let handle = {
            let mut pipeline = lock(&self.pipeline);
            if !self.blueprint.mapping.enable {
                return Err(NodeError::feature_disabled("mapping"));
            }
            let Some(engine) = pipeline.engine.as_mut() else {
                return Err(NodeError::NotInitialized);
            };

            let (complete, handle) = self.coordinator.begin(SaveResponse {
                status: OperationStatus::ShutDown,
            });
            let (engine_side, issuer_side) = split_once(complete);
            if let Err(e) = engine.save_map(path, engine_side) {
                // No callback is coming; resolve the slot ourselves.
                issuer_side(SaveResponse {
                    status: OperationStatus::Failed,
                });
                return Err(e.into());
            }
            handle
        };

        let response = handle.wait();
        observability::record_operation_resolved("save_map", response.status.is_ok());
        if response.status.is_ok() {
            Ok(())
        } else {
            Err(NodeError::operation_failed("save_map", response.status))
        }
    }

    /// Start a localization in a saved map; returns immediately
    ///
    /// The handle resolves from the engine's processing thread, typically
    /// during a later tracking step. The node also polls it there and logs
    /// the outcome.
    #[instrument(level = "info", name = "node_localize", skip(self, hint), fields(path = %path.display()))]
    pub fn request_localize_async(
        &self,
        path: &Path,
        hint: &RigidTransform,
    ) -> Result<OperationHandle<LocalizeResponse>, NodeError> {
        tracker::map_folder::validate(path)?;

        let mut pipeline = lock(&self.pipeline);
        if !self.blueprint.mapping.enable {
            return Err(NodeError::feature_disabled("mapping"));
        }
        let Some(engine) = pipeline.engine.as_mut() else {
            return Err(NodeError::NotInitialized);
        };

        let (complete, handle) = self.coordinator.begin(LocalizeResponse {
            status: OperationStatus::ShutDown,
            pose: None,
        });
        let (engine_side, issuer_side) = split_once(complete);
        if let Err(e) = engine.localize(path, hint, engine_side) {
            issuer_side(LocalizeResponse {
                status: OperationStatus::Failed,
                pose: None,
            });
            return Err(e.into());
        }

        pipeline.pending_localize = Some(handle.clone());
        Ok(handle)
    }

    /// Localize in a saved map, blocking until the engine resolves
    ///
    /// `None` when localization ran to completion without finding a pose or
    /// was force-resolved by shutdown.
    pub fn request_localize(
        &self,
        path: &Path,
        hint: &RigidTransform,
    ) -> Result<Option<RigidTransform>, NodeError> {
        let handle = self.request_localize_async(path, hint)?;
        let result = handle
            .map(|response: LocalizeResponse| {
                if response.status.is_ok() {
                    response.pose
                } else {
                    None
                }
            })
            .wait();
        Ok(result)
    }

    /// Tear the pipeline down; idempotent
    ///
    /// Outstanding map operations are force-resolved so no waiter blocks
    /// forever; operations that already completed keep their result.
    #[instrument(level = "info", name = "node_shutdown", skip(self))]
    pub fn shutdown(&self) {
        self.coordinator.shutdown();

        let mut pipeline = lock(&self.pipeline);
        if pipeline.engine.is_some() {
            info!("fusion node shut down");
        }
        pipeline.engine = None;
        pipeline.pending_localize = None;
        pipeline.pose_cache.reset();
        pipeline.velocity_cache.reset();
        pipeline.last_track_ts = None;
        pipeline.gate.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::{
        CameraStreamConfig, ImageFormat, MappingConfig, RigConfig, SyncConfig, TrackStatus,
    };
    use std::time::Duration;
    use tracker::{CompletionMode, MockEngineConfig, MockEngineFactory};

    const MS: i64 = 1_000_000;

    fn blueprint() -> FusionBlueprint {
        FusionBlueprint {
            version: Default::default(),
            rig: RigConfig {
                base_frame: "base_link".into(),
                map_frame: "map".into(),
                cameras: vec![CameraStreamConfig {
                    name: "cam0".into(),
                    optical_frame: String::new(),
                    translation: [0.0; 3],
                    rotation_rpy: [0.0; 3],
                }],
                num_input_masks: 0,
            },
            sync: SyncConfig {
                matching_threshold_ms: 5.0,
                image_buffer_size: 16,
                min_images: Some(1),
            },
            sequencer: Default::default(),
            estimation: Default::default(),
            imu: Default::default(),
            mapping: MappingConfig::default(),
        }
    }

    fn info() -> CameraInfo {
        CameraInfo {
            frame_id: "cam0_optical".into(),
            width: 640,
            height: 480,
            focal: [500.0, 500.0],
            principal: [320.0, 240.0],
            distortion: vec![],
        }
    }

    fn image() -> ImageData {
        ImageData {
            width: 8,
            height: 8,
            format: ImageFormat::Mono8,
            data: Bytes::from_static(&[0u8; 64]),
        }
    }

    fn node_with(
        factory: MockEngineFactory,
        blueprint: FusionBlueprint,
    ) -> (Arc<FusionNode>, Arc<tracker::MockState>) {
        let state = factory.state();
        let node = FusionNode::new(
            blueprint,
            Arc::new(factory),
            Arc::new(crate::transforms::StaticTransforms::new()),
        );
        (node, state)
    }

    fn collect_outputs(node: &Arc<FusionNode>) -> Arc<Mutex<Vec<TrackingOutput>>> {
        let outputs: Arc<Mutex<Vec<TrackingOutput>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&outputs);
        node.set_output(Box::new(move |output| {
            sink.lock().unwrap().push(output.clone());
        }));
        outputs
    }

    #[test]
    fn images_dropped_until_initialized() {
        let (node, state) = node_with(MockEngineFactory::default(), blueprint());
        let outputs = collect_outputs(&node);

        node.submit_image(0, 100 * MS, image());
        assert!(outputs.lock().unwrap().is_empty());

        node.submit_camera_info(0, info()).unwrap();
        assert_eq!(node.gate_state(), GateState::Initialized);

        node.submit_image(0, 200 * MS, image());
        assert_eq!(outputs.lock().unwrap().len(), 1);
        assert_eq!(state.track_calls.load(std::sync::atomic::Ordering::Relaxed), 1);
    }

    #[test]
    fn initialization_runs_once() {
        let (node, state) = node_with(MockEngineFactory::default(), blueprint());
        node.submit_camera_info(0, info()).unwrap();
        node.submit_camera_info(0, info()).unwrap();
        assert_eq!(
            state
                .engines_created
                .load(std::sync::atomic::Ordering::Relaxed),
            1
        );
    }

    #[test]
    fn failed_engine_creation_is_fatal_not_retried() {
        let (node, _state) = node_with(MockEngineFactory::failing(), blueprint());
        let result = node.submit_camera_info(0, info());
        assert!(result.is_err());
        assert_eq!(node.gate_state(), GateState::Ready);

        // A duplicate info is a gate no-op; no second creation attempt
        node.submit_camera_info(0, info()).unwrap();
        assert_eq!(node.gate_state(), GateState::Ready);
    }

    #[test]
    fn velocity_reflects_constant_motion() {
        // Mock pose advances 0.1 m per step; images arrive 100 ms apart.
        let (node, _state) = node_with(MockEngineFactory::default(), blueprint());
        let outputs = collect_outputs(&node);
        node.submit_camera_info(0, info()).unwrap();

        for i in 0..5 {
            node.submit_image(0, (100 + i * 100) * MS, image());
        }

        let outputs = outputs.lock().unwrap();
        let last = outputs.last().unwrap();
        assert!((last.velocity[0] - 1.0).abs() < 1e-9);
        // Constant motion: displacement variance is zero
        assert!(last.pose_covariance[0].abs() < 1e-12);
    }

    #[test]
    fn tracking_loss_resets_derived_state() {
        let factory = MockEngineFactory::new(MockEngineConfig {
            statuses: vec![TrackStatus::Ok, TrackStatus::Ok, TrackStatus::Lost],
            ..Default::default()
        });
        let (node, _state) = node_with(factory, blueprint());
        let outputs = collect_outputs(&node);
        node.submit_camera_info(0, info()).unwrap();

        for i in 0..4 {
            node.submit_image(0, (100 + i * 100) * MS, image());
        }

        let outputs = outputs.lock().unwrap();
        // Third step was lost: no output for it
        assert_eq!(outputs.len(), 3);
        // First step after the loss starts a fresh window: zero velocity
        assert_eq!(outputs[2].velocity, [0.0; 6]);
        // ... and identity covariance fallback
        assert!((outputs[2].pose_covariance[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn inertial_samples_reach_engine_in_order() {
        let mut bp = blueprint();
        bp.imu.enable_fusion = true;
        let (node, state) = node_with(MockEngineFactory::default(), bp);

        node.submit_camera_info(0, info()).unwrap();
        assert_eq!(node.gate_state(), GateState::AwaitingSensors);
        // First inertial sample completes readiness
        node.submit_inertial(10 * MS, ImuSample::default()).unwrap();
        assert_eq!(node.gate_state(), GateState::Initialized);

        for ts in [20, 40, 60, 80] {
            node.submit_inertial(ts * MS, ImuSample::default()).unwrap();
        }
        node.submit_image(0, 100 * MS, image());
        assert_eq!(
            state
                .imu_registered
                .load(std::sync::atomic::Ordering::Relaxed),
            4
        );
    }

    #[test]
    fn late_camera_info_triggers_initialization() {
        // Metadata arrives cam1, imu, cam0: the last camera info completes
        // the readiness set and is the call that initializes the engine.
        let mut bp = blueprint();
        bp.imu.enable_fusion = true;
        bp.rig.cameras.push(CameraStreamConfig {
            name: "cam1".into(),
            optical_frame: String::new(),
            translation: [0.0, -0.1, 0.0],
            rotation_rpy: [0.0; 3],
        });
        bp.sync.min_images = Some(2);
        let (node, state) = node_with(MockEngineFactory::default(), bp);
        let outputs = collect_outputs(&node);

        node.submit_camera_info(1, info()).unwrap();
        node.submit_inertial(10 * MS, ImuSample::default()).unwrap();
        assert_eq!(node.gate_state(), GateState::AwaitingSensors);

        node.submit_camera_info(0, info()).unwrap();
        assert_eq!(node.gate_state(), GateState::Initialized);
        assert_eq!(
            state
                .engines_created
                .load(std::sync::atomic::Ordering::Relaxed),
            1
        );

        node.submit_inertial(90 * MS, ImuSample::default()).unwrap();
        node.submit_image(0, 100 * MS, image());
        node.submit_image(1, 100 * MS, image());
        assert_eq!(outputs.lock().unwrap().len(), 1);
    }

    #[test]
    fn save_map_round_trip() {
        let (node, _state) = node_with(MockEngineFactory::default(), blueprint());
        node.submit_camera_info(0, info()).unwrap();
        node.submit_image(0, 100 * MS, image());

        let saver = {
            let node = Arc::clone(&node);
            std::thread::spawn(move || node.request_save_map(Path::new("/tmp/map")))
        };

        // Feed images until the deferred completion resolves the request
        let mut ts = 200;
        while !saver.is_finished() {
            node.submit_image(0, ts * MS, image());
            ts += 100;
            std::thread::sleep(Duration::from_millis(5));
        }
        saver.join().unwrap().unwrap();
    }

    #[test]
    fn save_map_requires_mapping() {
        let mut bp = blueprint();
        bp.mapping.enable = false;
        let (node, _state) = node_with(MockEngineFactory::default(), bp);
        node.submit_camera_info(0, info()).unwrap();

        assert!(matches!(
            node.request_save_map(Path::new("/tmp/map")),
            Err(NodeError::FeatureDisabled { .. })
        ));
    }

    #[test]
    fn synchronous_save_rejection_fails_fast() {
        let factory = MockEngineFactory::new(MockEngineConfig {
            reject_save: true,
            ..Default::default()
        });
        let (node, _state) = node_with(factory, blueprint());
        node.submit_camera_info(0, info()).unwrap();

        // Must not block despite no callback ever firing
        assert!(matches!(
            node.request_save_map(Path::new("/tmp/map")),
            Err(NodeError::Contract(_))
        ));
    }

    #[test]
    fn localize_validates_map_folder() {
        let (node, _state) = node_with(MockEngineFactory::default(), blueprint());
        node.submit_camera_info(0, info()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(node
            .request_localize_async(&missing, &RigidTransform::identity())
            .is_err());
    }

    #[test]
    fn async_localize_resolves_during_tracking() {
        let (node, _state) = node_with(MockEngineFactory::default(), blueprint());
        node.submit_camera_info(0, info()).unwrap();
        node.submit_image(0, 100 * MS, image());

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("map.mdb"), b"").unwrap();

        let hint = contracts::transform_from_parts([1.0, 0.0, 0.0], [0.0; 3]);
        let handle = node.request_localize_async(dir.path(), &hint).unwrap();
        assert!(handle.poll().is_none());

        // Next tracking step resolves the deferred completion
        node.submit_image(0, 200 * MS, image());
        let response = handle.poll().unwrap();
        assert!(response.status.is_ok());
        assert!((response.pose.unwrap().translation.x - 1.0).abs() < 1e-12);
    }

    #[test]
    fn shutdown_unblocks_pending_save() {
        let factory = MockEngineFactory::new(MockEngineConfig {
            completion_mode: CompletionMode::Never,
            ..Default::default()
        });
        let (node, _state) = node_with(factory, blueprint());
        node.submit_camera_info(0, info()).unwrap();
        node.submit_image(0, 100 * MS, image());

        let saver = {
            let node = Arc::clone(&node);
            std::thread::spawn(move || node.request_save_map(Path::new("/tmp/map")))
        };
        std::thread::sleep(Duration::from_millis(30));

        node.shutdown();
        let result = saver.join().unwrap();
        assert!(matches!(
            result,
            Err(NodeError::OperationFailed {
                status: OperationStatus::ShutDown,
                ..
            })
        ));

        // Idempotent
        node.shutdown();
        assert_eq!(node.gate_state(), GateState::AwaitingSensors);
    }
}
