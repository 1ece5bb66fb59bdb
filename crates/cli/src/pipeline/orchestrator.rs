//! Pipeline orchestrator - drives the fusion node with simulated sensors.
//!
//! Runs the full node stack (synchronizer, sequencer, tracking, estimation)
//! against the scripted mock engine, with feeder threads standing in for
//! camera and IMU drivers.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bytes::Bytes;
use contracts::{
    transform_from_parts, CameraInfo, CameraStreamConfig, FusionBlueprint, ImageData, ImageFormat,
    ImuSample,
};
use node::{FusionNode, StaticTransforms};
use observability::{RollingStats, StatsSummary};
use tracker::MockEngineFactory;
use tracing::{debug, info, warn};

use super::RunStats;

const FRAME_WIDTH: u32 = 320;
const FRAME_HEIGHT: u32 = 240;
const STATS_WINDOW: usize = 1024;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The fusion blueprint configuration
    pub blueprint: FusionBlueprint,

    /// Run duration (None = until interrupted)
    pub duration: Option<Duration>,

    /// Simulated camera frame rate (Hz)
    pub frame_rate: f64,

    /// Simulated inertial sample rate (Hz)
    pub imu_rate: f64,

    /// Save the map to this folder before shutting down
    pub save_map: Option<PathBuf>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Tracking outputs aggregated on the tracking thread
struct EstimationStats {
    frames: u64,
    speed: RollingStats,
    angular_rate: RollingStats,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline to completion
    pub async fn run(self) -> Result<RunStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        info!(
            cameras = blueprint.num_cameras(),
            mask_streams = blueprint.rig.num_input_masks,
            frame_rate = self.config.frame_rate,
            "Running in MOCK mode (no tracking backend required)"
        );

        // Static transforms mirror the rig extrinsics from the blueprint
        let mut transforms = StaticTransforms::new();
        for camera in &blueprint.rig.cameras {
            transforms.insert(
                blueprint.rig.base_frame.clone(),
                optical_frame(camera),
                transform_from_parts(camera.translation, camera.rotation_rpy),
            );
        }

        let factory = MockEngineFactory::default();
        let node = FusionNode::new(
            blueprint.clone(),
            Arc::new(factory),
            Arc::new(transforms),
        );

        // Collect estimation statistics from the output callback
        let stats = Arc::new(Mutex::new(EstimationStats {
            frames: 0,
            speed: RollingStats::new(STATS_WINDOW),
            angular_rate: RollingStats::new(STATS_WINDOW),
        }));
        {
            let stats = Arc::clone(&stats);
            node.set_output(Box::new(move |output| {
                let v = &output.velocity;
                let speed = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
                let angular = (v[3] * v[3] + v[4] * v[4] + v[5] * v[5]).sqrt();

                let mut stats = stats.lock().unwrap_or_else(|e| e.into_inner());
                stats.frames += 1;
                stats.speed.push(speed);
                stats.angular_rate.push(angular);

                debug!(
                    batch_id = output.batch_id,
                    timestamp_ns = output.timestamp_ns,
                    speed = format!("{:.3}", speed),
                    "Tracking output produced"
                );
            }));
        }

        // Deliver camera infos; without IMU fusion this also initializes
        for (stream, camera) in blueprint.rig.cameras.iter().enumerate() {
            node.submit_camera_info(stream, synthetic_camera_info(camera))
                .context("Failed to initialize fusion node")?;
        }

        // Start feeder threads
        let running = Arc::new(AtomicBool::new(true));
        let images_submitted = Arc::new(AtomicU64::new(0));
        let imu_submitted = Arc::new(AtomicU64::new(0));
        let epoch = Instant::now();

        let mut feeders: Vec<JoinHandle<()>> = Vec::new();
        feeders.push(spawn_camera_feeder(
            Arc::clone(&node),
            blueprint.num_cameras(),
            blueprint.rig.num_input_masks,
            self.config.frame_rate,
            Arc::clone(&running),
            Arc::clone(&images_submitted),
            epoch,
        ));
        if blueprint.imu.enable_fusion {
            feeders.push(spawn_imu_feeder(
                Arc::clone(&node),
                self.config.imu_rate,
                Arc::clone(&running),
                Arc::clone(&imu_submitted),
                epoch,
            ));
        }

        info!(duration = ?self.config.duration, "Pipeline running");

        // Wait for the configured duration (or forever, until interrupted)
        match self.config.duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }

        // Save the map while the feeders are still running: the deferred
        // completion resolves on a later tracking step.
        if let Some(path) = self.config.save_map.clone() {
            info!(path = %path.display(), "Saving map before shutdown");
            let saver = Arc::clone(&node);
            match tokio::task::spawn_blocking(move || saver.request_save_map(&path)).await {
                Ok(Ok(())) => info!("Map saved"),
                Ok(Err(e)) => warn!(error = %e, "Map save failed"),
                Err(e) => warn!(error = %e, "Map save task failed"),
            }
        }

        // Shutdown
        info!("Shutting down pipeline...");
        running.store(false, Ordering::Relaxed);
        for feeder in feeders {
            let _ = feeder.join();
        }
        node.shutdown();

        let stats = stats.lock().unwrap_or_else(|e| e.into_inner());
        let final_stats = RunStats {
            frames_tracked: stats.frames,
            images_submitted: images_submitted.load(Ordering::Relaxed),
            imu_submitted: imu_submitted.load(Ordering::Relaxed),
            duration: start_time.elapsed(),
            active_streams: blueprint.num_streams(),
            speed: StatsSummary::from(&stats.speed),
            angular_rate: StatsSummary::from(&stats.angular_rate),
        };

        info!(
            duration_secs = final_stats.duration.as_secs_f64(),
            fps = format!("{:.2}", final_stats.fps()),
            "Pipeline shutdown complete"
        );

        Ok(final_stats)
    }
}

/// Feed all camera and mask streams with identically stamped frames
fn spawn_camera_feeder(
    node: Arc<FusionNode>,
    num_cameras: usize,
    num_masks: usize,
    frame_rate: f64,
    running: Arc<AtomicBool>,
    submitted: Arc<AtomicU64>,
    epoch: Instant,
) -> JoinHandle<()> {
    let period = Duration::from_secs_f64(1.0 / frame_rate.max(0.001));
    thread::spawn(move || {
        while running.load(Ordering::Relaxed) {
            let timestamp_ns = epoch.elapsed().as_nanos() as i64;
            for stream in 0..num_cameras {
                node.submit_image(stream, timestamp_ns, synthetic_image(ImageFormat::Mono8));
            }
            for mask in 0..num_masks {
                node.submit_image(
                    num_cameras + mask,
                    timestamp_ns,
                    synthetic_image(ImageFormat::Mask8),
                );
            }
            submitted.fetch_add((num_cameras + num_masks) as u64, Ordering::Relaxed);
            thread::sleep(period);
        }
    })
}

/// Feed inertial samples; the first one completes the readiness set
fn spawn_imu_feeder(
    node: Arc<FusionNode>,
    imu_rate: f64,
    running: Arc<AtomicBool>,
    submitted: Arc<AtomicU64>,
    epoch: Instant,
) -> JoinHandle<()> {
    let period = Duration::from_secs_f64(1.0 / imu_rate.max(0.001));
    let sample = ImuSample {
        linear_acceleration: [0.0, 0.0, 9.81],
        angular_velocity: [0.0, 0.0, 0.0],
    };
    thread::spawn(move || {
        while running.load(Ordering::Relaxed) {
            let timestamp_ns = epoch.elapsed().as_nanos() as i64;
            if let Err(e) = node.submit_inertial(timestamp_ns, sample) {
                warn!(error = %e, "Inertial submission failed, stopping feeder");
                return;
            }
            submitted.fetch_add(1, Ordering::Relaxed);
            thread::sleep(period);
        }
    })
}

fn optical_frame(camera: &CameraStreamConfig) -> String {
    if camera.optical_frame.is_empty() {
        format!("{}_optical", camera.name)
    } else {
        camera.optical_frame.clone()
    }
}

fn synthetic_camera_info(camera: &CameraStreamConfig) -> CameraInfo {
    CameraInfo {
        frame_id: optical_frame(camera),
        width: FRAME_WIDTH,
        height: FRAME_HEIGHT,
        focal: [300.0, 300.0],
        principal: [FRAME_WIDTH as f64 / 2.0, FRAME_HEIGHT as f64 / 2.0],
        distortion: Vec::new(),
    }
}

fn synthetic_image(format: ImageFormat) -> ImageData {
    ImageData {
        width: FRAME_WIDTH,
        height: FRAME_HEIGHT,
        format,
        data: Bytes::from(vec![0x80; (FRAME_WIDTH * FRAME_HEIGHT) as usize]),
    }
}
