//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    rig: RigInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    cameras: Vec<CameraInfo>,
    sync_settings: SyncInfo,
    estimation: EstimationInfo,
    imu: ImuInfo,
    mapping: MappingInfo,
}

#[derive(Serialize)]
struct RigInfo {
    base_frame: String,
    map_frame: String,
    camera_count: usize,
    mask_stream_count: usize,
}

#[derive(Serialize)]
struct CameraInfo {
    name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    optical_frame: String,
    translation: [f64; 3],
    rotation_rpy: [f64; 3],
}

#[derive(Serialize)]
struct SyncInfo {
    matching_threshold_ms: f64,
    image_buffer_size: usize,
    min_streams: usize,
    imu_buffer_size: usize,
    imu_jitter_threshold_ms: f64,
    image_jitter_threshold_ms: f64,
}

#[derive(Serialize)]
struct EstimationInfo {
    pose_window: usize,
    velocity_window: usize,
    timing_window: usize,
}

#[derive(Serialize)]
struct ImuInfo {
    enable_fusion: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    frame: String,
}

#[derive(Serialize)]
struct MappingInfo {
    enable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    load_map_path: Option<String>,
    localize_on_startup: bool,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &contracts::FusionBlueprint, args: &InfoArgs) -> ConfigInfo {
    let cameras = if args.cameras {
        blueprint
            .rig
            .cameras
            .iter()
            .map(|c| CameraInfo {
                name: c.name.clone(),
                optical_frame: c.optical_frame.clone(),
                translation: c.translation,
                rotation_rpy: c.rotation_rpy,
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        rig: RigInfo {
            base_frame: blueprint.rig.base_frame.clone(),
            map_frame: blueprint.rig.map_frame.clone(),
            camera_count: blueprint.num_cameras(),
            mask_stream_count: blueprint.rig.num_input_masks,
        },
        cameras,
        sync_settings: SyncInfo {
            matching_threshold_ms: blueprint.sync.matching_threshold_ms,
            image_buffer_size: blueprint.sync.image_buffer_size,
            min_streams: blueprint.min_streams(),
            imu_buffer_size: blueprint.sequencer.imu_buffer_size,
            imu_jitter_threshold_ms: blueprint.sequencer.imu_jitter_threshold_ms,
            image_jitter_threshold_ms: blueprint.sequencer.image_jitter_threshold_ms,
        },
        estimation: EstimationInfo {
            pose_window: blueprint.estimation.pose_window,
            velocity_window: blueprint.estimation.velocity_window,
            timing_window: blueprint.estimation.timing_window,
        },
        imu: ImuInfo {
            enable_fusion: blueprint.imu.enable_fusion,
            frame: blueprint.imu.frame.clone(),
        },
        mapping: MappingInfo {
            enable: blueprint.mapping.enable,
            load_map_path: blueprint
                .mapping
                .load_map_path
                .as_ref()
                .map(|p| p.display().to_string()),
            localize_on_startup: blueprint.mapping.localize_on_startup,
        },
    }
}

fn print_config_info(blueprint: &contracts::FusionBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Sensor Fusion Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    // Rig info
    println!("📷 Camera Rig");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Base frame: {}", blueprint.rig.base_frame);
    println!("   ├─ Map frame: {}", blueprint.rig.map_frame);
    println!("   ├─ Cameras: {}", blueprint.num_cameras());
    println!("   └─ Mask streams: {}", blueprint.rig.num_input_masks);

    // Cameras
    if args.cameras && !blueprint.rig.cameras.is_empty() {
        println!("\n🎥 Cameras ({})", blueprint.rig.cameras.len());
        for (i, camera) in blueprint.rig.cameras.iter().enumerate() {
            let is_last = i == blueprint.rig.cameras.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            let child_prefix = if is_last { "   " } else { "│  " };

            println!("   {} {} (stream {})", prefix, camera.name, i);
            if camera.optical_frame.is_empty() {
                println!("   {}  ├─ Optical frame: (from camera info)", child_prefix);
            } else {
                println!(
                    "   {}  ├─ Optical frame: {}",
                    child_prefix, camera.optical_frame
                );
            }
            println!(
                "   {}  ├─ Translation: [{:.3}, {:.3}, {:.3}] m",
                child_prefix, camera.translation[0], camera.translation[1], camera.translation[2]
            );
            println!(
                "   {}  └─ Rotation (rpy): [{:.3}, {:.3}, {:.3}] rad",
                child_prefix, camera.rotation_rpy[0], camera.rotation_rpy[1], camera.rotation_rpy[2]
            );
        }
    }

    // Sync settings
    println!("\n⚙️  Sync Settings");
    println!(
        "   ├─ Matching threshold: {} ms",
        blueprint.sync.matching_threshold_ms
    );
    println!(
        "   ├─ Image buffer size: {}",
        blueprint.sync.image_buffer_size
    );
    println!("   ├─ Min streams per batch: {}", blueprint.min_streams());
    println!(
        "   ├─ IMU buffer size: {}",
        blueprint.sequencer.imu_buffer_size
    );
    println!(
        "   ├─ IMU jitter threshold: {} ms",
        blueprint.sequencer.imu_jitter_threshold_ms
    );
    println!(
        "   └─ Image jitter threshold: {} ms",
        blueprint.sequencer.image_jitter_threshold_ms
    );

    // Estimation windows
    println!("\n📐 Estimation Windows");
    println!("   ├─ Pose window: {}", blueprint.estimation.pose_window);
    println!(
        "   ├─ Velocity window: {}",
        blueprint.estimation.velocity_window
    );
    println!(
        "   └─ Timing window: {}",
        blueprint.estimation.timing_window
    );

    // Inertial fusion
    println!("\n🧭 Inertial Fusion");
    if blueprint.imu.enable_fusion {
        println!("   ├─ Enabled: yes");
        if blueprint.imu.frame.is_empty() {
            println!("   └─ Frame: (identity extrinsic)");
        } else {
            println!("   └─ Frame: {}", blueprint.imu.frame);
        }
    } else {
        println!("   └─ Enabled: no");
    }

    // Mapping
    println!("\n🗺️  Mapping");
    println!("   ├─ Enabled: {}", blueprint.mapping.enable);
    match &blueprint.mapping.load_map_path {
        Some(path) => println!("   ├─ Load map: {}", path.display()),
        None => println!("   ├─ Load map: (none)"),
    }
    println!(
        "   └─ Localize on startup: {}",
        blueprint.mapping.localize_on_startup
    );

    println!();
}
