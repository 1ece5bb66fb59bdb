//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    // Load and parse configuration
    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        cameras = blueprint.num_cameras(),
        mask_streams = blueprint.rig.num_input_masks,
        imu_fusion = blueprint.imu.enable_fusion,
        mapping = blueprint.mapping.enable,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    if args.save_map.is_some() && !blueprint.mapping.enable {
        return Err(CliError::config_validation(
            "--save-map requires mapping.enable in the configuration",
        )
        .into());
    }

    // Build pipeline configuration
    let pipeline_config = PipelineConfig {
        blueprint,
        duration: if args.duration == 0 {
            None
        } else {
            Some(Duration::from_secs(args.duration))
        },
        frame_rate: args.frame_rate,
        imu_rate: args.imu_rate,
        save_map: args.save_map.clone(),
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    // Create and run pipeline
    let pipeline = Pipeline::new(pipeline_config);

    // Setup graceful shutdown handler
    let shutdown_signal = setup_shutdown_signal();

    info!("Starting pipeline...");

    // Run pipeline with shutdown signal
    tokio::select! {
        result = pipeline.run() => {
            match result {
                Ok(stats) => {
                    info!(
                        frames_tracked = stats.frames_tracked,
                        images_submitted = stats.images_submitted,
                        duration_secs = stats.duration.as_secs_f64(),
                        fps = format!("{:.2}", stats.fps()),
                        "Pipeline completed successfully"
                    );

                    // Print detailed statistics
                    stats.print_summary();
                }
                Err(e) => {
                    return Err(CliError::pipeline_execution(format!("{e:#}")).into());
                }
            }
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping pipeline...");
        }
    }

    info!("Sensor Fusion finished");
    Ok(())
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::FusionBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Rig:");
    println!("  Base frame: {}", blueprint.rig.base_frame);
    println!("  Map frame: {}", blueprint.rig.map_frame);
    println!("\nCameras ({}):", blueprint.num_cameras());
    for (i, camera) in blueprint.rig.cameras.iter().enumerate() {
        println!("  - {} (stream {})", camera.name, i);
    }
    if blueprint.rig.num_input_masks > 0 {
        println!("\nMask streams: {}", blueprint.rig.num_input_masks);
    }

    println!("\nSync Settings:");
    println!(
        "  Matching threshold: {} ms",
        blueprint.sync.matching_threshold_ms
    );
    println!("  Min streams per batch: {}", blueprint.min_streams());
    println!("  IMU fusion: {}", blueprint.imu.enable_fusion);

    println!("\nMapping:");
    println!("  Enabled: {}", blueprint.mapping.enable);
    if let Some(ref path) = blueprint.mapping.load_map_path {
        println!("  Load map: {}", path.display());
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn missing_config_is_a_cli_error() {
        let args = RunArgs {
            config: PathBuf::from("/nonexistent/config.toml"),
            duration: 1,
            frame_rate: 30.0,
            imu_rate: 200.0,
            save_map: None,
            dry_run: false,
            metrics_port: 0,
        };
        let err = run_pipeline(&args).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::ConfigNotFound { .. })
        ));
    }
}
