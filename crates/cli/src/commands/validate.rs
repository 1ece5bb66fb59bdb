//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::error::CliError;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    camera_count: usize,
    mask_stream_count: usize,
    min_streams: usize,
    imu_fusion: bool,
    mapping: bool,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        let message = result
            .error
            .unwrap_or_else(|| "invalid configuration".to_string());
        Err(CliError::config_validation(message).into())
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    camera_count: blueprint.num_cameras(),
                    mask_stream_count: blueprint.rig.num_input_masks,
                    min_streams: blueprint.min_streams(),
                    imu_fusion: blueprint.imu.enable_fusion,
                    mapping: blueprint.mapping.enable,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &contracts::FusionBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    // Check partial batches
    if blueprint.min_streams() < blueprint.num_cameras() {
        warnings.push(format!(
            "sync.min_images = {} < {} cameras - batches may miss camera streams",
            blueprint.min_streams(),
            blueprint.num_cameras()
        ));
    }

    // Check startup localization prerequisites
    if blueprint.mapping.localize_on_startup && blueprint.mapping.load_map_path.is_none() {
        warnings.push(
            "mapping.localize_on_startup is set without mapping.load_map_path - \
             startup localization will be skipped"
                .to_string(),
        );
    }
    if blueprint.mapping.load_map_path.is_some() && !blueprint.mapping.enable {
        warnings.push(
            "mapping.load_map_path is set but mapping is disabled - map will not be loaded"
                .to_string(),
        );
    }

    // Check inertial settings
    if blueprint.imu.enable_fusion && blueprint.imu.frame.is_empty() {
        warnings.push(
            "imu.frame is empty - rig-from-imu extrinsic falls back to identity".to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Cameras: {}", summary.camera_count);
            println!("  Mask streams: {}", summary.mask_stream_count);
            println!("  Min streams per batch: {}", summary.min_streams);
            println!("  IMU fusion: {}", summary.imu_fusion);
            println!("  Mapping: {}", summary.mapping);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn minimal_config_is_valid() {
        let (_dir, path) = write_config(
            r#"
            [rig]
            cameras = [{ name = "cam0" }]
            "#,
        );
        let result = validate_config(&ValidateArgs { config: path, json: false });
        assert!(result.valid);
        assert_eq!(result.summary.unwrap().camera_count, 1);
    }

    #[test]
    fn missing_file_is_invalid() {
        let result = validate_config(&ValidateArgs {
            config: PathBuf::from("/nonexistent/config.toml"),
            json: false,
        });
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn invalid_config_surfaces_cli_error() {
        let (_dir, path) = write_config("rig = 1");
        let err = run_validate(&ValidateArgs { config: path, json: false }).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn startup_localization_without_map_warns() {
        let (_dir, path) = write_config(
            r#"
            [rig]
            cameras = [{ name = "cam0" }]

            [mapping]
            enable = true
            localize_on_startup = true
            "#,
        );
        let result = validate_config(&ValidateArgs { config: path, json: false });
        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert!(warnings.iter().any(|w| w.contains("localize_on_startup")));
    }
}
