//! Configuration validation
//!
//! Rules:
//! - camera names unique, rig non-empty
//! - min_images within 1..=num_cameras
//! - num_input_masks <= num_cameras
//! - thresholds and buffer capacities positive
//! - estimation windows >= 2 (velocity needs two entries)
//! - localize_on_startup requires mapping enabled (a missing map path is
//!   non-fatal: startup localization is skipped at runtime)

use std::collections::HashSet;

use contracts::{ContractError, FusionBlueprint};

/// Validate a FusionBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &FusionBlueprint) -> Result<(), ContractError> {
    validate_rig(blueprint)?;
    validate_sync(blueprint)?;
    validate_sequencer(blueprint)?;
    validate_estimation(blueprint)?;
    validate_mapping(blueprint)?;
    Ok(())
}

fn validate_rig(blueprint: &FusionBlueprint) -> Result<(), ContractError> {
    if blueprint.rig.cameras.is_empty() {
        return Err(ContractError::config_validation(
            "rig.cameras",
            "at least one camera is required",
        ));
    }

    let mut seen = HashSet::new();
    for camera in &blueprint.rig.cameras {
        if !seen.insert(&camera.name) {
            return Err(ContractError::config_validation(
                format!("rig.cameras[name={}]", camera.name),
                "duplicate camera name",
            ));
        }
    }

    if blueprint.rig.num_input_masks > blueprint.num_cameras() {
        return Err(ContractError::config_validation(
            "rig.num_input_masks",
            "more mask streams than cameras",
        ));
    }
    Ok(())
}

fn validate_sync(blueprint: &FusionBlueprint) -> Result<(), ContractError> {
    if blueprint.sync.matching_threshold_ms <= 0.0 {
        return Err(ContractError::config_validation(
            "sync.matching_threshold_ms",
            "must be positive",
        ));
    }
    if blueprint.sync.image_buffer_size == 0 {
        return Err(ContractError::config_validation(
            "sync.image_buffer_size",
            "must be positive",
        ));
    }
    if let Some(min_images) = blueprint.sync.min_images {
        if min_images == 0 || min_images > blueprint.num_cameras() {
            return Err(ContractError::config_validation(
                "sync.min_images",
                format!("must be within 1..={}", blueprint.num_cameras()),
            ));
        }
    }
    Ok(())
}

fn validate_sequencer(blueprint: &FusionBlueprint) -> Result<(), ContractError> {
    if blueprint.sequencer.imu_buffer_size == 0 {
        return Err(ContractError::config_validation(
            "sequencer.imu_buffer_size",
            "must be positive",
        ));
    }
    if blueprint.sequencer.imu_jitter_threshold_ms <= 0.0 {
        return Err(ContractError::config_validation(
            "sequencer.imu_jitter_threshold_ms",
            "must be positive",
        ));
    }
    if blueprint.sequencer.image_jitter_threshold_ms <= 0.0 {
        return Err(ContractError::config_validation(
            "sequencer.image_jitter_threshold_ms",
            "must be positive",
        ));
    }
    Ok(())
}

fn validate_estimation(blueprint: &FusionBlueprint) -> Result<(), ContractError> {
    if blueprint.estimation.pose_window < 2 {
        return Err(ContractError::config_validation(
            "estimation.pose_window",
            "window must hold at least 2 entries",
        ));
    }
    if blueprint.estimation.velocity_window < 2 {
        return Err(ContractError::config_validation(
            "estimation.velocity_window",
            "window must hold at least 2 entries",
        ));
    }
    if blueprint.estimation.timing_window == 0 {
        return Err(ContractError::config_validation(
            "estimation.timing_window",
            "must be positive",
        ));
    }
    Ok(())
}

fn validate_mapping(blueprint: &FusionBlueprint) -> Result<(), ContractError> {
    if blueprint.mapping.localize_on_startup && !blueprint.mapping.enable {
        return Err(ContractError::config_validation(
            "mapping.localize_on_startup",
            "requires mapping.enable",
        ));
    }
    Ok(())
}
