//! Map folder validation.
//!
//! A saved map is a directory containing at least one `.mdb` database file.
//! Validation checks the layout only and never parses the database format.

use std::path::Path;

use contracts::ContractError;
use tracing::debug;

/// Check that `path` looks like a saved map folder
pub fn validate(path: &Path) -> Result<(), ContractError> {
    let path_str = path.display().to_string();

    let meta = std::fs::metadata(path)
        .map_err(|e| ContractError::invalid_map_folder(&path_str, e.to_string()))?;
    if !meta.is_dir() {
        return Err(ContractError::invalid_map_folder(
            &path_str,
            "not a directory",
        ));
    }

    let mut entries = std::fs::read_dir(path)
        .map_err(|e| ContractError::invalid_map_folder(&path_str, e.to_string()))?;
    let has_db = entries.any(|entry| {
        entry
            .ok()
            .map(|e| e.path().extension().is_some_and(|ext| ext == "mdb"))
            .unwrap_or(false)
    });
    if !has_db {
        return Err(ContractError::invalid_map_folder(
            &path_str,
            "no .mdb database file found",
        ));
    }

    debug!(path = %path_str, "map folder validated");
    Ok(())
}
