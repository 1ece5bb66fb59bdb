//! Configuration parsing
//!
//! Supports TOML (primary) and JSON (secondary) formats.

use contracts::{ContractError, FusionBlueprint};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML format (recommended)
    Toml,
    /// JSON format
    Json,
}

impl ConfigFormat {
    /// Infer the format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse TOML configuration content
pub fn parse_toml(content: &str) -> Result<FusionBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON configuration content
pub fn parse_json(content: &str) -> Result<FusionBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse configuration content according to `format`
pub fn parse(content: &str, format: ConfigFormat) -> Result<FusionBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_toml_minimal() {
        let content = r#"
[rig]
[[rig.cameras]]
name = "cam0"
"#;
        let blueprint = parse_toml(content).unwrap();
        assert_eq!(blueprint.num_cameras(), 1);
        assert_eq!(blueprint.rig.base_frame, "base_link");
    }

    #[test]
    fn parse_json_minimal() {
        let content = r#"{
            "rig": {
                "cameras": [
                    { "name": "cam0" },
                    { "name": "cam1", "translation": [0.1, 0.0, 0.0] }
                ],
                "num_input_masks": 2
            },
            "sequencer": {
                "imu_buffer_size": 64,
                "imu_jitter_threshold_ms": 8.0,
                "image_jitter_threshold_ms": 40.0
            }
        }"#;
        let blueprint = parse_json(content).unwrap();
        assert_eq!(blueprint.num_streams(), 4);
        assert_eq!(blueprint.sequencer.imu_buffer_size, 64);
    }

    #[test]
    fn parse_toml_invalid() {
        let err = parse_toml("rig = 1").unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn extension_detection() {
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("ini"), None);
    }
}
