//! Layered error definitions
//!
//! Categorized by source: config / stream / engine / operation

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Stream Errors =====
    /// Stream index outside the configured rig
    #[error("unknown stream index {stream}: rig has {num_streams} streams")]
    UnknownStream { stream: usize, num_streams: usize },

    /// Buffer overflow
    #[error("buffer overflow for stream {stream}: depth={depth}, max={max}")]
    BufferOverflow {
        stream: usize,
        depth: usize,
        max: usize,
    },

    /// A required sensor stream never delivered its first message
    #[error("sensor stream not ready: {missing:?}")]
    StreamsNotReady { missing: Vec<String> },

    // ===== Engine Errors =====
    /// Engine construction failed
    #[error("engine construction failed: {message}")]
    EngineCreate { message: String },

    /// Engine rejected a call synchronously
    #[error("engine rejected {call}: {message}")]
    EngineRejected { call: String, message: String },

    /// Transform lookup failed
    #[error("transform lookup failed ({target} <- {source_frame}): {message}")]
    TransformLookup {
        target: String,
        source_frame: String,
        message: String,
    },

    // ===== Operation Errors =====
    /// A feature was requested while disabled in configuration
    #[error("{feature} is disabled by configuration")]
    FeatureDisabled { feature: String },

    /// Map folder failed validation
    #[error("invalid map folder '{path}': {message}")]
    InvalidMapFolder { path: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create engine rejection error
    pub fn engine_rejected(call: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EngineRejected {
            call: call.into(),
            message: message.into(),
        }
    }

    /// Create map folder validation error
    pub fn invalid_map_folder(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidMapFolder {
            path: path.into(),
            message: message.into(),
        }
    }
}
