//! Node error types

use contracts::OperationStatus;
use thiserror::Error;

/// Node-specific errors
#[derive(Debug, Error)]
pub enum NodeError {
    /// A request arrived before initialization completed
    #[error("node is not initialized")]
    NotInitialized,

    /// A request needs a feature disabled by configuration
    #[error("{feature} is disabled by configuration")]
    FeatureDisabled { feature: String },

    /// A map operation resolved with a non-success status
    #[error("{operation} resolved with status {status:?}")]
    OperationFailed {
        operation: String,
        status: OperationStatus,
    },

    /// Contract-level error
    #[error(transparent)]
    Contract(#[from] contracts::ContractError),
}

impl NodeError {
    /// Create a feature-disabled error
    pub fn feature_disabled(feature: impl Into<String>) -> Self {
        Self::FeatureDisabled {
            feature: feature.into(),
        }
    }

    /// Create an operation-failed error
    pub fn operation_failed(operation: impl Into<String>, status: OperationStatus) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            status,
        }
    }
}
