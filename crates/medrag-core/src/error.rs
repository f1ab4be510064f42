//! Error types for medrag

use thiserror::Error;

/// Result type alias using MedRagError
pub type Result<T> = std::result::Result<T, MedRagError>;

/// Error type alias for convenience
pub type Error = MedRagError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const NOT_FOUND: i32 = 2;
    pub const INVALID_INPUT: i32 = 3;
}

/// Main error type for medrag
#[derive(Debug, Error)]
pub enum MedRagError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Index build error: {0}")]
    IndexBuild(String),

    #[error("Index load error: {0}")]
    IndexLoad(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Duplicate node: {0}")]
    DuplicateNode(String),

    #[error("Dangling edge: {0}")]
    DanglingEdge(String),

    #[error("Invalid edge: {0}")]
    InvalidEdge(String),

    #[error("Unresolved drug name: {0}")]
    UnresolvedDrugName(String),

    #[error("Encoding failure: {0}")]
    EncodingFailure(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl MedRagError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::IndexLoad(_) => exit_codes::NOT_FOUND,
            Self::InvalidArgument(_) | Self::Config(_) => exit_codes::INVALID_INPUT,
            _ => exit_codes::GENERAL_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            MedRagError::InvalidArgument("top_k".into()).exit_code(),
            exit_codes::INVALID_INPUT
        );
        assert_eq!(
            MedRagError::IndexLoad("missing".into()).exit_code(),
            exit_codes::NOT_FOUND
        );
        assert_eq!(
            MedRagError::EncodingFailure("timeout".into()).exit_code(),
            exit_codes::GENERAL_ERROR
        );
    }
}
