use thiserror::Error;

use crate::types::ModelRole;

/// Failures raised by the model runtime adapter. These never escape the
/// adapter as panics; the orchestrator folds them into [`AnalysisError`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("{role} model is not ready")]
    NotReady { role: ModelRole },

    #[error("Failed to load {role} model: {reason}")]
    Load { role: ModelRole, reason: String },

    #[error("{role} inference failed: {message}")]
    Inference { role: ModelRole, message: String },
}

/// The single discriminated failure reported to callers of the pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Failed to load {role} model: {reason}")]
    ModelLoadFailure { role: ModelRole, reason: String },

    #[error("Models not ready: {}", format_roles(.missing))]
    NotReady { missing: Vec<ModelRole> },

    #[error("{role} inference failed: {message}")]
    InferenceError { role: ModelRole, message: String },

    #[error("No leaf pixels detected; severity ratio is undefined")]
    DegenerateRatio,

    #[error("An analysis is already in progress")]
    Busy,

    #[error("Invalid input image: {0}")]
    InvalidImage(String),

    #[error("Analysis worker failed: {0}")]
    Worker(String),
}

impl From<RuntimeError> for AnalysisError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::NotReady { role } => Self::NotReady { missing: vec![role] },
            RuntimeError::Load { role, reason } => Self::ModelLoadFailure { role, reason },
            RuntimeError::Inference { role, message } => Self::InferenceError { role, message },
        }
    }
}

fn format_roles(roles: &[ModelRole]) -> String {
    roles
        .iter()
        .map(|role| role.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
    #[error("Configuration validation failed: {0}")]
    Invalid(String),
}

/// Crate-wide error for everything outside the analysis boundary
#[derive(Error, Debug)]
pub enum LeafSegError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to encode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid probability grid: {0}")]
    InvalidGrid(String),
}

pub type Result<T> = std::result::Result<T, LeafSegError>;
