use thiserror::Error;

use super::config::ConfigError;
use crate::core::complex::AssemblyError;
use crate::core::features::{FeaturizeError, SchemaError};
use crate::core::io::RecordErrorKind;
use crate::core::models::record::MoleculeRole;
use crate::core::scoring::ModelError;
use std::fmt;

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid receptor: {0}")]
    InvalidReceptor(String),

    #[error("Feature schema of the featurizer does not match the model: {detail}")]
    SchemaMismatch { detail: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Feature schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(String),
}

impl PipelineError {
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::InvalidReceptor(_) => "invalid-receptor",
            PipelineError::SchemaMismatch { .. } => "schema-mismatch",
            PipelineError::Config(_) | PipelineError::Schema(_) => "configuration",
            PipelineError::Model(ModelError::SchemaMismatch { .. }) => "schema-mismatch",
            PipelineError::Model(_) => "model",
            PipelineError::ThreadPool(_) => "thread-pool",
        }
    }
}

/// Why a single pose has no score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoseFailure {
    Parse {
        kind: RecordErrorKind,
        message: String,
    },
    UnsupportedAtomType {
        symbol: String,
        role: MoleculeRole,
    },
    EmptyLigand,
    EmptyFeaturization,
    Timeout,
    /// The model failed or produced a non-finite score.
    Prediction(String),
    Internal(String),
}

impl PoseFailure {
    pub fn code(&self) -> &'static str {
        match self {
            PoseFailure::Parse {
                kind: RecordErrorKind::UnsupportedAtomType,
                ..
            } => "unsupported-atom-type",
            PoseFailure::Parse { .. } => "parse-error",
            PoseFailure::UnsupportedAtomType { .. } => "unsupported-atom-type",
            PoseFailure::EmptyLigand => "empty-ligand",
            PoseFailure::EmptyFeaturization => "empty-featurization",
            PoseFailure::Timeout => "timeout",
            PoseFailure::Prediction(_) => "prediction",
            PoseFailure::Internal(_) => "internal",
        }
    }
}

impl fmt::Display for PoseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoseFailure::Parse { kind, message } => write!(f, "{}: {}", kind, message),
            PoseFailure::UnsupportedAtomType { symbol, role } => {
                write!(f, "{} atom type '{}' is not in the vocabulary", role, symbol)
            }
            PoseFailure::EmptyLigand => f.write_str("pose has no atoms to featurize"),
            PoseFailure::EmptyFeaturization => {
                f.write_str("no ligand atom is covered by the vocabulary")
            }
            PoseFailure::Timeout => f.write_str("pose exceeded its time limit"),
            PoseFailure::Prediction(msg) => write!(f, "prediction failed: {}", msg),
            PoseFailure::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl From<AssemblyError> for PoseFailure {
    fn from(err: AssemblyError) -> Self {
        match err {
            AssemblyError::EmptyLigand { .. } => PoseFailure::EmptyLigand,
            AssemblyError::UnsupportedAtomType { symbol, role, .. } => {
                PoseFailure::UnsupportedAtomType { symbol, role }
            }
        }
    }
}

impl From<FeaturizeError> for PoseFailure {
    fn from(err: FeaturizeError) -> Self {
        match err {
            FeaturizeError::EmptyFeaturization { .. } => PoseFailure::EmptyFeaturization,
            FeaturizeError::Timeout => PoseFailure::Timeout,
            other => PoseFailure::Internal(other.to_string()),
        }
    }
}
