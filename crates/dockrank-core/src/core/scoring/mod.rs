//! Trained scoring models.
//!
//! Every model owns its parameters and the [`FeatureSchema`] it was trained on,
//! and maps a [`FeatureVector`] of that schema to a [`Prediction`]. The built-in
//! variants form the closed set [`ScoringModel`]; other implementations plug in
//! through the [`Predictor`] trait and [`ScoringModel::Custom`].

pub mod artifact;
pub mod generic;
pub mod linear;
pub mod tree;

use crate::core::features::{FeatureSchema, FeatureVector, SchemaError};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub use artifact::{ModelArtifact, ModelParams};
pub use generic::{Activation, DenseLayer, GenericParams, GenericRegressor, Standardizer};
pub use linear::{LinearModel, LinearParams, Link};
pub use tree::{Aggregation, Tree, TreeEnsemble, TreeEnsembleParams, TreeNode};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Feature schema mismatch: {detail}")]
    SchemaMismatch { detail: String },
    #[error("Invalid model parameters: {0}")]
    InvalidParameters(String),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("JSON parsing error for '{path}': {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Unsupported model artifact '{0}' (expected a .json or .toml file)")]
    UnsupportedArtifactFormat(String),
}

/// A model output: the score and, for models that can estimate it, a confidence in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub score: f64,
    pub confidence: Option<f64>,
}

impl Prediction {
    pub fn new(score: f64) -> Self {
        Self {
            score,
            confidence: None,
        }
    }

    pub fn with_confidence(score: f64, confidence: f64) -> Self {
        Self {
            score,
            confidence: Some(confidence),
        }
    }
}

/// A trained function from feature vectors to scores.
///
/// Implementations must be pure: `predict_values` may not mutate shared state,
/// so a single instance can serve all worker threads of a run.
pub trait Predictor: Send + Sync + fmt::Debug {
    /// The schema this model was trained on.
    fn schema(&self) -> &FeatureSchema;

    /// Scores raw values that are known to match [`Predictor::schema`].
    fn predict_values(&self, values: &[f64]) -> Prediction;

    /// Scores a feature vector after checking that it was built for this model's schema.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::SchemaMismatch`] when the vector's schema differs.
    fn predict(&self, features: &FeatureVector) -> Result<Prediction, ModelError> {
        ensure_same_schema(self.schema(), features)?;
        Ok(self.predict_values(features.values()))
    }
}

pub(crate) fn ensure_same_schema(
    expected: &FeatureSchema,
    features: &FeatureVector,
) -> Result<(), ModelError> {
    let actual = features.schema();
    if let Some(detail) = expected.describe_difference(actual) {
        return Err(ModelError::SchemaMismatch { detail });
    }
    if features.len() != expected.expected_length() {
        return Err(ModelError::SchemaMismatch {
            detail: format!(
                "vector has {} values, model expects {}",
                features.len(),
                expected.expected_length()
            ),
        });
    }
    Ok(())
}

/// The set of models a run can score with.
#[derive(Debug, Clone)]
pub enum ScoringModel {
    Linear(LinearModel),
    TreeEnsemble(TreeEnsemble),
    Generic(GenericRegressor),
    Custom(Arc<dyn Predictor>),
}

impl ScoringModel {
    pub fn kind(&self) -> &'static str {
        match self {
            ScoringModel::Linear(_) => "linear",
            ScoringModel::TreeEnsemble(_) => "tree-ensemble",
            ScoringModel::Generic(_) => "generic",
            ScoringModel::Custom(_) => "custom",
        }
    }

    fn predictor(&self) -> &dyn Predictor {
        match self {
            ScoringModel::Linear(m) => m,
            ScoringModel::TreeEnsemble(m) => m,
            ScoringModel::Generic(m) => m,
            ScoringModel::Custom(m) => m.as_ref(),
        }
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.predictor().schema()
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<Prediction, ModelError> {
        self.predictor().predict(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::features::Normalization;

    #[derive(Debug)]
    struct SumOfCounts {
        schema: FeatureSchema,
    }

    impl Predictor for SumOfCounts {
        fn schema(&self) -> &FeatureSchema {
            &self.schema
        }

        fn predict_values(&self, values: &[f64]) -> Prediction {
            Prediction::new(values.iter().sum())
        }
    }

    fn schema(edges: Vec<f64>) -> FeatureSchema {
        FeatureSchema::new(["C", "O"], edges, 4.0, Normalization::None).unwrap()
    }

    #[test]
    fn custom_predictor_is_usable_as_scoring_model() {
        let model = ScoringModel::Custom(Arc::new(SumOfCounts {
            schema: schema(vec![0.0, 4.0]),
        }));
        let features =
            FeatureVector::new(Arc::new(schema(vec![0.0, 4.0])), vec![1.0, 2.0, 0.0, 3.0]).unwrap();
        assert_eq!(model.kind(), "custom");
        assert_eq!(model.predict(&features).unwrap(), Prediction::new(6.0));
    }

    #[test]
    fn foreign_schema_is_a_mismatch() {
        let model = ScoringModel::Custom(Arc::new(SumOfCounts {
            schema: schema(vec![0.0, 4.0]),
        }));
        let features =
            FeatureVector::new(Arc::new(schema(vec![0.0, 2.0, 4.0])), vec![0.0; 8]).unwrap();
        let err = model.predict(&features).unwrap_err();
        match err {
            ModelError::SchemaMismatch { detail } => assert!(detail.contains("bin edges")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
