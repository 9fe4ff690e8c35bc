use super::generic::{GenericParams, GenericRegressor};
use super::linear::{LinearModel, LinearParams};
use super::tree::{TreeEnsemble, TreeEnsembleParams};
use super::{ModelError, ScoringModel};
use crate::core::features::FeatureSchema;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ModelParams {
    Linear(LinearParams),
    TreeEnsemble(TreeEnsembleParams),
    Generic(GenericParams),
}

/// A serialized trained model: its parameters and the schema it was trained on.
///
/// ```json
/// {
///   "schema": { "vocabulary": ["C", "N", "O"], "bin_edges": [0, 4, 8], "cutoff": 8 },
///   "model": { "kind": "linear", "weights": [...], "intercept": -1.2 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub schema: FeatureSchema,
    pub model: ModelParams,
}

impl ModelArtifact {
    /// Reads a JSON artifact from any reader.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, ModelError> {
        serde_json::from_reader(reader).map_err(|e| ModelError::Json {
            path: "<reader>".to_string(),
            source: e,
        })
    }

    /// Reads an artifact from a `.json` or `.toml` file.
    pub fn from_path(path: &Path) -> Result<Self, ModelError> {
        let display = path.to_string_lossy().to_string();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let content = std::fs::read_to_string(path).map_err(|e| ModelError::Io {
            path: display.clone(),
            source: e,
        })?;
        match extension.as_deref() {
            Some("json") => serde_json::from_str(&content).map_err(|e| ModelError::Json {
                path: display,
                source: e,
            }),
            Some("toml") => toml::from_str(&content).map_err(|e| ModelError::Toml {
                path: display,
                source: e,
            }),
            _ => Err(ModelError::UnsupportedArtifactFormat(display)),
        }
    }

    /// Validates the schema and parameters and builds the model.
    pub fn into_model(self) -> Result<ScoringModel, ModelError> {
        let schema = Arc::new(self.schema.validated()?);
        Ok(match self.model {
            ModelParams::Linear(p) => ScoringModel::Linear(LinearModel::new(schema, p)?),
            ModelParams::TreeEnsemble(p) => {
                ScoringModel::TreeEnsemble(TreeEnsemble::new(schema, p)?)
            }
            ModelParams::Generic(p) => ScoringModel::Generic(GenericRegressor::new(schema, p)?),
        })
    }

    pub fn load(path: &Path) -> Result<ScoringModel, ModelError> {
        Self::from_path(path)?.into_model()
    }
}
