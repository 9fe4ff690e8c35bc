use super::{ModelError, Prediction, Predictor};
use crate::core::features::FeatureSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Relu,
    Tanh,
    Logistic,
    Identity,
}

impl Activation {
    #[inline]
    fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Relu => x.max(0.0),
            Activation::Tanh => x.tanh(),
            Activation::Logistic => 1.0 / (1.0 + (-x).exp()),
            Activation::Identity => x,
        }
    }
}

/// A fully connected layer; `weights[j]` holds the input weights of output unit `j`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Vec<Vec<f64>>,
    pub biases: Vec<f64>,
}

impl DenseLayer {
    fn width(&self) -> usize {
        self.biases.len()
    }

    fn forward(&self, input: &[f64], activation: Activation, output: &mut Vec<f64>) {
        output.clear();
        output.extend(self.weights.iter().zip(&self.biases).map(|(row, b)| {
            let z = b + row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>();
            activation.apply(z)
        }));
    }

    fn validate(&self, name: &str, inputs: usize) -> Result<(), ModelError> {
        if self.weights.len() != self.biases.len() || self.biases.is_empty() {
            return Err(ModelError::InvalidParameters(format!(
                "{} has {} weight rows and {} biases",
                name,
                self.weights.len(),
                self.biases.len()
            )));
        }
        if let Some(row) = self.weights.iter().find(|row| row.len() != inputs) {
            return Err(ModelError::InvalidParameters(format!(
                "{} expects {} inputs but a weight row has {}",
                name,
                inputs,
                row.len()
            )));
        }
        let all_finite = self
            .weights
            .iter()
            .flatten()
            .chain(&self.biases)
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(ModelError::InvalidParameters(format!(
                "{} has non-finite parameters",
                name
            )));
        }
        Ok(())
    }
}

/// Per-feature input scaling applied as `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standardizer {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericParams {
    #[serde(default)]
    pub standardizer: Option<Standardizer>,
    pub hidden: Vec<DenseLayer>,
    #[serde(default)]
    pub activation: Activation,
    /// Single-unit linear output layer.
    pub output: DenseLayer,
}

/// A feed-forward regression network.
#[derive(Debug, Clone)]
pub struct GenericRegressor {
    schema: Arc<FeatureSchema>,
    params: GenericParams,
}

impl GenericRegressor {
    pub fn new(schema: Arc<FeatureSchema>, params: GenericParams) -> Result<Self, ModelError> {
        let inputs = schema.expected_length();
        if let Some(std) = &params.standardizer {
            if std.mean.len() != inputs || std.scale.len() != inputs {
                return Err(ModelError::InvalidParameters(format!(
                    "standardizer covers {}/{} features, schema defines {}",
                    std.mean.len(),
                    std.scale.len(),
                    inputs
                )));
            }
            if std.scale.iter().any(|s| !s.is_finite() || *s == 0.0)
                || std.mean.iter().any(|m| !m.is_finite())
            {
                return Err(ModelError::InvalidParameters(
                    "standardizer scales must be finite and non-zero".to_string(),
                ));
            }
        }

        let mut width = inputs;
        for (i, layer) in params.hidden.iter().enumerate() {
            layer.validate(&format!("hidden layer {}", i), width)?;
            width = layer.width();
        }
        params.output.validate("output layer", width)?;
        if params.output.width() != 1 {
            return Err(ModelError::InvalidParameters(format!(
                "output layer must have one unit, found {}",
                params.output.width()
            )));
        }
        Ok(Self { schema, params })
    }
}

impl Predictor for GenericRegressor {
    fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn predict_values(&self, values: &[f64]) -> Prediction {
        let mut current: Vec<f64> = match &self.params.standardizer {
            Some(std) => values
                .iter()
                .zip(std.mean.iter().zip(&std.scale))
                .map(|(x, (m, s))| (x - m) / s)
                .collect(),
            None => values.to_vec(),
        };
        let mut next = Vec::new();
        for layer in &self.params.hidden {
            layer.forward(&current, self.params.activation, &mut next);
            std::mem::swap(&mut current, &mut next);
        }
        self.params
            .output
            .forward(&current, Activation::Identity, &mut next);
        Prediction::new(next.first().copied().unwrap_or(f64::NAN))
    }
}
