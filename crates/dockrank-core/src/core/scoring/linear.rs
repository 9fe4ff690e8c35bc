use super::{ModelError, Prediction, Predictor};
use crate::core::features::FeatureSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Link {
    #[default]
    Identity,
    /// Maps the linear response to a probability (logistic regression).
    Logistic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearParams {
    pub weights: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
    #[serde(default)]
    pub link: Link,
}

/// `score = intercept + w·x`, optionally passed through a logistic link.
#[derive(Debug, Clone)]
pub struct LinearModel {
    schema: Arc<FeatureSchema>,
    params: LinearParams,
}

impl LinearModel {
    pub fn new(schema: Arc<FeatureSchema>, params: LinearParams) -> Result<Self, ModelError> {
        let expected = schema.expected_length();
        if params.weights.len() != expected {
            return Err(ModelError::InvalidParameters(format!(
                "linear model has {} weights, schema defines {} features",
                params.weights.len(),
                expected
            )));
        }
        if !params.intercept.is_finite() || params.weights.iter().any(|w| !w.is_finite()) {
            return Err(ModelError::InvalidParameters(
                "linear model weights must be finite".to_string(),
            ));
        }
        Ok(Self { schema, params })
    }

    pub fn params(&self) -> &LinearParams {
        &self.params
    }
}

impl Predictor for LinearModel {
    fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn predict_values(&self, values: &[f64]) -> Prediction {
        let z = self.params.intercept
            + self
                .params
                .weights
                .iter()
                .zip(values)
                .map(|(w, x)| w * x)
                .sum::<f64>();
        match self.params.link {
            Link::Identity => Prediction::new(z),
            Link::Logistic => {
                let p = 1.0 / (1.0 + (-z).exp());
                Prediction::with_confidence(p, (2.0 * p - 1.0).abs())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::features::{FeatureVector, Normalization};

    fn schema() -> Arc<FeatureSchema> {
        Arc::new(FeatureSchema::new(["C", "O"], vec![0.0, 4.0], 4.0, Normalization::None).unwrap())
    }

    #[test]
    fn identity_link_returns_affine_response_without_confidence() {
        let model = LinearModel::new(
            schema(),
            LinearParams {
                weights: vec![1.0, -2.0, 0.5, 0.0],
                intercept: 0.25,
                link: Link::Identity,
            },
        )
        .unwrap();
        let x = FeatureVector::new(schema(), vec![2.0, 1.0, 4.0, 9.0]).unwrap();
        assert_eq!(model.predict(&x).unwrap(), Prediction::new(2.25));
    }

    #[test]
    fn logistic_link_returns_probability_and_confidence() {
        let model = LinearModel::new(
            schema(),
            LinearParams {
                weights: vec![0.0; 4],
                intercept: 0.0,
                link: Link::Logistic,
            },
        )
        .unwrap();
        let x = FeatureVector::new(schema(), vec![1.0; 4]).unwrap();
        let prediction = model.predict(&x).unwrap();
        assert!((prediction.score - 0.5).abs() < 1e-12);
        assert_eq!(prediction.confidence, Some(0.0));

        let confident = LinearModel::new(
            schema(),
            LinearParams {
                weights: vec![10.0; 4],
                intercept: 0.0,
                link: Link::Logistic,
            },
        )
        .unwrap();
        let p = confident.predict(&x).unwrap();
        assert!(p.score > 0.99);
        assert!(p.confidence.unwrap() > 0.99);
    }

    #[test]
    fn weight_count_must_match_schema() {
        let err = LinearModel::new(
            schema(),
            LinearParams {
                weights: vec![1.0; 3],
                intercept: 0.0,
                link: Link::Identity,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::InvalidParameters(_)));
    }
}
