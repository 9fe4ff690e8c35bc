use super::schema::{FeatureSchema, SchemaError};
use std::sync::Arc;

/// An interaction fingerprint together with the schema that gives its fields meaning.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    schema: Arc<FeatureSchema>,
    values: Vec<f64>,
}

impl FeatureVector {
    /// Pairs values with a schema, refusing vectors of the wrong length.
    pub fn new(schema: Arc<FeatureSchema>, values: Vec<f64>) -> Result<Self, SchemaError> {
        let expected = schema.expected_length();
        if values.len() != expected {
            return Err(SchemaError::LengthMismatch {
                expected,
                actual: values.len(),
            });
        }
        Ok(Self { schema, values })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn shared_schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    /// Iterates over `(field name, value)` pairs that are not zero.
    pub fn nonzero_fields(&self) -> impl Iterator<Item = (String, f64)> + '_ {
        self.schema
            .field_names()
            .into_iter()
            .zip(self.values.iter().copied())
            .filter(|(_, v)| *v != 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::features::schema::Normalization;

    fn schema() -> Arc<FeatureSchema> {
        Arc::new(FeatureSchema::new(["C", "O"], vec![0.0, 4.0], 4.0, Normalization::None).unwrap())
    }

    #[test]
    fn vector_of_expected_length_is_accepted() {
        let vector = FeatureVector::new(schema(), vec![0.0, 1.0, 0.0, 2.0]).unwrap();
        assert_eq!(vector.len(), 4);
        let nonzero: Vec<_> = vector.nonzero_fields().collect();
        assert_eq!(
            nonzero,
            vec![("C-O@0.00-4.00".to_string(), 1.0), ("O-O@0.00-4.00".to_string(), 2.0)]
        );
    }

    #[test]
    fn vector_of_wrong_length_is_rejected() {
        assert_eq!(
            FeatureVector::new(schema(), vec![1.0; 3]),
            Err(SchemaError::LengthMismatch {
                expected: 4,
                actual: 3
            })
        );
    }
}
