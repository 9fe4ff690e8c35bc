use super::receptor::PreparedReceptor;
use super::schema::{FeatureSchema, Normalization, SchemaError};
use super::vector::FeatureVector;
use crate::core::complex::Complex;
use crate::core::models::record::MoleculeRecord;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FeaturizeError {
    #[error("No ligand atom takes part in contact counting ({ligand_atoms} atoms excluded)")]
    EmptyFeaturization { ligand_atoms: usize },
    #[error("Featurization exceeded its deadline")]
    Timeout,
    #[error("Receptor was prepared for a different feature schema")]
    ReceptorSchemaMismatch,
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Counts receptor-ligand atom contacts by type pair and distance bin.
///
/// The featurizer holds a validated schema; receptors must be prepared through
/// [`PairwiseContactFeaturizer::prepare_receptor`] so that the spatial index
/// uses the schema's cutoff as its cell size.
#[derive(Debug, Clone)]
pub struct PairwiseContactFeaturizer {
    schema: Arc<FeatureSchema>,
    edges_sq: Vec<f64>,
    cutoff_sq: f64,
}

impl PairwiseContactFeaturizer {
    pub fn new(schema: FeatureSchema) -> Result<Self, SchemaError> {
        let schema = Arc::new(schema.validated()?);
        Ok(Self {
            edges_sq: schema.bin_edges.iter().map(|e| e * e).collect(),
            cutoff_sq: schema.cutoff * schema.cutoff,
            schema,
        })
    }

    pub fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    pub fn prepare_receptor(&self, receptor: &MoleculeRecord) -> PreparedReceptor {
        PreparedReceptor::new(Arc::clone(&self.schema), receptor)
    }

    pub fn featurize(&self, complex: &Complex) -> Result<FeatureVector, FeaturizeError> {
        self.featurize_until(complex, None)
    }

    /// Featurizes a complex, giving up with [`FeaturizeError::Timeout`] once
    /// `deadline` has passed. The deadline is checked between ligand atoms.
    pub fn featurize_until(
        &self,
        complex: &Complex,
        deadline: Option<Instant>,
    ) -> Result<FeatureVector, FeaturizeError> {
        let receptor = complex.receptor();
        if receptor.schema().as_ref() != self.schema.as_ref() {
            return Err(FeaturizeError::ReceptorSchemaMismatch);
        }

        let schema = self.schema.as_ref();
        let num_bins = schema.num_bins();
        let mut counts = vec![0.0f64; schema.expected_length()];
        let mut participating = 0usize;
        let mut participating_heavy = 0usize;

        for atom in complex.ligand().atoms() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(FeaturizeError::Timeout);
            }
            if schema.ignore_hydrogens && atom.is_hydrogen() {
                continue;
            }
            let Some(ligand_type) = schema.type_index(atom.element) else {
                continue;
            };
            participating += 1;
            if atom.is_heavy() {
                participating_heavy += 1;
            }

            let position = &atom.position;
            receptor.grid().for_each_candidate(position, |r| {
                let d2 = (receptor.position(r) - position).norm_squared();
                if d2 >= self.cutoff_sq {
                    return;
                }
                let upper = self.edges_sq.partition_point(|e| *e <= d2);
                if upper == 0 || upper > num_bins {
                    return;
                }
                counts[schema.field_index(receptor.type_index(r), ligand_type, upper - 1)] += 1.0;
            });
        }

        if participating == 0 {
            return Err(FeaturizeError::EmptyFeaturization {
                ligand_atoms: complex.ligand().len(),
            });
        }

        if schema.normalization == Normalization::ByLigandHeavyAtoms && participating_heavy > 0 {
            let scale = 1.0 / participating_heavy as f64;
            counts.iter_mut().for_each(|c| *c *= scale);
        }

        Ok(FeatureVector::new(Arc::clone(&self.schema), counts)?)
    }
}
