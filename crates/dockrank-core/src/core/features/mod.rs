//! Interaction fingerprints.
//!
//! A [`FeatureSchema`] fixes the atom-type vocabulary, distance bins and
//! normalization; the [`PairwiseContactFeaturizer`] turns a receptor-ligand
//! [`Complex`](crate::core::complex::Complex) into a [`FeatureVector`] laid out
//! by that schema. Receptors are prepared once per run into a
//! [`PreparedReceptor`] holding a spatial index sized to the cutoff.

pub mod featurizer;
pub mod receptor;
pub mod schema;
pub mod vector;

pub use featurizer::{FeaturizeError, PairwiseContactFeaturizer};
pub use receptor::PreparedReceptor;
pub use schema::{FeatureSchema, Normalization, SCHEMA_VERSION, SchemaError};
pub use vector::FeatureVector;
