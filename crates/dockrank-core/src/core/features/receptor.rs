use super::schema::FeatureSchema;
use crate::core::models::record::MoleculeRecord;
use crate::core::spatial::SpatialGrid;
use nalgebra::Point3;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Receptor-side data computed once per run and shared by every pose.
///
/// Only atoms that take part in counting are kept: hydrogens are dropped when the
/// schema ignores them, and atoms outside the vocabulary are recorded in
/// [`PreparedReceptor::unsupported_types`] instead of being indexed.
#[derive(Debug, Clone)]
pub struct PreparedReceptor {
    schema: Arc<FeatureSchema>,
    title: String,
    total_atoms: usize,
    positions: Vec<Point3<f64>>,
    type_indices: Vec<usize>,
    unsupported: BTreeSet<&'static str>,
    grid: SpatialGrid,
}

impl PreparedReceptor {
    pub(crate) fn new(schema: Arc<FeatureSchema>, record: &MoleculeRecord) -> Self {
        let mut positions = Vec::with_capacity(record.len());
        let mut type_indices = Vec::with_capacity(record.len());
        let mut unsupported = BTreeSet::new();

        for atom in record.atoms() {
            if schema.ignore_hydrogens && atom.is_hydrogen() {
                continue;
            }
            match schema.type_index(atom.element) {
                Some(t) => {
                    positions.push(atom.position);
                    type_indices.push(t);
                }
                None => {
                    unsupported.insert(atom.element);
                }
            }
        }

        let grid = SpatialGrid::from_points(&positions, schema.cutoff);
        Self {
            schema,
            title: record.title().to_string(),
            total_atoms: record.len(),
            positions,
            type_indices,
            unsupported,
            grid,
        }
    }

    pub fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn total_atoms(&self) -> usize {
        self.total_atoms
    }

    /// Number of atoms indexed for contact counting.
    pub fn indexed_atoms(&self) -> usize {
        self.positions.len()
    }

    /// Element symbols present in the receptor but absent from the vocabulary.
    pub fn unsupported_types(&self) -> &BTreeSet<&'static str> {
        &self.unsupported
    }

    #[inline]
    pub(crate) fn position(&self, idx: usize) -> &Point3<f64> {
        &self.positions[idx]
    }

    #[inline]
    pub(crate) fn type_index(&self, idx: usize) -> usize {
        self.type_indices[idx]
    }

    #[inline]
    pub(crate) fn grid(&self) -> &SpatialGrid {
        &self.grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::features::schema::Normalization;
    use crate::core::models::atom::Atom;
    use crate::core::models::record::{MoleculeRecordBuilder, MoleculeRole};

    #[test]
    fn prepare_keeps_vocabulary_atoms_and_records_the_rest() {
        let schema = Arc::new(
            FeatureSchema::new(["C", "N", "O"], vec![0.0, 4.0], 4.0, Normalization::None).unwrap(),
        );
        let mut builder = MoleculeRecordBuilder::new(MoleculeRole::Receptor);
        builder.title("rec");
        builder.add_atom(Atom::new("CA", "C", Point3::new(0.0, 0.0, 0.0)));
        builder.add_atom(Atom::new("H", "H", Point3::new(1.0, 0.0, 0.0)));
        builder.add_atom(Atom::new("ZN", "Zn", Point3::new(2.0, 0.0, 0.0)));
        builder.add_atom(Atom::new("O", "O", Point3::new(3.0, 0.0, 0.0)));
        let record = builder.build().unwrap();

        let prepared = PreparedReceptor::new(schema, &record);
        assert_eq!(prepared.title(), "rec");
        assert_eq!(prepared.total_atoms(), 4);
        assert_eq!(prepared.indexed_atoms(), 2);
        assert_eq!(prepared.type_index(1), 2);
        assert_eq!(prepared.position(1), &Point3::new(3.0, 0.0, 0.0));
        assert_eq!(
            prepared.unsupported_types().iter().copied().collect::<Vec<_>>(),
            vec!["Zn"]
        );
    }
}
