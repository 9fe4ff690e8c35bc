use super::atom::Atom;
use super::topology::{Bond, BondOrder};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// The part a structure plays in a scoring run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoleculeRole {
    Receptor,
    LigandPose,
}

impl fmt::Display for MoleculeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MoleculeRole::Receptor => "receptor",
            MoleculeRole::LigandPose => "ligand-pose",
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordBuildError {
    #[error("Bond {bond} references atom index {index}, but the record has {atom_count} atoms")]
    DanglingBond {
        bond: usize,
        index: usize,
        atom_count: usize,
    },
    #[error("Bond {bond} connects atom {index} to itself")]
    SelfBond { bond: usize, index: usize },
}

/// One parsed 3-D structure.
///
/// Records are immutable once built: every bond refers to a valid atom index, and
/// the only way to obtain a record is through [`MoleculeRecordBuilder::build`].
#[derive(Debug, Clone, PartialEq)]
pub struct MoleculeRecord {
    title: String,
    role: MoleculeRole,
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    properties: BTreeMap<String, String>,
}

impl MoleculeRecord {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn role(&self) -> MoleculeRole {
        self.role
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// Key/value data attached by the source format (SDF data items, Vina results).
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Attaches `properties`; values the record already carries are kept.
    pub fn add_missing_properties(&mut self, properties: BTreeMap<String, String>) {
        for (key, value) in properties {
            self.properties.entry(key).or_insert(value);
        }
    }

    pub fn heavy_atom_count(&self) -> usize {
        self.atoms.iter().filter(|a| a.is_heavy()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }
}

pub struct MoleculeRecordBuilder {
    title: String,
    role: MoleculeRole,
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    properties: BTreeMap<String, String>,
}

impl MoleculeRecordBuilder {
    pub fn new(role: MoleculeRole) -> Self {
        Self {
            title: String::new(),
            role,
            atoms: Vec::new(),
            bonds: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn title(&mut self, title: &str) -> &mut Self {
        self.title = title.trim().to_string();
        self
    }

    pub fn has_title(&self) -> bool {
        !self.title.is_empty()
    }

    /// Appends an atom and returns its index within the record.
    pub fn add_atom(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.atoms.len() - 1
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn atom_mut(&mut self, index: usize) -> Option<&mut Atom> {
        self.atoms.get_mut(index)
    }

    pub fn add_bond(&mut self, atom1: usize, atom2: usize, order: BondOrder) -> &mut Self {
        self.bonds.push(Bond::new(atom1, atom2, order));
        self
    }

    pub fn property(&mut self, key: &str, value: &str) -> &mut Self {
        self.properties
            .insert(key.trim().to_string(), value.trim().to_string());
        self
    }

    pub fn build(self) -> Result<MoleculeRecord, RecordBuildError> {
        let atom_count = self.atoms.len();
        for (i, bond) in self.bonds.iter().enumerate() {
            for index in [bond.atom1, bond.atom2] {
                if index >= atom_count {
                    return Err(RecordBuildError::DanglingBond {
                        bond: i,
                        index,
                        atom_count,
                    });
                }
            }
            if bond.atom1 == bond.atom2 {
                return Err(RecordBuildError::SelfBond {
                    bond: i,
                    index: bond.atom1,
                });
            }
        }
        Ok(MoleculeRecord {
            title: self.title,
            role: self.role,
            atoms: self.atoms,
            bonds: self.bonds,
            properties: self.properties,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn atom(name: &str, element: &'static str) -> Atom {
        Atom::new(name, element, Point3::origin())
    }

    #[test]
    fn added_properties_do_not_override_existing_ones() {
        let mut builder = MoleculeRecordBuilder::new(MoleculeRole::LigandPose);
        builder.add_atom(atom("O1", "O"));
        builder.property("vina_affinity", "-9.4");
        let mut record = builder.build().unwrap();

        record.add_missing_properties(BTreeMap::from([
            ("vina_affinity".to_string(), "-1.0".to_string()),
            ("vina_rmsd_lb".to_string(), "0".to_string()),
        ]));
        assert_eq!(record.property("vina_affinity"), Some("-9.4"));
        assert_eq!(record.property("vina_rmsd_lb"), Some("0"));
    }

    #[test]
    fn builder_produces_record_with_atoms_bonds_and_properties() {
        let mut builder = MoleculeRecordBuilder::new(MoleculeRole::LigandPose);
        builder.title("  aspirin ");
        let c = builder.add_atom(atom("C1", "C"));
        let o = builder.add_atom(atom("O1", "O"));
        builder.add_atom(atom("H1", "H"));
        builder.add_bond(c, o, BondOrder::Double);
        builder.property("vina_affinity", "-7.2");

        let record = builder.build().unwrap();
        assert_eq!(record.title(), "aspirin");
        assert_eq!(record.role(), MoleculeRole::LigandPose);
        assert_eq!(record.len(), 3);
        assert_eq!(record.heavy_atom_count(), 2);
        assert_eq!(record.bonds().len(), 1);
        assert_eq!(record.property("vina_affinity"), Some("-7.2"));
    }

    #[test]
    fn build_rejects_bond_to_missing_atom() {
        let mut builder = MoleculeRecordBuilder::new(MoleculeRole::Receptor);
        builder.add_atom(atom("N", "N"));
        builder.add_bond(0, 4, BondOrder::Single);
        assert_eq!(
            builder.build().unwrap_err(),
            RecordBuildError::DanglingBond {
                bond: 0,
                index: 4,
                atom_count: 1
            }
        );
    }

    #[test]
    fn build_rejects_self_bond() {
        let mut builder = MoleculeRecordBuilder::new(MoleculeRole::Receptor);
        builder.add_atom(atom("N", "N"));
        builder.add_bond(0, 0, BondOrder::Single);
        assert!(matches!(
            builder.build(),
            Err(RecordBuildError::SelfBond { .. })
        ));
    }

    #[test]
    fn role_display_uses_kebab_case() {
        assert_eq!(MoleculeRole::LigandPose.to_string(), "ligand-pose");
        assert_eq!(MoleculeRole::Receptor.to_string(), "receptor");
    }
}
