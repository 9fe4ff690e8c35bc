use crate::core::features::PreparedReceptor;
use crate::core::models::record::{MoleculeRecord, MoleculeRole};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// How atom types outside the schema vocabulary are treated when pairing a pose
/// with the receptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VocabularyPolicy {
    /// Reject the pose with `unsupported-atom-type`.
    #[default]
    Strict,
    /// Accept the pose; the featurizer skips the offending atoms.
    Exclude,
}

impl fmt::Display for VocabularyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VocabularyPolicy::Strict => "strict",
            VocabularyPolicy::Exclude => "exclude",
        })
    }
}

#[derive(Debug, Error)]
#[error("Unknown vocabulary policy '{0}'. Expected 'strict' or 'exclude'")]
pub struct ParsePolicyError(String);

impl FromStr for VocabularyPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(VocabularyPolicy::Strict),
            "exclude" => Ok(VocabularyPolicy::Exclude),
            other => Err(ParsePolicyError(other.to_string())),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("Pose {pose_index} has no atoms to featurize")]
    EmptyLigand { pose_index: usize },
    #[error("Pose {pose_index}: {role} atom type '{symbol}' is not in the feature vocabulary")]
    UnsupportedAtomType {
        pose_index: usize,
        symbol: String,
        role: MoleculeRole,
    },
}

/// One ligand pose paired with the run's receptor.
#[derive(Debug, Clone)]
pub struct Complex {
    receptor: Arc<PreparedReceptor>,
    ligand: MoleculeRecord,
    pose_index: usize,
}

impl Complex {
    pub fn receptor(&self) -> &PreparedReceptor {
        &self.receptor
    }

    pub fn ligand(&self) -> &MoleculeRecord {
        &self.ligand
    }

    /// 0-based position of the pose in its source stream.
    pub fn pose_index(&self) -> usize {
        self.pose_index
    }

    pub fn into_ligand(self) -> MoleculeRecord {
        self.ligand
    }
}

/// Pairs ligand poses with one prepared receptor.
#[derive(Debug, Clone)]
pub struct ComplexAssembler {
    receptor: Arc<PreparedReceptor>,
    policy: VocabularyPolicy,
}

impl ComplexAssembler {
    pub fn new(receptor: Arc<PreparedReceptor>, policy: VocabularyPolicy) -> Self {
        Self { receptor, policy }
    }

    pub fn receptor(&self) -> &Arc<PreparedReceptor> {
        &self.receptor
    }

    /// Validates a pose against the receptor and the schema vocabulary.
    ///
    /// Hydrogens are disregarded when the schema ignores them. Under
    /// [`VocabularyPolicy::Strict`] every remaining atom type of both molecules
    /// must be in the vocabulary; receptor types are checked first.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError::EmptyLigand`] when no atom is left to featurize and
    /// [`AssemblyError::UnsupportedAtomType`] for a vocabulary gap.
    pub fn assemble(
        &self,
        ligand: MoleculeRecord,
        pose_index: usize,
    ) -> Result<Complex, AssemblyError> {
        let schema = self.receptor.schema();
        let mut considered = ligand
            .atoms()
            .iter()
            .filter(|a| !(schema.ignore_hydrogens && a.is_hydrogen()))
            .peekable();
        if considered.peek().is_none() {
            return Err(AssemblyError::EmptyLigand { pose_index });
        }

        if self.policy == VocabularyPolicy::Strict {
            if let Some(symbol) = self.receptor.unsupported_types().iter().next() {
                return Err(AssemblyError::UnsupportedAtomType {
                    pose_index,
                    symbol: symbol.to_string(),
                    role: MoleculeRole::Receptor,
                });
            }
            if let Some(atom) = considered.find(|a| schema.type_index(a.element).is_none()) {
                return Err(AssemblyError::UnsupportedAtomType {
                    pose_index,
                    symbol: atom.element.to_string(),
                    role: MoleculeRole::LigandPose,
                });
            }
        }

        Ok(Complex {
            receptor: Arc::clone(&self.receptor),
            ligand,
            pose_index,
        })
    }
}
