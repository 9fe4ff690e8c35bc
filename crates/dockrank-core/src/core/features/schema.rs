use crate::core::models::element;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The only schema layout this crate produces and consumes.
pub const SCHEMA_VERSION: u32 = 1;

const DEFAULT_VOCABULARY: [&str; 9] = ["C", "N", "O", "F", "P", "S", "Cl", "Br", "I"];
const DEFAULT_BIN_EDGES: [f64; 7] = [0.0, 2.0, 4.0, 6.0, 8.0, 10.0, 12.0];
const DEFAULT_CUTOFF: f64 = 12.0;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Normalization {
    #[default]
    None,
    ByLigandHeavyAtoms,
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Normalization::None => "none",
            Normalization::ByLigandHeavyAtoms => "by-ligand-heavy-atoms",
        })
    }
}

#[derive(Debug, Error)]
#[error("Unknown normalization '{0}'. Expected 'none' or 'by-ligand-heavy-atoms'")]
pub struct ParseNormalizationError(String);

impl FromStr for Normalization {
    type Err = ParseNormalizationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Normalization::None),
            "by-ligand-heavy-atoms" => Ok(Normalization::ByLigandHeavyAtoms),
            other => Err(ParseNormalizationError(other.to_string())),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Unsupported schema version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("Atom-type vocabulary must not be empty")]
    EmptyVocabulary,
    #[error("'{0}' in the atom-type vocabulary is not a chemical element")]
    UnknownSymbol(String),
    #[error("Atom type '{0}' appears more than once in the vocabulary")]
    DuplicateType(String),
    #[error("Vocabulary lists hydrogen while hydrogens are ignored")]
    HydrogenIgnored,
    #[error("Cutoff must be a finite positive distance, got {0}")]
    NonPositiveCutoff(f64),
    #[error("At least two bin edges are required, got {0}")]
    TooFewEdges(usize),
    #[error("Bin edges must be finite and non-negative, got {0}")]
    NegativeEdge(f64),
    #[error("Bin edges must be strictly increasing ({previous} followed by {next})")]
    NonMonotonicEdges { previous: f64, next: f64 },
    #[error("Last bin edge {edge} lies beyond the cutoff {cutoff}")]
    EdgeBeyondCutoff { edge: f64, cutoff: f64 },
    #[error("Feature vector has {actual} values but the schema defines {expected}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Defines what each position of an interaction fingerprint means.
///
/// Fields are ordered receptor type major, then ligand type, then distance bin,
/// so the vector length is `vocabulary.len()² × (bin_edges.len() - 1)`. Two
/// schemas describe compatible vectors only when they are equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureSchema {
    #[serde(default = "default_version")]
    pub version: u32,
    pub vocabulary: Vec<String>,
    /// Increasing edges `e0 < e1 < ... < en` of the half-open bins `[e_i, e_{i+1})`.
    pub bin_edges: Vec<f64>,
    pub cutoff: f64,
    #[serde(default)]
    pub normalization: Normalization,
    #[serde(default = "default_ignore_hydrogens")]
    pub ignore_hydrogens: bool,
}

fn default_version() -> u32 {
    SCHEMA_VERSION
}

fn default_ignore_hydrogens() -> bool {
    true
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            vocabulary: DEFAULT_VOCABULARY.iter().map(|s| s.to_string()).collect(),
            bin_edges: DEFAULT_BIN_EDGES.to_vec(),
            cutoff: DEFAULT_CUTOFF,
            normalization: Normalization::None,
            ignore_hydrogens: true,
        }
    }
}

impl FeatureSchema {
    pub fn new(
        vocabulary: impl IntoIterator<Item = impl Into<String>>,
        bin_edges: Vec<f64>,
        cutoff: f64,
        normalization: Normalization,
    ) -> Result<Self, SchemaError> {
        Self {
            version: SCHEMA_VERSION,
            vocabulary: vocabulary.into_iter().map(Into::into).collect(),
            bin_edges,
            cutoff,
            normalization,
            ignore_hydrogens: true,
        }
        .validated()
    }

    /// Checks the schema and rewrites vocabulary symbols to canonical element spelling.
    pub fn validated(mut self) -> Result<Self, SchemaError> {
        if self.version != SCHEMA_VERSION {
            return Err(SchemaError::UnsupportedVersion {
                found: self.version,
                expected: SCHEMA_VERSION,
            });
        }

        if self.vocabulary.is_empty() {
            return Err(SchemaError::EmptyVocabulary);
        }
        let mut seen = HashSet::new();
        for symbol in self.vocabulary.iter_mut() {
            let canonical = element::canonical_symbol(symbol)
                .ok_or_else(|| SchemaError::UnknownSymbol(symbol.clone()))?;
            if self.ignore_hydrogens && element::is_hydrogen(canonical) {
                return Err(SchemaError::HydrogenIgnored);
            }
            if !seen.insert(canonical) {
                return Err(SchemaError::DuplicateType(canonical.to_string()));
            }
            *symbol = canonical.to_string();
        }

        if !(self.cutoff.is_finite() && self.cutoff > 0.0) {
            return Err(SchemaError::NonPositiveCutoff(self.cutoff));
        }
        if self.bin_edges.len() < 2 {
            return Err(SchemaError::TooFewEdges(self.bin_edges.len()));
        }
        for &edge in &self.bin_edges {
            if !edge.is_finite() || edge < 0.0 {
                return Err(SchemaError::NegativeEdge(edge));
            }
        }
        for pair in self.bin_edges.windows(2) {
            if pair[1] <= pair[0] {
                return Err(SchemaError::NonMonotonicEdges {
                    previous: pair[0],
                    next: pair[1],
                });
            }
        }
        let last = self.bin_edges[self.bin_edges.len() - 1];
        if last > self.cutoff {
            return Err(SchemaError::EdgeBeyondCutoff {
                edge: last,
                cutoff: self.cutoff,
            });
        }
        Ok(self)
    }

    pub fn num_types(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn num_bins(&self) -> usize {
        self.bin_edges.len().saturating_sub(1)
    }

    pub fn expected_length(&self) -> usize {
        self.num_types() * self.num_types() * self.num_bins()
    }

    /// Position of an element symbol in the vocabulary.
    #[inline]
    pub fn type_index(&self, symbol: &str) -> Option<usize> {
        self.vocabulary.iter().position(|s| s == symbol)
    }

    #[inline]
    pub fn field_index(&self, receptor_type: usize, ligand_type: usize, bin: usize) -> usize {
        (receptor_type * self.num_types() + ligand_type) * self.num_bins() + bin
    }

    /// Names every field in vector order, e.g. `C-O@0.00-4.00`.
    pub fn field_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.expected_length());
        for receptor in &self.vocabulary {
            for ligand in &self.vocabulary {
                for edges in self.bin_edges.windows(2) {
                    names.push(format!(
                        "{}-{}@{:.2}-{:.2}",
                        receptor, ligand, edges[0], edges[1]
                    ));
                }
            }
        }
        names
    }

    /// A stable 64-bit FNV-1a hash of the schema contents.
    pub fn fingerprint(&self) -> u64 {
        let mut hash = FNV_OFFSET_BASIS;
        let mut feed = |bytes: &[u8]| {
            for &b in bytes {
                hash ^= u64::from(b);
                hash = hash.wrapping_mul(FNV_PRIME);
            }
        };
        feed(&self.version.to_le_bytes());
        for symbol in &self.vocabulary {
            feed(symbol.as_bytes());
            feed(&[0]);
        }
        for edge in &self.bin_edges {
            feed(&edge.to_bits().to_le_bytes());
        }
        feed(&self.cutoff.to_bits().to_le_bytes());
        feed(&[match self.normalization {
            Normalization::None => 0,
            Normalization::ByLigandHeavyAtoms => 1,
        }]);
        feed(&[u8::from(self.ignore_hydrogens)]);
        hash
    }

    /// Describes the first difference between two schemas, or `None` if they are equal.
    pub fn describe_difference(&self, other: &FeatureSchema) -> Option<String> {
        if self.version != other.version {
            return Some(format!("version {} vs {}", self.version, other.version));
        }
        if self.vocabulary != other.vocabulary {
            return Some(format!(
                "vocabulary [{}] vs [{}]",
                self.vocabulary.join(" "),
                other.vocabulary.join(" ")
            ));
        }
        if self.bin_edges != other.bin_edges {
            return Some(format!(
                "bin edges {:?} vs {:?}",
                self.bin_edges, other.bin_edges
            ));
        }
        if self.cutoff != other.cutoff {
            return Some(format!("cutoff {} vs {}", self.cutoff, other.cutoff));
        }
        if self.normalization != other.normalization {
            return Some(format!(
                "normalization {} vs {}",
                self.normalization, other.normalization
            ));
        }
        if self.ignore_hydrogens != other.ignore_hydrogens {
            return Some(format!(
                "ignore_hydrogens {} vs {}",
                self.ignore_hydrogens, other.ignore_hydrogens
            ));
        }
        None
    }
}

impl fmt::Display for FeatureSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "v{} [{}] x {} bins up to {} A ({:016x})",
            self.version,
            self.vocabulary.join(" "),
            self.num_bins(),
            self.cutoff,
            self.fingerprint()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(vocab: &[&str], edges: &[f64], cutoff: f64) -> Result<FeatureSchema, SchemaError> {
        FeatureSchema::new(vocab.iter().copied(), edges.to_vec(), cutoff, Normalization::None)
    }

    #[test]
    fn default_schema_is_valid() {
        let schema = FeatureSchema::default().validated().unwrap();
        assert_eq!(schema.num_types(), 9);
        assert_eq!(schema.num_bins(), 6);
        assert_eq!(schema.expected_length(), 9 * 9 * 6);
    }

    #[test]
    fn vocabulary_is_canonicalized() {
        let schema = schema(&["c", "CL", "Br"], &[0.0, 4.0], 4.0).unwrap();
        assert_eq!(schema.vocabulary, vec!["C", "Cl", "Br"]);
        assert_eq!(schema.type_index("Cl"), Some(1));
        assert_eq!(schema.type_index("N"), None);
    }

    #[test]
    fn invalid_schemas_are_rejected() {
        assert_eq!(schema(&[], &[0.0, 4.0], 4.0), Err(SchemaError::EmptyVocabulary));
        assert_eq!(
            schema(&["C", "c"], &[0.0, 4.0], 4.0),
            Err(SchemaError::DuplicateType("C".into()))
        );
        assert_eq!(
            schema(&["Xx"], &[0.0, 4.0], 4.0),
            Err(SchemaError::UnknownSymbol("Xx".into()))
        );
        assert_eq!(
            schema(&["C", "H"], &[0.0, 4.0], 4.0),
            Err(SchemaError::HydrogenIgnored)
        );
        assert_eq!(
            schema(&["C"], &[0.0, 4.0], 0.0),
            Err(SchemaError::NonPositiveCutoff(0.0))
        );
        assert_eq!(schema(&["C"], &[0.0], 4.0), Err(SchemaError::TooFewEdges(1)));
        assert_eq!(
            schema(&["C"], &[-1.0, 4.0], 4.0),
            Err(SchemaError::NegativeEdge(-1.0))
        );
        assert_eq!(
            schema(&["C"], &[0.0, 4.0, 3.0], 4.0),
            Err(SchemaError::NonMonotonicEdges {
                previous: 4.0,
                next: 3.0
            })
        );
        assert_eq!(
            schema(&["C"], &[0.0, 6.0], 4.0),
            Err(SchemaError::EdgeBeyondCutoff {
                edge: 6.0,
                cutoff: 4.0
            })
        );
    }

    #[test]
    fn hydrogen_is_allowed_when_not_ignored() {
        let mut schema = FeatureSchema::default();
        schema.vocabulary.push("H".into());
        schema.ignore_hydrogens = false;
        assert!(schema.validated().is_ok());
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let schema = FeatureSchema {
            version: 7,
            ..FeatureSchema::default()
        };
        assert_eq!(
            schema.validated(),
            Err(SchemaError::UnsupportedVersion {
                found: 7,
                expected: SCHEMA_VERSION
            })
        );
    }

    #[test]
    fn field_order_is_receptor_major_then_ligand_then_bin() {
        let schema = schema(&["C", "N"], &[0.0, 2.0, 4.0], 4.0).unwrap();
        let names = schema.field_names();
        assert_eq!(names.len(), schema.expected_length());
        assert_eq!(names[0], "C-C@0.00-2.00");
        assert_eq!(names[1], "C-C@2.00-4.00");
        assert_eq!(names[2], "C-N@0.00-2.00");
        assert_eq!(names[7], "N-N@2.00-4.00");
        assert_eq!(schema.field_index(1, 0, 1), 5);
        assert_eq!(names[schema.field_index(1, 0, 1)], "N-C@2.00-4.00");
    }

    #[test]
    fn fingerprint_is_stable_and_sensitive_to_bins() {
        let a = schema(&["C", "N"], &[0.0, 2.0, 4.0], 4.0).unwrap();
        let b = schema(&["C", "N"], &[0.0, 1.0, 4.0], 4.0).unwrap();
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert!(a.describe_difference(&b).unwrap().starts_with("bin edges"));
        assert_eq!(a.describe_difference(&a.clone()), None);
    }

    #[test]
    fn schema_deserializes_with_defaults() {
        let json = r#"{"vocabulary":["C","O"],"bin_edges":[0.0,4.0],"cutoff":4.0,"normalization":"by-ligand-heavy-atoms"}"#;
        let schema: FeatureSchema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.version, SCHEMA_VERSION);
        assert!(schema.ignore_hydrogens);
        assert_eq!(schema.normalization, Normalization::ByLigandHeavyAtoms);
    }

    #[test]
    fn schema_rejects_unknown_fields() {
        let json = r#"{"vocabulary":["C"],"bin_edges":[0.0,4.0],"cutoff":4.0,"bins":3}"#;
        assert!(serde_json::from_str::<FeatureSchema>(json).is_err());
    }
}
