//! Provides input functionality for molecular structure formats.
//!
//! Each supported format splits its input into independent record blocks and
//! parses one block into a [`MoleculeRecord`](crate::core::models::record::MoleculeRecord).
//! [`stream::MoleculeStream`] turns a byte source into a lazy sequence of records in
//! which a malformed block becomes a failure element rather than the end of input.

pub mod mol2;
pub mod pdb;
pub mod sdf;
pub mod stream;
pub mod traits;
pub mod vina;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureFormat {
    Sdf,
    Mol2,
    Pdb,
    Pdbqt,
}

impl StructureFormat {
    /// Infers the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "sdf" | "mol" | "sd" => Some(Self::Sdf),
            "mol2" => Some(Self::Mol2),
            "pdb" | "ent" => Some(Self::Pdb),
            "pdbqt" => Some(Self::Pdbqt),
            _ => None,
        }
    }
}

impl fmt::Display for StructureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sdf => "sdf",
            Self::Mol2 => "mol2",
            Self::Pdb => "pdb",
            Self::Pdbqt => "pdbqt",
        })
    }
}

#[derive(Debug, Error)]
#[error("Unknown structure format '{0}'. Expected one of: sdf, mol2, pdb, pdbqt")]
pub struct ParseFormatError(String);

impl FromStr for StructureFormat {
    type Err = ParseFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sdf" | "mol" | "sd" => Ok(Self::Sdf),
            "mol2" => Ok(Self::Mol2),
            "pdb" | "ent" => Ok(Self::Pdb),
            "pdbqt" => Ok(Self::Pdbqt),
            other => Err(ParseFormatError(other.to_string())),
        }
    }
}

/// Why a single record could not be turned into a structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordErrorKind {
    UnparseableSyntax,
    MissingCoordinates,
    UnsupportedAtomType,
}

impl fmt::Display for RecordErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UnparseableSyntax => "unparseable-syntax",
            Self::MissingCoordinates => "missing-coordinates",
            Self::UnsupportedAtomType => "unsupported-atom-type",
        })
    }
}

/// A block-level parse failure, located by its line in the source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} on line {line}: {message}")]
pub struct ParseFailure {
    pub kind: RecordErrorKind,
    pub line: usize,
    pub message: String,
}

impl ParseFailure {
    pub fn new(kind: RecordErrorKind, line: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            line,
            message: message.into(),
        }
    }

    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::new(RecordErrorKind::UnparseableSyntax, line, message)
    }

    pub fn missing_coordinates(line: usize, message: impl Into<String>) -> Self {
        Self::new(RecordErrorKind::MissingCoordinates, line, message)
    }

    pub fn unsupported_type(line: usize, symbol: &str) -> Self {
        Self::new(
            RecordErrorKind::UnsupportedAtomType,
            line,
            format!("'{}' is not a recognized element", symbol.trim()),
        )
    }
}

/// A failed record within a stream, carrying its 0-based position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Record {record} could not be read: {failure}")]
pub struct RecordError {
    pub record: usize,
    #[source]
    pub failure: ParseFailure,
}

impl RecordError {
    pub fn kind(&self) -> RecordErrorKind {
        self.failure.kind
    }
}
