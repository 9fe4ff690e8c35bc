use super::element;
use nalgebra::Point3;
use std::str::FromStr;

/// Protonation state recorded explicitly by the source format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protonation {
    Protonated,
    Deprotonated,
    Neutral,
}

impl Protonation {
    /// Derives a protonation state from a formal charge.
    pub fn from_formal_charge(charge: i8) -> Self {
        match charge {
            c if c > 0 => Protonation::Protonated,
            c if c < 0 => Protonation::Deprotonated,
            _ => Protonation::Neutral,
        }
    }
}

impl FromStr for Protonation {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "protonated" | "+" => Ok(Protonation::Protonated),
            "deprotonated" | "-" => Ok(Protonation::Deprotonated),
            "neutral" | "0" => Ok(Protonation::Neutral),
            _ => Err(()),
        }
    }
}

/// An atom of a parsed structure.
///
/// `element` is always a canonical element symbol (see [`element::canonical_symbol`]);
/// readers refuse to construct atoms whose element cannot be recognized.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Record-local atom name (e.g. "CA", "O1").
    pub name: String,
    /// Canonical element symbol used as the atom type by the featurizer.
    pub element: &'static str,
    /// Raw type string from the source format (SYBYL or AutoDock type), if any.
    pub source_type: Option<String>,
    /// Cartesian coordinates in Angstroms.
    pub position: Point3<f64>,
    /// Partial charge in elementary charge units.
    pub partial_charge: f64,
    /// Integer formal charge.
    pub formal_charge: i8,
    pub protonation: Option<Protonation>,
}

impl Atom {
    pub fn new(name: &str, element: &'static str, position: Point3<f64>) -> Self {
        Self {
            name: name.to_string(),
            element,
            source_type: None,
            position,
            partial_charge: 0.0,
            formal_charge: 0,
            protonation: None,
        }
    }

    #[inline]
    pub fn is_hydrogen(&self) -> bool {
        element::is_hydrogen(self.element)
    }

    #[inline]
    pub fn is_heavy(&self) -> bool {
        !self.is_hydrogen()
    }
}
