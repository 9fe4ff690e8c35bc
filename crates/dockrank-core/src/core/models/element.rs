use phf::phf_map;

static ATOMIC_NUMBERS: phf::Map<&'static str, u8> = phf_map! {
    "H" => 1, "He" => 2, "Li" => 3, "Be" => 4, "B" => 5, "C" => 6, "N" => 7, "O" => 8,
    "F" => 9, "Ne" => 10, "Na" => 11, "Mg" => 12, "Al" => 13, "Si" => 14, "P" => 15,
    "S" => 16, "Cl" => 17, "Ar" => 18, "K" => 19, "Ca" => 20, "Sc" => 21, "Ti" => 22,
    "V" => 23, "Cr" => 24, "Mn" => 25, "Fe" => 26, "Co" => 27, "Ni" => 28, "Cu" => 29,
    "Zn" => 30, "Ga" => 31, "Ge" => 32, "As" => 33, "Se" => 34, "Br" => 35, "Kr" => 36,
    "Rb" => 37, "Sr" => 38, "Y" => 39, "Zr" => 40, "Nb" => 41, "Mo" => 42, "Tc" => 43,
    "Ru" => 44, "Rh" => 45, "Pd" => 46, "Ag" => 47, "Cd" => 48, "In" => 49, "Sn" => 50,
    "Sb" => 51, "Te" => 52, "I" => 53, "Xe" => 54, "Cs" => 55, "Ba" => 56, "La" => 57,
    "Gd" => 64, "Hf" => 72, "Ta" => 73, "W" => 74, "Re" => 75, "Os" => 76, "Ir" => 77,
    "Pt" => 78, "Au" => 79, "Hg" => 80, "Tl" => 81, "Pb" => 82, "Bi" => 83, "U" => 92,
};

/// Returns the canonical spelling of an element symbol (`"CL"` and `"cl"` become
/// `"Cl"`), or `None` when the symbol is not a known chemical element.
///
/// Dummy atoms, lone pairs and query atoms (`Du`, `LP`, `R#`, `*`) are not elements.
pub fn canonical_symbol(raw: &str) -> Option<&'static str> {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    let mut candidate = String::with_capacity(trimmed.len());
    candidate.push(first.to_ascii_uppercase());
    for c in chars {
        candidate.push(c.to_ascii_lowercase());
    }
    ATOMIC_NUMBERS
        .get_entry(candidate.as_str())
        .map(|(symbol, _)| *symbol)
}

pub fn atomic_number(symbol: &str) -> Option<u8> {
    ATOMIC_NUMBERS.get(symbol).copied()
}

#[inline]
pub fn is_hydrogen(symbol: &str) -> bool {
    symbol == "H"
}

/// Guesses an element from a PDB-style atom name such as `" CA "`, `"CL1"` or `"1HB "`.
///
/// Names whose first column is occupied (`aligned_left`) are tried as two-letter
/// elements first, following the PDB column convention for metals and halogens.
pub fn guess_from_atom_name(name: &str, aligned_left: bool) -> Option<&'static str> {
    let letters: String = name
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(2)
        .collect();
    if letters.is_empty() {
        return None;
    }
    if aligned_left && letters.len() == 2 {
        if let Some(symbol) = canonical_symbol(&letters) {
            return Some(symbol);
        }
    }
    canonical_symbol(&letters[..1])
}
