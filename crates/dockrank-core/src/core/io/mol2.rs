use super::ParseFailure;
use super::traits::{LineSource, RecordFormat, SourceLine};
use crate::core::models::atom::Atom;
use crate::core::models::element;
use crate::core::models::record::{MoleculeRecord, MoleculeRecordBuilder, MoleculeRole};
use crate::core::models::topology::BondOrder;
use nalgebra::Point3;
use std::collections::HashMap;
use std::io::{self, BufRead};

const MOLECULE_HEADER: &str = "@<TRIPOS>MOLECULE";
const UNNAMED_MOLECULE: &str = "****";

/// Tripos MOL2 files, one record per `@<TRIPOS>MOLECULE` section.
pub struct Mol2Format;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Molecule,
    Atom,
    Bond,
    Other,
}

impl Section {
    fn from_header(line: &str) -> Self {
        match line.trim().to_ascii_uppercase().as_str() {
            "@<TRIPOS>MOLECULE" => Section::Molecule,
            "@<TRIPOS>ATOM" => Section::Atom,
            "@<TRIPOS>BOND" => Section::Bond,
            _ => Section::Other,
        }
    }
}

fn is_molecule_header(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case(MOLECULE_HEADER)
}

fn is_ignorable(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

impl RecordFormat for Mol2Format {
    fn read_block<R: BufRead>(source: &mut LineSource<R>) -> io::Result<Option<Vec<SourceLine>>> {
        let mut lines: Vec<SourceLine> = Vec::new();
        loop {
            let starts_record = match source.peek_line()? {
                None => break,
                Some((_, line)) => is_molecule_header(line),
            };
            if starts_record && lines.iter().any(|(_, l)| !is_ignorable(l)) {
                break;
            }
            if let Some(line) = source.next_line()? {
                lines.push(line);
            }
        }
        if lines.iter().all(|(_, l)| is_ignorable(l)) {
            Ok(None)
        } else {
            Ok(Some(lines))
        }
    }

    fn parse_block(
        block: &[SourceLine],
        role: MoleculeRole,
    ) -> Result<MoleculeRecord, ParseFailure> {
        let last_line = block.last().map_or(0, |(ln, _)| *ln);
        let mut builder = MoleculeRecordBuilder::new(role);
        let mut section = Section::Preamble;
        let mut molecule_lines = 0usize;
        let mut declared_atoms: Option<usize> = None;
        let mut seen_atom_section = false;
        let mut id_to_index: HashMap<u64, usize> = HashMap::new();

        for (ln, raw) in block {
            if is_ignorable(raw) {
                continue;
            }
            if raw.trim_start().starts_with("@<TRIPOS>") {
                section = Section::from_header(raw);
                if section == Section::Atom {
                    seen_atom_section = true;
                }
                continue;
            }
            match section {
                Section::Preamble => {
                    return Err(ParseFailure::syntax(
                        *ln,
                        "content found before the @<TRIPOS>MOLECULE header",
                    ));
                }
                Section::Molecule => {
                    match molecule_lines {
                        0 => {
                            let name = raw.trim();
                            if name != UNNAMED_MOLECULE {
                                builder.title(name);
                            }
                        }
                        1 => {
                            let count = raw.split_whitespace().next().unwrap_or("");
                            declared_atoms = Some(count.parse::<usize>().map_err(|_| {
                                ParseFailure::syntax(*ln, format!("invalid atom count '{}'", count))
                            })?);
                        }
                        _ => {}
                    }
                    molecule_lines += 1;
                }
                Section::Atom => {
                    let (id, atom) = parse_atom(raw, *ln)?;
                    let index = builder.add_atom(atom);
                    if id_to_index.insert(id, index).is_some() {
                        return Err(ParseFailure::syntax(
                            *ln,
                            format!("duplicate atom id {}", id),
                        ));
                    }
                }
                Section::Bond => {
                    if let Some((a1, a2, order)) = parse_bond(raw, *ln, &id_to_index)? {
                        builder.add_bond(a1, a2, order);
                    }
                }
                Section::Other => {}
            }
        }

        if molecule_lines == 0 {
            return Err(ParseFailure::syntax(
                last_line,
                "record has no @<TRIPOS>MOLECULE section",
            ));
        }
        if !seen_atom_section {
            return Err(ParseFailure::missing_coordinates(
                last_line,
                "record has no @<TRIPOS>ATOM section",
            ));
        }
        if let Some(declared) = declared_atoms {
            if builder.atom_count() < declared {
                return Err(ParseFailure::missing_coordinates(
                    last_line,
                    format!(
                        "record declares {} atoms but only {} atom lines are present",
                        declared,
                        builder.atom_count()
                    ),
                ));
            }
        }

        builder
            .build()
            .map_err(|e| ParseFailure::syntax(last_line, e.to_string()))
    }
}

fn parse_atom(raw: &str, line_no: usize) -> Result<(u64, Atom), ParseFailure> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.len() < 5 {
        return Err(ParseFailure::missing_coordinates(
            line_no,
            "atom line does not carry all three coordinates",
        ));
    }
    let id = tokens[0]
        .parse::<u64>()
        .map_err(|_| ParseFailure::syntax(line_no, format!("invalid atom id '{}'", tokens[0])))?;
    let mut coords = [0.0f64; 3];
    for (slot, token) in coords.iter_mut().zip(&tokens[2..5]) {
        *slot = token
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ParseFailure::syntax(line_no, format!("invalid coordinate '{}'", token)))?;
    }
    let sybyl_type = tokens
        .get(5)
        .ok_or_else(|| ParseFailure::syntax(line_no, "atom line has no atom type"))?;
    let base = sybyl_type.split('.').next().unwrap_or(sybyl_type);
    let element = element::canonical_symbol(base)
        .ok_or_else(|| ParseFailure::unsupported_type(line_no, sybyl_type))?;

    let mut atom = Atom::new(
        tokens[1],
        element,
        Point3::new(coords[0], coords[1], coords[2]),
    );
    atom.source_type = Some(sybyl_type.to_string());
    if let Some(charge) = tokens.get(8) {
        atom.partial_charge = charge.parse::<f64>().map_err(|_| {
            ParseFailure::syntax(line_no, format!("invalid partial charge '{}'", charge))
        })?;
    }
    Ok((id, atom))
}

fn parse_bond(
    raw: &str,
    line_no: usize,
    id_to_index: &HashMap<u64, usize>,
) -> Result<Option<(usize, usize, BondOrder)>, ParseFailure> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.len() < 4 {
        return Err(ParseFailure::syntax(
            line_no,
            "bond line needs an id, two atom ids and a type",
        ));
    }
    let lookup = |token: &str| -> Result<usize, ParseFailure> {
        token
            .parse::<u64>()
            .ok()
            .and_then(|id| id_to_index.get(&id).copied())
            .ok_or_else(|| {
                ParseFailure::syntax(line_no, format!("bond references unknown atom '{}'", token))
            })
    };
    let a1 = lookup(tokens[1])?;
    let a2 = lookup(tokens[2])?;
    match tokens[3].to_ascii_lowercase().as_str() {
        "du" | "un" | "nc" => Ok(None),
        other => other
            .parse::<BondOrder>()
            .map(|order| Some((a1, a2, order)))
            .map_err(|_| {
                ParseFailure::syntax(line_no, format!("unsupported bond type '{}'", tokens[3]))
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::RecordErrorKind;
    use std::io::Cursor;

    const BENZENE_FRAGMENT: &str = "\
# written by hand
@<TRIPOS>MOLECULE
frag
 3 2 0 0 0
SMALL
USER_CHARGES

@<TRIPOS>ATOM
      1 C1          0.0000    1.4000    0.0000 C.ar    1  LIG1       -0.0620
      2 C2          1.2120    0.7000    0.0000 C.ar    1  LIG1       -0.0620
      3 CL1         2.7000    1.5000    0.0000 Cl      1  LIG1       -0.1000
@<TRIPOS>BOND
     1     1     2   ar
     2     2     3    1
";

    fn read_all(input: &str) -> Vec<Vec<SourceLine>> {
        let mut source = LineSource::new(Cursor::new(input.to_string()));
        let mut blocks = Vec::new();
        while let Some(block) = Mol2Format::read_block(&mut source).unwrap() {
            blocks.push(block);
        }
        blocks
    }

    #[test]
    fn parses_atoms_types_charges_and_bonds() {
        let blocks = read_all(BENZENE_FRAGMENT);
        assert_eq!(blocks.len(), 1);
        let record = Mol2Format::parse_block(&blocks[0], MoleculeRole::LigandPose).unwrap();

        assert_eq!(record.title(), "frag");
        assert_eq!(record.len(), 3);
        assert_eq!(record.atoms()[0].element, "C");
        assert_eq!(record.atoms()[0].source_type.as_deref(), Some("C.ar"));
        assert_eq!(record.atoms()[2].element, "Cl");
        assert_eq!(record.atoms()[2].name, "CL1");
        assert!((record.atoms()[1].partial_charge + 0.062).abs() < 1e-12);
        assert_eq!(record.atoms()[1].position, Point3::new(1.212, 0.7, 0.0));
        assert_eq!(record.bonds()[0].order, BondOrder::Aromatic);
        assert_eq!(record.bonds()[1].order, BondOrder::Single);
    }

    #[test]
    fn splits_consecutive_molecules() {
        let input = format!("{}{}", BENZENE_FRAGMENT, BENZENE_FRAGMENT.replace("frag", "other"));
        let blocks = read_all(&input);
        assert_eq!(blocks.len(), 2);
        let second = Mol2Format::parse_block(&blocks[1], MoleculeRole::LigandPose).unwrap();
        assert_eq!(second.title(), "other");
    }

    #[test]
    fn short_atom_line_is_missing_coordinates() {
        let input = BENZENE_FRAGMENT.replace(
            "      2 C2          1.2120    0.7000    0.0000 C.ar    1  LIG1       -0.0620",
            "      2 C2          1.2120",
        );
        let blocks = read_all(&input);
        let err = Mol2Format::parse_block(&blocks[0], MoleculeRole::LigandPose).unwrap_err();
        assert_eq!(err.kind, RecordErrorKind::MissingCoordinates);
        assert_eq!(err.line, 10);
    }

    #[test]
    fn non_finite_coordinate_is_syntax_error() {
        let input = BENZENE_FRAGMENT.replace("1.2120    0.7000", "1.2120    NaN");
        let blocks = read_all(&input);
        let err = Mol2Format::parse_block(&blocks[0], MoleculeRole::LigandPose).unwrap_err();
        assert_eq!(err.kind, RecordErrorKind::UnparseableSyntax);
        assert_eq!(err.line, 10);

        let input = BENZENE_FRAGMENT.replace("2.7000    1.5000", "-infinity    1.5000");
        let blocks = read_all(&input);
        let err = Mol2Format::parse_block(&blocks[0], MoleculeRole::LigandPose).unwrap_err();
        assert!(err.message.contains("-infinity"));
    }

    #[test]
    fn dummy_atom_type_is_unsupported() {
        let input = BENZENE_FRAGMENT.replace("Cl      1", "Du      1");
        let blocks = read_all(&input);
        let err = Mol2Format::parse_block(&blocks[0], MoleculeRole::LigandPose).unwrap_err();
        assert_eq!(err.kind, RecordErrorKind::UnsupportedAtomType);
    }

    #[test]
    fn truncated_atom_section_is_missing_coordinates() {
        let input = BENZENE_FRAGMENT.replace(" 3 2 0 0 0", " 5 2 0 0 0");
        let blocks = read_all(&input);
        let err = Mol2Format::parse_block(&blocks[0], MoleculeRole::LigandPose).unwrap_err();
        assert_eq!(err.kind, RecordErrorKind::MissingCoordinates);
    }

    #[test]
    fn bond_to_unknown_atom_is_syntax_error() {
        let input = BENZENE_FRAGMENT.replace("     2     2     3    1", "     2     2     9    1");
        let blocks = read_all(&input);
        let err = Mol2Format::parse_block(&blocks[0], MoleculeRole::LigandPose).unwrap_err();
        assert_eq!(err.kind, RecordErrorKind::UnparseableSyntax);
    }

    #[test]
    fn content_without_molecule_header_is_syntax_error() {
        let blocks = read_all("garbage line\n");
        assert_eq!(blocks.len(), 1);
        let err = Mol2Format::parse_block(&blocks[0], MoleculeRole::LigandPose).unwrap_err();
        assert_eq!(err.kind, RecordErrorKind::UnparseableSyntax);
    }

    #[test]
    fn comment_only_input_has_no_records() {
        assert!(read_all("# nothing here\n\n").is_empty());
    }
}
