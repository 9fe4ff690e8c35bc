use super::ParseFailure;
use super::traits::{LineSource, RecordFormat, SourceLine, slice_and_trim};
use super::vina;
use crate::core::models::atom::{Atom, Protonation};
use crate::core::models::element;
use crate::core::models::record::{MoleculeRecord, MoleculeRecordBuilder, MoleculeRole};
use crate::core::models::topology::BondOrder;
use nalgebra::Point3;
use phf::phf_map;
use std::collections::{BTreeSet, HashMap};
use std::io::{self, BufRead};

/// AutoDock atom types that do not spell their element directly.
static AUTODOCK_ELEMENTS: phf::Map<&'static str, &'static str> = phf_map! {
    "A" => "C",
    "NA" => "N",
    "NS" => "N",
    "OA" => "O",
    "OS" => "O",
    "SA" => "S",
    "HD" => "H",
    "HS" => "H",
};

/// Protein Data Bank files. Each `MODEL`/`ENDMDL` pair is one record; a file
/// without models is a single record.
pub struct PdbFormat;

/// AutoDock PDBQT files, laid out like PDB with partial charges and AutoDock
/// atom types appended to each atom line.
pub struct PdbqtFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavor {
    Pdb,
    Pdbqt,
}

fn record_name(line: &str) -> &str {
    line.get(..6).unwrap_or(line).trim()
}

fn is_atom_record(name: &str) -> bool {
    name == "ATOM" || name == "HETATM"
}

fn read_model_block<R: BufRead>(
    source: &mut LineSource<R>,
) -> io::Result<Option<Vec<SourceLine>>> {
    let mut lines: Vec<SourceLine> = Vec::new();
    let mut has_content = false;
    loop {
        let name = match source.peek_line()? {
            None => break,
            Some((_, line)) => record_name(line).to_ascii_uppercase(),
        };
        if name == "MODEL" && has_content {
            break;
        }
        let Some(line) = source.next_line()? else {
            break;
        };
        match name.as_str() {
            "MODEL" => {
                has_content = true;
                lines.push(line);
            }
            "ENDMDL" => {
                lines.push(line);
                return Ok(Some(lines));
            }
            "END" => {
                if has_content {
                    return Ok(Some(lines));
                }
                lines.clear();
            }
            other => {
                has_content |= is_atom_record(other);
                lines.push(line);
            }
        }
    }
    Ok(has_content.then_some(lines))
}

fn parse_coordinate(raw: &str, start: usize, end: usize, line_no: usize) -> Result<f64, ParseFailure> {
    let text = slice_and_trim(raw, start, end);
    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            ParseFailure::syntax(line_no, format!("invalid coordinate '{}' in atom record", text))
        })
}

/// Decodes the PDB charge column (`"2+"`, `"1-"`).
fn parse_pdb_charge(text: &str, line_no: usize) -> Result<i8, ParseFailure> {
    if text.is_empty() {
        return Ok(0);
    }
    let invalid = || ParseFailure::syntax(line_no, format!("invalid charge field '{}'", text));
    if !text.is_ascii() {
        return Err(invalid());
    }
    let (magnitude, sign) = text.split_at(text.len() - 1);
    let magnitude = if magnitude.is_empty() {
        1
    } else {
        magnitude.parse::<i8>().map_err(|_| invalid())?
    };
    match sign {
        "+" => Ok(magnitude),
        "-" => Ok(-magnitude),
        _ => Err(invalid()),
    }
}

fn autodock_element(ad_type: &str) -> Option<&'static str> {
    AUTODOCK_ELEMENTS
        .get(ad_type.to_ascii_uppercase().as_str())
        .copied()
        .or_else(|| element::canonical_symbol(ad_type))
}

fn parse_atom_record(
    raw: &str,
    line_no: usize,
    flavor: Flavor,
) -> Result<(Option<i64>, Atom), ParseFailure> {
    let serial = slice_and_trim(raw, 6, 11).parse::<i64>().ok();
    let raw_name = raw.get(12..16).unwrap_or_else(|| raw.get(12..).unwrap_or(""));
    let name = raw_name.trim();

    let coord_fields = [(30, 38), (38, 46), (46, 54)];
    if coord_fields
        .iter()
        .any(|&(start, end)| slice_and_trim(raw, start, end).is_empty())
    {
        return Err(ParseFailure::missing_coordinates(
            line_no,
            "atom record does not carry all three coordinates",
        ));
    }
    let x = parse_coordinate(raw, 30, 38, line_no)?;
    let y = parse_coordinate(raw, 38, 46, line_no)?;
    let z = parse_coordinate(raw, 46, 54, line_no)?;

    let aligned_left = raw_name.chars().next().is_some_and(|c| !c.is_whitespace());
    let mut partial_charge = 0.0;
    let mut source_type = None;
    let mut formal_charge = 0;

    let element = match flavor {
        Flavor::Pdb => {
            let symbol = slice_and_trim(raw, 76, 78);
            let element = if symbol.is_empty() {
                element::guess_from_atom_name(raw_name, aligned_left)
                    .ok_or_else(|| ParseFailure::unsupported_type(line_no, name))?
            } else {
                element::canonical_symbol(symbol)
                    .ok_or_else(|| ParseFailure::unsupported_type(line_no, symbol))?
            };
            formal_charge = parse_pdb_charge(slice_and_trim(raw, 78, 80), line_no)?;
            element
        }
        Flavor::Pdbqt => {
            let tail: Vec<&str> = raw.get(66..).unwrap_or("").split_whitespace().collect();
            if let Some(charge) = tail.first() {
                partial_charge = charge.parse::<f64>().map_err(|_| {
                    ParseFailure::syntax(line_no, format!("invalid partial charge '{}'", charge))
                })?;
            }
            match tail.get(1) {
                Some(ad_type) => {
                    source_type = Some(ad_type.to_string());
                    autodock_element(ad_type)
                        .ok_or_else(|| ParseFailure::unsupported_type(line_no, ad_type))?
                }
                None => element::guess_from_atom_name(raw_name, aligned_left)
                    .ok_or_else(|| ParseFailure::unsupported_type(line_no, name))?,
            }
        }
    };

    let mut atom = Atom::new(name, element, Point3::new(x, y, z));
    atom.partial_charge = partial_charge;
    atom.formal_charge = formal_charge;
    atom.source_type = source_type;
    if formal_charge != 0 {
        atom.protonation = Some(Protonation::from_formal_charge(formal_charge));
    }
    Ok((serial, atom))
}

/// Reads the serials of a `CONECT` record: the central atom followed by its partners.
fn conect_serials(raw: &str) -> Vec<i64> {
    [(6, 11), (11, 16), (16, 21), (21, 26), (26, 31)]
        .iter()
        .map(|&(start, end)| slice_and_trim(raw, start, end))
        .take_while(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

fn parse_model_block(
    block: &[SourceLine],
    role: MoleculeRole,
    flavor: Flavor,
) -> Result<MoleculeRecord, ParseFailure> {
    let last_line = block.last().map_or(0, |(ln, _)| *ln);
    let mut builder = MoleculeRecordBuilder::new(role);
    let mut serial_to_index: HashMap<i64, usize> = HashMap::new();
    let mut conect_lines: Vec<&str> = Vec::new();
    let mut model_serial: Option<String> = None;

    for (ln, raw) in block {
        let name = record_name(raw).to_ascii_uppercase();
        match name.as_str() {
            "ATOM" | "HETATM" => {
                let (serial, atom) = parse_atom_record(raw, *ln, flavor)?;
                let index = builder.add_atom(atom);
                if let Some(serial) = serial {
                    serial_to_index.insert(serial, index);
                }
            }
            "HEADER" if !builder.has_title() => {
                builder.title(slice_and_trim(raw, 10, 50));
            }
            "COMPND" if !builder.has_title() => {
                let text = slice_and_trim(raw, 10, 80);
                builder.title(text.strip_prefix("MOLECULE:").unwrap_or(text));
            }
            "MODEL" => {
                model_serial = Some(slice_and_trim(raw, 6, raw.len()).to_string());
            }
            "REMARK" => {
                if let Some(score) = vina::parse_result_remark(raw) {
                    for (key, value) in score.to_properties() {
                        builder.property(&key, &value);
                    }
                }
            }
            "CONECT" => conect_lines.push(raw),
            _ => {}
        }
    }

    if !builder.has_title() {
        if let Some(serial) = model_serial.filter(|s| !s.is_empty()) {
            builder.title(&format!("model {}", serial));
        }
    }

    let mut pairs: BTreeSet<(usize, usize)> = BTreeSet::new();
    for raw in conect_lines {
        let serials = conect_serials(raw);
        let Some((&center, partners)) = serials.split_first() else {
            continue;
        };
        let Some(&a) = serial_to_index.get(&center) else {
            continue;
        };
        for partner in partners {
            if let Some(&b) = serial_to_index.get(partner) {
                if a != b {
                    pairs.insert((a.min(b), a.max(b)));
                }
            }
        }
    }
    for (a, b) in pairs {
        builder.add_bond(a, b, BondOrder::Single);
    }

    builder
        .build()
        .map_err(|e| ParseFailure::syntax(last_line, e.to_string()))
}

impl RecordFormat for PdbFormat {
    fn read_block<R: BufRead>(source: &mut LineSource<R>) -> io::Result<Option<Vec<SourceLine>>> {
        read_model_block(source)
    }

    fn parse_block(
        block: &[SourceLine],
        role: MoleculeRole,
    ) -> Result<MoleculeRecord, ParseFailure> {
        parse_model_block(block, role, Flavor::Pdb)
    }
}

impl RecordFormat for PdbqtFormat {
    fn read_block<R: BufRead>(source: &mut LineSource<R>) -> io::Result<Option<Vec<SourceLine>>> {
        read_model_block(source)
    }

    fn parse_block(
        block: &[SourceLine],
        role: MoleculeRole,
    ) -> Result<MoleculeRecord, ParseFailure> {
        parse_model_block(block, role, Flavor::Pdbqt)
    }
}
