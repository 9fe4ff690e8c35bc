use super::ParseFailure;
use super::traits::{LineSource, RecordFormat, SourceLine, slice_and_trim};
use crate::core::models::atom::{Atom, Protonation};
use crate::core::models::element;
use crate::core::models::record::{MoleculeRecord, MoleculeRecordBuilder, MoleculeRole};
use crate::core::models::topology::BondOrder;
use nalgebra::Point3;
use std::io::{self, BufRead};

const RECORD_DELIMITER: &str = "$$$$";
const HEADER_LINES: usize = 3;

/// MDL SD files (V2000 connection tables), one record per `$$$$`-terminated block.
pub struct SdfFormat;

impl RecordFormat for SdfFormat {
    fn read_block<R: BufRead>(source: &mut LineSource<R>) -> io::Result<Option<Vec<SourceLine>>> {
        let mut lines: Vec<SourceLine> = Vec::new();
        while let Some((line_no, content)) = source.next_line()? {
            if content.trim() == RECORD_DELIMITER {
                if is_blank(&lines) {
                    lines.clear();
                    continue;
                }
                return Ok(Some(lines));
            }
            lines.push((line_no, content));
        }
        if is_blank(&lines) {
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
        if block.len() <= HEADER_LINES {
            return Err(ParseFailure::syntax(
                last_line,
                "SDF record must contain a header block and a counts line",
            ));
        }

        let (counts_ln, counts_line) = &block[HEADER_LINES];
        if counts_line.contains("V3000") {
            return Err(ParseFailure::syntax(
                *counts_ln,
                "V3000 connection tables are not supported",
            ));
        }
        let (atom_count, bond_count) = parse_counts(counts_line, *counts_ln)?;

        let atom_start = HEADER_LINES + 1;
        let bond_start = atom_start + atom_count;
        let bond_end = bond_start + bond_count;
        if block.len() < bond_start {
            return Err(ParseFailure::missing_coordinates(
                last_line,
                format!(
                    "record declares {} atoms but only {} atom lines are present",
                    atom_count,
                    block.len() - atom_start
                ),
            ));
        }
        if block.len() < bond_end {
            return Err(ParseFailure::syntax(
                last_line,
                format!(
                    "record declares {} bonds but the block ends early",
                    bond_count
                ),
            ));
        }

        let mut builder = MoleculeRecordBuilder::new(role);
        builder.title(&block[0].1);

        for (i, (ln, raw)) in block[atom_start..bond_start].iter().enumerate() {
            builder.add_atom(parse_atom(raw, *ln, i + 1)?);
        }
        for (ln, raw) in &block[bond_start..bond_end] {
            let (a1, a2, order) = parse_bond(raw, *ln, atom_count)?;
            builder.add_bond(a1, a2, order);
        }

        parse_properties_block(&block[bond_end..], &mut builder)?;

        for i in 0..builder.atom_count() {
            if let Some(atom) = builder.atom_mut(i) {
                if atom.formal_charge != 0 {
                    atom.protonation = Some(Protonation::from_formal_charge(atom.formal_charge));
                }
            }
        }

        builder
            .build()
            .map_err(|e| ParseFailure::syntax(*counts_ln, e.to_string()))
    }
}

fn is_blank(lines: &[SourceLine]) -> bool {
    lines.iter().all(|(_, l)| l.trim().is_empty())
}

fn parse_counts(line: &str, line_no: usize) -> Result<(usize, usize), ParseFailure> {
    let atoms_str = slice_and_trim(line, 0, 3);
    let bonds_str = slice_and_trim(line, 3, 6);
    let atoms = atoms_str.parse::<usize>().map_err(|_| {
        ParseFailure::syntax(line_no, format!("invalid atom count '{}'", atoms_str))
    })?;
    let bonds = bonds_str.parse::<usize>().map_err(|_| {
        ParseFailure::syntax(line_no, format!("invalid bond count '{}'", bonds_str))
    })?;
    Ok((atoms, bonds))
}

fn parse_coordinate(value: &str, axis: &str, line_no: usize) -> Result<f64, ParseFailure> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            ParseFailure::syntax(
                line_no,
                format!("invalid {} coordinate '{}' in atom line", axis, value),
            )
        })
}

fn parse_atom(raw: &str, line_no: usize, serial: usize) -> Result<Atom, ParseFailure> {
    let x_str = slice_and_trim(raw, 0, 10);
    let y_str = slice_and_trim(raw, 10, 20);
    let z_str = slice_and_trim(raw, 20, 30);
    if x_str.is_empty() || y_str.is_empty() || z_str.is_empty() {
        return Err(ParseFailure::missing_coordinates(
            line_no,
            "atom line does not carry all three coordinates",
        ));
    }
    let x = parse_coordinate(x_str, "x", line_no)?;
    let y = parse_coordinate(y_str, "y", line_no)?;
    let z = parse_coordinate(z_str, "z", line_no)?;

    let symbol = slice_and_trim(raw, 31, 34);
    if symbol.is_empty() {
        return Err(ParseFailure::syntax(line_no, "atom line has no element symbol"));
    }
    let element =
        element::canonical_symbol(symbol).ok_or_else(|| ParseFailure::unsupported_type(line_no, symbol))?;

    let mut atom = Atom::new(
        &format!("{}{}", element, serial),
        element,
        Point3::new(x, y, z),
    );
    atom.formal_charge = charge_from_code(slice_and_trim(raw, 36, 39), line_no)?;
    Ok(atom)
}

/// Decodes the V2000 atom-block charge field (`1` = +3 ... `7` = -3, `4` = doublet radical).
fn charge_from_code(code: &str, line_no: usize) -> Result<i8, ParseFailure> {
    if code.is_empty() {
        return Ok(0);
    }
    match code.parse::<u8>() {
        Ok(0) | Ok(4) => Ok(0),
        Ok(c @ 1..=3) => Ok(4 - c as i8),
        Ok(c @ 5..=7) => Ok(4 - c as i8),
        _ => Err(ParseFailure::syntax(
            line_no,
            format!("invalid charge code '{}'", code),
        )),
    }
}

fn parse_bond(
    raw: &str,
    line_no: usize,
    atom_count: usize,
) -> Result<(usize, usize, BondOrder), ParseFailure> {
    let a1_str = slice_and_trim(raw, 0, 3);
    let a2_str = slice_and_trim(raw, 3, 6);
    let order_str = slice_and_trim(raw, 6, 9);

    let parse_index = |s: &str| -> Result<usize, ParseFailure> {
        let idx = s
            .parse::<usize>()
            .map_err(|_| ParseFailure::syntax(line_no, format!("invalid atom index '{}'", s)))?;
        if idx == 0 || idx > atom_count {
            return Err(ParseFailure::syntax(
                line_no,
                format!("bond references atom {} outside 1..={}", idx, atom_count),
            ));
        }
        Ok(idx - 1)
    };
    let a1 = parse_index(a1_str)?;
    let a2 = parse_index(a2_str)?;
    let order = order_str.parse::<BondOrder>().map_err(|_| {
        ParseFailure::syntax(line_no, format!("unsupported bond order '{}'", order_str))
    })?;
    Ok((a1, a2, order))
}

/// Handles the property block (`M  CHG`, `M  END`) and the trailing SD data items.
fn parse_properties_block(
    lines: &[SourceLine],
    builder: &mut MoleculeRecordBuilder,
) -> Result<(), ParseFailure> {
    let mut charges_reset = false;
    let mut i = 0;
    while i < lines.len() {
        let (ln, raw) = &lines[i];
        if raw.starts_with("M  CHG") {
            if !charges_reset {
                for idx in 0..builder.atom_count() {
                    if let Some(atom) = builder.atom_mut(idx) {
                        atom.formal_charge = 0;
                    }
                }
                charges_reset = true;
            }
            apply_charge_line(raw, *ln, builder)?;
        } else if raw.starts_with('>') {
            let name = data_item_name(raw);
            let mut value_lines = Vec::new();
            i += 1;
            while i < lines.len() && !lines[i].1.trim().is_empty() {
                value_lines.push(lines[i].1.trim_end());
                i += 1;
            }
            if let Some(name) = name {
                builder.property(name, &value_lines.join("\n"));
            }
        }
        i += 1;
    }
    Ok(())
}

fn apply_charge_line(
    raw: &str,
    line_no: usize,
    builder: &mut MoleculeRecordBuilder,
) -> Result<(), ParseFailure> {
    let tokens: Vec<&str> = raw.split_whitespace().skip(2).collect();
    let count = tokens
        .first()
        .and_then(|t| t.parse::<usize>().ok())
        .ok_or_else(|| ParseFailure::syntax(line_no, "malformed M  CHG entry count"))?;
    if tokens.len() < 1 + 2 * count {
        return Err(ParseFailure::syntax(
            line_no,
            "M  CHG line lists fewer entries than declared",
        ));
    }
    for pair in tokens[1..1 + 2 * count].chunks(2) {
        let idx = pair[0].parse::<usize>().ok();
        let charge = pair[1].parse::<i8>().ok();
        match (idx, charge) {
            (Some(idx), Some(charge)) if idx >= 1 => {
                let atom = builder.atom_mut(idx - 1).ok_or_else(|| {
                    ParseFailure::syntax(line_no, format!("M  CHG references missing atom {}", idx))
                })?;
                atom.formal_charge = charge;
            }
            _ => {
                return Err(ParseFailure::syntax(
                    line_no,
                    "M  CHG entry is not an (atom, charge) pair",
                ));
            }
        }
    }
    Ok(())
}

fn data_item_name(header: &str) -> Option<&str> {
    let start = header.find('<')? + 1;
    let end = header[start..].find('>')? + start;
    let name = header[start..end].trim();
    (!name.is_empty()).then_some(name)
}
