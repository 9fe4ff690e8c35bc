//! Parsers for AutoDock Vina results.
//!
//! Vina reports scores in two places: on its standard output (for `--score_only`
//! and docking runs) and in `REMARK VINA RESULT` lines of the PDBQT poses it
//! writes. Both end up as `vina_*` properties on pose records.

use std::collections::BTreeMap;

/// Prefix shared by every record property derived from Vina output.
pub const PROPERTY_PREFIX: &str = "vina_";

const AFFINITY_UNIT: &str = "(kcal/mol)";
const RESULT_REMARK: &str = "REMARK VINA RESULT:";

/// Scores Vina attaches to one docked pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VinaScore {
    pub affinity: f64,
    pub rmsd_lb: f64,
    pub rmsd_ub: f64,
}

impl VinaScore {
    pub fn to_properties(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("vina_affinity".to_string(), self.affinity.to_string()),
            ("vina_rmsd_lb".to_string(), self.rmsd_lb.to_string()),
            ("vina_rmsd_ub".to_string(), self.rmsd_ub.to_string()),
        ])
    }
}

/// One row of the docking mode table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VinaMode {
    pub mode: usize,
    pub score: VinaScore,
}

/// Parses the term breakdown printed by `vina --score_only`.
///
/// Lines of the form `Affinity: -7.2 (kcal/mol)` and indented `    gauss 1 : 57.8`
/// become `vina_affinity` and `vina_gauss1`. Lines whose value is not a number
/// (banner text, headings) are skipped.
pub fn parse_scoring_output(output: &str) -> BTreeMap<String, f64> {
    let mut terms = BTreeMap::new();
    for line in output.lines() {
        if !(line.starts_with("Affinity:") || line.starts_with("    ")) {
            continue;
        }
        let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
        let Some((name, value)) = compact.split_once(':') else {
            continue;
        };
        let value = value.replace(AFFINITY_UNIT, "");
        if name.is_empty() {
            continue;
        }
        if let Ok(value) = value.parse::<f64>() {
            terms.insert(format!("{}{}", PROPERTY_PREFIX, name.to_lowercase()), value);
        }
    }
    terms
}

/// Parses the mode table printed at the end of a Vina docking run.
pub fn parse_docking_output(output: &str) -> Vec<VinaMode> {
    output
        .lines()
        .filter(|line| line.starts_with(char::is_whitespace))
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 {
                return None;
            }
            Some(VinaMode {
                mode: fields[0].parse().ok()?,
                score: VinaScore {
                    affinity: fields[1].parse().ok()?,
                    rmsd_lb: fields[2].parse().ok()?,
                    rmsd_ub: fields[3].parse().ok()?,
                },
            })
        })
        .collect()
}

/// Captured standard output of one Vina run.
#[derive(Debug, Clone, PartialEq)]
pub enum VinaLog {
    /// `--score_only` terms for the single pose that was scored.
    Scoring(BTreeMap<String, f64>),
    /// Docking modes; mode `n` is the `n`-th pose Vina wrote.
    Docking(Vec<VinaMode>),
}

impl VinaLog {
    /// A log with a mode table is a docking log; anything else is read as
    /// `--score_only` output.
    pub fn parse(output: &str) -> Self {
        let modes = parse_docking_output(output);
        if modes.is_empty() {
            VinaLog::Scoring(parse_scoring_output(output))
        } else {
            VinaLog::Docking(modes)
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            VinaLog::Scoring(terms) => terms.is_empty(),
            VinaLog::Docking(modes) => modes.is_empty(),
        }
    }

    /// The `vina_*` properties belonging to the pose at `pose_index` (0-based)
    /// of the file Vina wrote alongside this log.
    pub fn properties_for(&self, pose_index: usize) -> BTreeMap<String, String> {
        match self {
            VinaLog::Scoring(terms) if pose_index == 0 => terms
                .iter()
                .map(|(name, value)| (name.clone(), value.to_string()))
                .collect(),
            VinaLog::Scoring(_) => BTreeMap::new(),
            VinaLog::Docking(modes) => modes
                .iter()
                .find(|m| m.mode == pose_index + 1)
                .map(|m| m.score.to_properties())
                .unwrap_or_default(),
        }
    }
}

/// Parses a `REMARK VINA RESULT:` line from a docked PDBQT pose.
pub fn parse_result_remark(line: &str) -> Option<VinaScore> {
    let rest = line.trim_start().strip_prefix(RESULT_REMARK)?;
    let mut values = rest.split_whitespace().map(str::parse::<f64>);
    Some(VinaScore {
        affinity: values.next()?.ok()?,
        rmsd_lb: values.next()?.ok()?,
        rmsd_ub: values.next()?.ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCORE_ONLY: &str = "\
#################################################################
# If you used AutoDock Vina in your work, please cite:          #
#################################################################
Detected 8 CPUs
Reading input ... done.
Setting up the scoring function ... done.
Affinity: -7.19858 (kcal/mol)
Intramolecular energy: -0.76471
    gauss 1     : 57.86945
    gauss 2     : 1091.02197
    repulsion   : 2.40418
    hydrophobic : 37.48932
    Hydrogen    : 1.17931
";

    const DOCKING: &str = "\
mode |   affinity | dist from best mode
     | (kcal/mol) | rmsd l.b.| rmsd u.b.
-----+------------+----------+----------
   1         -9.4      0.000      0.000
   2         -8.7      2.164      3.016
  10         -6.1      5.210      7.431
Writing output ... done.
";

    #[test]
    fn scoring_output_yields_prefixed_lowercase_terms() {
        let terms = parse_scoring_output(SCORE_ONLY);
        assert_eq!(terms.get("vina_affinity"), Some(&-7.19858));
        assert_eq!(terms.get("vina_gauss1"), Some(&57.86945));
        assert_eq!(terms.get("vina_gauss2"), Some(&1091.02197));
        assert_eq!(terms.get("vina_hydrogen"), Some(&1.17931));
        assert!(!terms.contains_key("vina_intramolecularenergy"));
        assert_eq!(terms.len(), 6);
    }

    #[test]
    fn docking_output_yields_one_row_per_mode() {
        let modes = parse_docking_output(DOCKING);
        assert_eq!(modes.len(), 3);
        assert_eq!(modes[0].mode, 1);
        assert_eq!(modes[1].score.affinity, -8.7);
        assert_eq!(modes[1].score.rmsd_ub, 3.016);
        assert_eq!(modes[2].mode, 10);
    }

    #[test]
    fn docking_log_maps_modes_to_pose_indices() {
        let log = VinaLog::parse(DOCKING);
        assert!(matches!(log, VinaLog::Docking(ref modes) if modes.len() == 3));
        let second = log.properties_for(1);
        assert_eq!(second.get("vina_affinity").map(String::as_str), Some("-8.7"));
        assert_eq!(second.get("vina_rmsd_ub").map(String::as_str), Some("3.016"));
        assert_eq!(
            log.properties_for(9).get("vina_affinity").map(String::as_str),
            Some("-6.1")
        );
        assert!(log.properties_for(2).is_empty());
    }

    #[test]
    fn scoring_log_applies_to_first_pose_only() {
        let log = VinaLog::parse(SCORE_ONLY);
        assert!(!log.is_empty());
        let first = log.properties_for(0);
        assert_eq!(first.get("vina_affinity").map(String::as_str), Some("-7.19858"));
        assert_eq!(first.len(), 6);
        assert!(log.properties_for(1).is_empty());
        assert!(VinaLog::parse("Reading input ... done.\n").is_empty());
    }

    #[test]
    fn result_remark_is_parsed() {
        let score = parse_result_remark("REMARK VINA RESULT:      -7.1      1.234      2.345").unwrap();
        assert_eq!(score.affinity, -7.1);
        assert_eq!(score.rmsd_lb, 1.234);
        assert_eq!(score.rmsd_ub, 2.345);
        assert!(parse_result_remark("REMARK  Name = ligand").is_none());
        assert!(parse_result_remark("REMARK VINA RESULT: n/a").is_none());
    }

    #[test]
    fn score_converts_to_vina_properties() {
        let props = VinaScore {
            affinity: -6.5,
            rmsd_lb: 0.0,
            rmsd_ub: 0.0,
        }
        .to_properties();
        assert_eq!(props.get("vina_affinity").map(String::as_str), Some("-6.5"));
        assert_eq!(props.get("vina_rmsd_lb").map(String::as_str), Some("0"));
    }
}
