use crate::error::Result;
use dockrank::core::io::vina;
use dockrank::workflows::{FeaturizedPose, RankingReport, ScoredPose};
use std::collections::BTreeSet;
use std::io::Write;

const RANKING_COLUMNS: [&str; 8] = [
    "rank",
    "pose_index",
    "title",
    "score",
    "confidence",
    "status",
    "reason",
    "detail",
];

/// Vina-derived property keys present on any of the poses, in sorted order.
fn vina_columns<'a>(poses: impl Iterator<Item = &'a ScoredPose>) -> Vec<String> {
    poses
        .flat_map(|p| p.properties.keys())
        .filter(|k| k.starts_with(vina::PROPERTY_PREFIX))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn format_number(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{:.*}", precision, v))
        .unwrap_or_default()
}

/// Writes ranked poses (best first, optionally only the `top` best) followed by
/// every failed pose.
pub fn write_ranking<W: Write>(
    writer: W,
    report: &RankingReport,
    top: Option<usize>,
    precision: usize,
) -> Result<()> {
    let extra = vina_columns(report.poses.iter());
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(
        RANKING_COLUMNS
            .iter()
            .copied()
            .chain(extra.iter().map(String::as_str)),
    )?;

    let limit = top.unwrap_or(usize::MAX);
    let ranked = report
        .ranked_poses()
        .take(limit)
        .enumerate()
        .map(|(rank, pose)| (Some(rank + 1), pose));
    let failed = report.failed_poses().map(|pose| (None, pose));

    for (rank, pose) in ranked.chain(failed) {
        let (status, reason, detail) = match pose.failure() {
            None => ("scored", String::new(), String::new()),
            Some(failure) => ("failed", failure.code().to_string(), failure.to_string()),
        };
        let mut row = vec![
            rank.map(|r| r.to_string()).unwrap_or_default(),
            pose.pose_index.to_string(),
            pose.title.clone(),
            format_number(pose.score, precision),
            format_number(pose.confidence, precision),
            status.to_string(),
            reason,
            detail,
        ];
        row.extend(
            extra
                .iter()
                .map(|key| pose.properties.get(key).cloned().unwrap_or_default()),
        );
        csv.write_record(&row)?;
    }
    csv.flush()?;
    Ok(())
}

/// Streams featurized poses as CSV: identity columns followed by one column per
/// feature field. Failed poses get empty feature cells.
pub struct FeatureCsvWriter<W: Write> {
    csv: csv::Writer<W>,
    columns: Vec<usize>,
}

impl<W: Write> FeatureCsvWriter<W> {
    /// `field_names` are the schema's field names; `columns` selects which of them
    /// are written, in order.
    pub fn new(writer: W, field_names: &[String], columns: Vec<usize>) -> Result<Self> {
        let mut csv = csv::Writer::from_writer(writer);
        let header = ["pose_index", "title", "status", "reason"]
            .into_iter()
            .map(str::to_string)
            .chain(columns.iter().map(|&i| field_names[i].clone()));
        csv.write_record(header)?;
        Ok(Self { csv, columns })
    }

    pub fn write(&mut self, pose: &FeaturizedPose) -> Result<()> {
        let mut row = vec![pose.pose_index.to_string(), pose.title.clone()];
        match &pose.outcome {
            Ok(vector) => {
                row.push("ok".to_string());
                row.push(String::new());
                let values = vector.values();
                row.extend(self.columns.iter().map(|&i| values[i].to_string()));
            }
            Err(failure) => {
                row.push("failed".to_string());
                row.push(failure.code().to_string());
                row.extend(self.columns.iter().map(|_| String::new()));
            }
        }
        self.csv.write_record(&row)?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.csv.flush()?;
        Ok(())
    }
}
