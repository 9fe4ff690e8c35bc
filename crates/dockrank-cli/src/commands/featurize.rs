use super::{create_output, open_structures};
use crate::cli::FeaturizeArgs;
use crate::config::PartialRankingConfig;
use crate::error::Result;
use crate::output::FeatureCsvWriter;
use crate::utils::progress::CliProgressHandler;
use dockrank::core::features::FeatureSchema;
use dockrank::core::models::record::MoleculeRole;
use dockrank::core::scoring::artifact::ModelArtifact;
use dockrank::engine::progress::{Progress, ProgressReporter};
use dockrank::workflows::{FeaturizationSession, FeaturizedPose, load_receptor};
use tracing::{info, warn};

pub fn run(args: FeaturizeArgs, quiet: bool) -> Result<()> {
    let base_schema = match &args.model {
        Some(path) => {
            info!("Taking the feature schema from model artifact {:?}", path);
            ModelArtifact::load(path)?.schema().clone()
        }
        None => FeatureSchema::default(),
    };

    let partial_config = PartialRankingConfig::load(args.input.config.as_deref())?;
    let config = partial_config.merge_for_featurize(&args, base_schema)?;
    info!("Featurizing with schema {}", config.schema);

    let receptor_stream = open_structures(
        &args.input.receptor,
        args.input.receptor_format,
        MoleculeRole::Receptor,
    )?;
    let receptor = load_receptor(receptor_stream)?;
    let session = FeaturizationSession::from_config(&config, &receptor)?;
    drop(receptor);

    let poses = open_structures(
        &args.input.poses,
        args.input.pose_format,
        MoleculeRole::LigandPose,
    )?;

    let progress_handler = if quiet {
        CliProgressHandler::hidden()
    } else {
        CliProgressHandler::new()
    };
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    reporter.report(Progress::PhaseStart {
        name: "Featurizing poses",
    });

    let field_names = session.schema().field_names();
    let writer = create_output(args.output.as_ref())?;
    let mut written = 0usize;
    let mut failed = 0usize;
    let mut track = |pose: &FeaturizedPose| {
        written += 1;
        if pose.outcome.is_err() {
            failed += 1;
        }
    };

    if args.sparse {
        let mut buffered = Vec::new();
        for item in session.featurize_all(poses) {
            match item {
                Ok(pose) => {
                    track(&pose);
                    buffered.push(pose);
                }
                Err(err) => {
                    warn!("Reading ligand poses failed: {}. Keeping poses read so far.", err);
                    break;
                }
            }
        }
        let columns = nonzero_columns(&buffered, field_names.len());
        info!(
            "{} of {} feature columns are nonzero.",
            columns.len(),
            field_names.len()
        );
        let mut csv = FeatureCsvWriter::new(writer, &field_names, columns)?;
        for pose in &buffered {
            csv.write(pose)?;
        }
        csv.finish()?;
    } else {
        let mut csv =
            FeatureCsvWriter::new(writer, &field_names, (0..field_names.len()).collect())?;
        for item in session.featurize_all(poses) {
            match item {
                Ok(pose) => {
                    track(&pose);
                    csv.write(&pose)?;
                }
                Err(err) => {
                    warn!("Reading ligand poses failed: {}. Keeping poses read so far.", err);
                    break;
                }
            }
        }
        csv.finish()?;
    }
    reporter.report(Progress::PhaseFinish);

    info!("Featurized {} pose(s), {} failed.", written, failed);
    if !quiet {
        eprintln!(
            "✓ Featurized {} pose(s) ({} failed) into {} fields.",
            written,
            failed,
            field_names.len()
        );
    }
    Ok(())
}

/// Indices of fields that are nonzero in at least one featurized pose.
fn nonzero_columns(poses: &[FeaturizedPose], width: usize) -> Vec<usize> {
    let mut used = vec![false; width];
    for vector in poses.iter().filter_map(|p| p.outcome.as_ref().ok()) {
        for (flag, value) in used.iter_mut().zip(vector.values()) {
            *flag |= *value != 0.0;
        }
    }
    used.iter()
        .enumerate()
        .filter_map(|(i, &u)| u.then_some(i))
        .collect()
}
