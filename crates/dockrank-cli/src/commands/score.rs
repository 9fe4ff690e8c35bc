use super::{create_output, open_structures};
use crate::cli::ScoreArgs;
use crate::config::{DefaultsConfig, PartialRankingConfig};
use crate::error::{CliError, Result};
use crate::output;
use crate::utils::progress::CliProgressHandler;
use dockrank::core::io::vina::VinaLog;
use dockrank::core::models::record::MoleculeRole;
use dockrank::core::scoring::artifact::ModelArtifact;
use dockrank::engine::cancel::CancellationToken;
use dockrank::engine::progress::ProgressReporter;
use dockrank::workflows::PoseRankingPipeline;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

pub fn run(args: ScoreArgs, threads: Option<usize>, quiet: bool) -> Result<()> {
    info!("Loading model artifact from {:?}", &args.model);
    let model = ModelArtifact::load(&args.model)?;
    info!("Loaded {} model: {}", model.kind(), model.schema());

    let partial_config = PartialRankingConfig::load(args.input.config.as_deref())?;
    info!("Merging configuration from file and CLI arguments...");
    let final_config = partial_config.merge_with_cli(&args, threads, model.schema())?;

    let receptor = open_structures(
        &args.input.receptor,
        args.input.receptor_format,
        MoleculeRole::Receptor,
    )?;
    let poses = open_structures(
        &args.input.poses,
        args.input.pose_format,
        MoleculeRole::LigandPose,
    )?;
    let vina_log = args.vina_log.as_deref().map(load_vina_log).transpose()?;
    let poses = poses.enumerate().map(move |(pose_index, item)| {
        item.map(|mut record| {
            if let Some(log) = &vina_log {
                record.add_missing_properties(log.properties_for(pose_index));
            }
            record
        })
    });

    let pipeline = PoseRankingPipeline::new(final_config, model)?;

    let progress_handler = if quiet {
        CliProgressHandler::hidden()
    } else {
        CliProgressHandler::new()
    };
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    if !quiet {
        eprintln!("Scoring ligand poses...");
    }
    info!("Invoking the pose ranking workflow...");
    let report = pipeline.run_with(receptor, poses, &reporter, &CancellationToken::new())?;

    info!(
        "Workflow finished: {} pose(s) scored, {} failed.",
        report.ranked.len(),
        report.failed.len()
    );

    let precision = DefaultsConfig::default().score_precision;
    let writer = create_output(args.output.as_ref())?;
    output::write_ranking(writer, &report, args.top, precision)?;

    if let Some(err) = &report.stream_error {
        warn!("Pose input ended early: {}", err);
        eprintln!(
            "Warning: reading poses stopped early ({}); results cover the first {} pose(s).",
            err,
            report.poses.len()
        );
    }

    if quiet {
        return Ok(());
    }
    match report.best() {
        Some(best) => eprintln!(
            "✓ {} pose(s) scored, {} failed. Best: #{} '{}' (score {:.*})",
            report.ranked.len(),
            report.failed.len(),
            best.pose_index,
            best.title,
            precision,
            best.score.unwrap_or_default()
        ),
        None if report.poses.is_empty() => {
            warn!("Workflow completed but no poses were read.");
            eprintln!("Warning: no ligand poses were read.");
        }
        None => eprintln!(
            "Warning: none of the {} pose(s) could be scored.",
            report.failed.len()
        ),
    }
    if let Some(path) = &args.output {
        eprintln!("  Results written to: {}", path.display());
    }

    Ok(())
}

fn load_vina_log(path: &Path) -> Result<VinaLog> {
    let text = fs::read_to_string(path).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    let log = VinaLog::parse(&text);
    match &log {
        VinaLog::Docking(modes) => info!("Read {} docking mode(s) from {:?}", modes.len(), path),
        VinaLog::Scoring(terms) if !terms.is_empty() => {
            info!("Read {} scoring term(s) from {:?}", terms.len(), path)
        }
        VinaLog::Scoring(_) => warn!("No Vina scores found in {:?}", path),
    }
    Ok(log)
}
