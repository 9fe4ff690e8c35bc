use super::featurize::{
    FeaturizationSession, FeaturizedPose, PendingPose, PoseSource, load_receptor,
};
use crate::core::features::PairwiseContactFeaturizer;
use crate::core::io::stream::StreamError;
use crate::core::models::record::MoleculeRecord;
use crate::core::scoring::ScoringModel;
use crate::engine::cancel::CancellationToken;
use crate::engine::config::{RankDirection, RankingConfig};
use crate::engine::error::{PipelineError, PoseFailure};
use crate::engine::progress::{Progress, ProgressReporter};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub enum PoseStatus {
    Scored,
    Failed(PoseFailure),
}

/// The outcome for one input pose.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPose {
    pub pose_index: usize,
    pub title: String,
    pub properties: BTreeMap<String, String>,
    pub score: Option<f64>,
    pub confidence: Option<f64>,
    pub status: PoseStatus,
}

impl ScoredPose {
    pub fn is_scored(&self) -> bool {
        self.status == PoseStatus::Scored
    }

    pub fn failure(&self) -> Option<&PoseFailure> {
        match &self.status {
            PoseStatus::Scored => None,
            PoseStatus::Failed(reason) => Some(reason),
        }
    }
}

/// Everything a run produced.
///
/// `ranked` and `failed` hold positions into `poses`.
#[derive(Debug, Default)]
pub struct RankingReport {
    /// Every processed pose, in pose index order.
    pub poses: Vec<ScoredPose>,
    /// Successful poses, best first when ranking is enabled, otherwise in index order.
    pub ranked: Vec<usize>,
    pub failed: Vec<usize>,
    /// Set when the run stopped early on a cancellation request.
    pub cancelled: bool,
    /// A fatal read error that ended the pose stream early.
    pub stream_error: Option<StreamError>,
}

impl RankingReport {
    pub fn ranked_poses(&self) -> impl Iterator<Item = &ScoredPose> {
        self.ranked.iter().map(|&i| &self.poses[i])
    }

    pub fn failed_poses(&self) -> impl Iterator<Item = &ScoredPose> {
        self.failed.iter().map(|&i| &self.poses[i])
    }

    pub fn best(&self) -> Option<&ScoredPose> {
        self.ranked.first().map(|&i| &self.poses[i])
    }
}

/// Scores a stream of ligand poses against one receptor with a trained model.
///
/// The receptor and the model are the only shared state; both are frozen for the
/// duration of a run. Results never depend on the number of workers.
#[derive(Debug)]
pub struct PoseRankingPipeline {
    config: RankingConfig,
    featurizer: PairwiseContactFeaturizer,
    model: ScoringModel,
}

impl PoseRankingPipeline {
    /// Builds a pipeline, rejecting a model trained on a different feature schema.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::SchemaMismatch`] before any input is read when the
    /// model's schema differs from the configured one.
    pub fn new(config: RankingConfig, model: ScoringModel) -> Result<Self, PipelineError> {
        let featurizer = PairwiseContactFeaturizer::new(config.featurization.schema.clone())?;
        if let Some(detail) = featurizer.schema().describe_difference(model.schema()) {
            return Err(PipelineError::SchemaMismatch { detail });
        }
        Ok(Self {
            config,
            featurizer,
            model,
        })
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    pub fn model(&self) -> &ScoringModel {
        &self.model
    }

    pub fn run<R, L>(&self, receptor: R, poses: L) -> Result<RankingReport, PipelineError>
    where
        R: IntoIterator<Item = Result<MoleculeRecord, StreamError>>,
        L: IntoIterator<Item = Result<MoleculeRecord, StreamError>>,
    {
        self.run_with(
            receptor,
            poses,
            &ProgressReporter::new(),
            &CancellationToken::new(),
        )
    }

    #[instrument(skip_all, name = "ranking_workflow")]
    pub fn run_with<R, L>(
        &self,
        receptor: R,
        poses: L,
        reporter: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<RankingReport, PipelineError>
    where
        R: IntoIterator<Item = Result<MoleculeRecord, StreamError>>,
        L: IntoIterator<Item = Result<MoleculeRecord, StreamError>>,
    {
        // === Phase 1: Receptor ===
        reporter.report(Progress::PhaseStart {
            name: "Preparing receptor",
        });
        let receptor = load_receptor(receptor)?;
        let session = FeaturizationSession::new(
            self.featurizer.clone(),
            self.config.featurization.vocabulary_policy,
            &receptor,
        )?;
        drop(receptor);
        let workers = Workers::new(self.config.execution.workers)?;
        reporter.report(Progress::PhaseFinish);

        // === Phase 2: Scoring ===
        reporter.report(Progress::PhaseStart {
            name: "Scoring poses",
        });
        info!(
            model = self.model.kind(),
            workers = self.config.execution.workers,
            batch_size = self.config.execution.batch_size,
            "Scoring ligand poses."
        );
        let mut report = RankingReport::default();
        let mut source = PoseSource::new(poses.into_iter());
        let mut batch_index = 0;

        loop {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let (batch, stream_error) = read_batch(&mut source, self.config.execution.batch_size);
            if batch.is_empty() && stream_error.is_none() {
                break;
            }

            if !batch.is_empty() {
                debug!(batch = batch_index, poses = batch.len(), "Scoring batch.");
                reporter.report(Progress::BatchStart {
                    batch_index,
                    poses: batch.len() as u64,
                });
                let submitted = batch.len();
                let scored = workers.map_ordered(batch, |pose| {
                    if cancel.is_cancelled() {
                        return None;
                    }
                    let result = self.score_pose(&session, pose);
                    reporter.report(Progress::PoseFinished {
                        pose_index: result.pose_index,
                        failed: !result.is_scored(),
                    });
                    Some(result)
                });
                let before = report.poses.len();
                report.poses.extend(scored.into_iter().flatten());
                if report.poses.len() - before < submitted {
                    report.cancelled = true;
                }
                reporter.report(Progress::BatchFinish);
                batch_index += 1;
            }

            if let Some(err) = stream_error {
                warn!(
                    "Reading ligand poses failed after {} poses: {}. Keeping results collected so far.",
                    source.poses_read(),
                    err
                );
                report.stream_error = Some(err);
                break;
            }
            if report.cancelled {
                break;
            }
        }
        reporter.report(Progress::PhaseFinish);

        if report.cancelled {
            warn!(
                processed = report.poses.len(),
                "Run cancelled; returning partial results."
            );
        }

        // === Phase 3: Ranking ===
        reporter.report(Progress::PhaseStart { name: "Ranking" });
        self.finalize(&mut report);
        reporter.report(Progress::PhaseFinish);

        info!(
            scored = report.ranked.len(),
            failed = report.failed.len(),
            "Ranking complete."
        );
        Ok(report)
    }

    fn score_pose(&self, session: &FeaturizationSession, pose: PendingPose) -> ScoredPose {
        let deadline = self
            .config
            .execution
            .pose_timeout
            .map(|t| Instant::now() + t);
        let FeaturizedPose {
            pose_index,
            title,
            properties,
            outcome,
        } = session.featurize_pose(pose, deadline);

        let prediction = outcome.and_then(|features| {
            let prediction = self
                .model
                .predict(&features)
                .map_err(|e| PoseFailure::Prediction(e.to_string()))?;
            if !prediction.score.is_finite() {
                return Err(PoseFailure::Prediction(format!(
                    "model returned {}",
                    prediction.score
                )));
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(PoseFailure::Timeout);
            }
            Ok(prediction)
        });

        let (score, confidence, status) = match prediction {
            Ok(p) => (Some(p.score), p.confidence, PoseStatus::Scored),
            Err(reason) => (None, None, PoseStatus::Failed(reason)),
        };
        ScoredPose {
            pose_index,
            title,
            properties,
            score,
            confidence,
            status,
        }
    }

    fn finalize(&self, report: &mut RankingReport) {
        let (ranked, failed): (Vec<usize>, Vec<usize>) =
            (0..report.poses.len()).partition(|&i| report.poses[i].is_scored());
        report.ranked = ranked;
        report.failed = failed;

        if self.config.ranking.enabled {
            let direction = self.config.ranking.direction;
            let poses = &report.poses;
            report
                .ranked
                .sort_by(|&a, &b| compare_poses(&poses[a], &poses[b], direction));
        }
    }
}

/// Upper bound on the slots reserved up front for one batch.
const MAX_BATCH_PREALLOCATION: usize = 1024;

/// Orders by score in the given direction, breaking ties by smaller pose index.
///
/// Scores compare by value, so `0.0` and `-0.0` tie. Ranked poses always carry
/// finite scores; an absent or NaN score compares equal to anything.
pub fn compare_poses(a: &ScoredPose, b: &ScoredPose, direction: RankDirection) -> Ordering {
    let by_score = match (a.score, b.score) {
        (Some(sa), Some(sb)) => match direction {
            RankDirection::Ascending => sa.partial_cmp(&sb),
            RankDirection::Descending => sb.partial_cmp(&sa),
        }
        .unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    };
    by_score.then(a.pose_index.cmp(&b.pose_index))
}

fn read_batch<I>(
    source: &mut PoseSource<I>,
    batch_size: usize,
) -> (Vec<PendingPose>, Option<StreamError>)
where
    I: Iterator<Item = Result<MoleculeRecord, StreamError>>,
{
    let mut batch = Vec::with_capacity(batch_size.min(MAX_BATCH_PREALLOCATION));
    while batch.len() < batch_size {
        match source.next() {
            Some(Ok(pose)) => batch.push(pose),
            Some(Err(e)) => return (batch, Some(e)),
            None => break,
        }
    }
    (batch, None)
}

/// The per-run worker pool.
struct Workers {
    #[cfg(feature = "parallel")]
    pool: rayon::ThreadPool,
}

impl Workers {
    #[cfg(feature = "parallel")]
    fn new(threads: usize) -> Result<Self, PipelineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("dockrank-worker-{}", i))
            .build()
            .map_err(|e| PipelineError::ThreadPool(e.to_string()))?;
        Ok(Self { pool })
    }

    #[cfg(not(feature = "parallel"))]
    fn new(_threads: usize) -> Result<Self, PipelineError> {
        Ok(Self {})
    }

    /// Maps `f` over `items`, returning results in input order.
    #[cfg(feature = "parallel")]
    fn map_ordered<T, U, F>(&self, items: Vec<T>, f: F) -> Vec<U>
    where
        T: Send,
        U: Send,
        F: Fn(T) -> U + Send + Sync,
    {
        self.pool.install(|| items.into_par_iter().map(f).collect())
    }

    #[cfg(not(feature = "parallel"))]
    fn map_ordered<T, U, F>(&self, items: Vec<T>, f: F) -> Vec<U>
    where
        F: Fn(T) -> U,
    {
        items.into_iter().map(f).collect()
    }
}
