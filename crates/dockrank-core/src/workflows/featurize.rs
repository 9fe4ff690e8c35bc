use crate::core::complex::{ComplexAssembler, VocabularyPolicy};
use crate::core::features::{FeatureSchema, FeatureVector, PairwiseContactFeaturizer, PreparedReceptor};
use crate::core::io::RecordError;
use crate::core::io::stream::StreamError;
use crate::core::models::record::MoleculeRecord;
use crate::engine::config::FeaturizationConfig;
use crate::engine::error::{PipelineError, PoseFailure};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// One item of the ligand pose stream, numbered by its position in the input.
#[derive(Debug)]
pub struct PendingPose {
    pub pose_index: usize,
    pub record: Result<MoleculeRecord, RecordError>,
}

/// Numbers stream items as poses and separates fatal stream errors.
///
/// Every yielded record, parsed or not, consumes one pose index.
pub struct PoseSource<I> {
    inner: I,
    next_index: usize,
}

impl<I> PoseSource<I>
where
    I: Iterator<Item = Result<MoleculeRecord, StreamError>>,
{
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            next_index: 0,
        }
    }

    pub fn poses_read(&self) -> usize {
        self.next_index
    }
}

impl<I> Iterator for PoseSource<I>
where
    I: Iterator<Item = Result<MoleculeRecord, StreamError>>,
{
    type Item = Result<PendingPose, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.inner.next()? {
            Ok(record) => Ok(record),
            Err(StreamError::Record(err)) => Err(err),
            Err(fatal) => return Some(Err(fatal)),
        };
        let pose_index = self.next_index;
        self.next_index += 1;
        Some(Ok(PendingPose { pose_index, record }))
    }
}

/// Reads the receptor: the first record of its source.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidReceptor`] for an empty source, an unreadable
/// first record or an I/O failure.
#[instrument(skip_all, name = "load_receptor")]
pub fn load_receptor<I>(source: I) -> Result<MoleculeRecord, PipelineError>
where
    I: IntoIterator<Item = Result<MoleculeRecord, StreamError>>,
{
    let mut source = source.into_iter();
    let receptor = match source.next() {
        Some(Ok(record)) => record,
        Some(Err(e)) => return Err(PipelineError::InvalidReceptor(e.to_string())),
        None => {
            return Err(PipelineError::InvalidReceptor(
                "receptor input contains no structure".to_string(),
            ));
        }
    };
    if source.next().is_some() {
        warn!(
            "Receptor input holds more than one structure; only the first ('{}') is used.",
            receptor.title()
        );
    }
    Ok(receptor)
}

/// A pose after featurization, keeping the identity needed for reporting.
#[derive(Debug, Clone)]
pub struct FeaturizedPose {
    pub pose_index: usize,
    pub title: String,
    pub properties: BTreeMap<String, String>,
    pub outcome: Result<FeatureVector, PoseFailure>,
}

/// Receptor-bound featurization state for one run.
///
/// The prepared receptor is built once in [`FeaturizationSession::new`] and shared
/// read-only by every pose; dropping the session releases it.
#[derive(Debug)]
pub struct FeaturizationSession {
    featurizer: PairwiseContactFeaturizer,
    assembler: ComplexAssembler,
}

impl FeaturizationSession {
    #[instrument(skip_all, name = "prepare_receptor", fields(receptor = receptor.title()))]
    pub fn new(
        featurizer: PairwiseContactFeaturizer,
        policy: VocabularyPolicy,
        receptor: &MoleculeRecord,
    ) -> Result<Self, PipelineError> {
        let prepared = featurizer.prepare_receptor(receptor);
        if prepared.indexed_atoms() == 0 {
            return Err(PipelineError::InvalidReceptor(format!(
                "'{}' has no atoms covered by the vocabulary ({} atoms read)",
                prepared.title(),
                prepared.total_atoms()
            )));
        }
        if !prepared.unsupported_types().is_empty() {
            let types: Vec<&str> = prepared.unsupported_types().iter().copied().collect();
            match policy {
                VocabularyPolicy::Strict => warn!(
                    "Receptor contains atom types outside the vocabulary ({}); every pose will fail under the strict policy.",
                    types.join(", ")
                ),
                VocabularyPolicy::Exclude => warn!(
                    "Receptor atoms of type(s) {} are excluded from contact counting.",
                    types.join(", ")
                ),
            }
        }
        info!(
            indexed = prepared.indexed_atoms(),
            total = prepared.total_atoms(),
            "Receptor prepared."
        );

        Ok(Self {
            assembler: ComplexAssembler::new(Arc::new(prepared), policy),
            featurizer,
        })
    }

    pub fn from_config(
        config: &FeaturizationConfig,
        receptor: &MoleculeRecord,
    ) -> Result<Self, PipelineError> {
        let featurizer = PairwiseContactFeaturizer::new(config.schema.clone())?;
        Self::new(featurizer, config.vocabulary_policy, receptor)
    }

    pub fn schema(&self) -> &Arc<FeatureSchema> {
        self.featurizer.schema()
    }

    pub fn receptor(&self) -> &Arc<PreparedReceptor> {
        self.assembler.receptor()
    }

    /// Assembles and featurizes one pose, capturing any failure in the outcome.
    pub fn featurize_pose(&self, pose: PendingPose, deadline: Option<Instant>) -> FeaturizedPose {
        let PendingPose { pose_index, record } = pose;
        let ligand = match record {
            Ok(ligand) => ligand,
            Err(err) => {
                return FeaturizedPose {
                    pose_index,
                    title: String::new(),
                    properties: BTreeMap::new(),
                    outcome: Err(PoseFailure::Parse {
                        kind: err.kind(),
                        message: format!("line {}: {}", err.failure.line, err.failure.message),
                    }),
                };
            }
        };
        let title = ligand.title().to_string();
        let properties = ligand.properties().clone();

        let outcome = if deadline.is_some_and(|d| Instant::now() >= d) {
            Err(PoseFailure::Timeout)
        } else {
            self.assembler
                .assemble(ligand, pose_index)
                .map_err(PoseFailure::from)
                .and_then(|complex| {
                    self.featurizer
                        .featurize_until(&complex, deadline)
                        .map_err(PoseFailure::from)
                })
        };

        FeaturizedPose {
            pose_index,
            title,
            properties,
            outcome,
        }
    }

    /// Lazily featurizes a pose stream in input order without a time limit.
    ///
    /// A fatal stream error is yielded as `Err` and ends the sequence.
    pub fn featurize_all<'s, I>(
        &'s self,
        poses: I,
    ) -> impl Iterator<Item = Result<FeaturizedPose, StreamError>> + 's
    where
        I: IntoIterator<Item = Result<MoleculeRecord, StreamError>>,
        I::IntoIter: 's,
    {
        let mut failed = false;
        PoseSource::new(poses.into_iter()).map_while(move |item| {
            if failed {
                return None;
            }
            Some(match item {
                Ok(pose) => Ok(self.featurize_pose(pose, None)),
                Err(e) => {
                    failed = true;
                    Err(e)
                }
            })
        })
    }
}
