use crate::core::complex::VocabularyPolicy;
use crate::core::features::{FeatureSchema, SchemaError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const POSES_PER_WORKER_IN_BATCH: usize = 32;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Which end of the score range counts as best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankDirection {
    /// Lower scores rank first (e.g. binding free energies).
    Ascending,
    /// Higher scores rank first (e.g. probabilities, pKd).
    #[default]
    Descending,
}

impl fmt::Display for RankDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RankDirection::Ascending => "ascending",
            RankDirection::Descending => "descending",
        })
    }
}

#[derive(Debug, Error)]
#[error("Unknown ranking direction '{0}'. Expected 'ascending' or 'descending'")]
pub struct ParseRankDirectionError(String);

impl FromStr for RankDirection {
    type Err = ParseRankDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ascending" | "asc" => Ok(RankDirection::Ascending),
            "descending" | "desc" => Ok(RankDirection::Descending),
            other => Err(ParseRankDirectionError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeaturizationConfig {
    pub schema: FeatureSchema,
    pub vocabulary_policy: VocabularyPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankingOptions {
    /// When false, successful poses are reported in input order.
    pub enabled: bool,
    pub direction: RankDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionConfig {
    pub workers: usize,
    /// Poses pulled from the input and held in memory at once.
    pub batch_size: usize,
    pub pose_timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankingConfig {
    pub featurization: FeaturizationConfig,
    pub ranking: RankingOptions,
    pub execution: ExecutionConfig,
}

impl RankingConfig {
    pub fn builder() -> RankingConfigBuilder {
        RankingConfigBuilder::new()
    }
}

/// Number of worker threads used when none is configured.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[derive(Default)]
pub struct RankingConfigBuilder {
    schema: Option<FeatureSchema>,
    vocabulary_policy: Option<VocabularyPolicy>,
    rank: Option<bool>,
    direction: Option<RankDirection>,
    workers: Option<usize>,
    batch_size: Option<usize>,
    pose_timeout: Option<Duration>,
}

impl RankingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema(mut self, schema: FeatureSchema) -> Self {
        self.schema = Some(schema);
        self
    }
    pub fn vocabulary_policy(mut self, policy: VocabularyPolicy) -> Self {
        self.vocabulary_policy = Some(policy);
        self
    }
    pub fn rank(mut self, enabled: bool) -> Self {
        self.rank = Some(enabled);
        self
    }
    pub fn direction(mut self, direction: RankDirection) -> Self {
        self.direction = Some(direction);
        self
    }
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }
    pub fn pose_timeout(mut self, timeout: Duration) -> Self {
        self.pose_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<RankingConfig, ConfigError> {
        let schema = self
            .schema
            .ok_or(ConfigError::MissingParameter("schema"))?
            .validated()?;

        let workers = self.workers.unwrap_or_else(default_workers);
        if workers == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "workers",
                reason: "must be at least 1".to_string(),
            });
        }
        let batch_size = self
            .batch_size
            .unwrap_or(workers * POSES_PER_WORKER_IN_BATCH);
        if batch_size == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "batch_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.pose_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::InvalidParameter {
                name: "pose_timeout",
                reason: "must be longer than zero".to_string(),
            });
        }

        Ok(RankingConfig {
            featurization: FeaturizationConfig {
                schema,
                vocabulary_policy: self.vocabulary_policy.unwrap_or_default(),
            },
            ranking: RankingOptions {
                enabled: self.rank.unwrap_or(true),
                direction: self.direction.unwrap_or_default(),
            },
            execution: ExecutionConfig {
                workers,
                batch_size,
                pose_timeout: self.pose_timeout,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::features::Normalization;

    #[test]
    fn build_applies_defaults() {
        let config = RankingConfig::builder()
            .schema(FeatureSchema::default())
            .workers(4)
            .build()
            .unwrap();
        assert_eq!(config.featurization.vocabulary_policy, VocabularyPolicy::Strict);
        assert!(config.ranking.enabled);
        assert_eq!(config.ranking.direction, RankDirection::Descending);
        assert_eq!(config.execution.workers, 4);
        assert_eq!(config.execution.batch_size, 128);
        assert_eq!(config.execution.pose_timeout, None);
    }

    #[test]
    fn build_fails_if_schema_is_missing() {
        assert_eq!(
            RankingConfigBuilder::new().build().unwrap_err(),
            ConfigError::MissingParameter("schema")
        );
    }

    #[test]
    fn build_validates_schema() {
        let schema = FeatureSchema {
            bin_edges: vec![0.0, 20.0],
            ..FeatureSchema::default()
        };
        assert!(matches!(
            RankingConfig::builder().schema(schema).build(),
            Err(ConfigError::Schema(SchemaError::EdgeBeyondCutoff { .. }))
        ));
    }

    #[test]
    fn build_rejects_zero_sizes_and_timeouts() {
        let base = || {
            RankingConfig::builder().schema(
                FeatureSchema::new(["C"], vec![0.0, 4.0], 4.0, Normalization::None).unwrap(),
            )
        };
        assert!(matches!(
            base().workers(0).build(),
            Err(ConfigError::InvalidParameter { name: "workers", .. })
        ));
        assert!(matches!(
            base().batch_size(0).build(),
            Err(ConfigError::InvalidParameter {
                name: "batch_size",
                ..
            })
        ));
        assert!(matches!(
            base().pose_timeout(Duration::ZERO).build(),
            Err(ConfigError::InvalidParameter {
                name: "pose_timeout",
                ..
            })
        ));
    }

    #[test]
    fn rank_direction_parses_and_displays() {
        assert_eq!("ASC".parse::<RankDirection>().unwrap(), RankDirection::Ascending);
        assert_eq!(
            "descending".parse::<RankDirection>().unwrap(),
            RankDirection::Descending
        );
        assert!("sideways".parse::<RankDirection>().is_err());
        assert_eq!(RankDirection::Ascending.to_string(), "ascending");
    }
}
