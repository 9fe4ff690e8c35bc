mod defaults;

pub use defaults::DefaultsConfig;

use crate::cli::{FeaturizeArgs, InputArgs, ScoreArgs};
use crate::error::{CliError, Result};
use dockrank::core::complex::VocabularyPolicy;
use dockrank::core::features::{FeatureSchema, Normalization};
use dockrank::engine::config::{self as core_config, RankDirection};
use serde::Deserialize;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialFeaturizationConfig {
    vocabulary: Option<Vec<String>>,
    bin_edges: Option<Vec<f64>>,
    cutoff: Option<f64>,
    normalization: Option<Normalization>,
    ignore_hydrogens: Option<bool>,
    vocabulary_policy: Option<VocabularyPolicy>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialRankingSection {
    enabled: Option<bool>,
    direction: Option<RankDirection>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialExecutionConfig {
    workers: Option<usize>,
    batch_size: Option<usize>,
    pose_timeout_secs: Option<f64>,
}

/// Configuration as read from a TOML file; every key is optional.
///
/// ```toml
/// [featurization]
/// cutoff = 8.0
/// bin-edges = [0.0, 2.0, 4.0, 8.0]
/// vocabulary-policy = "exclude"
///
/// [ranking]
/// direction = "ascending"
///
/// [execution]
/// workers = 8
/// pose-timeout-secs = 2.5
/// ```
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialRankingConfig {
    featurization: Option<PartialFeaturizationConfig>,
    ranking: Option<PartialRankingSection>,
    execution: Option<PartialExecutionConfig>,
}

impl PartialRankingConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Produces the scoring configuration. The model's schema is the starting
    /// point; keys of the `[featurization]` section override it.
    pub fn merge_with_cli(
        mut self,
        args: &ScoreArgs,
        threads: Option<usize>,
        model_schema: &FeatureSchema,
    ) -> Result<core_config::RankingConfig> {
        let defaults = DefaultsConfig::default();
        self.apply_set_values(&args.input.set_values)?;

        let featurization = self.resolve_featurization(&args.input, model_schema.clone())?;
        let ranking = self.ranking.take().unwrap_or_default();
        let execution = self.execution.take().unwrap_or_default();

        let mut builder = core_config::RankingConfigBuilder::new()
            .schema(featurization.schema)
            .vocabulary_policy(featurization.vocabulary_policy)
            .rank(!args.no_rank && ranking.enabled.unwrap_or(defaults.rank))
            .direction(
                args.direction
                    .or(ranking.direction)
                    .unwrap_or(defaults.direction),
            );

        if let Some(workers) = threads.or(execution.workers) {
            builder = builder.workers(workers);
        }
        if let Some(size) = args.batch_size.or(execution.batch_size) {
            builder = builder.batch_size(size);
        }
        if let Some(secs) = args.timeout.or(execution.pose_timeout_secs) {
            let timeout = Duration::try_from_secs_f64(secs).map_err(|_| {
                CliError::Config(format!(
                    "Per-pose timeout must be a non-negative number of seconds, got {}",
                    secs
                ))
            })?;
            builder = builder.pose_timeout(timeout);
        }

        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }

    /// Produces the featurization configuration, starting from `base_schema`.
    pub fn merge_for_featurize(
        mut self,
        args: &FeaturizeArgs,
        base_schema: FeatureSchema,
    ) -> Result<core_config::FeaturizationConfig> {
        self.apply_set_values(&args.input.set_values)?;
        if self.ranking.is_some() || self.execution.is_some() {
            debug!("Ignoring [ranking] and [execution] sections for featurization.");
        }
        self.resolve_featurization(&args.input, base_schema)
    }

    fn resolve_featurization(
        &mut self,
        input: &InputArgs,
        mut schema: FeatureSchema,
    ) -> Result<core_config::FeaturizationConfig> {
        let defaults = DefaultsConfig::default();
        let file = self.featurization.take().unwrap_or_default();

        if let Some(vocabulary) = file.vocabulary {
            schema.vocabulary = vocabulary;
        }
        if let Some(edges) = file.bin_edges {
            schema.bin_edges = edges;
        }
        if let Some(cutoff) = file.cutoff {
            schema.cutoff = cutoff;
        }
        if let Some(normalization) = file.normalization {
            schema.normalization = normalization;
        }
        if let Some(ignore) = file.ignore_hydrogens {
            schema.ignore_hydrogens = ignore;
        }

        let schema = schema
            .validated()
            .map_err(|e| CliError::Config(format!("Invalid feature schema: {}", e)))?;

        Ok(core_config::FeaturizationConfig {
            schema,
            vocabulary_policy: input
                .vocabulary_policy
                .or(file.vocabulary_policy)
                .unwrap_or(defaults.vocabulary_policy),
        })
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };
            let key = key.trim();
            let value_str = value_str.trim();

            match key {
                "featurization.vocabulary" => {
                    self.featurization().vocabulary = Some(
                        value_str
                            .split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect(),
                    );
                }
                "featurization.bin-edges" => {
                    self.featurization().bin_edges = Some(
                        value_str
                            .split(',')
                            .map(|s| parse_value(key, s))
                            .collect::<Result<_>>()?,
                    );
                }
                "featurization.cutoff" => {
                    self.featurization().cutoff = Some(parse_value(key, value_str)?);
                }
                "featurization.normalization" => {
                    self.featurization().normalization = Some(parse_value(key, value_str)?);
                }
                "featurization.ignore-hydrogens" => {
                    self.featurization().ignore_hydrogens = Some(parse_value(key, value_str)?);
                }
                "featurization.vocabulary-policy" => {
                    self.featurization().vocabulary_policy = Some(parse_value(key, value_str)?);
                }
                "ranking.enabled" => {
                    self.ranking.get_or_insert_with(Default::default).enabled =
                        Some(parse_value(key, value_str)?);
                }
                "ranking.direction" => {
                    self.ranking.get_or_insert_with(Default::default).direction =
                        Some(parse_value(key, value_str)?);
                }
                "execution.workers" => {
                    self.execution.get_or_insert_with(Default::default).workers =
                        Some(parse_value(key, value_str)?);
                }
                "execution.batch-size" => {
                    self.execution.get_or_insert_with(Default::default).batch_size =
                        Some(parse_value(key, value_str)?);
                }
                "execution.pose-timeout-secs" => {
                    self.execution
                        .get_or_insert_with(Default::default)
                        .pose_timeout_secs = Some(parse_value(key, value_str)?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }

    fn featurization(&mut self) -> &mut PartialFeaturizationConfig {
        self.featurization.get_or_insert_with(Default::default)
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| CliError::Config(format!("Invalid value for {}: '{}' ({})", key, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_config_file(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("dockrank.toml");
        fs::write(&path, content).unwrap();
        path
    }

    fn score_args(extra: &[&str]) -> (ScoreArgs, Option<usize>) {
        let mut args = vec![
            "dockrank", "score", "-r", "rec.pdb", "-p", "poses.sdf", "-m", "model.json",
        ];
        args.extend_from_slice(extra);
        let cli = Cli::parse_from(args);
        match cli.command {
            Commands::Score(score) => (score, cli.threads),
            _ => panic!("Expected 'score' subcommand"),
        }
    }

    fn model_schema() -> FeatureSchema {
        FeatureSchema::new(["C", "N", "O"], vec![0.0, 4.0, 8.0], 8.0, Normalization::None).unwrap()
    }

    #[test]
    fn defaults_follow_the_model_schema() {
        let (args, threads) = score_args(&[]);
        let config = PartialRankingConfig::default()
            .merge_with_cli(&args, threads, &model_schema())
            .unwrap();
        assert_eq!(config.featurization.schema, model_schema());
        assert_eq!(config.featurization.vocabulary_policy, VocabularyPolicy::Strict);
        assert!(config.ranking.enabled);
        assert_eq!(config.ranking.direction, RankDirection::Descending);
        assert_eq!(config.execution.pose_timeout, None);
    }

    #[test]
    fn file_values_are_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config_file(
            &dir,
            r#"
            [featurization]
            normalization = "by-ligand-heavy-atoms"
            vocabulary-policy = "exclude"

            [ranking]
            direction = "ascending"

            [execution]
            workers = 3
            batch-size = 10
            pose-timeout-secs = 1.5
            "#,
        );
        let (args, threads) = score_args(&[]);
        let config = PartialRankingConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&args, threads, &model_schema())
            .unwrap();
        assert_eq!(
            config.featurization.schema.normalization,
            Normalization::ByLigandHeavyAtoms
        );
        assert_eq!(config.featurization.vocabulary_policy, VocabularyPolicy::Exclude);
        assert_eq!(config.ranking.direction, RankDirection::Ascending);
        assert_eq!(config.execution.workers, 3);
        assert_eq!(config.execution.batch_size, 10);
        assert_eq!(
            config.execution.pose_timeout,
            Some(Duration::from_millis(1500))
        );
    }

    #[test]
    fn cli_args_override_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config_file(
            &dir,
            r#"
            [ranking]
            direction = "ascending"

            [execution]
            workers = 3
            "#,
        );
        let (args, threads) = score_args(&[
            "-j",
            "5",
            "--direction",
            "descending",
            "--no-rank",
            "--timeout",
            "0.25",
        ]);
        let config = PartialRankingConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&args, threads, &model_schema())
            .unwrap();
        assert_eq!(config.execution.workers, 5);
        assert_eq!(config.ranking.direction, RankDirection::Descending);
        assert!(!config.ranking.enabled);
        assert_eq!(
            config.execution.pose_timeout,
            Some(Duration::from_millis(250))
        );
    }

    #[test]
    fn set_values_override_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config_file(
            &dir,
            r#"
            [execution]
            batch-size = 10
            "#,
        );
        let (args, threads) = score_args(&[
            "-S",
            "execution.batch-size=99",
            "-S",
            "featurization.bin-edges=0, 2, 4, 8",
            "-S",
            "ranking.enabled=false",
        ]);
        let config = PartialRankingConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&args, threads, &model_schema())
            .unwrap();
        assert_eq!(config.execution.batch_size, 99);
        assert_eq!(config.featurization.schema.bin_edges, vec![0.0, 2.0, 4.0, 8.0]);
        assert!(!config.ranking.enabled);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config_file(&dir, "[ranking]\norder = \"up\"\n");
        assert!(matches!(
            PartialRankingConfig::from_file(&path),
            Err(CliError::FileParsing { .. })
        ));

        let (args, threads) = score_args(&["-S", "ranking.order=up"]);
        let result =
            PartialRankingConfig::default().merge_with_cli(&args, threads, &model_schema());
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn invalid_values_are_configuration_errors() {
        let (args, threads) = score_args(&["-S", "execution.workers=0"]);
        let result =
            PartialRankingConfig::default().merge_with_cli(&args, threads, &model_schema());
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("workers")));

        let (args, threads) = score_args(&["-S", "featurization.cutoff=4.0"]);
        let result =
            PartialRankingConfig::default().merge_with_cli(&args, threads, &model_schema());
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("schema")));

        let (args, threads) = score_args(&["--timeout=-1"]);
        let result =
            PartialRankingConfig::default().merge_with_cli(&args, threads, &model_schema());
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn featurize_uses_default_schema_when_no_model() {
        let cli = Cli::parse_from([
            "dockrank",
            "featurize",
            "-r",
            "rec.pdb",
            "-p",
            "poses.sdf",
            "--vocabulary-policy",
            "exclude",
        ]);
        let Commands::Featurize(args) = cli.command else {
            panic!("Expected 'featurize' subcommand");
        };
        let config = PartialRankingConfig::default()
            .merge_for_featurize(&args, FeatureSchema::default())
            .unwrap();
        assert_eq!(config.schema, FeatureSchema::default());
        assert_eq!(config.vocabulary_policy, VocabularyPolicy::Exclude);
    }
}
