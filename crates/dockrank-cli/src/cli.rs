use clap::{Args, Parser, Subcommand};
use dockrank::core::complex::VocabularyPolicy;
use dockrank::core::io::StructureFormat;
use dockrank::engine::config::RankDirection;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "DockRank Developers",
    version,
    about = "DockRank CLI - re-score and rank docked ligand poses with a trained interaction-fingerprint model.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Number of worker threads used to score poses.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score every ligand pose with a trained model and write the ranking as CSV.
    Score(ScoreArgs),
    /// Compute interaction fingerprints for every ligand pose and write them as CSV.
    Featurize(FeaturizeArgs),
}

/// Receptor and pose inputs shared by all subcommands.
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Receptor structure file (sdf, mol2, pdb or pdbqt). The first structure is used.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub receptor: PathBuf,

    /// File holding the ligand poses, one structure per pose.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub poses: PathBuf,

    /// Format of the receptor file; inferred from its extension when omitted.
    #[arg(long, value_name = "FORMAT")]
    pub receptor_format: Option<StructureFormat>,

    /// Format of the pose file; inferred from its extension when omitted.
    #[arg(long, value_name = "FORMAT")]
    pub pose_format: Option<StructureFormat>,

    /// Configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// How atom types outside the vocabulary are handled: 'strict' fails the pose,
    /// 'exclude' drops the atoms from counting.
    #[arg(long, value_name = "POLICY")]
    pub vocabulary_policy: Option<VocabularyPolicy>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S ranking.direction=ascending
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `score` subcommand.
#[derive(Args, Debug)]
pub struct ScoreArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Trained model artifact (.json or .toml).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub model: PathBuf,

    /// Output CSV file; written to stdout when omitted.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Which end of the score range ranks first: 'ascending' or 'descending'.
    #[arg(long, value_name = "DIRECTION")]
    pub direction: Option<RankDirection>,

    /// Report poses in input order instead of ranking them.
    #[arg(long)]
    pub no_rank: bool,

    /// Per-pose time limit in seconds.
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<f64>,

    /// Number of poses held in memory at once.
    #[arg(long, value_name = "INT")]
    pub batch_size: Option<usize>,

    /// Only write the N best poses; failed poses are always written.
    #[arg(long, value_name = "N")]
    pub top: Option<usize>,

    /// Captured Vina stdout for the pose file (docking mode table or --score_only
    /// terms). Its values are added as vina_* columns where poses lack them.
    #[arg(long, value_name = "PATH")]
    pub vina_log: Option<PathBuf>,
}

/// Arguments for the `featurize` subcommand.
#[derive(Args, Debug)]
pub struct FeaturizeArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Take the feature schema from a model artifact instead of the defaults.
    #[arg(short, long, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Output CSV file; written to stdout when omitted.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Only write columns of fields that are nonzero for at least one pose.
    /// Requires buffering all poses in memory.
    #[arg(long)]
    pub sparse: bool,
}
