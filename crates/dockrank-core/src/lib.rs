//! # DockRank Core Library
//!
//! Interaction-fingerprint featurization and model-based re-scoring of docked
//! ligand poses.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture so that parsing, chemistry and
//! orchestration stay independent and testable on their own.
//!
//! - **[`core`]: The Foundation.** Immutable structure records, streaming parsers
//!   for SDF, MOL2, PDB and PDBQT, the pairwise contact featurizer with its
//!   versioned `FeatureSchema`, and the closed set of trained scoring models.
//!
//! - **[`engine`]: Run-time Plumbing.** Validated configuration, the run-level and
//!   per-pose error taxonomy, progress events and cooperative cancellation.
//!
//! - **[`workflows`]: The Public API.** `PoseRankingPipeline` reads one receptor and
//!   a stream of poses, scores every pose on a bounded worker pool and returns a
//!   deterministic ranking together with the poses that could not be scored.

pub mod core;
pub mod engine;
pub mod workflows;
