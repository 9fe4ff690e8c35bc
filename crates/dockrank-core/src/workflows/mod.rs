//! # Workflows Module
//!
//! Top-level entry points that tie the [`crate::core`] and [`crate::engine`]
//! layers together.
//!
//! - **Featurization** ([`featurize`]) - receptor loading and per-pose fingerprinting,
//!   usable on its own to export feature matrices for model training
//! - **Ranking** ([`rank`]) - the full pose stream scoring and ranking pipeline

pub mod featurize;
pub mod rank;

pub use featurize::{FeaturizationSession, FeaturizedPose, PendingPose, PoseSource, load_receptor};
pub use rank::{PoseRankingPipeline, PoseStatus, RankingReport, ScoredPose};
