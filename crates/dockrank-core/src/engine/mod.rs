//! # Engine Module
//!
//! Run-time plumbing shared by the ranking workflows: validated configuration,
//! the run-level and per-pose error taxonomy, progress events and cooperative
//! cancellation.
//!
//! Nothing here touches molecular data directly; the [`crate::core`] layer does
//! the chemistry and the [`crate::workflows`] layer wires both together.
//!
//! - **Configuration** ([`config`]) - `RankingConfig` and its builder
//! - **Error Handling** ([`error`]) - `PipelineError` for fatal conditions, `PoseFailure` for per-pose reasons
//! - **Progress Monitoring** ([`progress`]) - callback-based progress events
//! - **Cancellation** ([`cancel`]) - a shared stop flag checked between poses

pub mod cancel;
pub mod config;
pub mod error;
pub mod progress;
