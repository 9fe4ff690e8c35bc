use dockrank::engine::progress::{Progress, ProgressCallback};
use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;

struct BarState {
    pb: ProgressBar,
    failed: u64,
}

#[derive(Clone)]
pub struct CliProgressHandler {
    state: Arc<Mutex<BarState>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let pb = ProgressBar::new(0)
            .with_style(Self::spinner_style())
            .with_message("Initializing...");
        pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        pb.disable_steady_tick();
        pb.finish_and_clear();

        Self {
            state: Arc::new(Mutex::new(BarState { pb, failed: 0 })),
        }
    }

    /// A handler that never draws, for `--quiet` runs.
    pub fn hidden() -> Self {
        let handler = Self::new();
        if let Ok(state) = handler.state.lock() {
            state.pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());
        }
        handler
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let state = self.state.clone();

        Box::new(move |progress: Progress| {
            let Ok(mut guard) = state.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::PhaseStart { name } => {
                    guard.pb.reset();
                    guard.pb.set_length(0);
                    guard.pb.set_style(Self::spinner_style());
                    guard
                        .pb
                        .enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                    guard.pb.set_message(name.to_string());
                }
                Progress::PhaseFinish => {
                    guard.pb.disable_steady_tick();
                    guard.pb.finish_with_message("✓ Done");
                }
                Progress::BatchStart { batch_index, poses } => {
                    if batch_index == 0 {
                        guard.failed = 0;
                        guard.pb.disable_steady_tick();
                        guard.pb.reset();
                        guard.pb.set_length(0);
                        guard.pb.set_style(Self::bar_style());
                        guard.pb.set_message("Scoring poses");
                    }
                    guard.pb.inc_length(poses);
                }
                Progress::PoseFinished { failed, .. } => {
                    if failed {
                        guard.failed += 1;
                        let message = format!("Scoring ({} failed)", guard.failed);
                        guard.pb.set_message(message);
                    }
                    guard.pb.inc(1);
                }
                Progress::BatchFinish => {
                    guard.pb.tick();
                }
                Progress::Message(msg) => {
                    if !guard.pb.is_finished() {
                        guard.pb.println(format!("  {}", msg));
                    } else {
                        guard.pb.set_message(msg);
                    }
                }
            }
        })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .expect("Failed to create spinner style template")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{msg:<24} [{bar:40.cyan/blue}] {pos}/{len} ({rate})")
            .expect("Failed to create bar style template")
            .with_key(
                "rate",
                |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                    let _ = write!(w, "{:.0} poses/s", state.per_sec());
                },
            )
            .progress_chars("##-")
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}
