use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A shared flag asking a running pipeline to stop starting new poses.
///
/// Clones observe the same flag; cancelling is permanent for the token.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
