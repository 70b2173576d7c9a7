use crate::error::ScanError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag threaded by value through every stage.
///
/// Stages check it before each capture attempt and at suspension points
/// (provider calls, preview reads). Cancellation aborts the current work
/// without corrupting results already produced.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Err(`ScanError::Cancelled`) once [`cancel`](Self::cancel) was called.
    pub fn ensure_active(&self) -> Result<(), ScanError> {
        if self.is_cancelled() {
            Err(ScanError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_starts_active_and_sticks_once_cancelled() {
        let token = CancelToken::new();
        assert!(token.ensure_active().is_ok());

        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(
            token.ensure_active(),
            Err(ScanError::Cancelled)
        ));
    }
}
