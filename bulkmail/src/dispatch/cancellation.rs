//! Shutdown signalling for the dispatch loop

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

/// How a cancellable wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// The full duration passed
    Elapsed,
    /// Shutdown was requested first
    Cancelled,
}

/// A cancellation token shared between the dispatch loop and signal handlers
///
/// Cancelling never interrupts a batch in progress; the loop observes the
/// token at its waits and between states.
///
/// # Examples
///
/// ```rust
/// use bulkmail::dispatch::{CancellationToken, Wait};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let token = CancellationToken::new();
///     token.cancel();
///
///     let wait = token.sleep(Duration::from_secs(3600)).await;
///     assert_eq!(wait, Wait::Cancelled);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    state: Arc<CancellationState>,
}

#[derive(Debug)]
struct CancellationState {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl CancellationToken {
    /// Create a new cancellation token.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            state: Arc::new(CancellationState { tx, rx }),
        }
    }

    /// Check if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.state.rx.borrow()
    }

    /// Request cancellation.
    ///
    /// Every clone of this token observes the request.
    pub fn cancel(&self) {
        let _ = self.state.tx.send(true);
        debug!("shutdown requested");
    }

    /// Wait for cancellation signal.
    ///
    /// Returns immediately if already cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.state.rx.clone();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }

    /// Sleep for `duration` unless cancelled first
    pub async fn sleep(&self, duration: Duration) -> Wait {
        if self.is_cancelled() {
            return Wait::Cancelled;
        }
        tokio::select! {
            () = tokio::time::sleep(duration) => Wait::Elapsed,
            () = self.cancelled() => Wait::Cancelled,
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_starts_uncancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_cancel_reaches_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_elapses() {
        let token = CancellationToken::new();
        let start = tokio::time::Instant::now();

        assert_eq!(token.sleep(Duration::from_secs(10)).await, Wait::Elapsed);
        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_sleep() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            canceller.cancel();
        });

        let start = tokio::time::Instant::now();
        assert_eq!(token.sleep(Duration::from_secs(86400)).await, Wait::Cancelled);
        assert!(start.elapsed() < Duration::from_secs(60));
    }
}
