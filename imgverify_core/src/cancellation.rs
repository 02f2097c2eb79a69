//! Async cancellation tokens with a parent-child hierarchy.
//!
//! The caller of [`verify_image`](crate::ImageVerifier::verify_image) hands in a
//! [`CancellationToken`] it controls through a [`CancellationTokenSource`].
//! Each verification derives a [`ChildToken`] from it: cancelling the caller's
//! source cancels the child, while the orchestrator cancels the child alone to
//! stop sibling verifiers after the first terminal outcome.
//!
//! # Example
//!
//! ```
//! use imgverify_core::CancellationTokenSource;
//!
//! let source = CancellationTokenSource::new();
//! let child = source.token().child_token();
//!
//! child.cancel();
//! assert!(child.is_cancelled());
//! assert!(!source.token().is_cancelled());
//!
//! let other = source.token().child_token();
//! source.cancel();
//! assert!(other.is_cancelled());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct TokenState {
    cancelled: AtomicBool,
    notify: Notify,
}

impl TokenState {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a concurrent cancel() is not missed.
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Thread-safe, read-only view of a cancellation state.
///
/// Tokens are cheap to clone; every clone observes the same state. Only the
/// owning [`CancellationTokenSource`] can cancel it.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    state: Arc<TokenState>,
}

impl CancellationToken {
    /// Creates a token that is never cancelled unless through a source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the token has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }

    /// Completes once the token is cancelled.
    ///
    /// Waiting is notification based; any number of tasks may wait at once.
    pub async fn cancelled(&self) {
        self.state.wait().await
    }

    /// Derives a child token that follows this token's cancellation.
    pub fn child_token(&self) -> ChildToken {
        ChildToken {
            parent: self.clone(),
            local: Arc::new(TokenState::default()),
        }
    }
}

/// Owner of a [`CancellationToken`].
#[derive(Clone, Debug, Default)]
pub struct CancellationTokenSource {
    token: CancellationToken,
}

impl CancellationTokenSource {
    /// Creates a source with a fresh token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle to the owned token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Cancels the token and every child derived from it. Idempotent.
    pub fn cancel(&self) {
        self.token.state.cancel();
    }
}

/// Cancellation token that is cancelled locally or through its parent.
///
/// Local cancellation never propagates upwards.
#[derive(Clone, Debug)]
pub struct ChildToken {
    parent: CancellationToken,
    local: Arc<TokenState>,
}

impl ChildToken {
    /// Returns true if either the parent or this child is cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.parent.is_cancelled() || self.local.is_cancelled()
    }

    /// Cancels this child only.
    pub fn cancel(&self) {
        self.local.cancel();
    }

    /// Completes once either the parent or this child is cancelled.
    pub async fn cancelled(&self) {
        tokio::select! {
            _ = self.parent.cancelled() => {}
            _ = self.local.wait() => {}
        }
    }
}
