//! Cancellation context threaded through every check
//!
//! A `CheckContext` couples a cancellation token with an optional deadline.
//! Blocking waits in the dispatcher and the probe race against [`CheckContext::done`],
//! so firing the token or passing the deadline interrupts all of them at once.

use crate::LinkCheckError;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct CheckContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CheckContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A timeout too large to represent as an instant means no deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Derives a context that is cancelled together with `self` and expires no later
    /// than `timeout` from now.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let deadline = match (self.deadline, Instant::now().checked_add(timeout)) {
            (Some(parent), Some(own)) => Some(parent.min(own)),
            (parent, own) => parent.or(own),
        };

        Self {
            token: self.token.child_token(),
            deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the reason this context is done, or `None` while it is still live.
    pub fn err(&self) -> Option<LinkCheckError> {
        if self.token.is_cancelled() {
            return Some(LinkCheckError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(LinkCheckError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the token fires or the deadline passes.
    pub async fn done(&self) -> LinkCheckError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => LinkCheckError::Cancelled,
                    _ = sleep_until(deadline) => LinkCheckError::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                LinkCheckError::Cancelled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_context_is_live() {
        let ctx = CheckContext::new();
        assert!(ctx.err().is_none());
        assert!(ctx.deadline().is_none());
    }

    #[test]
    fn test_cancel_is_observed_by_clones() {
        let ctx = CheckContext::new();
        let clone = ctx.clone();
        ctx.cancel();
        assert_eq!(clone.err(), Some(LinkCheckError::Cancelled));
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let ctx = CheckContext::with_timeout(Duration::from_millis(5));
        assert_eq!(ctx.done().await, LinkCheckError::DeadlineExceeded);
        assert_eq!(ctx.err(), Some(LinkCheckError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_done_resolves_on_cancel() {
        let ctx = CheckContext::with_timeout(Duration::from_secs(60));
        let waiter = ctx.clone();
        let handle = tokio::spawn(async move { waiter.done().await });

        ctx.cancel();
        assert_eq!(handle.await.unwrap(), LinkCheckError::Cancelled);
    }

    #[test]
    fn test_child_inherits_cancellation_and_earlier_deadline() {
        let parent = CheckContext::with_timeout(Duration::from_millis(10));
        let child = parent.child_with_timeout(Duration::from_secs(60));
        assert_eq!(child.deadline(), parent.deadline());

        parent.cancel();
        assert_eq!(child.err(), Some(LinkCheckError::Cancelled));
    }

    #[test]
    fn test_child_cancel_does_not_reach_parent() {
        let parent = CheckContext::new();
        let child = parent.child_with_timeout(Duration::from_secs(1));
        child.cancel();
        assert!(parent.err().is_none());
    }

    #[test]
    fn test_unrepresentable_timeout_means_no_deadline() {
        let huge = Duration::from_secs(u64::MAX);

        let ctx = CheckContext::with_timeout(huge);
        assert!(ctx.deadline().is_none());
        assert!(ctx.err().is_none());

        let child = ctx.child_with_timeout(huge);
        assert!(child.deadline().is_none());

        let bounded = CheckContext::with_timeout(Duration::from_secs(60));
        let child = bounded.child_with_timeout(huge);
        assert_eq!(child.deadline(), bounded.deadline());
        assert!(child.err().is_none());
    }
}
