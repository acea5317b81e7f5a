//! Caller-controlled cancellation and deadlines.
//!
//! Every network operation takes a [`CallContext`]. A context concludes when
//! its cancellation token fires or its deadline passes; from then on
//! [`CallContext::err`] reports why, and in-flight calls bounded by the
//! context stop waiting and return that error.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{GraphError, Result};

/// Cancellation token and/or deadline bounding one or more calls.
///
/// `CallContext::background()` never concludes.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: Option<CancellationToken>,
    deadline: Option<Instant>,
}

impl CallContext {
    /// Context with neither a cancellation token nor a deadline.
    pub fn background() -> Self {
        CallContext::default()
    }

    /// Context that concludes when `token` is cancelled.
    pub fn with_cancellation(token: CancellationToken) -> Self {
        CallContext {
            cancel: Some(token),
            deadline: None,
        }
    }

    /// Adds a deadline `timeout` from now. An earlier existing deadline wins.
    /// A timeout too large to represent as an instant adds no deadline.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// Adds an absolute deadline. An earlier existing deadline wins.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// The effective deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Why the context concluded, or `None` while it is still live.
    /// Cancellation takes precedence over an expired deadline.
    pub fn err(&self) -> Option<GraphError> {
        if self.cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
            return Some(GraphError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Some(GraphError::DeadlineExceeded);
        }
        None
    }

    /// Resolves once the context concludes. Pending forever for a background
    /// context.
    pub async fn done(&self) {
        match (&self.cancel, self.deadline) {
            (Some(token), Some(deadline)) => {
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            (Some(token), None) => token.cancelled().await,
            (None, Some(deadline)) => tokio::time::sleep_until(deadline).await,
            (None, None) => std::future::pending::<()>().await,
        }
    }

    /// Runs `fut` unless the context concludes first.
    pub(crate) async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }
        tokio::select! {
            biased;
            _ = self.done() => Err(self.err().unwrap_or(GraphError::Cancelled)),
            out = fut => out,
        }
    }

    /// Maps a transport failure, preferring the context's own error when the
    /// context has already concluded.
    pub(crate) fn resolve_transport_error(&self, err: reqwest::Error) -> GraphError {
        self.err().unwrap_or(GraphError::Network(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_context_is_live() {
        assert!(CallContext::background().err().is_none());
    }

    #[test]
    fn cancelled_token_reports_cancelled() {
        let token = CancellationToken::new();
        let ctx = CallContext::with_cancellation(token.clone());
        assert!(ctx.err().is_none());
        token.cancel();
        assert!(matches!(ctx.err(), Some(GraphError::Cancelled)));
    }

    #[tokio::test]
    async fn past_deadline_reports_deadline_exceeded() {
        let ctx = CallContext::background().with_deadline(Instant::now() - Duration::from_millis(1));
        assert!(matches!(ctx.err(), Some(GraphError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn earlier_deadline_wins() {
        let now = Instant::now();
        let ctx = CallContext::background()
            .with_deadline(now + Duration::from_secs(5))
            .with_deadline(now + Duration::from_secs(60));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn with_timeout_saturates_on_overflow() {
        let ctx = CallContext::background().with_timeout(Duration::MAX);
        assert!(ctx.deadline().is_none());
        assert!(ctx.err().is_none());

        let bounded = CallContext::background()
            .with_timeout(Duration::from_secs(5))
            .with_timeout(Duration::MAX);
        assert!(bounded.deadline().is_some(), "existing deadline must be kept");
    }

    #[tokio::test]
    async fn cancellation_takes_precedence_over_deadline() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = CallContext::with_cancellation(token)
            .with_deadline(Instant::now() - Duration::from_secs(1));
        assert!(matches!(ctx.err(), Some(GraphError::Cancelled)));
    }

    #[tokio::test]
    async fn run_returns_context_error_when_future_outlives_deadline() {
        let ctx = CallContext::background().with_timeout(Duration::from_millis(20));
        let out: Result<()> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(out, Err(GraphError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn run_short_circuits_on_concluded_context() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = CallContext::with_cancellation(token);
        let out: Result<u32> = ctx.run(async { Ok(7) }).await;
        assert!(matches!(out, Err(GraphError::Cancelled)));
    }

    #[tokio::test]
    async fn run_passes_through_result_on_live_context() {
        let out: Result<u32> = CallContext::background().run(async { Ok(7) }).await;
        assert_eq!(out.unwrap(), 7);
    }

    #[tokio::test]
    async fn transport_error_prefers_concluded_context() {
        // Nothing listens on port 1, so this fails at connect time.
        let transport_err = reqwest::Client::new()
            .get("http://127.0.0.1:1/")
            .send()
            .await
            .unwrap_err();

        let token = CancellationToken::new();
        token.cancel();
        let ctx = CallContext::with_cancellation(token);
        assert!(matches!(
            ctx.resolve_transport_error(transport_err),
            GraphError::Cancelled
        ));
    }

    #[tokio::test]
    async fn transport_error_passes_through_on_live_context() {
        let transport_err = reqwest::Client::new()
            .get("http://127.0.0.1:1/")
            .send()
            .await
            .unwrap_err();

        let ctx = CallContext::background();
        assert!(matches!(
            ctx.resolve_transport_error(transport_err),
            GraphError::Network(_)
        ));
    }
}
