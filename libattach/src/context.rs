//! Request-scoped context for attacher operations.
//!
//! A [`RequestContext`] travels with one reconciliation of one record.  It
//! bounds every store call the updater makes (cancellation and deadline) and
//! carries optional markers downstream code can branch on, such as the
//! migration marker set by [`mark_context_as_migrated`].
//!
//! Contexts are immutable: deriving one yields a new value whose cancellation
//! is a child of the parent's, so cancelling the parent also cancels every
//! derived context, never the other way around.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::AttacherConfig;
use crate::error::StoreError;

/// Value of [`AdditionalInfo::migrated`] on migrated contexts.
pub const MIGRATED_LABEL: &str = "migrated";

/// Extra markers attached to a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdditionalInfo {
    /// Set to [`MIGRATED_LABEL`] when the request serves an in-tree volume
    /// migrated to CSI.
    pub migrated: String,
}

/// Cancellation, deadline and markers for one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    additional_info: Option<AdditionalInfo>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContext {
    /// A root context without deadline or markers.
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: None,
            additional_info: None,
        }
    }

    /// A root context bounded by the configured store timeout.
    pub fn from_config(config: &AttacherConfig) -> Self {
        Self::new().with_timeout(config.store_timeout)
    }

    /// Derive a context whose deadline is at most `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        };
        Self {
            cancel: self.cancel.child_token(),
            deadline: Some(deadline),
            additional_info: self.additional_info.clone(),
        }
    }

    /// Cancel this context and every context derived from it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn additional_info(&self) -> Option<&AdditionalInfo> {
        self.additional_info.as_ref()
    }

    /// Whether the request is part of a CSI migration code path.
    pub fn is_migrated(&self) -> bool {
        self.additional_info
            .as_ref()
            .is_some_and(|info| info.migrated == MIGRATED_LABEL)
    }

    /// Run a store call bounded by this context.
    ///
    /// Cancellation is checked first, so a context cancelled before the call
    /// never polls `fut`.  Dropping `fut` aborts the in-flight request.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(StoreError::Cancelled),
            _ = expired => Err(StoreError::DeadlineExceeded),
            res = fut => res,
        }
    }
}

/// Derive a context tagged as belonging to a CSI migration code path.
pub fn mark_context_as_migrated(ctx: &RequestContext) -> RequestContext {
    RequestContext {
        cancel: ctx.cancel.child_token(),
        deadline: ctx.deadline,
        additional_info: Some(AdditionalInfo {
            migrated: MIGRATED_LABEL.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrated_marker_only_on_derived_context() {
        let root = RequestContext::new();
        let migrated = mark_context_as_migrated(&root);
        assert!(!root.is_migrated());
        assert!(migrated.is_migrated());
        assert_eq!(
            migrated.additional_info().map(|i| i.migrated.as_str()),
            Some("migrated")
        );
    }

    #[test]
    fn cancellation_flows_to_children_only() {
        let root = RequestContext::new();
        let child = mark_context_as_migrated(&root);
        child.cancel();
        assert!(!root.is_cancelled());

        let child = mark_context_as_migrated(&root);
        root.cancel();
        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn run_passes_result_through() {
        let ctx = RequestContext::new();
        let ok = ctx.run(async { Ok::<_, StoreError>(7) }).await;
        assert_eq!(ok, Ok(7));

        let err = ctx
            .run(async { Err::<(), _>(StoreError::NotFound("va".into())) })
            .await;
        assert_eq!(err, Err(StoreError::NotFound("va".into())));
    }

    #[tokio::test]
    async fn run_on_cancelled_context_does_not_poll() {
        let ctx = RequestContext::new();
        ctx.cancel();
        let mut polled = false;
        let res = ctx
            .run(async {
                polled = true;
                Ok::<_, StoreError>(())
            })
            .await;
        assert_eq!(res, Err(StoreError::Cancelled));
        assert!(!polled);
    }

    #[tokio::test(start_paused = true)]
    async fn run_honours_deadline() {
        let ctx = RequestContext::new().with_timeout(Duration::from_secs(1));
        let res = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, StoreError>(())
            })
            .await;
        assert_eq!(res, Err(StoreError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn with_timeout_keeps_earlier_deadline() {
        let short = RequestContext::new().with_timeout(Duration::from_secs(1));
        let longer = short.with_timeout(Duration::from_secs(60));
        assert_eq!(short.deadline(), longer.deadline());

        let cfg = AttacherConfig {
            store_timeout: Duration::from_secs(5),
        };
        assert!(RequestContext::from_config(&cfg).deadline().is_some());
    }
}
