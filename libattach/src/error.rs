//! Attacher error types.
//!
//! Failures are split in two layers.  [`StoreError`] is what the record
//! store reports; the caller's reconciliation loop retries on it.
//! [`AttachError`] wraps it together with the input and encoding failures
//! raised by this crate, which retrying does not fix.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::AccessMode;

/// Errors reported by an [`AttachmentStore`](crate::store::AttachmentStore).
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The record does not exist.
    #[error("volumeattachment {0} not found")]
    NotFound(String),

    /// The write was made against a stale `resourceVersion`.
    #[error("conflict on volumeattachment {name}: {reason}")]
    Conflict {
        /// Record name.
        name: String,
        /// Store-supplied reason.
        reason: String,
    },

    /// The store rejected the patch document itself.
    #[error("invalid patch: {0}")]
    InvalidPatch(String),

    /// Connection or protocol failure talking to the store.
    #[error("transport error: {0}")]
    Transport(String),

    /// The request context was cancelled before the store answered.
    #[error("request cancelled")]
    Cancelled,

    /// The request context deadline passed before the store answered.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl StoreError {
    /// Create a [`StoreError::Transport`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn transport<E: std::fmt::Display>(e: E) -> Self {
        Self::Transport(e.to_string())
    }
}

/// Unified error type for attacher operations.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum AttachError {
    /// The volume specification is structurally incomplete.
    #[error("invalid volume spec: {0}")]
    InvalidSpec(String),

    /// The requested access modes have no CSI access mode equivalent.
    #[error("unsupported access mode combination {modes:?}: {reason}")]
    UnsupportedAccessModeCombination {
        /// Access modes as listed on the volume.
        modes: Vec<AccessMode>,
        /// Human-readable reason.
        reason: String,
    },

    /// A record could not be encoded into a merge patch.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The record store failed the request.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AttachError {
    /// Create a [`AttachError::Serialization`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn serialization<E: std::fmt::Display>(e: E) -> Self {
        Self::Serialization(e.to_string())
    }

    /// Whether the caller may retry the same call unchanged.
    ///
    /// Only store failures qualify; invalid volumes and encoding errors need a different
    /// input first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = AttachError::InvalidSpec("CSI volume source was nil".into());
        assert_eq!(
            err.to_string(),
            "invalid volume spec: CSI volume source was nil"
        );

        let err = AttachError::from(StoreError::NotFound("va-1".into()));
        assert_eq!(err.to_string(), "volumeattachment va-1 not found");
    }

    #[test]
    fn retryable_only_for_store_errors() {
        assert!(AttachError::Store(StoreError::Cancelled).is_retryable());
        assert!(
            AttachError::Store(StoreError::Conflict {
                name: "va".into(),
                reason: "stale".into(),
            })
            .is_retryable()
        );
        assert!(!AttachError::serialization("boom").is_retryable());
        assert!(
            !AttachError::UnsupportedAccessModeCombination {
                modes: vec![],
                reason: "empty".into(),
            }
            .is_retryable()
        );
    }

    #[test]
    fn error_serde_roundtrip() {
        let err = AttachError::UnsupportedAccessModeCombination {
            modes: vec![AccessMode::ReadOnlyMany, AccessMode::ReadWriteOnce],
            reason: "no single CSI mode".into(),
        };
        let json = serde_json::to_string(&err).expect("serialize");
        let de: AttachError = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(err, de);
    }
}
