//! Record store seam.
//!
//! The attacher keeps no local copy of attachment records: every read and
//! write goes through an [`AttachmentStore`], typically the API server.
//! Stores provide optimistic concurrency (a write against a stale
//! `resourceVersion` fails with [`StoreError::Conflict`]); the attacher relies
//! on that instead of locking.

pub mod memory;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::types::VolumeAttachment;

/// Part of a record a patch is scoped to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Subresource {
    /// The object itself; changes to `status` are ignored.
    Main,
    /// The `status` subresource; changes outside `status` are ignored.
    Status,
}

impl Subresource {
    /// Subresource path segment as used by the API server.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for Subresource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => f.write_str("main"),
            Self::Status => f.write_str("status"),
        }
    }
}

/// Authoritative store of `VolumeAttachment` records.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Fetch the current version of a record.
    async fn get(&self, name: &str) -> Result<VolumeAttachment, StoreError>;

    /// Apply a JSON merge patch to a record and return the stored result.
    ///
    /// A patch carrying `metadata.resourceVersion` must be rejected with
    /// [`StoreError::Conflict`] when the version is stale.
    async fn patch(
        &self,
        name: &str,
        subresource: Subresource,
        patch: &[u8],
    ) -> Result<VolumeAttachment, StoreError>;
}

#[async_trait]
impl<S> AttachmentStore for std::sync::Arc<S>
where
    S: AttachmentStore + ?Sized,
{
    async fn get(&self, name: &str) -> Result<VolumeAttachment, StoreError> {
        (**self).get(name).await
    }

    async fn patch(
        &self,
        name: &str,
        subresource: Subresource,
        patch: &[u8],
    ) -> Result<VolumeAttachment, StoreError> {
        (**self).patch(name, subresource, patch).await
    }
}
