//! Durable recording of attach and detach results.
//!
//! After the driver has attached or detached a volume, the reconciliation
//! loop records the outcome on the `VolumeAttachment` through the two
//! functions in this module.  Neither retries: store errors, including
//! conflicts and cancellation, are returned to the caller together with the
//! best-known record.
//!
//! # Detach ordering
//!
//! [`mark_as_detached`] writes in two independent steps:
//!
//! 1. **status**: `attached = false`, metadata and detach error cleared;
//! 2. **finalizer**: the attacher finalizer is removed.
//!
//! Removing the finalizer lets the store garbage-collect the record, so it
//! must only happen once `attached = false` is durable.  A crash between the
//! two steps leaves a detached record that still carries the finalizer; the
//! next call resumes at step 2.
//!
//! ```text
//! attached=true  + finalizer ──status──▶ attached=false + finalizer ──finalizer──▶ attached=false
//! ```

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::context::RequestContext;
use crate::error::AttachError;
use crate::finalizer::finalizer_name;
use crate::patch::{create_merge_patch, is_empty_patch, with_resource_version};
use crate::store::{AttachmentStore, Subresource};
use crate::types::{ObjectMeta, VolumeAttachment, VolumeAttachmentStatus};

/// Step of an update that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePhase {
    /// Write to the status subresource.
    Status,
    /// Removal of the attacher finalizer.
    Finalizer,
}

impl fmt::Display for UpdatePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status => f.write_str("status"),
            Self::Finalizer => f.write_str("finalizer"),
        }
    }
}

/// Failed record update.
///
/// `record` is the best-known state of the record after the failure: the
/// input for a failed status step, the status step's result for a failed
/// finalizer step.
#[derive(Debug, Error)]
#[error("{phase} update of volumeattachment {} failed: {source}", .record.metadata.name)]
pub struct UpdateError {
    pub phase: UpdatePhase,
    pub record: Box<VolumeAttachment>,
    pub source: AttachError,
}

impl UpdateError {
    fn new(phase: UpdatePhase, record: &VolumeAttachment, source: AttachError) -> Self {
        Self {
            phase,
            record: Box::new(record.clone()),
            source,
        }
    }

    /// Whether calling the operation again may succeed.
    pub fn is_retryable(&self) -> bool {
        self.source.is_retryable()
    }

    pub fn into_record(self) -> VolumeAttachment {
        *self.record
    }
}

/// Diff `current` against `desired` and send the patch to `subresource`.
///
/// The patch is conditional on `current`'s `resourceVersion`, so a write
/// computed from a stale snapshot fails with a conflict.
async fn apply_patch<S>(
    store: &S,
    ctx: &RequestContext,
    current: &VolumeAttachment,
    desired: &VolumeAttachment,
    subresource: Subresource,
    phase: UpdatePhase,
) -> Result<VolumeAttachment, UpdateError>
where
    S: AttachmentStore + ?Sized,
{
    let patch = create_merge_patch(current, desired)
        .and_then(|diff| {
            if is_empty_patch(&diff) {
                debug!(%phase, "record already up to date");
            }
            with_resource_version(&diff, &current.metadata.resource_version)
        })
        .map_err(|e| UpdateError::new(phase, current, e))?;

    ctx.run(store.patch(current.name(), subresource, &patch))
        .await
        .map_err(|e| {
            warn!(name = %current.name(), %phase, error = %e, "patch failed");
            UpdateError::new(phase, current, e.into())
        })
}

/// Record that the driver attached the volume.
///
/// Sets `attached`, replaces the attachment metadata and clears the attach
/// error with a single status patch.  Calling it again with the same metadata
/// sends a patch that changes no field.
#[instrument(skip_all, fields(name = %va.metadata.name))]
pub async fn mark_as_attached<S>(
    store: &S,
    ctx: &RequestContext,
    va: &VolumeAttachment,
    metadata: BTreeMap<String, String>,
) -> Result<VolumeAttachment, UpdateError>
where
    S: AttachmentStore + ?Sized,
{
    debug!("marking as attached");
    let desired = VolumeAttachment {
        status: VolumeAttachmentStatus {
            attached: true,
            attachment_metadata: metadata,
            attach_error: None,
            ..va.status.clone()
        },
        ..va.clone()
    };

    let updated = apply_patch(store, ctx, va, &desired, Subresource::Status, UpdatePhase::Status)
        .await?;
    debug!("marked as attached");
    Ok(updated)
}

/// Record that the driver detached the volume and release the record.
///
/// See the [module documentation](self) for the step ordering.  A record
/// without the attacher finalizer and with `attached = false` is returned
/// unchanged without contacting the store.  The status step is skipped when
/// the status is already detached, and the finalizer step when the finalizer
/// is already gone.
#[instrument(skip_all, fields(name = %va.metadata.name))]
pub async fn mark_as_detached<S>(
    store: &S,
    ctx: &RequestContext,
    va: &VolumeAttachment,
) -> Result<VolumeAttachment, UpdateError>
where
    S: AttachmentStore + ?Sized,
{
    let finalizer = finalizer_name(&va.spec.attacher);
    if !va.has_finalizer(&finalizer) && !va.status.attached {
        debug!("already fully detached");
        return Ok(va.clone());
    }

    debug!("marking as detached");
    let detached_status = VolumeAttachmentStatus {
        attached: false,
        attachment_metadata: BTreeMap::new(),
        detach_error: None,
        ..va.status.clone()
    };
    let detached = if detached_status == va.status {
        debug!("status already detached");
        va.clone()
    } else {
        let desired = VolumeAttachment {
            status: detached_status,
            ..va.clone()
        };
        apply_patch(store, ctx, va, &desired, Subresource::Status, UpdatePhase::Status).await?
    };

    // The finalizer lives outside the status subresource, so it needs its own
    // patch, sent only after the status write above is durable.
    if !detached.has_finalizer(&finalizer) {
        debug!("finalizer already removed");
        return Ok(detached);
    }
    let desired = VolumeAttachment {
        metadata: ObjectMeta {
            finalizers: detached
                .metadata
                .finalizers
                .iter()
                .filter(|f| **f != finalizer)
                .cloned()
                .collect(),
            ..detached.metadata.clone()
        },
        ..detached.clone()
    };
    let updated = apply_patch(
        store,
        ctx,
        &detached,
        &desired,
        Subresource::Main,
        UpdatePhase::Finalizer,
    )
    .await?;
    debug!(%finalizer, "finalizer removed");
    Ok(updated)
}
