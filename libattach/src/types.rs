//! Core data model: attachment records, persistent volume specs and CSI nodes.
//!
//! The JSON shape follows the Kubernetes `storage.k8s.io/v1` and `core/v1`
//! objects (camelCase, empty collections omitted) so that merge patches
//! computed from these types are accepted as-is by the API server.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Object metadata
// ---------------------------------------------------------------------------

/// The subset of object metadata the attacher reads or writes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Object name, unique per store.
    pub name: String,
    /// Opaque version token used for optimistic concurrency.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_version: String,
    /// Finalizers blocking deletion of the object.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub finalizers: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// VolumeAttachment
// ---------------------------------------------------------------------------

/// Binding between one volume and one node, as recorded in the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolumeAttachment {
    pub metadata: ObjectMeta,
    pub spec: VolumeAttachmentSpec,
    #[serde(default)]
    pub status: VolumeAttachmentStatus,
}

impl VolumeAttachment {
    /// Record name.
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Whether `finalizer` is present on the record.
    pub fn has_finalizer(&self, finalizer: &str) -> bool {
        self.metadata.finalizers.iter().any(|f| f == finalizer)
    }
}

/// Desired attachment, written by the reconciliation loop.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeAttachmentSpec {
    /// Name of the CSI driver responsible for this attachment.
    pub attacher: String,
    /// Node the volume is attached to.
    pub node_name: String,
    #[serde(default)]
    pub source: VolumeAttachmentSource,
}

/// Volume referenced by a [`VolumeAttachment`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeAttachmentSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_volume_name: Option<String>,
}

/// Observed attachment state, written only through the status subresource.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeAttachmentStatus {
    /// `true` once the driver has confirmed the attach.
    #[serde(default)]
    pub attached: bool,
    /// Driver-supplied data needed by later detach / stage calls.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attachment_metadata: BTreeMap<String, String>,
    /// Last attach failure, cleared once attached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attach_error: Option<VolumeError>,
    /// Last detach failure, cleared once detached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detach_error: Option<VolumeError>,
}

/// Error snapshot recorded on an attachment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolumeError {
    /// RFC 3339 timestamp of the failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default)]
    pub message: String,
}

// ---------------------------------------------------------------------------
// Persistent volumes
// ---------------------------------------------------------------------------

/// Access mode requested on a persistent volume.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccessMode {
    /// Single-node read-write.
    ReadWriteOnce,
    /// Multi-node read-only.
    ReadOnlyMany,
    /// Multi-node read-write.
    ReadWriteMany,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ReadWriteOnce => "ReadWriteOnce",
            Self::ReadOnlyMany => "ReadOnlyMany",
            Self::ReadWriteMany => "ReadWriteMany",
        })
    }
}

/// Whether a volume is consumed as a raw block device or a filesystem.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VolumeMode {
    Block,
    Filesystem,
}

/// The parts of a persistent volume spec relevant to attaching.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PersistentVolumeSpec {
    #[serde(default)]
    pub access_modes: Vec<AccessMode>,
    /// `None` means filesystem.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_mode: Option<VolumeMode>,
    /// Mount flags passed through to the driver, e.g. `"noatime"`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mount_options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csi: Option<CsiPersistentVolumeSource>,
}

/// CSI-specific part of a persistent volume.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CsiPersistentVolumeSource {
    /// Name of the driver serving the volume.
    pub driver: String,
    /// Driver-assigned volume identifier.
    pub volume_handle: String,
    #[serde(default)]
    pub read_only: bool,
    /// Filesystem type; empty means the attacher default.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub fs_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub volume_attributes: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// CSI nodes
// ---------------------------------------------------------------------------

/// Per-node registry of installed CSI drivers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CsiNode {
    pub metadata: ObjectMeta,
    pub spec: CsiNodeSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CsiNodeSpec {
    #[serde(default)]
    pub drivers: Vec<CsiNodeDriver>,
}

/// One driver registered on a node.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CsiNodeDriver {
    pub name: String,
    /// Node identifier as known to the driver.
    #[serde(rename = "nodeID")]
    pub node_id: String,
}
