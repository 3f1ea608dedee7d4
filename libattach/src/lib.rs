//! # libattach — VolumeAttachment state primitives for RK8s
//!
//! `libattach` holds the pieces of the external attacher that must never get
//! out of sync with the storage driver: the two-phase update of a
//! `VolumeAttachment` record after a driver `ControllerPublish` /
//! `ControllerUnpublish` call, and the translation of a persistent volume
//! into the CSI capability the driver is asked for.  It follows the RK8s
//! conventions (Tokio async runtime, `tracing` for observability,
//! `thiserror` for structured errors).
//!
//! The reconciliation loop deciding *when* to attach or detach lives
//! elsewhere; it calls into this crate once the driver has answered.
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |---|---|
//! | [`types`] | Data model: `VolumeAttachment`, `PersistentVolumeSpec`, `CsiNode`. |
//! | [`error`] | [`AttachError`] and [`StoreError`]. |
//! | [`finalizer`] | Driver name sanitizing and the attacher finalizer. |
//! | [`patch`] | JSON merge-patch creation and application. |
//! | [`capability`] | PV spec → CSI [`VolumeCapability`]. |
//! | [`source`] | Volume handle / attribute / node ID lookups. |
//! | [`context`] | [`RequestContext`]: cancellation, deadline, migration marker. |
//! | [`store`] | [`AttachmentStore`] trait and the in-memory store. |
//! | [`updater`] | `mark_as_attached` / `mark_as_detached`. |
//! | [`config`] | Environment-driven [`AttacherConfig`]. |

pub mod capability;
pub mod config;
pub mod context;
pub mod error;
pub mod finalizer;
pub mod patch;
pub mod source;
pub mod store;
pub mod types;
pub mod updater;

// Re-export the most commonly used items at crate root for convenience.
pub use capability::{AccessType, CapabilityAccessMode, VolumeCapability, volume_capability};
pub use config::{ATTACHER_CONFIG, AttacherConfig};
pub use context::{RequestContext, mark_context_as_migrated};
pub use error::{AttachError, StoreError};
pub use finalizer::{finalizer_name, sanitize_driver_name};
pub use store::{AttachmentStore, Subresource};
pub use types::*;
pub use updater::{UpdateError, UpdatePhase, mark_as_attached, mark_as_detached};
