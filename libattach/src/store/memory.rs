//! In-memory [`AttachmentStore`].
//!
//! [`MemoryStore`] behaves like the API server for the calls the attacher
//! makes: merge patches are scoped to their subresource, `resourceVersion`
//! advances on every effective change, and a patch naming a stale
//! `resourceVersion` is rejected.  Every patch call is recorded, and failures
//! can be queued per subresource, which makes it suitable for exercising the
//! two-phase detach in tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::error::StoreError;
use crate::patch::apply_merge_patch;
use crate::store::{AttachmentStore, Subresource};
use crate::types::VolumeAttachment;

/// One `patch` call observed by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchCall {
    pub name: String,
    pub subresource: Subresource,
    /// Patch body as sent, or `Value::Null` when it was not valid JSON.
    pub patch: Value,
}

/// Concurrent in-memory record store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, VolumeAttachment>,
    calls: Mutex<Vec<PatchCall>>,
    failures: Mutex<VecDeque<(Subresource, StoreError)>>,
    version: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a record, assigning it a fresh `resourceVersion`.
    pub fn insert(&self, mut va: VolumeAttachment) -> VolumeAttachment {
        va.metadata.resource_version = self.next_version();
        self.records.insert(va.metadata.name.clone(), va.clone());
        va
    }

    /// Remove a record, returning it if it existed.
    pub fn remove(&self, name: &str) -> Option<VolumeAttachment> {
        self.records.remove(name).map(|(_, va)| va)
    }

    /// Make the next patch against `subresource` fail with `err`.
    ///
    /// Queued failures are consumed in order, one per matching call.
    pub fn fail_next(&self, subresource: Subresource, err: StoreError) {
        self.failures.lock().push_back((subresource, err));
    }

    /// All patch calls seen so far, in order.
    pub fn calls(&self) -> Vec<PatchCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn next_version(&self) -> String {
        (self.version.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    fn take_failure(&self, subresource: Subresource) -> Option<StoreError> {
        let mut failures = self.failures.lock();
        let pos = failures.iter().position(|(s, _)| *s == subresource)?;
        failures.remove(pos).map(|(_, err)| err)
    }
}

/// Keep only the part of `patch` the subresource is allowed to change.
fn scope_patch(patch: &Value, subresource: Subresource) -> Value {
    let Value::Object(fields) = patch else {
        return patch.clone();
    };
    let scoped = fields
        .iter()
        .filter(|(key, _)| match subresource {
            Subresource::Status => key.as_str() == "status",
            Subresource::Main => key.as_str() != "status",
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    Value::Object(scoped)
}

#[async_trait]
impl AttachmentStore for MemoryStore {
    async fn get(&self, name: &str) -> Result<VolumeAttachment, StoreError> {
        self.records
            .get(name)
            .map(|r| r.clone())
            .ok_or_else(|| StoreError::NotFound(name.to_owned()))
    }

    async fn patch(
        &self,
        name: &str,
        subresource: Subresource,
        patch: &[u8],
    ) -> Result<VolumeAttachment, StoreError> {
        let parsed: Result<Value, _> = serde_json::from_slice(patch);
        self.calls.lock().push(PatchCall {
            name: name.to_owned(),
            subresource,
            patch: parsed.as_ref().cloned().unwrap_or(Value::Null),
        });

        if let Some(err) = self.take_failure(subresource) {
            debug!(%name, %subresource, error = %err, "injected patch failure");
            return Err(err);
        }

        let patch = parsed.map_err(|e| StoreError::InvalidPatch(e.to_string()))?;
        if !patch.is_object() {
            return Err(StoreError::InvalidPatch("patch must be a JSON object".into()));
        }

        let mut record = self
            .records
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound(name.to_owned()))?;

        if let Some(expected) = patch
            .pointer("/metadata/resourceVersion")
            .and_then(Value::as_str)
            && expected != record.metadata.resource_version
        {
            return Err(StoreError::Conflict {
                name: name.to_owned(),
                reason: format!(
                    "resourceVersion {expected} does not match current {}",
                    record.metadata.resource_version
                ),
            });
        }

        let current = serde_json::to_value(&*record)
            .map_err(|e| StoreError::InvalidPatch(e.to_string()))?;
        let patched = apply_merge_patch(current, &scope_patch(&patch, subresource));
        let mut updated: VolumeAttachment = serde_json::from_value(patched)
            .map_err(|e| StoreError::InvalidPatch(e.to_string()))?;

        updated.metadata.resource_version = record.metadata.resource_version.clone();
        if updated != *record {
            updated.metadata.resource_version = self.next_version();
            *record = updated;
            debug!(%name, %subresource, version = %record.metadata.resource_version, "patch applied");
        } else {
            debug!(%name, %subresource, "patch was a no-op");
        }
        Ok(record.clone())
    }
}
