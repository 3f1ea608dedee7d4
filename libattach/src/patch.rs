//! JSON merge patches (RFC 7386).
//!
//! The updater never sends whole objects: it builds the desired object as a
//! value, diffs it against the object it started from and sends only the
//! difference.  [`create_merge_patch`] produces that difference;
//! [`apply_merge_patch`] is the store-side counterpart.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::AttachError;

/// Compute the merge patch turning `original` into `desired`.
///
/// Both values must serialize to JSON objects.  Fields that disappear are
/// emitted as `null`, nested objects are diffed recursively, and arrays and
/// scalars are replaced whole.  Equal inputs produce `{}`.
pub fn create_merge_patch<T: Serialize + ?Sized>(
    original: &T,
    desired: &T,
) -> Result<Vec<u8>, AttachError> {
    let original = serde_json::to_value(original).map_err(AttachError::serialization)?;
    let desired = serde_json::to_value(desired).map_err(AttachError::serialization)?;

    let (Value::Object(original), Value::Object(desired)) = (original, desired) else {
        return Err(AttachError::Serialization(
            "merge patch requires JSON objects".into(),
        ));
    };

    let patch = diff_objects(&original, &desired);
    serde_json::to_vec(&Value::Object(patch)).map_err(AttachError::serialization)
}

fn diff_objects(original: &Map<String, Value>, desired: &Map<String, Value>) -> Map<String, Value> {
    let mut patch = Map::new();

    for key in original.keys() {
        if !desired.contains_key(key) {
            patch.insert(key.clone(), Value::Null);
        }
    }

    for (key, new) in desired {
        match (original.get(key), new) {
            (Some(old), new) if old == new => {}
            (Some(Value::Object(old)), Value::Object(new)) => {
                let nested = diff_objects(old, new);
                if !nested.is_empty() {
                    patch.insert(key.clone(), Value::Object(nested));
                }
            }
            (_, new) => {
                patch.insert(key.clone(), new.clone());
            }
        }
    }

    patch
}

/// Apply a merge patch to `target` and return the result.
pub fn apply_merge_patch(target: Value, patch: &Value) -> Value {
    let Value::Object(patch) = patch else {
        return patch.clone();
    };

    let mut target = match target {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    for (key, value) in patch {
        if value.is_null() {
            target.remove(key);
        } else {
            let current = target.remove(key).unwrap_or(Value::Null);
            target.insert(key.clone(), apply_merge_patch(current, value));
        }
    }
    Value::Object(target)
}

/// Whether `patch` is the empty merge patch `{}`.
pub fn is_empty_patch(patch: &[u8]) -> bool {
    matches!(
        serde_json::from_slice::<Value>(patch),
        Ok(Value::Object(map)) if map.is_empty()
    )
}

/// Add `metadata.resourceVersion` to a merge patch.
///
/// The store rejects the patch with a conflict unless the record still has
/// `resource_version`.  An empty version leaves the patch unconditional.
pub fn with_resource_version(patch: &[u8], resource_version: &str) -> Result<Vec<u8>, AttachError> {
    if resource_version.is_empty() {
        return Ok(patch.to_vec());
    }

    let mut patch: Value = serde_json::from_slice(patch).map_err(AttachError::serialization)?;
    let Some(fields) = patch.as_object_mut() else {
        return Err(AttachError::Serialization(
            "merge patch requires JSON objects".into(),
        ));
    };
    let metadata = fields
        .entry("metadata")
        .or_insert_with(|| Value::Object(Map::new()));
    let Some(metadata) = metadata.as_object_mut() else {
        return Err(AttachError::Serialization(
            "patch metadata is not an object".into(),
        ));
    };
    metadata.insert(
        "resourceVersion".to_owned(),
        Value::String(resource_version.to_owned()),
    );
    serde_json::to_vec(&patch).map_err(AttachError::serialization)
}
