//! Lookups on CSI volume sources and CSI nodes.

use std::collections::BTreeMap;

use crate::error::AttachError;
use crate::types::{CsiNode, CsiPersistentVolumeSource};

/// Return the volume handle and read-only flag of a CSI volume source.
pub fn volume_handle(
    source: Option<&CsiPersistentVolumeSource>,
) -> Result<(&str, bool), AttachError> {
    let source = source.ok_or_else(|| AttachError::InvalidSpec("csi source was nil".into()))?;
    Ok((source.volume_handle.as_str(), source.read_only))
}

/// Return the volume attributes of a CSI volume source.
pub fn volume_attributes(
    source: Option<&CsiPersistentVolumeSource>,
) -> Result<&BTreeMap<String, String>, AttachError> {
    let source = source.ok_or_else(|| AttachError::InvalidSpec("csi source was nil".into()))?;
    Ok(&source.volume_attributes)
}

/// Find the node ID `driver` registered on `csi_node`.
pub fn node_id_from_csi_node<'a>(driver: &str, csi_node: &'a CsiNode) -> Option<&'a str> {
    csi_node
        .spec
        .drivers
        .iter()
        .find(|d| d.name == driver)
        .map(|d| d.node_id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CsiNodeDriver, CsiNodeSpec};

    fn source() -> CsiPersistentVolumeSource {
        CsiPersistentVolumeSource {
            driver: "d".into(),
            volume_handle: "vol-1".into(),
            read_only: true,
            volume_attributes: BTreeMap::from([("pool".into(), "fast".into())]),
            ..Default::default()
        }
    }

    #[test]
    fn handle_and_attributes() {
        let src = source();
        assert_eq!(volume_handle(Some(&src)).unwrap(), ("vol-1", true));
        assert_eq!(volume_attributes(Some(&src)).unwrap()["pool"], "fast");
    }

    #[test]
    fn missing_source() {
        assert!(matches!(volume_handle(None), Err(AttachError::InvalidSpec(_))));
        assert!(matches!(volume_attributes(None), Err(AttachError::InvalidSpec(_))));
    }

    #[test]
    fn node_id_lookup() {
        let node = CsiNode {
            spec: CsiNodeSpec {
                drivers: vec![
                    CsiNodeDriver {
                        name: "other".into(),
                        node_id: "x".into(),
                    },
                    CsiNodeDriver {
                        name: "d".into(),
                        node_id: "node-01-id".into(),
                    },
                ],
            },
            ..Default::default()
        };
        assert_eq!(node_id_from_csi_node("d", &node), Some("node-01-id"));
        assert_eq!(node_id_from_csi_node("missing", &node), None);
    }
}
