//! Translation of a persistent volume into a CSI volume capability.
//!
//! A persistent volume lists a *set* of access modes while CSI accepts exactly
//! one access mode per capability.  [`volume_capability`] resolves the set
//! with a fixed precedence and rejects the combinations CSI cannot express.

use serde::{Deserialize, Serialize};

use crate::error::AttachError;
use crate::types::{AccessMode, PersistentVolumeSpec, VolumeMode};

/// Filesystem type used when the volume does not name one.
pub const DEFAULT_FS_TYPE: &str = "ext4";

/// How the driver should expose the volume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccessType {
    /// Raw block device.
    Block,
    /// Mounted filesystem.
    Mount {
        fs_type: String,
        mount_flags: Vec<String>,
    },
}

/// CSI `VolumeCapability.AccessMode.Mode`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CapabilityAccessMode {
    SingleNodeWriter,
    MultiNodeReaderOnly,
    MultiNodeMultiWriter,
}

/// Capability sent to the driver on `ControllerPublishVolume`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolumeCapability {
    pub access_type: AccessType,
    pub access_mode: CapabilityAccessMode,
}

/// Build the CSI capability for a persistent volume.
///
/// Access modes resolve as follows, first match wins:
///
/// 1. `ReadWriteMany` → [`CapabilityAccessMode::MultiNodeMultiWriter`],
///    whatever else is listed.
/// 2. `ReadOnlyMany` together with `ReadWriteOnce` → error.
/// 3. `ReadOnlyMany` → [`CapabilityAccessMode::MultiNodeReaderOnly`].
/// 4. `ReadWriteOnce` → [`CapabilityAccessMode::SingleNodeWriter`].
/// 5. anything else, including no modes at all → error.
pub fn volume_capability(spec: &PersistentVolumeSpec) -> Result<VolumeCapability, AttachError> {
    let Some(csi) = spec.csi.as_ref() else {
        return Err(AttachError::InvalidSpec("CSI volume source was nil".into()));
    };

    let access_type = if spec.volume_mode == Some(VolumeMode::Block) {
        AccessType::Block
    } else {
        let fs_type = if csi.fs_type.is_empty() {
            DEFAULT_FS_TYPE.to_owned()
        } else {
            csi.fs_type.clone()
        };
        AccessType::Mount {
            fs_type,
            mount_flags: spec.mount_options.clone(),
        }
    };

    let has = |mode: AccessMode| spec.access_modes.contains(&mode);
    let access_mode = if has(AccessMode::ReadWriteMany) {
        CapabilityAccessMode::MultiNodeMultiWriter
    } else if has(AccessMode::ReadOnlyMany) && has(AccessMode::ReadWriteOnce) {
        return Err(AttachError::UnsupportedAccessModeCombination {
            modes: spec.access_modes.clone(),
            reason: "CSI does not support ReadOnlyMany and ReadWriteOnce on the same volume"
                .into(),
        });
    } else if has(AccessMode::ReadOnlyMany) {
        CapabilityAccessMode::MultiNodeReaderOnly
    } else if has(AccessMode::ReadWriteOnce) {
        CapabilityAccessMode::SingleNodeWriter
    } else {
        return Err(AttachError::UnsupportedAccessModeCombination {
            modes: spec.access_modes.clone(),
            reason: "no access mode requested".into(),
        });
    };

    Ok(VolumeCapability {
        access_type,
        access_mode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CsiPersistentVolumeSource;
    use crate::types::AccessMode::*;

    fn spec(modes: &[AccessMode]) -> PersistentVolumeSpec {
        PersistentVolumeSpec {
            access_modes: modes.to_vec(),
            csi: Some(CsiPersistentVolumeSource {
                driver: "d".into(),
                volume_handle: "vol-1".into(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn missing_csi_source() {
        let mut s = spec(&[ReadWriteOnce]);
        s.csi = None;
        assert!(matches!(
            volume_capability(&s),
            Err(AttachError::InvalidSpec(_))
        ));
    }

    #[test]
    fn read_write_many_wins_over_everything() {
        for modes in [
            vec![ReadWriteMany],
            vec![ReadWriteMany, ReadWriteOnce],
            vec![ReadOnlyMany, ReadWriteMany],
            vec![ReadWriteOnce, ReadOnlyMany, ReadWriteMany],
        ] {
            let cap = volume_capability(&spec(&modes)).unwrap();
            assert_eq!(cap.access_mode, CapabilityAccessMode::MultiNodeMultiWriter, "{modes:?}");
        }
    }

    #[test]
    fn read_only_many_with_read_write_once_is_rejected() {
        for modes in [vec![ReadOnlyMany, ReadWriteOnce], vec![ReadWriteOnce, ReadOnlyMany]] {
            let err = volume_capability(&spec(&modes)).unwrap_err();
            assert!(matches!(
                err,
                AttachError::UnsupportedAccessModeCombination { .. }
            ));
        }
    }

    #[test]
    fn single_modes() {
        let cap = volume_capability(&spec(&[ReadOnlyMany])).unwrap();
        assert_eq!(cap.access_mode, CapabilityAccessMode::MultiNodeReaderOnly);

        let cap = volume_capability(&spec(&[ReadWriteOnce])).unwrap();
        assert_eq!(cap.access_mode, CapabilityAccessMode::SingleNodeWriter);

        // Duplicates do not change the outcome.
        let cap = volume_capability(&spec(&[ReadWriteOnce, ReadWriteOnce])).unwrap();
        assert_eq!(cap.access_mode, CapabilityAccessMode::SingleNodeWriter);
    }

    #[test]
    fn no_modes_is_rejected() {
        let err = volume_capability(&spec(&[])).unwrap_err();
        assert!(matches!(
            err,
            AttachError::UnsupportedAccessModeCombination { ref modes, .. } if modes.is_empty()
        ));
    }

    #[test]
    fn block_volume_has_no_filesystem() {
        let mut s = spec(&[ReadWriteOnce]);
        s.volume_mode = Some(VolumeMode::Block);
        s.mount_options = vec!["noatime".into()];
        if let Some(csi) = s.csi.as_mut() {
            csi.fs_type = "xfs".into();
        }
        let cap = volume_capability(&s).unwrap();
        assert_eq!(cap.access_type, AccessType::Block);
    }

    #[test]
    fn mount_volume_defaults_fs_type() {
        let mut s = spec(&[ReadWriteOnce]);
        s.mount_options = vec!["noatime".into(), "ro".into()];
        let cap = volume_capability(&s).unwrap();
        assert_eq!(
            cap.access_type,
            AccessType::Mount {
                fs_type: DEFAULT_FS_TYPE.into(),
                mount_flags: vec!["noatime".into(), "ro".into()],
            }
        );
    }

    #[test]
    fn mount_volume_keeps_explicit_fs_type() {
        let mut s = spec(&[ReadWriteOnce]);
        s.volume_mode = Some(VolumeMode::Filesystem);
        if let Some(csi) = s.csi.as_mut() {
            csi.fs_type = "xfs".into();
        }
        let cap = volume_capability(&s).unwrap();
        assert_eq!(
            cap.access_type,
            AccessType::Mount {
                fs_type: "xfs".into(),
                mount_flags: vec![],
            }
        );
    }

    #[test]
    fn translation_is_deterministic() {
        let s = spec(&[ReadOnlyMany]);
        assert_eq!(volume_capability(&s).unwrap(), volume_capability(&s).unwrap());
    }
}
