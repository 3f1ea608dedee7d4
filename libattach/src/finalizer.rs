//! Attacher finalizer naming.
//!
//! The attacher protects every `VolumeAttachment` it may have attached with a
//! finalizer derived from the driver name.  Driver names may contain
//! characters that are not valid in a finalizer, so they are sanitized first.
//!
//! Two drivers whose names differ only in disallowed characters
//! (`a.b` and `a_b`) map to the same finalizer.  Changing the mapping would
//! orphan finalizers already persisted on existing records, so it stays.

/// Prefix of every finalizer owned by the attacher.
pub const FINALIZER_PREFIX: &str = "external-attacher/";

/// Replace every character outside `[A-Za-z0-9-]` with `-`.
///
/// A result ending in `-` gets an `X` appended: finalizers must not end with
/// the replacement character.  Empty input yields an empty string.
pub fn sanitize_driver_name(driver: &str) -> String {
    let mut name: String = driver
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    if name.ends_with('-') {
        name.push('X');
    }
    name
}

/// Return the finalizer the attacher places on records of `driver`.
pub fn finalizer_name(driver: &str) -> String {
    format!("{FINALIZER_PREFIX}{}", sanitize_driver_name(driver))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_invalid_characters() {
        assert_eq!(sanitize_driver_name("my.csi.driver/v1"), "my-csi-driver-v1");
        assert_eq!(sanitize_driver_name("hostpath.csi.k8s.io"), "hostpath-csi-k8s-io");
        assert_eq!(sanitize_driver_name("plain-name"), "plain-name");
    }

    #[test]
    fn sanitize_never_ends_with_dash() {
        assert_eq!(sanitize_driver_name("driver."), "driver-X");
        assert_eq!(sanitize_driver_name("driver-"), "driver-X");
        assert_eq!(sanitize_driver_name("ü"), "-X");
    }

    #[test]
    fn sanitize_empty_input() {
        assert_eq!(sanitize_driver_name(""), "");
    }

    #[test]
    fn finalizer_only_uses_allowed_characters() {
        let token = finalizer_name("my.csi.driver/v1");
        assert_eq!(token, "external-attacher/my-csi-driver-v1");
        let suffix = token.strip_prefix(FINALIZER_PREFIX).expect("prefix");
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));
        assert!(!suffix.ends_with('-'));
    }

    #[test]
    fn names_differing_only_in_invalid_characters_collide() {
        assert_eq!(finalizer_name("a.b"), finalizer_name("a_b"));
    }
}
