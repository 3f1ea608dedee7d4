//! Attacher runtime configuration.
//!
//! Environment variables:
//! - `LIBATTACH_STORE_TIMEOUT_SECS`: upper bound for a single record store
//!   call made through [`RequestContext::from_config`](crate::RequestContext::from_config).
//!   Defaults to `15`. Unparsable values fall back to the default.

use std::sync::LazyLock;
use std::time::Duration;

/// Environment variable holding the store call timeout in seconds.
pub const STORE_TIMEOUT_ENV: &str = "LIBATTACH_STORE_TIMEOUT_SECS";

const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(15);

/// Configuration shared by all attacher operations in a process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttacherConfig {
    /// Time budget for one store call.
    pub store_timeout: Duration,
}

impl Default for AttacherConfig {
    fn default() -> Self {
        Self {
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

impl AttacherConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let store_timeout = lookup(STORE_TIMEOUT_ENV)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_STORE_TIMEOUT);
        Self { store_timeout }
    }
}

/// Globally initialized attacher configuration, read from environment variables at first access.
pub static ATTACHER_CONFIG: LazyLock<AttacherConfig> = LazyLock::new(AttacherConfig::from_env);
