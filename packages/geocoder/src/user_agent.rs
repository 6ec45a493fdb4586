//! Fingerprinted user agent for public geocoding instances.
//!
//! Nominatim's usage policy asks for an identifying user agent. The
//! fingerprint separates installations without sending host details.

use sha2::{Digest, Sha256};
use sysinfo::System;

/// Hex characters of the digest kept in the fingerprint.
const FINGERPRINT_LEN: usize = 12;

/// Host details mixed into the fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostDetails {
    /// Operating system and architecture (e.g., `"Linux (Debian 12)-x86_64"`).
    pub system: Option<String>,
    /// Host name.
    pub hostname: Option<String>,
}

impl HostDetails {
    /// Collects details for the running host.
    #[must_use]
    pub fn current() -> Self {
        let os = System::long_os_version()
            .or_else(System::name)
            .unwrap_or_else(|| std::env::consts::OS.to_string());
        let system = Some(format!("{os}-{}", std::env::consts::ARCH));
        let hostname = System::host_name().filter(|name| !name.trim().is_empty());

        Self { system, hostname }
    }

    const fn is_unknown(&self) -> bool {
        self.system.is_none() && self.hostname.is_none()
    }
}

/// Builds `surplus/<version> (<fingerprint>)`, or
/// `surplus/<version> (generic-user)` when nothing is known about the host.
#[must_use]
pub fn fingerprinted_user_agent(version: &str, details: &HostDetails) -> String {
    if details.is_unknown() {
        return format!("surplus/{version} (generic-user)");
    }

    let seed = format!(
        "{version}-{}-{}",
        details.system.as_deref().unwrap_or("unknown"),
        details.hostname.as_deref().unwrap_or("unknown"),
    );
    let digest = hex::encode(Sha256::digest(seed.as_bytes()));

    format!("surplus/{version} ({})", &digest[..FINGERPRINT_LEN])
}

/// User agent for the running host.
#[must_use]
pub fn default_user_agent(version: &str) -> String {
    fingerprinted_user_agent(version, &HostDetails::current())
}
