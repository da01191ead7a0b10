//! Leaf-certificate fingerprint check against a known-revoked digest.

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_PINNED_HOST: &str = "pwgateway.com";

/// SHA-1 of the gateway certificate that must no longer be trusted.
pub const REVOKED_CERT_SHA1: [u8; 20] = [
    0x05, 0xc0, 0xb3, 0x64, 0x36, 0x94, 0x47, 0x0a, 0x88, 0x8c, 0x6e, 0x7f, 0xeb, 0x5c, 0x9e, 0x24,
    0xe8, 0x23, 0xdc, 0x53,
];

/// What to do once a revoked certificate has been observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevokedCertificatePolicy {
    /// Report the event and carry on with the charge.
    #[default]
    Warn,
    /// Report the event and fail the charge.
    Reject,
}

impl FromStr for RevokedCertificatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(Self::Warn),
            "reject" => Ok(Self::Reject),
            other => Err(format!("expected `warn` or `reject`, got `{other}`")),
        }
    }
}

/// Observable security events raised during a charge confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SecurityEvent {
    RevokedCertificate { host: String, fingerprint: String },
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityEvent::RevokedCertificate { host, fingerprint } => {
                write!(f, "revoked certificate from {host} (sha1 {fingerprint})")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinVerdict {
    /// Host is not pinned or no certificate was captured.
    Skipped,
    Trusted,
    Revoked(SecurityEvent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificatePin {
    host: String,
    revoked_sha1: [u8; 20],
}

impl Default for CertificatePin {
    fn default() -> Self {
        Self::new(DEFAULT_PINNED_HOST, REVOKED_CERT_SHA1)
    }
}

impl CertificatePin {
    pub fn new(host: impl Into<String>, revoked_sha1: [u8; 20]) -> Self {
        Self {
            host: host.into(),
            revoked_sha1,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn applies_to(&self, host: &str) -> bool {
        host.eq_ignore_ascii_case(&self.host)
    }

    /// Checks the DER-encoded leaf certificate presented by `host`.
    ///
    /// Fails open: an unpinned host or a missing certificate yields `Skipped`.
    pub fn check(&self, host: &str, leaf_der: Option<&[u8]>) -> PinVerdict {
        if !self.applies_to(host) {
            return PinVerdict::Skipped;
        }
        let Some(der) = leaf_der else {
            return PinVerdict::Skipped;
        };

        let digest = Sha1::digest(der);
        if digest[..] == self.revoked_sha1[..] {
            PinVerdict::Revoked(SecurityEvent::RevokedCertificate {
                host: host.to_string(),
                fingerprint: hex::encode(digest),
            })
        } else {
            PinVerdict::Trusted
        }
    }
}
