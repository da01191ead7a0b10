//! Merchant configuration.
//!
//! Read once at startup and shared read-only afterwards. Defaults describe the
//! demo merchant; every value can be overridden through `GAMEPAY_*` variables.

use crate::domain::pinning::{CertificatePin, REVOKED_CERT_SHA1, RevokedCertificatePolicy};
use crate::error::ConfigError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fmt;
use std::time::Duration;
use url::Url;

pub const DEFAULT_CHARGE_ENDPOINT: &str = "https://merchant-server.com/api/charge";
pub const DEFAULT_THREE_DS_RETURN_URL: &str = "https://merchant-server.com/return-url";
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 30_000;

/// Project and secret keys issued to the merchant.
///
/// `Debug` redacts the secret key so it never reaches log output.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct MerchantCredentials {
    pub project_key: String,
    pub secret_key: String,
}

impl fmt::Debug for MerchantCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerchantCredentials")
            .field("project_key", &self.project_key)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

/// Values a new payment session starts from.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDefaults {
    pub user_id: String,
    pub user_email: String,
    pub item_id: String,
    pub item_name: String,
    pub merchant_name: String,
    pub amount: Decimal,
    pub currency: String,
    pub country: String,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            user_id: "12311111001233123".to_string(),
            user_email: "user_123@gmail.com".to_string(),
            item_id: "gem0001".to_string(),
            item_name: "GEM".to_string(),
            merchant_name: "Aetherborne".to_string(),
            amount: dec!(0.3),
            currency: "USD".to_string(),
            country: "KR".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MerchantConfig {
    /// Merchant endpoint that finalizes brick charges.
    pub charge_endpoint: Url,
    /// Base URL the 3DS widget redirects to after authentication.
    pub three_ds_return_url: Url,
    pub credentials: MerchantCredentials,
    pub connect_timeout: Duration,
    /// `None` leaves the read phase unbounded.
    pub read_timeout: Option<Duration>,
    pub certificate_pin: CertificatePin,
    pub revoked_certificate_policy: RevokedCertificatePolicy,
    pub defaults: SessionDefaults,
}

impl MerchantConfig {
    /// Configuration with the given endpoints and every other value at its default.
    pub fn new(charge_endpoint: Url, three_ds_return_url: Url) -> Self {
        Self {
            charge_endpoint,
            three_ds_return_url,
            credentials: MerchantCredentials::default(),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            read_timeout: Some(Duration::from_millis(DEFAULT_READ_TIMEOUT_MS)),
            certificate_pin: CertificatePin::default(),
            revoked_certificate_policy: RevokedCertificatePolicy::default(),
            defaults: SessionDefaults::default(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `GAMEPAY_CHARGE_ENDPOINT` (default: `https://merchant-server.com/api/charge`)
    /// - `GAMEPAY_THREE_DS_RETURN_URL` (default: `https://merchant-server.com/return-url`)
    /// - `GAMEPAY_PROJECT_KEY`, `GAMEPAY_SECRET_KEY` (default: empty)
    /// - `GAMEPAY_CONNECT_TIMEOUT_MS` (default: 30000)
    /// - `GAMEPAY_READ_TIMEOUT_MS` (default: 30000, `0` leaves reads unbounded)
    /// - `GAMEPAY_PINNED_HOST` (default: `pwgateway.com`)
    /// - `GAMEPAY_REVOKED_CERT_POLICY` (`warn` or `reject`, default: `warn`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let url = |var: &str, default: &str| -> Result<Url, ConfigError> {
            let raw = lookup(var).unwrap_or_else(|| default.to_string());
            Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
        };
        let millis = |var: &str| -> Result<Option<Duration>, ConfigError> {
            lookup(var)
                .map(|raw| {
                    raw.trim()
                        .parse::<u64>()
                        .map(Duration::from_millis)
                        .map_err(|e| ConfigError::InvalidValue(var.to_string(), e.to_string()))
                })
                .transpose()
        };

        let mut config = Self::new(
            url("GAMEPAY_CHARGE_ENDPOINT", DEFAULT_CHARGE_ENDPOINT)?,
            url("GAMEPAY_THREE_DS_RETURN_URL", DEFAULT_THREE_DS_RETURN_URL)?,
        );
        config.credentials = MerchantCredentials {
            project_key: lookup("GAMEPAY_PROJECT_KEY").unwrap_or_default(),
            secret_key: lookup("GAMEPAY_SECRET_KEY").unwrap_or_default(),
        };
        if let Some(timeout) = millis("GAMEPAY_CONNECT_TIMEOUT_MS")? {
            config.connect_timeout = timeout;
        }
        if let Some(timeout) = millis("GAMEPAY_READ_TIMEOUT_MS")? {
            config.read_timeout = (!timeout.is_zero()).then_some(timeout);
        }
        if let Some(host) = lookup("GAMEPAY_PINNED_HOST") {
            config.certificate_pin = CertificatePin::new(host, REVOKED_CERT_SHA1);
        }
        if let Some(raw) = lookup("GAMEPAY_REVOKED_CERT_POLICY") {
            config.revoked_certificate_policy = raw.parse().map_err(|e: String| {
                ConfigError::InvalidValue("GAMEPAY_REVOKED_CERT_POLICY".to_string(), e)
            })?;
        }
        Ok(config)
    }
}
