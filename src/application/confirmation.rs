use crate::config::MerchantConfig;
use crate::domain::charge::{ChargeAmount, ChargeRequest};
use crate::domain::pinning::{PinVerdict, RevokedCertificatePolicy, SecurityEvent};
use crate::domain::ports::{
    BrickResultSink, ChargeTransportRef, FormPost, SecurityEventSinkRef, TransportOptions,
    TransportResponse,
};
use crate::error::{GamePayError, Result};
use crate::infrastructure::security_properties::{DNS_CACHE_TTL, SecurityProperties};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const DEFAULT_ERROR_MESSAGE: &str = "Payment processing failed";

/// Progress of one charge confirmation: `Idle -> Sending -> Succeeded | Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "lowercase")]
pub enum ConfirmationState {
    #[default]
    Idle,
    Sending,
    Succeeded(String),
    Failed(String),
}

/// Performs the server-side charge that finalizes a brick payment.
///
/// One call is one round trip: no retries. The outcome is always reported to the
/// result sink (`set_response` or `set_error`) unless the call was cancelled, and
/// nothing is raised back to the caller.
pub struct ChargeConfirmer {
    config: Arc<MerchantConfig>,
    transport: ChargeTransportRef,
    properties: Arc<SecurityProperties>,
    security_events: Option<SecurityEventSinkRef>,
}

impl ChargeConfirmer {
    /// Creates a confirmer that overrides the process-wide security properties.
    pub fn new(config: Arc<MerchantConfig>, transport: ChargeTransportRef) -> Self {
        Self {
            config,
            transport,
            properties: SecurityProperties::global(),
            security_events: None,
        }
    }

    pub fn with_security_properties(mut self, properties: Arc<SecurityProperties>) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_security_events(mut self, sink: SecurityEventSinkRef) -> Self {
        self.security_events = Some(sink);
        self
    }

    pub async fn confirm<S>(
        &self,
        token: &str,
        email: &str,
        amount: Decimal,
        currency: &str,
        sink: &S,
        cancel: &CancellationToken,
    ) -> ConfirmationState
    where
        S: BrickResultSink + ?Sized,
    {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(GamePayError::Cancelled),
            result = self.charge(token, email, amount, currency) => result,
        };

        match result {
            Ok(body) => {
                info!(len = body.len(), "charge confirmed");
                sink.set_response(body.clone());
                ConfirmationState::Succeeded(body)
            }
            Err(GamePayError::Cancelled) => {
                info!("charge confirmation cancelled");
                ConfirmationState::Failed(GamePayError::Cancelled.to_string())
            }
            Err(e) => {
                error!(error = %e, "payment error");
                let mut message = e.to_string();
                if message.is_empty() {
                    message = DEFAULT_ERROR_MESSAGE.to_string();
                }
                sink.set_error(message.clone());
                ConfirmationState::Failed(message)
            }
        }
    }

    async fn charge(
        &self,
        token: &str,
        email: &str,
        amount: Decimal,
        currency: &str,
    ) -> Result<String> {
        let amount = ChargeAmount::new(amount)?;
        let request = ChargeRequest::new(
            token,
            email,
            amount,
            currency,
            &self.config.three_ds_return_url,
        )?;
        debug!(amount = %amount.formatted(), currency, "charge request built");

        let reject_revoked = match self.config.revoked_certificate_policy {
            RevokedCertificatePolicy::Reject => Some(self.config.certificate_pin.clone()),
            RevokedCertificatePolicy::Warn => None,
        };

        let sent = {
            // Resolution and connect happen before the response head arrives;
            // the override is released before the body is read.
            let dns_override = self.properties.override_scoped(DNS_CACHE_TTL, "0").await;
            let caching_disabled = dns_override.applied()
                && self.properties.get(DNS_CACHE_TTL).as_deref() == Some("0");
            self.transport
                .post_form(FormPost {
                    url: self.config.charge_endpoint.clone(),
                    body: request.form_body(),
                    api_key: self.config.credentials.secret_key.clone(),
                    options: TransportOptions {
                        connect_timeout: self.config.connect_timeout,
                        read_timeout: self.config.read_timeout,
                        reuse_connections: !caching_disabled,
                        reject_revoked,
                    },
                })
                .await
        };
        let response = sent.inspect_err(|e| {
            if let GamePayError::CertificateRevoked { host, fingerprint } = e {
                self.report_revoked(SecurityEvent::RevokedCertificate {
                    host: host.clone(),
                    fingerprint: fingerprint.clone(),
                });
            }
        })?;

        self.check_certificate(&response)?;

        let status = response.status;
        let success = response.is_success();
        let body = response.body.text().await?;
        if !success {
            return Err(GamePayError::Rejected { status, body });
        }
        Ok(body)
    }

    /// Post-response check for transports that let a revoked certificate through.
    fn check_certificate(&self, response: &TransportResponse) -> Result<()> {
        let host = self.config.charge_endpoint.host_str().unwrap_or_default();
        let pin = &self.config.certificate_pin;

        match pin.check(host, response.peer_certificate.as_deref()) {
            PinVerdict::Skipped => {
                if pin.applies_to(host) {
                    debug!(host, "no peer certificate captured, pin check skipped");
                }
                Ok(())
            }
            PinVerdict::Trusted => Ok(()),
            PinVerdict::Revoked(event) => {
                self.report_revoked(event.clone());
                match self.config.revoked_certificate_policy {
                    RevokedCertificatePolicy::Warn => Ok(()),
                    RevokedCertificatePolicy::Reject => {
                        let SecurityEvent::RevokedCertificate { host, fingerprint } = event;
                        Err(GamePayError::CertificateRevoked { host, fingerprint })
                    }
                }
            }
        }
    }

    fn report_revoked(&self, event: SecurityEvent) {
        warn!(%event, "charge endpoint presented a revoked certificate");
        if let Some(sink) = &self.security_events {
            sink.report(event);
        }
    }
}
