//! rustls client configuration for the charge endpoint.
//!
//! Chain validation is delegated to webpki. On top of it the verifier can
//! refuse a pinned revoked leaf certificate, which fails the handshake before
//! the request is written.

use crate::domain::pinning::{CertificatePin, PinVerdict, SecurityEvent};
use crate::error::{GamePayError, Result};
use parking_lot::Mutex;
use rustls::client::WebPkiServerVerifier;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::ring;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{
    CertificateError, ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme,
};
use std::sync::Arc;
use tracing::warn;

/// Where a verifier leaves the revoked-certificate event it refused.
#[derive(Debug, Clone, Default)]
pub struct RevocationSlot(Arc<Mutex<Option<SecurityEvent>>>);

impl RevocationSlot {
    pub fn take(&self) -> Option<SecurityEvent> {
        self.0.lock().take()
    }

    fn record(&self, event: SecurityEvent) {
        *self.0.lock() = Some(event);
    }
}

#[derive(Debug)]
struct RevocationAwareVerifier {
    inner: Arc<WebPkiServerVerifier>,
    reject: Option<CertificatePin>,
    revoked: RevocationSlot,
}

impl ServerCertVerifier for RevocationAwareVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        if let Some(pin) = &self.reject {
            let host = server_name.to_str();
            if let PinVerdict::Revoked(event) = pin.check(&host, Some(end_entity.as_ref())) {
                warn!(%event, "refusing TLS handshake");
                self.revoked.record(event);
                return Err(rustls::Error::InvalidCertificate(CertificateError::Revoked));
            }
        }
        self.inner
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

/// Builds a client config trusting the webpki roots plus `extra_roots`.
///
/// With `reject` set, a peer presenting that pin's revoked certificate fails
/// the handshake and the event lands in the returned slot.
pub fn client_config(
    extra_roots: &[CertificateDer<'static>],
    reject: Option<CertificatePin>,
) -> Result<(ClientConfig, RevocationSlot)> {
    let provider = Arc::new(ring::default_provider());

    let mut roots = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    for root in extra_roots {
        roots
            .add(root.clone())
            .map_err(|e| GamePayError::Tls(e.to_string()))?;
    }
    let inner = WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider.clone())
        .build()
        .map_err(|e| GamePayError::Tls(e.to_string()))?;

    let revoked = RevocationSlot::default();
    let verifier = RevocationAwareVerifier {
        inner,
        reject,
        revoked: revoked.clone(),
    };
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| GamePayError::Tls(e.to_string()))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_no_client_auth();
    Ok((config, revoked))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_with_and_without_pin() {
        assert!(client_config(&[], None).is_ok());
        assert!(client_config(&[], Some(CertificatePin::default())).is_ok());
    }

    #[test]
    fn test_rejects_malformed_extra_root() {
        let bogus = CertificateDer::from(b"not a certificate".to_vec());
        assert!(matches!(
            client_config(&[bogus], None),
            Err(GamePayError::Tls(_))
        ));
    }

    #[test]
    fn test_slot_is_empty_until_recorded() {
        let slot = RevocationSlot::default();
        assert_eq!(slot.take(), None);
        slot.record(SecurityEvent::RevokedCertificate {
            host: "pwgateway.com".into(),
            fingerprint: "00".into(),
        });
        assert!(slot.take().is_some());
        assert_eq!(slot.take(), None);
    }
}
