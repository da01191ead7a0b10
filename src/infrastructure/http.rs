use super::tls;
use crate::domain::pinning::SecurityEvent;
use crate::domain::ports::{
    ChargeTransport, FormPost, ResponseBody, TransportOptions, TransportResponse,
};
use crate::error::{GamePayError, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::tls::TlsInfo;
use rustls::pki_types::CertificateDer;
use tracing::{debug, info};

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=UTF-8";
pub const API_KEY_HEADER: &str = "x-apikey";

/// HTTPS transport for the merchant charge endpoint.
///
/// A client is built per request so connect/read timeouts, connection reuse
/// and the revoked-certificate refusal follow the options of that request. TLS
/// info is captured so the caller can fingerprint the peer's leaf certificate.
#[derive(Debug, Default, Clone)]
pub struct ReqwestTransport {
    extra_roots: Vec<CertificateDer<'static>>,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also trusts the DER-encoded `root`, for endpoints behind a private CA.
    pub fn with_root_certificate(mut self, root: impl Into<Vec<u8>>) -> Self {
        self.extra_roots.push(CertificateDer::from(root.into()));
        self
    }

    fn client(&self, options: &TransportOptions) -> Result<(reqwest::Client, tls::RevocationSlot)> {
        let (tls_config, revoked) =
            tls::client_config(&self.extra_roots, options.reject_revoked.clone())?;
        let mut builder = reqwest::Client::builder()
            .use_preconfigured_tls(tls_config)
            .connect_timeout(options.connect_timeout)
            .tls_info(true);
        if let Some(read_timeout) = options.read_timeout {
            builder = builder.read_timeout(read_timeout);
        }
        if !options.reuse_connections {
            builder = builder.pool_max_idle_per_host(0);
        }
        Ok((builder.build()?, revoked))
    }
}

#[async_trait]
impl ChargeTransport for ReqwestTransport {
    async fn post_form(&self, request: FormPost) -> Result<TransportResponse> {
        let (client, revoked) = self.client(&request.options)?;
        info!(url = %request.url, "connecting to charge endpoint");

        let response = client
            .post(request.url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header(API_KEY_HEADER, request.api_key)
            .body(request.body)
            .send()
            .await
            .map_err(|e| match revoked.take() {
                Some(SecurityEvent::RevokedCertificate { host, fingerprint }) => {
                    GamePayError::CertificateRevoked { host, fingerprint }
                }
                None => GamePayError::Http(e),
            })?;

        let status = response.status().as_u16();
        let peer_certificate = response
            .extensions()
            .get::<TlsInfo>()
            .and_then(TlsInfo::peer_certificate)
            .map(<[u8]>::to_vec);
        debug!(status, has_peer_certificate = peer_certificate.is_some(), "charge endpoint answered");

        Ok(TransportResponse {
            status,
            peer_certificate,
            body: ResponseBody::deferred(async move {
                response.text().await.map_err(GamePayError::from)
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn options() -> TransportOptions {
        TransportOptions {
            connect_timeout: Duration::from_secs(5),
            read_timeout: Some(Duration::from_secs(5)),
            reuse_connections: false,
            reject_revoked: None,
        }
    }

    #[tokio::test]
    async fn test_posts_form_with_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/charge"))
            .and(header("content-type", FORM_CONTENT_TYPE))
            .and(header(API_KEY_HEADER, "sk_test"))
            .and(body_string("token=t&email=e"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .expect(1)
            .mount(&server)
            .await;

        let response = ReqwestTransport::new()
            .post_form(FormPost {
                url: format!("{}/api/charge", server.uri()).parse().unwrap(),
                body: "token=t&email=e".into(),
                api_key: "sk_test".into(),
                options: options(),
            })
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert!(response.is_success());
        // Plain HTTP has no peer certificate.
        assert_eq!(response.peer_certificate, None);
        assert_eq!(response.body.text().await.unwrap(), "OK");
    }

    #[tokio::test]
    async fn test_error_status_is_returned_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let response = ReqwestTransport::new()
            .post_form(FormPost {
                url: server.uri().parse().unwrap(),
                body: String::new(),
                api_key: String::new(),
                options: options(),
            })
            .await
            .unwrap();

        assert_eq!(response.status, 500);
        assert!(!response.is_success());
        assert_eq!(response.body.text().await.unwrap(), "boom");
    }
}
