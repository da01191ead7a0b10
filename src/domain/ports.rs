use super::pinning::{CertificatePin, SecurityEvent};
use super::request::PaymentRequest;
use super::response::SdkResponse;
use crate::error::{GamePayError, Result};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::time::Duration;
use url::Url;

/// Where the outcome of a charge confirmation is delivered.
///
/// Exactly one of the two methods is called per completed confirmation.
pub trait BrickResultSink: Send + Sync {
    fn set_response(&self, body: String);
    fn set_error(&self, message: String);
}

/// Callback the SDK invokes once its interactive flow produces a result.
#[async_trait]
pub trait SdkEventHandler: Send + Sync {
    async fn on_response(&self, response: SdkResponse);
}

/// Handle to the payment SDK. The core never constructs or owns the SDK itself.
pub trait GamePaySdk: BrickResultSink {
    /// Registers the single event handler for the lifetime of a session.
    fn set_event_handler(&self, handler: Weak<dyn SdkEventHandler>);
    /// Launches the interactive payment flow.
    fn send_request(&self, request: PaymentRequest) -> Result<()>;
}

pub trait SecurityEventSink: Send + Sync {
    fn report(&self, event: SecurityEvent);
}

/// A form-encoded POST ready for the wire.
#[derive(Debug, Clone)]
pub struct FormPost {
    pub url: Url,
    pub body: String,
    pub api_key: String,
    pub options: TransportOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    pub connect_timeout: Duration,
    /// `None` leaves the read phase unbounded.
    pub read_timeout: Option<Duration>,
    /// `false` forces a fresh resolve and connect for the request.
    pub reuse_connections: bool,
    /// Abort the TLS handshake, before any request byte is written, when the
    /// peer presents the certificate this pin flags as revoked.
    pub reject_revoked: Option<CertificatePin>,
}

/// A response body still on the wire.
pub struct ResponseBody(Pin<Box<dyn Future<Output = Result<String>> + Send>>);

impl ResponseBody {
    pub fn ready(body: impl Into<String>) -> Self {
        let body = body.into();
        Self(Box::pin(async move { Ok::<_, GamePayError>(body) }))
    }

    pub fn deferred(read: impl Future<Output = Result<String>> + Send + 'static) -> Self {
        Self(Box::pin(read))
    }

    /// Reads the whole body as text.
    pub async fn text(self) -> Result<String> {
        self.0.await
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResponseBody(..)")
    }
}

/// Status and TLS details of a response whose body has not been read yet.
#[derive(Debug)]
pub struct TransportResponse {
    pub status: u16,
    /// DER-encoded leaf certificate of the peer, when the connection used TLS.
    pub peer_certificate: Option<Vec<u8>>,
    pub body: ResponseBody,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait ChargeTransport: Send + Sync {
    /// Sends the form and returns as soon as the response head has arrived.
    ///
    /// Fails with [`GamePayError::CertificateRevoked`] when
    /// `reject_revoked` matched during the handshake.
    async fn post_form(&self, request: FormPost) -> Result<TransportResponse>;
}

pub type ChargeTransportRef = Arc<dyn ChargeTransport>;
pub type GamePaySdkRef = Arc<dyn GamePaySdk>;
pub type SecurityEventSinkRef = Arc<dyn SecurityEventSink>;
