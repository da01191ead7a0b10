use crate::domain::pinning::{PinVerdict, SecurityEvent};
use crate::domain::ports::{
    BrickResultSink, ChargeTransport, FormPost, GamePaySdk, ResponseBody, SdkEventHandler,
    SecurityEventSink, TransportResponse,
};
use crate::domain::request::PaymentRequest;
use crate::domain::response::SdkResponse;
use crate::error::{GamePayError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Weak;
use std::time::Duration;

/// An in-process stand-in for the payment SDK.
///
/// Records every request and every brick result handed to it, and lets the
/// caller play SDK callbacks back into the registered handler.
#[derive(Default)]
pub struct InMemorySdk {
    handler: Mutex<Option<Weak<dyn SdkEventHandler>>>,
    requests: Mutex<Vec<PaymentRequest>>,
    responses: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
    reject_requests: bool,
}

impl InMemorySdk {
    pub fn new() -> Self {
        Self::default()
    }

    /// An SDK whose `send_request` always fails.
    pub fn rejecting() -> Self {
        Self {
            reject_requests: true,
            ..Self::default()
        }
    }

    /// Delivers `response` to the registered handler. Returns `false` when
    /// no live handler is registered.
    pub async fn emit(&self, response: SdkResponse) -> bool {
        let handler = self.handler.lock().as_ref().and_then(Weak::upgrade);
        match handler {
            Some(handler) => {
                handler.on_response(response).await;
                true
            }
            None => false,
        }
    }

    pub fn requests(&self) -> Vec<PaymentRequest> {
        self.requests.lock().clone()
    }

    pub fn responses(&self) -> Vec<String> {
        self.responses.lock().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }
}

impl BrickResultSink for InMemorySdk {
    fn set_response(&self, body: String) {
        self.responses.lock().push(body);
    }

    fn set_error(&self, message: String) {
        self.errors.lock().push(message);
    }
}

impl GamePaySdk for InMemorySdk {
    fn set_event_handler(&self, handler: Weak<dyn SdkEventHandler>) {
        *self.handler.lock() = Some(handler);
    }

    fn send_request(&self, request: PaymentRequest) -> Result<()> {
        if self.reject_requests {
            return Err(GamePayError::Sdk("payment UI unavailable".to_string()));
        }
        self.requests.lock().push(request);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySecurityEvents {
    events: Mutex<Vec<SecurityEvent>>,
}

impl InMemorySecurityEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SecurityEvent> {
        self.events.lock().clone()
    }
}

impl SecurityEventSink for InMemorySecurityEvents {
    fn report(&self, event: SecurityEvent) {
        self.events.lock().push(event);
    }
}

/// One scripted transport reply.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Respond {
        status: u16,
        body: String,
        peer_certificate: Option<Vec<u8>>,
    },
    /// Answer with this status, then never finish the body.
    StallBody(u16),
    /// Fail as a connection error with this message.
    Fail(String),
}

/// A transport that answers from a script instead of the network.
///
/// Replies are consumed in order; once the script runs dry every call fails.
/// Every request seen is recorded. A request whose reply carries a certificate
/// refused by `reject_revoked` fails as a handshake would and is not delivered.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<ScriptedReply>>,
    seen: Mutex<Vec<FormPost>>,
    delivered: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Holds every reply back for `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn ok(body: &str) -> ScriptedReply {
        Self::status(200, body)
    }

    pub fn status(status: u16, body: &str) -> ScriptedReply {
        ScriptedReply::Respond {
            status,
            body: body.to_string(),
            peer_certificate: None,
        }
    }

    /// A reply served over TLS with `leaf_der` as the peer certificate.
    pub fn with_certificate(status: u16, body: &str, leaf_der: &[u8]) -> ScriptedReply {
        ScriptedReply::Respond {
            status,
            body: body.to_string(),
            peer_certificate: Some(leaf_der.to_vec()),
        }
    }

    pub fn seen(&self) -> Vec<FormPost> {
        self.seen.lock().clone()
    }

    /// Bodies of the requests that got past the handshake.
    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().clone()
    }
}

#[async_trait]
impl ChargeTransport for ScriptedTransport {
    async fn post_form(&self, request: FormPost) -> Result<TransportResponse> {
        self.seen.lock().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let reply = self.replies.lock().pop_front();
        match reply {
            Some(ScriptedReply::Respond {
                status,
                body,
                peer_certificate,
            }) => {
                let host = request.url.host_str().unwrap_or_default();
                if let Some(pin) = &request.options.reject_revoked
                    && let PinVerdict::Revoked(SecurityEvent::RevokedCertificate {
                        host,
                        fingerprint,
                    }) = pin.check(host, peer_certificate.as_deref())
                {
                    return Err(GamePayError::CertificateRevoked { host, fingerprint });
                }
                self.delivered.lock().push(request.body);
                Ok(TransportResponse {
                    status,
                    peer_certificate,
                    body: ResponseBody::ready(body),
                })
            }
            Some(ScriptedReply::StallBody(status)) => {
                self.delivered.lock().push(request.body);
                Ok(TransportResponse {
                    status,
                    peer_certificate: None,
                    body: ResponseBody::deferred(std::future::pending::<Result<String>>()),
                })
            }
            Some(ScriptedReply::Fail(message)) => Err(GamePayError::Transport(message)),
            None => Err(GamePayError::Transport("no scripted reply left".to_string())),
        }
    }
}
