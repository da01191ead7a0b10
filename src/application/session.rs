use super::confirmation::{ChargeConfirmer, ConfirmationState};
use crate::config::MerchantConfig;
use crate::domain::outcome::{MSG_CONFIRMING, PaymentOutcome};
use crate::domain::ports::{GamePaySdkRef, SdkEventHandler};
use crate::domain::request::PaymentRequest;
use crate::domain::response::{Classification, SdkResponse, classify};
use crate::domain::session::PendingPaymentContext;
use crate::error::{GamePayError, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::{Arc, Weak};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What the renderer needs to draw the payment screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub context: PendingPaymentContext,
    pub outcome: Option<PaymentOutcome>,
    pub confirmation: ConfirmationState,
}

struct SessionState {
    context: PendingPaymentContext,
    outcome: Option<PaymentOutcome>,
    confirmation: ConfirmationState,
    in_flight: Option<JoinHandle<()>>,
    /// Bumped per confirmation; a task only writes back while it is current.
    attempt: u64,
}

/// Controller behind the payment screen.
///
/// Owns the pending payment context and the single live outcome, and is the
/// SDK's event handler for as long as it lives. Server confirmations run on a
/// background task tied to the session: closing or dropping the session
/// cancels them.
pub struct PaymentSession {
    config: Arc<MerchantConfig>,
    sdk: GamePaySdkRef,
    confirmer: Arc<ChargeConfirmer>,
    state: Arc<RwLock<SessionState>>,
    cancel: CancellationToken,
}

impl PaymentSession {
    /// Creates a session and registers it as the SDK's event handler.
    pub fn attach(
        config: Arc<MerchantConfig>,
        sdk: GamePaySdkRef,
        confirmer: Arc<ChargeConfirmer>,
    ) -> Arc<Self> {
        let state = SessionState {
            context: PendingPaymentContext::new(&config.defaults),
            outcome: None,
            confirmation: ConfirmationState::Idle,
            in_flight: None,
            attempt: 0,
        };
        let session = Arc::new(Self {
            config,
            sdk,
            confirmer,
            state: Arc::new(RwLock::new(state)),
            cancel: CancellationToken::new(),
        });
        let handler: Weak<dyn SdkEventHandler> = Arc::downgrade(&session) as Weak<dyn SdkEventHandler>;
        session.sdk.set_event_handler(handler);
        session
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read().await;
        SessionSnapshot {
            context: state.context.clone(),
            outcome: state.outcome.clone(),
            confirmation: state.confirmation.clone(),
        }
    }

    pub async fn set_charge(&self, amount: Decimal, currency: impl Into<String>) {
        let mut state = self.state.write().await;
        state.context.charge_amount = amount;
        state.context.charge_currency = currency.into();
    }

    pub async fn set_country(&self, country: impl Into<String>) {
        self.state.write().await.context.country = country.into();
    }

    /// Builds the purchase request and hands it to the SDK.
    ///
    /// Refused while a payment or its charge confirmation is running, and
    /// while the previous outcome has not been dismissed.
    pub async fn start_payment(&self) -> Result<PaymentRequest> {
        let mut state = self.state.write().await;
        if state.context.is_processing || state.confirmation == ConfirmationState::Sending {
            return Err(GamePayError::PaymentInProgress);
        }
        if state.outcome.is_some() {
            return Err(GamePayError::OutcomePending);
        }

        let request = PaymentRequest::from_session(&self.config, &state.context);
        self.sdk.send_request(request.clone())?;
        state.context.is_processing = true;
        state.confirmation = ConfirmationState::Idle;
        info!(
            amount = %request.amount,
            currency = %request.currency,
            user_id = %request.user_id,
            "payment started"
        );
        Ok(request)
    }

    /// Dismisses the live outcome. An in-flight confirmation keeps running.
    pub async fn clear_outcome(&self) {
        self.state.write().await.outcome = None;
    }

    /// Waits for the in-flight confirmation, if any, and returns its final state.
    pub async fn wait_for_confirmation(&self) -> ConfirmationState {
        let handle = self.state.write().await.in_flight.take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            warn!(error = %e, "confirmation task ended abnormally");
        }
        self.state.read().await.confirmation.clone()
    }

    /// Ends the session, cancelling any in-flight confirmation.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    async fn begin_confirmation(&self, token: String, email: String) {
        let mut state = self.state.write().await;
        if state.confirmation == ConfirmationState::Sending {
            warn!("charge confirmation already in flight, callback ignored");
            return;
        }

        state.context.is_processing = true;
        state.outcome = Some(PaymentOutcome::Processing(MSG_CONFIRMING.to_string()));
        state.confirmation = ConfirmationState::Sending;
        state.attempt += 1;
        let attempt = state.attempt;

        let amount = state.context.charge_amount;
        let currency = state.context.charge_currency.clone();
        let confirmer = self.confirmer.clone();
        let sdk = self.sdk.clone();
        let shared = self.state.clone();
        let cancel = self.cancel.child_token();

        state.in_flight = Some(tokio::spawn(async move {
            let result = confirmer
                .confirm(&token, &email, amount, &currency, sdk.as_ref(), &cancel)
                .await;
            let mut state = shared.write().await;
            if state.attempt != attempt {
                debug!(attempt, current = state.attempt, "stale confirmation result dropped");
                return;
            }
            state.context.is_processing = false;
            state.confirmation = result;
        }));
    }
}

#[async_trait]
impl SdkEventHandler for PaymentSession {
    async fn on_response(&self, response: SdkResponse) {
        match classify(&response) {
            Classification::Outcome(outcome) => {
                info!(%outcome, "payment outcome received");
                let mut state = self.state.write().await;
                state.context.is_processing = false;
                state.outcome = Some(outcome);
            }
            Classification::RequiresConfirmation { token, email } => {
                self.begin_confirmation(token, email).await;
            }
            Classification::Ignored => {
                debug!(result_code = ?response.result_code, "sdk callback ignored");
            }
        }
    }
}

impl Drop for PaymentSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
