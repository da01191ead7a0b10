use super::outcome::{MSG_CANCELLED, MSG_ERROR, MSG_FAILED, MSG_SUCCESS, PaymentOutcome};
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;

/// Extras key holding the service that produced a `MERCHANT_PROCESSING` callback.
pub const KEY_SERVICE_TYPE: &str = "service_type";
pub const KEY_BRICK_EMAIL: &str = "brick_email";
pub const KEY_BRICK_TOKEN: &str = "brick_token";
/// Service type of card payments that need a server-side charge.
pub const SERVICE_TYPE_BRICK: &str = "brick";

/// Result codes reported by the SDK callback.
#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultCode {
    Successful,
    Failed,
    Cancel,
    Error,
    MerchantProcessing,
    #[serde(other)]
    Unrecognized,
}

impl FromStr for ResultCode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "SUCCESSFUL" => ResultCode::Successful,
            "FAILED" => ResultCode::Failed,
            "CANCEL" => ResultCode::Cancel,
            "ERROR" => ResultCode::Error,
            "MERCHANT_PROCESSING" => ResultCode::MerchantProcessing,
            _ => ResultCode::Unrecognized,
        };
        Ok(code)
    }
}

/// A callback delivered by the SDK: a result code plus an opaque extras bag.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct SdkResponse {
    pub result_code: ResultCode,
    #[serde(default)]
    pub extras: HashMap<String, String>,
}

impl SdkResponse {
    pub fn new(result_code: ResultCode) -> Self {
        Self {
            result_code,
            extras: HashMap::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    /// Builds the `MERCHANT_PROCESSING` callback the brick service emits once it holds a token.
    pub fn brick(token: impl Into<String>, email: impl Into<String>) -> Self {
        Self::new(ResultCode::MerchantProcessing)
            .with_extra(KEY_SERVICE_TYPE, SERVICE_TYPE_BRICK)
            .with_extra(KEY_BRICK_TOKEN, token)
            .with_extra(KEY_BRICK_EMAIL, email)
    }

    fn extra(&self, key: &str) -> &str {
        self.extras.get(key).map(String::as_str).unwrap_or("")
    }
}

/// What the session should do with an SDK callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Outcome(PaymentOutcome),
    RequiresConfirmation { token: String, email: String },
    /// Unrecognized code or non-brick merchant processing: leave state untouched.
    Ignored,
}

/// Maps an SDK callback to an outcome or a confirmation request. Performs no I/O.
pub fn classify(response: &SdkResponse) -> Classification {
    match response.result_code {
        ResultCode::Successful => Classification::Outcome(PaymentOutcome::Success(MSG_SUCCESS.into())),
        ResultCode::Failed => Classification::Outcome(PaymentOutcome::Failed(MSG_FAILED.into())),
        ResultCode::Cancel => Classification::Outcome(PaymentOutcome::Cancelled(MSG_CANCELLED.into())),
        ResultCode::Error => Classification::Outcome(PaymentOutcome::Unknown(MSG_ERROR.into())),
        ResultCode::MerchantProcessing => {
            if response.extra(KEY_SERVICE_TYPE) != SERVICE_TYPE_BRICK {
                return Classification::Ignored;
            }
            let token = response.extra(KEY_BRICK_TOKEN);
            let email = response.extra(KEY_BRICK_EMAIL);
            if token.is_empty() || email.is_empty() {
                Classification::Outcome(PaymentOutcome::invalid_payment_data())
            } else {
                Classification::RequiresConfirmation {
                    token: token.to_string(),
                    email: email.to_string(),
                }
            }
        }
        ResultCode::Unrecognized => Classification::Ignored,
    }
}
