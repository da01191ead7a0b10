use serde::Serialize;
use std::fmt;

pub const MSG_SUCCESS: &str = "Payment completed successfully!";
pub const MSG_FAILED: &str = "Payment failed!";
pub const MSG_CANCELLED: &str = "Payment cancelled!";
pub const MSG_ERROR: &str = "An error occurred!";
pub const MSG_INVALID_DATA: &str = "Invalid payment data received";
pub const MSG_CONFIRMING: &str = "Confirming payment with merchant server";

/// The user-visible result of a payment attempt.
///
/// Exactly one outcome is live per session at a time. Each variant only carries
/// a human-readable message; the renderer decides how to present it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum PaymentOutcome {
    Success(String),
    Processing(String),
    Failed(String),
    Cancelled(String),
    Unknown(String),
}

impl PaymentOutcome {
    pub fn message(&self) -> &str {
        match self {
            PaymentOutcome::Success(m)
            | PaymentOutcome::Processing(m)
            | PaymentOutcome::Failed(m)
            | PaymentOutcome::Cancelled(m)
            | PaymentOutcome::Unknown(m) => m,
        }
    }

    /// Whether this outcome ends the payment attempt.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentOutcome::Processing(_))
    }

    pub fn invalid_payment_data() -> Self {
        PaymentOutcome::Unknown(MSG_INVALID_DATA.to_string())
    }
}

impl fmt::Display for PaymentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentOutcome::Success(_) => "success",
            PaymentOutcome::Processing(_) => "processing",
            PaymentOutcome::Failed(_) => "failed",
            PaymentOutcome::Cancelled(_) => "cancelled",
            PaymentOutcome::Unknown(_) => "unknown",
        };
        write!(f, "{}: {}", label, self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_processing_is_non_terminal() {
        assert!(!PaymentOutcome::Processing(MSG_CONFIRMING.into()).is_terminal());
        assert!(PaymentOutcome::Success(MSG_SUCCESS.into()).is_terminal());
        assert!(PaymentOutcome::Failed(MSG_FAILED.into()).is_terminal());
        assert!(PaymentOutcome::Cancelled(MSG_CANCELLED.into()).is_terminal());
        assert!(PaymentOutcome::Unknown(MSG_ERROR.into()).is_terminal());
    }

    #[test]
    fn test_display_includes_label_and_message() {
        let outcome = PaymentOutcome::Cancelled(MSG_CANCELLED.into());
        assert_eq!(outcome.to_string(), "cancelled: Payment cancelled!");
    }

    #[test]
    fn test_serializes_as_tagged_status() {
        let json = serde_json::to_value(PaymentOutcome::invalid_payment_data()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": "unknown", "message": "Invalid payment data received"})
        );
    }
}
