use crate::config::SessionDefaults;
use rust_decimal::Decimal;
use serde::Serialize;

/// Mutable state of the payment screen, owned by the session controller.
///
/// `is_processing` stays true from the moment a payment is started until a
/// terminal outcome arrives or the server confirmation round trip ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingPaymentContext {
    pub is_processing: bool,
    pub charge_amount: Decimal,
    pub charge_currency: String,
    pub user_id: String,
    pub country: String,
}

impl PendingPaymentContext {
    pub fn new(defaults: &SessionDefaults) -> Self {
        Self {
            is_processing: false,
            charge_amount: defaults.amount,
            charge_currency: defaults.currency.clone(),
            user_id: defaults.user_id.clone(),
            country: defaults.country.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_context_starts_idle_with_defaults() {
        let ctx = PendingPaymentContext::new(&SessionDefaults::default());
        assert!(!ctx.is_processing);
        assert_eq!(ctx.charge_amount, dec!(0.3));
        assert_eq!(ctx.charge_currency, "USD");
        assert_eq!(ctx.user_id, "12311111001233123");
        assert_eq!(ctx.country, "KR");
    }
}
