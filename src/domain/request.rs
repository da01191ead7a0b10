use super::session::PendingPaymentContext;
use crate::config::{MerchantConfig, MerchantCredentials};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub const REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const SIGN_VERSION: u8 = 3;
pub const PAYALTO_WIDGET: &str = "t3_1";
pub const PARAM_WIDGET: &str = "widget";
pub const PARAM_COUNTRY_CODE: &str = "country_code";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Brick,
    GooglePay,
    PayAlto,
}

/// Purchase request handed to the SDK when the user taps "pay".
///
/// The secret key is neither serialized nor printed by `Debug`.
#[derive(Clone, PartialEq, Serialize)]
pub struct PaymentRequest {
    pub project_key: String,
    #[serde(skip)]
    pub secret_key: String,
    pub amount: Decimal,
    pub currency: String,
    pub user_id: String,
    pub user_email: String,
    pub item_id: String,
    pub item_name: String,
    pub merchant_name: String,
    pub timeout_ms: u64,
    pub sign_version: u8,
    pub methods: Vec<PaymentMethod>,
    pub footer_enabled: bool,
    pub payalto_params: BTreeMap<String, String>,
}

impl fmt::Debug for PaymentRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentRequest")
            .field("project_key", &self.project_key)
            .field("secret_key", &"[REDACTED]")
            .field("amount", &self.amount)
            .field("currency", &self.currency)
            .field("user_id", &self.user_id)
            .field("user_email", &self.user_email)
            .field("item_id", &self.item_id)
            .field("item_name", &self.item_name)
            .field("merchant_name", &self.merchant_name)
            .field("timeout_ms", &self.timeout_ms)
            .field("sign_version", &self.sign_version)
            .field("methods", &self.methods)
            .field("footer_enabled", &self.footer_enabled)
            .field("payalto_params", &self.payalto_params)
            .finish()
    }
}

impl PaymentRequest {
    /// Builds the request for the current screen state.
    pub fn from_session(config: &MerchantConfig, context: &PendingPaymentContext) -> Self {
        let MerchantCredentials {
            project_key,
            secret_key,
        } = config.credentials.clone();
        let defaults = &config.defaults;

        let mut payalto_params = BTreeMap::new();
        payalto_params.insert(PARAM_WIDGET.to_string(), PAYALTO_WIDGET.to_string());
        payalto_params.insert(PARAM_COUNTRY_CODE.to_string(), context.country.clone());

        Self {
            project_key,
            secret_key,
            amount: context.charge_amount,
            currency: context.charge_currency.clone(),
            user_id: context.user_id.clone(),
            user_email: defaults.user_email.clone(),
            item_id: defaults.item_id.clone(),
            item_name: defaults.item_name.clone(),
            merchant_name: defaults.merchant_name.clone(),
            timeout_ms: REQUEST_TIMEOUT_MS,
            sign_version: SIGN_VERSION,
            methods: vec![
                PaymentMethod::Brick,
                PaymentMethod::GooglePay,
                PaymentMethod::PayAlto,
            ],
            footer_enabled: true,
            payalto_params,
        }
    }
}
