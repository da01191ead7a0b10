use crate::error::{GamePayError, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use url::{Url, form_urlencoded};

pub const SECURE_RETURN_METHOD: &str = "url";

/// A positive monetary amount to be charged.
///
/// Parsing accepts either `.` or `,` as the decimal separator, so values typed
/// under any locale normalize to the same amount.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ChargeAmount(Decimal);

impl ChargeAmount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(GamePayError::InvalidAmount(format!(
                "amount must be positive, got {value}"
            )))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Two fractional digits, `.` separator, half-up rounding: `1234.5` -> `"1234.50"`.
    pub fn formatted(&self) -> String {
        let mut rounded = self
            .0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(2);
        rounded.to_string()
    }
}

impl FromStr for ChargeAmount {
    type Err = GamePayError;

    fn from_str(raw: &str) -> Result<Self> {
        let normalized = raw.trim().replace(',', ".");
        let value = Decimal::from_str(&normalized)
            .map_err(|e| GamePayError::InvalidAmount(format!("{raw}: {e}")))?;
        Self::new(value)
    }
}

impl TryFrom<Decimal> for ChargeAmount {
    type Error = GamePayError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ChargeAmount> for Decimal {
    fn from(amount: ChargeAmount) -> Self {
        amount.0
    }
}

/// One server-side charge confirmation. Lives only for the duration of a single HTTP call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeRequest {
    pub token: String,
    pub email: String,
    pub amount: ChargeAmount,
    pub currency: String,
    pub secure_redirect_url: Url,
}

impl ChargeRequest {
    /// Builds the request and derives its 3DS redirect URL from `three_ds_return_url`.
    pub fn new(
        token: impl Into<String>,
        email: impl Into<String>,
        amount: ChargeAmount,
        currency: impl Into<String>,
        three_ds_return_url: &Url,
    ) -> Result<Self> {
        let token = token.into();
        let email = email.into();
        let currency = currency.into();
        let secure_redirect_url =
            secure_redirect_url(three_ds_return_url, &token, &email, &amount, &currency)?;
        Ok(Self {
            token,
            email,
            amount,
            currency,
            secure_redirect_url,
        })
    }

    /// URL-form-encoded POST body, UTF-8 percent-encoded.
    pub fn form_body(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("token", &self.token)
            .append_pair("email", &self.email)
            .append_pair("amount", &self.amount.formatted())
            .append_pair("currency", &self.currency)
            .append_pair("secure_return_method", SECURE_RETURN_METHOD)
            .append_pair("secure_redirect_url", self.secure_redirect_url.as_str())
            .finish()
    }
}

fn secure_redirect_url(
    base: &Url,
    token: &str,
    email: &str,
    amount: &ChargeAmount,
    currency: &str,
) -> Result<Url> {
    let mut url = Url::parse(&format!("{}/index", base.as_str().trim_end_matches('/')))?;
    url.query_pairs_mut()
        .append_pair("token", token)
        .append_pair("email", email)
        .append_pair("amount", &amount.formatted())
        .append_pair("currency", currency);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn return_url() -> Url {
        Url::parse("https://merchant-server.com/return-url").unwrap()
    }

    #[test]
    fn test_amount_formatting_is_locale_independent() {
        let comma: ChargeAmount = "1234,5".parse().unwrap();
        let dot: ChargeAmount = "1234.5".parse().unwrap();
        assert_eq!(comma.formatted(), "1234.50");
        assert_eq!(dot.formatted(), "1234.50");
    }

    #[test]
    fn test_amount_formatting_rounds_half_up() {
        assert_eq!(ChargeAmount::new(dec!(0.3)).unwrap().formatted(), "0.30");
        assert_eq!(ChargeAmount::new(dec!(2.005)).unwrap().formatted(), "2.01");
        assert_eq!(ChargeAmount::new(dec!(2.004)).unwrap().formatted(), "2.00");
        assert_eq!(ChargeAmount::new(dec!(7)).unwrap().formatted(), "7.00");
    }

    #[test]
    fn test_amount_validation() {
        assert!(matches!(
            ChargeAmount::new(dec!(0.0)),
            Err(GamePayError::InvalidAmount(_))
        ));
        assert!(matches!(
            "-1.0".parse::<ChargeAmount>(),
            Err(GamePayError::InvalidAmount(_))
        ));
        assert!(matches!(
            "ten".parse::<ChargeAmount>(),
            Err(GamePayError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_secure_redirect_url_carries_charge_fields() {
        let req = ChargeRequest::new(
            "tok_1",
            "user@example.com",
            ChargeAmount::new(dec!(0.3)).unwrap(),
            "USD",
            &return_url(),
        )
        .unwrap();

        assert_eq!(
            req.secure_redirect_url.as_str(),
            "https://merchant-server.com/return-url/index?token=tok_1&email=user%40example.com&amount=0.30&currency=USD"
        );
    }

    #[test]
    fn test_form_body_field_order_and_encoding() {
        let req = ChargeRequest::new(
            "tok 1",
            "user@example.com",
            ChargeAmount::new(dec!(12.5)).unwrap(),
            "KRW",
            &Url::parse("https://merchant-server.com/return-url/").unwrap(),
        )
        .unwrap();

        let body = req.form_body();
        let keys: Vec<String> = form_urlencoded::parse(body.as_bytes())
            .map(|(k, _)| k.into_owned())
            .collect();
        assert_eq!(
            keys,
            [
                "token",
                "email",
                "amount",
                "currency",
                "secure_return_method",
                "secure_redirect_url"
            ]
        );
        assert!(body.starts_with("token=tok+1&email=user%40example.com&amount=12.50&currency=KRW"));
        assert!(body.contains("secure_return_method=url"));

        let redirect = form_urlencoded::parse(body.as_bytes())
            .find(|(k, _)| k == "secure_redirect_url")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert!(redirect.starts_with("https://merchant-server.com/return-url/index?"));
    }
}
