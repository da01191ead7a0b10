#![allow(dead_code)]

use gamepay_brick::application::confirmation::ChargeConfirmer;
use gamepay_brick::application::session::PaymentSession;
use gamepay_brick::config::MerchantConfig;
use gamepay_brick::infrastructure::http::ReqwestTransport;
use gamepay_brick::infrastructure::in_memory::InMemorySdk;
use gamepay_brick::infrastructure::security_properties::SecurityProperties;
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;

pub const CHARGE_PATH: &str = "/api/charge";
pub const SECRET_KEY: &str = "sk_test_123";

pub fn merchant_config(server: &MockServer) -> MerchantConfig {
    let mut config = MerchantConfig::new(
        format!("{}{}", server.uri(), CHARGE_PATH).parse().unwrap(),
        "https://merchant-server.com/return-url".parse().unwrap(),
    );
    config.credentials.project_key = "pk_test_123".into();
    config.credentials.secret_key = SECRET_KEY.into();
    config.connect_timeout = Duration::from_secs(5);
    config.read_timeout = Some(Duration::from_secs(5));
    config
}

/// A confirmer speaking real HTTP, isolated from the process-wide properties.
pub fn http_confirmer(config: MerchantConfig) -> (ChargeConfirmer, Arc<SecurityProperties>) {
    let properties = Arc::new(SecurityProperties::new());
    let confirmer = ChargeConfirmer::new(Arc::new(config), Arc::new(ReqwestTransport::new()))
        .with_security_properties(properties.clone());
    (confirmer, properties)
}

pub fn http_session(config: MerchantConfig) -> (Arc<PaymentSession>, Arc<InMemorySdk>) {
    let config = Arc::new(config);
    let confirmer = Arc::new(
        ChargeConfirmer::new(config.clone(), Arc::new(ReqwestTransport::new()))
            .with_security_properties(Arc::new(SecurityProperties::new())),
    );
    let sdk = Arc::new(InMemorySdk::new());
    let session = PaymentSession::attach(config, sdk.clone(), confirmer);
    (session, sdk)
}
