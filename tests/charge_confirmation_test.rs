mod common;

use gamepay_brick::application::confirmation::ConfirmationState;
use gamepay_brick::infrastructure::http::{API_KEY_HEADER, FORM_CONTENT_TYPE};
use gamepay_brick::infrastructure::in_memory::InMemorySdk;
use gamepay_brick::infrastructure::security_properties::DNS_CACHE_TTL;
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;
use url::form_urlencoded;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_successful_charge_feeds_body_to_sdk() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(common::CHARGE_PATH))
        .and(header("content-type", FORM_CONTENT_TYPE))
        .and(header(API_KEY_HEADER, common::SECRET_KEY))
        .and(body_string_contains("amount=1234.50"))
        .and(body_string_contains("secure_return_method=url"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK:123"))
        .expect(1)
        .mount(&server)
        .await;

    let (confirmer, _) = common::http_confirmer(common::merchant_config(&server));
    let sdk = InMemorySdk::new();
    let state = confirmer
        .confirm("tok_abc", "user@example.com", dec!(1234.5), "USD", &sdk, &CancellationToken::new())
        .await;

    assert_eq!(state, ConfirmationState::Succeeded("OK:123".into()));
    assert_eq!(sdk.responses(), ["OK:123"]);
    assert!(sdk.errors().is_empty());
}

#[tokio::test]
async fn test_declined_charge_reports_error_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(common::CHARGE_PATH))
        .respond_with(ResponseTemplate::new(402).set_body_string("insufficient_funds"))
        .expect(1)
        .mount(&server)
        .await;

    let (confirmer, _) = common::http_confirmer(common::merchant_config(&server));
    let sdk = InMemorySdk::new();
    let state = confirmer
        .confirm("tok_abc", "user@example.com", dec!(5), "USD", &sdk, &CancellationToken::new())
        .await;

    assert_eq!(state, ConfirmationState::Failed("insufficient_funds".into()));
    assert_eq!(sdk.errors(), ["insufficient_funds"]);
    assert!(sdk.responses().is_empty());
}

#[tokio::test]
async fn test_form_body_is_complete() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;

    let (confirmer, _) = common::http_confirmer(common::merchant_config(&server));
    let sdk = InMemorySdk::new();
    confirmer
        .confirm("tok abc", "user@example.com", dec!(0.3), "KRW", &sdk, &CancellationToken::new())
        .await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let fields: Vec<(String, String)> = form_urlencoded::parse(&requests[0].body)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    assert_eq!(fields[0], ("token".into(), "tok abc".into()));
    assert_eq!(fields[1], ("email".into(), "user@example.com".into()));
    assert_eq!(fields[2], ("amount".into(), "0.30".into()));
    assert_eq!(fields[3], ("currency".into(), "KRW".into()));
    assert_eq!(fields[4], ("secure_return_method".into(), "url".into()));
    assert_eq!(fields[5].0, "secure_redirect_url");
    assert!(fields[5].1.starts_with("https://merchant-server.com/return-url/index?token=tok+abc"));
    assert!(fields[5].1.ends_with("&amount=0.30&currency=KRW"));
}

#[tokio::test]
async fn test_unreachable_endpoint_reports_connection_error() {
    // Bind then release a port so nothing listens on it.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let server = MockServer::start().await;
    let mut config = common::merchant_config(&server);
    config.charge_endpoint = format!("http://127.0.0.1:{port}/api/charge").parse().unwrap();

    let (confirmer, properties) = common::http_confirmer(config);
    let sdk = InMemorySdk::new();
    let state = confirmer
        .confirm("tok", "user@example.com", dec!(1), "USD", &sdk, &CancellationToken::new())
        .await;

    assert!(matches!(state, ConfirmationState::Failed(_)));
    let errors = sdk.errors();
    assert_eq!(errors.len(), 1);
    assert!(!errors[0].is_empty());
    assert!(sdk.responses().is_empty());
    assert_eq!(properties.get(DNS_CACHE_TTL), None);
}

#[tokio::test]
async fn test_dns_ttl_restored_after_http_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;

    let (confirmer, properties) = common::http_confirmer(common::merchant_config(&server));
    properties.set(DNS_CACHE_TTL, "120").unwrap();

    let sdk = InMemorySdk::new();
    confirmer
        .confirm("tok", "user@example.com", dec!(1), "USD", &sdk, &CancellationToken::new())
        .await;

    assert_eq!(properties.get(DNS_CACHE_TTL).as_deref(), Some("120"));
}
