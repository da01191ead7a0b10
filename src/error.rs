use thiserror::Error;

/// Configuration errors raised while building a [`crate::config::MerchantConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Error, Debug)]
pub enum GamePayError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Transport(String),
    /// The merchant answered outside 2xx. Displays the error body verbatim.
    #[error("{body}")]
    Rejected { status: u16, body: String },
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Revoked certificate presented by {host}")]
    CertificateRevoked { host: String, fingerprint: String },
    #[error("TLS setup failed: {0}")]
    Tls(String),
    #[error("Charge confirmation cancelled")]
    Cancelled,
    #[error("Security property {0} is read-only")]
    PropertyDenied(String),
    #[error("A payment is already in progress")]
    PaymentInProgress,
    #[error("The previous payment outcome has not been cleared")]
    OutcomePending,
    #[error("SDK error: {0}")]
    Sdk(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, GamePayError>;
