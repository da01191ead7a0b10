use clap::{Args, Parser, Subcommand};
use gamepay_brick::application::confirmation::{ChargeConfirmer, ConfirmationState};
use gamepay_brick::config::MerchantConfig;
use gamepay_brick::domain::charge::ChargeAmount;
use gamepay_brick::domain::request::PaymentRequest;
use gamepay_brick::domain::response::{Classification, classify};
use gamepay_brick::domain::session::PendingPaymentContext;
use gamepay_brick::infrastructure::http::ReqwestTransport;
use gamepay_brick::interfaces::console::{ConsoleSink, sdk_response};
use miette::{IntoDiagnostic, Result};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify an SDK callback and print the resulting outcome
    Classify {
        /// Result code, e.g. SUCCESSFUL or MERCHANT_PROCESSING
        #[arg(long)]
        code: String,

        /// Callback extras as a JSON object of strings
        #[arg(long)]
        extras: Option<String>,
    },
    /// Print the payment request that would be handed to the SDK
    Request {
        #[arg(long)]
        amount: Option<ChargeAmount>,

        #[arg(long)]
        currency: Option<String>,

        #[arg(long)]
        country: Option<String>,
    },
    /// Confirm a brick charge against the merchant endpoint
    Charge(ChargeArgs),
}

#[derive(Args)]
struct ChargeArgs {
    #[arg(long)]
    token: String,

    #[arg(long)]
    email: String,

    /// Accepts `.` or `,` as decimal separator
    #[arg(long)]
    amount: ChargeAmount,

    #[arg(long, default_value = "USD")]
    currency: String,

    /// Overrides GAMEPAY_CHARGE_ENDPOINT
    #[arg(long)]
    endpoint: Option<url::Url>,

    /// Overrides GAMEPAY_SECRET_KEY
    #[arg(long)]
    secret_key: Option<String>,

    #[arg(long)]
    connect_timeout_ms: Option<u64>,

    /// `0` leaves reads unbounded
    #[arg(long)]
    read_timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Classify { code, extras } => {
            let response = sdk_response(&code, extras.as_deref()).into_diagnostic()?;
            match classify(&response) {
                Classification::Outcome(outcome) => println!("{outcome}"),
                Classification::RequiresConfirmation { token, email } => {
                    println!("requires confirmation: token={token} email={email}")
                }
                Classification::Ignored => println!("ignored"),
            }
        }
        Command::Request {
            amount,
            currency,
            country,
        } => {
            let config = MerchantConfig::from_env().into_diagnostic()?;
            let mut context = PendingPaymentContext::new(&config.defaults);
            if let Some(amount) = amount {
                context.charge_amount = amount.value();
            }
            if let Some(currency) = currency {
                context.charge_currency = currency;
            }
            if let Some(country) = country {
                context.country = country;
            }
            let request = PaymentRequest::from_session(&config, &context);
            let json = serde_json::to_string_pretty(&request).into_diagnostic()?;
            println!("{json}");
        }
        Command::Charge(args) => {
            let config = MerchantConfig::from_env().into_diagnostic()?;
            charge(config, args).await?
        }
    }

    Ok(())
}

async fn charge(mut config: MerchantConfig, args: ChargeArgs) -> Result<()> {
    if let Some(endpoint) = args.endpoint {
        config.charge_endpoint = endpoint;
    }
    if let Some(secret_key) = args.secret_key {
        config.credentials.secret_key = secret_key;
    }
    if let Some(ms) = args.connect_timeout_ms {
        config.connect_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = args.read_timeout_ms {
        config.read_timeout = (ms > 0).then(|| Duration::from_millis(ms));
    }

    let sink = Arc::new(ConsoleSink::new(io::stdout(), io::stderr()));
    let confirmer = ChargeConfirmer::new(Arc::new(config), Arc::new(ReqwestTransport::new()))
        .with_security_events(sink.clone());

    let state = confirmer
        .confirm(
            &args.token,
            &args.email,
            args.amount.value(),
            &args.currency,
            sink.as_ref(),
            &CancellationToken::new(),
        )
        .await;

    match state {
        ConfirmationState::Failed(message) => Err(miette::miette!("charge failed: {message}")),
        _ => Ok(()),
    }
}
