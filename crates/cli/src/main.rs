//! Bookcart CLI - run checkouts against the shop backend.
//!
//! # Usage
//!
//! ```bash
//! # Check out a cart with the details in a form file
//! bookcart checkout --cart cart.json --form form.json
//!
//! # Show the server-side cart of the configured session
//! bookcart remote-cart
//! ```
//!
//! # Commands
//!
//! - `checkout` - Load a cart and run one checkout attempt
//! - `remote-cart` - Print the server-side cart
//!
//! Configuration comes from the environment (see `bookcart_checkout::config`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use bookcart_checkout::config::CheckoutConfig;
use bookcart_checkout::state::ShopState;
use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::CommandError;

#[derive(Parser)]
#[command(name = "bookcart")]
#[command(author, version, about = "Bookcart checkout tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a cart and place an order
    Checkout {
        /// JSON file with the cart lines (`[{id, name, price, quantity}]`)
        #[arg(short, long)]
        cart: PathBuf,

        /// JSON file with the delivery and payment details
        #[arg(short, long)]
        form: PathBuf,
    },
    /// Print the server-side cart of the configured session
    RemoteCart,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &CheckoutConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match CheckoutConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt::init();
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bookcart_checkout=info,bookcart_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if sentry_guard.is_some() {
        tracing::info!("Sentry initialized");
    }

    if let Err(e) = run(cli, config).await {
        tracing::error!("Command failed: {e}");
        // process::exit skips destructors; flush pending Sentry events first
        drop(sentry_guard);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: CheckoutConfig) -> Result<(), CommandError> {
    let state = ShopState::new(config)?;

    match cli.command {
        Commands::Checkout { cart, form } => {
            commands::checkout::run(&state, &cart, &form).await?;
        }
        Commands::RemoteCart => commands::remote_cart::run(&state).await?,
    }
    Ok(())
}
