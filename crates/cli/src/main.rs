//! Go Marketplace CLI - Inspect and edit the local cart.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart
//! gm-cli show
//!
//! # Add a product (repeat to add more units)
//! gm-cli add --id 1 --title Shoe --image-url https://img.example/1.png --price 100
//!
//! # Change quantities
//! gm-cli increment 1
//! gm-cli decrement 1
//!
//! # Drop a line, or everything
//! gm-cli remove 1
//! gm-cli clear
//! ```
//!
//! The cart is stored in the JSON file named by `CART_STORAGE_PATH`; see
//! `go_marketplace_cart::config` for the other variables.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use go_marketplace_core::ProductId;
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::CommandError;

#[derive(Parser)]
#[command(name = "gm-cli")]
#[command(author, version, about = "Go Marketplace cart tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the cart lines and totals
    Show,
    /// Add one unit of a product
    Add {
        /// Product ID
        #[arg(long)]
        id: ProductId,

        /// Product title
        #[arg(long)]
        title: String,

        /// Product image URL
        #[arg(long, default_value = "")]
        image_url: String,

        /// Unit price (e.g. 19.99)
        #[arg(long)]
        price: Decimal,
    },
    /// Add one unit to a line
    Increment {
        /// Product ID
        id: ProductId,
    },
    /// Take one unit from a line
    Decrement {
        /// Product ID
        id: ProductId,
    },
    /// Drop a line regardless of quantity
    Remove {
        /// Product ID
        id: ProductId,
    },
    /// Drop every line
    Clear,
    /// Rewrite the stored cart from the current contents
    Flush,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok().filter(|dsn| !dsn.is_empty())?;

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load .env file if present (ignore errors if not found)
    let _ = dotenvy::dotenv();

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry();

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "go_marketplace_cart=info,gm_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CommandError> {
    let store = commands::open_store().await?;

    match cli.command {
        Commands::Show => {}
        Commands::Add {
            id,
            title,
            image_url,
            price,
        } => commands::add(&store, id, title, image_url, price).await?,
        Commands::Increment { id } => commands::increment(&store, &id).await?,
        Commands::Decrement { id } => commands::decrement(&store, &id).await?,
        Commands::Remove { id } => commands::remove(&store, &id).await?,
        Commands::Clear => commands::clear(&store).await?,
        Commands::Flush => commands::flush(&store).await?,
    }

    commands::show(&store).await
}
