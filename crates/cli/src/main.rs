//! Online Shop CLI - manage the local shop from a terminal.
//!
//! Every invocation opens its own context on the durable store, like a
//! fresh tab. Point `ONLINE_SHOP_STORAGE_PATH` at a file to keep data
//! between runs.
//!
//! # Usage
//!
//! ```bash
//! # Remote and custom products, filtered by title
//! shop-cli products list --search backpack
//!
//! # Create a custom product
//! shop-cli products add -t "Shirt" -d "A nice cotton shirt" -c men -p 20 -i https://x/y.png
//!
//! # Clients (seeded from the remote users on first run)
//! shop-cli clients list
//! shop-cli clients update 1718000000000 --city Paris --status deactivated
//!
//! # Cart
//! shop-cli cart add 5
//! shop-cli cart qty 5 3
//! shop-cli cart show
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use clap::{Parser, Subcommand};
use online_shop_core::{ClientId, ClientStatus, ProductId};
use online_shop_storefront::catalog::{CachedCatalog, CatalogClient};
use online_shop_storefront::slices::Entropy;
use online_shop_storefront::storage::StorageArea;
use online_shop_storefront::{AppError, ShopConfig, ShopState};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Shop state as used by every command.
pub type Shop = ShopState<CachedCatalog<CatalogClient>>;

#[derive(Parser)]
#[command(name = "shop-cli")]
#[command(author, version, about = "Online Shop CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse and manage products
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// List remote categories
    Categories,
    /// Manage clients
    Clients {
        #[command(subcommand)]
        action: ClientAction,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// List custom and remote products
    List {
        /// Case-insensitive title filter
        #[arg(short, long, default_value = "")]
        search: String,
    },
    /// Create a custom product
    Add {
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        description: String,
        #[arg(short, long)]
        category: String,
        #[arg(short, long)]
        price: Decimal,
        /// Image URL
        #[arg(short, long)]
        image: String,
    },
    /// Edit a custom product
    Update {
        id: ProductId,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(short, long)]
        price: Option<Decimal>,
        #[arg(short, long)]
        image: Option<String>,
    },
    /// Delete a custom product
    Remove { id: ProductId },
}

#[derive(Subcommand)]
enum ClientAction {
    /// List clients, seeding from remote users on first run
    List,
    /// Create a client
    Add {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        street: String,
        #[arg(long)]
        number: String,
        #[arg(long)]
        zip_code: String,
        #[arg(long)]
        city: String,
    },
    /// Edit a client
    Update {
        id: ClientId,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        street: Option<String>,
        #[arg(long)]
        number: Option<String>,
        #[arg(long)]
        zip_code: Option<String>,
        #[arg(long)]
        city: Option<String>,
        /// `activated` or `deactivated`
        #[arg(long)]
        status: Option<ClientStatus>,
    },
    /// Delete a client
    Remove { id: ClientId },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart lines and totals
    Show,
    /// Add one unit of a product
    Add { product_id: ProductId },
    /// Remove a product's line
    Remove { product_id: ProductId },
    /// Set a line's quantity (values below 1 become 1)
    Qty {
        product_id: ProductId,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Empty the cart
    Clear,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ShopConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
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

fn init_tracing() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "online_shop_storefront=info,online_shop_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ShopConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing();
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(2);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    if let Err(e) = run(cli, config).await {
        e.capture();
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

fn open_shop(config: ShopConfig) -> Result<Shop, AppError> {
    let area = match &config.storage_path {
        Some(path) => StorageArea::open(path)?,
        None => {
            tracing::warn!("ONLINE_SHOP_STORAGE_PATH not set, changes will not outlive this run");
            StorageArea::in_memory()
        }
    };
    let client = CatalogClient::new(&config.catalog)
        .map_err(|e| AppError::Internal(format!("HTTP client: {e}")))?;
    let catalog = CachedCatalog::new(client, config.catalog.cache_ttl);
    Ok(ShopState::new(
        config,
        area.context(),
        catalog,
        Arc::new(Entropy::system()),
    ))
}

async fn run(cli: Cli, config: ShopConfig) -> Result<(), AppError> {
    let shop = open_shop(config)?;
    shop.mount();

    let result = match cli.command {
        Commands::Products { action } => match action {
            ProductAction::List { search } => commands::products::list(&shop, &search).await,
            ProductAction::Add {
                title,
                description,
                category,
                price,
                image,
            } => commands::products::add(
                &shop,
                online_shop_core::ProductDraft {
                    title,
                    description,
                    category,
                    price: price.into(),
                    image,
                },
            ),
            ProductAction::Update {
                id,
                title,
                description,
                category,
                price,
                image,
            } => commands::products::update(
                &shop,
                id,
                commands::products::ProductEdit {
                    title,
                    description,
                    category,
                    price: price.map(Into::into),
                    image,
                },
            ),
            ProductAction::Remove { id } => {
                commands::products::remove(&shop, id);
                Ok(())
            }
        },
        Commands::Categories => {
            commands::products::categories(&shop).await;
            Ok(())
        }
        Commands::Clients { action } => match action {
            ClientAction::List => commands::clients::list(&shop).await,
            ClientAction::Add {
                first_name,
                last_name,
                email,
                phone,
                street,
                number,
                zip_code,
                city,
            } => commands::clients::add(
                &shop,
                online_shop_core::ClientDraft {
                    first_name,
                    last_name,
                    email,
                    phone,
                    street,
                    number,
                    zip_code,
                    city,
                },
            ),
            ClientAction::Update {
                id,
                first_name,
                last_name,
                email,
                phone,
                street,
                number,
                zip_code,
                city,
                status,
            } => commands::clients::update(
                &shop,
                id,
                commands::clients::ClientEdit {
                    first_name,
                    last_name,
                    email,
                    phone,
                    street,
                    number,
                    zip_code,
                    city,
                    status,
                },
            ),
            ClientAction::Remove { id } => {
                commands::clients::remove(&shop, id);
                Ok(())
            }
        },
        Commands::Cart { action } => match action {
            CartAction::Show => {
                commands::cart::show(&shop);
                Ok(())
            }
            CartAction::Add { product_id } => commands::cart::add(&shop, product_id).await,
            CartAction::Remove { product_id } => {
                commands::cart::remove(&shop, product_id);
                Ok(())
            }
            CartAction::Qty {
                product_id,
                quantity,
            } => {
                commands::cart::set_quantity(&shop, product_id, quantity);
                Ok(())
            }
            CartAction::Clear => {
                commands::cart::clear(&shop);
                Ok(())
            }
        },
    };

    shop.teardown().await;
    result
}
