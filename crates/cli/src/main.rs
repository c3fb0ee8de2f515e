//! RedSeam CLI - account, catalogue and cart from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Log in (password may also come from REDSEAM_PASSWORD)
//! redseam login -e nika@redberry.ge -p secret
//!
//! # Browse the catalogue
//! redseam products --price-from 50 --sort price
//! redseam product 4
//!
//! # Work with the cart
//! redseam cart add 4 --color Blue --size L
//! redseam cart inc 4 --color Blue --size L
//! redseam cart show
//! redseam cart checkout --name Nino --surname Beridze \
//!     --email nino@example.com --address "12 Rustaveli Ave" --zipcode 01080
//! ```
//!
//! # Commands
//!
//! - `login`, `register`, `logout` - Account management
//! - `products`, `product` - Catalogue browsing
//! - `cart` - Cart inspection, editing and checkout

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use redseam_storefront::api::ProductSort;
use redseam_storefront::config::StorefrontConfig;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{CliError, Context};

#[derive(Parser)]
#[command(name = "redseam")]
#[command(author, version, about = "RedSeam storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the bearer token
    Login {
        /// Account email (`...@redberry.ge`)
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "REDSEAM_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and log in
    Register {
        /// Account email (`...@redberry.ge`)
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        username: String,

        /// Account password
        #[arg(short, long, env = "REDSEAM_PASSWORD", hide_env_values = true)]
        password: String,

        /// Password confirmation (defaults to the password)
        #[arg(long)]
        confirm: Option<String>,

        /// Avatar image (jpeg, png, gif or webp, at most 1 MiB)
        #[arg(long)]
        avatar: Option<PathBuf>,
    },
    /// Forget the stored token and avatar
    Logout,
    /// List products
    Products {
        /// Page number
        #[arg(long)]
        page: Option<u32>,

        /// Minimum price
        #[arg(long)]
        price_from: Option<u32>,

        /// Maximum price
        #[arg(long)]
        price_to: Option<u32>,

        /// Sort order
        #[arg(long, value_enum)]
        sort: Option<SortArg>,
    },
    /// Show one product
    Product {
        /// Product ID
        id: i32,
    },
    /// Inspect and edit the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart and its totals
    Show,
    /// Add a line item
    Add {
        #[command(flatten)]
        line: LineArgs,

        /// Number of units (1-10)
        #[arg(short, long, default_value_t = 1)]
        quantity: i64,

        /// Image to remember for this product and color
        #[arg(long)]
        image: Option<String>,
    },
    /// Set a line item's quantity
    Set {
        #[command(flatten)]
        line: LineArgs,

        /// New quantity (1-10)
        #[arg(short, long)]
        quantity: i64,
    },
    /// Add one unit to a line item
    Inc {
        #[command(flatten)]
        line: LineArgs,
    },
    /// Take one unit off a line item
    Dec {
        #[command(flatten)]
        line: LineArgs,
    },
    /// Remove a line item
    Remove {
        #[command(flatten)]
        line: LineArgs,
    },
    /// Place the order and empty the cart
    Checkout {
        #[arg(long)]
        name: String,

        #[arg(long)]
        surname: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        address: String,

        /// Five-digit zip code
        #[arg(long)]
        zipcode: String,
    },
}

/// Identity of one line item.
#[derive(clap::Args)]
struct LineArgs {
    /// Product ID
    id: i32,

    /// Color
    #[arg(short, long)]
    color: String,

    /// Size
    #[arg(short, long)]
    size: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    /// Cheapest first
    Price,
    /// Most expensive first
    PriceDesc,
    /// Newest first
    Newest,
}

impl From<SortArg> for ProductSort {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::Price => Self::PriceAscending,
            SortArg::PriceDesc => Self::PriceDescending,
            SortArg::Newest => Self::Newest,
        }
    }
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
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

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln_error(&e.to_string());
            std::process::exit(2);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "redseam_storefront=info,redseam_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, config).await {
        if e.requires_login() {
            tracing::error!("Not logged in. Run `redseam login` first.");
        } else {
            tracing::error!("Command failed: {e}");
        }
        std::process::exit(1);
    }
}

/// Report a failure before logging is set up.
#[allow(clippy::print_stderr)]
fn eprintln_error(message: &str) {
    eprintln!("Configuration error: {message}");
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), CliError> {
    let ctx = Context::new(config)?;

    match cli.command {
        Commands::Login { email, password } => {
            commands::account::login(&ctx, email, password).await?;
        }
        Commands::Register {
            email,
            username,
            password,
            confirm,
            avatar,
        } => {
            commands::account::register(&ctx, email, username, password, confirm, avatar).await?;
        }
        Commands::Logout => commands::account::logout(&ctx).await?,
        Commands::Products {
            page,
            price_from,
            price_to,
            sort,
        } => {
            let query = redseam_storefront::api::ProductQuery {
                page,
                price_from,
                price_to,
                sort: sort.map(Into::into),
            };
            commands::catalogue::products(&ctx, &query).await?;
        }
        Commands::Product { id } => commands::catalogue::product(&ctx, id).await?,
        Commands::Cart { action } => run_cart(&ctx, action).await?,
    }
    Ok(())
}

async fn run_cart(ctx: &Context, action: CartAction) -> Result<(), CliError> {
    use commands::cart;

    match action {
        CartAction::Show => cart::show(ctx).await,
        CartAction::Add {
            line,
            quantity,
            image,
        } => {
            cart::add(
                ctx,
                line.id,
                quantity,
                &line.color,
                &line.size,
                image.as_deref(),
            )
            .await
        }
        CartAction::Set { line, quantity } => {
            cart::set(ctx, line.id, quantity, &line.color, &line.size).await
        }
        CartAction::Inc { line } => cart::step(ctx, line.id, &line.color, &line.size, 1).await,
        CartAction::Dec { line } => cart::step(ctx, line.id, &line.color, &line.size, -1).await,
        CartAction::Remove { line } => cart::remove(ctx, line.id, &line.color, &line.size).await,
        CartAction::Checkout {
            name,
            surname,
            email,
            address,
            zipcode,
        } => {
            let details = redseam_core::CustomerDetails {
                name,
                surname,
                email,
                address,
                zipcode,
            };
            cart::checkout(ctx, &details).await
        }
    }
}
