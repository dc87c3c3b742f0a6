//! XRPL trader - command-line entry point

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use xrpl_trader::{parse_token_arg, AppConfig, AppState, UserSession};
use xrpl_trader_core::{TokenListKind, UserSettings};
use xrpl_trader_persistence::sqlite;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    Sniper,
    CopyTrading,
    Both,
}

#[derive(Parser, Debug)]
#[command(version, about = "Snipe new XRPL AMM pools and copy other traders")]
struct Args {
    /// User whose settings and lists drive the session
    #[arg(long)]
    user: String,

    /// Which automations to run
    #[arg(long, value_enum, default_value_t = Mode::Both)]
    mode: Mode,

    /// Create the user with default settings if it does not exist
    #[arg(long)]
    create_user: bool,

    /// Follow a trader account for copy trading (repeatable)
    #[arg(long = "follow", value_name = "ADDRESS")]
    follow: Vec<String>,

    /// Add a token to the allow-list (repeatable)
    #[arg(long = "allow", value_name = "CURRENCY:ISSUER")]
    allow: Vec<String>,

    /// Add a token to the block-list (repeatable)
    #[arg(long = "block", value_name = "CURRENCY:ISSUER")]
    block: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "xrpl_trader=debug,xrpl_trader_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = AppConfig::from_env().context("failed to load configuration")?;
    info!("Starting XRPL trader for {}", args.user);

    let defaults = UserSettings {
        slippage_percent: config.default_slippage,
        min_pool_liquidity_xrp: config.min_liquidity,
        ..UserSettings::default()
    };
    let state = AppState::init(config).await.context("failed to initialise")?;
    let db = state.db.pool();

    if sqlite::get_user(db, &args.user).await?.is_none() {
        if !args.create_user {
            bail!("user {} does not exist (pass --create-user to create it)", args.user);
        }
        sqlite::create_user(db, &args.user, state.wallet_address(), &defaults).await?;
        info!("Created user {}", args.user);
    }

    for address in &args.follow {
        if !address.starts_with('r') {
            warn!("Ignoring invalid trader address {}", address);
            continue;
        }
        sqlite::add_copy_trader(db, &args.user, address).await?;
        info!("Following {}", address);
    }
    for (kind, raw_tokens) in [(TokenListKind::Allow, &args.allow), (TokenListKind::Block, &args.block)] {
        for raw in raw_tokens {
            let token = parse_token_arg(raw)?;
            sqlite::add_to_token_list(db, &args.user, kind, &token).await?;
            info!("Added {} to the {}-list", token.readable_symbol(), kind.as_str());
        }
    }

    let mut session = UserSession::new(state.clone(), args.user.clone());
    if matches!(args.mode, Mode::Sniper | Mode::Both) {
        session.start_sniper().await?;
    }
    if matches!(args.mode, Mode::CopyTrading | Mode::Both) {
        session.start_copy_trading().await?;
    }

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    info!("Shutting down");
    session.shutdown().await;

    Ok(())
}
