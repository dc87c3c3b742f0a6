//! Shared process state handed to every session

use crate::config::AppConfig;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use xrpl_trader_core::Result;
use xrpl_trader_engine::{SwapExecutor, TradeClassifier};
use xrpl_trader_networking::{LedgerGateway, ServerSigner, TransactionSigner, XrplClient};
use xrpl_trader_persistence::Database;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<Database>,
    pub gateway: Arc<dyn LedgerGateway>,
    pub executor: Arc<SwapExecutor>,
    /// One classifier (and dedup cache) for every user's copy-trade monitor
    pub classifier: Arc<Mutex<TradeClassifier>>,
    wallet_address: String,
}

impl AppState {
    /// Open the database and connect to the configured ledger node
    pub async fn init(config: AppConfig) -> Result<Self> {
        let db = Database::connect(&config.data_file).await?;
        info!("Database ready at {}", config.data_file.display());

        let client = Arc::new(XrplClient::new(&config.rpc_url)?);
        let signer = ServerSigner::new(client.clone(), &config.wallet_address, &config.wallet_seed)?;
        info!("Ledger node {} for wallet {}", client.url(), config.wallet_address);

        Ok(Self::from_parts(config, db, client, Arc::new(signer)))
    }

    pub fn from_parts(
        config: AppConfig,
        db: Database,
        gateway: Arc<dyn LedgerGateway>,
        signer: Arc<dyn TransactionSigner>,
    ) -> Self {
        let wallet_address = signer.address().to_string();
        Self {
            config: Arc::new(config),
            db: Arc::new(db),
            executor: Arc::new(SwapExecutor::new(gateway.clone(), signer)),
            gateway,
            classifier: Arc::new(Mutex::new(TradeClassifier::new())),
            wallet_address,
        }
    }

    pub fn wallet_address(&self) -> &str {
        &self.wallet_address
    }
}
