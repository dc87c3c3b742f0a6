//! User-related models: trading settings, purchases and trade history

use super::TokenIdentity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the sniper decides which new pools are eligible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnipeMode {
    /// Only buy tokens on the user's allow-list
    AllowListOnly,
    /// Buy anything that passes the liquidity and safety gates
    AutoBuy,
}

/// How a copied trade is sized from the observed trade
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CopyAmountMode {
    /// Always spend the same XRP amount
    Fixed { amount: f64 },
    /// Spend a percentage of what the trader spent, capped per trade
    Percentage {
        percent: f64,
        #[serde(default)]
        max_spend: Option<f64>,
    },
    /// The fixed amount when configured, else 10% of the observed amount
    Fallback {
        #[serde(default)]
        fixed: Option<f64>,
    },
}

impl Default for CopyAmountMode {
    fn default() -> Self {
        CopyAmountMode::Fallback { fixed: None }
    }
}

/// Per-user trading settings, persisted as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    /// Slippage tolerance in percent
    #[serde(default = "default_slippage")]
    pub slippage_percent: f64,
    pub snipe_mode: SnipeMode,
    /// XRP to spend per snipe
    pub snipe_amount_xrp: f64,
    /// Minimum XRP deposited at pool creation (auto-buy mode)
    pub min_pool_liquidity_xrp: f64,
    #[serde(default)]
    pub copy_amount_mode: CopyAmountMode,
}

fn default_slippage() -> f64 {
    4.0
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            slippage_percent: 4.0,
            snipe_mode: SnipeMode::AllowListOnly,
            snipe_amount_xrp: 1.0,
            min_pool_liquidity_xrp: 100.0,
            copy_amount_mode: CopyAmountMode::default(),
        }
    }
}

/// A user of the bot and their automation state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    pub wallet_address: String,
    pub settings: UserSettings,
    pub sniper_active: bool,
    pub copy_trading_active: bool,
    pub sniper_start_time: Option<DateTime<Utc>>,
    /// Only trades executed after this instant are eligible for copying
    pub copy_trading_start_time: Option<DateTime<Utc>>,
}

/// Lifecycle of a sniped position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Active,
    Sold,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Active => "active",
            PurchaseStatus::Sold => "sold",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(PurchaseStatus::Active),
            "sold" => Some(PurchaseStatus::Sold),
            _ => None,
        }
    }
}

/// A token bought by the sniper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SniperPurchase {
    pub token: TokenIdentity,
    pub readable_symbol: String,
    pub xrp_spent: f64,
    pub tokens_received: f64,
    pub tx_hash: String,
    pub status: PurchaseStatus,
    pub timestamp: DateTime<Utc>,
}

impl SniperPurchase {
    pub fn is_active_for(&self, token: &TokenIdentity) -> bool {
        self.status == PurchaseStatus::Active && &self.token == token
    }
}

/// What kind of automated trade a history row records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeKind {
    SnipeBuy,
    CopyBuy,
    CopySell,
}

impl TradeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeKind::SnipeBuy => "snipe_buy",
            TradeKind::CopyBuy => "copy_buy",
            TradeKind::CopySell => "copy_sell",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "snipe_buy" => Some(TradeKind::SnipeBuy),
            "copy_buy" => Some(TradeKind::CopyBuy),
            "copy_sell" => Some(TradeKind::CopySell),
            _ => None,
        }
    }
}

/// One automated trade in a user's history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    pub kind: TradeKind,
    /// Hash of the trader's transaction we mirrored (copy trades only)
    pub original_tx_hash: Option<String>,
    pub our_tx_hash: String,
    /// XRP (buys) or tokens (sells) committed
    pub amount: f64,
    pub token: TokenIdentity,
    pub readable_symbol: String,
    pub trader_address: Option<String>,
    pub tokens_received: Option<f64>,
    pub xrp_spent: Option<f64>,
    pub actual_rate: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Which token list an entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenListKind {
    Allow,
    Block,
}

impl TokenListKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenListKind::Allow => "allow",
            TokenListKind::Block => "block",
        }
    }
}
