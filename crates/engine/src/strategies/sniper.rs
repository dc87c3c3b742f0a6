//! Snipe Evaluator: safety gates for newly discovered pools

use std::collections::HashSet;
use tracing::{debug, info, warn};
use xrpl_trader_core::{
    AccountTxParams, DiscoveredPool, EvaluationVerdict, SnipeMode, SniperPurchase, TokenIdentity,
};
use xrpl_trader_networking::LedgerGateway;

/// Transactions fetched when counting a creator's pool creations
pub const CREATOR_HISTORY_LIMIT: u32 = 1000;

/// LP balance at the pool account below which liquidity counts as locked
pub const LP_LOCK_THRESHOLD: f64 = 1.0;

/// Caller-supplied state the gates run against
#[derive(Debug, Clone)]
pub struct SnipePolicy {
    pub mode: SnipeMode,
    /// Minimum initial XRP liquidity (auto-buy mode)
    pub min_liquidity_xrp: f64,
    pub purchases: Vec<SniperPurchase>,
    pub allow_list: HashSet<TokenIdentity>,
    pub block_list: HashSet<TokenIdentity>,
}

impl Default for SnipePolicy {
    fn default() -> Self {
        Self {
            mode: SnipeMode::AllowListOnly,
            min_liquidity_xrp: 100.0,
            purchases: Vec::new(),
            allow_list: HashSet::new(),
            block_list: HashSet::new(),
        }
    }
}

/// Run the gates in cost order, stopping at the first failure.
///
/// The ledger is only consulted once every local gate has passed: first for
/// the creator's history, then for the pool's LP-token lock.
pub async fn evaluate_snipe_candidate(
    gateway: &dyn LedgerGateway,
    pool: &DiscoveredPool,
    policy: &SnipePolicy,
) -> EvaluationVerdict {
    let mut verdict = EvaluationVerdict::new();
    let symbol = &pool.readable_symbol;

    if policy.purchases.iter().any(|p| p.is_active_for(&pool.token)) {
        return verdict.reject(format!("Already holding {}", symbol));
    }
    verdict.pass(format!("{} not held", symbol));

    if policy.block_list.contains(&pool.token) {
        return verdict.reject(format!("{} is block-listed", symbol));
    }
    verdict.pass("Not block-listed");

    match policy.mode {
        SnipeMode::AllowListOnly => {
            if !policy.allow_list.contains(&pool.token) {
                return verdict.reject(format!("{} is not on the allow-list", symbol));
            }
            verdict.pass(format!("{} is on the allow-list", symbol));
        }
        SnipeMode::AutoBuy => match pool.initial_xrp_liquidity {
            None => verdict.pass("Initial liquidity unknown, accepted"),
            Some(xrp) if xrp < policy.min_liquidity_xrp => {
                return verdict.reject(format!(
                    "Insufficient liquidity: {} XRP < {} XRP",
                    xrp, policy.min_liquidity_xrp
                ));
            }
            Some(xrp) => verdict.pass(format!("Liquidity {} XRP", xrp)),
        },
    }

    if pool.creator.is_empty() {
        return verdict.reject("Unknown pool creator");
    }

    match count_pool_creations(gateway, &pool.creator).await {
        Ok(count) if count <= 1 => verdict.pass(format!("First-time creator ({} pools)", count)),
        Ok(count) => {
            return verdict.reject(format!("Creator has created {} pools", count));
        }
        Err(e) => {
            warn!("Sniper: creator history lookup failed for {}: {}", pool.creator, e);
            return verdict.reject_retryable(format!("Creator history unavailable: {}", e));
        }
    }

    match lp_balance_at_pool(gateway, &pool.token).await {
        Ok(Some(balance)) if balance < LP_LOCK_THRESHOLD => {
            verdict.pass(format!("LP tokens locked ({} at pool)", balance))
        }
        Ok(Some(balance)) => {
            return verdict.reject(format!("LP tokens not locked ({} at pool)", balance));
        }
        Ok(None) => return verdict.reject("AMM pool not found"),
        Err(e) => {
            warn!("Sniper: LP lock lookup failed for {}: {}", symbol, e);
            return verdict.reject_retryable(format!("LP lock check failed: {}", e));
        }
    }

    let verdict = verdict.approve();
    info!("Sniper: {} passed all gates: {}", symbol, verdict.summary());
    verdict
}

/// Successful `AMMCreate` transactions initiated by `creator`
async fn count_pool_creations(
    gateway: &dyn LedgerGateway,
    creator: &str,
) -> xrpl_trader_core::Result<usize> {
    let history = gateway
        .account_transactions(creator, AccountTxParams::oldest_first(CREATOR_HISTORY_LIMIT))
        .await?;
    let count = history
        .iter()
        .filter(|tx| tx.is_type("AMMCreate") && tx.account == creator && tx.succeeded())
        .count();
    debug!("Sniper: creator {} has {} pool creations", creator, count);
    Ok(count)
}

/// LP tokens outstanding on the pool account's trust lines, summed over every
/// line in the LP currency; `None` when there is no pool
async fn lp_balance_at_pool(
    gateway: &dyn LedgerGateway,
    token: &TokenIdentity,
) -> xrpl_trader_core::Result<Option<f64>> {
    let Some(pool) = gateway.pool_info(token).await? else {
        return Ok(None);
    };
    let Some(lp) = pool.lp_token else {
        // No LP token reported
        return Ok(Some(0.0));
    };

    let lines = gateway.account_trust_lines(&pool.pool_account).await?;
    let balance = lines
        .iter()
        .filter(|line| line.currency == lp.currency)
        .map(|line| line.balance.abs())
        .sum();
    Ok(Some(balance))
}
