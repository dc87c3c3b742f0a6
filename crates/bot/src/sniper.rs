//! Sniper: buys into newly created pools that pass the safety gates

use crate::scheduler::{spawn_polling_loop, LoopHandle};
use crate::state::AppState;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use xrpl_trader_core::{
    DiscoveredPool, PurchaseStatus, Result, SniperPurchase, SwapFailure, TokenListKind, TradeKind,
    TradeRecord,
};
use xrpl_trader_engine::risk::{check_trade_allowed, RiskLimits};
use xrpl_trader_engine::{discover_new_pools, evaluate_snipe_candidate, SnipePolicy};
use xrpl_trader_persistence::sqlite;

/// Counters for one sniper cycle
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SniperReport {
    pub discovered: usize,
    pub evaluated: usize,
    pub bought: usize,
    pub failed: usize,
}

/// Start the sniper loop for `user_id`
pub fn spawn_sniper(state: AppState, user_id: String) -> LoopHandle {
    let period = state.config.sniper_check_interval;
    let seen = Arc::new(Mutex::new(HashSet::new()));
    let name = format!("Sniper[{}]", user_id);

    spawn_polling_loop(name, period, move || {
        let state = state.clone();
        let user_id = user_id.clone();
        let seen = seen.clone();
        async move {
            match run_sniper_cycle(&state, &user_id, &seen).await {
                Ok(report) if report.bought > 0 || report.failed > 0 => {
                    info!(
                        "Sniper: {} bought, {} failed of {} evaluated for {}",
                        report.bought, report.failed, report.evaluated, user_id
                    );
                }
                Ok(report) => debug!("Sniper: cycle done for {}: {:?}", user_id, report),
                Err(e) => error!("Sniper: cycle failed for {}: {}", user_id, e),
            }
        }
    })
}

/// One pass: discover, evaluate and buy.
///
/// `seen` holds creation hashes this session has settled on, so a pool is
/// dropped once it was bought or definitively rejected. A pool whose check
/// failed on a ledger lookup stays eligible and is retried next tick.
pub async fn run_sniper_cycle(
    state: &AppState,
    user_id: &str,
    seen: &Mutex<HashSet<String>>,
) -> Result<SniperReport> {
    let db = state.db.pool();
    let user = sqlite::require_user(db, user_id).await?;
    let settings = &user.settings;

    let pools = discover_new_pools(state.gateway.as_ref()).await?;
    let mut report = SniperReport {
        discovered: pools.len(),
        ..Default::default()
    };

    let fresh: Vec<DiscoveredPool> = {
        let seen = seen.lock().await;
        pools
            .into_iter()
            .filter(|p| !seen.contains(&p.transaction_hash))
            .take(state.config.max_tokens_per_scan)
            .collect()
    };
    if fresh.is_empty() {
        return Ok(report);
    }

    let mut policy = SnipePolicy {
        mode: settings.snipe_mode,
        min_liquidity_xrp: settings.min_pool_liquidity_xrp,
        purchases: sqlite::list_active_purchases(db, user_id).await?,
        allow_list: sqlite::token_set(db, user_id, TokenListKind::Allow).await?,
        block_list: sqlite::token_set(db, user_id, TokenListKind::Block).await?,
    };
    let limits = RiskLimits::with_max_trade(state.config.max_snipe_amount);
    let amount = settings.snipe_amount_xrp;

    for pool in fresh {
        report.evaluated += 1;
        let verdict = evaluate_snipe_candidate(state.gateway.as_ref(), &pool, &policy).await;
        if !verdict.should_act {
            if verdict.retryable {
                debug!("Sniper: will retry {}: {}", pool.readable_symbol, verdict.summary());
            } else {
                debug!("Sniper: skipping {}: {}", pool.readable_symbol, verdict.summary());
                seen.lock().await.insert(pool.transaction_hash.clone());
            }
            continue;
        }
        info!("Sniper: {} approved ({})", pool.readable_symbol, verdict.summary());

        let balance = match state.gateway.account_info(state.wallet_address()).await {
            Ok(info) => info.balance,
            Err(e) => {
                warn!("Sniper: could not read wallet balance: {}", e);
                report.failed += 1;
                continue;
            }
        };
        if let Err(violation) = check_trade_allowed(&limits, balance, amount) {
            warn!("Sniper: not buying {}: {}", pool.readable_symbol, violation);
            continue;
        }

        let outcome = state
            .executor
            .execute_buy(&pool.token, amount, settings.slippage_percent)
            .await;
        if !outcome.success {
            report.failed += 1;
            if !matches!(outcome.failure, Some(SwapFailure::Transport(_))) {
                seen.lock().await.insert(pool.transaction_hash.clone());
            }
            continue;
        }
        seen.lock().await.insert(pool.transaction_hash.clone());

        let tx_hash = outcome.transaction_hash.clone().unwrap_or_default();
        let tokens_received = outcome.amount_received.unwrap_or(0.0);
        let purchase = SniperPurchase {
            token: pool.token.clone(),
            readable_symbol: pool.readable_symbol.clone(),
            xrp_spent: amount,
            tokens_received,
            tx_hash: tx_hash.clone(),
            status: PurchaseStatus::Active,
            timestamp: Utc::now(),
        };
        sqlite::record_purchase(db, user_id, &purchase).await?;
        sqlite::record_trade(
            db,
            user_id,
            &TradeRecord {
                kind: TradeKind::SnipeBuy,
                original_tx_hash: None,
                our_tx_hash: tx_hash,
                amount,
                token: pool.token.clone(),
                readable_symbol: pool.readable_symbol.clone(),
                trader_address: None,
                tokens_received: outcome.amount_received,
                xrp_spent: Some(amount),
                actual_rate: outcome.effective_rate,
                timestamp: purchase.timestamp,
            },
        )
        .await?;

        info!(
            "Sniper: bought {} {} for {} XRP",
            tokens_received, pool.readable_symbol, amount
        );
        policy.purchases.push(purchase);
        report.bought += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        amm_create, foo, idle_state, ledger_with, pool, settled, state_with, trust_line, WALLET,
    };
    use xrpl_trader_core::{Error, SnipeMode, UserSettings};
    use xrpl_trader_engine::testing::MockGateway;

    fn auto_buy() -> UserSettings {
        UserSettings {
            snipe_mode: SnipeMode::AutoBuy,
            snipe_amount_xrp: 10.0,
            ..UserSettings::default()
        }
    }

    /// A new FOO pool by `rCreator` whose history holds `creations` pools
    fn new_pool_gateway(creations: usize) -> MockGateway {
        let history = (0..creations)
            .map(|i| amm_create(&format!("C{}", i), "rCreator"))
            .collect();
        MockGateway::new()
            .with_ledgers(vec![ledger_with(vec![amm_create("C0", "rCreator")])])
            .with_account_txs("rCreator", history)
            .with_pool(pool(&foo(), 100.0, "5000"))
            .with_lines(
                WALLET,
                vec![vec![trust_line(&foo(), 0.0, 100000.0)], vec![trust_line(&foo(), 480.0, 100000.0)]],
            )
            .with_balances(WALLET, vec![100.0])
            .with_submits(vec![settled("tesSUCCESS", "BUY")])
    }

    #[tokio::test]
    async fn test_unknown_user_fails_cycle() {
        let state = idle_state().await;
        let seen = Mutex::new(HashSet::new());
        let result = run_sniper_cycle(&state, "ghost", &seen).await;
        assert!(matches!(result, Err(Error::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_quiet_ledger_buys_nothing() {
        let state = idle_state().await;
        sqlite::create_user(state.db.pool(), "alice", WALLET, &UserSettings::default())
            .await
            .unwrap();

        let seen = Mutex::new(HashSet::new());
        let report = run_sniper_cycle(&state, "alice", &seen).await.unwrap();
        assert_eq!(report, SniperReport::default());
        assert!(sqlite::list_purchases(state.db.pool(), "alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_ledger_fails_cycle() {
        let state = state_with(Arc::new(MockGateway::new().failing())).await;
        sqlite::create_user(state.db.pool(), "alice", WALLET, &UserSettings::default())
            .await
            .unwrap();

        let seen = Mutex::new(HashSet::new());
        assert!(run_sniper_cycle(&state, "alice", &seen).await.is_err());
    }

    #[tokio::test]
    async fn test_new_pool_is_bought_and_recorded() {
        let gateway = Arc::new(new_pool_gateway(1));
        let state = state_with(gateway.clone()).await;
        let db = state.db.pool();
        sqlite::create_user(db, "alice", WALLET, &auto_buy()).await.unwrap();

        let seen = Mutex::new(HashSet::new());
        let report = run_sniper_cycle(&state, "alice", &seen).await.unwrap();
        assert_eq!(report.bought, 1, "{:?}", report);

        let purchases = sqlite::list_active_purchases(db, "alice").await.unwrap();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].token, foo());
        assert_eq!(purchases[0].tx_hash, "BUY");
        assert!((purchases[0].tokens_received - 480.0).abs() < 1e-9);

        let trades = sqlite::get_trades(db, "alice", 10, 0, Some(TradeKind::SnipeBuy)).await.unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].our_tx_hash, "BUY");
        assert_eq!(trades[0].xrp_spent, Some(10.0));

        // Still in the discovery window, but already settled on
        let again = run_sniper_cycle(&state, "alice", &seen).await.unwrap();
        assert_eq!(again.discovered, 1);
        assert_eq!(again.evaluated, 0);
        assert_eq!(gateway.count_calls("submit:"), 1);
    }

    #[tokio::test]
    async fn test_repeat_creator_pool_is_passed_over() {
        let gateway = Arc::new(new_pool_gateway(2));
        let state = state_with(gateway.clone()).await;
        let db = state.db.pool();
        sqlite::create_user(db, "alice", WALLET, &auto_buy()).await.unwrap();

        let seen = Mutex::new(HashSet::new());
        let report = run_sniper_cycle(&state, "alice", &seen).await.unwrap();
        assert_eq!(report.evaluated, 1);
        assert_eq!(report.bought, 0);
        assert_eq!(gateway.count_calls("amm_info"), 0);
        assert_eq!(gateway.count_calls("submit:"), 0);

        run_sniper_cycle(&state, "alice", &seen).await.unwrap();
        assert_eq!(gateway.count_calls("account_tx:rCreator"), 1);
        assert!(sqlite::list_purchases(db, "alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_lookup_is_retried_next_tick() {
        let gateway = Arc::new(new_pool_gateway(1).fail_next("account_tx:rCreator"));
        let state = state_with(gateway.clone()).await;
        let db = state.db.pool();
        sqlite::create_user(db, "alice", WALLET, &auto_buy()).await.unwrap();

        let seen = Mutex::new(HashSet::new());
        let first = run_sniper_cycle(&state, "alice", &seen).await.unwrap();
        assert_eq!(first.evaluated, 1);
        assert_eq!(first.bought, 0);
        assert!(seen.lock().await.is_empty());

        let second = run_sniper_cycle(&state, "alice", &seen).await.unwrap();
        assert_eq!(second.evaluated, 1);
        assert_eq!(second.bought, 1);
        assert_eq!(sqlite::list_active_purchases(db, "alice").await.unwrap().len(), 1);
    }
}
