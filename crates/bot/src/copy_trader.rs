//! Copy trader: mirrors the buys and sells of followed accounts

use crate::scheduler::{spawn_polling_loop, LoopHandle};
use crate::state::AppState;
use chrono::Utc;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};
use xrpl_trader_core::{
    find_trust_line, Result, TokenIdentity, TokenListKind, TradeDirection, TradeKind, TradeRecord,
    UserProfile, AMOUNT_EPSILON,
};
use xrpl_trader_engine::{check_trader_transactions, compute_copy_amount, copy_sell_amount, ObservedTrade};
use xrpl_trader_persistence::sqlite;

/// Counters for one copy-trading cycle
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CopyReport {
    pub traders: usize,
    pub observed: usize,
    pub copied: usize,
}

/// Start the copy-trading loop for `user_id`
pub fn spawn_copy_trader(state: AppState, user_id: String) -> LoopHandle {
    let period = state.config.copy_trading_check_interval;
    let name = format!("CopyTrader[{}]", user_id);

    spawn_polling_loop(name, period, move || {
        let state = state.clone();
        let user_id = user_id.clone();
        async move {
            match run_copy_cycle(&state, &user_id).await {
                Ok(report) if report.copied > 0 => {
                    info!(
                        "CopyTrader: copied {} of {} trades for {}",
                        report.copied, report.observed, user_id
                    );
                }
                Ok(report) => debug!("CopyTrader: cycle done for {}: {:?}", user_id, report),
                Err(e) => error!("CopyTrader: cycle failed for {}: {}", user_id, e),
            }
        }
    })
}

/// One pass over every followed trader
pub async fn run_copy_cycle(state: &AppState, user_id: &str) -> Result<CopyReport> {
    let db = state.db.pool();
    let user = sqlite::require_user(db, user_id).await?;

    let watermark = match user.copy_trading_start_time {
        Some(start) => start,
        None => {
            let now = Utc::now();
            sqlite::set_copy_start_time(db, user_id, now).await?;
            info!("CopyTrader: copying trades after {} for {}", now, user_id);
            now
        }
    };

    let traders = sqlite::list_copy_traders(db, user_id).await?;
    let mut report = CopyReport {
        traders: traders.len(),
        ..Default::default()
    };
    if traders.is_empty() {
        return Ok(report);
    }

    let block_list = sqlite::token_set(db, user_id, TokenListKind::Block).await?;

    for trader in traders {
        let trades = match check_trader_transactions(
            state.gateway.as_ref(),
            &state.classifier,
            &trader.trader_address,
            Some(watermark),
            Utc::now(),
            state.config.max_transactions_to_check,
        )
        .await
        {
            Ok(trades) => trades,
            Err(e) => {
                warn!("CopyTrader: could not read {}: {}", trader.trader_address, e);
                continue;
            }
        };

        for trade in trades {
            report.observed += 1;
            match copy_trade(state, &user, &trade, &block_list).await {
                Ok(true) => report.copied += 1,
                Ok(false) => {}
                Err(e) => warn!("CopyTrader: failed to copy {}: {}", trade.tx_hash, e),
            }
        }
    }

    Ok(report)
}

/// Mirror one observed trade. `Ok(false)` means it was skipped or did not settle.
async fn copy_trade(
    state: &AppState,
    user: &UserProfile,
    trade: &ObservedTrade,
    block_list: &HashSet<TokenIdentity>,
) -> Result<bool> {
    let db = state.db.pool();
    let event = &trade.event;
    let settings = &user.settings;

    if sqlite::was_transaction_copied(db, &user.user_id, &trade.tx_hash).await? {
        debug!("CopyTrader: {} already copied", trade.tx_hash);
        return Ok(false);
    }
    if block_list.contains(&event.token) {
        debug!("CopyTrader: {} is block-listed", event.readable_symbol);
        return Ok(false);
    }
    let Some(copy_xrp) = compute_copy_amount(event.xrp_amount, &settings.copy_amount_mode) else {
        debug!("CopyTrader: no copy amount for {}", trade.tx_hash);
        return Ok(false);
    };

    info!(
        "CopyTrader: {} {} {} ({} XRP) by {}",
        event.direction.as_str(),
        event.token_amount,
        event.readable_symbol,
        event.xrp_amount,
        trade.trader
    );

    let (kind, amount, held, outcome) = match event.direction {
        TradeDirection::Buy => {
            let outcome = state
                .executor
                .execute_buy(&event.token, copy_xrp, settings.slippage_percent)
                .await;
            (TradeKind::CopyBuy, copy_xrp, None, outcome)
        }
        TradeDirection::Sell => {
            let lines = state.gateway.account_trust_lines(state.wallet_address()).await?;
            let held = find_trust_line(&lines, &event.token).map_or(0.0, |l| l.balance);
            let Some(tokens) = copy_sell_amount(copy_xrp, event, held) else {
                debug!("CopyTrader: holding no {} to sell", event.readable_symbol);
                return Ok(false);
            };
            let outcome = state
                .executor
                .execute_sell(&event.token, tokens, settings.slippage_percent)
                .await;
            (TradeKind::CopySell, tokens, Some(held), outcome)
        }
    };

    if !outcome.success {
        return Ok(false);
    }

    let (tokens_received, xrp_spent) = match kind {
        TradeKind::CopySell => (None, None),
        _ => (outcome.amount_received, Some(amount)),
    };
    sqlite::record_trade(
        db,
        &user.user_id,
        &TradeRecord {
            kind,
            original_tx_hash: Some(trade.tx_hash.clone()),
            our_tx_hash: outcome.transaction_hash.clone().unwrap_or_default(),
            amount,
            token: event.token.clone(),
            readable_symbol: event.readable_symbol.clone(),
            trader_address: Some(trade.trader.clone()),
            tokens_received,
            xrp_spent,
            actual_rate: outcome.effective_rate,
            timestamp: Utc::now(),
        },
    )
    .await?;

    if let Some(held) = held {
        if held - amount <= AMOUNT_EPSILON {
            let closed = sqlite::mark_purchase_sold(db, &user.user_id, &event.token).await?;
            if closed > 0 {
                info!("CopyTrader: position in {} closed", event.readable_symbol);
            }
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        amm_swap, foo, idle_state, pool, settled, state_with, trust_line, WALLET,
    };
    use chrono::Duration;
    use std::sync::Arc;
    use xrpl_trader_core::{CopyAmountMode, PurchaseStatus, SniperPurchase, UserSettings};
    use xrpl_trader_engine::testing::MockGateway;

    fn copy_two_xrp() -> UserSettings {
        UserSettings {
            copy_amount_mode: CopyAmountMode::Fixed { amount: 2.0 },
            ..UserSettings::default()
        }
    }

    /// Trader spent 10 XRP on 500 FOO
    fn trader_buy(hash: &str) -> xrpl_trader_core::TransactionRecord {
        let when = Utc::now() - Duration::seconds(5);
        amm_swap(hash, "rTrader", when, ("110000000", "100000000"), ("1000", "1500"))
    }

    /// Trader sold 500 FOO for 10 XRP
    fn trader_sell(hash: &str) -> xrpl_trader_core::TransactionRecord {
        let when = Utc::now() - Duration::seconds(5);
        amm_swap(hash, "rTrader", when, ("100000000", "110000000"), ("1500", "1000"))
    }

    async fn following_state(gateway: Arc<MockGateway>) -> AppState {
        let state = state_with(gateway).await;
        let db = state.db.pool();
        sqlite::create_user(db, "alice", WALLET, &copy_two_xrp()).await.unwrap();
        sqlite::set_copy_start_time(db, "alice", Utc::now() - Duration::seconds(30)).await.unwrap();
        sqlite::add_copy_trader(db, "alice", "rTrader").await.unwrap();
        state
    }

    #[tokio::test]
    async fn test_first_cycle_stamps_watermark() {
        let state = idle_state().await;
        let db = state.db.pool();
        sqlite::create_user(db, "alice", WALLET, &UserSettings::default()).await.unwrap();
        assert!(sqlite::get_user(db, "alice").await.unwrap().unwrap().copy_trading_start_time.is_none());

        let report = run_copy_cycle(&state, "alice").await.unwrap();
        assert_eq!(report, CopyReport::default());

        let user = sqlite::get_user(db, "alice").await.unwrap().unwrap();
        assert!(user.copy_trading_start_time.is_some());
    }

    #[tokio::test]
    async fn test_unreachable_trader_is_skipped() {
        let state = state_with(Arc::new(MockGateway::new().failing())).await;
        let db = state.db.pool();
        sqlite::create_user(db, "alice", WALLET, &UserSettings::default()).await.unwrap();
        sqlite::add_copy_trader(db, "alice", "rTrader").await.unwrap();

        let report = run_copy_cycle(&state, "alice").await.unwrap();
        assert_eq!(report.traders, 1);
        assert_eq!(report.observed, 0);
    }

    #[tokio::test]
    async fn test_trader_buy_is_copied() {
        // 50 FOO per XRP; copying with 2 XRP expects 100, lands 96
        let gateway = Arc::new(
            MockGateway::new()
                .with_account_txs("rTrader", vec![trader_buy("T1")])
                .with_pool(pool(&foo(), 100.0, "5000"))
                .with_lines(
                    WALLET,
                    vec![vec![trust_line(&foo(), 0.0, 100000.0)], vec![trust_line(&foo(), 96.0, 100000.0)]],
                )
                .with_submits(vec![settled("tesSUCCESS", "COPY")]),
        );
        let state = following_state(gateway.clone()).await;

        let report = run_copy_cycle(&state, "alice").await.unwrap();
        assert_eq!(report, CopyReport { traders: 1, observed: 1, copied: 1 });

        let trades = sqlite::get_trades(state.db.pool(), "alice", 10, 0, Some(TradeKind::CopyBuy))
            .await
            .unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].original_tx_hash.as_deref(), Some("T1"));
        assert_eq!(trades[0].our_tx_hash, "COPY");
        assert_eq!(trades[0].trader_address.as_deref(), Some("rTrader"));
        assert_eq!(trades[0].xrp_spent, Some(2.0));
        assert!((trades[0].tokens_received.unwrap() - 96.0).abs() < 1e-9);
        assert_eq!(gateway.count_calls("submit:Payment"), 1);
    }

    #[tokio::test]
    async fn test_already_copied_trade_is_skipped() {
        let gateway = Arc::new(
            MockGateway::new()
                .with_account_txs("rTrader", vec![trader_buy("T1")])
                .with_pool(pool(&foo(), 100.0, "5000")),
        );
        let state = following_state(gateway.clone()).await;
        sqlite::record_trade(
            state.db.pool(),
            "alice",
            &TradeRecord {
                kind: TradeKind::CopyBuy,
                original_tx_hash: Some("T1".to_string()),
                our_tx_hash: "EARLIER".to_string(),
                amount: 2.0,
                token: foo(),
                readable_symbol: "FOO".to_string(),
                trader_address: Some("rTrader".to_string()),
                tokens_received: Some(96.0),
                xrp_spent: Some(2.0),
                actual_rate: Some(48.0),
                timestamp: Utc::now(),
            },
        )
        .await
        .unwrap();

        let report = run_copy_cycle(&state, "alice").await.unwrap();
        assert_eq!(report.observed, 1);
        assert_eq!(report.copied, 0);
        assert_eq!(gateway.count_calls("submit:"), 0);
    }

    #[tokio::test]
    async fn test_sell_capped_at_holding_closes_position() {
        // The trader's rate sizes 2 XRP at 100 FOO; only 60 are held
        let gateway = Arc::new(
            MockGateway::new()
                .with_account_txs("rTrader", vec![trader_sell("T2")])
                .with_pool(pool(&foo(), 100.0, "5000"))
                .with_lines(
                    WALLET,
                    vec![
                        vec![trust_line(&foo(), 60.0, 100000.0)],
                        vec![trust_line(&foo(), 60.0, 100000.0)],
                        vec![trust_line(&foo(), 0.0, 100000.0)],
                    ],
                )
                .with_balances(WALLET, vec![50.0, 51.2])
                .with_submits(vec![settled("tesSUCCESS", "SOLD")]),
        );
        let state = following_state(gateway.clone()).await;
        let db = state.db.pool();
        sqlite::record_purchase(
            db,
            "alice",
            &SniperPurchase {
                token: foo(),
                readable_symbol: "FOO".to_string(),
                xrp_spent: 1.0,
                tokens_received: 60.0,
                tx_hash: "SNIPE".to_string(),
                status: PurchaseStatus::Active,
                timestamp: Utc::now(),
            },
        )
        .await
        .unwrap();

        let report = run_copy_cycle(&state, "alice").await.unwrap();
        assert_eq!(report.copied, 1);

        let trades = sqlite::get_trades(db, "alice", 10, 0, Some(TradeKind::CopySell)).await.unwrap();
        assert_eq!(trades.len(), 1);
        assert!((trades[0].amount - 60.0).abs() < 1e-9);
        assert_eq!(trades[0].original_tx_hash.as_deref(), Some("T2"));
        assert!(sqlite::list_active_purchases(db, "alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sell_without_holding_is_skipped() {
        let gateway = Arc::new(
            MockGateway::new()
                .with_account_txs("rTrader", vec![trader_sell("T3")])
                .with_pool(pool(&foo(), 100.0, "5000")),
        );
        let state = following_state(gateway.clone()).await;

        let report = run_copy_cycle(&state, "alice").await.unwrap();
        assert_eq!(report.observed, 1);
        assert_eq!(report.copied, 0);
        assert_eq!(gateway.count_calls("submit:"), 0);
    }
}
