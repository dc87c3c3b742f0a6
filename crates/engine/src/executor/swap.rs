//! Swap Executor: slippage-bounded AMM swaps with post-trade reconciliation

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use xrpl_trader_core::{
    find_trust_line, realized_slippage_percent, Percent, SubmitOutcome, SwapFailure, SwapOutcome,
    TokenIdentity, TradeDirection, TrustLine, Xrp, AMOUNT_EPSILON,
};
use xrpl_trader_networking::{
    api::{buy_payment_tx, sell_payment_tx, trust_set_tx, DEFAULT_TRUST_LIMIT},
    LedgerGateway, TransactionSigner,
};

/// Slippage tolerance used when none (or an out-of-range one) is given
pub const DEFAULT_SLIPPAGE_PERCENT: f64 = 4.0;

/// Executor settings
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Pause after validation before balances are re-read
    pub settle_delay: Duration,
    /// Limit used when opening a trust line
    pub trust_limit: String,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(2),
            trust_limit: DEFAULT_TRUST_LIMIT.to_string(),
        }
    }
}

/// Executes buys and sells for one wallet.
///
/// Every failure is reported inside the returned `SwapOutcome`; nothing is
/// retried here.
pub struct SwapExecutor {
    gateway: Arc<dyn LedgerGateway>,
    signer: Arc<dyn TransactionSigner>,
    options: ExecutorOptions,
}

impl SwapExecutor {
    pub fn new(gateway: Arc<dyn LedgerGateway>, signer: Arc<dyn TransactionSigner>) -> Self {
        Self::with_options(gateway, signer, ExecutorOptions::default())
    }

    pub fn with_options(
        gateway: Arc<dyn LedgerGateway>,
        signer: Arc<dyn TransactionSigner>,
        options: ExecutorOptions,
    ) -> Self {
        Self {
            gateway,
            signer,
            options,
        }
    }

    pub fn wallet_address(&self) -> &str {
        self.signer.address()
    }

    // ─── Buy ─────────────────────────────────────────────────────────

    /// Spend `xrp_amount` on `token`, accepting at most `slippage_percent` below the quote
    #[instrument(skip(self, token), fields(token = %token))]
    pub async fn execute_buy(
        &self,
        token: &TokenIdentity,
        xrp_amount: f64,
        slippage_percent: f64,
    ) -> SwapOutcome {
        let slippage = normalize_slippage(slippage_percent);
        let fail = |failure: SwapFailure| {
            warn!("Executor: buy of {} failed: {}", token.readable_symbol(), failure);
            SwapOutcome::failed(TradeDirection::Buy, slippage, failure)
        };

        if !(xrp_amount.is_finite() && xrp_amount > 0.0) || Xrp(xrp_amount).to_drops() == 0 {
            return fail(SwapFailure::InvalidAmount(xrp_amount));
        }
        let wallet = self.signer.address();

        // Baseline for reconciling what the buy delivered
        let lines = match self.gateway.account_trust_lines(wallet).await {
            Ok(lines) => lines,
            Err(e) => return fail(SwapFailure::Transport(e.to_string())),
        };
        let existing = find_trust_line(&lines, token);
        let balance_before = existing.map(|l| l.balance).unwrap_or(0.0);

        if existing.map_or(true, |line| line.limit <= 0.0) {
            info!("Executor: opening trust line for {}", token.readable_symbol());
            let tx = trust_set_tx(wallet, token, &self.options.trust_limit);
            match self.submit(tx).await {
                Ok(outcome) if outcome.succeeded() => {
                    debug!("Executor: trust line set in {}", outcome.hash)
                }
                Ok(outcome) => return fail(SwapFailure::TrustLine(outcome.result_code)),
                Err(e) => return fail(SwapFailure::TrustLine(e.to_string())),
            }
        }

        let pool = match self.gateway.pool_info(token).await {
            Ok(Some(pool)) => pool,
            Ok(None) => return fail(SwapFailure::PoolNotFound),
            Err(e) => return fail(SwapFailure::Transport(e.to_string())),
        };
        let Some(quoted_rate) = pool.tokens_per_xrp() else {
            return fail(SwapFailure::PoolNotFound);
        };

        let expected_tokens = xrp_amount * quoted_rate;
        let min_tokens = expected_tokens * Percent(slippage).remaining_fraction();
        debug!(
            "Executor: quote {} {} per XRP, expecting {} (min {})",
            quoted_rate,
            token.readable_symbol(),
            expected_tokens,
            min_tokens
        );

        let tx = match buy_payment_tx(wallet, token, expected_tokens, min_tokens, Xrp(xrp_amount)) {
            Ok(tx) => tx,
            Err(_) => return fail(SwapFailure::InvalidAmount(xrp_amount)),
        };
        let settled = match self.submit(tx).await {
            Ok(outcome) if outcome.succeeded() => outcome,
            Ok(outcome) => return fail(SwapFailure::Settlement(outcome.result_code)),
            Err(e) => return fail(SwapFailure::Transport(e.to_string())),
        };

        self.settle().await;

        let tokens_received = match self.gateway.account_trust_lines(wallet).await {
            Ok(lines) => Some(held_balance(&lines, token) - balance_before),
            Err(e) => {
                warn!("Executor: could not re-read balance after {}: {}", settled.hash, e);
                None
            }
        };

        let effective_rate = tokens_received.map(|received| received / xrp_amount);
        let realized = effective_rate.and_then(|rate| realized_slippage_percent(rate, quoted_rate));

        info!(
            "Executor: bought {:?} {} for {} XRP ({})",
            tokens_received,
            token.readable_symbol(),
            xrp_amount,
            settled.hash
        );

        SwapOutcome {
            success: true,
            direction: TradeDirection::Buy,
            transaction_hash: Some(settled.hash),
            amount_sent: Some(xrp_amount),
            amount_received: tokens_received,
            effective_rate,
            quoted_rate: Some(quoted_rate),
            expected_amount: Some(expected_tokens),
            realized_slippage_percent: realized,
            slippage_bound_percent: slippage,
            failure: None,
        }
    }

    // ─── Sell ────────────────────────────────────────────────────────

    /// Sell `token_amount` of `token` for XRP, accepting at most `slippage_percent` below the quote
    #[instrument(skip(self, token), fields(token = %token))]
    pub async fn execute_sell(
        &self,
        token: &TokenIdentity,
        token_amount: f64,
        slippage_percent: f64,
    ) -> SwapOutcome {
        let slippage = normalize_slippage(slippage_percent);
        let fail = |failure: SwapFailure| {
            warn!("Executor: sell of {} failed: {}", token.readable_symbol(), failure);
            SwapOutcome::failed(TradeDirection::Sell, slippage, failure)
        };

        if !(token_amount.is_finite() && token_amount > 0.0) {
            return fail(SwapFailure::InvalidAmount(token_amount));
        }
        let wallet = self.signer.address();

        let lines = match self.gateway.account_trust_lines(wallet).await {
            Ok(lines) => lines,
            Err(e) => return fail(SwapFailure::Transport(e.to_string())),
        };
        let Some(line) = find_trust_line(&lines, token) else {
            return fail(SwapFailure::NoTrustLine(token.readable_symbol()));
        };
        let tokens_before = line.balance;
        if tokens_before + AMOUNT_EPSILON < token_amount {
            return fail(SwapFailure::InsufficientBalance {
                available: tokens_before,
                requested: token_amount,
            });
        }

        let xrp_before = match self.gateway.account_info(wallet).await {
            Ok(info) => info.balance,
            Err(e) => return fail(SwapFailure::Transport(e.to_string())),
        };

        let pool = match self.gateway.pool_info(token).await {
            Ok(Some(pool)) => pool,
            Ok(None) => return fail(SwapFailure::PoolNotFound),
            Err(e) => return fail(SwapFailure::Transport(e.to_string())),
        };
        let Some(quoted_rate) = pool.xrp_per_token() else {
            return fail(SwapFailure::PoolNotFound);
        };

        let expected_xrp = token_amount * quoted_rate;
        let min_xrp = expected_xrp * Percent(slippage).remaining_fraction();
        debug!(
            "Executor: quote {} XRP per {}, expecting {} XRP (min {})",
            quoted_rate,
            token.readable_symbol(),
            expected_xrp,
            min_xrp
        );

        let tx = match sell_payment_tx(wallet, token, token_amount, Xrp(expected_xrp), Xrp(min_xrp)) {
            Ok(tx) => tx,
            Err(_) => return fail(SwapFailure::InvalidAmount(token_amount)),
        };
        let settled = match self.submit(tx).await {
            Ok(outcome) if outcome.succeeded() => outcome,
            Ok(outcome) => return fail(SwapFailure::Settlement(outcome.result_code)),
            Err(e) => return fail(SwapFailure::Transport(e.to_string())),
        };

        self.settle().await;

        let tokens_sold = match self.gateway.account_trust_lines(wallet).await {
            Ok(lines) => Some(tokens_before - held_balance(&lines, token)),
            Err(e) => {
                warn!("Executor: could not re-read token balance after {}: {}", settled.hash, e);
                None
            }
        };
        // The fee came out of the same native balance
        let xrp_received = match self.gateway.account_info(wallet).await {
            Ok(info) => Some(info.balance - xrp_before + settled.fee_xrp()),
            Err(e) => {
                warn!("Executor: could not re-read XRP balance after {}: {}", settled.hash, e);
                None
            }
        };

        let sold = tokens_sold.unwrap_or(token_amount);
        let effective_rate = xrp_received
            .filter(|_| sold > AMOUNT_EPSILON)
            .map(|xrp| xrp / sold);
        let realized = effective_rate.and_then(|rate| realized_slippage_percent(rate, quoted_rate));

        info!(
            "Executor: sold {} {} for {:?} XRP ({})",
            sold,
            token.readable_symbol(),
            xrp_received,
            settled.hash
        );

        SwapOutcome {
            success: true,
            direction: TradeDirection::Sell,
            transaction_hash: Some(settled.hash),
            amount_sent: Some(sold),
            amount_received: xrp_received,
            effective_rate,
            quoted_rate: Some(quoted_rate),
            expected_amount: Some(expected_xrp),
            realized_slippage_percent: realized,
            slippage_bound_percent: slippage,
            failure: None,
        }
    }

    // ─── Helpers ─────────────────────────────────────────────────────

    /// Autofill, sign and submit, waiting for validation
    async fn submit(&self, tx: Value) -> xrpl_trader_core::Result<SubmitOutcome> {
        let filled = self.gateway.autofill(tx).await?;
        let blob = self.signer.sign(&filled).await?;
        let outcome = self.gateway.submit_signed(&blob).await?;
        if !outcome.succeeded() {
            error!("Executor: {} settled with {}", outcome.hash, outcome.result_code);
        }
        Ok(outcome)
    }

    async fn settle(&self) {
        if !self.options.settle_delay.is_zero() {
            tokio::time::sleep(self.options.settle_delay).await;
        }
    }
}

fn held_balance(lines: &[TrustLine], token: &TokenIdentity) -> f64 {
    find_trust_line(lines, token).map(|l| l.balance).unwrap_or(0.0)
}

fn normalize_slippage(slippage_percent: f64) -> f64 {
    if slippage_percent.is_finite() && (0.0..100.0).contains(&slippage_percent) {
        slippage_percent
    } else {
        warn!(
            "Executor: slippage {} out of range, using {}",
            slippage_percent, DEFAULT_SLIPPAGE_PERCENT
        );
        DEFAULT_SLIPPAGE_PERCENT
    }
}
