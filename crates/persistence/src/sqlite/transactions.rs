//! Trade log: automated buys and sells, and the copied-transaction check

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use xrpl_trader_core::{Error, Result, TokenIdentity, TradeKind, TradeRecord};

/// Trade log row as stored
#[derive(Debug, sqlx::FromRow)]
struct TradeRow {
    kind: String,
    original_tx_hash: Option<String>,
    our_tx_hash: String,
    amount: f64,
    currency: String,
    issuer: String,
    readable_symbol: String,
    trader_address: Option<String>,
    tokens_received: Option<f64>,
    xrp_spent: Option<f64>,
    actual_rate: Option<f64>,
    timestamp: DateTime<Utc>,
}

impl TryFrom<TradeRow> for TradeRecord {
    type Error = Error;

    fn try_from(row: TradeRow) -> Result<Self> {
        let kind = TradeKind::parse(&row.kind)
            .ok_or_else(|| Error::DatabaseError(format!("unknown trade kind {:?}", row.kind)))?;
        Ok(TradeRecord {
            kind,
            original_tx_hash: row.original_tx_hash,
            our_tx_hash: row.our_tx_hash,
            amount: row.amount,
            token: TokenIdentity::new(row.currency, row.issuer),
            readable_symbol: row.readable_symbol,
            trader_address: row.trader_address,
            tokens_received: row.tokens_received,
            xrp_spent: row.xrp_spent,
            actual_rate: row.actual_rate,
            timestamp: row.timestamp,
        })
    }
}

/// Append a trade to a user's log
pub async fn record_trade(pool: &SqlitePool, user_id: &str, trade: &TradeRecord) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO trade_log
            (user_id, kind, original_tx_hash, our_tx_hash, amount, currency, issuer,
             readable_symbol, trader_address, tokens_received, xrp_spent, actual_rate, timestamp)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(trade.kind.as_str())
    .bind(&trade.original_tx_hash)
    .bind(&trade.our_tx_hash)
    .bind(trade.amount)
    .bind(&trade.token.currency)
    .bind(&trade.token.issuer)
    .bind(&trade.readable_symbol)
    .bind(&trade.trader_address)
    .bind(trade.tokens_received)
    .bind(trade.xrp_spent)
    .bind(trade.actual_rate)
    .bind(trade.timestamp)
    .execute(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(result.last_insert_rowid())
}

/// Get a page of a user's trades, newest first, optionally of one kind
pub async fn get_trades(
    pool: &SqlitePool,
    user_id: &str,
    limit: u32,
    offset: u32,
    kind: Option<TradeKind>,
) -> Result<Vec<TradeRecord>> {
    let mut query = String::from(
        r#"
        SELECT kind, original_tx_hash, our_tx_hash, amount, currency, issuer, readable_symbol,
               trader_address, tokens_received, xrp_spent, actual_rate, timestamp
        FROM trade_log
        WHERE user_id = ?
        "#,
    );

    if kind.is_some() {
        query.push_str(" AND kind = ?");
    }

    query.push_str(" ORDER BY timestamp DESC, id DESC LIMIT ? OFFSET ?");

    let mut builder = sqlx::query_as::<_, TradeRow>(&query).bind(user_id);

    if let Some(kind) = kind {
        builder = builder.bind(kind.as_str());
    }

    let rows = builder
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

    rows.into_iter().map(TradeRecord::try_from).collect()
}

/// Number of trades in a user's log
pub async fn count_trades(pool: &SqlitePool, user_id: &str) -> Result<u32> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM trade_log WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(row.0 as u32)
}

/// True if the user already copied the trader transaction `original_tx_hash`
pub async fn was_transaction_copied(
    pool: &SqlitePool,
    user_id: &str,
    original_tx_hash: &str,
) -> Result<bool> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM trade_log WHERE user_id = ? AND original_tx_hash = ?",
    )
    .bind(user_id)
    .bind(original_tx_hash)
    .fetch_one(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(row.0 > 0)
}
