//! Followed trader addresses per user

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use xrpl_trader_core::{Error, Result};

/// A followed trader stored in the database
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CopyTrader {
    pub trader_address: String,
    pub added_at: String,
}

/// Follow a trader
pub async fn add_copy_trader(pool: &SqlitePool, user_id: &str, trader_address: &str) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO copy_traders (user_id, trader_address) VALUES (?, ?)")
        .bind(user_id)
        .bind(trader_address)
        .execute(pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(())
}

/// Stop following a trader
pub async fn remove_copy_trader(
    pool: &SqlitePool,
    user_id: &str,
    trader_address: &str,
) -> Result<()> {
    sqlx::query("DELETE FROM copy_traders WHERE user_id = ? AND trader_address = ?")
        .bind(user_id)
        .bind(trader_address)
        .execute(pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(())
}

/// List a user's followed traders, oldest first
pub async fn list_copy_traders(pool: &SqlitePool, user_id: &str) -> Result<Vec<CopyTrader>> {
    let traders = sqlx::query_as::<_, CopyTrader>(
        r#"
        SELECT trader_address, added_at
        FROM copy_traders
        WHERE user_id = ?
        ORDER BY added_at, rowid
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(traders)
}

/// Count a user's followed traders
pub async fn count_copy_traders(pool: &SqlitePool, user_id: &str) -> Result<u32> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM copy_traders WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(count.0 as u32)
}
