//! Sniper purchase records

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use xrpl_trader_core::{Error, PurchaseStatus, Result, SniperPurchase, TokenIdentity};

#[derive(Debug, sqlx::FromRow)]
struct PurchaseRow {
    currency: String,
    issuer: String,
    readable_symbol: String,
    xrp_spent: f64,
    tokens_received: f64,
    tx_hash: String,
    status: String,
    timestamp: DateTime<Utc>,
}

impl TryFrom<PurchaseRow> for SniperPurchase {
    type Error = Error;

    fn try_from(row: PurchaseRow) -> Result<Self> {
        let status = PurchaseStatus::parse(&row.status)
            .ok_or_else(|| Error::DatabaseError(format!("unknown purchase status {:?}", row.status)))?;
        Ok(SniperPurchase {
            token: TokenIdentity::new(row.currency, row.issuer),
            readable_symbol: row.readable_symbol,
            xrp_spent: row.xrp_spent,
            tokens_received: row.tokens_received,
            tx_hash: row.tx_hash,
            status,
            timestamp: row.timestamp,
        })
    }
}

/// Record a sniper buy
pub async fn record_purchase(
    pool: &SqlitePool,
    user_id: &str,
    purchase: &SniperPurchase,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO sniper_purchases
            (user_id, currency, issuer, readable_symbol, xrp_spent, tokens_received, tx_hash, status, timestamp)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(&purchase.token.currency)
    .bind(&purchase.token.issuer)
    .bind(&purchase.readable_symbol)
    .bind(purchase.xrp_spent)
    .bind(purchase.tokens_received)
    .bind(&purchase.tx_hash)
    .bind(purchase.status.as_str())
    .bind(purchase.timestamp)
    .execute(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(result.last_insert_rowid())
}

/// All purchases for a user, newest first
pub async fn list_purchases(pool: &SqlitePool, user_id: &str) -> Result<Vec<SniperPurchase>> {
    let rows: Vec<PurchaseRow> = sqlx::query_as(
        r#"
        SELECT currency, issuer, readable_symbol, xrp_spent, tokens_received, tx_hash, status, timestamp
        FROM sniper_purchases
        WHERE user_id = ?
        ORDER BY timestamp DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    rows.into_iter().map(SniperPurchase::try_from).collect()
}

/// Purchases still held
pub async fn list_active_purchases(pool: &SqlitePool, user_id: &str) -> Result<Vec<SniperPurchase>> {
    let rows: Vec<PurchaseRow> = sqlx::query_as(
        r#"
        SELECT currency, issuer, readable_symbol, xrp_spent, tokens_received, tx_hash, status, timestamp
        FROM sniper_purchases
        WHERE user_id = ? AND status = 'active'
        ORDER BY timestamp DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    rows.into_iter().map(SniperPurchase::try_from).collect()
}

/// Mark every active purchase of `token` as sold
pub async fn mark_purchase_sold(
    pool: &SqlitePool,
    user_id: &str,
    token: &TokenIdentity,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE sniper_purchases
        SET status = 'sold'
        WHERE user_id = ? AND currency = ? AND issuer = ? AND status = 'active'
        "#,
    )
    .bind(user_id)
    .bind(&token.currency)
    .bind(&token.issuer)
    .execute(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::create_user;
    use crate::Database;
    use xrpl_trader_core::UserSettings;

    fn purchase(currency: &str, hash: &str) -> SniperPurchase {
        SniperPurchase {
            token: TokenIdentity::new(currency, "rIssuer"),
            readable_symbol: currency.to_string(),
            xrp_spent: 5.0,
            tokens_received: 250.0,
            tx_hash: hash.to_string(),
            status: PurchaseStatus::Active,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_active_purchases() {
        let db = Database::connect_in_memory().await.unwrap();
        let pool = db.pool();
        create_user(pool, "alice", "rAlice", &UserSettings::default()).await.unwrap();

        record_purchase(pool, "alice", &purchase("FOO", "H1")).await.unwrap();
        record_purchase(pool, "alice", &purchase("BAR", "H2")).await.unwrap();
        assert_eq!(list_active_purchases(pool, "alice").await.unwrap().len(), 2);

        let foo = TokenIdentity::new("FOO", "rIssuer");
        assert_eq!(mark_purchase_sold(pool, "alice", &foo).await.unwrap(), 1);

        let active = list_active_purchases(pool, "alice").await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].readable_symbol, "BAR");
        assert!(!active.iter().any(|p| p.is_active_for(&foo)));

        let all = list_purchases(pool, "alice").await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(list_purchases(pool, "bob").await.unwrap().is_empty());
    }
}
