//! Per-user allow and block lists of tokens

use std::collections::HashSet;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use xrpl_trader_core::{Error, Result, TokenIdentity, TokenListKind};

/// A token on one of a user's lists
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TokenListEntry {
    pub currency: String,
    pub issuer: String,
    pub readable_symbol: String,
}

impl TokenListEntry {
    pub fn token(&self) -> TokenIdentity {
        TokenIdentity::new(self.currency.clone(), self.issuer.clone())
    }
}

/// Add a token to a list (no-op if already present)
pub async fn add_to_token_list(
    pool: &SqlitePool,
    user_id: &str,
    kind: TokenListKind,
    token: &TokenIdentity,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO token_lists (user_id, list_kind, currency, issuer, readable_symbol)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(kind.as_str())
    .bind(&token.currency)
    .bind(&token.issuer)
    .bind(token.readable_symbol())
    .execute(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(())
}

/// Remove a token from a list
pub async fn remove_from_token_list(
    pool: &SqlitePool,
    user_id: &str,
    kind: TokenListKind,
    token: &TokenIdentity,
) -> Result<()> {
    sqlx::query(
        "DELETE FROM token_lists WHERE user_id = ? AND list_kind = ? AND currency = ? AND issuer = ?",
    )
    .bind(user_id)
    .bind(kind.as_str())
    .bind(&token.currency)
    .bind(&token.issuer)
    .execute(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(())
}

/// List the entries of one list, in insertion order
pub async fn list_token_list(
    pool: &SqlitePool,
    user_id: &str,
    kind: TokenListKind,
) -> Result<Vec<TokenListEntry>> {
    let entries = sqlx::query_as::<_, TokenListEntry>(
        r#"
        SELECT currency, issuer, readable_symbol
        FROM token_lists
        WHERE user_id = ? AND list_kind = ?
        ORDER BY added_at, rowid
        "#,
    )
    .bind(user_id)
    .bind(kind.as_str())
    .fetch_all(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(entries)
}

/// One list as a set, for membership checks in the engine
pub async fn token_set(
    pool: &SqlitePool,
    user_id: &str,
    kind: TokenListKind,
) -> Result<HashSet<TokenIdentity>> {
    Ok(list_token_list(pool, user_id, kind)
        .await?
        .iter()
        .map(TokenListEntry::token)
        .collect())
}
