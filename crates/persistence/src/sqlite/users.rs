//! User CRUD operations: settings, automation flags and start times

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use xrpl_trader_core::{Error, Result, UserProfile, UserSettings};

/// Database row for a user
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    user_id: String,
    wallet_address: String,
    settings: String,
    sniper_active: bool,
    copy_trading_active: bool,
    sniper_start_time: Option<DateTime<Utc>>,
    copy_trading_start_time: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for UserProfile {
    type Error = Error;

    fn try_from(row: UserRow) -> Result<Self> {
        let settings: UserSettings = serde_json::from_str(&row.settings)?;
        Ok(UserProfile {
            user_id: row.user_id,
            wallet_address: row.wallet_address,
            settings,
            sniper_active: row.sniper_active,
            copy_trading_active: row.copy_trading_active,
            sniper_start_time: row.sniper_start_time,
            copy_trading_start_time: row.copy_trading_start_time,
        })
    }
}

/// Create a user with the given settings
pub async fn create_user(
    pool: &SqlitePool,
    user_id: &str,
    wallet_address: &str,
    settings: &UserSettings,
) -> Result<()> {
    let settings = serde_json::to_string(settings)?;
    sqlx::query(
        r#"
        INSERT INTO users (user_id, wallet_address, settings)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(wallet_address)
    .bind(settings)
    .execute(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(())
}

/// Get a user by id
pub async fn get_user(pool: &SqlitePool, user_id: &str) -> Result<Option<UserProfile>> {
    let row: Option<UserRow> = sqlx::query_as(
        r#"
        SELECT user_id, wallet_address, settings, sniper_active, copy_trading_active,
               sniper_start_time, copy_trading_start_time
        FROM users
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    row.map(UserProfile::try_from).transpose()
}

/// Get a user by id, failing with `UserNotFound` if absent
pub async fn require_user(pool: &SqlitePool, user_id: &str) -> Result<UserProfile> {
    get_user(pool, user_id)
        .await?
        .ok_or_else(|| Error::UserNotFound(user_id.to_string()))
}

/// Replace a user's trading settings
pub async fn save_settings(pool: &SqlitePool, user_id: &str, settings: &UserSettings) -> Result<()> {
    let settings = serde_json::to_string(settings)?;
    let result = sqlx::query("UPDATE users SET settings = ? WHERE user_id = ?")
        .bind(settings)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

    if result.rows_affected() == 0 {
        return Err(Error::UserNotFound(user_id.to_string()));
    }
    Ok(())
}

/// Turn the sniper on or off; turning it on stamps the start time
pub async fn set_sniper_active(pool: &SqlitePool, user_id: &str, active: bool) -> Result<()> {
    let start = active.then(Utc::now);
    sqlx::query(
        r#"
        UPDATE users
        SET sniper_active = ?, sniper_start_time = COALESCE(?, sniper_start_time)
        WHERE user_id = ?
        "#,
    )
    .bind(active)
    .bind(start)
    .bind(user_id)
    .execute(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(())
}

/// Turn copy trading on or off.
///
/// Turning it on moves the start watermark to now, so trades made while it
/// was off are never copied.
pub async fn set_copy_trading_active(pool: &SqlitePool, user_id: &str, active: bool) -> Result<()> {
    let start = active.then(Utc::now);
    sqlx::query(
        r#"
        UPDATE users
        SET copy_trading_active = ?, copy_trading_start_time = COALESCE(?, copy_trading_start_time)
        WHERE user_id = ?
        "#,
    )
    .bind(active)
    .bind(start)
    .bind(user_id)
    .execute(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(())
}

/// Set the copy-trading start watermark explicitly
pub async fn set_copy_start_time(
    pool: &SqlitePool,
    user_id: &str,
    start: DateTime<Utc>,
) -> Result<()> {
    sqlx::query("UPDATE users SET copy_trading_start_time = ? WHERE user_id = ?")
        .bind(start)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(())
}

/// Users with either automation switched on, for resuming after a restart
pub async fn list_active_users(pool: &SqlitePool) -> Result<Vec<UserProfile>> {
    let rows: Vec<UserRow> = sqlx::query_as(
        r#"
        SELECT user_id, wallet_address, settings, sniper_active, copy_trading_active,
               sniper_start_time, copy_trading_start_time
        FROM users
        WHERE sniper_active = 1 OR copy_trading_active = 1
        ORDER BY user_id
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    rows.into_iter().map(UserProfile::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use xrpl_trader_core::SnipeMode;

    #[tokio::test]
    async fn test_user_round_trip() {
        let db = Database::connect_in_memory().await.unwrap();
        let pool = db.pool();

        create_user(pool, "alice", "rAlice", &UserSettings::default()).await.unwrap();
        let user = require_user(pool, "alice").await.unwrap();
        assert_eq!(user.wallet_address, "rAlice");
        assert!(!user.sniper_active);
        assert!(user.copy_trading_start_time.is_none());

        let mut settings = user.settings.clone();
        settings.snipe_mode = SnipeMode::AutoBuy;
        settings.slippage_percent = 2.0;
        save_settings(pool, "alice", &settings).await.unwrap();
        assert_eq!(require_user(pool, "alice").await.unwrap().settings, settings);
    }

    #[tokio::test]
    async fn test_missing_user() {
        let db = Database::connect_in_memory().await.unwrap();
        assert!(get_user(db.pool(), "nobody").await.unwrap().is_none());
        assert!(matches!(
            require_user(db.pool(), "nobody").await,
            Err(Error::UserNotFound(_))
        ));
        assert!(save_settings(db.pool(), "nobody", &UserSettings::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_copy_trading_watermark() {
        let db = Database::connect_in_memory().await.unwrap();
        let pool = db.pool();
        create_user(pool, "bob", "rBob", &UserSettings::default()).await.unwrap();

        let before = Utc::now();
        set_copy_trading_active(pool, "bob", true).await.unwrap();
        let user = require_user(pool, "bob").await.unwrap();
        assert!(user.copy_trading_active);
        let start = user.copy_trading_start_time.unwrap();
        assert!(start >= before);

        set_copy_trading_active(pool, "bob", false).await.unwrap();
        let user = require_user(pool, "bob").await.unwrap();
        assert!(!user.copy_trading_active);
        assert_eq!(user.copy_trading_start_time, Some(start));

        assert_eq!(list_active_users(pool).await.unwrap().len(), 0);
        set_sniper_active(pool, "bob", true).await.unwrap();
        assert_eq!(list_active_users(pool).await.unwrap().len(), 1);
    }
}
