//! Per-user automation session: which loops are running and their persisted flags

use crate::copy_trader::spawn_copy_trader;
use crate::scheduler::LoopHandle;
use crate::sniper::spawn_sniper;
use crate::state::AppState;
use tracing::info;
use xrpl_trader_core::{Error, Result};
use xrpl_trader_persistence::sqlite;

pub struct UserSession {
    user_id: String,
    state: AppState,
    sniper: Option<LoopHandle>,
    copy_trader: Option<LoopHandle>,
}

impl UserSession {
    pub fn new(state: AppState, user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            state,
            sniper: None,
            copy_trader: None,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn is_sniper_running(&self) -> bool {
        self.sniper.is_some()
    }

    pub fn is_copy_trading_running(&self) -> bool {
        self.copy_trader.is_some()
    }

    // ─── Sniper ──────────────────────────────────────────────────────

    pub async fn start_sniper(&mut self) -> Result<()> {
        if self.sniper.is_some() {
            return Err(Error::AlreadyRunning(format!("sniper for {}", self.user_id)));
        }
        let db = self.state.db.pool();
        sqlite::require_user(db, &self.user_id).await?;
        sqlite::set_sniper_active(db, &self.user_id, true).await?;

        self.sniper = Some(spawn_sniper(self.state.clone(), self.user_id.clone()));
        info!("Session: sniper started for {}", self.user_id);
        Ok(())
    }

    /// Returns false if the sniper was not running
    pub async fn stop_sniper(&mut self) -> Result<bool> {
        let Some(handle) = self.sniper.take() else {
            return Ok(false);
        };
        handle.stop().await;
        sqlite::set_sniper_active(self.state.db.pool(), &self.user_id, false).await?;
        info!("Session: sniper stopped for {}", self.user_id);
        Ok(true)
    }

    // ─── Copy trading ────────────────────────────────────────────────

    pub async fn start_copy_trading(&mut self) -> Result<()> {
        if self.copy_trader.is_some() {
            return Err(Error::AlreadyRunning(format!("copy trading for {}", self.user_id)));
        }
        let db = self.state.db.pool();
        sqlite::require_user(db, &self.user_id).await?;
        sqlite::set_copy_trading_active(db, &self.user_id, true).await?;

        self.copy_trader = Some(spawn_copy_trader(self.state.clone(), self.user_id.clone()));
        info!("Session: copy trading started for {}", self.user_id);
        Ok(())
    }

    /// Returns false if copy trading was not running
    pub async fn stop_copy_trading(&mut self) -> Result<bool> {
        let Some(handle) = self.copy_trader.take() else {
            return Ok(false);
        };
        handle.stop().await;
        sqlite::set_copy_trading_active(self.state.db.pool(), &self.user_id, false).await?;
        info!("Session: copy trading stopped for {}", self.user_id);
        Ok(true)
    }

    /// Stop both loops for process exit, leaving the persisted flags set so
    /// the next start can resume them
    pub async fn shutdown(&mut self) {
        if let Some(handle) = self.sniper.take() {
            handle.stop().await;
        }
        if let Some(handle) = self.copy_trader.take() {
            handle.stop().await;
        }
        info!("Session: {} shut down", self.user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::idle_state;
    use xrpl_trader_core::UserSettings;

    async fn session() -> UserSession {
        let state = idle_state().await;
        sqlite::create_user(state.db.pool(), "alice", "rWallet", &UserSettings::default())
            .await
            .unwrap();
        UserSession::new(state, "alice")
    }

    #[tokio::test]
    async fn test_start_twice_refused() {
        let mut session = session().await;
        session.start_sniper().await.unwrap();
        assert!(matches!(session.start_sniper().await, Err(Error::AlreadyRunning(_))));
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_flags_follow_start_and_stop() {
        let mut session = session().await;
        let db = session.state.db.clone();

        session.start_sniper().await.unwrap();
        session.start_copy_trading().await.unwrap();
        let user = sqlite::require_user(db.pool(), "alice").await.unwrap();
        assert!(user.sniper_active && user.copy_trading_active);

        assert!(session.stop_sniper().await.unwrap());
        assert!(!session.stop_sniper().await.unwrap());
        let user = sqlite::require_user(db.pool(), "alice").await.unwrap();
        assert!(!user.sniper_active);
        assert!(user.copy_trading_active);

        session.shutdown().await;
        assert!(!session.is_copy_trading_running());
        let user = sqlite::require_user(db.pool(), "alice").await.unwrap();
        assert!(user.copy_trading_active);
    }

    #[tokio::test]
    async fn test_unknown_user_cannot_start() {
        let state = idle_state().await;
        let mut session = UserSession::new(state, "ghost");
        assert!(matches!(session.start_copy_trading().await, Err(Error::UserNotFound(_))));
        assert!(!session.is_copy_trading_running());
    }
}
