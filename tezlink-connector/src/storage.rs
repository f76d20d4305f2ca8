use crate::types::WalletSession;
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The key under which the active session is persisted.
pub const SESSION_KEY: &str = "key-wallet-provider";

/// A session as written to durable storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub session: WalletSession,
    /// Unix timestamp, in seconds, of the last write.
    pub saved_at: i64,
}

impl StoredSession {
    pub fn now(session: WalletSession) -> Self {
        Self {
            session,
            saved_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Durable storage for the connected session.
///
/// The manager loads it once at startup, saves it on every successful connect and
/// clears it on disconnect.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<Option<StoredSession>>;
    async fn save(&self, session: &StoredSession) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

/// A process-local store. Sessions survive manager restarts but not process restarts.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, StoredSession>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self) -> Result<Option<StoredSession>> {
        Ok(self.entries.get(SESSION_KEY).map(|entry| entry.value().clone()))
    }

    async fn save(&self, session: &StoredSession) -> Result<()> {
        self.entries.insert(SESSION_KEY.to_string(), session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.remove(SESSION_KEY);
        Ok(())
    }
}
