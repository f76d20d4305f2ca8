//! A `sled`-backed implementation of the connector's `SessionStore`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sled::Db;
use tezlink_connector::storage::{SessionStore, StoredSession, SESSION_KEY};

/// Stores the session as a bincode-encoded value under [`SESSION_KEY`].
#[derive(Clone)]
pub struct SledStore {
    db: Db,
}

impl SledStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub fn open(path: &str) -> Result<Self> {
        let db = sled::open(path).with_context(|| format!("Failed to open database at '{}'", path))?;
        Ok(Self::new(db))
    }
}

#[async_trait]
impl SessionStore for SledStore {
    /// Returns `None` when nothing is stored. A value that no longer decodes is an error.
    async fn load(&self) -> Result<Option<StoredSession>> {
        let Some(bytes) = self.db.get(SESSION_KEY)? else {
            return Ok(None);
        };
        let (stored, _) = bincode::serde::decode_from_slice::<StoredSession, _>(
            &bytes,
            bincode::config::standard(),
        )
        .context("Failed to decode stored session")?;
        Ok(Some(stored))
    }

    async fn save(&self, session: &StoredSession) -> Result<()> {
        let bytes = bincode::serde::encode_to_vec(session, bincode::config::standard())?;
        self.db.insert(SESSION_KEY, bytes)?;
        self.db.flush_async().await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.db.remove(SESSION_KEY)?;
        self.db.flush_async().await?;
        Ok(())
    }
}
