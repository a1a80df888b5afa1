//! Session storage backends.
//!
//! Keys are token digests; the raw token never reaches a backend.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError};

use common::{AppError, AppResult};
use domain::Session;

use crate::config::CACHE_PREFIX_SESSION;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Store a session until its expiry.
    async fn save(&self, key: &str, session: &Session) -> AppResult<()>;

    /// Look up a session. Expired entries are reported as absent.
    async fn find(&self, key: &str) -> AppResult<Option<Session>>;

    async fn remove(&self, key: &str) -> AppResult<()>;

    /// Backend health check.
    async fn ping(&self) -> AppResult<()>;
}

// =============================================================================
// Redis
// =============================================================================

/// Redis-backed sessions; Redis expires entries on its own.
#[derive(Clone)]
pub struct RedisSessionStore {
    connection: ConnectionManager,
}

impl RedisSessionStore {
    pub async fn connect(url: &str) -> Result<Self, RedisError> {
        let client = Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;
        tracing::info!("Redis session store connected");
        Ok(Self { connection })
    }

    fn key(key: &str) -> String {
        format!("{}{}", CACHE_PREFIX_SESSION, key)
    }
}

#[async_trait]
impl SessionRepository for RedisSessionStore {
    async fn save(&self, key: &str, session: &Session) -> AppResult<()> {
        let ttl_seconds = session.remaining_at(Utc::now()).num_seconds().max(1) as u64;
        let json = serde_json::to_string(session)
            .map_err(|e| AppError::internal(format!("Session serialization error: {}", e)))?;

        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(Self::key(key), json, ttl_seconds)
            .await?;
        Ok(())
    }

    async fn find(&self, key: &str) -> AppResult<Option<Session>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(Self::key(key)).await?;

        let Some(json) = value else {
            return Ok(None);
        };
        let session: Session = serde_json::from_str(&json)
            .map_err(|e| AppError::internal(format!("Session deserialization error: {}", e)))?;

        Ok((!session.is_expired()).then_some(session))
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.del(Self::key(key)).await?;
        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

// =============================================================================
// In-process
// =============================================================================

/// In-process sessions for single-node and test deployments.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, Session>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn purge_expired(&self) {
        let now = Utc::now();
        self.sessions.retain(|_, session| !session.is_expired_at(now));
    }
}

#[async_trait]
impl SessionRepository for MemorySessionStore {
    async fn save(&self, key: &str, session: &Session) -> AppResult<()> {
        self.purge_expired();
        self.sessions.insert(key.to_string(), session.clone());
        Ok(())
    }

    async fn find(&self, key: &str) -> AppResult<Option<Session>> {
        Ok(self
            .sessions
            .get(key)
            .map(|entry| entry.value().clone())
            .filter(|session| !session.is_expired()))
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        self.sessions.remove(key);
        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    #[tokio::test]
    async fn memory_store_round_trip_and_remove() {
        let store = MemorySessionStore::new();
        let session = Session::start(Uuid::new_v4(), Duration::minutes(5));

        store.save("digest", &session).await.unwrap();
        assert_eq!(store.find("digest").await.unwrap(), Some(session));

        store.remove("digest").await.unwrap();
        assert_eq!(store.find("digest").await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_store_hides_and_purges_expired() {
        let store = MemorySessionStore::new();
        let expired = Session {
            account_id: Uuid::new_v4(),
            issued_at: Utc::now() - Duration::hours(2),
            expires_at: Utc::now() - Duration::hours(1),
        };

        store.save("old", &expired).await.unwrap();
        assert_eq!(store.find("old").await.unwrap(), None);
        assert_eq!(store.len(), 1);

        let fresh = Session::start(Uuid::new_v4(), Duration::minutes(5));
        store.save("new", &fresh).await.unwrap();
        assert_eq!(store.len(), 1);
    }
}
