//! Session resolver: request token to caller identity.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use common::{AppError, AppResult};
use domain::Session;

use super::store::SessionRepository;
use super::token::{token_digest, SessionToken};
use crate::config::SessionMode;
use crate::infra::bounded;
use crate::repository::AccountRepository;

pub struct SessionResolver {
    mode: SessionMode,
    sessions: Arc<dyn SessionRepository>,
    accounts: Arc<dyn AccountRepository>,
    ttl: chrono::Duration,
    store_timeout: Duration,
}

impl SessionResolver {
    pub fn new(
        mode: SessionMode,
        sessions: Arc<dyn SessionRepository>,
        accounts: Arc<dyn AccountRepository>,
        ttl: chrono::Duration,
        store_timeout: Duration,
    ) -> Self {
        if mode == SessionMode::Legacy {
            tracing::warn!(
                "Legacy session mode: the session cookie carries the raw account id and is trivially forgeable"
            );
        }

        Self {
            mode,
            sessions,
            accounts,
            ttl,
            store_timeout,
        }
    }

    /// Start a session for an authenticated account.
    pub async fn issue(&self, account_id: Uuid) -> AppResult<(SessionToken, Session)> {
        let session = Session::start(account_id, self.ttl);

        match self.mode {
            SessionMode::Table => {
                let token = SessionToken::generate();
                bounded(
                    self.store_timeout,
                    "save session",
                    self.sessions.save(&token.digest(), &session),
                )
                .await?;
                tracing::debug!(account_id = %account_id, "Session issued");
                Ok((token, session))
            }
            SessionMode::Legacy => Ok((SessionToken::from_raw(account_id.to_string()), session)),
        }
    }

    /// Map a request token to its session. Read-only.
    pub async fn resolve(&self, token: Option<&str>) -> AppResult<Session> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthenticated)?;

        match self.mode {
            SessionMode::Table => {
                let session = bounded(
                    self.store_timeout,
                    "load session",
                    self.sessions.find(&token_digest(token)),
                )
                .await?
                .ok_or(AppError::Unauthenticated)?;

                if session.is_expired_at(Utc::now()) {
                    return Err(AppError::Unauthenticated);
                }
                Ok(session)
            }
            SessionMode::Legacy => {
                let account_id = Uuid::parse_str(token).map_err(|_| AppError::Unauthenticated)?;
                let account = bounded(
                    self.store_timeout,
                    "load session account",
                    self.accounts.find_by_id(account_id),
                )
                .await?
                .ok_or(AppError::Unauthenticated)?;

                // Legacy cookies never expire on their own; bound them per request.
                Ok(Session::start(account.id, self.ttl))
            }
        }
    }

    /// End a session. Unknown tokens are ignored.
    pub async fn revoke(&self, token: &str) -> AppResult<()> {
        if self.mode == SessionMode::Legacy || token.trim().is_empty() {
            return Ok(());
        }

        bounded(
            self.store_timeout,
            "remove session",
            self.sessions.remove(&token_digest(token.trim())),
        )
        .await
    }

    /// Session backend health check.
    pub async fn ping(&self) -> AppResult<()> {
        self.sessions.ping().await
    }
}
