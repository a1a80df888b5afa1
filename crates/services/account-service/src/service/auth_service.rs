//! Authentication service - login, logout and session lookup.

use std::sync::Arc;

use async_trait::async_trait;

use common::AppResult;
use domain::{Account, Session};

use crate::credential::CredentialManager;
use crate::session::{SessionResolver, SessionToken};

/// Result of a successful login.
#[derive(Debug)]
pub struct LoginOutcome {
    pub token: SessionToken,
    pub session: Session,
    pub account: Account,
}

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Verify credentials and start a session
    async fn login(&self, username: &str, password: &str) -> AppResult<LoginOutcome>;

    /// End the session behind a token. Unknown tokens are ignored.
    async fn logout(&self, token: &str) -> AppResult<()>;

    /// Map a request token to its session
    async fn resolve(&self, token: Option<&str>) -> AppResult<Session>;
}

pub struct Authenticator {
    credentials: Arc<CredentialManager>,
    sessions: Arc<SessionResolver>,
}

impl Authenticator {
    pub fn new(credentials: Arc<CredentialManager>, sessions: Arc<SessionResolver>) -> Self {
        Self {
            credentials,
            sessions,
        }
    }
}

#[async_trait]
impl AuthService for Authenticator {
    async fn login(&self, username: &str, password: &str) -> AppResult<LoginOutcome> {
        let account = self.credentials.authenticate(username, password).await?;
        let (token, session) = self.sessions.issue(account.id).await?;

        tracing::info!(account_id = %account.id, "Login succeeded");
        Ok(LoginOutcome {
            token,
            session,
            account,
        })
    }

    async fn logout(&self, token: &str) -> AppResult<()> {
        self.sessions.revoke(token).await
    }

    async fn resolve(&self, token: Option<&str>) -> AppResult<Session> {
        self.sessions.resolve(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::Utc;
    use mockall::predicate::eq;
    use uuid::Uuid;

    use crate::config::SessionMode;
    use crate::credential::PasswordPolicy;
    use crate::repository::{AccountRepository, MockAccountRepository};
    use crate::session::MemorySessionStore;
    use common::AppError;
    use domain::Password;

    fn authenticator(accounts: MockAccountRepository) -> Authenticator {
        let accounts: Arc<dyn AccountRepository> = Arc::new(accounts);
        let credentials = Arc::new(CredentialManager::new(
            accounts.clone(),
            PasswordPolicy::default(),
            Duration::from_secs(1),
        ));
        let sessions = Arc::new(SessionResolver::new(
            SessionMode::Table,
            Arc::new(MemorySessionStore::new()),
            accounts,
            chrono::Duration::minutes(30),
            Duration::from_secs(1),
        ));
        Authenticator::new(credentials, sessions)
    }

    fn stored_account(login_name: &str, plain: &str) -> Account {
        let now = Utc::now();
        Account {
            id: Uuid::new_v4(),
            login_name: login_name.to_string(),
            display_name: "Admin".to_string(),
            password_hash: Password::hash(plain).unwrap().into_string(),
            role_id: Uuid::new_v4(),
            department_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn login_issues_resolvable_session() {
        let account = stored_account("admin-01", "secret");
        let account_id = account.id;

        let mut accounts = MockAccountRepository::new();
        accounts
            .expect_find_by_login_name()
            .with(eq("admin-01"))
            .returning(move |_| Ok(Some(account.clone())));

        let auth = authenticator(accounts);
        let outcome = auth.login("admin-01", "secret").await.unwrap();
        assert_eq!(outcome.account.id, account_id);

        let session = auth.resolve(Some(outcome.token.as_str())).await.unwrap();
        assert_eq!(session.account_id, account_id);

        auth.logout(outcome.token.as_str()).await.unwrap();
        assert!(matches!(
            auth.resolve(Some(outcome.token.as_str())).await,
            Err(AppError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn wrong_password_is_credential_mismatch() {
        let account = stored_account("admin-01", "secret");
        let mut accounts = MockAccountRepository::new();
        accounts
            .expect_find_by_login_name()
            .returning(move |_| Ok(Some(account.clone())));

        let err = authenticator(accounts)
            .login("admin-01", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CredentialMismatch));
    }
}
