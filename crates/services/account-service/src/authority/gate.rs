//! Authority gate.
//!
//! The mode is fixed when the gate is built; there is no way to flip it on a
//! running gate. Tests build one gate per mode.

use std::sync::Arc;
use std::time::Duration;

use common::{AppError, AppResult};
use domain::{Permission, Session};

use crate::infra::bounded;
use crate::repository::{AccountRepository, RoleRepository};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorityMode {
    Enabled,
    Disabled,
}

impl From<bool> for AuthorityMode {
    fn from(enabled: bool) -> Self {
        if enabled {
            AuthorityMode::Enabled
        } else {
            AuthorityMode::Disabled
        }
    }
}

/// Outcome of a successful authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The caller holds the permission
    Granted,
    /// Checks are disabled; nothing was verified
    Bypassed,
}

pub struct AuthorityGate {
    mode: AuthorityMode,
    accounts: Arc<dyn AccountRepository>,
    roles: Arc<dyn RoleRepository>,
    store_timeout: Duration,
}

impl AuthorityGate {
    pub fn new(
        mode: AuthorityMode,
        accounts: Arc<dyn AccountRepository>,
        roles: Arc<dyn RoleRepository>,
        store_timeout: Duration,
    ) -> Self {
        if mode == AuthorityMode::Disabled {
            tracing::warn!("Authority checks are DISABLED; every operation will be allowed");
        }

        Self {
            mode,
            accounts,
            roles,
            store_timeout,
        }
    }

    /// Check that the session's account may perform an operation needing `required`.
    pub async fn authorize(
        &self,
        session: Option<&Session>,
        required: Permission,
    ) -> AppResult<Access> {
        if self.mode == AuthorityMode::Disabled {
            tracing::debug!(permission = %required, "Authority check bypassed");
            return Ok(Access::Bypassed);
        }

        let session = session.ok_or(AppError::Unauthenticated)?;

        let account = bounded(
            self.store_timeout,
            "load caller account",
            self.accounts.find_by_id(session.account_id),
        )
        .await?
        .ok_or_else(|| {
            tracing::warn!(account_id = %session.account_id, "Session refers to a missing or deleted account");
            AppError::Unauthenticated
        })?;

        let role = bounded(
            self.store_timeout,
            "load caller role",
            self.roles.find_by_id(account.role_id),
        )
        .await?;

        match role {
            Some(role) if role.grants(required) => Ok(Access::Granted),
            _ => {
                tracing::warn!(
                    account_id = %account.id,
                    role_id = %account.role_id,
                    permission = %required,
                    "Authorization denied"
                );
                Err(AppError::Unauthorized)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use mockall::predicate::eq;
    use uuid::Uuid;

    use crate::repository::{MockAccountRepository, MockRoleRepository};
    use domain::{Account, Role};

    fn account(id: Uuid, role_id: Uuid) -> Account {
        let now = Utc::now();
        Account {
            id,
            login_name: "operator".to_string(),
            display_name: "Operator".to_string(),
            password_hash: "hash".to_string(),
            role_id,
            department_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn role(id: Uuid, permissions: &[Permission]) -> Role {
        let now = Utc::now();
        Role {
            id,
            name: "Readers".to_string(),
            permissions: permissions.iter().copied().collect(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn gate(
        mode: AuthorityMode,
        accounts: MockAccountRepository,
        roles: MockRoleRepository,
    ) -> AuthorityGate {
        AuthorityGate::new(
            mode,
            Arc::new(accounts),
            Arc::new(roles),
            std::time::Duration::from_secs(1),
        )
    }

    fn reader_mocks(account_id: Uuid) -> (MockAccountRepository, MockRoleRepository) {
        let role_id = Uuid::new_v4();
        let mut accounts = MockAccountRepository::new();
        accounts
            .expect_find_by_id()
            .with(eq(account_id))
            .returning(move |id| Ok(Some(account(id, role_id))));
        let mut roles = MockRoleRepository::new();
        roles
            .expect_find_by_id()
            .with(eq(role_id))
            .returning(|id| Ok(Some(role(id, &[Permission::Read]))));
        (accounts, roles)
    }

    #[tokio::test]
    async fn disabled_gate_bypasses_without_session() {
        let mut accounts = MockAccountRepository::new();
        accounts.expect_find_by_id().never();

        let gate = gate(AuthorityMode::Disabled, accounts, MockRoleRepository::new());
        let access = gate.authorize(None, Permission::Admin).await.unwrap();
        assert_eq!(access, Access::Bypassed);
    }

    #[tokio::test]
    async fn enabled_gate_requires_session() {
        let gate = gate(
            AuthorityMode::Enabled,
            MockAccountRepository::new(),
            MockRoleRepository::new(),
        );
        let err = gate.authorize(None, Permission::Read).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }

    #[tokio::test]
    async fn granted_permission_passes() {
        let account_id = Uuid::new_v4();
        let (accounts, roles) = reader_mocks(account_id);
        let session = Session::start(account_id, ChronoDuration::minutes(5));

        let gate = gate(AuthorityMode::Enabled, accounts, roles);
        let access = gate.authorize(Some(&session), Permission::Read).await.unwrap();
        assert_eq!(access, Access::Granted);
    }

    #[tokio::test]
    async fn missing_permission_is_unauthorized() {
        let account_id = Uuid::new_v4();
        let (accounts, roles) = reader_mocks(account_id);
        let session = Session::start(account_id, ChronoDuration::minutes(5));

        let gate = gate(AuthorityMode::Enabled, accounts, roles);
        let err = gate
            .authorize(Some(&session), Permission::Write)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn deleted_role_grants_nothing() {
        let mut accounts = MockAccountRepository::new();
        accounts
            .expect_find_by_id()
            .returning(|id| Ok(Some(account(id, Uuid::new_v4()))));
        let mut roles = MockRoleRepository::new();
        roles.expect_find_by_id().returning(|_| Ok(None));
        let session = Session::start(Uuid::new_v4(), ChronoDuration::minutes(5));

        let gate = gate(AuthorityMode::Enabled, accounts, roles);
        let err = gate
            .authorize(Some(&session), Permission::Read)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn session_of_deleted_account_is_unauthenticated() {
        let mut accounts = MockAccountRepository::new();
        accounts.expect_find_by_id().returning(|_| Ok(None));
        let session = Session::start(Uuid::new_v4(), ChronoDuration::minutes(5));

        let gate = gate(AuthorityMode::Enabled, accounts, MockRoleRepository::new());
        let err = gate
            .authorize(Some(&session), Permission::Read)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }
}
