//! Account lifecycle service - List, Get, Add, Edit, Delete, ChangePassword.
//!
//! Every operation takes the caller's session explicitly; the gate decides
//! whether it is needed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::try_join;
use uuid::Uuid;

use common::{AppError, AppResult, OptionExt};
use domain::{Account, AccountDraft, AccountEdit, AccountSummary, NewAccount, Permission, Session};

use crate::authority::AuthorityGate;
use crate::config::LIST_RETRY_DELAY_MS;
use crate::credential::CredentialManager;
use crate::infra::bounded;
use crate::repository::{AccountCriteria, AccountRepository, DepartmentRepository, RoleRepository};
use crate::types::Paginated;

/// Password change request.
#[derive(Debug, Clone)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Store-access tuning for the lifecycle service.
#[derive(Debug, Clone, Copy)]
pub struct ServiceSettings {
    pub store_timeout: Duration,
    pub list_retries: u32,
}

#[async_trait]
pub trait AccountService: Send + Sync {
    /// Search active accounts by keyword. Requires `read`.
    async fn list(
        &self,
        session: Option<&Session>,
        criteria: AccountCriteria,
    ) -> AppResult<Paginated<AccountSummary>>;

    /// Fetch one account, including deleted ones. Requires `read`.
    async fn get(&self, session: Option<&Session>, id: Uuid) -> AppResult<AccountSummary>;

    /// Create an account. Requires `write`.
    async fn add(&self, session: Option<&Session>, draft: AccountDraft) -> AppResult<AccountSummary>;

    /// Edit display name, role or department. Requires `write`.
    async fn edit(
        &self,
        session: Option<&Session>,
        id: Uuid,
        edit: AccountEdit,
    ) -> AppResult<AccountSummary>;

    /// Soft delete an account. Requires `write`.
    async fn delete(&self, session: Option<&Session>, id: Uuid) -> AppResult<()>;

    /// Change the password of the session's own account.
    ///
    /// Not gated by a permission: any valid session may call it, and it only
    /// ever acts on the account the session belongs to. Fails with
    /// `Unauthenticated` without a session.
    async fn change_password(
        &self,
        session: Option<&Session>,
        change: PasswordChange,
    ) -> AppResult<()>;
}

pub struct AccountManager {
    accounts: Arc<dyn AccountRepository>,
    roles: Arc<dyn RoleRepository>,
    departments: Arc<dyn DepartmentRepository>,
    credentials: Arc<CredentialManager>,
    gate: Arc<AuthorityGate>,
    settings: ServiceSettings,
}

impl AccountManager {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        roles: Arc<dyn RoleRepository>,
        departments: Arc<dyn DepartmentRepository>,
        credentials: Arc<CredentialManager>,
        gate: Arc<AuthorityGate>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            accounts,
            roles,
            departments,
            credentials,
            gate,
            settings,
        }
    }

    async fn find_page(&self, criteria: &AccountCriteria) -> AppResult<(Vec<Account>, u64)> {
        let mut attempt = 0;
        loop {
            let result = bounded(
                self.settings.store_timeout,
                "list accounts",
                self.accounts.find(criteria),
            )
            .await;

            match result {
                Err(err) if err.is_retryable() && attempt < self.settings.list_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %err, "Transient failure listing accounts; retrying");
                    tokio::time::sleep(Duration::from_millis(LIST_RETRY_DELAY_MS)).await;
                }
                other => return other,
            }
        }
    }

    /// Summary with role and department names; deleted references show no name.
    async fn summarize(&self, account: Account) -> AppResult<AccountSummary> {
        let timeout = self.settings.store_timeout;
        let (role, department) = try_join!(
            bounded(timeout, "load role", self.roles.find_by_id(account.role_id)),
            bounded(
                timeout,
                "load department",
                self.departments.find_by_id(account.department_id)
            ),
        )?;

        Ok(AccountSummary::new(
            &account,
            role.map(|r| r.name),
            department.map(|d| d.name),
        ))
    }
}

#[async_trait]
impl AccountService for AccountManager {
    async fn list(
        &self,
        session: Option<&Session>,
        criteria: AccountCriteria,
    ) -> AppResult<Paginated<AccountSummary>> {
        self.gate.authorize(session, Permission::Read).await?;

        let (accounts, total) = self.find_page(&criteria).await?;

        let timeout = self.settings.store_timeout;
        let (roles, departments) = try_join!(
            bounded(timeout, "list roles", self.roles.list()),
            bounded(timeout, "list departments", self.departments.list()),
        )?;
        let role_names: HashMap<Uuid, String> =
            roles.into_iter().map(|r| (r.id, r.name)).collect();
        let department_names: HashMap<Uuid, String> =
            departments.into_iter().map(|d| (d.id, d.name)).collect();

        let summaries = accounts
            .iter()
            .map(|account| {
                AccountSummary::new(
                    account,
                    role_names.get(&account.role_id).cloned(),
                    department_names.get(&account.department_id).cloned(),
                )
            })
            .collect();

        Ok(Paginated::new(
            summaries,
            criteria.page.page,
            criteria.page.limit(),
            total,
        ))
    }

    async fn get(&self, session: Option<&Session>, id: Uuid) -> AppResult<AccountSummary> {
        self.gate.authorize(session, Permission::Read).await?;

        let account = bounded(
            self.settings.store_timeout,
            "load account",
            self.accounts.find_by_id_with_deleted(id),
        )
        .await?
        .ok_or_not_found()?;

        self.summarize(account).await
    }

    async fn add(&self, session: Option<&Session>, draft: AccountDraft) -> AppResult<AccountSummary> {
        self.gate.authorize(session, Permission::Write).await?;

        let valid = draft.validate()?;
        let id = Uuid::new_v4();
        let password = self.credentials.set_initial_credential(id, &valid.password)?;

        let candidate = NewAccount {
            id,
            login_name: valid.login_name.into_inner(),
            display_name: valid.display_name,
            password_hash: password.into_string(),
            role_id: valid.role_id,
            department_id: valid.department_id,
        };
        let account = bounded(
            self.settings.store_timeout,
            "create account",
            self.accounts.create(candidate),
        )
        .await?;

        tracing::info!(account_id = %account.id, login_name = %account.login_name, "Account created");
        self.summarize(account).await
    }

    async fn edit(
        &self,
        session: Option<&Session>,
        id: Uuid,
        edit: AccountEdit,
    ) -> AppResult<AccountSummary> {
        self.gate.authorize(session, Permission::Write).await?;

        let requested_login = edit.username.clone();
        let patch = edit.into_patch()?;
        let account = bounded(
            self.settings.store_timeout,
            "update account",
            self.accounts.update(id, patch),
        )
        .await?;

        if let Some(requested) = requested_login
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty() && *r != account.login_name)
        {
            tracing::warn!(
                account_id = %account.id,
                requested = %requested,
                "Login name is immutable; ignoring requested change"
            );
        }

        tracing::info!(account_id = %account.id, "Account updated");
        self.summarize(account).await
    }

    async fn delete(&self, session: Option<&Session>, id: Uuid) -> AppResult<()> {
        self.gate.authorize(session, Permission::Write).await?;

        bounded(
            self.settings.store_timeout,
            "delete account",
            self.accounts.soft_delete(id),
        )
        .await?;

        tracing::info!(account_id = %id, "Account deleted");
        Ok(())
    }

    async fn change_password(
        &self,
        session: Option<&Session>,
        change: PasswordChange,
    ) -> AppResult<()> {
        let session = session.ok_or(AppError::Unauthenticated)?;

        self.credentials
            .change_credential(
                session.account_id,
                &change.old_password,
                &change.new_password,
                &change.confirm_password,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use mockall::predicate::{always, eq};

    use crate::authority::AuthorityMode;
    use crate::credential::PasswordPolicy;
    use crate::repository::{MockAccountRepository, MockDepartmentRepository, MockRoleRepository};
    use domain::{AccountPatch, Department, Password, Role};

    fn settings() -> ServiceSettings {
        ServiceSettings {
            store_timeout: Duration::from_secs(1),
            list_retries: 1,
        }
    }

    fn account(id: Uuid) -> Account {
        let now = Utc::now();
        Account {
            id,
            login_name: "user-0102".to_string(),
            display_name: "User 0102".to_string(),
            password_hash: "hash".to_string(),
            role_id: Uuid::new_v4(),
            department_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn role(id: Uuid) -> Role {
        let now = Utc::now();
        Role {
            id,
            name: "Operators".to_string(),
            permissions: [Permission::Read].into_iter().collect(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn department(id: Uuid) -> Department {
        let now = Utc::now();
        Department {
            id,
            name: "Support".to_string(),
            parent_id: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Builds a manager whose gate is disabled, so only store behaviour is exercised.
    fn manager(
        accounts: MockAccountRepository,
        roles: MockRoleRepository,
        departments: MockDepartmentRepository,
    ) -> AccountManager {
        let accounts: Arc<dyn AccountRepository> = Arc::new(accounts);
        let roles: Arc<dyn RoleRepository> = Arc::new(roles);
        let credentials = Arc::new(CredentialManager::new(
            accounts.clone(),
            PasswordPolicy::default(),
            Duration::from_secs(1),
        ));
        let gate = Arc::new(AuthorityGate::new(
            AuthorityMode::Disabled,
            accounts.clone(),
            roles.clone(),
            Duration::from_secs(1),
        ));
        AccountManager::new(
            accounts,
            roles,
            Arc::new(departments),
            credentials,
            gate,
            settings(),
        )
    }

    fn lookups() -> (MockRoleRepository, MockDepartmentRepository) {
        let mut roles = MockRoleRepository::new();
        roles.expect_find_by_id().returning(|id| Ok(Some(role(id))));
        roles.expect_list().returning(|| Ok(vec![]));
        let mut departments = MockDepartmentRepository::new();
        departments
            .expect_find_by_id()
            .returning(|id| Ok(Some(department(id))));
        departments.expect_list().returning(|| Ok(vec![]));
        (roles, departments)
    }

    #[tokio::test]
    async fn list_retries_once_on_transient_failure() {
        let mut accounts = MockAccountRepository::new();
        let mut calls = 0;
        accounts.expect_find().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(AppError::transient("connection reset"))
            } else {
                Ok((vec![account(Uuid::new_v4())], 1))
            }
        });
        let (roles, departments) = lookups();

        let page = manager(accounts, roles, departments)
            .list(None, AccountCriteria::default())
            .await
            .unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.meta.total, 1);
    }

    #[tokio::test]
    async fn list_gives_up_after_configured_retries() {
        let mut accounts = MockAccountRepository::new();
        accounts
            .expect_find()
            .times(2)
            .returning(|_| Err(AppError::transient("connection reset")));
        let (roles, departments) = lookups();

        let err = manager(accounts, roles, departments)
            .list(None, AccountCriteria::default())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn list_does_not_retry_permanent_failures() {
        let mut accounts = MockAccountRepository::new();
        accounts
            .expect_find()
            .times(1)
            .returning(|_| Err(AppError::internal("bad query")));
        let (roles, departments) = lookups();

        let err = manager(accounts, roles, departments)
            .list(None, AccountCriteria::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn add_hashes_password_and_generates_id() {
        let role_id = Uuid::new_v4();
        let department_id = Uuid::new_v4();

        let mut accounts = MockAccountRepository::new();
        accounts
            .expect_create()
            .withf(|candidate| {
                candidate.login_name == "user-0102"
                    && candidate.password_hash != "123"
                    && Password::from_hash(candidate.password_hash.as_str()).verify("123")
            })
            .times(1)
            .returning(|candidate| {
                let now = Utc::now();
                Ok(Account {
                    id: candidate.id,
                    login_name: candidate.login_name,
                    display_name: candidate.display_name,
                    password_hash: candidate.password_hash,
                    role_id: candidate.role_id,
                    department_id: candidate.department_id,
                    created_at: now,
                    updated_at: now,
                    deleted_at: None,
                })
            });
        let (roles, departments) = lookups();

        let summary = manager(accounts, roles, departments)
            .add(
                None,
                AccountDraft {
                    username: "user-0102".to_string(),
                    password: "123".to_string(),
                    name: "User 0102".to_string(),
                    role_id: Some(role_id),
                    department_id: Some(department_id),
                },
            )
            .await
            .unwrap();

        assert_eq!(summary.username, "user-0102");
        assert_eq!(summary.role_id, role_id);
        assert_eq!(summary.role_name.as_deref(), Some("Operators"));
        assert_eq!(summary.dept_name.as_deref(), Some("Support"));
    }

    #[tokio::test]
    async fn add_with_missing_fields_never_reaches_store() {
        let mut accounts = MockAccountRepository::new();
        accounts.expect_create().never();
        let (roles, departments) = lookups();

        let err = manager(accounts, roles, departments)
            .add(None, AccountDraft::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn edit_never_forwards_login_name() {
        let id = Uuid::new_v4();
        let mut accounts = MockAccountRepository::new();
        accounts
            .expect_update()
            .with(
                eq(id),
                eq(AccountPatch {
                    display_name: Some("Renamed".to_string()),
                    role_id: None,
                    department_id: None,
                }),
            )
            .returning(|id, patch| {
                let mut account = account(id);
                account.display_name = patch.display_name.unwrap_or_default();
                Ok(account)
            });
        let (roles, departments) = lookups();

        let summary = manager(accounts, roles, departments)
            .edit(
                None,
                id,
                AccountEdit {
                    username: Some("changed".to_string()),
                    name: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(summary.username, "user-0102");
        assert_eq!(summary.name, "Renamed");
    }

    #[tokio::test]
    async fn delete_soft_deletes_the_target() {
        let id = Uuid::new_v4();
        let mut accounts = MockAccountRepository::new();
        accounts
            .expect_soft_delete()
            .with(eq(id))
            .times(1)
            .returning(|_| Ok(()));
        let (roles, departments) = lookups();

        manager(accounts, roles, departments)
            .delete(None, id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn get_includes_deleted_accounts() {
        let id = Uuid::new_v4();
        let mut accounts = MockAccountRepository::new();
        accounts
            .expect_find_by_id_with_deleted()
            .with(eq(id))
            .returning(|id| {
                let mut account = account(id);
                account.deleted_at = Some(Utc::now());
                Ok(Some(account))
            });
        let (roles, departments) = lookups();

        let summary = manager(accounts, roles, departments)
            .get(None, id)
            .await
            .unwrap();
        assert_eq!(summary.status, domain::AccountStatus::Deleted);
    }

    #[tokio::test]
    async fn change_password_requires_session() {
        let mut accounts = MockAccountRepository::new();
        accounts.expect_replace_credential().never();
        let (roles, departments) = lookups();

        let err = manager(accounts, roles, departments)
            .change_password(
                None,
                PasswordChange {
                    old_password: "123".to_string(),
                    new_password: "456".to_string(),
                    confirm_password: "456".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }

    #[tokio::test]
    async fn change_password_targets_session_account_only() {
        let caller = Uuid::new_v4();
        let stored = Password::hash("123").unwrap().into_string();

        let mut accounts = MockAccountRepository::new();
        let hash = stored.clone();
        accounts
            .expect_find_by_id()
            .with(eq(caller))
            .returning(move |id| {
                let mut account = account(id);
                account.password_hash = hash.clone();
                Ok(Some(account))
            });
        accounts
            .expect_replace_credential()
            .with(eq(caller), always(), always())
            .times(1)
            .returning(|_, _, _| Ok(true));
        let (roles, departments) = lookups();

        let session = Session::start(caller, ChronoDuration::minutes(5));
        manager(accounts, roles, departments)
            .change_password(
                Some(&session),
                PasswordChange {
                    old_password: "123".to_string(),
                    new_password: "456".to_string(),
                    confirm_password: "456".to_string(),
                },
            )
            .await
            .unwrap();
    }
}
