//! Credential manager - password hashing and credential transitions.

use std::sync::Arc;
use std::time::Duration;

use constant_time_eq::constant_time_eq;
use once_cell::sync::Lazy;
use uuid::Uuid;

use common::{AppError, AppResult, OptionExt};
use domain::{Account, Password};

use super::PasswordPolicy;
use crate::infra::bounded;
use crate::repository::AccountRepository;

/// Verified against when a login name is unknown, so a miss costs the same
/// as a wrong password.
static DUMMY_PASSWORD: Lazy<Option<Password>> =
    Lazy::new(|| Password::hash("timing-equalisation-only").ok());

pub struct CredentialManager {
    accounts: Arc<dyn AccountRepository>,
    policy: PasswordPolicy,
    store_timeout: Duration,
}

impl CredentialManager {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        policy: PasswordPolicy,
        store_timeout: Duration,
    ) -> Self {
        Self {
            accounts,
            policy,
            store_timeout,
        }
    }

    /// Check policy and hash the first password of a new account.
    pub fn set_initial_credential(&self, account_id: Uuid, plain_text: &str) -> AppResult<Password> {
        self.policy.check(plain_text)?;
        let password = Password::hash(plain_text)?;
        tracing::debug!(account_id = %account_id, "Initial credential hashed");
        Ok(password)
    }

    /// Replace an account's password.
    ///
    /// Checks run cheapest first: confirmation, policy, then the current
    /// password. The write is a compare-and-swap on the hash that was
    /// verified, so of two concurrent changes at most one lands.
    pub async fn change_credential(
        &self,
        account_id: Uuid,
        old_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> AppResult<()> {
        if !constant_time_eq(new_password.as_bytes(), confirm_password.as_bytes()) {
            return Err(AppError::ConfirmationMismatch);
        }
        self.policy.check(new_password)?;

        let account = bounded(
            self.store_timeout,
            "load account",
            self.accounts.find_by_id(account_id),
        )
        .await?
        .ok_or_not_found()?;

        let current = Password::from_hash(account.password_hash.as_str());
        if !current.verify(old_password) {
            tracing::warn!(account_id = %account_id, "Password change rejected: current password mismatch");
            return Err(AppError::CredentialMismatch);
        }
        if self.policy.forbid_reuse && current.verify(new_password) {
            return Err(AppError::policy(
                "New password must differ from the current password",
            ));
        }

        let replacement = Password::hash(new_password)?;
        let swapped = bounded(
            self.store_timeout,
            "replace credential",
            self.accounts.replace_credential(
                account_id,
                &account.password_hash,
                replacement.into_string(),
            ),
        )
        .await?;

        if !swapped {
            tracing::warn!(account_id = %account_id, "Password changed concurrently; rejecting stale change");
            return Err(AppError::CredentialMismatch);
        }

        tracing::info!(account_id = %account_id, "Password changed");
        Ok(())
    }

    /// Verify a login name and password pair against an active account.
    pub async fn authenticate(&self, login_name: &str, plain_text: &str) -> AppResult<Account> {
        let account = bounded(
            self.store_timeout,
            "load account",
            self.accounts.find_by_login_name(login_name.trim()),
        )
        .await?;

        match account {
            Some(account) if Password::from_hash(account.password_hash.as_str()).verify(plain_text) => {
                Ok(account)
            }
            Some(_) => Err(AppError::CredentialMismatch),
            None => {
                if let Some(dummy) = DUMMY_PASSWORD.as_ref() {
                    let _ = dummy.verify(plain_text);
                }
                Err(AppError::CredentialMismatch)
            }
        }
    }
}
