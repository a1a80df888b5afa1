//! Password policy.

use common::{AppError, AppResult};
use domain::{DEFAULT_MAX_PASSWORD_LENGTH, DEFAULT_MIN_PASSWORD_LENGTH};

/// Rules a new password must satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
    /// Reject a new password equal to the current one
    pub forbid_reuse: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_PASSWORD_LENGTH,
            max_length: DEFAULT_MAX_PASSWORD_LENGTH,
            forbid_reuse: false,
        }
    }
}

impl PasswordPolicy {
    /// Check a plaintext candidate. Length counts characters, not bytes.
    pub fn check(&self, candidate: &str) -> AppResult<()> {
        if candidate.is_empty() {
            return Err(AppError::policy("Password cannot be empty"));
        }

        let length = candidate.chars().count();
        if length < self.min_length {
            return Err(AppError::policy(format!(
                "Password must be at least {} characters",
                self.min_length
            )));
        }
        if length > self.max_length {
            return Err(AppError::policy(format!(
                "Password must be at most {} characters",
                self.max_length
            )));
        }
        Ok(())
    }
}
