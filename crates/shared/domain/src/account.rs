//! Account domain entity and related types.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{
    FIELD_DEPT_ID, FIELD_NAME, FIELD_PASSWORD, FIELD_ROLE_ID, FIELD_USERNAME,
    MAX_DISPLAY_NAME_LENGTH, MAX_LOGIN_NAME_LENGTH,
};
use crate::error::{DomainError, DomainResult};

static LOGIN_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._@-]*$").expect("login name pattern"));

/// Account lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum AccountStatus {
    Active,
    Deleted,
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountStatus::Active => f.write_str("active"),
            AccountStatus::Deleted => f.write_str("deleted"),
        }
    }
}

/// Validated login name. Immutable once an account exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginName(String);

impl LoginName {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation(format!("{} is required", FIELD_USERNAME)));
        }
        if trimmed.chars().count() > MAX_LOGIN_NAME_LENGTH {
            return Err(DomainError::validation(format!(
                "{} must be at most {} characters",
                FIELD_USERNAME, MAX_LOGIN_NAME_LENGTH
            )));
        }
        if !LOGIN_NAME_PATTERN.is_match(trimmed) {
            return Err(DomainError::validation(format!(
                "{} may only contain letters, digits, '.', '_', '@' and '-'",
                FIELD_USERNAME
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Account domain entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub login_name: String,
    pub display_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role_id: Uuid,
    pub department_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft delete timestamp (None = active, Some = deleted)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn status(&self) -> AccountStatus {
        if self.is_deleted() {
            AccountStatus::Deleted
        } else {
            AccountStatus::Active
        }
    }
}

/// Input for the Add operation. Every field is required.
#[derive(Debug, Clone, Default)]
pub struct AccountDraft {
    pub username: String,
    pub password: String,
    pub name: String,
    pub role_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
}

/// Add input that passed presence and format checks.
#[derive(Debug, Clone)]
pub struct ValidatedDraft {
    pub login_name: LoginName,
    pub password: String,
    pub display_name: String,
    pub role_id: Uuid,
    pub department_id: Uuid,
}

impl AccountDraft {
    /// Check presence of every field, reporting all missing ones together,
    /// then check formats.
    pub fn validate(self) -> DomainResult<ValidatedDraft> {
        let mut missing = Vec::new();
        if self.username.trim().is_empty() {
            missing.push(FIELD_USERNAME);
        }
        if self.password.is_empty() {
            missing.push(FIELD_PASSWORD);
        }
        if self.name.trim().is_empty() {
            missing.push(FIELD_NAME);
        }
        if self.role_id.is_none() {
            missing.push(FIELD_ROLE_ID);
        }
        if self.department_id.is_none() {
            missing.push(FIELD_DEPT_ID);
        }

        let (Some(role_id), Some(department_id)) = (self.role_id, self.department_id) else {
            return Err(missing_fields(&missing));
        };
        if !missing.is_empty() {
            return Err(missing_fields(&missing));
        }

        Ok(ValidatedDraft {
            login_name: LoginName::parse(&self.username)?,
            password: self.password,
            display_name: display_name(&self.name)?,
            role_id,
            department_id,
        })
    }
}

/// Input for the Edit operation. Absent fields are left unchanged.
///
/// `username` is accepted so callers can echo the full record back, but the
/// login name is immutable and the value is never applied.
#[derive(Debug, Clone, Default)]
pub struct AccountEdit {
    pub username: Option<String>,
    pub name: Option<String>,
    pub role_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
}

impl AccountEdit {
    pub fn into_patch(self) -> DomainResult<AccountPatch> {
        let display_name = self.name.as_deref().map(display_name).transpose()?;
        Ok(AccountPatch {
            display_name,
            role_id: self.role_id,
            department_id: self.department_id,
        })
    }
}

/// Mutable account fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountPatch {
    pub display_name: Option<String>,
    pub role_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
}

/// Row to insert into the identity store.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub id: Uuid,
    pub login_name: String,
    pub display_name: String,
    pub password_hash: String,
    pub role_id: Uuid,
    pub department_id: Uuid,
}

/// Account summary returned by the lifecycle operations (no credential material).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AccountSummary {
    #[serde(rename = "ID")]
    pub id: Uuid,
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "RoleID")]
    pub role_id: Uuid,
    #[serde(rename = "RoleName")]
    pub role_name: Option<String>,
    #[serde(rename = "DeptID")]
    pub dept_id: Uuid,
    #[serde(rename = "DeptName")]
    pub dept_name: Option<String>,
    #[serde(rename = "Status")]
    pub status: AccountStatus,
    #[serde(rename = "CreateTime")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "UpdateTime")]
    pub updated_at: DateTime<Utc>,
}

impl AccountSummary {
    pub fn new(account: &Account, role_name: Option<String>, dept_name: Option<String>) -> Self {
        Self {
            id: account.id,
            username: account.login_name.clone(),
            name: account.display_name.clone(),
            role_id: account.role_id,
            role_name,
            dept_id: account.department_id,
            dept_name,
            status: account.status(),
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

fn display_name(raw: &str) -> DomainResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{} cannot be empty", FIELD_NAME)));
    }
    if trimmed.chars().count() > MAX_DISPLAY_NAME_LENGTH {
        return Err(DomainError::validation(format!(
            "{} must be at most {} characters",
            FIELD_NAME, MAX_DISPLAY_NAME_LENGTH
        )));
    }
    Ok(trimmed.to_string())
}

fn missing_fields(fields: &[&str]) -> DomainError {
    DomainError::validation(format!("Missing required fields: {}", fields.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> AccountDraft {
        AccountDraft {
            username: "user-0102".to_string(),
            password: "123".to_string(),
            name: "User 0102".to_string(),
            role_id: Some(Uuid::new_v4()),
            department_id: Some(Uuid::new_v4()),
        }
    }

    #[test]
    fn complete_draft_validates() {
        let valid = draft().validate().unwrap();
        assert_eq!(valid.login_name.as_str(), "user-0102");
        assert_eq!(valid.display_name, "User 0102");
    }

    #[test]
    fn missing_fields_are_reported_together() {
        let err = AccountDraft::default().validate().unwrap_err();
        let DomainError::Validation(msg) = err else {
            panic!("expected validation error");
        };
        for field in ["Username", "Password", "Name", "RoleID", "DeptID"] {
            assert!(msg.contains(field), "{} missing from '{}'", field, msg);
        }
    }

    #[test]
    fn login_name_rejects_whitespace_inside() {
        assert!(LoginName::parse("user 01").is_err());
        assert!(LoginName::parse("   ").is_err());
        assert_eq!(LoginName::parse(" admin-01 ").unwrap().as_str(), "admin-01");
    }

    #[test]
    fn login_name_length_is_bounded() {
        let long = "a".repeat(MAX_LOGIN_NAME_LENGTH + 1);
        assert!(LoginName::parse(&long).is_err());
    }

    #[test]
    fn edit_rejects_blank_name_but_allows_absent() {
        let blank = AccountEdit {
            name: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(blank.into_patch().is_err());

        let patch = AccountEdit::default().into_patch().unwrap();
        assert_eq!(patch, AccountPatch::default());
    }

    #[test]
    fn edit_never_carries_username() {
        let patch = AccountEdit {
            username: Some("changed".to_string()),
            name: Some("Renamed".to_string()),
            ..Default::default()
        }
        .into_patch()
        .unwrap();
        assert_eq!(patch.display_name.as_deref(), Some("Renamed"));
    }

    #[test]
    fn summary_reflects_soft_delete() {
        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            login_name: "admin-01".to_string(),
            display_name: "Admin".to_string(),
            password_hash: "hash".to_string(),
            role_id: Uuid::new_v4(),
            department_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            deleted_at: Some(now),
        };
        let summary = AccountSummary::new(&account, None, None);
        assert_eq!(summary.status, AccountStatus::Deleted);
        assert_eq!(summary.username, "admin-01");
    }
}
