//! Role and permission types.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{PERMISSION_ADMIN, PERMISSION_READ, PERMISSION_SEPARATOR, PERMISSION_WRITE};
use crate::error::{DomainError, DomainResult};

/// Permission required by a lifecycle operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Write,
    Admin,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Read => PERMISSION_READ,
            Permission::Write => PERMISSION_WRITE,
            Permission::Admin => PERMISSION_ADMIN,
        }
    }

    /// Parse a comma separated permission list. Blank entries are skipped.
    pub fn parse_list(raw: &str) -> DomainResult<BTreeSet<Permission>> {
        raw.split(PERMISSION_SEPARATOR)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Permission::from_str)
            .collect()
    }

    /// Render a permission set in its stored form.
    pub fn join_list(permissions: &BTreeSet<Permission>) -> String {
        permissions
            .iter()
            .map(Permission::as_str)
            .collect::<Vec<_>>()
            .join(&PERMISSION_SEPARATOR.to_string())
    }
}

impl FromStr for Permission {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            PERMISSION_READ => Ok(Permission::Read),
            PERMISSION_WRITE => Ok(Permission::Write),
            PERMISSION_ADMIN => Ok(Permission::Admin),
            other => Err(DomainError::validation(format!("Unknown permission '{}'", other))),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role entity. Accounts reference exactly one role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub permissions: BTreeSet<Permission>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Role {
    /// Whether holders of this role may perform an operation needing `required`.
    pub fn grants(&self, required: Permission) -> bool {
        self.permissions.contains(&Permission::Admin) || self.permissions.contains(&required)
    }

    pub fn is_admin(&self) -> bool {
        self.permissions.contains(&Permission::Admin)
    }
}

/// Role creation data.
#[derive(Debug, Clone)]
pub struct NewRole {
    pub name: String,
    pub permissions: BTreeSet<Permission>,
}
