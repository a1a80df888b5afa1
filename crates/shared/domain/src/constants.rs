//! Domain-level constants.
//!
//! These constants define business rules and validation requirements.

// =============================================================================
// Permissions
// =============================================================================

/// Permission to search and view accounts
pub const PERMISSION_READ: &str = "read";

/// Permission to create, edit and delete accounts
pub const PERMISSION_WRITE: &str = "write";

/// Administrative permission; implies every other permission
pub const PERMISSION_ADMIN: &str = "admin";

/// Separator used when a permission set is stored as text
pub const PERMISSION_SEPARATOR: char = ',';

// =============================================================================
// Validation
// =============================================================================

/// Maximum login name length
pub const MAX_LOGIN_NAME_LENGTH: usize = 64;

/// Maximum display name length
pub const MAX_DISPLAY_NAME_LENGTH: usize = 128;

/// Default minimum password length
pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 3;

/// Default maximum password length
pub const DEFAULT_MAX_PASSWORD_LENGTH: usize = 128;

// =============================================================================
// Field names (as they appear on the wire)
// =============================================================================

pub const FIELD_USERNAME: &str = "Username";
pub const FIELD_PASSWORD: &str = "Password";
pub const FIELD_NAME: &str = "Name";
pub const FIELD_ROLE_ID: &str = "RoleID";
pub const FIELD_DEPT_ID: &str = "DeptID";
