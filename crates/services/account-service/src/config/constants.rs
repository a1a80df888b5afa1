//! Service-wide constants
//!
//! Centralized location for magic values to improve maintainability.

// =============================================================================
// Pagination
// =============================================================================

/// Default number of items per page
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Maximum allowed items per page to prevent excessive queries
pub const MAX_PAGE_SIZE: u64 = 100;

/// Default starting page number (1-indexed)
pub const DEFAULT_PAGE_NUMBER: u64 = 1;

// =============================================================================
// Server Configuration
// =============================================================================

/// Default server host address
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// Default server port
pub const DEFAULT_SERVER_PORT: u16 = 3000;

// =============================================================================
// Sessions
// =============================================================================

/// Default session cookie name
pub const DEFAULT_SESSION_COOKIE: &str = "session";

/// Default session lifetime in minutes (24 hours)
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 24 * 60;

/// Redis key prefix for sessions
pub const CACHE_PREFIX_SESSION: &str = "session:";

/// Random bytes in a session token (hex encoded on the wire)
pub const SESSION_TOKEN_BYTES: usize = 32;

// =============================================================================
// Store access
// =============================================================================

/// Default bound on a single store call in milliseconds
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5000;

/// Default number of automatic retries for List on transient failures
pub const DEFAULT_LIST_RETRIES: u32 = 1;

/// Delay between List retries in milliseconds
pub const LIST_RETRY_DELAY_MS: u64 = 50;

// =============================================================================
// Bootstrap data
// =============================================================================

/// Role created by the `seed` command
pub const SEED_ROLE_NAME: &str = "Administrator";

/// Department created by the `seed` command
pub const SEED_DEPARTMENT_NAME: &str = "Headquarters";
