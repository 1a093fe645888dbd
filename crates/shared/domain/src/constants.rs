//! Domain-level constants.
//!
//! These constants define business rules and field fallbacks.

// =============================================================================
// Profile defaults
// =============================================================================

/// Language used when neither the caller nor the configuration provides one
pub const DEFAULT_LANGUAGE: &str = "en";

/// New accounts are confirmed unless the caller says otherwise
pub const DEFAULT_CONFIRMED: bool = true;

// =============================================================================
// Credentials
// =============================================================================

/// Length of the generated API access token
pub const ACCESS_TOKEN_LENGTH: usize = 40;

// =============================================================================
// Events
// =============================================================================

/// Event name emitted after a user has been created
pub const EVENT_USER_CREATED: &str = "user_created";

/// Event name emitted after a batch of users has been deleted
pub const EVENT_USERS_DELETED: &str = "users_deleted";
