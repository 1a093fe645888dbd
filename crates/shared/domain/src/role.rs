//! Role entity and role assignment types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Named permission bundle. Many-to-many with users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Assigned to new users that were not given explicit roles
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// How a role list is applied to a user's current assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleMode {
    /// Add the given roles, keep the rest
    Attach,
    /// Replace the assignments with exactly the given roles
    Sync,
    /// Remove the given roles
    Detach,
}

impl std::str::FromStr for RoleMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "attach" => Ok(RoleMode::Attach),
            "sync" => Ok(RoleMode::Sync),
            "detach" => Ok(RoleMode::Detach),
            other => Err(DomainError::validation(format!("Unknown role mode: {}", other))),
        }
    }
}

impl std::fmt::Display for RoleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoleMode::Attach => write!(f, "attach"),
            RoleMode::Sync => write!(f, "sync"),
            RoleMode::Detach => write!(f, "detach"),
        }
    }
}

/// Pivot rows touched by a sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleChanges {
    pub attached: u64,
    pub detached: u64,
}

impl RoleChanges {
    pub fn total(&self) -> u64 {
        self.attached + self.detached
    }
}
