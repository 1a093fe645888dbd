//! User domain entity and its related records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::permissions::PermissionMap;
use crate::role::Role;

/// Relations that can be loaded alongside a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRelation {
    Roles,
    SocialProfiles,
    Subscriptions,
}

impl std::str::FromStr for UserRelation {
    type Err = crate::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "roles" => Ok(UserRelation::Roles),
            "social_profiles" => Ok(UserRelation::SocialProfiles),
            "subscriptions" => Ok(UserRelation::Subscriptions),
            other => Err(crate::DomainError::validation(format!("Unknown relation: {}", other))),
        }
    }
}

/// User domain entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub language: String,
    pub country: Option<String>,
    pub timezone: Option<String>,
    pub confirmed: bool,
    #[serde(skip_serializing, default)]
    pub confirmation_code: Option<String>,
    #[serde(skip_serializing, default)]
    pub access_token: String,
    /// Storage quota in bytes (None = unlimited)
    pub available_space: Option<i64>,
    pub permissions: PermissionMap,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // Relations (None = not loaded)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub roles: Option<Vec<Role>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub social_profiles: Option<Vec<SocialProfile>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub subscriptions: Option<Vec<Subscription>>,
}

impl User {
    /// Check a loaded role by name. Returns false when roles are not loaded.
    pub fn has_role(&self, name: &str) -> bool {
        self.roles
            .as_ref()
            .map(|roles| roles.iter().any(|r| r.name == name))
            .unwrap_or(false)
    }

    /// Role ids, when roles are loaded.
    pub fn role_ids(&self) -> Option<Vec<Uuid>> {
        self.roles
            .as_ref()
            .map(|roles| roles.iter().map(|r| r.id).collect())
    }

    /// Check a per-user permission override.
    pub fn has_permission(&self, name: &str) -> bool {
        self.permissions.is_granted(name)
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// Linked identity from an external login provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_name: String,
    pub user_service_id: String,
    pub created_at: DateTime<Utc>,
}

/// Billing subscription owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub gateway: String,
    pub gateway_id: String,
    pub plan_id: Option<Uuid>,
    pub ends_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "jane@example.com".to_string(),
            username: None,
            first_name: Some("Jane".to_string()),
            last_name: Some("Doe".to_string()),
            password_hash: None,
            language: "en".to_string(),
            country: None,
            timezone: None,
            confirmed: true,
            confirmation_code: None,
            access_token: "token".to_string(),
            available_space: None,
            permissions: PermissionMap::new(),
            created_at: now,
            updated_at: now,
            roles: None,
            social_profiles: None,
            subscriptions: None,
        }
    }

    #[test]
    fn test_has_role_requires_loaded_roles() {
        let mut u = user();
        assert!(!u.has_role("users"));

        let now = Utc::now();
        u.roles = Some(vec![Role {
            id: Uuid::new_v4(),
            name: "users".to_string(),
            description: None,
            is_default: true,
            created_at: now,
            updated_at: now,
        }]);
        assert!(u.has_role("users"));
        assert_eq!(u.role_ids().map(|ids| ids.len()), Some(1));
    }

    #[test]
    fn test_secrets_not_serialized() {
        let mut u = user();
        u.password_hash = Some("hash".to_string());
        let json = serde_json::to_value(&u).unwrap();

        assert!(json.get("password_hash").is_none());
        assert!(json.get("access_token").is_none());
        assert!(json.get("roles").is_none());
    }
}
