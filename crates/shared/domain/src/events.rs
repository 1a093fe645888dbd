//! Domain events published after account mutations.

use serde::{Deserialize, Serialize};

use crate::constants::{EVENT_USERS_DELETED, EVENT_USER_CREATED};
use crate::user::User;

/// Events consumed by downstream listeners (mail, audit, cache invalidation).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccountEvent {
    UserCreated { user: User },
    UsersDeleted { users: Vec<User> },
}

impl AccountEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AccountEvent::UserCreated { .. } => EVENT_USER_CREATED,
            AccountEvent::UsersDeleted { .. } => EVENT_USERS_DELETED,
        }
    }

    /// Ids of the users the event is about.
    pub fn user_ids(&self) -> Vec<uuid::Uuid> {
        match self {
            AccountEvent::UserCreated { user } => vec![user.id],
            AccountEvent::UsersDeleted { users } => users.iter().map(|u| u.id).collect(),
        }
    }
}
