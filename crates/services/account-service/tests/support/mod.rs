//! In-memory repositories shared by the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sea_orm::DbErr;
use tokio::sync::broadcast;
use uuid::Uuid;

use account_service_lib::infra::BroadcastEventSink;
use account_service_lib::repository::{
    FileEntryRepository, NotificationRepository, Repositories, RoleRepository,
    SocialProfileRepository, SubscriptionRepository, UserRepository,
};
use account_service_lib::service::UserManager;
use common::{AppError, AppResult};
use domain::{
    AccountEvent, NewUser, PermissionMap, Role, RoleChanges, SocialProfile, Subscription, User,
    UserFields,
};

#[derive(Default)]
pub struct State {
    pub users: BTreeMap<Uuid, User>,
    pub roles: Vec<Role>,
    pub user_roles: Vec<(Uuid, Uuid)>,
    pub social_profiles: Vec<SocialProfile>,
    /// (notification id, user id)
    pub notifications: Vec<(Uuid, Uuid)>,
    pub subscriptions: Vec<Subscription>,
    pub cancelled_subscriptions: Vec<Uuid>,
    /// (entry id, owner id)
    pub file_entries: Vec<(Uuid, Uuid)>,
    /// Make every role write fail
    pub fail_role_writes: bool,
    /// Make permission writes fail
    pub fail_permission_writes: bool,
}

/// One shared state behind every repository trait.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn repositories(&self) -> Repositories {
        Repositories {
            users: Arc::new(self.clone()),
            roles: Arc::new(self.clone()),
            social_profiles: Arc::new(self.clone()),
            notifications: Arc::new(self.clone()),
            subscriptions: Arc::new(self.clone()),
            file_entries: Arc::new(self.clone()),
        }
    }

    pub fn add_role(&self, name: &str, is_default: bool) -> Role {
        let now = Utc::now();
        let role = Role {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            is_default,
            created_at: now,
            updated_at: now,
        };
        self.state().roles.push(role.clone());
        role
    }

    pub fn role_ids_of(&self, user_id: Uuid) -> HashSet<Uuid> {
        self.state()
            .user_roles
            .iter()
            .filter(|(user, _)| *user == user_id)
            .map(|(_, role)| *role)
            .collect()
    }

    pub fn user_by_email(&self, email: &str) -> Option<User> {
        self.state().users.values().find(|u| u.email == email).cloned()
    }

    /// Seed a user with one of every related record.
    pub fn seed_user_with_relations(&self, email: &str) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            username: None,
            first_name: Some("Seed".to_string()),
            last_name: None,
            password_hash: None,
            language: "en".to_string(),
            country: None,
            timezone: None,
            confirmed: true,
            confirmation_code: None,
            access_token: "seeded".to_string(),
            available_space: None,
            permissions: PermissionMap::granting(["files.view"]),
            created_at: now,
            updated_at: now,
            roles: None,
            social_profiles: None,
            subscriptions: None,
        };

        let role = self.add_role(&format!("role-{}", email), false);
        let mut state = self.state();
        state.users.insert(user.id, user.clone());
        state.user_roles.push((user.id, role.id));
        state.social_profiles.push(SocialProfile {
            id: Uuid::new_v4(),
            user_id: user.id,
            service_name: "google".to_string(),
            user_service_id: format!("g-{}", email),
            created_at: now,
        });
        state.notifications.push((Uuid::new_v4(), user.id));
        state.subscriptions.push(Subscription {
            id: Uuid::new_v4(),
            user_id: user.id,
            gateway: "stripe".to_string(),
            gateway_id: format!("sub-{}", email),
            plan_id: None,
            ends_at: Some(now + Duration::days(30)),
            cancelled_at: None,
            created_at: now,
        });
        state.file_entries.push((Uuid::new_v4(), user.id));
        state.file_entries.push((Uuid::new_v4(), user.id));
        user
    }
}

/// Build a manager over the store and a receiver for its events.
pub fn manager(store: &InMemoryStore) -> (UserManager, broadcast::Receiver<AccountEvent>) {
    let sink = BroadcastEventSink::new(16);
    let events = sink.subscribe();
    let manager = UserManager::new(store.repositories(), Arc::new(sink)).with_default_language("en");
    (manager, events)
}

/// Drain every event published so far.
pub fn drain(events: &mut broadcast::Receiver<AccountEvent>) -> Vec<AccountEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

fn offline(what: &str) -> AppError {
    AppError::internal(format!("{} store offline", what))
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.state().users.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<User>> {
        let state = self.state();
        Ok(ids.iter().filter_map(|id| state.users.get(id).cloned()).collect())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.user_by_email(email))
    }

    async fn insert(&self, new_user: NewUser) -> AppResult<User> {
        let mut state = self.state();
        if state.users.values().any(|u| u.email == new_user.credentials.email) {
            // Same failure the unique index on users.email produces
            return Err(AppError::from(DbErr::Custom(
                "duplicate key value violates unique constraint \"users_email_key\"".to_string(),
            )));
        }

        let now = Utc::now();
        let fields = new_user.fields;
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.credentials.email,
            username: fields.username,
            first_name: fields.first_name,
            last_name: fields.last_name,
            password_hash: new_user.credentials.password_hash,
            language: fields.language,
            country: fields.country,
            timezone: fields.timezone,
            confirmed: fields.confirmed,
            confirmation_code: fields.confirmation_code,
            access_token: new_user.access_token,
            available_space: fields.available_space.flatten(),
            permissions: PermissionMap::new(),
            created_at: now,
            updated_at: now,
            roles: None,
            social_profiles: None,
            subscriptions: None,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_fields(&self, id: Uuid, fields: UserFields) -> AppResult<User> {
        let mut state = self.state();
        let user = state.users.get_mut(&id).ok_or(AppError::NotFound)?;

        user.username = fields.username;
        user.first_name = fields.first_name;
        user.last_name = fields.last_name;
        user.language = fields.language;
        user.country = fields.country;
        user.timezone = fields.timezone;
        user.confirmed = fields.confirmed;
        user.confirmation_code = fields.confirmation_code;
        if let Some(space) = fields.available_space {
            user.available_space = space;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn set_permissions(&self, id: Uuid, permissions: PermissionMap) -> AppResult<User> {
        let mut state = self.state();
        if state.fail_permission_writes {
            return Err(offline("permission"));
        }
        let user = state.users.get_mut(&id).ok_or(AppError::NotFound)?;
        user.permissions = permissions;
        Ok(user.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut state = self.state();
        state.user_roles.retain(|(user, _)| *user != id);
        Ok(state.users.remove(&id).is_some())
    }
}

#[async_trait]
impl RoleRepository for InMemoryStore {
    async fn find_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Role>> {
        Ok(self
            .state()
            .roles
            .iter()
            .filter(|r| ids.contains(&r.id))
            .cloned()
            .collect())
    }

    async fn find_default(&self) -> AppResult<Option<Role>> {
        Ok(self.state().roles.iter().find(|r| r.is_default).cloned())
    }

    async fn roles_for_user(&self, user_id: Uuid) -> AppResult<Vec<Role>> {
        let assigned = self.role_ids_of(user_id);
        Ok(self
            .state()
            .roles
            .iter()
            .filter(|r| assigned.contains(&r.id))
            .cloned()
            .collect())
    }

    async fn attach(&self, user_id: Uuid, role_ids: &[Uuid]) -> AppResult<u64> {
        let mut state = self.state();
        if state.fail_role_writes {
            return Err(offline("role"));
        }
        let mut inserted = 0;
        for role_id in role_ids {
            if !state.user_roles.contains(&(user_id, *role_id)) {
                state.user_roles.push((user_id, *role_id));
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn detach(&self, user_id: Uuid, role_ids: &[Uuid]) -> AppResult<u64> {
        let mut state = self.state();
        if state.fail_role_writes {
            return Err(offline("role"));
        }
        let before = state.user_roles.len();
        state
            .user_roles
            .retain(|(user, role)| !(*user == user_id && role_ids.contains(role)));
        Ok((before - state.user_roles.len()) as u64)
    }

    async fn sync(&self, user_id: Uuid, role_ids: &[Uuid]) -> AppResult<RoleChanges> {
        let assigned = self.role_ids_of(user_id);
        let stale: Vec<Uuid> = assigned
            .iter()
            .copied()
            .filter(|id| !role_ids.contains(id))
            .collect();

        let detached = RoleRepository::detach(self, user_id, &stale).await?;
        let attached = RoleRepository::attach(self, user_id, role_ids).await?;
        Ok(RoleChanges { attached, detached })
    }

    async fn detach_all(&self, user_id: Uuid) -> AppResult<u64> {
        let mut state = self.state();
        let before = state.user_roles.len();
        state.user_roles.retain(|(user, _)| *user != user_id);
        Ok((before - state.user_roles.len()) as u64)
    }
}

#[async_trait]
impl SocialProfileRepository for InMemoryStore {
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<SocialProfile>> {
        Ok(self
            .state()
            .social_profiles
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn detach_all(&self, user_id: Uuid) -> AppResult<u64> {
        let mut state = self.state();
        let before = state.social_profiles.len();
        state.social_profiles.retain(|p| p.user_id != user_id);
        Ok((before - state.social_profiles.len()) as u64)
    }
}

#[async_trait]
impl NotificationRepository for InMemoryStore {
    async fn delete_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        let mut state = self.state();
        let before = state.notifications.len();
        state.notifications.retain(|(_, user)| *user != user_id);
        Ok((before - state.notifications.len()) as u64)
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryStore {
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Subscription>> {
        Ok(self
            .state()
            .subscriptions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn active_for_user(&self, user_id: Uuid) -> AppResult<Vec<Subscription>> {
        let now = Utc::now();
        Ok(self
            .state()
            .subscriptions
            .iter()
            .filter(|s| {
                s.user_id == user_id
                    && s.cancelled_at.is_none()
                    && s.ends_at.map(|ends| ends > now).unwrap_or(true)
            })
            .cloned()
            .collect())
    }

    async fn cancel_and_delete(&self, subscription: &Subscription) -> AppResult<()> {
        let mut state = self.state();
        state.cancelled_subscriptions.push(subscription.id);
        state.subscriptions.retain(|s| s.id != subscription.id);
        Ok(())
    }
}

#[async_trait]
impl FileEntryRepository for InMemoryStore {
    async fn ids_owned_by(&self, owner_id: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(self
            .state()
            .file_entries
            .iter()
            .filter(|(_, owner)| *owner == owner_id)
            .map(|(id, _)| *id)
            .collect())
    }

    async fn delete_permanently(&self, ids: &[Uuid]) -> AppResult<u64> {
        let mut state = self.state();
        let before = state.file_entries.len();
        state.file_entries.retain(|(id, _)| !ids.contains(id));
        Ok((before - state.file_entries.len()) as u64)
    }
}
