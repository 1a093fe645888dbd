//! User manager - account creation, updates, bulk deletion and role and
//! permission assignment.
//!
//! Calls run their data-store steps one after another without a
//! transaction. The only compensation is on create: a user whose role or
//! permission assignment fails is deleted again before the error is
//! returned.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use common::{AppError, AppResult, OptionExt};
use domain::{
    format_params, generate_access_token, AccountEvent, FormatKind, NewUser, PermissionMap,
    RoleMode, User, UserParams, UserRelation, DEFAULT_LANGUAGE,
};

use crate::infra::EventSink;
use crate::repository::Repositories;

/// Account operations exposed to the transport layer.
#[async_trait]
pub trait UserService: Send + Sync {
    /// Load a user with the requested relations, or `AppError::NotFound`
    async fn find_or_fail(&self, id: Uuid, relations: &[UserRelation]) -> AppResult<User>;

    /// Return the user with `params.email`, creating it when missing
    async fn first_or_create(&self, params: UserParams) -> AppResult<User>;

    /// Create a user, assign roles and permission overrides
    async fn create(&self, params: UserParams) -> AppResult<User>;

    /// Overwrite profile fields; replace roles and permissions when given
    async fn update(&self, id: Uuid, params: UserParams) -> AppResult<User>;

    /// Delete users and everything they own. Returns the number deleted.
    async fn delete_multiple(&self, ids: &[Uuid]) -> AppResult<u64>;

    /// Apply roles in the given mode. Returns pivot rows affected.
    async fn attach_roles(&self, user_id: Uuid, role_ids: &[Uuid], mode: RoleMode)
        -> AppResult<u64>;

    /// Remove role assignments. Returns rows detached.
    async fn detach_roles(&self, user_id: Uuid, role_ids: &[Uuid]) -> AppResult<u64>;

    /// Grant permission overrides
    async fn add_permissions(&self, user_id: Uuid, names: &[String]) -> AppResult<User>;

    /// Remove permission overrides (keys are deleted, not set to false)
    async fn remove_permissions(&self, user_id: Uuid, names: &[String]) -> AppResult<User>;
}

/// Concrete implementation of UserService over the repositories.
pub struct UserManager {
    repos: Repositories,
    events: Arc<dyn EventSink>,
    default_language: String,
}

impl UserManager {
    /// Create new user manager with repositories and an event sink
    pub fn new(repos: Repositories, events: Arc<dyn EventSink>) -> Self {
        Self {
            repos,
            events,
            default_language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    /// Language given to users created or updated without one
    pub fn with_default_language(mut self, language: impl Into<String>) -> Self {
        self.default_language = language.into();
        self
    }

    async fn load_relations(&self, user: &mut User, relations: &[UserRelation]) -> AppResult<()> {
        let wanted: HashSet<UserRelation> = relations.iter().copied().collect();

        if wanted.contains(&UserRelation::Roles) {
            user.roles = Some(self.repos.roles.roles_for_user(user.id).await?);
        }
        if wanted.contains(&UserRelation::SocialProfiles) {
            user.social_profiles = Some(self.repos.social_profiles.list_for_user(user.id).await?);
        }
        if wanted.contains(&UserRelation::Subscriptions) {
            user.subscriptions = Some(self.repos.subscriptions.list_for_user(user.id).await?);
        }

        Ok(())
    }

    /// Role and permission step of create. Returns the user with roles loaded.
    ///
    /// The default role is attached when no roles were given or syncing the
    /// given ones changed nothing.
    async fn assign_roles_and_permissions(&self, user: User, params: &UserParams) -> AppResult<User> {
        let affected = match &params.roles {
            Some(role_ids) => self.attach_roles(user.id, role_ids, RoleMode::Sync).await?,
            None => 0,
        };

        if affected == 0 {
            self.assign_default_role(user.id).await?;
        }

        let mut user = match &params.permissions {
            Some(names) => {
                let permissions = PermissionMap::granting(names.iter().cloned());
                self.repos.users.set_permissions(user.id, permissions).await?
            }
            None => user,
        };

        user.roles = Some(self.repos.roles.roles_for_user(user.id).await?);
        Ok(user)
    }

    async fn assign_default_role(&self, user_id: Uuid) -> AppResult<u64> {
        match self.repos.roles.find_default().await? {
            Some(role) => {
                debug!(user_id = %user_id, role = %role.name, "Assigning default role");
                self.repos.roles.attach(user_id, &[role.id]).await
            }
            None => {
                debug!(user_id = %user_id, "No default role configured");
                Ok(0)
            }
        }
    }

    /// Remove one user and everything hanging off it.
    ///
    /// Permission overrides live on the user row and go with it.
    async fn delete_one(&self, user: &User) -> AppResult<bool> {
        let id = user.id;

        self.repos.social_profiles.detach_all(id).await?;
        self.repos.roles.detach_all(id).await?;
        self.repos.notifications.delete_for_user(id).await?;

        for subscription in self.repos.subscriptions.active_for_user(id).await? {
            self.repos.subscriptions.cancel_and_delete(&subscription).await?;
        }

        let removed = self.repos.users.delete(id).await?;

        let entry_ids = self.repos.file_entries.ids_owned_by(id).await?;
        let purged = self.repos.file_entries.delete_permanently(&entry_ids).await?;

        debug!(user_id = %id, removed, file_entries = purged, "Deleted user");
        Ok(removed)
    }

    /// Publish after a mutation has already happened; failures are logged only.
    async fn publish(&self, event: AccountEvent) {
        let name = event.name();
        if let Err(err) = self.events.publish(event).await {
            warn!(event = name, error = %err, "Failed to publish account event");
        }
    }

    async fn update_permissions<F>(&self, user_id: Uuid, change: F) -> AppResult<User>
    where
        F: FnOnce(&mut PermissionMap) + Send,
    {
        let user = self.repos.users.find_by_id(user_id).await?.ok_or_not_found()?;

        let mut permissions = user.permissions.clone();
        change(&mut permissions);

        if permissions == user.permissions {
            return Ok(user);
        }

        self.repos.users.set_permissions(user_id, permissions).await
    }
}

#[async_trait]
impl UserService for UserManager {
    async fn find_or_fail(&self, id: Uuid, relations: &[UserRelation]) -> AppResult<User> {
        let mut user = self.repos.users.find_by_id(id).await?.ok_or_not_found()?;
        self.load_relations(&mut user, relations).await?;
        Ok(user)
    }

    async fn first_or_create(&self, params: UserParams) -> AppResult<User> {
        let email = params
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AppError::validation("email is required"))?;

        if let Some(user) = self.repos.users.find_by_email(email).await? {
            return Ok(user);
        }

        self.create(params).await
    }

    async fn create(&self, params: UserParams) -> AppResult<User> {
        let mut fields = format_params(&params, FormatKind::Create, &self.default_language)?;
        let credentials = fields
            .credentials
            .take()
            .ok_or_else(|| AppError::validation("email is required"))?;

        // Check if email already exists
        if self.repos.users.find_by_email(&credentials.email).await?.is_some() {
            return Err(AppError::conflict("Email"));
        }

        let user = self
            .repos
            .users
            .insert(NewUser {
                credentials,
                fields,
                access_token: generate_access_token(),
            })
            .await?;
        let user_id = user.id;

        let user = match self.assign_roles_and_permissions(user, &params).await {
            Ok(user) => user,
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "Role assignment failed, removing new user");
                if let Err(cleanup) = self.repos.users.delete(user_id).await {
                    error!(user_id = %user_id, error = %cleanup, "Failed to remove partially created user");
                }
                return Err(err);
            }
        };

        info!(user_id = %user_id, email = %user.email, "User created");

        self.publish(AccountEvent::UserCreated { user: user.clone() }).await;
        Ok(user)
    }

    async fn update(&self, id: Uuid, params: UserParams) -> AppResult<User> {
        let fields = format_params(&params, FormatKind::Update, &self.default_language)?;
        let mut user = self.repos.users.update_fields(id, fields).await?;

        if let Some(role_ids) = &params.roles {
            self.attach_roles(id, role_ids, RoleMode::Sync).await?;
        }

        if let Some(names) = &params.permissions {
            let permissions = PermissionMap::granting(names.iter().cloned());
            user = self.repos.users.set_permissions(id, permissions).await?;
        }

        user.roles = Some(self.repos.roles.roles_for_user(id).await?);
        info!(user_id = %id, "User updated");
        Ok(user)
    }

    async fn delete_multiple(&self, ids: &[Uuid]) -> AppResult<u64> {
        let users = self.repos.users.find_by_ids(ids).await?;
        let mut deleted = Vec::with_capacity(users.len());

        for user in users {
            if self.delete_one(&user).await? {
                deleted.push(user);
            }
        }

        let count = deleted.len() as u64;
        info!(requested = ids.len(), deleted = count, "Deleted users");

        if !deleted.is_empty() {
            self.publish(AccountEvent::UsersDeleted { users: deleted }).await;
        }

        Ok(count)
    }

    async fn attach_roles(
        &self,
        user_id: Uuid,
        role_ids: &[Uuid],
        mode: RoleMode,
    ) -> AppResult<u64> {
        if mode == RoleMode::Attach && role_ids.is_empty() {
            return Ok(0);
        }

        // Unknown role ids are dropped silently
        let known: Vec<Uuid> = if role_ids.is_empty() {
            Vec::new()
        } else {
            let found: HashSet<Uuid> = self
                .repos
                .roles
                .find_by_ids(role_ids)
                .await?
                .into_iter()
                .map(|role| role.id)
                .collect();
            role_ids.iter().copied().filter(|id| found.contains(id)).collect()
        };

        let affected = match mode {
            RoleMode::Attach => self.repos.roles.attach(user_id, &known).await?,
            RoleMode::Sync => self.repos.roles.sync(user_id, &known).await?.total(),
            RoleMode::Detach => self.repos.roles.detach(user_id, &known).await?,
        };

        debug!(user_id = %user_id, %mode, requested = role_ids.len(), affected, "Applied roles");
        Ok(affected)
    }

    async fn detach_roles(&self, user_id: Uuid, role_ids: &[Uuid]) -> AppResult<u64> {
        self.repos.roles.detach(user_id, role_ids).await
    }

    async fn add_permissions(&self, user_id: Uuid, names: &[String]) -> AppResult<User> {
        self.update_permissions(user_id, |permissions| permissions.grant(names.iter().cloned()))
            .await
    }

    async fn remove_permissions(&self, user_id: Uuid, names: &[String]) -> AppResult<User> {
        self.update_permissions(user_id, |permissions| permissions.revoke(names))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mockall::predicate::eq;

    use domain::{Role, RoleChanges};

    use crate::infra::MockEventSink;
    use crate::repository::{
        MockFileEntryRepository, MockNotificationRepository, MockRoleRepository,
        MockSocialProfileRepository, MockSubscriptionRepository, MockUserRepository,
    };

    fn create_test_user(id: Uuid, email: &str) -> User {
        User {
            id,
            email: email.to_string(),
            username: None,
            first_name: None,
            last_name: None,
            password_hash: None,
            language: "en".to_string(),
            country: None,
            timezone: None,
            confirmed: true,
            confirmation_code: None,
            access_token: "token".to_string(),
            available_space: None,
            permissions: PermissionMap::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            roles: None,
            social_profiles: None,
            subscriptions: None,
        }
    }

    fn create_test_role(is_default: bool) -> Role {
        Role {
            id: Uuid::new_v4(),
            name: "member".to_string(),
            description: None,
            is_default,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn manager(
        users: MockUserRepository,
        roles: MockRoleRepository,
        events: MockEventSink,
    ) -> UserManager {
        let repos = Repositories {
            users: Arc::new(users),
            roles: Arc::new(roles),
            social_profiles: Arc::new(MockSocialProfileRepository::new()),
            notifications: Arc::new(MockNotificationRepository::new()),
            subscriptions: Arc::new(MockSubscriptionRepository::new()),
            file_entries: Arc::new(MockFileEntryRepository::new()),
        };
        UserManager::new(repos, Arc::new(events))
    }

    fn inserting_users(user_id: Uuid) -> MockUserRepository {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|_| Ok(None));
        users
            .expect_insert()
            .returning(move |new_user| Ok(create_test_user(user_id, &new_user.credentials.email)));
        users
    }

    #[tokio::test]
    async fn test_create_deletes_user_when_default_role_fails() {
        let user_id = Uuid::new_v4();

        let mut users = inserting_users(user_id);
        users
            .expect_delete()
            .with(eq(user_id))
            .times(1)
            .returning(|_| Ok(true));

        let mut roles = MockRoleRepository::new();
        roles
            .expect_find_default()
            .returning(|| Ok(Some(create_test_role(true))));
        roles
            .expect_attach()
            .returning(|_, _| Err(AppError::internal("pivot insert failed")));

        let mut events = MockEventSink::new();
        events.expect_publish().never();

        let service = manager(users, roles, events);
        let result = service.create(UserParams::with_email("a@example.com")).await;

        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn test_create_keeps_assignment_error_when_cleanup_fails() {
        let mut users = inserting_users(Uuid::new_v4());
        users
            .expect_delete()
            .returning(|_| Err(AppError::service_unavailable("database")));

        let mut roles = MockRoleRepository::new();
        roles
            .expect_find_by_ids()
            .returning(|_| Err(AppError::internal("roles lookup failed")));

        let service = manager(users, roles, MockEventSink::new());
        let result = service
            .create(UserParams {
                roles: Some(vec![Uuid::new_v4()]),
                ..UserParams::with_email("b@example.com")
            })
            .await;

        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn test_create_deletes_user_when_role_reload_fails() {
        let user_id = Uuid::new_v4();

        let mut users = inserting_users(user_id);
        users
            .expect_delete()
            .with(eq(user_id))
            .times(1)
            .returning(|_| Ok(true));

        let mut roles = MockRoleRepository::new();
        roles.expect_find_default().returning(|| Ok(None));
        roles
            .expect_roles_for_user()
            .returning(|_| Err(AppError::service_unavailable("database")));

        let mut events = MockEventSink::new();
        events.expect_publish().never();

        let service = manager(users, roles, events);
        let result = service.create(UserParams::with_email("reload@example.com")).await;

        assert!(matches!(result, Err(AppError::ServiceUnavailable(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_existing_email() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .withf(|email| email == "taken@example.com")
            .returning(|email| Ok(Some(create_test_user(Uuid::new_v4(), email))));
        users.expect_insert().never();

        let mut events = MockEventSink::new();
        events.expect_publish().never();

        let service = manager(users, MockRoleRepository::new(), events);
        let err = service
            .create(UserParams::with_email("taken@example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(tonic::Status::from(err).code(), tonic::Code::AlreadyExists);
    }

    #[tokio::test]
    async fn test_create_succeeds_when_publish_fails() {
        let user_id = Uuid::new_v4();
        let role = create_test_role(true);
        let default_id = role.id;

        let mut roles = MockRoleRepository::new();
        let found = role.clone();
        roles
            .expect_find_default()
            .returning(move || Ok(Some(found.clone())));
        roles
            .expect_attach()
            .withf(move |id, role_ids| *id == user_id && role_ids.to_vec() == vec![default_id])
            .returning(|_, _| Ok(1));
        roles
            .expect_roles_for_user()
            .returning(move |_| Ok(vec![role.clone()]));

        let mut events = MockEventSink::new();
        events
            .expect_publish()
            .times(1)
            .returning(|_| Err(AppError::service_unavailable("redis")));

        let service = manager(inserting_users(user_id), roles, events);
        let user = service
            .create(UserParams::with_email("c@example.com"))
            .await
            .unwrap();

        assert_eq!(user.id, user_id);
        assert_eq!(user.role_ids(), Some(vec![default_id]));
    }

    #[tokio::test]
    async fn test_sync_with_changes_skips_default_role() {
        let user_id = Uuid::new_v4();
        let role = create_test_role(false);
        let role_id = role.id;

        let mut roles = MockRoleRepository::new();
        let found = role.clone();
        roles
            .expect_find_by_ids()
            .returning(move |_| Ok(vec![found.clone()]));
        roles.expect_sync().returning(|_, _| {
            Ok(RoleChanges {
                attached: 1,
                detached: 0,
            })
        });
        roles.expect_find_default().never();
        roles
            .expect_roles_for_user()
            .returning(move |_| Ok(vec![role.clone()]));

        let mut events = MockEventSink::new();
        events.expect_publish().returning(|_| Ok(()));

        let service = manager(inserting_users(user_id), roles, events);
        let user = service
            .create(UserParams {
                roles: Some(vec![role_id]),
                ..UserParams::with_email("d@example.com")
            })
            .await
            .unwrap();

        assert_eq!(user.role_ids(), Some(vec![role_id]));
    }

    #[tokio::test]
    async fn test_attach_empty_list_touches_nothing() {
        let service = manager(
            MockUserRepository::new(),
            MockRoleRepository::new(),
            MockEventSink::new(),
        );

        let affected = service
            .attach_roles(Uuid::new_v4(), &[], RoleMode::Attach)
            .await
            .unwrap();

        assert_eq!(affected, 0);
    }

    #[tokio::test]
    async fn test_remove_missing_permission_skips_write() {
        let user_id = Uuid::new_v4();

        let mut users = MockUserRepository::new();
        users.expect_find_by_id().with(eq(user_id)).returning(|id| {
            let mut user = create_test_user(id, "e@example.com");
            user.permissions = PermissionMap::granting(["files.view"]);
            Ok(Some(user))
        });
        users.expect_set_permissions().never();

        let service = manager(users, MockRoleRepository::new(), MockEventSink::new());
        let user = service
            .remove_permissions(user_id, &["users.delete".to_string()])
            .await
            .unwrap();

        assert!(user.has_permission("files.view"));
    }

    #[tokio::test]
    async fn test_first_or_create_requires_email() {
        let service = manager(
            MockUserRepository::new(),
            MockRoleRepository::new(),
            MockEventSink::new(),
        );

        let result = service.first_or_create(UserParams::default()).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
