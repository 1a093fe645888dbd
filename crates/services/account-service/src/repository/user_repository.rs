//! User table repository.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::entities::user::{self, ActiveModel, Entity as UserEntity};
use common::{AppError, AppResult};
use domain::{NewUser, PermissionMap, User, UserFields};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User repository trait for dependency injection.
///
/// Returned users never have relations loaded.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by ID
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find every user whose id is in `ids`. Unknown ids are skipped.
    async fn find_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<User>>;

    /// Find user by email address
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Insert a new user row
    async fn insert(&self, new_user: NewUser) -> AppResult<User>;

    /// Overwrite profile fields. Credentials are never written here.
    async fn update_fields(&self, id: Uuid, fields: UserFields) -> AppResult<User>;

    /// Replace the permission override map
    async fn set_permissions(&self, id: Uuid, permissions: PermissionMap) -> AppResult<User>;

    /// Delete the user row. Returns false when nothing was deleted.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

/// SeaORM implementation of UserRepository
pub struct UserStore {
    db: DatabaseConnection,
}

impl UserStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_model(&self, id: Uuid) -> AppResult<user::Model> {
        UserEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let result = UserEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(User::from))
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let models = UserEntity::find()
            .filter(user::Column::Id.is_in(ids.to_vec()))
            .order_by_asc(user::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(User::from).collect())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(User::from))
    }

    async fn insert(&self, new_user: NewUser) -> AppResult<User> {
        let now = chrono::Utc::now();
        let NewUser {
            credentials,
            fields,
            access_token,
        } = new_user;

        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(credentials.email),
            username: Set(fields.username),
            first_name: Set(fields.first_name),
            last_name: Set(fields.last_name),
            password_hash: Set(credentials.password_hash),
            language: Set(fields.language),
            country: Set(fields.country),
            timezone: Set(fields.timezone),
            confirmed: Set(fields.confirmed),
            confirmation_code: Set(fields.confirmation_code),
            access_token: Set(access_token),
            available_space: Set(fields.available_space.flatten()),
            permissions: Set(PermissionMap::new().to_json()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model.insert(&self.db).await.map_err(AppError::from)?;
        Ok(User::from(model))
    }

    async fn update_fields(&self, id: Uuid, fields: UserFields) -> AppResult<User> {
        let mut active: ActiveModel = self.find_model(id).await?.into();

        active.username = Set(fields.username);
        active.first_name = Set(fields.first_name);
        active.last_name = Set(fields.last_name);
        active.language = Set(fields.language);
        active.country = Set(fields.country);
        active.timezone = Set(fields.timezone);
        active.confirmed = Set(fields.confirmed);
        active.confirmation_code = Set(fields.confirmation_code);
        if let Some(space) = fields.available_space {
            active.available_space = Set(space);
        }
        active.updated_at = Set(chrono::Utc::now());

        let model = active.update(&self.db).await.map_err(AppError::from)?;
        Ok(User::from(model))
    }

    async fn set_permissions(&self, id: Uuid, permissions: PermissionMap) -> AppResult<User> {
        let mut active: ActiveModel = self.find_model(id).await?.into();

        active.permissions = Set(permissions.to_json());
        active.updated_at = Set(chrono::Utc::now());

        let model = active.update(&self.db).await.map_err(AppError::from)?;
        Ok(User::from(model))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = UserEntity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.rows_affected > 0)
    }
}
