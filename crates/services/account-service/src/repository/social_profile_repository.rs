//! Social login profile repository.

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use super::entities::social_profile;
use common::{AppError, AppResult};
use domain::SocialProfile;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait SocialProfileRepository: Send + Sync {
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<SocialProfile>>;

    /// Unlink every social profile of a user. Returns rows deleted.
    async fn detach_all(&self, user_id: Uuid) -> AppResult<u64>;
}

pub struct SocialProfileStore {
    db: DatabaseConnection,
}

impl SocialProfileStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SocialProfileRepository for SocialProfileStore {
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<SocialProfile>> {
        let models = social_profile::Entity::find()
            .filter(social_profile::Column::UserId.eq(user_id))
            .order_by_asc(social_profile::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(SocialProfile::from).collect())
    }

    async fn detach_all(&self, user_id: Uuid) -> AppResult<u64> {
        let result = social_profile::Entity::delete_many()
            .filter(social_profile::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.rows_affected)
    }
}
