//! Subscription repository.
//!
//! Cancellation itself is delegated to the [`BillingGateway`]; this store
//! only owns the rows.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{Condition, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use super::entities::subscription;
use crate::infra::BillingGateway;
use common::{AppError, AppResult};
use domain::Subscription;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Subscription>>;

    /// Subscriptions that are neither cancelled nor past their end date
    async fn active_for_user(&self, user_id: Uuid) -> AppResult<Vec<Subscription>>;

    /// Cancel with the billing provider, then delete the row
    async fn cancel_and_delete(&self, subscription: &Subscription) -> AppResult<()>;
}

pub struct SubscriptionStore {
    db: DatabaseConnection,
    billing: Arc<dyn BillingGateway>,
}

impl SubscriptionStore {
    pub fn new(db: DatabaseConnection, billing: Arc<dyn BillingGateway>) -> Self {
        Self { db, billing }
    }
}

#[async_trait]
impl SubscriptionRepository for SubscriptionStore {
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Subscription>> {
        let models = subscription::Entity::find()
            .filter(subscription::Column::UserId.eq(user_id))
            .order_by_asc(subscription::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(Subscription::from).collect())
    }

    async fn active_for_user(&self, user_id: Uuid) -> AppResult<Vec<Subscription>> {
        let now = chrono::Utc::now();
        let models = subscription::Entity::find()
            .filter(subscription::Column::UserId.eq(user_id))
            .filter(subscription::Column::CancelledAt.is_null())
            .filter(
                Condition::any()
                    .add(subscription::Column::EndsAt.is_null())
                    .add(subscription::Column::EndsAt.gt(now)),
            )
            .order_by_asc(subscription::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(Subscription::from).collect())
    }

    async fn cancel_and_delete(&self, subscription: &Subscription) -> AppResult<()> {
        self.billing.cancel(subscription).await?;

        subscription::Entity::delete_by_id(subscription.id)
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(())
    }
}
