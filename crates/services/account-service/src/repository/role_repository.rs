//! Role lookup and role-user pivot maintenance.

use std::collections::HashSet;

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use super::entities::{role, user_role};
use common::{AppError, AppResult};
use domain::{Role, RoleChanges};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Role repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Find the roles whose id is in `ids`. Unknown ids are skipped.
    async fn find_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Role>>;

    /// The role flagged as default for new users, if any
    async fn find_default(&self) -> AppResult<Option<Role>>;

    /// Roles currently assigned to a user
    async fn roles_for_user(&self, user_id: Uuid) -> AppResult<Vec<Role>>;

    /// Assign roles, skipping ones already assigned. Returns rows inserted.
    async fn attach(&self, user_id: Uuid, role_ids: &[Uuid]) -> AppResult<u64>;

    /// Remove role assignments. Returns rows deleted.
    async fn detach(&self, user_id: Uuid, role_ids: &[Uuid]) -> AppResult<u64>;

    /// Make the assignments exactly `role_ids`.
    async fn sync(&self, user_id: Uuid, role_ids: &[Uuid]) -> AppResult<RoleChanges>;

    /// Remove every role assignment of a user
    async fn detach_all(&self, user_id: Uuid) -> AppResult<u64>;
}

/// SeaORM implementation of RoleRepository
pub struct RoleStore {
    db: DatabaseConnection,
}

impl RoleStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn assigned_role_ids(&self, user_id: Uuid) -> AppResult<HashSet<Uuid>> {
        let ids: Vec<Uuid> = user_role::Entity::find()
            .select_only()
            .column(user_role::Column::RoleId)
            .filter(user_role::Column::UserId.eq(user_id))
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(ids.into_iter().collect())
    }

    async fn insert_pivots(&self, user_id: Uuid, role_ids: Vec<Uuid>) -> AppResult<u64> {
        if role_ids.is_empty() {
            return Ok(0);
        }

        let now = chrono::Utc::now();
        let rows = role_ids.into_iter().map(|role_id| user_role::ActiveModel {
            user_id: Set(user_id),
            role_id: Set(role_id),
            created_at: Set(now),
        });

        let inserted = user_role::Entity::insert_many(rows)
            .exec_without_returning(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(inserted)
    }
}

/// Keep the first occurrence of every id, in order.
fn dedup(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[async_trait]
impl RoleRepository for RoleStore {
    async fn find_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Role>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let models = role::Entity::find()
            .filter(role::Column::Id.is_in(ids.to_vec()))
            .order_by_asc(role::Column::Name)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(Role::from).collect())
    }

    async fn find_default(&self) -> AppResult<Option<Role>> {
        let result = role::Entity::find()
            .filter(role::Column::IsDefault.eq(true))
            .order_by_asc(role::Column::CreatedAt)
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(Role::from))
    }

    async fn roles_for_user(&self, user_id: Uuid) -> AppResult<Vec<Role>> {
        let models = role::Entity::find()
            .inner_join(user_role::Entity)
            .filter(user_role::Column::UserId.eq(user_id))
            .order_by_asc(role::Column::Name)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(Role::from).collect())
    }

    async fn attach(&self, user_id: Uuid, role_ids: &[Uuid]) -> AppResult<u64> {
        let assigned = self.assigned_role_ids(user_id).await?;
        let missing: Vec<Uuid> = dedup(role_ids)
            .into_iter()
            .filter(|id| !assigned.contains(id))
            .collect();

        self.insert_pivots(user_id, missing).await
    }

    async fn detach(&self, user_id: Uuid, role_ids: &[Uuid]) -> AppResult<u64> {
        if role_ids.is_empty() {
            return Ok(0);
        }

        let result = user_role::Entity::delete_many()
            .filter(user_role::Column::UserId.eq(user_id))
            .filter(user_role::Column::RoleId.is_in(role_ids.to_vec()))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.rows_affected)
    }

    async fn sync(&self, user_id: Uuid, role_ids: &[Uuid]) -> AppResult<RoleChanges> {
        let assigned = self.assigned_role_ids(user_id).await?;
        let wanted = dedup(role_ids);
        let wanted_set: HashSet<Uuid> = wanted.iter().copied().collect();

        let stale: Vec<Uuid> = assigned
            .iter()
            .copied()
            .filter(|id| !wanted_set.contains(id))
            .collect();
        let missing: Vec<Uuid> = wanted
            .into_iter()
            .filter(|id| !assigned.contains(id))
            .collect();

        let detached = self.detach(user_id, &stale).await?;
        let attached = self.insert_pivots(user_id, missing).await?;

        Ok(RoleChanges { attached, detached })
    }

    async fn detach_all(&self, user_id: Uuid) -> AppResult<u64> {
        let result = user_role::Entity::delete_many()
            .filter(user_role::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.rows_affected)
    }
}
