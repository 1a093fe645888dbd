//! File entry repository.
//!
//! Permanent deletion removes the entry rows; releasing the stored blobs
//! is up to the storage layer.

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect};
use uuid::Uuid;

use super::entities::file_entry;
use common::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait FileEntryRepository: Send + Sync {
    /// Ids of every entry owned by a user
    async fn ids_owned_by(&self, owner_id: Uuid) -> AppResult<Vec<Uuid>>;

    /// Permanently delete entries. Returns rows deleted.
    async fn delete_permanently(&self, ids: &[Uuid]) -> AppResult<u64>;
}

pub struct FileEntryStore {
    db: DatabaseConnection,
}

impl FileEntryStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FileEntryRepository for FileEntryStore {
    async fn ids_owned_by(&self, owner_id: Uuid) -> AppResult<Vec<Uuid>> {
        let ids = file_entry::Entity::find()
            .select_only()
            .column(file_entry::Column::Id)
            .filter(file_entry::Column::OwnerId.eq(owner_id))
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(ids)
    }

    async fn delete_permanently(&self, ids: &[Uuid]) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = file_entry::Entity::delete_many()
            .filter(file_entry::Column::Id.is_in(ids.to_vec()))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.rows_affected)
    }
}
