//! Repository layer for data access.
//!
//! One repository per table the account service touches. The user manager
//! only sees the traits, bundled in [`Repositories`].

pub mod entities;
mod file_entry_repository;
mod notification_repository;
mod role_repository;
mod social_profile_repository;
mod subscription_repository;
mod user_repository;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::infra::BillingGateway;

pub use file_entry_repository::{FileEntryRepository, FileEntryStore};
pub use notification_repository::{NotificationRepository, NotificationStore};
pub use role_repository::{RoleRepository, RoleStore};
pub use social_profile_repository::{SocialProfileRepository, SocialProfileStore};
pub use subscription_repository::{SubscriptionRepository, SubscriptionStore};
pub use user_repository::{UserRepository, UserStore};

#[cfg(any(test, feature = "test-utils"))]
pub use file_entry_repository::MockFileEntryRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use notification_repository::MockNotificationRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use role_repository::MockRoleRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use social_profile_repository::MockSocialProfileRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use subscription_repository::MockSubscriptionRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockUserRepository;

/// Handles to every repository the user manager needs.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub roles: Arc<dyn RoleRepository>,
    pub social_profiles: Arc<dyn SocialProfileRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub file_entries: Arc<dyn FileEntryRepository>,
}

impl Repositories {
    /// SeaORM-backed repositories sharing one connection pool.
    pub fn sea_orm(db: DatabaseConnection, billing: Arc<dyn BillingGateway>) -> Self {
        Self {
            users: Arc::new(UserStore::new(db.clone())),
            roles: Arc::new(RoleStore::new(db.clone())),
            social_profiles: Arc::new(SocialProfileStore::new(db.clone())),
            notifications: Arc::new(NotificationStore::new(db.clone())),
            subscriptions: Arc::new(SubscriptionStore::new(db.clone(), billing)),
            file_entries: Arc::new(FileEntryStore::new(db)),
        }
    }
}
