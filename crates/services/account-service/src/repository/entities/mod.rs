//! SeaORM entities for the account tables.

pub mod file_entry;
pub mod notification;
pub mod role;
pub mod social_profile;
pub mod subscription;
pub mod user;
pub mod user_role;
