//! Domain layer - Core account entities and value objects.
//!
//! This crate contains pure domain logic with no infrastructure dependencies.
//! The account service maps these types to database rows and gRPC messages.

pub mod constants;
pub mod error;
pub mod events;
pub mod params;
pub mod password;
pub mod permissions;
pub mod role;
pub mod token;
pub mod user;

pub use constants::*;
pub use error::{DomainError, DomainResult};
pub use events::AccountEvent;
pub use params::{format_params, Credentials, FormatKind, NewUser, UserFields, UserParams};
pub use password::Password;
pub use permissions::PermissionMap;
pub use role::{Role, RoleChanges, RoleMode};
pub use token::generate_access_token;
pub use user::{SocialProfile, Subscription, User, UserRelation};
