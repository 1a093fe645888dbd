//! Service layer - account use cases.

mod user_manager;

pub use user_manager::{UserManager, UserService};
