//! User database entity for SeaORM.

use sea_orm::entity::prelude::*;

use domain::{PermissionMap, User};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password_hash: Option<String>,
    pub language: String,
    pub country: Option<String>,
    pub timezone: Option<String>,
    pub confirmed: bool,
    pub confirmation_code: Option<String>,
    pub access_token: String,
    pub available_space: Option<i64>,
    /// Permission overrides as a JSON object (name -> granted)
    #[sea_orm(column_type = "JsonBinary")]
    pub permissions: Json,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_role::Entity")]
    UserRole,
    #[sea_orm(has_many = "super::social_profile::Entity")]
    SocialProfile,
    #[sea_orm(has_many = "super::notification::Entity")]
    Notification,
    #[sea_orm(has_many = "super::subscription::Entity")]
    Subscription,
}

impl Related<super::user_role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserRole.def()
    }
}

impl Related<super::role::Entity> for Entity {
    fn to() -> RelationDef {
        super::user_role::Relation::Role.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::user_role::Relation::User.def().rev())
    }
}

impl Related<super::social_profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SocialProfile.def()
    }
}

impl Related<super::notification::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notification.def()
    }
}

impl Related<super::subscription::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subscription.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Convert database model to domain entity (relations not loaded)
impl From<Model> for User {
    fn from(model: Model) -> Self {
        User {
            id: model.id,
            email: model.email,
            username: model.username,
            first_name: model.first_name,
            last_name: model.last_name,
            password_hash: model.password_hash,
            language: model.language,
            country: model.country,
            timezone: model.timezone,
            confirmed: model.confirmed,
            confirmation_code: model.confirmation_code,
            access_token: model.access_token,
            available_space: model.available_space,
            permissions: PermissionMap::from_json(&model.permissions),
            created_at: model.created_at,
            updated_at: model.updated_at,
            roles: None,
            social_profiles: None,
            subscriptions: None,
        }
    }
}
