//! Linked login-provider identities.

use sea_orm::entity::prelude::*;

use domain::SocialProfile;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "social_profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_name: String,
    pub user_service_id: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for SocialProfile {
    fn from(model: Model) -> Self {
        SocialProfile {
            id: model.id,
            user_id: model.user_id,
            service_name: model.service_name,
            user_service_id: model.user_service_id,
            created_at: model.created_at,
        }
    }
}
