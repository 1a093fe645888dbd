//! Billing subscriptions.

use sea_orm::entity::prelude::*;

use domain::Subscription;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub gateway: String,
    pub gateway_id: String,
    pub plan_id: Option<Uuid>,
    pub ends_at: Option<DateTimeUtc>,
    pub cancelled_at: Option<DateTimeUtc>,
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

impl From<Model> for Subscription {
    fn from(model: Model) -> Self {
        Subscription {
            id: model.id,
            user_id: model.user_id,
            gateway: model.gateway,
            gateway_id: model.gateway_id,
            plan_id: model.plan_id,
            ends_at: model.ends_at,
            cancelled_at: model.cancelled_at,
            created_at: model.created_at,
        }
    }
}
