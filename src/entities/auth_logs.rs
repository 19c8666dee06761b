use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "auth_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Set to NULL when the referenced user is deleted.
    pub user_id: Option<i64>,
    pub action: String,
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub timestamp: Option<DateTime>,
    pub status_code: i32,
    pub description: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
