use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(unique)]
    pub username: String,

    #[sea_orm(unique)]
    pub email: String,

    /// bcrypt-sized hash, stored as CHAR(60)
    pub password_hash: String,

    pub full_name: Option<String>,

    pub created_at: Option<DateTime>,

    pub updated_at: Option<DateTime>,

    pub is_active: Option<bool>,

    pub last_login: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::auth_tokens::Entity")]
    AuthTokens,
    #[sea_orm(has_many = "super::auth_logs::Entity")]
    AuthLogs,
}

impl Related<super::auth_tokens::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AuthTokens.def()
    }
}

impl Related<super::auth_logs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AuthLogs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
