use sea_orm::entity::prelude::*;

use crate::custom_type::Transcript;

/// 客服对话（工单）
///
/// end_time 为空表示对话仍在进行中，每个用户同一时间最多只有一条进行中的对话，
/// 该约束由迁移中创建的部分唯一索引保证。
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "conversation")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub start_time: DateTimeUtc,
    pub end_time: Option<DateTimeUtc>,
    pub is_successful: Option<bool>,
    #[sea_orm(column_type = "Json")]
    pub messages: Transcript,
    pub category: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
