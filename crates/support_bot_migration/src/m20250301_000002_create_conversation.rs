use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Conversation::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Conversation::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Conversation::UserId).integer().not_null())
                    .col(
                        ColumnDef::new(Conversation::StartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Conversation::EndTime).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Conversation::IsSuccessful).boolean().null())
                    .col(ColumnDef::new(Conversation::Messages).json().not_null().default("[]"))
                    .col(ColumnDef::new(Conversation::Category).string().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_conversation_user")
                            .from(Conversation::Table, Conversation::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // 统计报表按开始时间筛选
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_conversation_start_time")
                    .table(Conversation::Table)
                    .col(Conversation::StartTime)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_conversation_user_id")
                    .table(Conversation::Table)
                    .col(Conversation::UserId)
                    .to_owned(),
            )
            .await?;

        // 每个用户最多一条进行中的对话（end_time 为空）
        // sea-query 不支持带 WHERE 的部分索引，这里直接执行 SQL
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_conversation_one_active \
                 ON conversation (user_id) WHERE end_time IS NULL",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Conversation::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Conversation {
    Table,
    Id,
    UserId,
    StartTime,
    EndTime,
    IsSuccessful,
    Messages,
    Category,
}

#[derive(DeriveIden)]
pub enum User {
    Table,
    Id,
}
