use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(User::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(User::ExternalId).big_integer().not_null().unique_key())
                    .col(ColumnDef::new(User::IsAdmin).boolean().default(false).not_null())
                    .to_owned(),
            )
            .await?;

        // 推送升级请求时需要按管理员筛选
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_user_is_admin")
                    .table(User::Table)
                    .col(User::IsAdmin)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(User::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
pub enum User {
    Table,
    Id,
    ExternalId,
    IsAdmin,
}
