use sea_orm_migration::prelude::*;

/// 写锁表：开启事务后先更新这一行，强制 SQLite 立即获取写锁，
/// 避免读后写事务在并发时触发 SQLITE_BUSY_SNAPSHOT
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WriteLock::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(WriteLock::Id).integer().not_null().primary_key())
                    .col(ColumnDef::new(WriteLock::Ts).big_integer().not_null().default(0))
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared("INSERT OR IGNORE INTO write_lock (id, ts) VALUES (1, 0)")
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(WriteLock::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
pub enum WriteLock {
    Table,
    Id,
    Ts,
}
