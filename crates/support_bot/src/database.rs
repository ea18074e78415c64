use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use sea_orm::sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sea_orm::{ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, SqlxSqliteConnector, TransactionTrait};
use support_bot_migration::{Migrator, MigratorTrait};
use tracing::debug;

/// 创建 SQLite 连接选项
fn create_sqlite_options(path: &Path) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(30))
        .pragma("temp_store", "MEMORY")
}

async fn database_connection(path: &Path) -> Result<DatabaseConnection> {
    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .connect_with(create_sqlite_options(path))
        .await
        .with_context(|| format!("打开数据库失败: {}", path.display()))?;

    debug!("SQLite 连接池已创建: {}", path.display());
    Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
}

async fn migrate_database(path: &Path) -> Result<()> {
    if !path.exists() {
        debug!("数据库文件不存在，将创建新的数据库");
    }

    // 迁移使用单连接池，避免多连接导致的迁移顺序问题
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(create_sqlite_options(path))
        .await?;
    let connection = SqlxSqliteConnector::from_sqlx_sqlite_pool(pool.clone());

    Migrator::up(&connection, None).await.context("数据库迁移失败")?;

    pool.close().await;
    debug!("迁移完成，已关闭迁移连接池");
    Ok(())
}

/// 进行数据库迁移并获取数据库连接
pub async fn setup_database(path: &Path) -> Result<DatabaseConnection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| format!("创建数据目录失败: {}", parent.display()))?;
        }
    }
    migrate_database(path).await?;
    database_connection(path).await
}

/// 开始一个事务并立即获取写锁
/// 通过更新锁定行来强制获取写锁，避免读后写的事务之间出现 SQLITE_BUSY_SNAPSHOT
pub async fn begin_write_transaction(connection: &DatabaseConnection) -> Result<DatabaseTransaction, DbErr> {
    let txn = connection.begin().await?;
    txn.execute_unprepared("UPDATE write_lock SET ts = strftime('%s', 'now') WHERE id = 1")
        .await?;
    Ok(txn)
}

/// 测试用的内存数据库，已应用全部迁移
#[cfg(test)]
pub async fn setup_test_database() -> DatabaseConnection {
    use std::str::FromStr;

    // 内存数据库每个连接相互独立，只能使用单连接
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    let connection = SqlxSqliteConnector::from_sqlx_sqlite_pool(pool);
    Migrator::up(&connection, None).await.unwrap();
    connection
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Statement;

    #[tokio::test]
    async fn test_migrations_create_tables() {
        let db = setup_test_database().await;
        let backend = db.get_database_backend();
        for table in ["user", "conversation", "write_lock"] {
            let row = db
                .query_one(Statement::from_string(
                    backend,
                    format!("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='{}'", table),
                ))
                .await
                .unwrap()
                .unwrap();
            let count: i64 = row.try_get_by_index(0).unwrap();
            assert_eq!(count, 1, "缺少表 {}", table);
        }
    }

    #[tokio::test]
    async fn test_write_transaction_commits() {
        let db = setup_test_database().await;
        let txn = begin_write_transaction(&db).await.unwrap();
        txn.commit().await.unwrap();
    }
}
