pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_user;
mod m20250301_000002_create_conversation;
mod m20250302_000001_create_write_lock;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_user::Migration),
            Box::new(m20250301_000002_create_conversation::Migration),
            Box::new(m20250302_000001_create_write_lock::Migration),
        ]
    }
}
