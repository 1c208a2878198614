pub use sea_orm_migration::prelude::*;

mod m20261001_000001_create_users_table;
mod m20261001_000002_create_todo_table;
mod m20261008_000001_create_sessions_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_create_users_table::Migration),
            Box::new(m20261001_000002_create_todo_table::Migration),
            Box::new(m20261008_000001_create_sessions_table::Migration),
        ]
    }
}
