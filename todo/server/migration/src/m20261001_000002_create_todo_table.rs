use sea_orm_migration::prelude::*;
use sea_orm_migration::schema::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const FK_TODO_TO_USERS: &str = "fk-todo-user_id";
const IDX_TODO_USER_ID: &str = "idx-todo-user_id";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Todo::Table)
                    .if_not_exists()
                    .col(pk_auto(Todo::Id))
                    .col(integer(Todo::UserId))
                    .col(string_len(Todo::Activity, 250))
                    .col(string_len(Todo::Date, 250))
                    .col(string_len(Todo::Time, 250))
                    .foreign_key(
                        ForeignKey::create()
                            .name(FK_TODO_TO_USERS)
                            .from(Todo::Table, Todo::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(IDX_TODO_USER_ID)
                    .table(Todo::Table)
                    .col(Todo::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name(IDX_TODO_USER_ID)
                    .table(Todo::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Todo::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Todo {
    Table,
    Id,
    UserId,
    Activity,
    Date,
    Time,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
