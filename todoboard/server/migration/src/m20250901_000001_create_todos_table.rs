use sea_orm_migration::prelude::*;
use sea_orm_migration::schema::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Todos {
    Table,
    Id,
    Title,
    Category,
}

const IDX_TODOS_TITLE: &str = "idx_todos_title";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Ids are assigned by the application, so the key has no sequence behind it.
        manager
            .create_table(
                Table::create()
                    .table(Todos::Table)
                    .if_not_exists()
                    .col(integer(Todos::Id).primary_key())
                    .col(string(Todos::Title))
                    .col(string_len(Todos::Category, 16).default("backlog"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name(IDX_TODOS_TITLE)
                    .table(Todos::Table)
                    .col(Todos::Title)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name(IDX_TODOS_TITLE)
                    .table(Todos::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Todos::Table).to_owned())
            .await
    }
}
