//! Migration: Add the case-folded display name used by keyword search.
//!
//! The folded value is written by the application with full Unicode
//! lowercasing. Existing rows are backfilled with SQL `LOWER`, which on SQLite
//! only folds ASCII; they are refolded on their next edit.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::ConnectionTrait;

use super::m20240101_000001_create_directory_tables::Accounts;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(Accounts::Table)
                    .add_column(
                        ColumnDef::new(DisplayNameFolded::DisplayNameFolded)
                            .string_len(512)
                            .not_null()
                            .default(""),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared("UPDATE accounts SET display_name_folded = LOWER(display_name)")
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(Accounts::Table)
                    .drop_column(DisplayNameFolded::DisplayNameFolded)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum DisplayNameFolded {
    DisplayNameFolded,
}
