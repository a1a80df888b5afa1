//! Migration: Enforce login name uniqueness among active accounts.
//!
//! A deleted account keeps its login name, so the unique index is partial
//! (`WHERE deleted_at IS NULL`). Both PostgreSQL and SQLite accept this form.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::ConnectionTrait;

use super::m20240101_000001_create_directory_tables::Accounts;

const ACTIVE_LOGIN_INDEX: &str = "uq_accounts_login_name_active";
const DELETED_AT_INDEX: &str = "idx_accounts_deleted_at";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(&format!(
                "CREATE UNIQUE INDEX {} ON accounts (login_name) WHERE deleted_at IS NULL",
                ACTIVE_LOGIN_INDEX
            ))
            .await?;

        // Add index for efficient filtering of active accounts
        manager
            .create_index(
                Index::create()
                    .name(DELETED_AT_INDEX)
                    .table(Accounts::Table)
                    .col(Accounts::DeletedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name(DELETED_AT_INDEX)
                    .table(Accounts::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(&format!("DROP INDEX {}", ACTIVE_LOGIN_INDEX))
            .await?;
        Ok(())
    }
}
