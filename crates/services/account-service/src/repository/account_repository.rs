//! Account repository: the identity store.
//!
//! Uniqueness of login names among active accounts is enforced by a partial
//! unique index, so concurrent creates race on the index rather than on a
//! read-then-insert check. Mutations are conditional on `deleted_at IS NULL`,
//! which makes a committed delete win over any later edit.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr},
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, IsolationLevel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use uuid::Uuid;

use super::entities::account::{self, ActiveModel, Entity as AccountEntity};
use super::entities::department::{self, Entity as DepartmentEntity};
use super::entities::role::{self, Entity as RoleEntity};
use crate::types::PaginationParams;
use common::{AppError, AppResult};
use domain::{
    Account, AccountPatch, NewAccount, Permission, Role, FIELD_DEPT_ID, FIELD_ROLE_ID,
    FIELD_USERNAME,
};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Search criteria for account listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountCriteria {
    /// Case-insensitive substring of login name or display name
    pub keyword: Option<String>,
    pub page: PaginationParams,
}

impl AccountCriteria {
    pub fn new(keyword: Option<String>, page: PaginationParams) -> Self {
        Self { keyword, page }
    }

    /// Trimmed keyword, or None when blank.
    pub fn keyword(&self) -> Option<&str> {
        self.keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

/// Account repository trait for dependency injection.
///
/// By default, all query methods exclude soft-deleted records.
/// Use `*_with_deleted` variants to include them.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Search active accounts; returns one page and the total match count
    async fn find(&self, criteria: &AccountCriteria) -> AppResult<(Vec<Account>, u64)>;

    /// Find active account by ID (excludes soft-deleted)
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Account>>;

    /// Find account by ID including soft-deleted
    async fn find_by_id_with_deleted(&self, id: Uuid) -> AppResult<Option<Account>>;

    /// Find active account by login name
    async fn find_by_login_name(&self, login_name: &str) -> AppResult<Option<Account>>;

    /// Insert a new account after checking its role and department references
    async fn create(&self, candidate: NewAccount) -> AppResult<Account>;

    /// Apply a patch to an active account
    async fn update(&self, id: Uuid, patch: AccountPatch) -> AppResult<Account>;

    /// Soft delete an active account (sets deleted_at timestamp).
    /// Refuses to remove the last active account holding administrative permission.
    async fn soft_delete(&self, id: Uuid) -> AppResult<()>;

    /// Replace the stored hash only if it still equals `expected_hash`.
    /// Returns false when another change got there first.
    async fn replace_credential(
        &self,
        id: Uuid,
        expected_hash: &str,
        new_hash: String,
    ) -> AppResult<bool>;
}

/// Concrete implementation of AccountRepository with soft delete
pub struct AccountStore {
    db: DatabaseConnection,
}

impl AccountStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountRepository for AccountStore {
    async fn find(&self, criteria: &AccountCriteria) -> AppResult<(Vec<Account>, u64)> {
        let offset = criteria
            .page
            .offset()
            .ok_or_else(|| AppError::validation("page is out of range"))?;

        let mut query = AccountEntity::find().filter(account::Column::DeletedAt.is_null());

        // Login names are ASCII, so SQL LOWER folds them on every backend.
        // Display names are matched against the column folded on write.
        if let Some(keyword) = criteria.keyword() {
            let pattern = like_pattern(keyword);
            query = query.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(account::Column::LoginName)))
                            .like(LikeExpr::new(pattern.clone()).escape('\\')),
                    )
                    .add(
                        Expr::col(account::Column::DisplayNameFolded)
                            .like(LikeExpr::new(pattern).escape('\\')),
                    ),
            );
        }

        let total = query.clone().count(&self.db).await?;
        if offset >= total {
            return Ok((Vec::new(), total));
        }

        let models = query
            .order_by_desc(account::Column::CreatedAt)
            .order_by_asc(account::Column::Id)
            .offset(offset)
            .limit(criteria.page.limit())
            .all(&self.db)
            .await?;

        Ok((models.into_iter().map(Account::from).collect(), total))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Account>> {
        let result = AccountEntity::find_by_id(id)
            .filter(account::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?;

        Ok(result.map(Account::from))
    }

    async fn find_by_id_with_deleted(&self, id: Uuid) -> AppResult<Option<Account>> {
        let result = AccountEntity::find_by_id(id).one(&self.db).await?;

        Ok(result.map(Account::from))
    }

    async fn find_by_login_name(&self, login_name: &str) -> AppResult<Option<Account>> {
        let result = AccountEntity::find()
            .filter(account::Column::LoginName.eq(login_name))
            .filter(account::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?;

        Ok(result.map(Account::from))
    }

    async fn create(&self, candidate: NewAccount) -> AppResult<Account> {
        let txn = self.db.begin().await?;
        ensure_references(&txn, Some(candidate.role_id), Some(candidate.department_id)).await?;

        let now = Utc::now();
        let active_model = ActiveModel {
            id: Set(candidate.id),
            login_name: Set(candidate.login_name),
            display_name_folded: Set(fold_case(&candidate.display_name)),
            display_name: Set(candidate.display_name),
            password_hash: Set(candidate.password_hash),
            role_id: Set(candidate.role_id),
            department_id: Set(candidate.department_id),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        };

        let model = active_model.insert(&txn).await.map_err(login_conflict)?;
        txn.commit().await.map_err(login_conflict)?;

        Ok(Account::from(model))
    }

    async fn update(&self, id: Uuid, patch: AccountPatch) -> AppResult<Account> {
        let txn = self.db.begin().await?;

        // Only allow updating active (non-deleted) accounts
        AccountEntity::find_by_id(id)
            .filter(account::Column::DeletedAt.is_null())
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound)?;
        ensure_references(&txn, patch.role_id, patch.department_id).await?;

        let mut update = AccountEntity::update_many()
            .col_expr(account::Column::UpdatedAt, Expr::value(Utc::now()));
        if let Some(display_name) = patch.display_name {
            update = update
                .col_expr(
                    account::Column::DisplayNameFolded,
                    Expr::value(fold_case(&display_name)),
                )
                .col_expr(account::Column::DisplayName, Expr::value(display_name));
        }
        if let Some(role_id) = patch.role_id {
            update = update.col_expr(account::Column::RoleId, Expr::value(role_id));
        }
        if let Some(department_id) = patch.department_id {
            update = update.col_expr(account::Column::DepartmentId, Expr::value(department_id));
        }

        let result = update
            .filter(account::Column::Id.eq(id))
            .filter(account::Column::DeletedAt.is_null())
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }

        let model = AccountEntity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound)?;
        txn.commit().await?;

        Ok(Account::from(model))
    }

    async fn soft_delete(&self, id: Uuid) -> AppResult<()> {
        // Serializable so two concurrent deletes cannot each see the other admin
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::Serializable), None)
            .await?;

        let target = AccountEntity::find_by_id(id)
            .filter(account::Column::DeletedAt.is_null())
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound)?;

        let admin_roles = admin_role_ids(&txn).await?;
        if admin_roles.contains(&target.role_id) {
            let other_admins = AccountEntity::find()
                .filter(account::Column::DeletedAt.is_null())
                .filter(account::Column::RoleId.is_in(admin_roles))
                .filter(account::Column::Id.ne(id))
                .count(&txn)
                .await?;
            if other_admins == 0 {
                tracing::warn!(account_id = %id, "Refusing to delete the last administrator");
                return Err(AppError::conflict(
                    "Cannot delete the last account with administrative permission",
                ));
            }
        }

        let now = Utc::now();
        let result = AccountEntity::update_many()
            .col_expr(account::Column::DeletedAt, Expr::value(now))
            .col_expr(account::Column::UpdatedAt, Expr::value(now))
            .filter(account::Column::Id.eq(id))
            .filter(account::Column::DeletedAt.is_null())
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }

        txn.commit().await?;
        Ok(())
    }

    async fn replace_credential(
        &self,
        id: Uuid,
        expected_hash: &str,
        new_hash: String,
    ) -> AppResult<bool> {
        let result = AccountEntity::update_many()
            .col_expr(account::Column::PasswordHash, Expr::value(new_hash))
            .col_expr(account::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(account::Column::Id.eq(id))
            .filter(account::Column::PasswordHash.eq(expected_hash))
            .filter(account::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }
}

/// Role and department must exist and be active.
async fn ensure_references<C: ConnectionTrait>(
    conn: &C,
    role_id: Option<Uuid>,
    department_id: Option<Uuid>,
) -> AppResult<()> {
    if let Some(role_id) = role_id {
        let found = RoleEntity::find_by_id(role_id)
            .filter(role::Column::DeletedAt.is_null())
            .one(conn)
            .await?;
        if found.is_none() {
            return Err(AppError::validation(format!(
                "{} does not reference an existing role",
                FIELD_ROLE_ID
            )));
        }
    }

    if let Some(department_id) = department_id {
        let found = DepartmentEntity::find_by_id(department_id)
            .filter(department::Column::DeletedAt.is_null())
            .one(conn)
            .await?;
        if found.is_none() {
            return Err(AppError::validation(format!(
                "{} does not reference an existing department",
                FIELD_DEPT_ID
            )));
        }
    }

    Ok(())
}

async fn admin_role_ids<C: ConnectionTrait>(conn: &C) -> AppResult<Vec<Uuid>> {
    let roles = RoleEntity::find()
        .filter(role::Column::DeletedAt.is_null())
        .all(conn)
        .await?;

    Ok(roles
        .into_iter()
        .map(Role::from)
        .filter(|r| r.grants(Permission::Admin))
        .map(|r| r.id)
        .collect())
}

fn login_conflict(err: DbErr) -> AppError {
    match AppError::from(err) {
        AppError::Conflict(_) => AppError::conflict(format!("{} already exists", FIELD_USERNAME)),
        other => other,
    }
}

/// Unicode lowercase form stored for and compared by keyword search.
fn fold_case(value: &str) -> String {
    value.to_lowercase()
}

/// Folded `%keyword%` with LIKE metacharacters escaped.
fn like_pattern(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len() + 2);
    escaped.push('%');
    for c in fold_case(keyword).chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("AD"), "%ad%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn folding_covers_non_ascii_letters() {
        assert_eq!(fold_case("ÉMILE Ørsted"), "émile ørsted");
        assert_eq!(like_pattern("ÉMILE"), like_pattern("émile"));
    }

    #[test]
    fn blank_keyword_is_ignored() {
        let criteria = AccountCriteria::new(Some("   ".to_string()), PaginationParams::default());
        assert_eq!(criteria.keyword(), None);

        let criteria = AccountCriteria::new(Some(" ad ".to_string()), PaginationParams::default());
        assert_eq!(criteria.keyword(), Some("ad"));
    }
}
