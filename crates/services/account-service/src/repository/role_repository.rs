//! Role repository.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use super::entities::role::{self, ActiveModel, Entity as RoleEntity};
use common::{AppError, AppResult};
use domain::{NewRole, Permission, Role};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Find active role by ID
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Role>>;

    /// List active roles ordered by name
    async fn list(&self) -> AppResult<Vec<Role>>;

    async fn create(&self, role: NewRole) -> AppResult<Role>;

    /// Soft delete a role. Accounts keep the reference but gain no permissions from it.
    async fn soft_delete(&self, id: Uuid) -> AppResult<()>;
}

pub struct RoleStore {
    db: DatabaseConnection,
}

impl RoleStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RoleRepository for RoleStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Role>> {
        let result = RoleEntity::find_by_id(id)
            .filter(role::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?;

        Ok(result.map(Role::from))
    }

    async fn list(&self) -> AppResult<Vec<Role>> {
        let models = RoleEntity::find()
            .filter(role::Column::DeletedAt.is_null())
            .order_by_asc(role::Column::Name)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Role::from).collect())
    }

    async fn create(&self, role: NewRole) -> AppResult<Role> {
        let name = role.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("Role name cannot be empty"));
        }

        let now = Utc::now();
        let model = ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            permissions: Set(Permission::join_list(&role.permissions)),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        }
        .insert(&self.db)
        .await?;

        Ok(Role::from(model))
    }

    async fn soft_delete(&self, id: Uuid) -> AppResult<()> {
        let now = Utc::now();
        let result = RoleEntity::update_many()
            .col_expr(role::Column::DeletedAt, Expr::value(now))
            .col_expr(role::Column::UpdatedAt, Expr::value(now))
            .filter(role::Column::Id.eq(id))
            .filter(role::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
