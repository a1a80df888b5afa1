//! Department repository.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use super::entities::department::{self, ActiveModel, Entity as DepartmentEntity};
use common::{AppError, AppResult};
use domain::{Department, NewDepartment};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait DepartmentRepository: Send + Sync {
    /// Find active department by ID
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Department>>;

    /// List active departments ordered by name
    async fn list(&self) -> AppResult<Vec<Department>>;

    /// Create a department; a parent, when given, must be active
    async fn create(&self, department: NewDepartment) -> AppResult<Department>;

    async fn soft_delete(&self, id: Uuid) -> AppResult<()>;
}

pub struct DepartmentStore {
    db: DatabaseConnection,
}

impl DepartmentStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DepartmentRepository for DepartmentStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Department>> {
        let result = DepartmentEntity::find_by_id(id)
            .filter(department::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?;

        Ok(result.map(Department::from))
    }

    async fn list(&self) -> AppResult<Vec<Department>> {
        let models = DepartmentEntity::find()
            .filter(department::Column::DeletedAt.is_null())
            .order_by_asc(department::Column::Name)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Department::from).collect())
    }

    async fn create(&self, department: NewDepartment) -> AppResult<Department> {
        let name = department.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("Department name cannot be empty"));
        }
        if let Some(parent_id) = department.parent_id {
            if self.find_by_id(parent_id).await?.is_none() {
                return Err(AppError::validation("Parent department does not exist"));
            }
        }

        let now = Utc::now();
        let model = ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            parent_id: Set(department.parent_id),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        }
        .insert(&self.db)
        .await?;

        Ok(Department::from(model))
    }

    async fn soft_delete(&self, id: Uuid) -> AppResult<()> {
        let now = Utc::now();
        let result = DepartmentEntity::update_many()
            .col_expr(department::Column::DeletedAt, Expr::value(now))
            .col_expr(department::Column::UpdatedAt, Expr::value(now))
            .filter(department::Column::Id.eq(id))
            .filter(department::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
