//! Role database entity for SeaORM.

use std::collections::BTreeSet;

use sea_orm::entity::prelude::*;

use domain::{Permission, Role};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "roles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    /// Comma separated permission names
    pub permissions: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::account::Entity")]
    Account,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Role {
    fn from(model: Model) -> Self {
        // A stored permission we no longer recognise grants nothing.
        let permissions = Permission::parse_list(&model.permissions).unwrap_or_else(|err| {
            tracing::warn!(role_id = %model.id, error = %err, "Ignoring unreadable role permissions");
            BTreeSet::new()
        });

        Role {
            id: model.id,
            name: model.name,
            permissions,
            created_at: model.created_at,
            updated_at: model.updated_at,
            deleted_at: model.deleted_at,
        }
    }
}
