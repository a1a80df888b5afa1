//! Seed command - bootstrap role, department and first administrator.

use uuid::Uuid;

use common::{AppError, AppResult};
use domain::{Account, LoginName, NewAccount, NewDepartment, NewRole, Permission};

use crate::cli::args::SeedArgs;
use crate::config::{Config, SEED_DEPARTMENT_NAME, SEED_ROLE_NAME};
use crate::credential::CredentialManager;
use crate::infra::Database;
use crate::service::Stores;

/// Execute the seed command
pub async fn execute(args: SeedArgs, config: Config) -> AppResult<()> {
    let db = Database::connect(&config.database)
        .await
        .map_err(|e| AppError::internal(format!("Database connection failed: {}", e)))?;

    let stores = Stores::from_connection(db.get_connection());
    let credentials = CredentialManager::new(
        stores.accounts.clone(),
        config.password.clone(),
        config.store_timeout,
    );

    let account = seed_administrator(&stores, &credentials, &args).await?;
    println!("Administrator '{}' created with id {}", account.login_name, account.id);
    Ok(())
}

/// Create an administrator account, reusing the bootstrap role and
/// department when they already exist.
pub async fn seed_administrator(
    stores: &Stores,
    credentials: &CredentialManager,
    args: &SeedArgs,
) -> AppResult<Account> {
    let login_name = LoginName::parse(&args.username)?;
    let display_name = args.name.trim();
    if display_name.is_empty() {
        return Err(AppError::validation("Name is required"));
    }

    let role = match stores
        .roles
        .list()
        .await?
        .into_iter()
        .find(|r| r.name == SEED_ROLE_NAME && r.is_admin())
    {
        Some(role) => role,
        None => {
            stores
                .roles
                .create(NewRole {
                    name: SEED_ROLE_NAME.to_string(),
                    permissions: [Permission::Read, Permission::Write, Permission::Admin]
                        .into_iter()
                        .collect(),
                })
                .await?
        }
    };

    let department = match stores
        .departments
        .list()
        .await?
        .into_iter()
        .find(|d| d.name == SEED_DEPARTMENT_NAME)
    {
        Some(department) => department,
        None => {
            stores
                .departments
                .create(NewDepartment {
                    name: SEED_DEPARTMENT_NAME.to_string(),
                    parent_id: None,
                })
                .await?
        }
    };

    let id = Uuid::new_v4();
    let password = credentials.set_initial_credential(id, &args.password)?;
    let account = stores
        .accounts
        .create(NewAccount {
            id,
            login_name: login_name.into_inner(),
            display_name: display_name.to_string(),
            password_hash: password.into_string(),
            role_id: role.id,
            department_id: department.id,
        })
        .await?;

    tracing::info!(account_id = %account.id, role_id = %role.id, "Administrator seeded");
    Ok(account)
}
