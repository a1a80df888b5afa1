//! Shared harness: in-memory SQLite, migrated and seeded, with in-process sessions.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use sea_orm::ConnectOptions;
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use account_service_lib::cli::args::SeedArgs;
use account_service_lib::commands::seed::seed_administrator;
use account_service_lib::config::{Config, SessionBackend, SessionSettings};
use account_service_lib::infra::{Database, Migrator};
use account_service_lib::service::{AccountService, AuthService, ServiceContainer, Services};
use account_service_lib::session::MemorySessionStore;
use account_service_lib::{create_router, AppState};
use domain::{Account, AccountDraft, AccountSummary, Department, NewRole, Permission, Role, Session};

pub const ADMIN_USERNAME: &str = "admin-01";
pub const ADMIN_PASSWORD: &str = "secret";

pub struct TestApp {
    pub config: Config,
    pub database: Arc<Database>,
    pub services: Services,
    pub admin: Account,
    pub admin_role: Role,
    pub reader_role: Role,
    pub department: Department,
}

/// Fresh database and services. `authority_enabled` fixes the gate mode for the app's lifetime.
pub async fn spawn_app(authority_enabled: bool) -> TestApp {
    // One connection: every pool checkout sees the same in-memory database
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let connection = sea_orm::Database::connect(options)
        .await
        .expect("connect sqlite");
    Migrator::up(&connection, None).await.expect("run migrations");
    let database = Arc::new(Database::from_connection(connection));

    let config = Config {
        authority_enabled,
        session: SessionSettings {
            backend: SessionBackend::Memory,
            ..SessionSettings::default()
        },
        ..Config::default()
    };

    let services = Services::build(
        database.get_connection(),
        Arc::new(MemorySessionStore::new()),
        &config,
    );

    let admin = seed_administrator(
        services.stores(),
        &services.credentials(),
        &SeedArgs {
            username: ADMIN_USERNAME.to_string(),
            password: ADMIN_PASSWORD.to_string(),
            name: "Administrator".to_string(),
        },
    )
    .await
    .expect("seed administrator");

    let stores = services.stores();
    let admin_role = stores
        .roles
        .find_by_id(admin.role_id)
        .await
        .expect("load admin role")
        .expect("admin role exists");
    let department = stores
        .departments
        .find_by_id(admin.department_id)
        .await
        .expect("load department")
        .expect("department exists");
    let reader_role = stores
        .roles
        .create(NewRole {
            name: "Readers".to_string(),
            permissions: [Permission::Read].into_iter().collect(),
        })
        .await
        .expect("create reader role");

    TestApp {
        config,
        database,
        services,
        admin,
        admin_role,
        reader_role,
        department,
    }
}

impl TestApp {
    pub fn accounts(&self) -> Arc<dyn AccountService> {
        self.services.accounts()
    }

    pub fn auth(&self) -> Arc<dyn AuthService> {
        self.services.auth()
    }

    pub fn router(&self) -> Router {
        create_router(AppState::from_services(
            &self.services,
            self.database.clone(),
            &self.config.session,
        ))
    }

    pub async fn login(&self, username: &str, password: &str) -> Session {
        self.auth()
            .login(username, password)
            .await
            .expect("login")
            .session
    }

    pub async fn admin_session(&self) -> Session {
        self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await
    }

    pub fn draft(&self, username: &str, password: &str, role_id: Uuid) -> AccountDraft {
        AccountDraft {
            username: username.to_string(),
            password: password.to_string(),
            name: format!("User {}", username),
            role_id: Some(role_id),
            department_id: Some(self.department.id),
        }
    }

    /// Add a reader account as the administrator.
    pub async fn add_reader(&self, username: &str, password: &str) -> AccountSummary {
        let session = self.admin_session().await;
        self.accounts()
            .add(
                Some(&session),
                self.draft(username, password, self.reader_role.id),
            )
            .await
            .expect("add reader")
    }
}
