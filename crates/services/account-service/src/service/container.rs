//! Service container - wires stores, gate and sessions into the services.

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use super::{AccountManager, AccountService, AuthService, Authenticator, ServiceSettings};
use crate::authority::{AuthorityGate, AuthorityMode};
use crate::config::Config;
use crate::credential::CredentialManager;
use crate::repository::{
    AccountRepository, AccountStore, DepartmentRepository, DepartmentStore, RoleRepository,
    RoleStore,
};
use crate::session::{SessionRepository, SessionResolver};

/// Service container trait for dependency injection.
pub trait ServiceContainer: Send + Sync {
    /// Account lifecycle service
    fn accounts(&self) -> Arc<dyn AccountService>;

    /// Authentication service
    fn auth(&self) -> Arc<dyn AuthService>;
}

/// Direct store access, for seeding and administration commands.
#[derive(Clone)]
pub struct Stores {
    pub accounts: Arc<dyn AccountRepository>,
    pub roles: Arc<dyn RoleRepository>,
    pub departments: Arc<dyn DepartmentRepository>,
}

impl Stores {
    pub fn from_connection(db: DatabaseConnection) -> Self {
        Self {
            accounts: Arc::new(AccountStore::new(db.clone())),
            roles: Arc::new(RoleStore::new(db.clone())),
            departments: Arc::new(DepartmentStore::new(db)),
        }
    }
}

/// Concrete implementation of ServiceContainer
pub struct Services {
    account_service: Arc<dyn AccountService>,
    auth_service: Arc<dyn AuthService>,
    stores: Stores,
    credentials: Arc<CredentialManager>,
    sessions: Arc<SessionResolver>,
}

impl Services {
    /// Build every service over one database connection and session backend.
    pub fn build(
        db: DatabaseConnection,
        session_store: Arc<dyn SessionRepository>,
        config: &Config,
    ) -> Self {
        let stores = Stores::from_connection(db);
        let timeout = config.store_timeout;

        let credentials = Arc::new(CredentialManager::new(
            stores.accounts.clone(),
            config.password.clone(),
            timeout,
        ));
        let gate = Arc::new(AuthorityGate::new(
            AuthorityMode::from(config.authority_enabled),
            stores.accounts.clone(),
            stores.roles.clone(),
            timeout,
        ));
        let sessions = Arc::new(SessionResolver::new(
            config.session.mode,
            session_store,
            stores.accounts.clone(),
            config.session.ttl,
            timeout,
        ));

        let account_service = Arc::new(AccountManager::new(
            stores.accounts.clone(),
            stores.roles.clone(),
            stores.departments.clone(),
            credentials.clone(),
            gate,
            ServiceSettings {
                store_timeout: timeout,
                list_retries: config.list_retries,
            },
        ));
        let auth_service = Arc::new(Authenticator::new(credentials.clone(), sessions.clone()));

        Self {
            account_service,
            auth_service,
            stores,
            credentials,
            sessions,
        }
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn credentials(&self) -> Arc<CredentialManager> {
        self.credentials.clone()
    }

    pub fn sessions(&self) -> Arc<SessionResolver> {
        self.sessions.clone()
    }
}

impl ServiceContainer for Services {
    fn accounts(&self) -> Arc<dyn AccountService> {
        self.account_service.clone()
    }

    fn auth(&self) -> Arc<dyn AuthService> {
        self.auth_service.clone()
    }
}
