//! Application state shared by every handler.

use std::sync::Arc;

use crate::config::SessionSettings;
use crate::infra::Database;
use crate::service::{AccountService, AuthService, ServiceContainer, Services};
use crate::session::SessionResolver;

#[derive(Clone)]
pub struct AppState {
    /// Account lifecycle service
    pub account_service: Arc<dyn AccountService>,
    /// Authentication service
    pub auth_service: Arc<dyn AuthService>,
    /// Database connection, for health checks
    pub database: Arc<Database>,
    /// Session backend, for health checks
    pub sessions: Arc<SessionResolver>,
    /// Name of the cookie carrying the session token
    pub session_cookie: Arc<str>,
}

impl AppState {
    pub fn from_services(
        services: &Services,
        database: Arc<Database>,
        session: &SessionSettings,
    ) -> Self {
        Self {
            account_service: services.accounts(),
            auth_service: services.auth(),
            database,
            sessions: services.sessions(),
            session_cookie: Arc::from(session.cookie_name.as_str()),
        }
    }
}
