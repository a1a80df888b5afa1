//! Service layer - business operations over the stores.

mod account_service;
mod auth_service;
pub mod container;

pub use account_service::{AccountManager, AccountService, PasswordChange, ServiceSettings};
pub use auth_service::{AuthService, Authenticator, LoginOutcome};
pub use container::{ServiceContainer, Services, Stores};
