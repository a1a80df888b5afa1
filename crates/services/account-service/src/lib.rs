//! Account Service
//!
//! Account administration behind a permission gate: list, inspect, create,
//! edit and soft-delete accounts, and let a signed-in user change their own
//! password.
//!
//! # Layers
//!
//! - **api**: HTTP handlers, session middleware, routes
//! - **service**: lifecycle and authentication use cases
//! - **authority**: permission gate
//! - **credential**: password policy and credential transitions
//! - **session**: session tokens and their storage
//! - **repository**: sea-orm stores for accounts, roles and departments
//! - **infra**: database connection, migrations, store-call deadlines
//! - **cli** / **commands**: `serve`, `migrate`, `seed`

pub mod api;
pub mod authority;
pub mod cli;
pub mod commands;
pub mod config;
pub mod credential;
pub mod infra;
pub mod repository;
pub mod service;
pub mod session;
pub mod types;

pub use api::{create_router, AppState};
pub use config::Config;
pub use infra::Database;
pub use service::{ServiceContainer, Services};
