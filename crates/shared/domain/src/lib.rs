//! Domain layer - Core business entities and value objects.
//!
//! This crate contains pure domain logic with no infrastructure dependencies.

pub mod account;
pub mod constants;
pub mod department;
pub mod error;
pub mod password;
pub mod role;
pub mod session;

pub use account::{
    Account, AccountDraft, AccountEdit, AccountPatch, AccountStatus, AccountSummary, LoginName,
    NewAccount, ValidatedDraft,
};
pub use constants::*;
pub use department::{Department, NewDepartment};
pub use error::{DomainError, DomainResult};
pub use password::Password;
pub use role::{NewRole, Permission, Role};
pub use session::Session;
