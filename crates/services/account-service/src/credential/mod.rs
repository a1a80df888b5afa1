//! Credential management: password policy, hashing and transitions.

mod manager;
mod policy;

pub use manager::CredentialManager;
pub use policy::PasswordPolicy;
