//! SeaORM entities.

pub mod account;
pub mod department;
pub mod role;
