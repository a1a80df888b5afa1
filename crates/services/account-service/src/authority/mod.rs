//! Permission checks for lifecycle operations.

mod gate;

pub use gate::{Access, AuthorityGate, AuthorityMode};
