//! CLI module - `serve`, `migrate` and `seed`.

pub mod args;

pub use args::{Cli, Commands, MigrateAction};
