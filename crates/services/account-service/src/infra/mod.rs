//! Infrastructure layer - database, migrations and store-call bounds.

mod db;
pub mod deadline;
pub mod migrations;

pub use db::Database;
pub use deadline::bounded;
pub use migrations::Migrator;
