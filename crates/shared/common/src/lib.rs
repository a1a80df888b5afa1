//! Common utilities shared across the workspace.
//!
//! This crate provides:
//! - Unified error handling and backend error translation
//! - Configuration structures and environment helpers

pub mod config;
pub mod error;

pub use config::*;
pub use error::{AppError, AppResult, OptionExt};
