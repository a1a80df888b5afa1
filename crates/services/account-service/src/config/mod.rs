//! Service configuration module
//!
//! Handles environment variables and service-wide constants.

mod constants;
mod settings;

pub use constants::*;
pub use settings::{Config, SessionBackend, SessionMode, SessionSettings};
