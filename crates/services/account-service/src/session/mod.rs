//! Sessions: token issue, resolution and storage.

mod resolver;
mod store;
mod token;

pub use resolver::SessionResolver;
pub use store::{MemorySessionStore, RedisSessionStore, SessionRepository};
pub use token::{token_digest, SessionToken};

#[cfg(any(test, feature = "test-utils"))]
pub use store::MockSessionRepository;
