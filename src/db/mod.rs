//! Credential storage: the `CredentialStore` trait with PostgreSQL and in-memory backends.

mod memory;
mod pool;
mod repositories;

pub use memory::InMemoryCredentialStore;
pub use pool::{create_pool, DbPool};
pub use repositories::*;
