//! Domain models shared by the store, services and handlers.

pub mod user;

pub use user::{User, UserRow};
