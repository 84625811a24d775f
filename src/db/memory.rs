//! In-process credential store for development and tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::CredentialStore;
use crate::error::{AppError, AppResult};
use crate::models::UserRow;

/// Users kept in a map behind one mutex; lookup and insert each take the lock once,
/// which makes insert-if-absent atomic. Contents are lost on restart.
#[derive(Clone, Default)]
pub struct InMemoryCredentialStore {
    users: Arc<Mutex<HashMap<String, UserRow>>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, HashMap<String, UserRow>>> {
        self.users
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("credential store lock poisoned")))
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> AppResult<Option<UserRow>> {
        Ok(self.lock()?.get(username).cloned())
    }

    async fn insert(&self, username: &str, password_hash: &str) -> AppResult<UserRow> {
        match self.lock()?.entry(username.to_string()) {
            Entry::Occupied(_) => Err(AppError::DuplicateUser(username.to_string())),
            Entry::Vacant(slot) => {
                let row = UserRow {
                    id: Uuid::new_v4(),
                    username: username.to_string(),
                    password_hash: password_hash.to_string(),
                    created_at: Utc::now(),
                };
                Ok(slot.insert(row).clone())
            }
        }
    }
}
