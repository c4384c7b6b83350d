//! In-memory user table.
//!
//! All state sits behind one `RwLock`: lookups share the read side, and
//! `insert_if_absent` holds the write side across the existence check, id
//! allocation and both index inserts. Usernames are therefore unique and
//! ids strictly increasing under any interleaving of callers.

use crate::error::AccountError;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

/// A registered user. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: u64,
    pub username: String,
    /// bcrypt hash string, see [`crate::password`].
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Table {
    by_name: HashMap<String, Arc<User>>,
    by_id: HashMap<u64, Arc<User>>,
    next_id: u64,
}

/// Concurrency-safe owner of all users.
#[derive(Debug)]
pub struct UserStore {
    table: RwLock<Table>,
}

impl UserStore {
    /// Id assigned to the first registered user.
    pub const FIRST_USER_ID: u64 = 1;

    pub fn new() -> Self {
        Self {
            table: RwLock::new(Table {
                by_name: HashMap::new(),
                by_id: HashMap::new(),
                next_id: Self::FIRST_USER_ID,
            }),
        }
    }

    pub fn exists(&self, username: &str) -> bool {
        self.table.read().by_name.contains_key(username)
    }

    /// Looks a user up by name (case-sensitive).
    pub fn get(&self, username: &str) -> Result<Arc<User>, AccountError> {
        self.table
            .read()
            .by_name
            .get(username)
            .cloned()
            .ok_or_else(|| AccountError::UserNotFound {
                username: username.to_string(),
            })
    }

    pub fn get_by_id(&self, user_id: u64) -> Option<Arc<User>> {
        self.table.read().by_id.get(&user_id).cloned()
    }

    /// Inserts a new user unless the name is taken.
    ///
    /// This is the only way users enter the store.
    pub fn insert_if_absent(
        &self,
        username: &str,
        password_hash: String,
    ) -> Result<Arc<User>, AccountError> {
        let mut guard = self.table.write();
        let table = &mut *guard;

        let slot = match table.by_name.entry(username.to_string()) {
            Entry::Occupied(_) => {
                return Err(AccountError::UsernameExists {
                    username: username.to_string(),
                })
            }
            Entry::Vacant(slot) => slot,
        };

        let user_id = table.next_id;
        table.next_id += 1;

        let user = Arc::new(User {
            user_id,
            username: username.to_string(),
            password_hash,
            created_at: Utc::now(),
        });
        slot.insert(Arc::clone(&user));
        table.by_id.insert(user_id, Arc::clone(&user));
        Ok(user)
    }

    /// Returns the id the next successful insert will receive.
    pub fn next_id(&self) -> u64 {
        self.table.read().next_id
    }

    pub fn len(&self) -> usize {
        self.table.read().by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}
