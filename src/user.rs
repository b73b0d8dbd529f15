//! Connected participants.
//!
//! User ids never carry the host's own identity. The id a user joins with
//! is derived from the host user id and a salt:
//!
//! ```text
//! md5( base64( sha256( host_user_id + ":" + salt ) ) )  →  128-bit id
//! ```
//!
//! The salt is the per-session app id, so one person maps to the same id
//! across reconnects to the same app but to unrelated ids across apps. When
//! user tracking is granted and a stable global app id is configured, that id
//! is the salt instead.

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::patch::{Patch, Patchable};
use crate::types::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserError {
    #[error("User {0} already exists")]
    AlreadyExists(UserId),

    #[error("A local user ({0}) is already registered on this connection")]
    LocalUserExists(UserId),
}

/// Deterministic, one-way user id for `host_user_id` under `salt`.
pub fn obfuscate_user_id(host_user_id: &str, salt: &str) -> UserId {
    let hash = Sha256::digest(format!("{host_user_id}:{salt}").as_bytes());
    let encoded = STANDARD.encode(hash);
    Uuid::from_bytes(md5::compute(encoded.as_bytes()).0)
}

// ---------------------------------------------------------------------------
// User + patch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub is_local: bool,
    pub interaction_enabled: bool,
    pub properties: HashMap<String, String>,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>, is_local: bool) -> Self {
        Self {
            id,
            name: name.into(),
            is_local,
            interaction_enabled: false,
            properties: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPatch {
    pub id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, String>>,
}

impl Patch for UserPatch {
    fn is_patched(&self) -> bool {
        self.name.is_some() || self.properties.is_some()
    }
}

impl Patchable for User {
    type Patch = UserPatch;

    fn apply_patch(&mut self, patch: &UserPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(props) = &patch.properties {
            self.properties = props.clone();
        }
    }

    fn diff(&self, newer: &Self) -> Option<UserPatch> {
        let patch = UserPatch {
            id: newer.id,
            name: (self.name != newer.name).then(|| newer.name.clone()),
            properties: (self.properties != newer.properties).then(|| newer.properties.clone()),
        };
        patch.is_patched().then_some(patch)
    }

    fn to_full_patch(&self) -> UserPatch {
        UserPatch {
            id: self.id,
            name: Some(self.name.clone()),
            properties: Some(self.properties.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// UserManager
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct UserManager {
    users: HashMap<UserId, User>,
    local_user: Option<UserId>,
}

impl UserManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `user`. At most one local user may exist at a time.
    pub fn add_user(&mut self, user: User) -> Result<(), UserError> {
        if self.users.contains_key(&user.id) {
            return Err(UserError::AlreadyExists(user.id));
        }
        if user.is_local {
            if let Some(existing) = self.local_user {
                return Err(UserError::LocalUserExists(existing));
            }
            self.local_user = Some(user.id);
        }
        info!("User joined: {} ({})", user.name, user.id);
        self.users.insert(user.id, user);
        Ok(())
    }

    pub fn remove_user(&mut self, id: UserId) -> Option<User> {
        let user = self.users.remove(&id)?;
        if self.local_user == Some(id) {
            self.local_user = None;
        }
        info!("User left: {} ({})", user.name, user.id);
        Some(user)
    }

    pub fn find(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn local_user(&self) -> Option<&User> {
        self.local_user.and_then(|id| self.users.get(&id))
    }

    /// Apply a remote update. Unknown users are ignored.
    pub fn update_user(&mut self, patch: &UserPatch) -> bool {
        match self.users.get_mut(&patch.id) {
            Some(user) => {
                user.apply_patch(patch);
                true
            }
            None => {
                warn!("Update for unknown user {}", patch.id);
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn clear(&mut self) {
        self.users.clear();
        self.local_user = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn obfuscated_id_is_deterministic_per_salt() {
        let a = obfuscate_user_id("host-user-1", "app-A");
        assert_eq!(a, obfuscate_user_id("host-user-1", "app-A"));
        assert_ne!(a, obfuscate_user_id("host-user-1", "app-B"));
        assert_ne!(a, obfuscate_user_id("host-user-2", "app-A"));
    }

    #[test]
    fn only_one_local_user() {
        let mut users = UserManager::new();
        let first = Uuid::new_v4();
        users.add_user(User::new(first, "a", true)).expect("first");
        let err = users
            .add_user(User::new(Uuid::new_v4(), "b", true))
            .unwrap_err();
        assert_eq!(err, UserError::LocalUserExists(first));
        users.add_user(User::new(Uuid::new_v4(), "c", false)).expect("remote");
        assert_eq!(users.len(), 2);
    }

    #[test]
    fn removing_local_user_frees_the_slot() {
        let mut users = UserManager::new();
        let id = Uuid::new_v4();
        users.add_user(User::new(id, "a", true)).expect("add");
        assert!(users.remove_user(id).is_some());
        assert!(users.local_user().is_none());
        users.add_user(User::new(Uuid::new_v4(), "b", true)).expect("re-add");
    }

    #[test]
    fn user_patch_diff() {
        let old = User::new(Uuid::new_v4(), "a", false);
        let mut new = old.clone();
        assert_eq!(old.diff(&new), None);
        new.name = "b".into();
        let patch = old.diff(&new).expect("changed");
        assert_eq!(patch.name.as_deref(), Some("b"));
        assert!(patch.properties.is_none());
    }
}
