use std::sync::Arc;

use bitflags::bitflags;
use futures::future::BoxFuture;
use log::warn;
use parking_lot::Mutex;

bitflags! {
    /// Capabilities an app may ask the host for.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
    pub struct Permissions: u32 {
        /// Run at all. Always required.
        const EXECUTION = 1;
        /// Stable user ids across apps.
        const USER_TRACKING = 1 << 1;
        const USER_INTERACTION = 1 << 2;
    }
}

impl Permissions {
    /// Flag for a manifest permission name.
    pub fn from_manifest_name(name: &str) -> Option<Permissions> {
        match name {
            "execution" => Some(Permissions::EXECUTION),
            "user-tracking" => Some(Permissions::USER_TRACKING),
            "user-interaction" => Some(Permissions::USER_INTERACTION),
            _ => None,
        }
    }

    /// Union of the named flags. Unknown names are skipped.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Permissions {
        names.iter().fold(Permissions::empty(), |acc, name| {
            match Permissions::from_manifest_name(name.as_ref()) {
                Some(flag) => acc | flag,
                None => {
                    warn!("Ignoring unknown permission '{}'", name.as_ref());
                    acc
                }
            }
        })
    }
}

/// Host-side permission decision.
///
/// `request` may suspend for as long as the user takes to answer a prompt.
/// The session discards the answer if a newer connection attempt has started
/// in the meantime.
pub trait PermissionManager: Send + Sync {
    fn request(
        &self,
        origin: String,
        required: Permissions,
        optional: Permissions,
    ) -> BoxFuture<'static, Permissions>;
}

/// Grants a fixed set regardless of origin. The set can be changed at
/// runtime, after which the host calls `Session::on_permission_changed`.
#[derive(Debug, Clone)]
pub struct StaticPermissionManager {
    granted: Arc<Mutex<Permissions>>,
}

impl StaticPermissionManager {
    pub fn new(granted: Permissions) -> Self {
        Self {
            granted: Arc::new(Mutex::new(granted)),
        }
    }

    pub fn set_granted(&self, granted: Permissions) {
        *self.granted.lock() = granted;
    }

    pub fn granted(&self) -> Permissions {
        *self.granted.lock()
    }
}

impl PermissionManager for StaticPermissionManager {
    fn request(
        &self,
        _origin: String,
        required: Permissions,
        optional: Permissions,
    ) -> BoxFuture<'static, Permissions> {
        let granted = self.granted() & (required | optional);
        Box::pin(async move { granted })
    }
}
