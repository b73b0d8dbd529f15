//! Connection and session protocol.
//!
//! ```text
//! Session  (session.rs)
//!   ├── ManifestLoader     (manifest.rs)    ← permissions the app asks for
//!   ├── PermissionManager  (permissions.rs) ← host's grant decision
//!   ├── Transport          (transport.rs)   ← full-duplex frames
//!   └── SubProtocol        (protocols.rs)   ← Handshake → Sync → Execution
//! ```
//!
//! ## States
//!
//! | State                  | Meaning                                           |
//! |------------------------|---------------------------------------------------|
//! | `Stopped`              | nothing in flight                                 |
//! | `WaitingForPermission` | manifest download / permission prompt running     |
//! | `Starting`             | transport open, handshake or sync in progress     |
//! | `Running`              | execution sub-protocol active                     |
//!
//! The manifest download and permission prompt run as a spawned task. Its
//! result is marshalled back through a channel and only applied if it still
//! belongs to the current connection generation.

pub mod error;
pub mod manifest;
pub mod permissions;
pub mod protocols;
pub mod session;
pub mod transport;

pub use error::{ManifestError, SessionError, TransportError};
#[cfg(feature = "http")]
pub use manifest::HttpManifestLoader;
pub use manifest::{manifest_url, permission_origin, Manifest, ManifestLoader, StaticManifestLoader};
pub use permissions::{PermissionManager, Permissions, StaticPermissionManager};
pub use protocols::SubProtocol;
pub use session::{SendOutcome, Session, SessionState};
pub use transport::{
    ConnectHeaders, Frame, LoopbackPeer, LoopbackTransport, Transport, TransportEvent,
};
