//! MRE sync core
//!
//! Keeps a remote-authored 3D scene consistent between a mixed reality
//! extension app and this client: session protocol, typed command dispatch,
//! sparse patches, and rigid-body ownership prediction.
//!
//! ## Architecture
//!
//! ```text
//! MreApp  (app.rs)                         ← one tick: (a) inbound (b) dispatch (c) physics (d) outbound
//!   ├── Session  (connection/)             ← permissions, transport, Handshake → Sync → Execution
//!   ├── CommandDispatcher  (dispatch.rs)   ← tag → handler, per context
//!   └── SyncState
//!         ├── ActorManager  (actor/)       ← live + pending actors, outbound diffs
//!         ├── UserManager   (user.rs)
//!         ├── AssetManager  (asset.rs)
//!         ├── PhysicsBridge (physics/)     ← snapshots, ownership prediction
//!         └── SceneRoot     (scene.rs)     ← host engine
//! ```
//!
//! Patches (`patch/`) and animation tracks (`animation/`) are leaf modules
//! used by the entity managers. Wire payloads live in `protocol/`.

pub mod actor;
pub mod animation;
pub mod app;
pub mod asset;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod events;
pub mod patch;
pub mod physics;
pub mod protocol;
pub mod scene;
pub mod types;
pub mod user;

pub use actor::{Actor, ActorManager};
pub use app::{AppError, MreApp, SyncState, TickReport, UserJoin};
pub use config::{ConfigError, MreConfig};
pub use connection::{Session, SessionState};
pub use dispatch::{CommandDispatcher, DispatchError};
pub use events::{EventQueue, LifecycleEvent};
pub use patch::{generate, Patch, Patchable};
pub use physics::{OwnershipPredictor, PhysicsBridge, PredictionConfig};
pub use protocol::{Message, PayloadRegistry, PayloadType};
pub use scene::SceneRoot;
pub use types::{ActorId, Color, Quat, SyncStats, Transform, UserId, Vec2, Vec3};
pub use user::{obfuscate_user_id, UserManager};
