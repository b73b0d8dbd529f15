//! Rigid-body synchronization and ownership prediction.
//!
//! ```text
//! PhysicsBridge  (bridge.rs)
//!   ├── SnapshotBuffer      (buffer.rs)     ← received snapshots, interpolated targets
//!   ├── OwnershipPredictor  (prediction.rs) ← key-framed vs. dynamic, per remote body
//!   └── ContactQuery        (contact.rs)    ← contact points for owned × remote pairs
//! ```
//!
//! Snapshots travel as a flat binary buffer (see [`snapshot`]) wrapped in a
//! `physics-bridge-update` payload.

pub mod bridge;
pub mod buffer;
pub mod contact;
pub mod prediction;
pub mod snapshot;

pub use bridge::{BodyState, PhysicsBridge};
pub use buffer::{RemoteTarget, SnapshotBuffer};
pub use contact::{BoundsContactQuery, ContactPoints, ContactQuery};
pub use prediction::{CollisionMonitorInfo, OwnershipPredictor, PredictionConfig};
pub use snapshot::{
    decode_transforms, encode_transforms, MotionType, RigidBodyTransform, Snapshot,
    SnapshotError, SnapshotFlags, BYTES_PER_BODY,
};
