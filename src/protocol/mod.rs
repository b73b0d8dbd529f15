//! Wire protocol between the client and the remote app.
//!
//! Every message is a JSON envelope carrying one typed payload:
//!
//! ```text
//! { "id": "<uuid>", "replyToId": "<uuid>"?, "payload": { "type": "<tag>", ... } }
//! ```
//!
//! ## Payload tags
//!
//! | Tag                     | Direction     | Default context |
//! |-------------------------|---------------|-----------------|
//! | `handshake`             | client → app  | `protocol`      |
//! | `handshake-reply`       | app → client  | `protocol`      |
//! | `handshake-complete`    | client → app  | `protocol`      |
//! | `sync-request`          | client → app  | `protocol`      |
//! | `sync-complete`         | app → client  | `protocol`      |
//! | `heartbeat`             | app → client  | `protocol`      |
//! | `heartbeat-reply`       | client → app  | `protocol`      |
//! | `create-actor`          | app → client  | `actors`        |
//! | `actor-update`          | both          | `actors`        |
//! | `destroy-actors`        | both          | `actors`        |
//! | `set-behavior`          | app → client  | `actors`        |
//! | `object-spawned`        | client → app  | `actors`        |
//! | `actor-correction`      | client → app  | `actors`        |
//! | `user-joined`           | client → app  | `users`         |
//! | `user-left`             | client → app  | `users`         |
//! | `user-update`           | app → client  | `users`         |
//! | `create-asset`          | app → client  | `assets`        |
//! | `asset-update`          | app → client  | `assets`        |
//! | `physics-bridge-update` | both          | `physics`       |
//! | `trace`                 | app → client  | `app`           |
//!
//! The tag → type mapping is an explicit [`PayloadRegistry`]. Plugins extend
//! it at runtime; a tag nobody registered is a hard error.

pub mod envelope;
pub mod error;
pub mod payloads;
pub mod registry;

pub use envelope::{Message, MessageHistory};
pub use error::ProtocolError;
pub use payloads::*;
pub use registry::{Payload, PayloadRegistry, PayloadType};
