//! Built-in payload types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::registry::PayloadType;
use crate::patch::{ActorPatch, MaterialPatch, TransformPatch};
use crate::types::ActorId;
use crate::user::UserPatch;

// ---------------------------------------------------------------------------
// Handler contexts
// ---------------------------------------------------------------------------

/// Consumed by the session's sub-protocols, never dispatched.
pub const PROTOCOL_CONTEXT: &str = "protocol";
pub const APP_CONTEXT: &str = "app";
pub const ACTORS_CONTEXT: &str = "actors";
pub const USERS_CONTEXT: &str = "users";
pub const ASSETS_CONTEXT: &str = "assets";
pub const PHYSICS_CONTEXT: &str = "physics";

// ---------------------------------------------------------------------------
// Handshake / sync / heartbeat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperatingModel {
    /// The remote app is authoritative for every actor.
    #[default]
    ServerAuthoritative,
    /// Clients own and report the bodies they simulate.
    PeerAuthoritative,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Handshake {}

impl PayloadType for Handshake {
    const TAG: &'static str = "handshake";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeReply {
    pub session_id: String,
    #[serde(default)]
    pub operating_model: OperatingModel,
}

impl PayloadType for HandshakeReply {
    const TAG: &'static str = "handshake-reply";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandshakeComplete {}

impl PayloadType for HandshakeComplete {
    const TAG: &'static str = "handshake-complete";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncRequest {}

impl PayloadType for SyncRequest {
    const TAG: &'static str = "sync-request";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncComplete {}

impl PayloadType for SyncComplete {
    const TAG: &'static str = "sync-complete";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Heartbeat {
    /// Sender's clock in milliseconds, echoed back in the reply.
    #[serde(default)]
    pub server_time: u64,
}

impl PayloadType for Heartbeat {
    const TAG: &'static str = "heartbeat";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatReply {
    #[serde(default)]
    pub server_time: u64,
}

impl PayloadType for HeartbeatReply {
    const TAG: &'static str = "heartbeat-reply";
}

// ---------------------------------------------------------------------------
// Actors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateActor {
    pub actor: ActorPatch,
}

impl PayloadType for CreateActor {
    const TAG: &'static str = "create-actor";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorUpdate {
    pub actor: ActorPatch,
}

impl PayloadType for ActorUpdate {
    const TAG: &'static str = "actor-update";

    fn target_actor(&self) -> Option<ActorId> {
        Some(self.actor.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestroyActors {
    pub actor_ids: Vec<ActorId>,
}

impl PayloadType for DestroyActors {
    const TAG: &'static str = "destroy-actors";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBehavior {
    pub actor_id: ActorId,
    /// `None` removes the behavior.
    pub behavior_type: Option<String>,
}

impl PayloadType for SetBehavior {
    const TAG: &'static str = "set-behavior";

    fn target_actor(&self) -> Option<ActorId> {
        Some(self.actor_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResultCode {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub result_code: ResultCode,
    #[serde(default)]
    pub message: String,
}

impl OperationResult {
    pub fn success() -> Self {
        Self {
            result_code: ResultCode::Success,
            message: String::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            result_code: ResultCode::Error,
            message: message.into(),
        }
    }
}

/// Acknowledges a `create-actor`, carrying the spawned actors' full state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSpawned {
    pub result: OperationResult,
    pub actors: Vec<ActorPatch>,
}

impl PayloadType for ObjectSpawned {
    const TAG: &'static str = "object-spawned";
}

/// Client-simulated app-space transform of an actor it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorCorrection {
    pub actor_id: ActorId,
    pub app_transform: TransformPatch,
}

impl PayloadType for ActorCorrection {
    const TAG: &'static str = "actor-correction";

    fn target_actor(&self) -> Option<ActorId> {
        Some(self.actor_id)
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserJoined {
    pub user: UserPatch,
}

impl PayloadType for UserJoined {
    const TAG: &'static str = "user-joined";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLeft {
    pub user_id: Uuid,
}

impl PayloadType for UserLeft {
    const TAG: &'static str = "user-left";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserUpdate {
    pub user: UserPatch,
}

impl PayloadType for UserUpdate {
    const TAG: &'static str = "user-update";
}

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAsset {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<MaterialPatch>,
}

impl PayloadType for CreateAsset {
    const TAG: &'static str = "create-asset";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetUpdate {
    pub id: Uuid,
    pub material: MaterialPatch,
}

impl PayloadType for AssetUpdate {
    const TAG: &'static str = "asset-update";
}

// ---------------------------------------------------------------------------
// Physics
// ---------------------------------------------------------------------------

/// A batch of rigid-body transforms.
///
/// `transforms` is the base64 of the binary snapshot encoding; `flags` holds
/// the raw `SnapshotFlags` bits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsBridgeUpdate {
    pub time: f32,
    #[serde(default)]
    pub flags: u8,
    #[serde(default)]
    pub transforms: String,
}

impl PayloadType for PhysicsBridgeUpdate {
    const TAG: &'static str = "physics-bridge-update";
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraceSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub severity: TraceSeverity,
    pub message: String,
}

impl PayloadType for Trace {
    const TAG: &'static str = "trace";
}
