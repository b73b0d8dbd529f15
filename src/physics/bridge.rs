//! PhysicsBridge – rigid bodies shared with the remote app.

use std::collections::HashMap;

use log::{debug, warn};

use super::buffer::SnapshotBuffer;
use super::contact::{BoundsContactQuery, ContactQuery};
use super::prediction::{OwnershipPredictor, PredictionConfig};
use super::snapshot::{MotionType, RigidBodyTransform, Snapshot, SnapshotError, SnapshotFlags};
use crate::protocol::PhysicsBridgeUpdate;
use crate::types::{ActorId, Quat, Transform, Vec3};

// ---------------------------------------------------------------------------
// BodyState
// ---------------------------------------------------------------------------

/// One rigid body as the local simulation sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyState {
    pub id: ActorId,
    /// Simulated here and reported to the app.
    pub owned: bool,
    /// Pose is dictated by the body's owner.
    pub keyframed: bool,
    /// Remote body currently handed to the local simulation.
    pub dynamic: bool,
    pub sleeping: bool,
    pub position: Vec3,
    pub rotation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Half size of the world-aligned bounds.
    pub half_extents: Vec3,
}

impl BodyState {
    pub fn new(id: ActorId, owned: bool) -> Self {
        Self {
            id,
            owned,
            keyframed: false,
            dynamic: owned,
            sleeping: false,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            half_extents: Vec3::ZERO,
        }
    }

    pub fn pose(&self) -> Transform {
        Transform {
            position: self.position,
            rotation: self.rotation,
        }
    }

    /// Pin to `target` with no motion.
    pub fn snap_to(&mut self, target: &Transform) {
        self.position = target.position;
        self.rotation = target.rotation;
        self.linear_velocity = Vec3::ZERO;
        self.angular_velocity = Vec3::ZERO;
        self.dynamic = false;
    }

    fn motion_type(&self) -> MotionType {
        if self.sleeping {
            MotionType::Sleeping
        } else if self.keyframed {
            MotionType::Keyframed
        } else {
            MotionType::Dynamic
        }
    }
}

// ---------------------------------------------------------------------------
// PhysicsBridge
// ---------------------------------------------------------------------------

pub struct PhysicsBridge {
    bodies: HashMap<ActorId, BodyState>,
    buffer: SnapshotBuffer,
    predictor: OwnershipPredictor,
    contacts: Box<dyn ContactQuery + Send>,
    /// Time at which remote targets are sampled.
    playback_time: Option<f32>,
    local_time: f32,
}

impl PhysicsBridge {
    pub fn new(config: PredictionConfig) -> Self {
        Self {
            bodies: HashMap::new(),
            buffer: SnapshotBuffer::default(),
            predictor: OwnershipPredictor::new(config),
            contacts: Box::new(BoundsContactQuery),
            playback_time: None,
            local_time: 0.0,
        }
    }

    pub fn with_contact_query(mut self, contacts: impl ContactQuery + Send + 'static) -> Self {
        self.contacts = Box::new(contacts);
        self
    }

    // -----------------------------------------------------------------------
    // Bodies
    // -----------------------------------------------------------------------

    pub fn add_body(&mut self, body: BodyState) {
        debug!("Body {} registered (owned: {})", body.id, body.owned);
        self.bodies.insert(body.id, body);
    }

    pub fn remove_body(&mut self, id: ActorId) -> Option<BodyState> {
        self.predictor.forget(id);
        self.bodies.remove(&id)
    }

    pub fn body(&self, id: ActorId) -> Option<&BodyState> {
        self.bodies.get(&id)
    }

    /// Mutable access for the host simulation to write back its results.
    pub fn body_mut(&mut self, id: ActorId) -> Option<&mut BodyState> {
        self.bodies.get_mut(&id)
    }

    pub fn bodies(&self) -> impl Iterator<Item = &BodyState> {
        self.bodies.values()
    }

    /// Hand a body to (or take it from) the local simulation.
    pub fn set_owned(&mut self, id: ActorId, owned: bool) -> bool {
        let Some(body) = self.bodies.get_mut(&id) else {
            return false;
        };
        body.owned = owned;
        body.dynamic = owned;
        if owned {
            self.predictor.forget(id);
        }
        true
    }

    pub fn predictor(&self) -> &OwnershipPredictor {
        &self.predictor
    }

    pub fn buffer(&self) -> &SnapshotBuffer {
        &self.buffer
    }

    // -----------------------------------------------------------------------
    // Inbound
    // -----------------------------------------------------------------------

    pub fn receive(&mut self, snapshot: Snapshot) {
        if snapshot.flags.contains(SnapshotFlags::RESET_JITTER_BUFFER) {
            self.playback_time = None;
        }
        self.buffer.push(snapshot);
    }

    /// Decode and buffer a `physics-bridge-update`. A malformed buffer is
    /// rejected whole.
    pub fn receive_payload(&mut self, payload: &PhysicsBridgeUpdate) -> Result<(), SnapshotError> {
        let snapshot = Snapshot::from_payload(payload).inspect_err(|e| {
            warn!("Dropping physics update at t={}: {}", payload.time, e);
        })?;
        self.receive(snapshot);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance playback by `dt` and run ownership prediction.
    pub fn step(&mut self, dt: f32) {
        self.local_time += dt;

        let targets = match (self.buffer.earliest_time(), self.buffer.latest_time()) {
            (Some(earliest), Some(latest)) => {
                let t = match self.playback_time {
                    None => latest,
                    Some(t) => (t + dt).clamp(earliest, latest),
                };
                self.playback_time = Some(t);
                self.buffer.sample(t)
            }
            _ => HashMap::new(),
        };

        self.predictor
            .step(&mut self.bodies, &targets, dt, self.contacts.as_ref());
    }

    // -----------------------------------------------------------------------
    // Outbound
    // -----------------------------------------------------------------------

    /// Snapshot of every owned body, or `None` if nothing is owned.
    ///
    /// When all owned bodies sleep the snapshot is flagged `NO_UPDATE` and
    /// carries no transforms.
    pub fn outbound_snapshot(&self) -> Option<Snapshot> {
        let owned: Vec<&BodyState> = self.bodies.values().filter(|b| b.owned).collect();
        if owned.is_empty() {
            return None;
        }
        if owned.iter().all(|b| b.sleeping) {
            return Some(Snapshot::new(
                self.local_time,
                SnapshotFlags::NO_UPDATE,
                Vec::new(),
            ));
        }
        let transforms = owned
            .iter()
            .map(|b| RigidBodyTransform {
                id: b.id,
                motion_type: b.motion_type(),
                transform: b.pose(),
            })
            .collect();
        Some(Snapshot::new(self.local_time, SnapshotFlags::empty(), transforms))
    }

    pub fn clear(&mut self) {
        self.bodies.clear();
        self.buffer.clear();
        self.predictor.clear();
        self.playback_time = None;
        self.local_time = 0.0;
    }
}
