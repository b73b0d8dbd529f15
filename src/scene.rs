//! Render-facing collaborator.
//!
//! The sync core never touches a scene graph directly. Every structural
//! change it applies is forwarded through a [`SceneRoot`], which the host
//! implements over its engine.

use std::any::Any;

use crate::actor::Actor;
use crate::asset::Asset;
use crate::patch::ActorPatch;
use crate::types::ActorId;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Host engine handle.
///
/// The `as_any` method enables downcasting from `Box<dyn SceneRoot>` to the
/// host's concrete type (e.g. [`RecordingScene`] in tests).
pub trait SceneRoot: Send {
    /// `actor` is placed in the scene graph: its parent, if any, exists.
    fn actor_created(&mut self, actor: &Actor);

    /// `patch` has been applied to `actor`.
    fn actor_updated(&mut self, actor: &Actor, patch: &ActorPatch);

    /// Children come before their parents.
    fn actors_destroyed(&mut self, ids: &[ActorId]);

    fn asset_changed(&mut self, _asset: &Asset) {}

    /// Downcast support (implement by returning `self`).
    fn as_any(&self) -> &dyn Any;
}

// ---------------------------------------------------------------------------
// Implementations
// ---------------------------------------------------------------------------

/// Discards everything. Used by headless hosts.
#[derive(Debug, Default)]
pub struct NullScene;

impl SceneRoot for NullScene {
    fn actor_created(&mut self, _actor: &Actor) {}

    fn actor_updated(&mut self, _actor: &Actor, _patch: &ActorPatch) {}

    fn actors_destroyed(&mut self, _ids: &[ActorId]) {}

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneChange {
    Created(ActorId),
    Updated(ActorId),
    Destroyed(ActorId),
    Asset(uuid::Uuid),
}

/// Keeps every change in order.
#[derive(Debug, Default)]
pub struct RecordingScene {
    pub changes: Vec<SceneChange>,
}

impl RecordingScene {
    pub fn created(&self) -> Vec<ActorId> {
        self.changes
            .iter()
            .filter_map(|c| match c {
                SceneChange::Created(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn destroyed(&self) -> Vec<ActorId> {
        self.changes
            .iter()
            .filter_map(|c| match c {
                SceneChange::Destroyed(id) => Some(*id),
                _ => None,
            })
            .collect()
    }
}

impl SceneRoot for RecordingScene {
    fn actor_created(&mut self, actor: &Actor) {
        self.changes.push(SceneChange::Created(actor.id));
    }

    fn actor_updated(&mut self, actor: &Actor, _patch: &ActorPatch) {
        self.changes.push(SceneChange::Updated(actor.id));
    }

    fn actors_destroyed(&mut self, ids: &[ActorId]) {
        self.changes
            .extend(ids.iter().copied().map(SceneChange::Destroyed));
    }

    fn asset_changed(&mut self, asset: &Asset) {
        self.changes.push(SceneChange::Asset(asset.id));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
