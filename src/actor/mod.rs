//! Actors: nodes of the synchronized scene graph.

mod manager;

pub use manager::{ActorCommand, ActorManager, CommandStatus, CreateOutcome};

use uuid::Uuid;

use crate::patch::{
    apply_component, apply_nested, apply_value, diff_component, diff_value, ActorPatch,
    Appearance, Collider, Patch, Patchable, RigidBody, Text,
};
use crate::types::{ActorId, ActorTransform};

#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub id: ActorId,
    pub parent_id: Option<ActorId>,
    pub name: String,
    /// Only this user sees the actor.
    pub exclusive_to_user: Option<Uuid>,
    /// User whose client simulates this actor's rigid body.
    pub owner: Option<Uuid>,
    pub transform: ActorTransform,
    pub appearance: Option<Appearance>,
    pub rigid_body: Option<RigidBody>,
    pub collider: Option<Collider>,
    pub text: Option<Text>,
    pub grabbable: bool,
    pub subscriptions: Vec<String>,
    pub behavior: Option<String>,
}

impl Actor {
    pub fn new(id: ActorId) -> Self {
        Self {
            id,
            parent_id: None,
            name: String::new(),
            exclusive_to_user: None,
            owner: None,
            transform: ActorTransform::default(),
            appearance: None,
            rigid_body: None,
            collider: None,
            text: None,
            grabbable: false,
            subscriptions: Vec::new(),
            behavior: None,
        }
    }

    /// Actor built from a creation patch.
    pub fn from_patch(patch: &ActorPatch) -> Self {
        let mut actor = Actor::new(patch.id);
        actor.apply_patch(patch);
        actor
    }
}

/// The wire uses the nil id for "none".
fn from_wire(id: Uuid) -> Option<Uuid> {
    (!id.is_nil()).then_some(id)
}

fn to_wire(id: Option<Uuid>) -> Uuid {
    id.unwrap_or_else(Uuid::nil)
}

fn diff_link(old: &Option<Uuid>, new: &Option<Uuid>) -> Option<Uuid> {
    diff_value(old, new).map(to_wire)
}

impl Patchable for Actor {
    type Patch = ActorPatch;

    fn apply_patch(&mut self, patch: &ActorPatch) {
        if let Some(p) = patch.parent_id {
            self.parent_id = from_wire(p);
        }
        apply_value(&mut self.name, &patch.name);
        if let Some(u) = patch.exclusive_to_user {
            self.exclusive_to_user = from_wire(u);
        }
        if let Some(o) = patch.owner {
            self.owner = from_wire(o);
        }
        apply_nested(&mut self.transform, &patch.transform);
        apply_component(&mut self.appearance, &patch.appearance);
        apply_component(&mut self.rigid_body, &patch.rigid_body);
        apply_component(&mut self.collider, &patch.collider);
        apply_component(&mut self.text, &patch.text);
        apply_value(&mut self.grabbable, &patch.grabbable);
        apply_value(&mut self.subscriptions, &patch.subscriptions);
    }

    fn diff(&self, newer: &Self) -> Option<ActorPatch> {
        let patch = ActorPatch {
            id: newer.id,
            parent_id: diff_link(&self.parent_id, &newer.parent_id),
            name: diff_value(&self.name, &newer.name),
            exclusive_to_user: diff_link(&self.exclusive_to_user, &newer.exclusive_to_user),
            owner: diff_link(&self.owner, &newer.owner),
            transform: self.transform.diff(&newer.transform),
            appearance: diff_component(&self.appearance, &newer.appearance),
            rigid_body: diff_component(&self.rigid_body, &newer.rigid_body),
            collider: diff_component(&self.collider, &newer.collider),
            text: diff_component(&self.text, &newer.text),
            grabbable: diff_value(&self.grabbable, &newer.grabbable),
            subscriptions: diff_value(&self.subscriptions, &newer.subscriptions),
        };
        patch.is_patched().then_some(patch)
    }

    fn to_full_patch(&self) -> ActorPatch {
        ActorPatch {
            id: self.id,
            parent_id: Some(to_wire(self.parent_id)),
            name: Some(self.name.clone()),
            exclusive_to_user: Some(to_wire(self.exclusive_to_user)),
            owner: Some(to_wire(self.owner)),
            transform: Some(self.transform.to_full_patch()),
            appearance: self.appearance.as_ref().map(Patchable::to_full_patch),
            rigid_body: self.rigid_body.as_ref().map(Patchable::to_full_patch),
            collider: self.collider.as_ref().map(Patchable::to_full_patch),
            text: self.text.as_ref().map(Patchable::to_full_patch),
            grabbable: Some(self.grabbable),
            subscriptions: Some(self.subscriptions.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{generate, RigidBodyPatch};
    use crate::types::Vec3;

    #[test]
    fn full_patch_rebuilds_actor() {
        let mut actor = Actor::new(Uuid::new_v4());
        actor.name = "crate".into();
        actor.parent_id = Some(Uuid::new_v4());
        actor.transform.local.position = Vec3::new(0.0, 1.0, 0.0);
        actor.rigid_body = Some(RigidBody::default());

        let patch = generate(None, &actor).expect("full");
        assert_eq!(Actor::from_patch(&patch), actor);
    }

    #[test]
    fn unchanged_actor_yields_nothing() {
        let actor = Actor::new(Uuid::new_v4());
        assert_eq!(generate(Some(&actor), &actor), None);
    }

    #[test]
    fn cleared_parent_travels_as_nil() {
        let mut old = Actor::new(Uuid::new_v4());
        old.parent_id = Some(Uuid::new_v4());
        let mut new = old.clone();
        new.parent_id = None;
        let patch = old.diff(&new).expect("changed");
        assert_eq!(patch.parent_id, Some(Uuid::nil()));

        old.apply_patch(&patch);
        assert_eq!(old.parent_id, None);
    }

    #[test]
    fn component_patch_creates_component() {
        let mut actor = Actor::new(Uuid::new_v4());
        let mut patch = ActorPatch::for_actor(actor.id);
        patch.rigid_body = Some(RigidBodyPatch {
            mass: Some(3.0),
            ..Default::default()
        });
        actor.apply_patch(&patch);
        let body = actor.rigid_body.expect("rigid body");
        assert_eq!(body.mass, 3.0);
        assert!(body.use_gravity);
    }
}
