use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::components::{AppearancePatch, ColliderPatch, RigidBodyPatch, TextPatch};
use super::math::ActorTransformPatch;
use super::Patch;
use crate::types::ActorId;

/// Sparse update of one actor. `id` is always present; every other field
/// travels only when it changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActorPatch {
    pub id: ActorId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ActorId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_to_user: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<ActorTransformPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appearance: Option<AppearancePatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rigid_body: Option<RigidBodyPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collider: Option<ColliderPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grabbable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscriptions: Option<Vec<String>>,
}

impl ActorPatch {
    /// Empty patch addressed to `id`.
    pub fn for_actor(id: ActorId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Parent named by this patch, treating the nil id as "no parent".
    pub fn parent(&self) -> Option<ActorId> {
        self.parent_id.filter(|p| !p.is_nil())
    }
}

impl Patch for ActorPatch {
    fn is_patched(&self) -> bool {
        self.parent_id.is_some()
            || self.name.is_some()
            || self.exclusive_to_user.is_some()
            || self.owner.is_some()
            || self.transform.is_some()
            || self.appearance.is_some()
            || self.rigid_body.is_some()
            || self.collider.is_some()
            || self.text.is_some()
            || self.grabbable.is_some()
            || self.subscriptions.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_alone_is_not_a_patch() {
        assert!(!ActorPatch::for_actor(Uuid::new_v4()).is_patched());
    }

    #[test]
    fn nil_parent_means_root() {
        let mut patch = ActorPatch::for_actor(Uuid::new_v4());
        patch.parent_id = Some(Uuid::nil());
        assert_eq!(patch.parent(), None);
    }

    #[test]
    fn wire_shape_omits_absent_fields() {
        let id = Uuid::new_v4();
        let mut patch = ActorPatch::for_actor(id);
        patch.name = Some("door".into());
        let json = serde_json::to_value(&patch).expect("serialize");
        assert_eq!(json, serde_json::json!({ "id": id, "name": "door" }));
    }
}
