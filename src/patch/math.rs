//! Patches for vectors, quaternions, colors and transforms.

use serde::{Deserialize, Serialize};

use super::{apply_nested, apply_value, diff_value, non_empty, Patch, Patchable};
use crate::types::{ActorTransform, Color, Quat, ScaledTransform, Transform, Vec2, Vec3};

// ---------------------------------------------------------------------------
// Vector2
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vector2Patch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
}

impl Patch for Vector2Patch {
    fn is_patched(&self) -> bool {
        self.x.is_some() || self.y.is_some()
    }
}

impl Patchable for Vec2 {
    type Patch = Vector2Patch;

    fn apply_patch(&mut self, patch: &Vector2Patch) {
        apply_value(&mut self.x, &patch.x);
        apply_value(&mut self.y, &patch.y);
    }

    fn diff(&self, newer: &Self) -> Option<Vector2Patch> {
        non_empty(Vector2Patch {
            x: diff_value(&self.x, &newer.x),
            y: diff_value(&self.y, &newer.y),
        })
    }

    fn to_full_patch(&self) -> Vector2Patch {
        Vector2Patch {
            x: Some(self.x),
            y: Some(self.y),
        }
    }
}

// ---------------------------------------------------------------------------
// Vector3
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vector3Patch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z: Option<f32>,
}

impl Vector3Patch {
    pub fn from_vec3(v: Vec3) -> Self {
        v.to_full_patch()
    }
}

impl Patch for Vector3Patch {
    fn is_patched(&self) -> bool {
        self.x.is_some() || self.y.is_some() || self.z.is_some()
    }
}

impl Patchable for Vec3 {
    type Patch = Vector3Patch;

    fn apply_patch(&mut self, patch: &Vector3Patch) {
        apply_value(&mut self.x, &patch.x);
        apply_value(&mut self.y, &patch.y);
        apply_value(&mut self.z, &patch.z);
    }

    fn diff(&self, newer: &Self) -> Option<Vector3Patch> {
        non_empty(Vector3Patch {
            x: diff_value(&self.x, &newer.x),
            y: diff_value(&self.y, &newer.y),
            z: diff_value(&self.z, &newer.z),
        })
    }

    fn to_full_patch(&self) -> Vector3Patch {
        Vector3Patch {
            x: Some(self.x),
            y: Some(self.y),
            z: Some(self.z),
        }
    }
}

// ---------------------------------------------------------------------------
// Quaternion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuaternionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w: Option<f32>,
}

impl QuaternionPatch {
    pub fn from_quat(q: Quat) -> Self {
        q.to_full_patch()
    }
}

impl Patch for QuaternionPatch {
    fn is_patched(&self) -> bool {
        self.x.is_some() || self.y.is_some() || self.z.is_some() || self.w.is_some()
    }
}

impl Patchable for Quat {
    type Patch = QuaternionPatch;

    fn apply_patch(&mut self, patch: &QuaternionPatch) {
        let [mut x, mut y, mut z, mut w] = self.to_array();
        apply_value(&mut x, &patch.x);
        apply_value(&mut y, &patch.y);
        apply_value(&mut z, &patch.z);
        apply_value(&mut w, &patch.w);
        *self = Quat::from_xyzw(x, y, z, w);
    }

    fn diff(&self, newer: &Self) -> Option<QuaternionPatch> {
        non_empty(QuaternionPatch {
            x: diff_value(&self.x, &newer.x),
            y: diff_value(&self.y, &newer.y),
            z: diff_value(&self.z, &newer.z),
            w: diff_value(&self.w, &newer.w),
        })
    }

    fn to_full_patch(&self) -> QuaternionPatch {
        QuaternionPatch {
            x: Some(self.x),
            y: Some(self.y),
            z: Some(self.z),
            w: Some(self.w),
        }
    }
}

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub g: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub b: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub a: Option<f32>,
}

impl Patch for ColorPatch {
    fn is_patched(&self) -> bool {
        self.r.is_some() || self.g.is_some() || self.b.is_some() || self.a.is_some()
    }
}

impl Patchable for Color {
    type Patch = ColorPatch;

    fn apply_patch(&mut self, patch: &ColorPatch) {
        apply_value(&mut self.r, &patch.r);
        apply_value(&mut self.g, &patch.g);
        apply_value(&mut self.b, &patch.b);
        apply_value(&mut self.a, &patch.a);
    }

    fn diff(&self, newer: &Self) -> Option<ColorPatch> {
        non_empty(ColorPatch {
            r: diff_value(&self.r, &newer.r),
            g: diff_value(&self.g, &newer.g),
            b: diff_value(&self.b, &newer.b),
            a: diff_value(&self.a, &newer.a),
        })
    }

    fn to_full_patch(&self) -> ColorPatch {
        ColorPatch {
            r: Some(self.r),
            g: Some(self.g),
            b: Some(self.b),
            a: Some(self.a),
        }
    }
}

// ---------------------------------------------------------------------------
// Transforms
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Vector3Patch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<QuaternionPatch>,
}

impl Patch for TransformPatch {
    fn is_patched(&self) -> bool {
        self.position.is_some() || self.rotation.is_some()
    }
}

impl Patchable for Transform {
    type Patch = TransformPatch;

    fn apply_patch(&mut self, patch: &TransformPatch) {
        apply_nested(&mut self.position, &patch.position);
        apply_nested(&mut self.rotation, &patch.rotation);
    }

    fn diff(&self, newer: &Self) -> Option<TransformPatch> {
        non_empty(TransformPatch {
            position: self.position.diff(&newer.position),
            rotation: self.rotation.diff(&newer.rotation),
        })
    }

    fn to_full_patch(&self) -> TransformPatch {
        TransformPatch {
            position: Some(self.position.to_full_patch()),
            rotation: Some(self.rotation.to_full_patch()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaledTransformPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Vector3Patch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<QuaternionPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<Vector3Patch>,
}

impl Patch for ScaledTransformPatch {
    fn is_patched(&self) -> bool {
        self.position.is_some() || self.rotation.is_some() || self.scale.is_some()
    }
}

impl Patchable for ScaledTransform {
    type Patch = ScaledTransformPatch;

    fn apply_patch(&mut self, patch: &ScaledTransformPatch) {
        apply_nested(&mut self.position, &patch.position);
        apply_nested(&mut self.rotation, &patch.rotation);
        apply_nested(&mut self.scale, &patch.scale);
    }

    fn diff(&self, newer: &Self) -> Option<ScaledTransformPatch> {
        non_empty(ScaledTransformPatch {
            position: self.position.diff(&newer.position),
            rotation: self.rotation.diff(&newer.rotation),
            scale: self.scale.diff(&newer.scale),
        })
    }

    fn to_full_patch(&self) -> ScaledTransformPatch {
        ScaledTransformPatch {
            position: Some(self.position.to_full_patch()),
            rotation: Some(self.rotation.to_full_patch()),
            scale: Some(self.scale.to_full_patch()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorTransformPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<ScaledTransformPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<TransformPatch>,
}

impl Patch for ActorTransformPatch {
    fn is_patched(&self) -> bool {
        self.local.is_some() || self.app.is_some()
    }
}

impl Patchable for ActorTransform {
    type Patch = ActorTransformPatch;

    fn apply_patch(&mut self, patch: &ActorTransformPatch) {
        apply_nested(&mut self.local, &patch.local);
        apply_nested(&mut self.app, &patch.app);
    }

    fn diff(&self, newer: &Self) -> Option<ActorTransformPatch> {
        non_empty(ActorTransformPatch {
            local: self.local.diff(&newer.local),
            app: self.app.diff(&newer.app),
        })
    }

    fn to_full_patch(&self) -> ActorTransformPatch {
        ActorTransformPatch {
            local: Some(self.local.to_full_patch()),
            app: Some(self.app.to_full_patch()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::generate;

    #[test]
    fn unchanged_vector_produces_no_patch() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(v.diff(&v), None);
    }

    #[test]
    fn single_axis_change_carries_single_axis() {
        let old = Vec3::new(1.0, 2.0, 3.0);
        let new = Vec3::new(1.0, 5.0, 3.0);
        assert_eq!(
            old.diff(&new),
            Some(Vector3Patch {
                x: None,
                y: Some(5.0),
                z: None
            })
        );
    }

    #[test]
    fn first_patch_is_fully_populated() {
        let t = ActorTransform::default();
        let patch = generate(None, &t).expect("full patch");
        let local = patch.local.expect("local");
        assert!(local.position.is_some() && local.rotation.is_some() && local.scale.is_some());
        assert!(patch.app.is_some());
    }

    #[test]
    fn partial_quaternion_patch_leaves_other_components() {
        let mut q = Quat::from_xyzw(0.1, 0.2, 0.3, 0.9);
        q.apply_patch(&QuaternionPatch {
            w: Some(0.5),
            ..Default::default()
        });
        assert_eq!(q.to_array(), [0.1, 0.2, 0.3, 0.5]);
    }

    #[test]
    fn nested_transform_patch_serializes_sparsely() {
        let patch = TransformPatch {
            position: Some(Vector3Patch {
                z: Some(2.0),
                ..Default::default()
            }),
            rotation: None,
        };
        let json = serde_json::to_value(&patch).expect("serialize");
        assert_eq!(json, serde_json::json!({ "position": { "z": 2.0 } }));
    }
}
