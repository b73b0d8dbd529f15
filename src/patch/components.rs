//! Optional actor components and their patches.
//!
//! | Component   | Patch             | Notes                                   |
//! |-------------|-------------------|-----------------------------------------|
//! | `RigidBody` | `RigidBodyPatch`  | velocities are nested vector patches    |
//! | `Text`      | `TextPatch`       | color is a nested color patch           |
//! | `Appearance`| `AppearancePatch` | tint color, material and mesh links     |
//! | `Material`  | `MaterialPatch`   | registered assets, not actor components |
//! | `Collider`  | `ColliderPatch`   | geometry is replaced as a whole         |

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::math::{ColorPatch, Vector2Patch, Vector3Patch};
use super::{apply_nested, apply_value, diff_value, non_empty, Patch, Patchable};
use crate::types::{Color, Vec2, Vec3};

// ---------------------------------------------------------------------------
// Rigid body
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionDetectionMode {
    #[default]
    Discrete,
    Continuous,
    ContinuousDynamic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RigidBody {
    pub enabled: bool,
    pub mass: f32,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    pub use_gravity: bool,
    pub is_kinematic: bool,
    pub detect_collisions: bool,
    pub collision_detection_mode: CollisionDetectionMode,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self {
            enabled: true,
            mass: 1.0,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            use_gravity: true,
            is_kinematic: false,
            detect_collisions: true,
            collision_detection_mode: CollisionDetectionMode::Discrete,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RigidBodyPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mass: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity: Option<Vector3Patch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angular_velocity: Option<Vector3Patch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_gravity: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_kinematic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detect_collisions: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collision_detection_mode: Option<CollisionDetectionMode>,
}

impl Patch for RigidBodyPatch {
    fn is_patched(&self) -> bool {
        self.enabled.is_some()
            || self.mass.is_some()
            || self.velocity.is_some()
            || self.angular_velocity.is_some()
            || self.use_gravity.is_some()
            || self.is_kinematic.is_some()
            || self.detect_collisions.is_some()
            || self.collision_detection_mode.is_some()
    }
}

impl Patchable for RigidBody {
    type Patch = RigidBodyPatch;

    fn apply_patch(&mut self, patch: &RigidBodyPatch) {
        apply_value(&mut self.enabled, &patch.enabled);
        apply_value(&mut self.mass, &patch.mass);
        apply_nested(&mut self.velocity, &patch.velocity);
        apply_nested(&mut self.angular_velocity, &patch.angular_velocity);
        apply_value(&mut self.use_gravity, &patch.use_gravity);
        apply_value(&mut self.is_kinematic, &patch.is_kinematic);
        apply_value(&mut self.detect_collisions, &patch.detect_collisions);
        apply_value(
            &mut self.collision_detection_mode,
            &patch.collision_detection_mode,
        );
    }

    fn diff(&self, newer: &Self) -> Option<RigidBodyPatch> {
        non_empty(RigidBodyPatch {
            enabled: diff_value(&self.enabled, &newer.enabled),
            mass: diff_value(&self.mass, &newer.mass),
            velocity: self.velocity.diff(&newer.velocity),
            angular_velocity: self.angular_velocity.diff(&newer.angular_velocity),
            use_gravity: diff_value(&self.use_gravity, &newer.use_gravity),
            is_kinematic: diff_value(&self.is_kinematic, &newer.is_kinematic),
            detect_collisions: diff_value(&self.detect_collisions, &newer.detect_collisions),
            collision_detection_mode: diff_value(
                &self.collision_detection_mode,
                &newer.collision_detection_mode,
            ),
        })
    }

    fn to_full_patch(&self) -> RigidBodyPatch {
        RigidBodyPatch {
            enabled: Some(self.enabled),
            mass: Some(self.mass),
            velocity: Some(self.velocity.to_full_patch()),
            angular_velocity: Some(self.angular_velocity.to_full_patch()),
            use_gravity: Some(self.use_gravity),
            is_kinematic: Some(self.is_kinematic),
            detect_collisions: Some(self.detect_collisions),
            collision_detection_mode: Some(self.collision_detection_mode),
        }
    }
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextAnchor {
    #[default]
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    MiddleCenter,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextJustify {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Text {
    pub enabled: bool,
    pub contents: String,
    pub height: f32,
    pub pixels_per_line: u32,
    pub anchor: TextAnchor,
    pub justify: TextJustify,
    pub color: Color,
}

impl Default for Text {
    fn default() -> Self {
        Self {
            enabled: true,
            contents: String::new(),
            height: 1.0,
            pixels_per_line: 50,
            anchor: TextAnchor::TopLeft,
            justify: TextJustify::Left,
            color: Color::WHITE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pixels_per_line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<TextAnchor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub justify: Option<TextJustify>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorPatch>,
}

impl Patch for TextPatch {
    fn is_patched(&self) -> bool {
        self.enabled.is_some()
            || self.contents.is_some()
            || self.height.is_some()
            || self.pixels_per_line.is_some()
            || self.anchor.is_some()
            || self.justify.is_some()
            || self.color.is_some()
    }
}

impl Patchable for Text {
    type Patch = TextPatch;

    fn apply_patch(&mut self, patch: &TextPatch) {
        apply_value(&mut self.enabled, &patch.enabled);
        apply_value(&mut self.contents, &patch.contents);
        apply_value(&mut self.height, &patch.height);
        apply_value(&mut self.pixels_per_line, &patch.pixels_per_line);
        apply_value(&mut self.anchor, &patch.anchor);
        apply_value(&mut self.justify, &patch.justify);
        apply_nested(&mut self.color, &patch.color);
    }

    fn diff(&self, newer: &Self) -> Option<TextPatch> {
        non_empty(TextPatch {
            enabled: diff_value(&self.enabled, &newer.enabled),
            contents: diff_value(&self.contents, &newer.contents),
            height: diff_value(&self.height, &newer.height),
            pixels_per_line: diff_value(&self.pixels_per_line, &newer.pixels_per_line),
            anchor: diff_value(&self.anchor, &newer.anchor),
            justify: diff_value(&self.justify, &newer.justify),
            color: self.color.diff(&newer.color),
        })
    }

    fn to_full_patch(&self) -> TextPatch {
        TextPatch {
            enabled: Some(self.enabled),
            contents: Some(self.contents.clone()),
            height: Some(self.height),
            pixels_per_line: Some(self.pixels_per_line),
            anchor: Some(self.anchor),
            justify: Some(self.justify),
            color: Some(self.color.to_full_patch()),
        }
    }
}

// ---------------------------------------------------------------------------
// Appearance
// ---------------------------------------------------------------------------

/// Render-facing links of an actor. A nil id means "none".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appearance {
    pub enabled: bool,
    pub color: Color,
    pub material_id: Uuid,
    pub mesh_id: Uuid,
}

impl Default for Appearance {
    fn default() -> Self {
        Self {
            enabled: true,
            color: Color::WHITE,
            material_id: Uuid::nil(),
            mesh_id: Uuid::nil(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppearancePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh_id: Option<Uuid>,
}

impl Patch for AppearancePatch {
    fn is_patched(&self) -> bool {
        self.enabled.is_some()
            || self.color.is_some()
            || self.material_id.is_some()
            || self.mesh_id.is_some()
    }
}

impl Patchable for Appearance {
    type Patch = AppearancePatch;

    fn apply_patch(&mut self, patch: &AppearancePatch) {
        apply_value(&mut self.enabled, &patch.enabled);
        apply_nested(&mut self.color, &patch.color);
        apply_value(&mut self.material_id, &patch.material_id);
        apply_value(&mut self.mesh_id, &patch.mesh_id);
    }

    fn diff(&self, newer: &Self) -> Option<AppearancePatch> {
        non_empty(AppearancePatch {
            enabled: diff_value(&self.enabled, &newer.enabled),
            color: self.color.diff(&newer.color),
            material_id: diff_value(&self.material_id, &newer.material_id),
            mesh_id: diff_value(&self.mesh_id, &newer.mesh_id),
        })
    }

    fn to_full_patch(&self) -> AppearancePatch {
        AppearancePatch {
            enabled: Some(self.enabled),
            color: Some(self.color.to_full_patch()),
            material_id: Some(self.material_id),
            mesh_id: Some(self.mesh_id),
        }
    }
}

// ---------------------------------------------------------------------------
// Material
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlphaMode {
    #[default]
    Opaque,
    Blend,
    Mask,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub color: Color,
    pub main_texture_id: Uuid,
    pub main_texture_offset: Vec2,
    pub main_texture_scale: Vec2,
    pub emissive_color: Color,
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            main_texture_id: Uuid::nil(),
            main_texture_offset: Vec2::ZERO,
            main_texture_scale: Vec2::ONE,
            emissive_color: Color::new(0.0, 0.0, 0.0, 1.0),
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MaterialPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_texture_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_texture_offset: Option<Vector2Patch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_texture_scale: Option<Vector2Patch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emissive_color: Option<ColorPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha_mode: Option<AlphaMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha_cutoff: Option<f32>,
}

impl Patch for MaterialPatch {
    fn is_patched(&self) -> bool {
        self.color.is_some()
            || self.main_texture_id.is_some()
            || self.main_texture_offset.is_some()
            || self.main_texture_scale.is_some()
            || self.emissive_color.is_some()
            || self.alpha_mode.is_some()
            || self.alpha_cutoff.is_some()
    }
}

impl Patchable for Material {
    type Patch = MaterialPatch;

    fn apply_patch(&mut self, patch: &MaterialPatch) {
        apply_nested(&mut self.color, &patch.color);
        apply_value(&mut self.main_texture_id, &patch.main_texture_id);
        apply_nested(&mut self.main_texture_offset, &patch.main_texture_offset);
        apply_nested(&mut self.main_texture_scale, &patch.main_texture_scale);
        apply_nested(&mut self.emissive_color, &patch.emissive_color);
        apply_value(&mut self.alpha_mode, &patch.alpha_mode);
        apply_value(&mut self.alpha_cutoff, &patch.alpha_cutoff);
    }

    fn diff(&self, newer: &Self) -> Option<MaterialPatch> {
        non_empty(MaterialPatch {
            color: self.color.diff(&newer.color),
            main_texture_id: diff_value(&self.main_texture_id, &newer.main_texture_id),
            main_texture_offset: self.main_texture_offset.diff(&newer.main_texture_offset),
            main_texture_scale: self.main_texture_scale.diff(&newer.main_texture_scale),
            emissive_color: self.emissive_color.diff(&newer.emissive_color),
            alpha_mode: diff_value(&self.alpha_mode, &newer.alpha_mode),
            alpha_cutoff: diff_value(&self.alpha_cutoff, &newer.alpha_cutoff),
        })
    }

    fn to_full_patch(&self) -> MaterialPatch {
        MaterialPatch {
            color: Some(self.color.to_full_patch()),
            main_texture_id: Some(self.main_texture_id),
            main_texture_offset: Some(self.main_texture_offset.to_full_patch()),
            main_texture_scale: Some(self.main_texture_scale.to_full_patch()),
            emissive_color: Some(self.emissive_color.to_full_patch()),
            alpha_mode: Some(self.alpha_mode),
            alpha_cutoff: Some(self.alpha_cutoff),
        }
    }
}

// ---------------------------------------------------------------------------
// Collider
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "kebab-case")]
pub enum ColliderGeometry {
    /// Derived from the actor's mesh bounds by the host.
    #[default]
    Auto,
    Sphere { center: Vec3, radius: f32 },
    Box { center: Vec3, size: Vec3 },
    Capsule { center: Vec3, size: Vec3 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collider {
    pub enabled: bool,
    pub is_trigger: bool,
    pub geometry: ColliderGeometry,
}

impl Default for Collider {
    fn default() -> Self {
        Self {
            enabled: true,
            is_trigger: false,
            geometry: ColliderGeometry::Auto,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColliderPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_trigger: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<ColliderGeometry>,
}

impl Patch for ColliderPatch {
    fn is_patched(&self) -> bool {
        self.enabled.is_some() || self.is_trigger.is_some() || self.geometry.is_some()
    }
}

impl Patchable for Collider {
    type Patch = ColliderPatch;

    fn apply_patch(&mut self, patch: &ColliderPatch) {
        apply_value(&mut self.enabled, &patch.enabled);
        apply_value(&mut self.is_trigger, &patch.is_trigger);
        apply_value(&mut self.geometry, &patch.geometry);
    }

    fn diff(&self, newer: &Self) -> Option<ColliderPatch> {
        non_empty(ColliderPatch {
            enabled: diff_value(&self.enabled, &newer.enabled),
            is_trigger: diff_value(&self.is_trigger, &newer.is_trigger),
            geometry: diff_value(&self.geometry, &newer.geometry),
        })
    }

    fn to_full_patch(&self) -> ColliderPatch {
        ColliderPatch {
            enabled: Some(self.enabled),
            is_trigger: Some(self.is_trigger),
            geometry: Some(self.geometry.clone()),
        }
    }
}
