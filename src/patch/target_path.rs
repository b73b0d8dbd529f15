//! Addressing individual patch fields by path.
//!
//! A target path names an entity and a field inside its patch, for example
//! `actor:door/transform/local/rotation`. Animation writes through these
//! paths; an authoring layer that temporarily overrides a field uses
//! [`Restorable::clear`] and [`Restorable::restore`] to hand control back.
//!
//! Restorable actor fields:
//!
//! | Path                       | Shape        |
//! |----------------------------|--------------|
//! | `transform/local/position` | `Vector3`    |
//! | `transform/local/rotation` | `Quaternion` |
//! | `transform/local/scale`    | `Vector3`    |
//! | `transform/app/position`   | `Vector3`    |
//! | `transform/app/rotation`   | `Quaternion` |
//! | `appearance/color`         | `Color`      |
//! | `text/color`               | `Color`      |
//! | `text/height`              | `Scalar`     |

use std::fmt;
use std::str::FromStr;

use super::actor_patch::ActorPatch;
use super::components::{AppearancePatch, TextPatch};
use super::error::PatchError;
use super::math::{
    ColorPatch, QuaternionPatch, ScaledTransformPatch, TransformPatch, Vector3Patch,
};
use super::Patch;
use crate::animation::AnimatableValue;
use crate::types::{Color, Quat, Vec3};

// ---------------------------------------------------------------------------
// TargetPath
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetPath {
    /// Entity kind, e.g. `actor`.
    pub kind: String,
    /// Entity name the path is bound to.
    pub name: String,
    /// Slash-separated field path inside the entity's patch.
    pub path: String,
}

impl TargetPath {
    pub fn parse(s: &str) -> Result<Self, PatchError> {
        let malformed = |reason| PatchError::MalformedPath {
            path: s.to_string(),
            reason,
        };
        let (kind, rest) = s.split_once(':').ok_or_else(|| malformed("missing ':'"))?;
        if kind.is_empty() {
            return Err(malformed("empty target kind"));
        }
        let (name, path) = rest
            .split_once('/')
            .ok_or_else(|| malformed("missing field path"))?;
        if name.is_empty() {
            return Err(malformed("empty target name"));
        }
        if path.is_empty() || path.split('/').any(str::is_empty) {
            return Err(malformed("empty path segment"));
        }
        Ok(Self {
            kind: kind.to_string(),
            name: name.to_string(),
            path: path.to_string(),
        })
    }
}

impl FromStr for TargetPath {
    type Err = PatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TargetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.kind, self.name, self.path)
    }
}

// ---------------------------------------------------------------------------
// Restorable
// ---------------------------------------------------------------------------

/// A patch whose fields can be read, written and handed back by path.
pub trait Restorable {
    /// Value at `path`, if the patch carries all of it.
    fn read(&self, path: &str) -> Option<AnimatableValue>;

    /// Overwrite the field at `path`.
    fn write(&mut self, path: &str, value: &AnimatableValue) -> Result<(), PatchError>;

    /// Drop every field except the entity id.
    fn clear(&mut self);

    /// Copy the field at `path` back from `saved`.
    fn restore(&mut self, path: &str, saved: &Self) -> Result<(), PatchError>;
}

// Field accessors shared by read/write/restore.

fn local(p: &ActorPatch) -> Option<&ScaledTransformPatch> {
    p.transform.as_ref()?.local.as_ref()
}

fn app(p: &ActorPatch) -> Option<&TransformPatch> {
    p.transform.as_ref()?.app.as_ref()
}

fn local_mut(p: &mut ActorPatch) -> &mut ScaledTransformPatch {
    p.transform
        .get_or_insert_with(Default::default)
        .local
        .get_or_insert_with(Default::default)
}

fn app_mut(p: &mut ActorPatch) -> &mut TransformPatch {
    p.transform
        .get_or_insert_with(Default::default)
        .app
        .get_or_insert_with(Default::default)
}

fn appearance_mut(p: &mut ActorPatch) -> &mut AppearancePatch {
    p.appearance.get_or_insert_with(Default::default)
}

fn text_mut(p: &mut ActorPatch) -> &mut TextPatch {
    p.text.get_or_insert_with(Default::default)
}

fn full_vec3(p: &Vector3Patch) -> Option<Vec3> {
    Some(Vec3::new(p.x?, p.y?, p.z?))
}

fn full_quat(p: &QuaternionPatch) -> Option<Quat> {
    Some(Quat::from_xyzw(p.x?, p.y?, p.z?, p.w?))
}

fn full_color(p: &ColorPatch) -> Option<Color> {
    Some(Color::new(p.r?, p.g?, p.b?, p.a?))
}

fn expect_vec3(path: &str, value: &AnimatableValue) -> Result<Vector3Patch, PatchError> {
    match value {
        AnimatableValue::Vector3(v) => Ok(Vector3Patch::from_vec3(*v)),
        other => Err(mismatch(path, "vector3", other)),
    }
}

fn expect_quat(path: &str, value: &AnimatableValue) -> Result<QuaternionPatch, PatchError> {
    match value {
        AnimatableValue::Quaternion(q) => Ok(QuaternionPatch::from_quat(*q)),
        other => Err(mismatch(path, "quaternion", other)),
    }
}

fn expect_color(path: &str, value: &AnimatableValue) -> Result<ColorPatch, PatchError> {
    match value {
        AnimatableValue::Color(c) => Ok(ColorPatch {
            r: Some(c.r),
            g: Some(c.g),
            b: Some(c.b),
            a: Some(c.a),
        }),
        other => Err(mismatch(path, "color", other)),
    }
}

fn expect_scalar(path: &str, value: &AnimatableValue) -> Result<f32, PatchError> {
    match value {
        AnimatableValue::Scalar(s) => Ok(*s),
        other => Err(mismatch(path, "scalar", other)),
    }
}

fn mismatch(path: &str, expected: &'static str, found: &AnimatableValue) -> PatchError {
    PatchError::ValueMismatch {
        path: path.to_string(),
        expected,
        found: found.kind(),
    }
}

fn unknown(path: &str) -> PatchError {
    PatchError::UnknownPath {
        path: path.to_string(),
    }
}

impl ActorPatch {
    /// Collapse nested patches left empty by a restore.
    fn prune(&mut self) {
        if let Some(t) = self.transform.as_mut() {
            if t.local.as_ref().is_some_and(|l| !l.is_patched()) {
                t.local = None;
            }
            if t.app.as_ref().is_some_and(|a| !a.is_patched()) {
                t.app = None;
            }
        }
        if self.transform.as_ref().is_some_and(|t| !t.is_patched()) {
            self.transform = None;
        }
        if self.appearance.as_ref().is_some_and(|a| !a.is_patched()) {
            self.appearance = None;
        }
        if self.text.as_ref().is_some_and(|t| !t.is_patched()) {
            self.text = None;
        }
    }
}

impl Restorable for ActorPatch {
    fn read(&self, path: &str) -> Option<AnimatableValue> {
        match path {
            "transform/local/position" => {
                full_vec3(local(self)?.position.as_ref()?).map(AnimatableValue::Vector3)
            }
            "transform/local/rotation" => {
                full_quat(local(self)?.rotation.as_ref()?).map(AnimatableValue::Quaternion)
            }
            "transform/local/scale" => {
                full_vec3(local(self)?.scale.as_ref()?).map(AnimatableValue::Vector3)
            }
            "transform/app/position" => {
                full_vec3(app(self)?.position.as_ref()?).map(AnimatableValue::Vector3)
            }
            "transform/app/rotation" => {
                full_quat(app(self)?.rotation.as_ref()?).map(AnimatableValue::Quaternion)
            }
            "appearance/color" => {
                full_color(self.appearance.as_ref()?.color.as_ref()?).map(AnimatableValue::Color)
            }
            "text/color" => {
                full_color(self.text.as_ref()?.color.as_ref()?).map(AnimatableValue::Color)
            }
            "text/height" => self.text.as_ref()?.height.map(AnimatableValue::Scalar),
            _ => None,
        }
    }

    fn write(&mut self, path: &str, value: &AnimatableValue) -> Result<(), PatchError> {
        match path {
            "transform/local/position" => local_mut(self).position = Some(expect_vec3(path, value)?),
            "transform/local/rotation" => local_mut(self).rotation = Some(expect_quat(path, value)?),
            "transform/local/scale" => local_mut(self).scale = Some(expect_vec3(path, value)?),
            "transform/app/position" => app_mut(self).position = Some(expect_vec3(path, value)?),
            "transform/app/rotation" => app_mut(self).rotation = Some(expect_quat(path, value)?),
            "appearance/color" => appearance_mut(self).color = Some(expect_color(path, value)?),
            "text/color" => text_mut(self).color = Some(expect_color(path, value)?),
            "text/height" => text_mut(self).height = Some(expect_scalar(path, value)?),
            _ => return Err(unknown(path)),
        }
        Ok(())
    }

    fn clear(&mut self) {
        *self = ActorPatch::for_actor(self.id);
    }

    fn restore(&mut self, path: &str, saved: &Self) -> Result<(), PatchError> {
        match path {
            "transform/local/position" => {
                local_mut(self).position = local(saved).and_then(|l| l.position.clone())
            }
            "transform/local/rotation" => {
                local_mut(self).rotation = local(saved).and_then(|l| l.rotation.clone())
            }
            "transform/local/scale" => {
                local_mut(self).scale = local(saved).and_then(|l| l.scale.clone())
            }
            "transform/app/position" => {
                app_mut(self).position = app(saved).and_then(|a| a.position.clone())
            }
            "transform/app/rotation" => {
                app_mut(self).rotation = app(saved).and_then(|a| a.rotation.clone())
            }
            "appearance/color" => {
                appearance_mut(self).color = saved.appearance.as_ref().and_then(|a| a.color.clone())
            }
            "text/color" => text_mut(self).color = saved.text.as_ref().and_then(|t| t.color.clone()),
            "text/height" => text_mut(self).height = saved.text.as_ref().and_then(|t| t.height),
            _ => return Err(unknown(path)),
        }
        self.prune();
        Ok(())
    }
}
