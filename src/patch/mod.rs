//! Patch/diff engine.
//!
//! A patch is a sparse mirror of an entity's public state: every field is an
//! `Option`, present only when it changed since the last patch emitted for
//! that entity.
//!
//! | Operation                | Result                                           |
//! |--------------------------|--------------------------------------------------|
//! | `generate(None, &new)`   | fully populated patch (first sighting)           |
//! | `generate(Some(&old), &new)` | `None` when nothing changed, else only changed fields |
//! | `apply_patch(&patch)`    | overwrites present fields only; idempotent       |
//!
//! Composite fields (vectors, quaternions, colors, transforms) are themselves
//! patches, so a single changed axis travels as a single number.

pub mod components;
pub mod error;
pub mod math;
pub mod target_path;

mod actor_patch;

pub use actor_patch::ActorPatch;
pub use components::{
    AlphaMode, Appearance, AppearancePatch, Collider, ColliderGeometry, ColliderPatch,
    CollisionDetectionMode, Material, MaterialPatch, RigidBody, RigidBodyPatch, Text, TextAnchor,
    TextJustify, TextPatch,
};
pub use error::PatchError;
pub use math::{
    ActorTransformPatch, ColorPatch, QuaternionPatch, ScaledTransformPatch, TransformPatch,
    Vector2Patch, Vector3Patch,
};
pub use target_path::{Restorable, TargetPath};

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// A sparse update.
pub trait Patch: Default + Clone + PartialEq {
    /// True when at least one field is present.
    fn is_patched(&self) -> bool;
}

/// State that can be diffed into, and updated from, a [`Patch`].
pub trait Patchable {
    type Patch: Patch;

    /// Overwrite exactly the fields present in `patch`, leaving all others untouched.
    fn apply_patch(&mut self, patch: &Self::Patch);

    /// Every field of `newer` that differs from `self`, or `None` if nothing changed.
    fn diff(&self, newer: &Self) -> Option<Self::Patch>;

    /// A patch with every field present.
    fn to_full_patch(&self) -> Self::Patch;
}

/// Patch for `new` relative to the last emitted state, if any.
///
/// With no previous state the patch is fully populated.
pub fn generate<T: Patchable>(old: Option<&T>, new: &T) -> Option<T::Patch> {
    match old {
        None => Some(new.to_full_patch()),
        Some(old) => old.diff(new),
    }
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// `Some(new)` when the scalar changed.
pub(crate) fn diff_value<T: PartialEq + Clone>(old: &T, new: &T) -> Option<T> {
    if old == new {
        None
    } else {
        Some(new.clone())
    }
}

/// Overwrite `target` when the patch carries a value.
pub(crate) fn apply_value<T: Clone>(target: &mut T, value: &Option<T>) {
    if let Some(v) = value {
        *target = v.clone();
    }
}

/// Apply a nested patch when present.
pub(crate) fn apply_nested<T: Patchable>(target: &mut T, patch: &Option<T::Patch>) {
    if let Some(p) = patch {
        target.apply_patch(p);
    }
}

/// Apply a patch for an optional component, creating the component on demand.
pub(crate) fn apply_component<T: Patchable + Default>(
    target: &mut Option<T>,
    patch: &Option<T::Patch>,
) {
    if let Some(p) = patch {
        target.get_or_insert_with(T::default).apply_patch(p);
    }
}

/// Diff an optional component. A component that appears is sent in full;
/// a component that disappears cannot be expressed and yields nothing.
pub(crate) fn diff_component<T: Patchable>(old: &Option<T>, new: &Option<T>) -> Option<T::Patch> {
    match (old, new) {
        (Some(o), Some(n)) => o.diff(n),
        (None, Some(n)) => Some(n.to_full_patch()),
        _ => None,
    }
}

/// Wrap a freshly built patch, dropping it if empty.
pub(crate) fn non_empty<P: Patch>(patch: P) -> Option<P> {
    if patch.is_patched() {
        Some(patch)
    } else {
        None
    }
}
