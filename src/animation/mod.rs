//! Keyframe animation primitives.
//!
//! Values are tagged once, at construction, with their shape
//! (`AnimatableValue`). Interpolation then dispatches on the tag:
//!
//! | Shape        | Interpolation | Relative resolution        |
//! |--------------|---------------|----------------------------|
//! | `Scalar`     | lerp          | reference + relative       |
//! | `Vector2/3`  | lerp          | reference + relative       |
//! | `Quaternion` | slerp         | reference * relative       |
//! | `Color`      | lerp          | reference + relative       |
//!
//! A [`Track`] samples its keyframes at a time and writes the result into
//! any [`Restorable`](crate::patch::Restorable) patch through its target path.

pub mod easing;
pub mod track;
pub mod value;

pub use easing::CubicBezier;
pub use track::{AnimationError, Keyframe, Track};
pub use value::{interpolate, resolve_relative, AnimatableValue};
