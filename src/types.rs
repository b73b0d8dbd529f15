//! Core value types shared across all modules.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use glam::{Quat, Vec2, Vec3};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// 128-bit id of an actor in the shared scene graph.
pub type ActorId = Uuid;

/// 128-bit (obfuscated) id of a connected participant.
pub type UserId = Uuid;

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn lerp(self, other: Color, t: f32) -> Color {
        Color::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
            self.a + (other.a - self.a) * t,
        )
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rgba({:.2}, {:.2}, {:.2}, {:.2})",
            self.r, self.g, self.b, self.a
        )
    }
}

// ---------------------------------------------------------------------------
// Transforms
// ---------------------------------------------------------------------------

/// Position + orientation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

/// Position + orientation + scale (actor-local space).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScaledTransform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for ScaledTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

/// Both transform spaces an actor is addressed in.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ActorTransform {
    /// Relative to the parent actor.
    pub local: ScaledTransform,
    /// Relative to the app's scene root.
    pub app: Transform,
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStats {
    pub live_actors: usize,
    pub pending_actors: usize,
    pub users: usize,
    pub monitored_bodies: usize,
    pub total_ticks: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_lerp_midpoint() {
        let c = Color::new(0.0, 0.0, 0.0, 0.0).lerp(Color::new(1.0, 0.5, 0.0, 1.0), 0.5);
        assert_eq!(c, Color::new(0.5, 0.25, 0.0, 0.5));
    }

    #[test]
    fn default_transforms_are_identity() {
        let t = ActorTransform::default();
        assert_eq!(t.local.scale, Vec3::ONE);
        assert_eq!(t.app.rotation, Quat::IDENTITY);
    }
}
