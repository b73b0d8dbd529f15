use serde::{Deserialize, Serialize};

use crate::types::{Color, Quat, Vec2, Vec3};

/// A value an animation can drive, tagged with its shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum AnimatableValue {
    Scalar(f32),
    Vector2(Vec2),
    Vector3(Vec3),
    Quaternion(Quat),
    Color(Color),
}

impl AnimatableValue {
    /// Shape name, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AnimatableValue::Scalar(_) => "scalar",
            AnimatableValue::Vector2(_) => "vector2",
            AnimatableValue::Vector3(_) => "vector3",
            AnimatableValue::Quaternion(_) => "quaternion",
            AnimatableValue::Color(_) => "color",
        }
    }

    pub fn same_kind(&self, other: &AnimatableValue) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// Blend `from` toward `to` by `t`. `None` if the shapes differ.
pub fn interpolate(from: &AnimatableValue, to: &AnimatableValue, t: f32) -> Option<AnimatableValue> {
    use AnimatableValue::*;
    Some(match (from, to) {
        (Scalar(a), Scalar(b)) => Scalar(a + (b - a) * t),
        (Vector2(a), Vector2(b)) => Vector2(a.lerp(*b, t)),
        (Vector3(a), Vector3(b)) => Vector3(a.lerp(*b, t)),
        (Quaternion(a), Quaternion(b)) => Quaternion(a.slerp(*b, t)),
        (Color(a), Color(b)) => Color(a.lerp(*b, t)),
        _ => return None,
    })
}

/// Compose `relative` on top of `reference`. Order matters for rotations:
/// the reference is applied first.
pub fn resolve_relative(
    reference: &AnimatableValue,
    relative: &AnimatableValue,
) -> Option<AnimatableValue> {
    use AnimatableValue::*;
    Some(match (reference, relative) {
        (Scalar(a), Scalar(b)) => Scalar(a + b),
        (Vector2(a), Vector2(b)) => Vector2(*a + *b),
        (Vector3(a), Vector3(b)) => Vector3(*a + *b),
        (Quaternion(a), Quaternion(b)) => Quaternion((*a * *b).normalize()),
        (Color(a), Color(b)) => Color(crate::types::Color::new(
            a.r + b.r,
            a.g + b.g,
            a.b + b.b,
            a.a + b.a,
        )),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn quaternion_midpoint_is_slerped() {
        let a = AnimatableValue::Quaternion(Quat::IDENTITY);
        let b = AnimatableValue::Quaternion(Quat::from_rotation_y(FRAC_PI_2));
        let Some(AnimatableValue::Quaternion(mid)) = interpolate(&a, &b, 0.5) else {
            panic!("expected quaternion");
        };
        let expected = Quat::from_rotation_y(FRAC_PI_2 / 2.0);
        assert!(mid.angle_between(expected) < 1e-4);
        assert!((mid.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn mismatched_shapes_do_not_interpolate() {
        let a = AnimatableValue::Scalar(1.0);
        let b = AnimatableValue::Vector3(Vec3::ONE);
        assert_eq!(interpolate(&a, &b, 0.5), None);
        assert_eq!(resolve_relative(&a, &b), None);
    }

    #[test]
    fn relative_rotation_applies_reference_first() {
        let reference = Quat::from_rotation_y(FRAC_PI_2);
        let relative = Quat::from_rotation_x(FRAC_PI_2);
        let Some(AnimatableValue::Quaternion(q)) = resolve_relative(
            &AnimatableValue::Quaternion(reference),
            &AnimatableValue::Quaternion(relative),
        ) else {
            panic!("expected quaternion");
        };
        assert!(q.angle_between(reference * relative) < 1e-4);
        assert!(q.angle_between(relative * reference) > 0.1);
    }

    #[test]
    fn relative_position_adds() {
        let v = resolve_relative(
            &AnimatableValue::Vector3(Vec3::new(1.0, 0.0, 0.0)),
            &AnimatableValue::Vector3(Vec3::new(0.0, 2.0, 0.0)),
        );
        assert_eq!(v, Some(AnimatableValue::Vector3(Vec3::new(1.0, 2.0, 0.0))));
    }

    #[test]
    fn tagged_wire_shape() {
        let json = serde_json::to_value(AnimatableValue::Scalar(0.5)).expect("serialize");
        assert_eq!(json, serde_json::json!({ "type": "scalar", "value": 0.5 }));
    }
}
