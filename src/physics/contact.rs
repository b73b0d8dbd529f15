use super::bridge::BodyState;
use crate::types::Vec3;

/// Closest surface points between an owned and a remote body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoints {
    /// On the owned body's surface.
    pub owned: Vec3,
    /// On the remote body's surface.
    pub remote: Vec3,
}

/// Source of contact points for the ownership predictor.
///
/// Hosts with a real physics engine implement this over their collision
/// queries. Returning `None` means the pair has no resolvable contact and is
/// skipped for this tick.
pub trait ContactQuery {
    fn contact_points(&self, owned: &BodyState, remote: &BodyState) -> Option<ContactPoints>;
}

/// Contact points from each body's world-axis-aligned bounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundsContactQuery;

impl BoundsContactQuery {
    fn closest_point(body: &BodyState, toward: Vec3) -> Vec3 {
        let he = body.half_extents;
        body.position + (toward - body.position).clamp(-he, he)
    }
}

impl ContactQuery for BoundsContactQuery {
    fn contact_points(&self, owned: &BodyState, remote: &BodyState) -> Option<ContactPoints> {
        // A body without extent has no surface to touch.
        if owned.half_extents == Vec3::ZERO || remote.half_extents == Vec3::ZERO {
            return None;
        }
        Some(ContactPoints {
            owned: Self::closest_point(owned, remote.position),
            remote: Self::closest_point(remote, owned.position),
        })
    }
}
