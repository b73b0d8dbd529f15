//! Ownership prediction for remote rigid bodies.
//!
//! Each tick every remote body is either pinned to its key-framed target or,
//! while it is near a locally owned body, simulated locally and eased back to
//! the target. The per-body blend state lives in the *monitor* map.
//!
//! | Phase                         | `t` (since contact began)       | ratio                 |
//! |-------------------------------|---------------------------------|-----------------------|
//! | not monitored                 | -                               | pinned to target      |
//! | grace                         | `t <= grace_window`             | 0                     |
//! | easing back                   | `grace < t`                     | `(t - grace) / window`|
//! | collapsed (close and settled) | `grace + window`                | 1                     |
//!
//! A body leaves the monitor once its ratio reaches 1 and no owned body is in
//! range. A body its owner key-frames (e.g. while grabbed) is never monitored.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use super::bridge::BodyState;
use super::buffer::RemoteTarget;
use super::contact::ContactQuery;
use super::snapshot::MotionType;
use crate::types::{ActorId, Quat, Transform, Vec3};

/// Padding added to the combined radius so it is never zero.
const RADIUS_EPSILON: f32 = 1e-4;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    /// Seconds during which any new contact is tracked unconditionally.
    pub grace_window: f32,
    /// Seconds over which the ratio advances from 0 to 1 after the grace window.
    pub interpolation_window: f32,
    /// Ratio at which a close body's countdown collapses.
    pub stop_ratio: f32,
    /// Relative distance below which a body counts as close.
    pub stop_distance: f32,
    /// Ratio above which poses are blended toward the target.
    pub blend_threshold: f32,
    /// Ratio above which velocities are damped.
    pub damping_threshold: f32,
    /// Per-tick velocity multiplier while damping.
    pub velocity_damping: f32,
    /// Metres.
    pub position_epsilon: f32,
    /// Degrees.
    pub angle_epsilon: f32,
    /// Scale applied to the centre-to-contact radius.
    pub radius_expansion: f32,
    /// Relative distance below which a pair is in collision range.
    pub collision_range: f32,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            grace_window: 0.3,
            interpolation_window: 3.0,
            stop_ratio: 0.5,
            stop_distance: 0.5,
            blend_threshold: 0.1,
            damping_threshold: 0.05,
            velocity_damping: 0.95,
            position_epsilon: 0.01,
            angle_epsilon: 3.0,
            radius_expansion: 1.5,
            collision_range: 1.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Monitor state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollisionMonitorInfo {
    pub time_from_start_collision: f32,
    /// Distance to the nearest owned body over the pair's combined radius.
    pub relative_distance: f32,
    /// 0 = fully dynamic, 1 = fully key-framed.
    pub keyframed_interpolation_ratio: f32,
}

impl CollisionMonitorInfo {
    /// Keep the most dynamic-favoring estimate of every field.
    fn merge_min(&mut self, other: &CollisionMonitorInfo) {
        self.time_from_start_collision = self
            .time_from_start_collision
            .min(other.time_from_start_collision);
        self.relative_distance = self.relative_distance.min(other.relative_distance);
        self.keyframed_interpolation_ratio = self
            .keyframed_interpolation_ratio
            .min(other.keyframed_interpolation_ratio);
    }
}

/// Pose and velocity of a remote body before this tick touched it.
#[derive(Debug, Clone, Copy)]
struct PreTick {
    position: Vec3,
    rotation: Quat,
    linear_velocity: Vec3,
    angular_velocity: Vec3,
}

impl PreTick {
    fn of(body: &BodyState) -> Self {
        Self {
            position: body.position,
            rotation: body.rotation,
            linear_velocity: body.linear_velocity,
            angular_velocity: body.angular_velocity,
        }
    }

    fn restore(&self, body: &mut BodyState) {
        body.position = self.position;
        body.rotation = self.rotation;
        body.linear_velocity = self.linear_velocity;
        body.angular_velocity = self.angular_velocity;
    }
}

// ---------------------------------------------------------------------------
// Predictor
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct OwnershipPredictor {
    config: PredictionConfig,
    monitor: HashMap<ActorId, CollisionMonitorInfo>,
}

impl OwnershipPredictor {
    pub fn new(config: PredictionConfig) -> Self {
        Self {
            config,
            monitor: HashMap::new(),
        }
    }

    pub fn config(&self) -> &PredictionConfig {
        &self.config
    }

    /// Blend state of a monitored body.
    pub fn info(&self, id: ActorId) -> Option<&CollisionMonitorInfo> {
        self.monitor.get(&id)
    }

    pub fn is_monitored(&self, id: ActorId) -> bool {
        self.monitor.contains_key(&id)
    }

    pub fn monitored_count(&self) -> usize {
        self.monitor.len()
    }

    pub fn forget(&mut self, id: ActorId) {
        self.monitor.remove(&id);
    }

    pub fn clear(&mut self) {
        self.monitor.clear();
    }

    /// Run one prediction tick over `bodies`.
    ///
    /// Remote bodies without an entry in `targets` are left untouched.
    pub fn step(
        &mut self,
        bodies: &mut HashMap<ActorId, BodyState>,
        targets: &HashMap<ActorId, RemoteTarget>,
        dt: f32,
        contacts: &dyn ContactQuery,
    ) {
        let pre: HashMap<ActorId, PreTick> = bodies
            .values()
            .filter(|b| !b.owned)
            .map(|b| (b.id, PreTick::of(b)))
            .collect();

        // Drive remote bodies from last tick's monitor.
        for body in bodies.values_mut().filter(|b| !b.owned) {
            let Some(target) = targets.get(&body.id) else {
                continue;
            };
            body.keyframed = target.motion_type == MotionType::Keyframed;
            if body.keyframed {
                self.monitor.remove(&body.id);
                body.snap_to(&target.transform);
                continue;
            }
            match self.monitor.get(&body.id) {
                None => body.snap_to(&target.transform),
                Some(info) => {
                    body.dynamic = true;
                    self.blend(body, &target.transform, info.keyframed_interpolation_ratio);
                }
            }
        }

        // Classify remote bodies against every owned body.
        let mut next: HashMap<ActorId, CollisionMonitorInfo> = HashMap::new();
        let owned: Vec<&BodyState> = bodies.values().filter(|b| b.owned).collect();
        for remote in bodies.values() {
            if remote.owned || remote.keyframed || !targets.contains_key(&remote.id) {
                continue;
            }
            let previous = self.monitor.get(&remote.id).copied();
            for o in &owned {
                let Some(rd) = self.relative_distance(o, remote, dt, contacts) else {
                    continue;
                };
                if let Some(info) = self.classify(previous, rd, dt) {
                    next.entry(remote.id)
                        .and_modify(|m| m.merge_min(&info))
                        .or_insert(info);
                }
            }
        }

        // A body entering the monitor keeps the physical state it had.
        for id in next.keys() {
            if self.monitor.contains_key(id) {
                continue;
            }
            if let (Some(body), Some(pre)) = (bodies.get_mut(id), pre.get(id)) {
                debug!("Body {} now locally dynamic", id);
                pre.restore(body);
                body.dynamic = true;
            }
        }
        for id in self.monitor.keys() {
            if !next.contains_key(id) {
                debug!("Body {} returns to key-framed", id);
            }
        }
        self.monitor = next;
    }

    /// Ease a locally simulated body toward its target.
    fn blend(&self, body: &mut BodyState, target: &Transform, ratio: f32) {
        let c = &self.config;
        if ratio > c.blend_threshold {
            let moved = body.position.distance(target.position) > c.position_epsilon;
            let turned = body.rotation.angle_between(target.rotation) > c.angle_epsilon.to_radians();
            if moved || turned {
                body.position = body.position.lerp(target.position, ratio);
                body.rotation = body.rotation.slerp(target.rotation, ratio);
            }
        }
        if ratio > c.damping_threshold {
            body.linear_velocity *= c.velocity_damping;
            body.angular_velocity *= c.velocity_damping;
        }
    }

    /// Distance between the pair over their expanded contact radii, taking
    /// the owned body's next-step position into account.
    fn relative_distance(
        &self,
        owned: &BodyState,
        remote: &BodyState,
        dt: f32,
        contacts: &dyn ContactQuery,
    ) -> Option<f32> {
        let cp = contacts.contact_points(owned, remote)?;
        let expansion = self.config.radius_expansion;
        let r_remote = expansion * (cp.remote - remote.position).length();
        let r_owned = expansion * (cp.owned - owned.position).length();
        let total = r_remote + r_owned + RADIUS_EPSILON;

        let now = owned.position.distance(remote.position);
        let projected = (owned.position + owned.linear_velocity * dt).distance(remote.position);
        Some(now.min(projected) / total)
    }

    /// Monitor entry for one contact, or `None` if it does not qualify.
    fn classify(
        &self,
        previous: Option<CollisionMonitorInfo>,
        relative_distance: f32,
        dt: f32,
    ) -> Option<CollisionMonitorInfo> {
        let c = &self.config;
        let in_range = relative_distance < c.collision_range;
        let mut t = previous.map_or(0.0, |p| p.time_from_start_collision + dt);

        if t <= c.grace_window {
            return (in_range || previous.is_some()).then_some(CollisionMonitorInfo {
                time_from_start_collision: t,
                relative_distance,
                keyframed_interpolation_ratio: 0.0,
            });
        }

        let mut ratio = if c.interpolation_window > 0.0 {
            ((t - c.grace_window) / c.interpolation_window).min(1.0)
        } else {
            1.0
        };
        if ratio >= c.stop_ratio && relative_distance < c.stop_distance {
            t = c.grace_window + c.interpolation_window;
            ratio = 1.0;
        }
        if ratio >= 1.0 && !in_range {
            return None;
        }
        Some(CollisionMonitorInfo {
            time_from_start_collision: t,
            relative_distance,
            keyframed_interpolation_ratio: ratio,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn predictor() -> OwnershipPredictor {
        OwnershipPredictor::new(PredictionConfig::default())
    }

    fn tracked(t: f32) -> Option<CollisionMonitorInfo> {
        Some(CollisionMonitorInfo {
            time_from_start_collision: t,
            relative_distance: 0.8,
            keyframed_interpolation_ratio: 0.0,
        })
    }

    #[test]
    fn new_contact_needs_range() {
        let p = predictor();
        assert!(p.classify(None, 1.5, 0.1).is_none());
        let info = p.classify(None, 0.9, 0.1).expect("in range");
        assert_eq!(info.time_from_start_collision, 0.0);
        assert_eq!(info.keyframed_interpolation_ratio, 0.0);
    }

    #[test]
    fn grace_window_keeps_tracked_bodies_out_of_range() {
        let p = predictor();
        let info = p.classify(tracked(0.1), 5.0, 0.1).expect("grace");
        assert!((info.time_from_start_collision - 0.2).abs() < 1e-6);
    }

    #[test]
    fn ratio_advances_after_grace() {
        let p = predictor();
        let info = p.classify(tracked(1.7), 0.8, 0.1).expect("tracked");
        assert!((info.keyframed_interpolation_ratio - 0.5).abs() < 1e-4);
    }

    #[test]
    fn close_settled_body_collapses_countdown() {
        let p = predictor();
        let info = p.classify(tracked(1.9), 0.3, 0.1).expect("tracked");
        assert_eq!(info.keyframed_interpolation_ratio, 1.0);
        assert!((info.time_from_start_collision - 3.3).abs() < 1e-6);
    }

    #[test]
    fn fully_keyframed_out_of_range_body_is_dropped() {
        let p = predictor();
        assert!(p.classify(tracked(3.3), 1.2, 0.1).is_none());
        assert!(p.classify(tracked(3.3), 0.9, 0.1).is_some());
    }

    #[test]
    fn merge_takes_minimum_of_each_field() {
        let mut a = CollisionMonitorInfo {
            time_from_start_collision: 1.0,
            relative_distance: 0.2,
            keyframed_interpolation_ratio: 0.6,
        };
        a.merge_min(&CollisionMonitorInfo {
            time_from_start_collision: 2.0,
            relative_distance: 0.1,
            keyframed_interpolation_ratio: 0.9,
        });
        assert_eq!(a.time_from_start_collision, 1.0);
        assert_eq!(a.relative_distance, 0.1);
        assert_eq!(a.keyframed_interpolation_ratio, 0.6);
    }

    #[test]
    fn blend_skips_settled_bodies() {
        let p = predictor();
        let mut body = BodyState::new(uuid::Uuid::new_v4(), false);
        body.position = Vec3::new(0.001, 0.0, 0.0);
        body.linear_velocity = Vec3::ONE;
        p.blend(&mut body, &Transform::default(), 0.5);
        assert_eq!(body.position, Vec3::new(0.001, 0.0, 0.0));
        assert_eq!(body.linear_velocity, Vec3::splat(0.95));
    }
}
