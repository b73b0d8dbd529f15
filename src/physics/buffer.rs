use std::collections::{HashMap, VecDeque};

use log::debug;

use super::snapshot::{MotionType, Snapshot, SnapshotFlags};
use crate::types::{ActorId, Transform};

/// Snapshots kept for interpolation.
pub const DEFAULT_BUFFER_LEN: usize = 16;

/// Key-framed pose for one remote body at the playback time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemoteTarget {
    pub transform: Transform,
    pub motion_type: MotionType,
}

/// Time-ordered window of received snapshots.
#[derive(Debug)]
pub struct SnapshotBuffer {
    snapshots: VecDeque<Snapshot>,
    capacity: usize,
}

impl SnapshotBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            snapshots: VecDeque::with_capacity(capacity),
            capacity: capacity.max(2),
        }
    }

    /// Insert `snapshot` in time order.
    ///
    /// `RESET_JITTER_BUFFER` discards everything buffered first. A
    /// `NO_UPDATE` snapshot carries no poses and is not stored.
    pub fn push(&mut self, snapshot: Snapshot) {
        if snapshot.flags.contains(SnapshotFlags::RESET_JITTER_BUFFER) {
            debug!("Snapshot buffer reset at t={}", snapshot.time);
            self.snapshots.clear();
        }
        if snapshot.flags.contains(SnapshotFlags::NO_UPDATE) {
            return;
        }
        let at = self
            .snapshots
            .iter()
            .rposition(|s| s.time <= snapshot.time)
            .map_or(0, |i| i + 1);
        self.snapshots.insert(at, snapshot);
        while self.snapshots.len() > self.capacity {
            self.snapshots.pop_front();
        }
    }

    pub fn earliest_time(&self) -> Option<f32> {
        self.snapshots.front().map(|s| s.time)
    }

    pub fn latest_time(&self) -> Option<f32> {
        self.snapshots.back().map(|s| s.time)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    /// Targets at `time`, interpolated between the bracketing snapshots.
    ///
    /// Outside the buffered range the nearest snapshot is used as is. A body
    /// present in only one of the two bracketing snapshots takes that pose.
    pub fn sample(&self, time: f32) -> HashMap<ActorId, RemoteTarget> {
        let Some(first) = self.snapshots.front() else {
            return HashMap::new();
        };
        let mut prev = first;
        let mut next = first;
        for s in &self.snapshots {
            if s.time <= time {
                prev = s;
                next = s;
            } else {
                next = s;
                break;
            }
        }
        if time < first.time {
            prev = first;
        }

        let mut out: HashMap<ActorId, RemoteTarget> = prev
            .transforms
            .iter()
            .map(|t| {
                (
                    t.id,
                    RemoteTarget {
                        transform: t.transform,
                        motion_type: t.motion_type,
                    },
                )
            })
            .collect();

        let span = next.time - prev.time;
        if span <= f32::EPSILON {
            return out;
        }
        let alpha = ((time - prev.time) / span).clamp(0.0, 1.0);
        for t in &next.transforms {
            let target = out.entry(t.id).or_insert(RemoteTarget {
                transform: t.transform,
                motion_type: t.motion_type,
            });
            target.transform = Transform {
                position: target.transform.position.lerp(t.transform.position, alpha),
                rotation: target.transform.rotation.slerp(t.transform.rotation, alpha),
            };
            target.motion_type = t.motion_type;
        }
        out
    }
}

impl Default for SnapshotBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::snapshot::RigidBodyTransform;
    use crate::types::{Quat, Vec3};
    use uuid::Uuid;

    fn at(id: ActorId, time: f32, x: f32) -> Snapshot {
        Snapshot::new(
            time,
            SnapshotFlags::empty(),
            vec![RigidBodyTransform {
                id,
                motion_type: MotionType::Dynamic,
                transform: Transform {
                    position: Vec3::new(x, 0.0, 0.0),
                    rotation: Quat::IDENTITY,
                },
            }],
        )
    }

    #[test]
    fn interpolates_between_bracketing_snapshots() {
        let id = Uuid::new_v4();
        let mut buf = SnapshotBuffer::default();
        buf.push(at(id, 1.0, 0.0));
        buf.push(at(id, 2.0, 4.0));
        let t = buf.sample(1.25)[&id];
        assert!((t.transform.position.x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn clamps_to_ends_and_single_snapshot() {
        let id = Uuid::new_v4();
        let mut buf = SnapshotBuffer::default();
        buf.push(at(id, 1.0, 3.0));
        assert_eq!(buf.sample(0.0)[&id].transform.position.x, 3.0);
        assert_eq!(buf.sample(9.0)[&id].transform.position.x, 3.0);
        buf.push(at(id, 2.0, 5.0));
        assert_eq!(buf.sample(9.0)[&id].transform.position.x, 5.0);
        assert_eq!(buf.sample(0.5)[&id].transform.position.x, 3.0);
    }

    #[test]
    fn out_of_order_snapshots_are_sorted() {
        let id = Uuid::new_v4();
        let mut buf = SnapshotBuffer::default();
        buf.push(at(id, 2.0, 2.0));
        buf.push(at(id, 1.0, 1.0));
        assert_eq!(buf.earliest_time(), Some(1.0));
        assert_eq!(buf.latest_time(), Some(2.0));
    }

    #[test]
    fn reset_and_no_update_flags() {
        let id = Uuid::new_v4();
        let mut buf = SnapshotBuffer::default();
        buf.push(at(id, 1.0, 1.0));
        buf.push(Snapshot::new(2.0, SnapshotFlags::NO_UPDATE, vec![]));
        assert_eq!(buf.len(), 1);

        let mut reset = at(id, 3.0, 9.0);
        reset.flags = SnapshotFlags::RESET_JITTER_BUFFER;
        buf.push(reset);
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.earliest_time(), Some(3.0));
    }

    #[test]
    fn capacity_is_bounded() {
        let id = Uuid::new_v4();
        let mut buf = SnapshotBuffer::new(3);
        for i in 0..10 {
            buf.push(at(id, i as f32, 0.0));
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.earliest_time(), Some(7.0));
    }
}
