//! Binary rigid-body snapshot codec.
//!
//! Layout per body, little-endian, 48 bytes:
//!
//! | Offset | Size | Field                               |
//! |--------|------|-------------------------------------|
//! | 0      | 16   | actor id, mixed-endian GUID order   |
//! | 16     | 1    | motion type                         |
//! | 17     | 3    | reserved (zero)                     |
//! | 20     | 12   | position x, y, z (`f32`)            |
//! | 32     | 16   | rotation x, y, z, w (`f32`)         |
//!
//! Ids use the GUID byte order of the peer: the first three fields
//! (4, 2 and 2 bytes) little-endian, the last 8 bytes as is, i.e.
//! [`Uuid::to_bytes_le`].
//!
//! Sender and receiver use opposite handedness. Position z and rotation x/y
//! are negated on encode and again on decode; no other component is touched.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bitflags::bitflags;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::protocol::PhysicsBridgeUpdate;
use crate::types::{ActorId, Quat, Transform, Vec3};

pub const BYTES_PER_BODY: usize = 48;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Snapshot length {len} is not a multiple of 48")]
    Length { len: usize },

    #[error("Body {index} has unknown motion type {value}")]
    MotionType { index: usize, value: u8 },

    #[error("Snapshot transforms are not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MotionType {
    Dynamic = 0,
    /// Pose is dictated by its owner, e.g. while grabbed.
    Keyframed = 1,
    Sleeping = 2,
}

impl TryFrom<u8> for MotionType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        match value {
            0 => Ok(MotionType::Dynamic),
            1 => Ok(MotionType::Keyframed),
            2 => Ok(MotionType::Sleeping),
            other => Err(other),
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct SnapshotFlags: u8 {
        /// Every owned body is asleep; the transform list is empty.
        const NO_UPDATE           = 0b0001;
        /// Receiver should drop buffered snapshots before this one.
        const RESET_JITTER_BUFFER = 0b0010;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RigidBodyTransform {
    pub id: ActorId,
    pub motion_type: MotionType,
    pub transform: Transform,
}

/// Point-in-time capture of a set of bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub time: f32,
    pub flags: SnapshotFlags,
    pub transforms: Vec<RigidBodyTransform>,
}

impl Snapshot {
    pub fn new(time: f32, flags: SnapshotFlags, transforms: Vec<RigidBodyTransform>) -> Self {
        Self {
            time,
            flags,
            transforms,
        }
    }

    pub fn to_payload(&self) -> PhysicsBridgeUpdate {
        PhysicsBridgeUpdate {
            time: self.time,
            flags: self.flags.bits(),
            transforms: STANDARD.encode(encode_transforms(&self.transforms)),
        }
    }

    /// Decode a received payload. Unknown flag bits are dropped.
    pub fn from_payload(payload: &PhysicsBridgeUpdate) -> Result<Self, SnapshotError> {
        let bytes = STANDARD.decode(payload.transforms.as_bytes())?;
        Ok(Self {
            time: payload.time,
            flags: SnapshotFlags::from_bits_truncate(payload.flags),
            transforms: decode_transforms(&bytes)?,
        })
    }
}

fn flip_position(v: Vec3) -> Vec3 {
    Vec3::new(v.x, v.y, -v.z)
}

fn flip_rotation(q: Quat) -> Quat {
    Quat::from_xyzw(-q.x, -q.y, q.z, q.w)
}

pub fn encode_transforms(transforms: &[RigidBodyTransform]) -> Bytes {
    let mut buf = BytesMut::with_capacity(transforms.len() * BYTES_PER_BODY);
    for t in transforms {
        buf.put_slice(&t.id.to_bytes_le());
        buf.put_u8(t.motion_type as u8);
        buf.put_bytes(0, 3);
        let p = flip_position(t.transform.position);
        buf.put_f32_le(p.x);
        buf.put_f32_le(p.y);
        buf.put_f32_le(p.z);
        let r = flip_rotation(t.transform.rotation);
        buf.put_f32_le(r.x);
        buf.put_f32_le(r.y);
        buf.put_f32_le(r.z);
        buf.put_f32_le(r.w);
    }
    buf.freeze()
}

/// Decode every body in `data`. Nothing is returned unless the whole buffer
/// is valid.
pub fn decode_transforms(data: &[u8]) -> Result<Vec<RigidBodyTransform>, SnapshotError> {
    if data.len() % BYTES_PER_BODY != 0 {
        return Err(SnapshotError::Length { len: data.len() });
    }
    let mut buf = data;
    let mut out = Vec::with_capacity(data.len() / BYTES_PER_BODY);
    for index in 0..data.len() / BYTES_PER_BODY {
        let mut id = [0u8; 16];
        buf.copy_to_slice(&mut id);
        let raw = buf.get_u8();
        let motion_type =
            MotionType::try_from(raw).map_err(|value| SnapshotError::MotionType { index, value })?;
        buf.advance(3);
        let position = Vec3::new(buf.get_f32_le(), buf.get_f32_le(), buf.get_f32_le());
        let rotation = Quat::from_xyzw(
            buf.get_f32_le(),
            buf.get_f32_le(),
            buf.get_f32_le(),
            buf.get_f32_le(),
        );
        out.push(RigidBodyTransform {
            id: Uuid::from_bytes_le(id),
            motion_type,
            transform: Transform {
                position: flip_position(position),
                rotation: flip_rotation(rotation),
            },
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(motion_type: MotionType) -> RigidBodyTransform {
        RigidBodyTransform {
            id: Uuid::new_v4(),
            motion_type,
            transform: Transform {
                position: Vec3::new(1.0, 2.0, 3.0),
                rotation: Quat::from_xyzw(0.1, 0.2, 0.3, 0.9).normalize(),
            },
        }
    }

    #[test]
    fn id_uses_guid_byte_order() {
        let id = Uuid::parse_str("00112233-4455-6677-8899-aabbccddeeff").expect("uuid");
        let t = RigidBodyTransform {
            id,
            ..body(MotionType::Dynamic)
        };
        let bytes = encode_transforms(&[t]);
        assert_eq!(
            &bytes[0..16],
            &[
                0x33, 0x22, 0x11, 0x00, 0x55, 0x44, 0x77, 0x66, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd,
                0xee, 0xff
            ]
        );
        assert_eq!(decode_transforms(&bytes).expect("decode")[0].id, id);
    }

    #[test]
    fn wire_layout_flips_exactly_three_components() {
        let b = body(MotionType::Keyframed);
        let bytes = encode_transforms(&[b]);
        assert_eq!(bytes.len(), BYTES_PER_BODY);
        assert_eq!(&bytes[0..16], &b.id.to_bytes_le());
        assert_eq!(bytes[16], 1);
        assert_eq!(&bytes[17..20], &[0, 0, 0]);

        let f = |at: usize| f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        let r = b.transform.rotation;
        assert_eq!((f(20), f(24), f(28)), (1.0, 2.0, -3.0));
        assert_eq!((f(32), f(36), f(40), f(44)), (-r.x, -r.y, r.z, r.w));
    }

    #[test]
    fn rejects_partial_buffers() {
        let bytes = encode_transforms(&[body(MotionType::Dynamic), body(MotionType::Sleeping)]);
        let err = decode_transforms(&bytes[..BYTES_PER_BODY + 10]).unwrap_err();
        assert!(matches!(err, SnapshotError::Length { len: 58 }));
    }

    #[test]
    fn rejects_unknown_motion_type_without_partial_output() {
        let mut bytes = encode_transforms(&[body(MotionType::Dynamic), body(MotionType::Dynamic)]).to_vec();
        bytes[BYTES_PER_BODY + 16] = 9;
        let err = decode_transforms(&bytes).unwrap_err();
        assert!(matches!(err, SnapshotError::MotionType { index: 1, value: 9 }));
    }

    #[test]
    fn payload_round_trip_keeps_flags() {
        let snapshot = Snapshot::new(
            2.5,
            SnapshotFlags::RESET_JITTER_BUFFER,
            vec![body(MotionType::Dynamic)],
        );
        let decoded = Snapshot::from_payload(&snapshot.to_payload()).expect("decode");
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn empty_buffer_is_empty_snapshot() {
        assert!(decode_transforms(&[]).expect("decode").is_empty());
    }
}
