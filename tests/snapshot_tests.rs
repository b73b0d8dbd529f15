//! Snapshot codec property tests

#[cfg(test)]
mod tests {
    use mre_sync::physics::{
        decode_transforms, encode_transforms, MotionType, RigidBodyTransform, Snapshot,
        SnapshotError, SnapshotFlags, BYTES_PER_BODY,
    };
    use mre_sync::types::{Quat, Transform, Vec3};
    use proptest::prelude::*;
    use uuid::Uuid;

    // -----------------------------------------------------------------------
    // Strategies
    // -----------------------------------------------------------------------

    fn motion_type() -> impl Strategy<Value = MotionType> {
        prop_oneof![
            Just(MotionType::Dynamic),
            Just(MotionType::Keyframed),
            Just(MotionType::Sleeping),
        ]
    }

    prop_compose! {
        fn body()(
            id in any::<u128>(),
            motion_type in motion_type(),
            (x, y, z) in (-1e4f32..1e4, -1e4f32..1e4, -1e4f32..1e4),
            (qx, qy, qz, qw) in (-1.0f32..1.0, -1.0f32..1.0, -1.0f32..1.0, -1.0f32..1.0),
        ) -> RigidBodyTransform {
            RigidBodyTransform {
                id: Uuid::from_u128(id),
                motion_type,
                transform: Transform {
                    position: Vec3::new(x, y, z),
                    rotation: Quat::from_xyzw(qx, qy, qz, qw),
                },
            }
        }
    }

    // -----------------------------------------------------------------------
    // Binary layout
    // -----------------------------------------------------------------------

    proptest! {
        #[test]
        fn decode_inverts_encode(bodies in prop::collection::vec(body(), 0..20)) {
            let bytes = encode_transforms(&bodies);
            prop_assert_eq!(bytes.len(), bodies.len() * BYTES_PER_BODY);
            let decoded = decode_transforms(&bytes).expect("decode");
            prop_assert_eq!(decoded, bodies);
        }

        #[test]
        fn truncated_buffers_are_rejected(
            bodies in prop::collection::vec(body(), 1..8),
            cut in 1usize..BYTES_PER_BODY,
        ) {
            let bytes = encode_transforms(&bodies);
            let short = &bytes[..bytes.len() - cut];
            let rejected = matches!(
                decode_transforms(short),
                Err(SnapshotError::Length { len }) if len == short.len()
            );
            prop_assert!(rejected);
        }

        #[test]
        fn payload_keeps_time_flags_and_bodies(
            time in 0.0f32..1e5,
            reset in any::<bool>(),
            bodies in prop::collection::vec(body(), 0..6),
        ) {
            let flags = if reset { SnapshotFlags::RESET_JITTER_BUFFER } else { SnapshotFlags::empty() };
            let snapshot = Snapshot::new(time, flags, bodies);
            let decoded = Snapshot::from_payload(&snapshot.to_payload()).expect("decode");
            prop_assert_eq!(decoded, snapshot);
        }
    }

    // -----------------------------------------------------------------------
    // Payload
    // -----------------------------------------------------------------------

    #[test]
    fn invalid_base64_is_rejected() {
        let mut payload = Snapshot::new(1.0, SnapshotFlags::empty(), Vec::new()).to_payload();
        payload.transforms = "%%%".into();
        assert!(matches!(
            Snapshot::from_payload(&payload),
            Err(SnapshotError::Base64(_))
        ));
    }

    #[test]
    fn unknown_flag_bits_are_dropped() {
        let mut payload = Snapshot::new(1.0, SnapshotFlags::NO_UPDATE, Vec::new()).to_payload();
        payload.flags |= 0b1000_0000;
        let decoded = Snapshot::from_payload(&payload).expect("decode");
        assert_eq!(decoded.flags, SnapshotFlags::NO_UPDATE);
    }
}
