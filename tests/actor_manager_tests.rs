//! Actor manager tests

#[cfg(test)]
mod tests {
    use mre_sync::actor::{ActorCommand, CommandStatus, CreateOutcome};
    use mre_sync::animation::{AnimatableValue, Keyframe, Track};
    use mre_sync::patch::{ActorPatch, TargetPath};
    use mre_sync::protocol::{Payload, SetBehavior};
    use mre_sync::types::{Transform, Vec3};
    use mre_sync::ActorManager;
    use proptest::prelude::*;
    use uuid::Uuid;

    type Manager = ActorManager<Vec<String>>;

    fn create(id: Uuid, parent: Option<Uuid>, name: &str) -> ActorPatch {
        let mut patch = ActorPatch::for_actor(id);
        patch.parent_id = parent;
        patch.name = Some(name.to_string());
        patch
    }

    fn behavior(id: Uuid, name: &str) -> ActorCommand<Vec<String>> {
        let payload: Box<dyn Payload> = Box::new(SetBehavior {
            actor_id: id,
            behavior_type: Some(name.to_string()),
        });
        ActorCommand::new(payload, None)
    }

    fn behavior_name(cmd: &ActorCommand<Vec<String>>) -> String {
        cmd.payload
            .downcast_ref::<SetBehavior>()
            .and_then(|b| b.behavior_type.clone())
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Pending parents
    // -----------------------------------------------------------------------

    #[test]
    fn child_before_parent_waits_then_cascades() {
        let mut m = Manager::new();
        let (root, mid, leaf) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        assert_eq!(
            m.create_actor(&create(leaf, Some(mid), "leaf")),
            CreateOutcome::Pending { waiting_on: mid }
        );
        assert_eq!(
            m.create_actor(&create(mid, Some(root), "mid")),
            CreateOutcome::Pending { waiting_on: root }
        );
        assert!(m.find(leaf).is_none());
        assert!(m.is_pending(leaf));
        assert_eq!(m.pending_count(), 2);

        match m.create_actor(&create(root, None, "root")) {
            CreateOutcome::Created(ids) => assert_eq!(ids, vec![root, mid, leaf]),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(m.live_count(), 3);
        assert_eq!(m.pending_count(), 0);
        assert_eq!(m.find_by_name("leaf").map(|a| a.id), Some(leaf));
    }

    #[test]
    fn duplicate_create_changes_nothing() {
        let mut m = Manager::new();
        let id = Uuid::new_v4();
        m.create_actor(&create(id, None, "first"));
        assert_eq!(
            m.create_actor(&create(id, None, "second")),
            CreateOutcome::Duplicate
        );
        assert_eq!(m.find(id).map(|a| a.name.as_str()), Some("first"));
    }

    proptest! {
        #[test]
        fn any_arrival_order_resolves_the_tree(order in Just((0..6usize).collect::<Vec<_>>()).prop_shuffle()) {
            // 0 is the root; node i hangs off node (i - 1) / 2
            let ids: Vec<Uuid> = (0..6u128).map(|i| Uuid::from_u128(i + 1)).collect();
            let mut m = Manager::new();
            for &i in &order {
                let parent = (i > 0).then(|| ids[(i - 1) / 2]);
                m.create_actor(&create(ids[i], parent, &format!("n{}", i)));
            }
            prop_assert_eq!(m.live_count(), 6);
            prop_assert_eq!(m.pending_count(), 0);
            for id in &ids {
                prop_assert!(m.find(*id).is_some());
            }
        }
    }

    // -----------------------------------------------------------------------
    // Queued commands
    // -----------------------------------------------------------------------

    #[test]
    fn commands_for_pending_actor_release_in_order() {
        let mut m = Manager::new();
        let (parent, child) = (Uuid::new_v4(), Uuid::new_v4());
        m.create_actor(&create(child, Some(parent), "child"));

        for name in ["spin", "glow", "hover"] {
            assert!(matches!(
                m.process_actor_command(child, behavior(child, name)),
                CommandStatus::Queued
            ));
        }
        assert!(m.take_ready_commands().is_empty());

        m.create_actor(&create(parent, None, "parent"));
        let released: Vec<String> = m.take_ready_commands().iter().map(behavior_name).collect();
        assert_eq!(released, vec!["spin", "glow", "hover"]);
        assert!(m.take_ready_commands().is_empty());
    }

    #[test]
    fn commands_for_live_or_unknown_actor_run_now() {
        let mut m = Manager::new();
        let live = Uuid::new_v4();
        m.create_actor(&create(live, None, "live"));

        for id in [live, Uuid::new_v4()] {
            match m.process_actor_command(id, behavior(id, "spin")) {
                CommandStatus::Ready(cmd) => assert_eq!(behavior_name(&cmd), "spin"),
                CommandStatus::Queued => panic!("command should not wait"),
            }
        }
    }

    #[test]
    fn destroying_pending_actor_drops_its_queue() {
        let mut m = Manager::new();
        let (parent, child) = (Uuid::new_v4(), Uuid::new_v4());
        m.create_actor(&create(child, Some(parent), "child"));
        m.process_actor_command(child, behavior(child, "spin"));

        assert_eq!(m.destroy_subtree(child), vec![child]);
        m.create_actor(&create(parent, None, "parent"));
        assert!(m.take_ready_commands().is_empty());
        assert!(m.find(child).is_none());
    }

    // -----------------------------------------------------------------------
    // Destruction
    // -----------------------------------------------------------------------

    #[test]
    fn destroy_removes_live_and_pending_descendants() {
        let mut m = Manager::new();
        let (root, a, b, orphan) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let missing = Uuid::new_v4();
        m.create_actor(&create(root, None, "root"));
        m.create_actor(&create(a, Some(root), "a"));
        m.create_actor(&create(b, Some(a), "b"));
        m.create_actor(&create(orphan, Some(missing), "orphan"));

        let mut removed = m.destroy_subtree(root);
        removed.sort();
        let mut expected = vec![root, a, b];
        expected.sort();
        assert_eq!(removed, expected);
        assert_eq!(m.live_count(), 0);
        assert!(m.is_pending(orphan));

        assert!(!m.on_actor_destroy(root));
        assert!(m.on_actor_destroy(orphan));
        assert_eq!(m.pending_count(), 0);
    }

    // -----------------------------------------------------------------------
    // Outbound diffs
    // -----------------------------------------------------------------------

    #[test]
    fn local_changes_are_reported_once() {
        let mut m = Manager::new();
        let id = Uuid::new_v4();
        m.create_actor(&create(id, None, "box"));
        assert!(m.collect_outbound_patches().is_empty());

        m.find_mut(id).expect("live").name = "crate".into();
        let patches = m.collect_outbound_patches();
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].id, id);
        assert_eq!(patches[0].name.as_deref(), Some("crate"));
        assert!(patches[0].transform.is_none());

        assert!(m.collect_outbound_patches().is_empty());
    }

    #[test]
    fn remote_updates_and_simulated_poses_are_not_echoed() {
        let mut m = Manager::new();
        let id = Uuid::new_v4();
        m.create_actor(&create(id, None, "ball"));

        let mut update = ActorPatch::for_actor(id);
        update.name = Some("rolling ball".into());
        assert!(m.update_actor(&update));
        assert!(m.set_simulated_pose(
            id,
            Transform {
                position: Vec3::new(0.0, 2.0, 0.0),
                ..Transform::default()
            }
        ));

        let actor = m.find(id).expect("live");
        assert_eq!(actor.name, "rolling ball");
        assert_eq!(actor.transform.app.position, Vec3::new(0.0, 2.0, 0.0));
        assert!(m.collect_outbound_patches().is_empty());
    }

    #[test]
    fn update_for_unknown_actor_is_ignored() {
        let mut m = Manager::new();
        assert!(!m.update_actor(&ActorPatch::for_actor(Uuid::new_v4())));
        assert!(!m.set_simulated_pose(Uuid::new_v4(), Transform::default()));
    }

    // -----------------------------------------------------------------------
    // Animation
    // -----------------------------------------------------------------------

    #[test]
    fn track_drives_named_actor_and_is_reported() {
        let mut m = Manager::new();
        let id = Uuid::new_v4();
        m.create_actor(&create(id, None, "door"));

        let track = Track::new(
            TargetPath::parse("actor:door/transform/local/position").expect("path"),
            vec![
                Keyframe::new(0.0, AnimatableValue::Vector3(Vec3::ZERO)),
                Keyframe::new(1.0, AnimatableValue::Vector3(Vec3::new(2.0, 0.0, 0.0))),
            ],
            false,
        )
        .expect("track");

        let patch = m.apply_track(&track, 0.5).expect("apply").expect("door exists");
        assert_eq!(patch.id, id);
        let pos = m.find(id).expect("live").transform.local.position;
        assert!((pos.x - 1.0).abs() < 1e-5);

        let outbound = m.collect_outbound_patches();
        assert_eq!(outbound.len(), 1);
        assert!(outbound[0].transform.is_some());
    }

    #[test]
    fn track_for_missing_actor_is_a_no_op() {
        let mut m = Manager::new();
        let track = Track::new(
            TargetPath::parse("actor:ghost/text/height").expect("path"),
            vec![Keyframe::new(0.0, AnimatableValue::Scalar(1.0))],
            false,
        )
        .expect("track");
        assert_eq!(m.apply_track(&track, 0.0).expect("apply"), None);
    }
}
