//! Identity registry tests

#[cfg(test)]
mod tests {
    use poi_telemetry::{
        identity::{assign_labels_from_words, parse_word_list, IdentityRegistry},
        scene::{Group, Marker, PoiBody, PoiKey, PointOfInterest, Scene},
        types::{PoiCategory, Transform, Vec3},
        TelemetryError,
    };

    fn make_poi(category: PoiCategory, x: f32, z: f32) -> PointOfInterest {
        let body = if category.is_text() {
            PoiBody::label("")
        } else {
            PoiBody::unit_box()
        };
        PointOfInterest::new(category, Transform::from_position(Vec3::new(x, 0.0, z)), body)
    }

    /// One group per `(z, xs)` entry, POIs inserted in the given x order.
    fn make_scene(groups: &[(f32, &[f32])]) -> (Scene, Vec<Vec<PoiKey>>) {
        let mut scene = Scene::new();
        let mut keys = Vec::new();
        for (z, xs) in groups {
            let mut group = Group::new(Vec3::new(0.0, 0.0, *z));
            let mut group_keys = Vec::new();
            for x in xs.iter() {
                let key = scene.insert(make_poi(PoiCategory::Red, *x, *z));
                group.markers.push(Marker { poi: Some(key) });
                group_keys.push(key);
            }
            scene.add_group(group);
            keys.push(group_keys);
        }
        (scene, keys)
    }

    fn ids(scene: &Scene) -> Vec<Option<u32>> {
        scene.iter().map(|(_, p)| p.identity()).collect()
    }

    // -----------------------------------------------------------------------
    // Ordering
    // -----------------------------------------------------------------------

    #[test]
    fn even_bucket_ascends_odd_bucket_descends() {
        let (mut scene, keys) = make_scene(&[(2.0, &[1.0, 3.0]), (12.0, &[1.0, 3.0])]);
        let mut registry = IdentityRegistry::new(10.0);

        assert_eq!(registry.assign_all(&mut scene).unwrap(), 4);

        let id = |k: PoiKey| scene.get(k).unwrap().identity();
        assert_eq!(id(keys[0][0]), Some(0)); // z=2,  x=1
        assert_eq!(id(keys[0][1]), Some(1)); // z=2,  x=3
        assert_eq!(id(keys[1][1]), Some(2)); // z=12, x=3
        assert_eq!(id(keys[1][0]), Some(3)); // z=12, x=1
    }

    #[test]
    fn groups_are_walked_by_z_not_insertion_order() {
        let (mut scene, keys) = make_scene(&[(25.0, &[0.0]), (3.0, &[0.0]), (14.0, &[0.0])]);
        IdentityRegistry::new(10.0).assign_all(&mut scene).unwrap();

        assert_eq!(scene.get(keys[1][0]).unwrap().identity(), Some(0));
        assert_eq!(scene.get(keys[2][0]).unwrap().identity(), Some(1));
        assert_eq!(scene.get(keys[0][0]).unwrap().identity(), Some(2));
    }

    #[test]
    fn groups_sharing_a_bucket_traverse_the_same_way() {
        // z=11 and z=15 both sit in bucket 1, so both descend.
        let (mut scene, keys) = make_scene(&[(11.0, &[1.0, 5.0]), (15.0, &[2.0, 8.0])]);
        IdentityRegistry::new(10.0).assign_all(&mut scene).unwrap();

        let id = |k: PoiKey| scene.get(k).unwrap().identity();
        assert_eq!(id(keys[0][1]), Some(0));
        assert_eq!(id(keys[0][0]), Some(1));
        assert_eq!(id(keys[1][1]), Some(2));
        assert_eq!(id(keys[1][0]), Some(3));
    }

    #[test]
    fn negative_z_buckets_use_floor() {
        let registry = IdentityRegistry::new(10.0);
        assert_eq!(registry.bucket_of(-0.5), -1);
        assert_eq!(registry.bucket_of(9.99), 0);
        assert_eq!(registry.bucket_of(10.0), 1);

        // Bucket -1 is odd: descending x.
        let (mut scene, keys) = make_scene(&[(-5.0, &[1.0, 3.0])]);
        IdentityRegistry::new(10.0).assign_all(&mut scene).unwrap();
        assert_eq!(scene.get(keys[0][1]).unwrap().identity(), Some(0));
        assert_eq!(scene.get(keys[0][0]).unwrap().identity(), Some(1));
    }

    // -----------------------------------------------------------------------
    // Contiguity & idempotence
    // -----------------------------------------------------------------------

    #[test]
    fn identities_are_contiguous_from_zero() {
        let (mut scene, _) = make_scene(&[
            (0.0, &[4.0, -2.0, 7.0]),
            (18.0, &[1.0]),
            (33.0, &[0.0, 9.0]),
        ]);
        let mut registry = IdentityRegistry::new(10.0);
        registry.assign_all(&mut scene).unwrap();

        let mut assigned: Vec<u32> = ids(&scene).into_iter().flatten().collect();
        assigned.sort_unstable();
        assert_eq!(assigned, (0..6).collect::<Vec<_>>());
        for id in 0..6 {
            let key = registry.lookup(id).unwrap();
            assert_eq!(scene.find_by_identity(id), Some(key));
        }
        assert!(registry.lookup(6).is_none());
    }

    #[test]
    fn reassignment_is_idempotent() {
        let (mut scene, _) = make_scene(&[(2.0, &[1.0, 3.0]), (12.0, &[1.0, 3.0])]);
        let mut registry = IdentityRegistry::new(10.0);

        registry.assign_all(&mut scene).unwrap();
        let first = ids(&scene);
        registry.assign_all(&mut scene).unwrap();
        assert_eq!(ids(&scene), first);
    }

    #[test]
    fn empty_groups_and_empty_markers_are_skipped() {
        let mut scene = Scene::new();
        scene.add_group(Group::new(Vec3::new(0.0, 0.0, 1.0)));

        let key = scene.insert(make_poi(PoiCategory::Green, 0.0, 5.0));
        let mut group = Group::new(Vec3::new(0.0, 0.0, 5.0));
        group.markers.push(Marker { poi: None });
        group.markers.push(Marker { poi: Some(key) });
        scene.add_group(group);

        let n = IdentityRegistry::new(10.0).assign_all(&mut scene).unwrap();
        assert_eq!(n, 1);
        assert_eq!(scene.get(key).unwrap().identity(), Some(0));
    }

    #[test]
    fn ungrouped_poi_has_no_identity() {
        let (mut scene, _) = make_scene(&[(0.0, &[0.0])]);
        let loose = scene.insert(make_poi(PoiCategory::Yellow, 5.0, 5.0));

        IdentityRegistry::new(10.0).assign_all(&mut scene).unwrap();
        assert_eq!(scene.get(loose).unwrap().identity(), None);
    }

    #[test]
    fn duplicate_member_keeps_first_identity() {
        let (mut scene, keys) = make_scene(&[(0.0, &[0.0])]);
        let mut again = Group::new(Vec3::new(0.0, 0.0, 20.0));
        again.markers.push(Marker {
            poi: Some(keys[0][0]),
        });
        scene.add_group(again);

        let n = IdentityRegistry::new(10.0).assign_all(&mut scene).unwrap();
        assert_eq!(n, 1);
        assert_eq!(scene.get(keys[0][0]).unwrap().identity(), Some(0));
    }

    // -----------------------------------------------------------------------
    // Index errors
    // -----------------------------------------------------------------------

    #[test]
    fn out_of_range_member_aborts_without_mutation() {
        let (mut scene, keys) = make_scene(&[(0.0, &[0.0, 1.0])]);
        let mut registry = IdentityRegistry::new(10.0);
        registry.assign_all(&mut scene).unwrap();
        let before = ids(&scene);

        let mut broken = Group::new(Vec3::new(0.0, 0.0, -10.0));
        broken.markers.push(Marker { poi: Some(PoiKey(99)) });
        scene.add_group(broken);

        let err = registry.assign_all(&mut scene).unwrap_err();
        assert!(matches!(
            err,
            TelemetryError::GroupMemberOutOfRange {
                key: PoiKey(99),
                ..
            }
        ));
        assert_eq!(ids(&scene), before);
        assert_eq!(registry.lookup(0), Some(keys[0][0]));
    }

    // -----------------------------------------------------------------------
    // Label words
    // -----------------------------------------------------------------------

    #[test]
    fn word_list_splits_rows_and_cells() {
        let words = parse_word_list("apple, pear\r\n\r\nplum,,\n  fig  \n");
        assert_eq!(words, vec!["apple", "pear", "plum", "fig"]);
        assert!(parse_word_list("").is_empty());
    }

    #[test]
    fn words_go_to_text_pois_in_identity_order() {
        let mut scene = Scene::new();
        let mut group = Group::new(Vec3::ZERO);
        // Inserted out of x order; identities follow ascending x.
        let b = scene.insert(make_poi(PoiCategory::Text, 3.0, 0.0));
        let red = scene.insert(make_poi(PoiCategory::Red, 2.0, 0.0));
        let a = scene.insert(make_poi(PoiCategory::Text, 1.0, 0.0));
        let c = scene.insert(make_poi(PoiCategory::Text, 4.0, 0.0));
        for key in [b, red, a, c] {
            group.markers.push(Marker { poi: Some(key) });
        }
        scene.add_group(group);
        IdentityRegistry::new(10.0).assign_all(&mut scene).unwrap();

        let words = parse_word_list("cat,dog");
        let written = assign_labels_from_words(&mut scene, &words);

        assert_eq!(written, 2);
        assert_eq!(scene.get(a).unwrap().label(), Some("cat"));
        assert_eq!(scene.get(b).unwrap().label(), Some("dog"));
        assert_eq!(scene.get(c).unwrap().label(), Some(""));
        assert_eq!(scene.get(red).unwrap().label(), None);
    }

    #[test]
    fn blank_cell_keeps_its_slot() {
        let words = parse_word_list("apple, ,banana");
        assert_eq!(words, vec!["apple", "", "banana"]);

        let mut scene = Scene::new();
        let mut group = Group::new(Vec3::ZERO);
        let keys: Vec<_> = (0..3)
            .map(|i| scene.insert(make_poi(PoiCategory::Text, i as f32, 0.0)))
            .collect();
        for key in &keys {
            group.markers.push(Marker { poi: Some(*key) });
        }
        scene.add_group(group);
        IdentityRegistry::new(10.0).assign_all(&mut scene).unwrap();

        assert_eq!(assign_labels_from_words(&mut scene, &words), 3);
        assert_eq!(scene.get(keys[1]).unwrap().label(), Some(""));
        assert_eq!(scene.get(keys[2]).unwrap().label(), Some("banana"));
    }
}
