//! Visible-set registry: which POIs are visible right now.
//!
//! Only the visibility classifier writes to it, and only on a visibility
//! transition. Readers get detached, distance-sorted snapshots.

use crate::scene::{PoiKey, Scene};
use crate::telemetry::{PoiProvider, PoiSnapshot};
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct VisibleSet {
    members: HashSet<PoiKey>,
}

impl VisibleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the POI was not already present.
    pub(crate) fn add(&mut self, key: PoiKey) -> bool {
        self.members.insert(key)
    }

    /// Returns `true` if the POI was present.
    pub(crate) fn remove(&mut self, key: PoiKey) -> bool {
        self.members.remove(&key)
    }

    pub fn contains(&self, key: PoiKey) -> bool {
        self.members.contains(&key)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Fresh copy of every visible POI's current state, nearest first.
    /// Equal distances fall back to identity so the order is reproducible.
    pub fn snapshot(&self, scene: &Scene) -> Vec<PoiSnapshot> {
        let mut out: Vec<PoiSnapshot> = self
            .members
            .iter()
            .filter_map(|&key| scene.get(key).map(PoiSnapshot::capture))
            .collect();
        out.sort_by(PoiSnapshot::nearest_first);
        out
    }

    /// Borrowed provider view over this set and the scene it indexes.
    pub fn view<'a>(&'a self, scene: &'a Scene) -> VisiblePois<'a> {
        VisiblePois { set: self, scene }
    }
}

/// [`PoiProvider`] backed by a [`VisibleSet`].
pub struct VisiblePois<'a> {
    set: &'a VisibleSet,
    scene: &'a Scene,
}

impl PoiProvider for VisiblePois<'_> {
    fn visible_pois(&self) -> Vec<PoiSnapshot> {
        self.set.snapshot(self.scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{PoiBody, PointOfInterest};
    use crate::types::{PoiCategory, Transform, Vec3};

    fn scene_with_distances(distances: &[f32]) -> Scene {
        let mut scene = Scene::new();
        for (i, d) in distances.iter().enumerate() {
            let mut poi = PointOfInterest::new(
                PoiCategory::Red,
                Transform::from_position(Vec3::new(i as f32, 0.0, *d)),
                PoiBody::unit_box(),
            );
            poi.identity = Some(i as u32);
            poi.telemetry.distance = *d;
            scene.insert(poi);
        }
        scene
    }

    #[test]
    fn add_is_idempotent() {
        let mut set = VisibleSet::new();
        assert!(set.add(PoiKey(0)));
        assert!(!set.add(PoiKey(0)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn remove_of_absent_is_a_no_op() {
        let mut set = VisibleSet::new();
        assert!(!set.remove(PoiKey(3)));
        set.add(PoiKey(3));
        assert!(set.remove(PoiKey(3)));
        assert!(!set.contains(PoiKey(3)));
        assert!(set.is_empty());
    }

    #[test]
    fn snapshot_is_sorted_nearest_first() {
        let scene = scene_with_distances(&[9.0, 2.0, 5.0]);
        let mut set = VisibleSet::new();
        for k in 0..3 {
            set.add(PoiKey(k));
        }
        let ids: Vec<Option<u32>> = set.snapshot(&scene).iter().map(|s| s.identity).collect();
        assert_eq!(ids, vec![Some(1), Some(2), Some(0)]);
    }

    #[test]
    fn snapshot_is_a_detached_copy() {
        let scene = scene_with_distances(&[1.0, 2.0]);
        let mut set = VisibleSet::new();
        set.add(PoiKey(0));
        set.add(PoiKey(1));

        let mut first = set.snapshot(&scene);
        first.clear();
        first.push(PoiSnapshot::capture(scene.get(PoiKey(0)).unwrap()));

        let second = set.snapshot(&scene);
        assert_eq!(second.len(), 2);
        assert_eq!(set.len(), 2);
    }
}
