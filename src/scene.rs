//! Scene subsystem: POIs, their placement groups, and the collision world
//! the occlusion test casts rays against.

use crate::geometry::{LabelGeometry, Obb, Ray};
use crate::types::{PoiCategory, Transform, Vec3};

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Slot of a POI inside its [`Scene`]. Stable for the lifetime of the scene.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct PoiKey(pub usize);

impl std::fmt::Display for PoiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Point of interest
// ---------------------------------------------------------------------------

/// Renderable body of a POI. `Missing` stands for a marker whose prefab
/// never got its box or label component.
#[derive(Debug, Clone)]
pub enum PoiBody {
    Box { half_extents: Vec3 },
    Label { text: String, geometry: LabelGeometry },
    Missing,
}

impl PoiBody {
    pub fn unit_box() -> Self {
        PoiBody::Box {
            half_extents: Vec3::ONE * 0.5,
        }
    }

    pub fn label(text: impl Into<String>) -> Self {
        PoiBody::Label {
            text: text.into(),
            geometry: LabelGeometry::new(),
        }
    }
}

/// Per-frame telemetry kept up to date by the visibility classifier.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PoiTelemetry {
    /// World units from the observer to the POI origin.
    pub distance: f32,
    /// 1 = dead centre, 0 = 90 degrees or more off-axis.
    pub alignment: f32,
}

#[derive(Debug, Clone)]
pub struct PointOfInterest {
    pub(crate) identity: Option<u32>,
    pub category: PoiCategory,
    pub transform: Transform,
    pub body: PoiBody,
    pub(crate) telemetry: PoiTelemetry,
    pub(crate) visible: bool,
}

impl PointOfInterest {
    pub fn new(category: PoiCategory, transform: Transform, body: PoiBody) -> Self {
        Self {
            identity: None,
            category,
            transform,
            body,
            telemetry: PoiTelemetry::default(),
            visible: false,
        }
    }

    pub fn identity(&self) -> Option<u32> {
        self.identity
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    pub fn telemetry(&self) -> PoiTelemetry {
        self.telemetry
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn label(&self) -> Option<&str> {
        match &self.body {
            PoiBody::Label { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Replace the label text. Returns `false` when the POI has no label
    /// body. The sampler notices the change on its next pass.
    pub fn set_label(&mut self, new_text: &str) -> bool {
        match &mut self.body {
            PoiBody::Label { text, .. } => {
                new_text.clone_into(text);
                true
            }
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

/// A placement slot inside a group. `poi` is `None` when nothing was
/// spawned under the marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub poi: Option<PoiKey>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// Group origin; only `z` (sequencing) and the members' `x` matter for
    /// identity assignment.
    pub position: Vec3,
    pub markers: Vec<Marker>,
}

impl Group {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            markers: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

/// Owns every POI and placement group.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pois: Vec<PointOfInterest>,
    groups: Vec<Group>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, poi: PointOfInterest) -> PoiKey {
        self.pois.push(poi);
        PoiKey(self.pois.len() - 1)
    }

    pub fn add_group(&mut self, group: Group) -> usize {
        self.groups.push(group);
        self.groups.len() - 1
    }

    pub fn get(&self, key: PoiKey) -> Option<&PointOfInterest> {
        self.pois.get(key.0)
    }

    pub fn get_mut(&mut self, key: PoiKey) -> Option<&mut PointOfInterest> {
        self.pois.get_mut(key.0)
    }

    pub fn len(&self) -> usize {
        self.pois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pois.is_empty()
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn iter(&self) -> impl Iterator<Item = (PoiKey, &PointOfInterest)> {
        self.pois.iter().enumerate().map(|(i, p)| (PoiKey(i), p))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (PoiKey, &mut PointOfInterest)> {
        self.pois.iter_mut().enumerate().map(|(i, p)| (PoiKey(i), p))
    }

    /// Key of the POI currently holding `identity`.
    pub fn find_by_identity(&self, identity: u32) -> Option<PoiKey> {
        self.iter()
            .find(|(_, p)| p.identity == Some(identity))
            .map(|(k, _)| k)
    }
}

// ---------------------------------------------------------------------------
// Collision world
// ---------------------------------------------------------------------------

/// Who a collider belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColliderOwner {
    /// Part of a POI's own body.
    Poi(PoiKey),
    /// Walls, props and anything else that can block a line of sight.
    Static,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collider {
    pub shape: Obb,
    pub owner: ColliderOwner,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub distance: f32,
    pub owner: ColliderOwner,
}

/// Ray-cast backend for the occlusion test.
pub trait PhysicsScene {
    /// Nearest surface hit along `ray` no further than `max_distance`.
    fn raycast(&self, ray: &Ray, max_distance: f32) -> Option<RayHit>;
}

/// Flat list of box colliders. Brute force, which is fine for the few
/// hundred colliders an experiment scene holds.
#[derive(Debug, Clone, Default)]
pub struct CollisionWorld {
    colliders: Vec<Collider>,
}

impl CollisionWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, shape: Obb, owner: ColliderOwner) {
        self.colliders.push(Collider { shape, owner });
    }

    pub fn add_static(&mut self, shape: Obb) {
        self.add(shape, ColliderOwner::Static);
    }

    /// Register a box collider for every POI with a box body.
    pub fn add_poi_bodies(&mut self, scene: &Scene) {
        for (key, poi) in scene.iter() {
            if let PoiBody::Box { half_extents } = poi.body {
                self.add(
                    Obb::from_transform(&poi.transform, half_extents),
                    ColliderOwner::Poi(key),
                );
            }
        }
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }
}

impl PhysicsScene for CollisionWorld {
    fn raycast(&self, ray: &Ray, max_distance: f32) -> Option<RayHit> {
        self.colliders
            .iter()
            .filter_map(|c| {
                c.shape
                    .intersect_ray(ray)
                    .filter(|t| *t <= max_distance)
                    .map(|distance| RayHit {
                        distance,
                        owner: c.owner,
                    })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}
