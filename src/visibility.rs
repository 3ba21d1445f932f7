//! Visibility classifier – per-tick distance/alignment telemetry and the
//! two-stage visible-and-unoccluded test.
//!
//! ## Per POI, per tick
//!
//! 1. `distance` and `alignment` are always refreshed.
//! 2. The category's sampler produces four corners (TL, TR, BL, BR).
//! 3. Stage A: if no corner projects inside the view, the POI is hidden and
//!    no rays are cast.
//! 4. Stage B: a ray is cast toward each in-view corner in order; the first
//!    corner that passes the category's occlusion rule makes the POI visible.
//! 5. Only a change from the remembered result touches the [`VisibleSet`].

use crate::geometry::{box_face_corners, GlyphLayout, Ray, SampleCorners};
use crate::observer::Observer;
use crate::registry::VisibleSet;
use crate::scene::{
    ColliderOwner, PhysicsScene, PoiBody, PoiKey, PoiTelemetry, PointOfInterest, Scene,
};
use crate::types::{PoiCategory, TelemetryConfig, Vec3};
use log::{debug, warn};
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// Strategy table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerKind {
    /// Forward face of the POI's box body.
    BoxFace,
    /// Bounding rectangle of the label's glyphs.
    LabelRect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcclusionRule {
    /// The nearest hit along the ray must be the POI's own body.
    SelfHit,
    /// Nothing but the POI itself may lie between observer and sample.
    ClearLineOfSight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryStrategy {
    pub sampler: SamplerKind,
    pub occlusion: OcclusionRule,
}

pub fn strategy_for(category: PoiCategory) -> CategoryStrategy {
    match category {
        PoiCategory::Red | PoiCategory::Yellow | PoiCategory::Green => CategoryStrategy {
            sampler: SamplerKind::BoxFace,
            occlusion: OcclusionRule::SelfHit,
        },
        PoiCategory::Text => CategoryStrategy {
            sampler: SamplerKind::LabelRect,
            occlusion: OcclusionRule::ClearLineOfSight,
        },
    }
}

// ---------------------------------------------------------------------------
// Tick result
// ---------------------------------------------------------------------------

/// Visibility changes produced by a single [`VisibilityClassifier::tick`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// POIs that became visible this tick.
    pub appeared: Vec<PoiKey>,
    /// POIs that stopped being visible this tick.
    pub disappeared: Vec<PoiKey>,
    /// POIs skipped because they lack the body their category needs.
    pub skipped: usize,
}

impl TickReport {
    pub fn transitions(&self) -> usize {
        self.appeared.len() + self.disappeared.len()
    }
}

enum Sample {
    Corners(SampleCorners),
    /// A label that lays out no glyphs: nothing to see.
    Empty,
    /// The body does not match the category.
    MissingBody,
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

pub struct VisibilityClassifier {
    occlusion_epsilon: f32,
    box_face_inset: f32,
    layout: Box<dyn GlyphLayout>,
    geometry_reported: HashSet<PoiKey>,
    transitions: u64,
}

impl VisibilityClassifier {
    pub fn new(config: &TelemetryConfig, layout: Box<dyn GlyphLayout>) -> Self {
        Self {
            occlusion_epsilon: config.occlusion_epsilon,
            box_face_inset: config.box_face_inset,
            layout,
            geometry_reported: HashSet::new(),
            transitions: 0,
        }
    }

    /// Total visibility transitions since construction.
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Classify every POI in `scene` from `observer`'s point of view.
    pub fn tick(
        &mut self,
        scene: &mut Scene,
        observer: &Observer,
        physics: &dyn PhysicsScene,
        visible: &mut VisibleSet,
    ) -> TickReport {
        let mut report = TickReport::default();

        for (key, poi) in scene.iter_mut() {
            let position = poi.position();
            poi.telemetry = PoiTelemetry {
                distance: observer.position.distance(position),
                alignment: observer.alignment_to(position),
            };

            let now_visible = match self.sample(poi) {
                Sample::Corners(corners) => {
                    let rule = strategy_for(poi.category).occlusion;
                    self.is_unoccluded(key, &corners, rule, observer, physics)
                }
                Sample::Empty => false,
                Sample::MissingBody => {
                    if self.geometry_reported.insert(key) {
                        warn!(
                            "POI {} ({}) has no {:?} body; excluded from visibility",
                            key,
                            poi.category,
                            strategy_for(poi.category).sampler
                        );
                    }
                    report.skipped += 1;
                    if !poi.visible {
                        continue;
                    }
                    // A body lost while visible still leaves the set.
                    false
                }
            };

            if now_visible == poi.visible {
                continue;
            }
            poi.visible = now_visible;
            self.transitions += 1;
            if now_visible {
                visible.add(key);
                report.appeared.push(key);
                debug!("POI {} became visible", key);
            } else {
                visible.remove(key);
                report.disappeared.push(key);
                debug!("POI {} left view", key);
            }
        }

        report
    }

    fn sample(&self, poi: &mut PointOfInterest) -> Sample {
        let sampler = strategy_for(poi.category).sampler;
        match (sampler, &mut poi.body) {
            (SamplerKind::BoxFace, PoiBody::Box { half_extents }) => Sample::Corners(
                box_face_corners(&poi.transform, *half_extents, self.box_face_inset),
            ),
            (SamplerKind::LabelRect, PoiBody::Label { text, geometry }) => {
                match geometry.corners(text, self.layout.as_ref(), &poi.transform) {
                    Some(corners) => Sample::Corners(corners),
                    None => Sample::Empty,
                }
            }
            _ => Sample::MissingBody,
        }
    }

    /// Stage A then stage B over the four corners in their fixed order.
    fn is_unoccluded(
        &self,
        key: PoiKey,
        corners: &SampleCorners,
        rule: OcclusionRule,
        observer: &Observer,
        physics: &dyn PhysicsScene,
    ) -> bool {
        let in_view = corners.map(|c| observer.in_view(c));
        if !in_view.contains(&true) {
            return false;
        }

        corners
            .iter()
            .zip(in_view)
            .filter(|(_, seen)| *seen)
            .any(|(corner, _)| self.corner_unoccluded(key, *corner, rule, observer, physics))
    }

    fn corner_unoccluded(
        &self,
        key: PoiKey,
        corner: Vec3,
        rule: OcclusionRule,
        observer: &Observer,
        physics: &dyn PhysicsScene,
    ) -> bool {
        let Some((ray, length)) = Ray::between(observer.position, corner) else {
            return false;
        };
        let own_body = ColliderOwner::Poi(key);

        match rule {
            OcclusionRule::SelfHit => physics
                .raycast(&ray, length + self.occlusion_epsilon)
                .is_some_and(|hit| hit.owner == own_body),
            OcclusionRule::ClearLineOfSight => physics
                .raycast(&ray, (length - self.occlusion_epsilon).max(0.0))
                .map_or(true, |hit| hit.owner == own_body),
        }
    }
}
