//! Scene and replay file formats.
//!
//! These are the JSON shapes the replay driver reads. Scene authoring and
//! locomotion live elsewhere; their output crosses into this crate only
//! through these types.
//!
//! ## Files
//!
//! | Type                 | Contents                                           |
//! |----------------------|----------------------------------------------------|
//! | [`SceneDescription`] | groups → markers → optional POI, obstacles, route  |
//! | [`ReplayScript`]     | timestamped observer poses with optional events    |
//!
//! ## Design rules
//!
//! 1. Every struct is `Serialize + Deserialize` with snake_case JSON.
//! 2. Angles are degrees; positions are world units.
//! 3. Marker offsets are local to their group; the group's yaw applies.

use crate::checkpoint::{Checkpoint, CheckpointTrack};
use crate::error::{Result, TelemetryError};
use crate::geometry::Obb;
use crate::observer::Observer;
use crate::scene::{CollisionWorld, Group, Marker, PoiBody, PointOfInterest, Scene};
use crate::types::{PoiCategory, Quat, Transform, Vec3};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Scene description
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneDescription {
    #[serde(default)]
    pub groups: Vec<GroupDesc>,
    /// Static geometry that can block lines of sight.
    #[serde(default)]
    pub obstacles: Vec<ObstacleDesc>,
    /// Route checkpoints, in route order.
    #[serde(default)]
    pub checkpoints: Vec<Checkpoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDesc {
    pub position: Vec3,
    #[serde(default)]
    pub yaw: f32,
    #[serde(default)]
    pub markers: Vec<MarkerDesc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerDesc {
    /// Offset from the group origin, in group space.
    pub offset: Vec3,
    /// `None` for a marker with nothing spawned under it.
    #[serde(default)]
    pub poi: Option<PoiDesc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoiDesc {
    pub category: PoiCategory,
    /// Yaw relative to the group.
    #[serde(default)]
    pub yaw: f32,
    #[serde(default)]
    pub scale: Option<Vec3>,
    /// Defaults to a unit box for colour POIs and an empty label for TEXT.
    #[serde(default)]
    pub body: Option<BodyDesc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BodyDesc {
    Box { half_extents: Vec3 },
    Label { text: String },
    /// Prefab without its box or label component.
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleDesc {
    pub center: Vec3,
    pub half_extents: Vec3,
    #[serde(default)]
    pub yaw: f32,
}

/// Everything a session needs, built from a [`SceneDescription`].
pub struct BuiltScene {
    pub scene: Scene,
    pub world: CollisionWorld,
    pub checkpoints: CheckpointTrack,
}

impl SceneDescription {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Instantiate POIs under their markers and register every collider.
    pub fn build(&self) -> Result<BuiltScene> {
        let mut scene = Scene::new();
        let mut world = CollisionWorld::new();

        for (gi, g) in self.groups.iter().enumerate() {
            check_finite(g.position, || format!("group {gi} position"))?;
            let group_rot = Quat::from_yaw_deg(g.yaw);
            let mut group = Group::new(g.position);

            for (mi, m) in g.markers.iter().enumerate() {
                let Some(desc) = &m.poi else {
                    group.markers.push(Marker { poi: None });
                    continue;
                };
                check_finite(m.offset, || format!("group {gi} marker {mi} offset"))?;

                let transform = Transform::from_position(g.position + group_rot.rotate(m.offset))
                    .with_rotation(group_rot * Quat::from_yaw_deg(desc.yaw))
                    .with_scale(desc.scale.unwrap_or(Vec3::ONE));
                let body = desc.body_or_default();
                if let PoiBody::Box { half_extents } = &body {
                    check_positive(*half_extents, || format!("group {gi} marker {mi} box"))?;
                }

                let key = scene.insert(PointOfInterest::new(desc.category, transform, body));
                group.markers.push(Marker { poi: Some(key) });
            }
            scene.add_group(group);
        }

        world.add_poi_bodies(&scene);
        for (oi, o) in self.obstacles.iter().enumerate() {
            check_finite(o.center, || format!("obstacle {oi} center"))?;
            check_positive(o.half_extents, || format!("obstacle {oi}"))?;
            world.add_static(Obb::new(o.center, Quat::from_yaw_deg(o.yaw), o.half_extents));
        }

        Ok(BuiltScene {
            scene,
            world,
            checkpoints: CheckpointTrack::new(self.checkpoints.clone()),
        })
    }
}

impl PoiDesc {
    fn body_or_default(&self) -> PoiBody {
        match &self.body {
            Some(BodyDesc::Box { half_extents }) => PoiBody::Box {
                half_extents: *half_extents,
            },
            Some(BodyDesc::Label { text }) => PoiBody::label(text.clone()),
            Some(BodyDesc::None) => PoiBody::Missing,
            None if self.category.is_text() => PoiBody::label(String::new()),
            None => PoiBody::unit_box(),
        }
    }
}

fn check_finite(v: Vec3, what: impl FnOnce() -> String) -> Result<()> {
    if v.x.is_finite() && v.y.is_finite() && v.z.is_finite() {
        Ok(())
    } else {
        Err(TelemetryError::InvalidScene(format!("{} is not finite", what())))
    }
}

fn check_positive(v: Vec3, what: impl FnOnce() -> String) -> Result<()> {
    if v.x > 0.0 && v.y > 0.0 && v.z > 0.0 && v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
    {
        Ok(())
    } else {
        Err(TelemetryError::InvalidScene(format!(
            "{} half-extents must be positive, got {}",
            what(),
            v
        )))
    }
}

// ---------------------------------------------------------------------------
// Replay script
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayScript {
    pub frames: Vec<ReplayFrame>,
}

/// Observer pose at one instant, plus whatever happened on that frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayFrame {
    /// Seconds on the host clock.
    pub time: f64,
    pub observer: Observer,
    #[serde(default)]
    pub event: Option<ReplayEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayEvent {
    /// The observer reached checkpoint `index`.
    Checkpoint { index: usize },
    /// The participant pressed the attention key.
    Attention,
    /// Restart the session clock.
    ResetClock,
}

impl ReplayScript {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
