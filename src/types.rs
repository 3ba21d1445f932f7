//! Core types shared across all modules.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use crate::error::{Result, TelemetryError};

// ---------------------------------------------------------------------------
// Basic math
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);
    pub const ONE: Vec3 = Vec3::new(1.0, 1.0, 1.0);
    pub const UP: Vec3 = Vec3::new(0.0, 1.0, 0.0);
    /// Canonical forward axis (+Z).
    pub const FORWARD: Vec3 = Vec3::new(0.0, 0.0, 1.0);

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::ZERO
    }

    #[inline]
    pub fn dot(self, rhs: Vec3) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    #[inline]
    pub fn cross(self, rhs: Vec3) -> Vec3 {
        Vec3 {
            x: self.y * rhs.z - self.z * rhs.y,
            y: self.z * rhs.x - self.x * rhs.z,
            z: self.x * rhs.y - self.y * rhs.x,
        }
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    #[inline]
    pub fn distance(self, other: Vec3) -> f32 {
        (other - self).length()
    }

    #[inline]
    pub fn normalized(self) -> Vec3 {
        let len = self.length();
        if len > 0.0 {
            self / len
        } else {
            self
        }
    }

    /// Component-wise product.
    #[inline]
    pub fn scale(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x * rhs.x, self.y * rhs.y, self.z * rhs.z)
    }

    /// Unsigned angle between two vectors in degrees (0..=180).
    ///
    /// Returns 0 when either vector is degenerate.
    pub fn angle_deg(self, other: Vec3) -> f32 {
        let denom = (self.dot(self) * other.dot(other)).sqrt();
        if denom < 1e-15 {
            return 0.0;
        }
        (self.dot(other) / denom).clamp(-1.0, 1.0).acos().to_degrees()
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    #[inline]
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    #[inline]
    fn add_assign(&mut self, rhs: Vec3) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    #[inline]
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl SubAssign for Vec3 {
    #[inline]
    fn sub_assign(&mut self, rhs: Vec3) {
        self.x -= rhs.x;
        self.y -= rhs.y;
        self.z -= rhs.z;
    }
}

impl Neg for Vec3 {
    type Output = Vec3;
    #[inline]
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    #[inline]
    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Div<f32> for Vec3 {
    type Output = Vec3;
    #[inline]
    fn div(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

// ---------------------------------------------------------------------------
// Rotation
// ---------------------------------------------------------------------------

/// Unit quaternion. Y is up, +Z is forward; positive yaw turns +Z toward +X
/// and positive pitch tips the forward axis downward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    pub const IDENTITY: Quat = Quat {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    pub fn from_axis_angle_deg(axis: Vec3, degrees: f32) -> Self {
        let axis = axis.normalized();
        let half = degrees.to_radians() * 0.5;
        let s = half.sin();
        Self {
            x: axis.x * s,
            y: axis.y * s,
            z: axis.z * s,
            w: half.cos(),
        }
    }

    /// Euler angles in degrees, applied roll (Z) first, then pitch (X), then
    /// yaw (Y).
    pub fn from_euler_deg(pitch: f32, yaw: f32, roll: f32) -> Self {
        let qy = Self::from_axis_angle_deg(Vec3::UP, yaw);
        let qx = Self::from_axis_angle_deg(Vec3::new(1.0, 0.0, 0.0), pitch);
        let qz = Self::from_axis_angle_deg(Vec3::FORWARD, roll);
        qy * qx * qz
    }

    pub fn from_yaw_deg(yaw: f32) -> Self {
        Self::from_axis_angle_deg(Vec3::UP, yaw)
    }

    #[inline]
    pub fn conjugate(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
            w: self.w,
        }
    }

    /// Rotate `v` by this quaternion.
    #[inline]
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let q = Vec3::new(self.x, self.y, self.z);
        let t = q.cross(v) * 2.0;
        v + t * self.w + q.cross(t)
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Quat {
    type Output = Quat;
    fn mul(self, r: Quat) -> Quat {
        Quat {
            w: self.w * r.w - self.x * r.x - self.y * r.y - self.z * r.z,
            x: self.w * r.x + self.x * r.w + self.y * r.z - self.z * r.y,
            y: self.w * r.y - self.x * r.z + self.y * r.w + self.z * r.x,
            z: self.w * r.z + self.x * r.y - self.y * r.x + self.z * r.w,
        }
    }
}

// ---------------------------------------------------------------------------
// Transform
// ---------------------------------------------------------------------------

/// Local-to-world placement of a scene node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Quat,
    #[serde(default = "unit_scale")]
    pub scale: Vec3,
}

fn unit_scale() -> Vec3 {
    Vec3::ONE
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Map a point from local space to world space.
    #[inline]
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation.rotate(local.scale(self.scale))
    }

    /// Map a direction from local space to world space (no translation, no
    /// scale).
    #[inline]
    pub fn transform_direction(&self, local: Vec3) -> Vec3 {
        self.rotation.rotate(local)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::from_position(Vec3::ZERO)
    }
}

// ---------------------------------------------------------------------------
// POI category
// ---------------------------------------------------------------------------

/// Closed set of POI categories: three colour classes and a text label.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PoiCategory {
    Red,
    Yellow,
    Green,
    Text,
}

impl PoiCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoiCategory::Red => "RED",
            PoiCategory::Yellow => "YELLOW",
            PoiCategory::Green => "GREEN",
            PoiCategory::Text => "TEXT",
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, PoiCategory::Text)
    }
}

impl std::fmt::Display for PoiCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Stats & config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionStats {
    pub tracked_pois: usize,
    pub visible_pois: usize,
    pub identities_assigned: usize,
    pub total_ticks: u64,
    pub total_transitions: u64,
    pub events_published: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Number of POI slots in every event packet and flattened row.
    pub max_visible_pois: usize,
    /// Width of an identity-assignment bucket along the grouping axis.
    pub bucket_size: f32,
    /// Slack added to the ray length when testing for a self-hit.
    pub occlusion_epsilon: f32,
    /// How far inside the forward face box sample points sit.
    pub box_face_inset: f32,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            max_visible_pois: 4,
            bucket_size: 10.0,
            occlusion_epsilon: 0.05,
            box_face_inset: 0.01,
        }
    }
}

impl TelemetryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_visible_pois == 0 {
            return Err(TelemetryError::InvalidConfig(
                "max_visible_pois must be at least 1".into(),
            ));
        }
        if !self.bucket_size.is_finite() || self.bucket_size <= 0.0 {
            return Err(TelemetryError::InvalidConfig(format!(
                "bucket_size must be positive, got {}",
                self.bucket_size
            )));
        }
        if !self.occlusion_epsilon.is_finite() || self.occlusion_epsilon < 0.0 {
            return Err(TelemetryError::InvalidConfig(format!(
                "occlusion_epsilon must be non-negative, got {}",
                self.occlusion_epsilon
            )));
        }
        if !self.box_face_inset.is_finite() || self.box_face_inset < 0.0 {
            return Err(TelemetryError::InvalidConfig(format!(
                "box_face_inset must be non-negative, got {}",
                self.box_face_inset
            )));
        }
        Ok(())
    }
}
