//! Observer: the moving viewpoint, its view volume, and the session clock
//! that stamps telemetry.

use crate::types::{Quat, Vec3};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Observer / view volume
// ---------------------------------------------------------------------------

/// Perspective viewpoint. Yaw and pitch are degrees; yaw 0 faces +Z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observer {
    pub position: Vec3,
    pub yaw: f32,
    #[serde(default)]
    pub pitch: f32,
    /// Vertical field of view in degrees.
    #[serde(default = "default_fov")]
    pub fov_y: f32,
    /// Width / height.
    #[serde(default = "default_aspect")]
    pub aspect: f32,
}

fn default_fov() -> f32 {
    60.0
}

fn default_aspect() -> f32 {
    16.0 / 9.0
}

impl Observer {
    pub fn new(position: Vec3, yaw: f32) -> Self {
        Self {
            position,
            yaw,
            pitch: 0.0,
            fov_y: default_fov(),
            aspect: default_aspect(),
        }
    }

    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch;
        self
    }

    pub fn with_lens(mut self, fov_y: f32, aspect: f32) -> Self {
        self.fov_y = fov_y;
        self.aspect = aspect;
        self
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_euler_deg(self.pitch, self.yaw, 0.0)
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation().rotate(Vec3::FORWARD)
    }

    pub fn right(&self) -> Vec3 {
        self.rotation().rotate(Vec3::new(1.0, 0.0, 0.0))
    }

    pub fn up(&self) -> Vec3 {
        self.rotation().rotate(Vec3::UP)
    }

    /// Project a world point into normalised viewport space: `x` and `y` in
    /// `[0, 1]` across the view, `z` the depth along the forward axis.
    /// Points on or behind the view plane have NaN `x` and `y`.
    pub fn world_to_viewport(&self, point: Vec3) -> Vec3 {
        let rel = point - self.position;
        let depth = rel.dot(self.forward());
        if depth <= 0.0 {
            return Vec3::new(f32::NAN, f32::NAN, depth);
        }

        let half_h = (self.fov_y.to_radians() * 0.5).tan();
        let half_w = half_h * self.aspect;
        let sx = rel.dot(self.right()) / (depth * half_w);
        let sy = rel.dot(self.up()) / (depth * half_h);
        Vec3::new(0.5 + sx * 0.5, 0.5 + sy * 0.5, depth)
    }

    /// True when the point projects inside the view rectangle in front of
    /// the observer.
    pub fn in_view(&self, point: Vec3) -> bool {
        let v = self.world_to_viewport(point);
        v.z > 0.0 && (0.0..=1.0).contains(&v.x) && (0.0..=1.0).contains(&v.y)
    }

    /// 1 dead centre, falling linearly to 0 at 90 degrees off-axis and beyond.
    pub fn alignment_to(&self, point: Vec3) -> f32 {
        let angle = self.forward().angle_deg(point - self.position);
        1.0 - (angle / 90.0).clamp(0.0, 1.0)
    }

    /// Yaw wrapped into `[0, 360)`.
    pub fn heading(&self) -> f32 {
        let h = self.yaw.rem_euclid(360.0);
        if h >= 360.0 {
            0.0
        } else {
            h
        }
    }
}

// ---------------------------------------------------------------------------
// Observer state provider
// ---------------------------------------------------------------------------

/// Observer state captured at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObserverSnapshot {
    pub position: Vec3,
    /// Degrees in `[0, 360)`.
    pub yaw: f32,
    /// Seconds since the session clock started.
    pub elapsed: f64,
}

pub trait ObserverStateProvider {
    fn observer_snapshot(&self) -> ObserverSnapshot;
}

/// Follows the live observer and owns the session clock.
#[derive(Debug, Clone)]
pub struct ObserverTracker {
    observer: Observer,
    now: f64,
    session_start: f64,
}

impl ObserverTracker {
    pub fn new(observer: Observer, now: f64) -> Self {
        Self {
            observer,
            now,
            session_start: now,
        }
    }

    pub fn update(&mut self, observer: Observer, now: f64) {
        self.observer = observer;
        self.now = now;
    }

    /// Restart elapsed time from the current instant.
    pub fn reset_session_time(&mut self) {
        self.session_start = self.now;
    }

    pub fn observer(&self) -> &Observer {
        &self.observer
    }

    pub fn elapsed(&self) -> f64 {
        self.now - self.session_start
    }
}

impl ObserverStateProvider for ObserverTracker {
    fn observer_snapshot(&self) -> ObserverSnapshot {
        ObserverSnapshot {
            position: self.observer.position,
            yaw: self.observer.heading(),
            elapsed: self.elapsed(),
        }
    }
}
