//! Geometry sampling: rays, oriented boxes, and the four-corner silhouettes
//! the visibility classifier tests.
//!
//! Every sampler returns its corners in the same fixed order: top-left,
//! top-right, bottom-left, bottom-right.

use crate::types::{Quat, Transform, Vec3};

/// Four world-space sample points, ordered TL, TR, BL, BR.
pub type SampleCorners = [Vec3; 4];

// ---------------------------------------------------------------------------
// Ray
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub direction: Vec3,
}

impl Ray {
    /// Ray from `from` toward `to`, together with the distance between them.
    /// `None` when the two points coincide.
    pub fn between(from: Vec3, to: Vec3) -> Option<(Ray, f32)> {
        let delta = to - from;
        let len = delta.length();
        if len < 1e-6 {
            return None;
        }
        Some((
            Ray {
                origin: from,
                direction: delta / len,
            },
            len,
        ))
    }

    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

// ---------------------------------------------------------------------------
// Oriented bounding box
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obb {
    pub center: Vec3,
    pub rotation: Quat,
    pub half_extents: Vec3,
}

impl Obb {
    pub fn new(center: Vec3, rotation: Quat, half_extents: Vec3) -> Self {
        Self {
            center,
            rotation,
            half_extents,
        }
    }

    /// Box of local half-extents `half_extents` placed by `transform`
    /// (scale folded into the extents).
    pub fn from_transform(transform: &Transform, half_extents: Vec3) -> Self {
        let s = transform.scale;
        Self {
            center: transform.position,
            rotation: transform.rotation,
            half_extents: Vec3::new(
                (half_extents.x * s.x).abs(),
                (half_extents.y * s.y).abs(),
                (half_extents.z * s.z).abs(),
            ),
        }
    }

    fn to_local(&self, world: Vec3) -> Vec3 {
        self.rotation.conjugate().rotate(world - self.center)
    }

    pub fn contains(&self, point: Vec3) -> bool {
        let p = self.to_local(point);
        let h = self.half_extents;
        p.x.abs() <= h.x && p.y.abs() <= h.y && p.z.abs() <= h.z
    }

    /// Distance along `ray` to the first surface crossing, using the slab
    /// method in box-local space.
    ///
    /// A ray that starts inside the box does not report a hit.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let o = self.to_local(ray.origin);
        let d = self.rotation.conjugate().rotate(ray.direction);
        let h = self.half_extents;

        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;
        for (o, d, h) in [(o.x, d.x, h.x), (o.y, d.y, h.y), (o.z, d.z, h.z)] {
            if d.abs() < 1e-8 {
                if o.abs() > h {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let t1 = (-h - o) * inv;
            let t2 = (h - o) * inv;
            t_min = t_min.max(t1.min(t2));
            t_max = t_max.min(t1.max(t2));
            if t_min > t_max {
                return None;
            }
        }

        if t_min < 0.0 {
            return None;
        }
        Some(t_min)
    }
}

// ---------------------------------------------------------------------------
// Box sampler
// ---------------------------------------------------------------------------

/// Corners of the forward (+Z) face of a box, pulled `inset` local units
/// inside the face.
pub fn box_face_corners(transform: &Transform, half_extents: Vec3, inset: f32) -> SampleCorners {
    let hx = half_extents.x;
    let hy = half_extents.y;
    let z = half_extents.z - inset;
    [
        Vec3::new(-hx, hy, z),
        Vec3::new(hx, hy, z),
        Vec3::new(-hx, -hy, z),
        Vec3::new(hx, -hy, z),
    ]
    .map(|local| transform.transform_point(local))
}

// ---------------------------------------------------------------------------
// Label sampler
// ---------------------------------------------------------------------------

/// Tight bounds of laid-out glyphs in the label's local plane (z = 0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextExtent {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

/// Glyph layout engine. Returns `None` when the text renders no glyphs.
pub trait GlyphLayout: Send + Sync {
    fn measure(&self, text: &str) -> Option<TextExtent>;
}

/// Fixed-advance layout, centred on the label origin both ways.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonospaceLayout {
    pub advance: f32,
    pub line_height: f32,
}

impl Default for MonospaceLayout {
    fn default() -> Self {
        Self {
            advance: 0.5,
            line_height: 1.0,
        }
    }
}

impl GlyphLayout for MonospaceLayout {
    fn measure(&self, text: &str) -> Option<TextExtent> {
        let lines: Vec<&str> = text.lines().collect();
        let block_height = lines.len() as f32 * self.line_height;
        let top = block_height * 0.5;

        let mut extent: Option<TextExtent> = None;
        for (row, line) in lines.iter().enumerate() {
            let chars: Vec<char> = line.chars().collect();
            let Some(first) = chars.iter().position(|c| !c.is_whitespace()) else {
                continue;
            };
            let last = chars
                .iter()
                .rposition(|c| !c.is_whitespace())
                .unwrap_or(first);

            let left = -(chars.len() as f32 * self.advance) * 0.5;
            let line_top = top - row as f32 * self.line_height;
            let glyphs = TextExtent {
                min_x: left + first as f32 * self.advance,
                max_x: left + (last + 1) as f32 * self.advance,
                min_y: line_top - self.line_height,
                max_y: line_top,
            };

            extent = Some(match extent {
                None => glyphs,
                Some(e) => TextExtent {
                    min_x: e.min_x.min(glyphs.min_x),
                    max_x: e.max_x.max(glyphs.max_x),
                    min_y: e.min_y.min(glyphs.min_y),
                    max_y: e.max_y.max(glyphs.max_y),
                },
            });
        }
        extent
    }
}

/// Cached label rectangle. Glyph layout runs only when the text differs from
/// the text it was last computed for.
#[derive(Debug, Clone, Default)]
pub struct LabelGeometry {
    cached_text: Option<String>,
    local_corners: Option<SampleCorners>,
    layout_passes: u64,
}

impl LabelGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn corners(
        &mut self,
        text: &str,
        layout: &dyn GlyphLayout,
        transform: &Transform,
    ) -> Option<SampleCorners> {
        if self.cached_text.as_deref() != Some(text) {
            self.local_corners = layout.measure(text).map(|e| {
                [
                    Vec3::new(e.min_x, e.max_y, 0.0),
                    Vec3::new(e.max_x, e.max_y, 0.0),
                    Vec3::new(e.min_x, e.min_y, 0.0),
                    Vec3::new(e.max_x, e.min_y, 0.0),
                ]
            });
            self.cached_text = Some(text.to_owned());
            self.layout_passes += 1;
        }
        self.local_corners
            .map(|local| local.map(|p| transform.transform_point(p)))
    }

    /// How many times glyph layout has run for this label.
    pub fn layout_passes(&self) -> u64 {
        self.layout_passes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn ray_hits_front_face_of_unit_box() {
        let obb = Obb::new(Vec3::new(0.0, 0.0, 5.0), Quat::IDENTITY, Vec3::ONE * 0.5);
        let (ray, _) = Ray::between(Vec3::ZERO, Vec3::new(0.0, 0.0, 10.0)).unwrap();
        let t = obb.intersect_ray(&ray).unwrap();
        assert!(approx(t, 4.5), "t = {t}");
    }

    #[test]
    fn ray_misses_box_to_the_side() {
        let obb = Obb::new(Vec3::new(3.0, 0.0, 5.0), Quat::IDENTITY, Vec3::ONE * 0.5);
        let (ray, _) = Ray::between(Vec3::ZERO, Vec3::new(0.0, 0.0, 10.0)).unwrap();
        assert!(obb.intersect_ray(&ray).is_none());
    }

    #[test]
    fn ray_starting_inside_box_reports_no_hit() {
        let obb = Obb::new(Vec3::ZERO, Quat::IDENTITY, Vec3::ONE);
        let (ray, _) = Ray::between(Vec3::ZERO, Vec3::new(0.0, 0.0, 10.0)).unwrap();
        assert!(obb.intersect_ray(&ray).is_none());
    }

    #[test]
    fn rotated_box_is_hit_on_its_rotated_extent() {
        // Long thin box turned 90 degrees so its length lies along Z.
        let obb = Obb::new(
            Vec3::new(0.0, 0.0, 10.0),
            Quat::from_yaw_deg(90.0),
            Vec3::new(4.0, 0.5, 0.5),
        );
        let (ray, _) = Ray::between(Vec3::ZERO, Vec3::new(0.0, 0.0, 20.0)).unwrap();
        let t = obb.intersect_ray(&ray).unwrap();
        assert!(approx(t, 6.0), "t = {t}");
    }
}
