//! Vector helpers, rays and surface tracing

use glam::{Vec2, Vec3};

/// Lengths at or below this are treated as zero
pub const EPSILON: f32 = 1.0e-5;

/// How far behind a surface a ray may start and still count as touching it
pub const SURFACE_TOLERANCE: f32 = 1.0e-3;

/// Planar (XY) helpers that glam does not provide
pub trait VecExt {
    /// Length of the XY projection
    fn length_xy(self) -> f32;
    /// Clamp the XY magnitude to `max`, leaving Z untouched
    fn clamp_length_xy(self, max: f32) -> Self;
    /// Heading of the XY projection in radians
    fn heading(self) -> f32;
}

impl VecExt for Vec3 {
    fn length_xy(self) -> f32 {
        self.truncate().length()
    }

    fn clamp_length_xy(self, max: f32) -> Self {
        let planar = self.truncate();
        let length = planar.length();
        if length > max && length > EPSILON {
            (planar * (max / length)).extend(self.z)
        } else {
            self
        }
    }

    fn heading(self) -> f32 {
        self.truncate().heading()
    }
}

impl VecExt for Vec2 {
    fn length_xy(self) -> f32 {
        self.length()
    }

    fn clamp_length_xy(self, max: f32) -> Self {
        self.clamp_length_max(max.max(0.0))
    }

    fn heading(self) -> f32 {
        if self.length_squared() <= EPSILON * EPSILON {
            0.0
        } else {
            self.y.atan2(self.x)
        }
    }
}

/// Unit vector in the XY plane pointing along `heading` radians
pub fn planar_direction(heading: f32) -> Vec3 {
    Vec2::from_angle(heading).extend(0.0)
}

/// What a trace hit, as an index into the owning world collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Fighter(usize),
    Prop(usize),
}

/// Result of tracing a ray against a surface or body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceResult {
    /// Point where the ray met the surface
    pub position: Vec3,
    /// Surface normal facing the incoming ray
    pub normal: Vec3,
    pub collided: bool,
    /// Distance travelled along the ray before the hit
    pub distance: f32,
    /// The hit was on the top face of a body (something can stand there)
    pub top_face: bool,
    /// Filled in by the caller, tracers leave it empty
    pub target: Option<HitTarget>,
}

impl TraceResult {
    pub fn miss() -> Self {
        Self {
            position: Vec3::ZERO,
            normal: Vec3::ZERO,
            collided: false,
            distance: f32::INFINITY,
            top_face: false,
            target: None,
        }
    }

    pub fn hit(position: Vec3, normal: Vec3, distance: f32) -> Self {
        Self {
            position,
            normal,
            collided: true,
            distance,
            top_face: false,
            target: None,
        }
    }

    /// True if this is a hit closer than whatever `best` currently holds
    pub fn beats(&self, best: &Option<TraceResult>) -> bool {
        self.collided && best.map_or(true, |b| self.distance < b.distance)
    }
}

/// Line segment from `start` to `end`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub start: Vec3,
    pub end: Vec3,
}

impl Ray {
    pub fn new(start: Vec3, end: Vec3) -> Self {
        Self { start, end }
    }

    /// Unit direction, zero for a degenerate ray
    pub fn direction(&self) -> Vec3 {
        (self.end - self.start).normalize_or_zero()
    }

    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }

    /// Trace against the infinite plane through `center` with `normal`.
    ///
    /// A one-sided plane only accepts rays travelling against its normal, so
    /// a ray leaving the surface (or starting behind it) never registers.
    pub fn trace_plane(&self, center: Vec3, normal: Vec3, dual_sided: bool) -> TraceResult {
        let length = self.length();
        if length <= EPSILON {
            return TraceResult::miss();
        }

        let direction = self.direction();
        let denom = normal.dot(direction);
        if denom.abs() <= EPSILON || (!dual_sided && denom > 0.0) {
            return TraceResult::miss();
        }

        let distance = (center - self.start).dot(normal) / denom;
        if distance < -SURFACE_TOLERANCE || distance > length {
            return TraceResult::miss();
        }
        let distance = distance.max(0.0);

        let facing = if denom < 0.0 { normal } else { -normal };
        TraceResult::hit(self.start + direction * distance, facing, distance)
    }

    /// Trace against the lateral surface of an infinite vertical cylinder.
    ///
    /// Rays starting inside the cylinder, or moving away from its axis, miss.
    pub fn trace_cylinder(&self, center: Vec3, radius: f32) -> TraceResult {
        let length = self.length();
        if length <= EPSILON {
            return TraceResult::miss();
        }

        let direction = self.direction();
        let planar = direction.truncate();
        let a = planar.length_squared();
        if a <= EPSILON {
            return TraceResult::miss();
        }

        let offset = (self.start - center).truncate();
        let b = 2.0 * offset.dot(planar);
        let c = offset.length_squared() - radius * radius;
        if b >= 0.0 || c < -2.0 * radius * SURFACE_TOLERANCE {
            return TraceResult::miss();
        }

        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return TraceResult::miss();
        }

        let distance = ((-b - discriminant.sqrt()) / (2.0 * a)).max(0.0);
        if distance > length {
            return TraceResult::miss();
        }

        let position = self.start + direction * distance;
        let normal = (position - center).truncate().normalize_or_zero().extend(0.0);
        TraceResult::hit(position, normal, distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_length_ray_has_zero_direction() {
        let ray = Ray::new(Vec3::ONE, Vec3::ONE);
        assert_eq!(ray.direction(), Vec3::ZERO);
        assert_eq!(ray.length(), 0.0);
        assert!(!ray.trace_plane(Vec3::ZERO, Vec3::Z, false).collided);
        assert!(!ray.trace_cylinder(Vec3::ZERO, 1.0).collided);
    }

    #[test]
    fn plane_hit_from_front() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 2.0), Vec3::new(0.0, 0.0, -2.0));
        let hit = ray.trace_plane(Vec3::ZERO, Vec3::Z, false);
        assert!(hit.collided);
        assert!((hit.distance - 2.0).abs() < 1.0e-5);
        assert!(hit.position.z.abs() < 1.0e-5);
        assert_eq!(hit.normal, Vec3::Z);
    }

    #[test]
    fn one_sided_plane_rejects_receding_ray() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, -2.0), Vec3::new(0.0, 0.0, 2.0));
        assert!(!ray.trace_plane(Vec3::ZERO, Vec3::Z, false).collided);

        let hit = ray.trace_plane(Vec3::ZERO, Vec3::Z, true);
        assert!(hit.collided);
        assert_eq!(hit.normal, -Vec3::Z);
    }

    #[test]
    fn plane_out_of_reach_misses() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 2.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(!ray.trace_plane(Vec3::ZERO, Vec3::Z, false).collided);
    }

    #[test]
    fn cylinder_hit_from_outside() {
        let ray = Ray::new(Vec3::new(-5.0, 0.0, 0.5), Vec3::new(5.0, 0.0, 0.5));
        let hit = ray.trace_cylinder(Vec3::ZERO, 1.0);
        assert!(hit.collided);
        assert!((hit.position.x + 1.0).abs() < 1.0e-4);
        assert!((hit.normal - Vec3::new(-1.0, 0.0, 0.0)).length() < 1.0e-4);
        assert!((hit.distance - 4.0).abs() < 1.0e-4);
    }

    #[test]
    fn cylinder_ignores_ray_starting_inside() {
        let ray = Ray::new(Vec3::new(0.2, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0));
        assert!(!ray.trace_cylinder(Vec3::ZERO, 1.0).collided);
    }

    #[test]
    fn cylinder_ignores_vertical_ray() {
        let ray = Ray::new(Vec3::new(2.0, 0.0, 5.0), Vec3::new(2.0, 0.0, -5.0));
        assert!(!ray.trace_cylinder(Vec3::ZERO, 1.0).collided);
    }

    #[test]
    fn clamp_length_xy_keeps_vertical() {
        let v = Vec3::new(30.0, 40.0, -7.0).clamp_length_xy(5.0);
        assert!((v.length_xy() - 5.0).abs() < 1.0e-4);
        assert_eq!(v.z, -7.0);
        assert!((v.x - 3.0).abs() < 1.0e-4);
    }

    #[test]
    fn heading_round_trip() {
        let dir = planar_direction(1.2);
        assert!((dir.heading() - 1.2).abs() < 1.0e-5);
        assert_eq!(Vec2::ZERO.heading(), 0.0);
    }

    #[test]
    fn beats_prefers_closer_hits() {
        let near = TraceResult::hit(Vec3::ZERO, Vec3::Z, 1.0);
        let far = TraceResult::hit(Vec3::ZERO, Vec3::Z, 2.0);
        assert!(near.beats(&None));
        assert!(near.beats(&Some(far)));
        assert!(!far.beats(&Some(near)));
        assert!(!TraceResult::miss().beats(&None));
    }
}
