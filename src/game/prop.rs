//! Collidable volumes: upright cylinders and axis-aligned boxes.
//!
//! A body's `position` is the centre of its base. The volume spans
//! `[position.z, position.z + height)`.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::entity::{Body, Entity};
use super::math::{Ray, TraceResult, VecExt};

/// Gap left between a body pushed out of a lateral surface and that surface
pub const SKIN: f32 = 1.0e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropShape {
    Cylinder,
    Box,
}

/// Shape and extents. For a cylinder `width` is its radius, for a box
/// `width`/`depth` are the full X/Y extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub shape: PropShape,
    pub width: f32,
    pub height: f32,
    pub depth: f32,
    /// Broad-phase reject distance, never used for resolution
    pub radius: f32,
}

/// Which surface a body was snapped against
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContactFace {
    /// Landed on top, carrying the vertical velocity at impact
    Top { impact: f32 },
    Bottom,
    Side,
}

impl Collider {
    pub fn cylinder(radius: f32, height: f32) -> Self {
        Self {
            shape: PropShape::Cylinder,
            width: radius,
            height,
            depth: radius,
            radius,
        }
    }

    pub fn cuboid(width: f32, depth: f32, height: f32) -> Self {
        Self {
            shape: PropShape::Box,
            width,
            height,
            depth,
            radius: (width * 0.5).hypot(depth * 0.5),
        }
    }

    pub fn top(&self, base: Vec3) -> f32 {
        base.z + self.height
    }

    /// Planar containment, grown by `boost` on every side
    pub fn within_footprint(&self, base: Vec3, point: Vec3, boost: f32) -> bool {
        let offset = point - base;
        match self.shape {
            PropShape::Cylinder => offset.length_xy() <= self.radius + boost,
            PropShape::Box => {
                offset.x.abs() <= self.width * 0.5 + boost
                    && offset.y.abs() <= self.depth * 0.5 + boost
            }
        }
    }

    /// Vertical overlap between a mover spanning `[z, z + span)` and this
    /// volume. Bullets also count a graze along the top edge.
    pub fn within_height(&self, base: Vec3, z: f32, span: f32, bullet: bool) -> bool {
        let top = self.top(base);
        let below_top = if bullet { z <= top } else { z < top };
        below_top && z + span >= base.z
    }

    pub fn contains_point(&self, base: Vec3, point: Vec3) -> bool {
        self.within_footprint(base, point, 0.0) && point.z >= base.z && point.z < self.top(base)
    }

    /// Trace a mover's base point against this volume.
    ///
    /// `boost` grows the footprint by the mover's radius and `span` is the
    /// mover's own height. Top face, bottom face, then the lateral surface:
    /// the first accepted surface wins.
    pub fn trace(&self, base: Vec3, ray: &Ray, boost: f32, span: f32, bullet: bool) -> TraceResult {
        let top = ray.trace_plane(base + Vec3::Z * self.height, Vec3::Z, false);
        if top.collided && self.within_footprint(base, top.position, boost) {
            return TraceResult {
                top_face: true,
                ..top
            };
        }

        let bottom = ray.trace_plane(base - Vec3::Z * span, -Vec3::Z, false);
        if bottom.collided && self.within_footprint(base, bottom.position, boost) {
            return bottom;
        }

        match self.shape {
            PropShape::Cylinder => {
                let side = ray.trace_cylinder(base, self.radius + boost);
                if side.collided && self.within_height(base, side.position.z, span, bullet) {
                    side
                } else {
                    TraceResult::miss()
                }
            }
            PropShape::Box => self.trace_box_sides(base, ray, boost, span, bullet),
        }
    }

    fn trace_box_sides(&self, base: Vec3, ray: &Ray, boost: f32, span: f32, bullet: bool) -> TraceResult {
        let half_x = self.width * 0.5 + boost;
        let half_y = self.depth * 0.5 + boost;
        let faces = [
            (Vec3::X, half_x, half_y),
            (-Vec3::X, half_x, half_y),
            (Vec3::Y, half_y, half_x),
            (-Vec3::Y, half_y, half_x),
        ];

        let mut best: Option<TraceResult> = None;
        for (normal, offset, extent) in faces {
            let hit = ray.trace_plane(base + normal * offset, normal, false);
            if !hit.collided {
                continue;
            }
            let local = hit.position - base;
            // Extent along the face's other planar axis
            let across = if normal.x != 0.0 { local.y } else { local.x };
            if across.abs() <= extent
                && self.within_height(base, hit.position.z, span, bullet)
                && hit.beats(&best)
            {
                best = Some(hit);
            }
        }
        best.unwrap_or_else(TraceResult::miss)
    }

    /// Snap a body that hit this volume back onto its surface
    pub fn reposition(&self, base: Vec3, trace: &TraceResult, body: &mut Body, span: f32) -> ContactFace {
        if trace.top_face {
            let impact = body.velocity.z;
            body.position = trace.position;
            body.position.z = self.top(base);
            body.velocity.z = body.velocity.z.max(0.0);
            return ContactFace::Top { impact };
        }

        if trace.normal.z < 0.0 {
            body.position = trace.position;
            body.position.z = base.z - span;
            body.velocity.z = body.velocity.z.min(0.0);
            return ContactFace::Bottom;
        }

        body.position = trace.position + trace.normal * SKIN;
        let into = body.velocity.dot(trace.normal);
        if into < 0.0 {
            body.velocity -= trace.normal * into;
        }
        ContactFace::Side
    }
}

/// Static or kinematic obstacle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prop {
    pub id: u32,
    pub body: Body,
    pub collider: Collider,
    #[serde(skip)]
    pub last_position: Vec3,
    /// Something rested on top of this prop during the current tick
    #[serde(skip)]
    pub on_surface: bool,
}

impl Prop {
    pub fn new(id: u32, position: Vec3, collider: Collider) -> Self {
        Self {
            id,
            body: Body::at(position),
            collider,
            last_position: position,
            on_surface: false,
        }
    }

    pub fn new_cylinder(id: u32, position: Vec3, radius: f32, height: f32) -> Self {
        Self::new(id, position, Collider::cylinder(radius, height))
    }

    pub fn new_box(id: u32, position: Vec3, width: f32, depth: f32, height: f32) -> Self {
        Self::new(id, position, Collider::cuboid(width, depth, height))
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.body.velocity = velocity;
        self
    }

    pub fn is_kinematic(&self) -> bool {
        self.body.velocity != Vec3::ZERO || self.body.acceleration != Vec3::ZERO
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.collider.contains_point(self.body.position, point)
    }

    pub fn trace(&self, ray: &Ray, boost: f32, span: f32, bullet: bool) -> TraceResult {
        self.collider.trace(self.body.position, ray, boost, span, bullet)
    }

    /// Trace a mover against this prop as seen from the prop's pre-move frame
    pub fn sweep(&self, ray: &Ray, boost: f32, span: f32) -> TraceResult {
        let shift = self.displacement();
        let relative = Ray::new(ray.start, ray.end - shift);
        let mut hit = self.collider.trace(self.last_position, &relative, boost, span, false);
        if hit.collided {
            hit.position += shift;
        }
        hit
    }

    pub fn reposition(&self, trace: &TraceResult, body: &mut Body, span: f32) -> ContactFace {
        self.collider.reposition(self.body.position, trace, body, span)
    }
}

impl Entity for Prop {
    fn body(&self) -> &Body {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    fn last_position(&self) -> Vec3 {
        self.last_position
    }

    fn set_last_position(&mut self, position: Vec3) {
        self.last_position = position;
    }
}
