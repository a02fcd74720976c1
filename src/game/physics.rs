//! Force computation and motion integration

use glam::Vec3;

use super::entity::{Body, Entity};
use super::fighter::Fighter;
use super::math::{VecExt, EPSILON};
use super::world::ArenaMap;

/// Downward acceleration for airborne bodies
pub const GRAVITY: f32 = 30.0;
/// Ground friction scale, multiplied by the map coefficient
pub const FRICTION_ACCEL: f32 = 10.0;
/// Below this planar speed a grounded body gets the unstick boost
pub const UNSTICK_SPEED: f32 = 2.0;
/// Extra fraction of wall push applied while unsticking
pub const UNSTICK_BOOST: f32 = 1.0;

/// Physics system for fighters and free bodies
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Friction multiplier for a planar speed: strong near rest, easing off
    /// toward 1 as speed grows
    pub fn friction_force(speed: f32) -> f32 {
        (3.0 - (speed / 2.0 + 1.0).ln()).max(1.0)
    }

    /// Elastic push back toward the arena, proportional to the distance outside
    pub fn wall_acceleration(position: Vec3, map: &ArenaMap) -> Vec3 {
        let outside = |value: f32, max: f32| {
            if value < 0.0 {
                -value
            } else if value > max {
                max - value
            } else {
                0.0
            }
        };
        Vec3::new(
            outside(position.x, map.width),
            outside(position.y, map.height),
            0.0,
        ) * map.wall_strength
    }

    /// Total acceleration acting on a fighter for this tick
    pub fn fighter_acceleration(fighter: &Fighter, map: &ArenaMap, dt: f32) -> Vec3 {
        let body = &fighter.body;
        let falling = fighter.is_falling();
        let input = body.acceleration;
        let has_input = input.length_xy() > EPSILON;
        let speed = body.velocity.length_xy();

        let mut accel = if falling {
            input * fighter.stats.air_control
        } else {
            input
        };

        if falling {
            accel.z -= GRAVITY;
        }

        // A mount carries its riders, so only it feels the walls
        if fighter.riding.is_none() {
            let mut wall = Self::wall_acceleration(body.position, map);
            if !falling && !has_input && speed < UNSTICK_SPEED {
                wall *= 1.0 + UNSTICK_BOOST;
            }
            accel += wall;
        }

        if !falling && !has_input && speed > EPSILON && dt > 0.0 {
            let friction = (FRICTION_ACCEL * Self::friction_force(speed) * map.friction).min(speed / dt);
            let heading = body.velocity.truncate() / speed;
            accel -= (heading * friction).extend(0.0);
        }

        accel
    }

    /// Second-order position step, then velocity. Planar step and planar
    /// velocity are both limited by `max_speed`; vertical motion never is.
    pub fn integrate(body: &mut Body, accel: Vec3, max_speed: Option<f32>, dt: f32) {
        let mut step = accel * (dt * dt * 0.5) + body.velocity * dt;
        if let Some(max_speed) = max_speed {
            step = step.clamp_length_xy(max_speed * dt);
        }
        body.position += step;

        body.velocity += accel * dt;
        if let Some(max_speed) = max_speed {
            body.velocity = body.velocity.clamp_length_xy(max_speed);
        }
    }

    /// Clamp a body sunk below the floor. Returns the vertical velocity it hit with.
    pub fn clamp_to_ground(body: &mut Body) -> Option<f32> {
        if body.position.z < 0.0 {
            let impact = body.velocity.z;
            body.position.z = 0.0;
            body.velocity.z = 0.0;
            Some(impact)
        } else {
            None
        }
    }

    /// Integrate one fighter. Returns the impact velocity if it hit the floor.
    pub fn step_fighter(fighter: &mut Fighter, map: &ArenaMap, dt: f32) -> Option<f32> {
        let accel = Self::fighter_acceleration(fighter, map, dt);
        let max_speed = fighter.terminal_speed();
        Self::integrate(&mut fighter.body, accel, Some(max_speed), dt);
        Self::clamp_to_ground(&mut fighter.body)
    }

    /// Free ballistic motion under the body's own acceleration
    pub fn step_kinematic<E: Entity>(entity: &mut E, dt: f32) {
        let body = entity.body_mut();
        let accel = body.acceleration;
        Self::integrate(body, accel, None, dt);
    }
}
