//! Combat - weapons, projectiles and their ballistic update

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::entity::{Body, Entity};
use super::error::SimError;
use super::fighter::FighterId;
use super::physics::PhysicsSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectileKind {
    Bullet,
    Shockwave,
    Dart,
}

impl ProjectileKind {
    pub fn tag(self) -> u8 {
        match self {
            ProjectileKind::Bullet => 0,
            ProjectileKind::Shockwave => 1,
            ProjectileKind::Dart => 2,
        }
    }
}

impl TryFrom<u8> for ProjectileKind {
    type Error = SimError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(ProjectileKind::Bullet),
            1 => Ok(ProjectileKind::Shockwave),
            2 => Ok(ProjectileKind::Dart),
            other => Err(SimError::UnknownProjectileKind(other)),
        }
    }
}

/// Weapon stats per projectile kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponStats {
    /// Damage per hit
    pub damage: f32,
    /// Muzzle speed
    pub speed: f32,
    /// Seconds between shots
    pub interval: f32,
    /// Projectile lifetime (seconds)
    pub lifetime: f32,
    /// Render width, also the hit boost radius when doubled
    pub width: f32,
    pub length: f32,
    /// Downward acceleration while in flight
    pub gravity: f32,
    /// Fraction of vertical speed kept after bouncing off a top face
    pub bounce: f32,
    /// Max random deviation from the aim heading (radians)
    pub spread: f32,
    /// Momentum pushed back into the shooter per shot
    pub recoil: f32,
    /// Upward component added to the launch direction before normalizing
    pub loft: f32,
}

impl WeaponStats {
    pub fn for_kind(kind: ProjectileKind) -> Self {
        match kind {
            ProjectileKind::Bullet => Self {
                damage: 8.0,
                speed: 40.0,
                interval: 0.12,
                lifetime: 1.5,
                width: 0.1,
                length: 0.6,
                gravity: 0.0,
                bounce: 0.3,
                spread: 0.08,
                recoil: 150.0,
                loft: 0.0,
            },
            ProjectileKind::Shockwave => Self {
                damage: 20.0,
                speed: 18.0,
                interval: 0.6,
                lifetime: 0.2,
                width: 0.8,
                length: 0.3,
                gravity: 0.0,
                bounce: 0.0,
                spread: 0.0,
                recoil: 0.0,
                loft: 0.0,
            },
            ProjectileKind::Dart => Self {
                damage: 12.0,
                speed: 25.0,
                interval: 0.35,
                lifetime: 2.5,
                width: 0.15,
                length: 0.4,
                gravity: 30.0,
                bounce: 0.6,
                spread: 0.03,
                recoil: 60.0,
                loft: 0.35,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectileId(pub u32);

impl fmt::Display for ProjectileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Active projectile in the arena
#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub id: ProjectileId,
    pub owner: FighterId,
    pub kind: ProjectileKind,
    pub body: Body,
    pub damage: f32,
    /// Seconds left before the projectile expires
    pub lifetime: f32,
    pub width: f32,
    pub length: f32,
    pub bounce: f32,
    pub last_position: Vec3,
}

impl Projectile {
    /// Launch from `origin` along `direction` (normalized here)
    pub fn new(id: ProjectileId, owner: FighterId, kind: ProjectileKind, origin: Vec3, direction: Vec3) -> Self {
        let stats = WeaponStats::for_kind(kind);
        let direction = (direction + Vec3::Z * stats.loft).normalize_or_zero();
        Self {
            id,
            owner,
            kind,
            body: Body {
                position: origin,
                velocity: direction * stats.speed,
                acceleration: -Vec3::Z * stats.gravity,
            },
            damage: stats.damage,
            lifetime: stats.lifetime,
            width: stats.width,
            length: stats.length,
            bounce: stats.bounce,
            last_position: origin,
        }
    }

    /// Advance one tick. Ground contact behaves like a top face.
    pub fn tick(&mut self, dt: f32) {
        self.last_position = self.body.position;
        PhysicsSystem::step_kinematic(self, dt);
        self.lifetime -= dt;
        if self.body.position.z < 0.0 {
            self.bounce_at(0.0);
        }
    }

    pub fn is_expired(&self) -> bool {
        self.lifetime <= 0.0
    }

    /// Reflect vertical motion off a horizontal surface at height `z`
    pub fn bounce_at(&mut self, z: f32) {
        self.body.position.z = z;
        if self.body.velocity.z < 0.0 {
            self.body.velocity.z = -self.body.velocity.z * self.bounce;
        }
    }

    /// Extra radius used when tracing this projectile against bodies
    pub fn hit_radius(&self) -> f32 {
        self.width * 0.5
    }
}

impl Entity for Projectile {
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
