//! Fighter roster and per-archetype behaviour hooks.
//!
//! Behaviour is a closed set dispatched by `match` so the server and every
//! client run exactly the same code path for a given archetype tag.

use std::fmt;
use std::str::FromStr;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::combat::{ProjectileKind, WeaponStats};
use super::error::SimError;
use super::fighter::{Boost, BoostKind, Fighter, FighterId, JumpCandidate, JumpOutcome};
use super::math::VecExt;

/// Planar reach of a brawler grab, centre to centre
pub const GRAB_RANGE: f32 = 1.5;
/// Maximum height difference for a grab
pub const GRAB_HEIGHT: f32 = 1.0;
pub const GRAB_COOLDOWN: f32 = 3.0;
pub const BOOST_DURATION: f32 = 3.0;
/// Fraction of max health restored on a kill
pub const KILL_HEAL_FRACTION: f32 = 0.25;
/// Downward speed above which a brawler landing on a fighter stuns it
pub const STOMP_SPEED: f32 = 8.0;
pub const RAMPAGE_MULTIPLIER: f32 = 1.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    Gunner,
    Brawler,
    Scout,
}

impl Archetype {
    pub const ALL: [Archetype; 3] = [Archetype::Gunner, Archetype::Brawler, Archetype::Scout];

    pub fn tag(self) -> u8 {
        match self {
            Archetype::Gunner => 0,
            Archetype::Brawler => 1,
            Archetype::Scout => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Archetype::Gunner => "gunner",
            Archetype::Brawler => "brawler",
            Archetype::Scout => "scout",
        }
    }

    pub fn stats(self) -> ArchetypeStats {
        ArchetypeStats::for_archetype(self)
    }

    pub fn weapon(self) -> ProjectileKind {
        match self {
            Archetype::Gunner => ProjectileKind::Bullet,
            Archetype::Brawler => ProjectileKind::Shockwave,
            Archetype::Scout => ProjectileKind::Dart,
        }
    }

    pub fn stomps(self) -> bool {
        matches!(self, Archetype::Brawler)
    }

    pub fn initial_state(self) -> ArchetypeState {
        match self {
            Archetype::Gunner => ArchetypeState::Gunner,
            Archetype::Brawler => ArchetypeState::Brawler {
                grab_cooldown: 0.0,
                grabbing: false,
            },
            Archetype::Scout => ArchetypeState::Scout {
                air_jump_ready: true,
            },
        }
    }

    fn boost_kind(self) -> BoostKind {
        match self {
            Archetype::Gunner => BoostKind::Overdrive,
            Archetype::Brawler | Archetype::Scout => BoostKind::Rampage,
        }
    }

    /// Jump request. `allowed` is true when a plain ground jump is permitted
    /// (grounded with the debounce elapsed, or forced).
    pub fn on_jump(self, fighter: &mut Fighter, allowed: bool, candidates: &[JumpCandidate]) -> JumpOutcome {
        match self {
            Archetype::Gunner => {
                if allowed {
                    fighter.launch();
                    JumpOutcome::Jumped
                } else {
                    JumpOutcome::Refused
                }
            }
            Archetype::Brawler => {
                if !allowed {
                    return JumpOutcome::Refused;
                }
                let ready = matches!(
                    fighter.state,
                    ArchetypeState::Brawler { grab_cooldown, grabbing: false } if grab_cooldown <= 0.0
                );
                let target = if ready { nearest_grab_target(fighter, candidates) } else { None };
                match target {
                    Some(id) => {
                        if let ArchetypeState::Brawler { grab_cooldown, .. } = &mut fighter.state {
                            *grab_cooldown = GRAB_COOLDOWN;
                        }
                        JumpOutcome::Grab(id)
                    }
                    None => {
                        fighter.launch();
                        JumpOutcome::Jumped
                    }
                }
            }
            Archetype::Scout => {
                if allowed {
                    fighter.launch();
                    return JumpOutcome::Jumped;
                }
                let airborne = !fighter.is_grounded();
                let past_apex = fighter.body.velocity.z <= 0.0;
                match &mut fighter.state {
                    ArchetypeState::Scout { air_jump_ready } if *air_jump_ready && airborne && past_apex => {
                        *air_jump_ready = false;
                        fighter.launch();
                        JumpOutcome::AirJumped
                    }
                    _ => JumpOutcome::Refused,
                }
            }
        }
    }

    /// Weapon parameters for the next shot
    pub fn on_fire_weapon(self, fighter: &Fighter) -> WeaponStats {
        let mut stats = WeaponStats::for_kind(self.weapon());
        if fighter.boost_active(BoostKind::Overdrive) {
            stats.interval *= 0.5;
        }
        stats
    }

    pub fn on_earn_kill(self, fighter: &mut Fighter) {
        fighter.boost = Some(Boost {
            kind: self.boost_kind(),
            remaining: BOOST_DURATION,
        });
    }

    pub fn on_boost_ended(self, fighter: &mut Fighter, kind: BoostKind) {
        match kind {
            BoostKind::Overdrive => fighter.fire_backlog = 0.0,
            BoostKind::Rampage => {
                let cap = fighter.stats.max_momentum / fighter.stats.mass;
                fighter.body.velocity = fighter.body.velocity.clamp_length_xy(cap);
            }
        }
    }

    /// Landing on another fighter's top face. Returns true when the carrier
    /// should be stunned.
    pub fn on_landed_on_fighter(self, impact: f32) -> bool {
        self.stomps() && impact < -STOMP_SPEED
    }

    pub fn special_state(self, fighter: &Fighter) -> SpecialState {
        let boost_remaining = fighter.boost.map_or(0.0, |b| b.remaining);
        match fighter.state {
            ArchetypeState::Gunner => SpecialState {
                value: boost_remaining,
                flag: fighter.boost.is_some(),
            },
            ArchetypeState::Brawler { grab_cooldown, grabbing } => SpecialState {
                value: grab_cooldown,
                flag: grabbing,
            },
            ArchetypeState::Scout { air_jump_ready } => SpecialState {
                value: boost_remaining,
                flag: air_jump_ready,
            },
        }
    }

    pub fn set_special_state(self, fighter: &mut Fighter, special: SpecialState) {
        let boost = (special.value > 0.0).then(|| Boost {
            kind: self.boost_kind(),
            remaining: special.value,
        });
        match &mut fighter.state {
            ArchetypeState::Gunner => {
                fighter.boost = if special.flag { boost } else { None };
            }
            ArchetypeState::Brawler { grab_cooldown, grabbing } => {
                *grab_cooldown = special.value.max(0.0);
                *grabbing = special.flag;
            }
            ArchetypeState::Scout { air_jump_ready } => {
                *air_jump_ready = special.flag;
                fighter.boost = boost;
            }
        }
    }
}

fn nearest_grab_target(fighter: &Fighter, candidates: &[JumpCandidate]) -> Option<FighterId> {
    let origin = fighter.body.position;
    candidates
        .iter()
        .filter(|c| c.id != fighter.id && !c.constrained)
        .filter(|c| (c.position.z - origin.z).abs() < GRAB_HEIGHT)
        .map(|c| (c.id, (c.position - origin).length_xy()))
        .filter(|(_, distance)| *distance <= GRAB_RANGE)
        .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
        .map(|(id, _)| id)
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Archetype {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Archetype::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| SimError::UnknownArchetype(s.to_string()))
    }
}

impl TryFrom<u8> for Archetype {
    type Error = SimError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Archetype::ALL
            .into_iter()
            .find(|a| a.tag() == tag)
            .ok_or_else(|| SimError::UnknownArchetype(tag.to_string()))
    }
}

/// Movement and combat tuning for an archetype
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeStats {
    pub mass: f32,
    pub max_momentum: f32,
    pub move_acceleration: f32,
    /// Fraction of input acceleration available while airborne
    pub air_control: f32,
    pub jump_velocity: f32,
    pub max_health: f32,
    pub radius: f32,
    pub height: f32,
}

impl ArchetypeStats {
    pub fn for_archetype(archetype: Archetype) -> Self {
        match archetype {
            Archetype::Gunner => Self {
                mass: 200.0,
                max_momentum: 2000.0,
                move_acceleration: 40.0,
                air_control: 0.3,
                jump_velocity: 12.0,
                max_health: 100.0,
                radius: 0.5,
                height: 1.8,
            },
            Archetype::Brawler => Self {
                mass: 300.0,
                max_momentum: 2400.0,
                move_acceleration: 30.0,
                air_control: 0.2,
                jump_velocity: 10.0,
                max_health: 150.0,
                radius: 0.7,
                height: 2.0,
            },
            Archetype::Scout => Self {
                mass: 150.0,
                max_momentum: 2100.0,
                move_acceleration: 55.0,
                air_control: 0.5,
                jump_velocity: 13.0,
                max_health: 70.0,
                radius: 0.45,
                height: 1.6,
            },
        }
    }

    pub fn terminal_speed(&self) -> f32 {
        self.max_momentum / self.mass
    }
}

/// Mutable per-archetype state behind the replicated special slots
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArchetypeState {
    Gunner,
    Brawler { grab_cooldown: f32, grabbing: bool },
    Scout { air_jump_ready: bool },
}

/// Two replicated slots whose meaning depends on the archetype
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecialState {
    pub value: f32,
    pub flag: bool,
}

/// Planar offset that puts a thrown victim on the far side of `origin`
pub fn throw_direction(origin: Vec3, target: Vec3, fallback: Vec3) -> Vec3 {
    let offset = (target - origin).truncate();
    if offset.length_squared() > f32::EPSILON {
        offset.normalize().extend(0.0)
    } else {
        fallback.truncate().normalize_or_zero().extend(0.0)
    }
}
