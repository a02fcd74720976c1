use std::fmt;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::archetype::{
    Archetype, ArchetypeState, ArchetypeStats, KILL_HEAL_FRACTION, RAMPAGE_MULTIPLIER,
};
use super::constraint::{Constraint, ConstraintKind};
use super::entity::{Body, Entity};
use super::error::SimError;
use super::math::EPSILON;
use super::prop::Collider;

/// Minimum time between two ground jumps, counted only while grounded
pub const JUMP_DEBOUNCE: f32 = 0.2;
/// Heights at or below this count as standing on the arena floor
pub const GROUND_TOLERANCE: f32 = 1.0e-4;
/// Upper bound on catch-up shots discharged in one tick
pub const MAX_SHOTS_PER_TICK: u32 = 16;
const MIN_FIRE_INTERVAL: f32 = 1.0e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FighterId(pub u32);

impl fmt::Display for FighterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoostKind {
    /// Halved fire interval
    Overdrive,
    /// Extra acceleration and momentum cap
    Rampage,
}

/// Timed window granted by a kill
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Boost {
    pub kind: BoostKind,
    pub remaining: f32,
}

/// Another fighter a special jump may interact with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpCandidate {
    pub id: FighterId,
    pub position: Vec3,
    pub constrained: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpOutcome {
    Refused,
    Jumped,
    AirJumped,
    /// Grab the given fighter instead of leaving the ground
    Grab(FighterId),
}

#[derive(Debug, Clone)]
pub struct Fighter {
    pub id: FighterId,
    pub player: Uuid,
    pub archetype: Archetype,
    pub stats: ArchetypeStats,
    /// `acceleration` holds the input intent, not the integrated total
    pub body: Body,
    pub collider: Collider,
    pub last_position: Vec3,
    /// Own mass plus everything stacked on top, refreshed every tick
    pub effective_mass: f32,

    pub max_health: f32,
    pub health: f32,
    pub aim: Vec2,
    pub firing: bool,
    pub attack_cooldown: f32,
    /// Time owed to the fire cycle from late ticks
    pub fire_backlog: f32,
    pub jump_debounce: f32,
    pub last_hit_by: Option<FighterId>,
    pub kills: u32,
    pub damage_dealt: f32,
    pub boost: Option<Boost>,

    /// Fighter this one stands on, set by collision resolution
    pub riding: Option<FighterId>,
    /// Ridership carried over from the previous tick, valid during physics only
    pub rode_this_tick: Option<FighterId>,
    /// Prop this one stands on
    pub resting_on: Option<u32>,
    pub rested_this_tick: Option<u32>,
    /// Partner of a lateral collision resolved this tick
    pub bumped: Option<FighterId>,
    /// Something is standing on this fighter
    pub on_surface: bool,

    pub just_landed: bool,
    pub bullet_shock: bool,
    /// A constraint drove this fighter's motion this tick
    pub scripted: bool,
    pub constraints: Vec<Constraint>,
    pub state: ArchetypeState,
}

impl Fighter {
    pub fn new(id: FighterId, player: Uuid, archetype: Archetype, position: Vec3) -> Self {
        let stats = archetype.stats();
        Self {
            id,
            player,
            archetype,
            stats,
            body: Body::at(position),
            collider: Collider::cylinder(stats.radius, stats.height),
            last_position: position,
            effective_mass: stats.mass,
            max_health: stats.max_health,
            health: stats.max_health,
            aim: Vec2::X,
            firing: false,
            attack_cooldown: 0.0,
            fire_backlog: 0.0,
            jump_debounce: 0.0,
            last_hit_by: None,
            kills: 0,
            damage_dealt: 0.0,
            boost: None,
            riding: None,
            rode_this_tick: None,
            resting_on: None,
            rested_this_tick: None,
            bumped: None,
            on_surface: false,
            just_landed: false,
            bullet_shock: false,
            scripted: false,
            constraints: Vec::new(),
            state: archetype.initial_state(),
        }
    }

    /// Build from a replicated archetype tag
    pub fn from_tag(id: FighterId, player: Uuid, tag: u8, position: Vec3) -> Result<Self, SimError> {
        let archetype = Archetype::try_from(tag)?;
        Ok(Self::new(id, player, archetype, position))
    }

    pub fn radius(&self) -> f32 {
        self.collider.radius
    }

    pub fn height(&self) -> f32 {
        self.collider.height
    }

    pub fn mass(&self) -> f32 {
        self.stats.mass
    }

    pub fn boost_active(&self, kind: BoostKind) -> bool {
        self.boost.is_some_and(|b| b.kind == kind)
    }

    fn rampage_factor(&self) -> f32 {
        if self.boost_active(BoostKind::Rampage) {
            RAMPAGE_MULTIPLIER
        } else {
            1.0
        }
    }

    pub fn max_momentum(&self) -> f32 {
        self.stats.max_momentum * self.rampage_factor()
    }

    pub fn move_acceleration(&self) -> f32 {
        self.stats.move_acceleration * self.rampage_factor()
    }

    pub fn terminal_speed(&self) -> f32 {
        self.max_momentum() / self.mass()
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    pub fn on_ground(&self) -> bool {
        self.body.position.z <= GROUND_TOLERANCE
    }

    /// Standing on the floor, a prop or another fighter
    pub fn is_grounded(&self) -> bool {
        self.on_ground() || self.riding.is_some() || self.resting_on.is_some()
    }

    pub fn is_falling(&self) -> bool {
        !self.is_grounded() || self.body.velocity.z > 0.0
    }

    /// Input acceleration along `direction`; does not touch velocity
    pub fn move_toward(&mut self, direction: Vec2) {
        let accel = direction.normalize_or_zero() * self.move_acceleration();
        self.body.acceleration = accel.extend(0.0);
    }

    pub fn aim_at(&mut self, direction: Vec2) {
        if direction.length_squared() > EPSILON * EPSILON {
            self.aim = direction.normalize();
        }
    }

    pub fn can_jump(&self) -> bool {
        self.is_grounded() && self.jump_debounce <= 0.0
    }

    pub fn jump(&mut self, forced: bool, candidates: &[JumpCandidate]) -> JumpOutcome {
        if !self.is_alive() || self.scripted {
            return JumpOutcome::Refused;
        }
        let allowed = forced || self.can_jump();
        let archetype = self.archetype;
        archetype.on_jump(self, allowed, candidates)
    }

    /// Leave the ground with the archetype's jump velocity
    pub fn launch(&mut self) {
        self.body.velocity.z = self.stats.jump_velocity;
        self.jump_debounce = JUMP_DEBOUNCE;
        self.riding = None;
        self.resting_on = None;
    }

    pub fn land(&mut self) {
        self.just_landed = true;
    }

    /// Returns true when this call took the fighter from alive to dead
    pub fn take_damage(&mut self, amount: f32, attacker: Option<FighterId>) -> bool {
        if !self.is_alive() || amount <= 0.0 {
            return false;
        }
        if attacker.is_some() {
            self.last_hit_by = attacker;
        }
        self.health = (self.health - amount).max(0.0);
        !self.is_alive()
    }

    pub fn earn_kill(&mut self) {
        self.kills += 1;
        self.health = (self.health + self.max_health * KILL_HEAL_FRACTION).min(self.max_health);
        let archetype = self.archetype;
        archetype.on_earn_kill(self);
    }

    /// Add `impulse / mass` to velocity, then keep `mass * speed` under the
    /// momentum cap
    pub fn apply_momentum(&mut self, impulse: Vec3, mass: Option<f32>, max_momentum: Option<f32>) {
        let mass = mass.unwrap_or_else(|| self.mass());
        if mass <= EPSILON {
            return;
        }
        let max_momentum = max_momentum.unwrap_or_else(|| self.max_momentum());
        self.body.velocity += impulse / mass;
        self.body.velocity = self.body.velocity.clamp_length_max(max_momentum / mass);
    }

    pub fn tick_cooldowns(&mut self, dt: f32) {
        self.just_landed = false;
        self.rode_this_tick = None;
        self.bullet_shock = false;

        let grounded = self.is_grounded();
        if grounded && self.jump_debounce > 0.0 {
            self.jump_debounce = (self.jump_debounce - dt).max(0.0);
        }

        if self.attack_cooldown > 0.0 {
            let remaining = self.attack_cooldown - dt;
            if remaining < 0.0 && self.firing {
                self.fire_backlog += -remaining;
            }
            self.attack_cooldown = remaining.max(0.0);
        }
        if !self.firing {
            self.fire_backlog = 0.0;
        }

        match &mut self.state {
            ArchetypeState::Brawler { grab_cooldown, .. } => {
                *grab_cooldown = (*grab_cooldown - dt).max(0.0);
            }
            ArchetypeState::Scout { air_jump_ready } if grounded => *air_jump_ready = true,
            _ => {}
        }

        if let Some(boost) = self.boost.as_mut() {
            boost.remaining -= dt;
            if boost.remaining <= 0.0 {
                let kind = boost.kind;
                self.boost = None;
                let archetype = self.archetype;
                archetype.on_boost_ended(self, kind);
            }
        }
    }

    pub fn attack_blocked(&self) -> bool {
        self.constraints.iter().any(|c| c.blocks_attack && !c.is_completed())
    }

    pub fn can_fire(&self) -> bool {
        self.firing && self.attack_cooldown <= 0.0 && !self.attack_blocked() && self.is_alive()
    }

    /// Restart the fire cycle, paying it down from any backlog
    pub fn consume_shot(&mut self, interval: f32) {
        let interval = interval.max(MIN_FIRE_INTERVAL);
        let paid = self.fire_backlog.min(interval);
        self.attack_cooldown = interval - paid;
        self.fire_backlog -= paid;
    }

    /// Spawn point for a projectile fired along `direction`
    pub fn muzzle(&self, direction: Vec3) -> Vec3 {
        let planar = direction.truncate().normalize_or_zero().extend(0.0);
        self.body.position + Vec3::Z * (self.height() * 0.6) + planar * (self.radius() + 0.1)
    }

    /// A constraint owned by `other` suppresses collision between the two
    pub fn ignores_collision_with(&self, other: &Fighter) -> bool {
        let suppressed = |victim: &Fighter, owner: FighterId| {
            victim
                .constraints
                .iter()
                .any(|c| c.owner == owner && c.suppresses_owner_collision && !c.is_completed())
        };
        suppressed(self, other.id) || suppressed(other, self.id)
    }

    pub fn has_takedown(&self) -> bool {
        self.constraints
            .iter()
            .any(|c| matches!(c.kind, ConstraintKind::Takedown { .. }) && !c.is_completed())
    }

    pub fn is_constrained(&self) -> bool {
        self.constraints.iter().any(|c| !c.is_completed())
    }

    /// Forget last tick's contacts so collision can re-detect them
    pub fn clear_contacts(&mut self) {
        self.rode_this_tick = self.riding.take();
        self.rested_this_tick = self.resting_on.take();
        self.bumped = None;
        self.on_surface = false;
    }
}

impl Entity for Fighter {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn gunner() -> Fighter {
        Fighter::new(FighterId(1), Uuid::new_v4(), Archetype::Gunner, Vec3::ZERO)
    }

    #[test]
    fn from_tag_rejects_unknown() {
        let player = Uuid::new_v4();
        assert!(Fighter::from_tag(FighterId(1), player, 1, Vec3::ZERO).is_ok());
        assert_eq!(
            Fighter::from_tag(FighterId(1), player, 7, Vec3::ZERO).err(),
            Some(SimError::UnknownArchetype("7".to_string()))
        );
    }

    #[test]
    fn move_sets_acceleration_only() {
        let mut f = gunner();
        f.move_toward(Vec2::new(3.0, 4.0));
        assert!((f.body.acceleration - Vec3::new(24.0, 32.0, 0.0)).length() < 1.0e-4);
        assert_eq!(f.body.velocity, Vec3::ZERO);

        f.move_toward(Vec2::ZERO);
        assert_eq!(f.body.acceleration, Vec3::ZERO);
    }

    #[test]
    fn take_damage_reports_lethal_blow_once() {
        let mut f = gunner();
        assert!(!f.take_damage(60.0, Some(FighterId(2))));
        assert_eq!(f.last_hit_by, Some(FighterId(2)));
        assert!(f.take_damage(60.0, Some(FighterId(3))));
        assert_eq!(f.health, 0.0);
        assert!(!f.take_damage(10.0, Some(FighterId(4))));
        assert_eq!(f.last_hit_by, Some(FighterId(3)));
    }

    #[test]
    fn earn_kill_heals_quarter() {
        let mut f = gunner();
        f.health = 50.0;
        f.earn_kill();
        assert_eq!(f.kills, 1);
        assert_eq!(f.health, 75.0);
        f.health = 95.0;
        f.earn_kill();
        assert_eq!(f.health, 100.0);
    }

    #[test]
    fn apply_momentum_respects_cap() {
        let mut f = gunner();
        f.apply_momentum(Vec3::new(1000.0, 0.0, 0.0), None, None);
        assert!((f.body.velocity.x - 5.0).abs() < 1.0e-5);

        f.apply_momentum(Vec3::new(100_000.0, 0.0, 0.0), None, None);
        assert!((f.body.velocity.length() - 10.0).abs() < 1.0e-4);

        f.body.velocity = Vec3::ZERO;
        f.apply_momentum(Vec3::new(0.0, 1000.0, 0.0), Some(100.0), Some(500.0));
        assert!((f.body.velocity.y - 5.0).abs() < 1.0e-5);
    }

    #[test]
    fn jump_debounce_only_ticks_on_ground() {
        let mut f = gunner();
        assert_eq!(f.jump(false, &[]), JumpOutcome::Jumped);
        assert_eq!(f.jump_debounce, JUMP_DEBOUNCE);

        f.body.position.z = 1.0;
        f.tick_cooldowns(0.5);
        assert_eq!(f.jump_debounce, JUMP_DEBOUNCE);

        f.body.position.z = 0.0;
        f.body.velocity.z = 0.0;
        f.tick_cooldowns(0.1);
        assert!(!f.can_jump());
        f.tick_cooldowns(0.15);
        assert!(f.can_jump());
    }

    #[test]
    fn cooldown_overshoot_becomes_backlog_while_firing() {
        let mut f = gunner();
        f.firing = true;
        f.consume_shot(0.12);
        assert_eq!(f.attack_cooldown, 0.12);

        f.tick_cooldowns(0.5);
        assert_eq!(f.attack_cooldown, 0.0);
        assert!((f.fire_backlog - 0.38).abs() < 1.0e-5);

        let mut shots = 0;
        while f.can_fire() {
            f.consume_shot(0.12);
            shots += 1;
        }
        assert_eq!(shots, 4);
    }

    #[test]
    fn backlog_dropped_when_trigger_released() {
        let mut f = gunner();
        f.attack_cooldown = 0.1;
        f.firing = true;
        f.tick_cooldowns(0.3);
        assert!(f.fire_backlog > 0.0);
        f.firing = false;
        f.tick_cooldowns(0.01);
        assert_eq!(f.fire_backlog, 0.0);
    }

    #[test]
    fn grounded_and_falling_flags() {
        let mut f = gunner();
        assert!(f.is_grounded());
        assert!(!f.is_falling());

        f.body.velocity.z = 1.0;
        assert!(f.is_falling());

        f.body.velocity.z = 0.0;
        f.body.position.z = 3.0;
        assert!(f.is_falling());
        f.riding = Some(FighterId(9));
        assert!(!f.is_falling());
    }

    #[test]
    fn clear_contacts_moves_links_to_tick_slots() {
        let mut f = gunner();
        f.riding = Some(FighterId(4));
        f.resting_on = Some(2);
        f.bumped = Some(FighterId(5));
        f.clear_contacts();
        assert_eq!(f.riding, None);
        assert_eq!(f.rode_this_tick, Some(FighterId(4)));
        assert_eq!(f.rested_this_tick, Some(2));
        assert_eq!(f.bumped, None);
    }

    #[test]
    fn rampage_raises_caps() {
        let mut f = gunner();
        f.boost = Some(Boost {
            kind: BoostKind::Rampage,
            remaining: 1.0,
        });
        assert!((f.terminal_speed() - 13.0).abs() < 1.0e-4);
        assert!((f.move_acceleration() - 52.0).abs() < 1.0e-4);
    }
}
