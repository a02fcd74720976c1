//! Time-boxed overrides of a fighter's normal motion.

use std::f32::consts::PI;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::fighter::{Fighter, FighterId};
use super::random::RandomSource;

pub const TAKEDOWN_DURATION: f32 = 0.8;
pub const STUN_DURATION: f32 = 1.0;
pub const TAKEDOWN_BASE_DAMAGE: f32 = 15.0;
const TAKEDOWN_KNOCKBACK: f32 = 6.0;
const TAKEDOWN_POP: f32 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstraintKind {
    /// Victim is thrown over the owner's head along `throw_dir`'s reverse
    Takedown { throw_dir: Vec3 },
    /// No input, no horizontal drift
    Stun,
    /// Pinned in place until released
    Freeze { anchor: Vec3 },
}

impl ConstraintKind {
    pub fn name(&self) -> &'static str {
        match self {
            ConstraintKind::Takedown { .. } => "takedown",
            ConstraintKind::Stun => "stun",
            ConstraintKind::Freeze { .. } => "freeze",
        }
    }
}

/// Damage owed by a constraint when it finishes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinishOutcome {
    pub damage: f32,
    pub attacker: FighterId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub owner: FighterId,
    pub kind: ConstraintKind,
    /// `None` lasts until completed explicitly
    pub remaining: Option<f32>,
    pub elapsed: f32,
    pub suppresses_owner_collision: bool,
    pub blocks_attack: bool,
    completed: bool,
    finished: bool,
}

impl Constraint {
    fn new(owner: FighterId, kind: ConstraintKind, remaining: Option<f32>) -> Self {
        Self {
            owner,
            kind,
            remaining,
            elapsed: 0.0,
            suppresses_owner_collision: false,
            blocks_attack: true,
            completed: false,
            finished: false,
        }
    }

    /// `throw_dir` points from the owner toward the victim at grab time
    pub fn takedown(owner: FighterId, throw_dir: Vec3) -> Self {
        Self {
            suppresses_owner_collision: true,
            ..Self::new(owner, ConstraintKind::Takedown { throw_dir }, Some(TAKEDOWN_DURATION))
        }
    }

    pub fn stun(owner: FighterId) -> Self {
        Self::new(owner, ConstraintKind::Stun, Some(STUN_DURATION))
    }

    /// Freeze owned by the victim itself
    pub fn freeze(victim: FighterId, anchor: Vec3) -> Self {
        Self::new(victim, ConstraintKind::Freeze { anchor }, None)
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn complete(&mut self) {
        self.completed = true;
    }

    /// Advance one tick. Returns true when the victim's motion for this tick
    /// was set here and normal integration must be skipped.
    pub fn tick(&mut self, dt: f32, victim: &mut Fighter, owner: Option<&Fighter>) -> bool {
        if self.completed {
            return false;
        }
        self.elapsed += dt;
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= dt;
            if *remaining <= 0.0 {
                self.completed = true;
            }
        }

        match self.kind {
            ConstraintKind::Takedown { throw_dir } => {
                let Some(owner) = owner else {
                    self.completed = true;
                    return false;
                };
                let progress = (self.elapsed / TAKEDOWN_DURATION).clamp(0.0, 1.0);
                let angle = progress * PI;
                let reach = owner.radius() + victim.radius();
                let target = owner.body.position
                    + throw_dir * (reach * angle.cos())
                    + Vec3::Z * (owner.height() * angle.sin());
                if dt > 0.0 {
                    victim.body.velocity = (target - victim.body.position) / dt;
                }
                victim.body.position = target;
                true
            }
            ConstraintKind::Stun => {
                victim.body.acceleration = Vec3::ZERO;
                victim.body.velocity.x = 0.0;
                victim.body.velocity.y = 0.0;
                false
            }
            ConstraintKind::Freeze { anchor } => {
                victim.body.position = anchor;
                victim.body.velocity = Vec3::ZERO;
                true
            }
        }
    }

    /// One-time finalization; later calls return `None`
    pub fn finish(&mut self, victim: &mut Fighter, owner: Option<&Fighter>, random: &mut RandomSource) -> Option<FinishOutcome> {
        if self.finished {
            return None;
        }
        self.finished = true;
        self.completed = true;

        match self.kind {
            ConstraintKind::Takedown { throw_dir } => {
                let damage = TAKEDOWN_BASE_DAMAGE * (0.8 + 0.4 * random.get_float());
                let knockback = (-throw_dir * TAKEDOWN_KNOCKBACK + Vec3::Z * TAKEDOWN_POP) * victim.mass();
                victim.apply_momentum(knockback, None, None);
                owner.map(|owner| FinishOutcome {
                    damage,
                    attacker: owner.id,
                })
            }
            ConstraintKind::Stun | ConstraintKind::Freeze { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::archetype::Archetype;
    use uuid::Uuid;

    fn pair() -> (Fighter, Fighter) {
        let owner = Fighter::new(FighterId(1), Uuid::new_v4(), Archetype::Brawler, Vec3::new(10.0, 10.0, 0.0));
        let victim = Fighter::new(FighterId(2), Uuid::new_v4(), Archetype::Gunner, Vec3::new(11.0, 10.0, 0.0));
        (owner, victim)
    }

    #[test]
    fn takedown_arcs_over_owner() {
        let (owner, mut victim) = pair();
        let mut takedown = Constraint::takedown(owner.id, Vec3::X);
        let dt = TAKEDOWN_DURATION / 8.0;

        for _ in 0..4 {
            assert!(takedown.tick(dt, &mut victim, Some(&owner)));
        }
        // Halfway: above the owner's head
        assert!((victim.body.position.x - 10.0).abs() < 1.0e-3);
        assert!((victim.body.position.z - owner.height()).abs() < 1.0e-3);

        for _ in 0..5 {
            takedown.tick(dt, &mut victim, Some(&owner));
        }
        assert!(takedown.is_completed());
        assert!(victim.body.position.x < owner.body.position.x);
    }

    #[test]
    fn takedown_completes_without_owner() {
        let (_, mut victim) = pair();
        let mut takedown = Constraint::takedown(FighterId(1), Vec3::X);
        assert!(!takedown.tick(0.01, &mut victim, None));
        assert!(takedown.is_completed());
    }

    #[test]
    fn finish_is_idempotent() {
        let (owner, mut victim) = pair();
        let mut random = RandomSource::new(11);
        let mut takedown = Constraint::takedown(owner.id, Vec3::X);

        let outcome = takedown.finish(&mut victim, Some(&owner), &mut random);
        let outcome = outcome.expect("takedown deals damage");
        assert_eq!(outcome.attacker, owner.id);
        assert!(outcome.damage >= 12.0 && outcome.damage < 18.0);
        assert!(victim.body.velocity.z > 0.0);
        assert!(victim.body.velocity.x < 0.0);

        let index = random.index();
        assert!(takedown.finish(&mut victim, Some(&owner), &mut random).is_none());
        assert_eq!(random.index(), index);
    }

    #[test]
    fn stun_cancels_drift_but_not_gravity() {
        let (owner, mut victim) = pair();
        victim.body.velocity = Vec3::new(3.0, 2.0, -1.0);
        victim.move_toward(glam::Vec2::X);
        let mut stun = Constraint::stun(owner.id);
        assert!(!stun.tick(0.1, &mut victim, Some(&owner)));
        assert_eq!(victim.body.velocity, Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(victim.body.acceleration, Vec3::ZERO);
        assert!(stun.blocks_attack);
        assert!(!stun.suppresses_owner_collision);
    }

    #[test]
    fn freeze_lasts_until_completed() {
        let (_, mut victim) = pair();
        let anchor = victim.body.position;
        let mut freeze = Constraint::freeze(victim.id, anchor);
        for _ in 0..1000 {
            victim.body.velocity = Vec3::new(5.0, 0.0, 0.0);
            assert!(freeze.tick(0.1, &mut victim, None));
        }
        assert!(!freeze.is_completed());
        assert_eq!(victim.body.position, anchor);
        freeze.complete();
        assert!(freeze.is_completed());
    }
}
