//! Authoritative arena state and the fixed-timestep tick.
//!
//! A tick runs in two halves. `do_updates` advances cooldowns, discharges
//! weapons and reaps the dead. `tick_physics` integrates every body, carries
//! riders with their mounts, resolves collisions lowest body first, then
//! advances projectiles and prunes finished constraints.

use std::mem;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::archetype::{throw_direction, Archetype, ArchetypeState};
use super::combat::{Projectile, ProjectileId, ProjectileKind};
use super::constraint::{Constraint, ConstraintKind};
use super::entity::Entity;
use super::error::SimError;
use super::fighter::{Fighter, FighterId, JumpCandidate, JumpOutcome, MAX_SHOTS_PER_TICK};
use super::math::{planar_direction, HitTarget, Ray, TraceResult, VecExt, EPSILON, SURFACE_TOLERANCE};
use super::physics::PhysicsSystem;
use super::prop::{Collider, ContactFace, Prop, SKIN};
use super::random::RandomSource;
use crate::net::protocol::GameEvent;

/// How far below its feet a previously supported fighter looks for support
pub const SUPPORT_PROBE: f32 = 0.05;

/// Arena bounds and surface parameters. Bounds span `[0, width] x [0, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArenaMap {
    pub width: f32,
    pub height: f32,
    /// Ground friction coefficient
    pub friction: f32,
    /// Wall acceleration per unit outside the bounds
    pub wall_strength: f32,
}

impl Default for ArenaMap {
    fn default() -> Self {
        Self {
            width: 100.0,
            height: 100.0,
            friction: 1.0,
            wall_strength: 20.0,
        }
    }
}

impl ArenaMap {
    pub fn contains(&self, position: Vec3) -> bool {
        (0.0..=self.width).contains(&position.x) && (0.0..=self.height).contains(&position.y)
    }
}

/// One tick of player intent
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Action {
    pub move_direction: Vec2,
    pub aim_direction: Vec2,
    pub firing: bool,
    pub jump: bool,
}

#[derive(Debug, Clone)]
pub struct World {
    pub map: ArenaMap,
    pub fighters: Vec<Fighter>,
    pub projectiles: Vec<Projectile>,
    pub props: Vec<Prop>,
    pub random: RandomSource,
    /// Remove fighters whose health reached zero
    pub reap_dead: bool,
    pub tick: u64,
    next_fighter_id: u32,
    next_projectile_id: u32,
    next_prop_id: u32,
    events: Vec<GameEvent>,
}

impl World {
    pub fn new(map: ArenaMap, seed: u64) -> Self {
        Self {
            map,
            fighters: Vec::new(),
            projectiles: Vec::new(),
            props: Vec::new(),
            random: RandomSource::new(seed),
            reap_dead: true,
            tick: 0,
            next_fighter_id: 1,
            next_projectile_id: 1,
            next_prop_id: 1,
            events: Vec::new(),
        }
    }

    pub fn spawn_fighter(&mut self, player: Uuid, archetype: Archetype, position: Vec3) -> FighterId {
        let id = FighterId(self.next_fighter_id);
        self.next_fighter_id += 1;
        self.fighters.push(Fighter::new(id, player, archetype, position));
        debug!(fighter = %id, player = %player, archetype = %archetype, "fighter spawned");
        id
    }

    /// Insert a fighter that already carries an id (snapshot ingestion)
    pub fn insert_fighter(&mut self, fighter: Fighter) {
        self.next_fighter_id = self.next_fighter_id.max(fighter.id.0 + 1);
        self.fighters.push(fighter);
    }

    pub fn add_prop(&mut self, position: Vec3, collider: Collider) -> u32 {
        let id = self.next_prop_id;
        self.next_prop_id += 1;
        self.props.push(Prop::new(id, position, collider));
        id
    }

    pub fn insert_prop(&mut self, prop: Prop) {
        self.next_prop_id = self.next_prop_id.max(prop.id + 1);
        self.props.push(prop);
    }

    pub fn spawn_projectile(&mut self, owner: FighterId, kind: ProjectileKind, origin: Vec3, direction: Vec3) -> ProjectileId {
        let id = ProjectileId(self.next_projectile_id);
        self.next_projectile_id += 1;
        self.projectiles.push(Projectile::new(id, owner, kind, origin, direction));
        id
    }

    pub fn insert_projectile(&mut self, projectile: Projectile) {
        self.next_projectile_id = self.next_projectile_id.max(projectile.id.0 + 1);
        self.projectiles.push(projectile);
    }

    /// Remove a fighter and sever every link that points at it
    pub fn remove_fighter(&mut self, id: FighterId) -> Option<Fighter> {
        let index = self.index_of(id)?;
        let removed = self.fighters.remove(index);
        for fighter in &mut self.fighters {
            if fighter.riding == Some(id) {
                fighter.riding = None;
            }
            if fighter.rode_this_tick == Some(id) {
                fighter.rode_this_tick = None;
            }
            if fighter.bumped == Some(id) {
                fighter.bumped = None;
            }
            for constraint in fighter.constraints.iter_mut().filter(|c| c.owner == id) {
                constraint.complete();
            }
        }
        debug!(fighter = %id, "fighter removed");
        Some(removed)
    }

    pub fn index_of(&self, id: FighterId) -> Option<usize> {
        self.fighters.iter().position(|f| f.id == id)
    }

    pub fn fighter(&self, id: FighterId) -> Option<&Fighter> {
        self.fighters.iter().find(|f| f.id == id)
    }

    pub fn fighter_mut(&mut self, id: FighterId) -> Option<&mut Fighter> {
        self.fighters.iter_mut().find(|f| f.id == id)
    }

    /// Apply a player's intent; only valid between ticks
    pub fn apply_action(&mut self, id: FighterId, action: &Action) -> Result<(), SimError> {
        let index = self.index_of(id).ok_or(SimError::UnknownFighter(id))?;
        let candidates = if action.jump {
            self.jump_candidates(index)
        } else {
            Vec::new()
        };

        let fighter = &mut self.fighters[index];
        fighter.move_toward(action.move_direction);
        fighter.aim_at(action.aim_direction);
        fighter.firing = action.firing;

        if action.jump {
            if let JumpOutcome::Grab(target) = fighter.jump(false, &candidates) {
                self.begin_takedown(id, target);
            }
        }
        Ok(())
    }

    fn jump_candidates(&self, index: usize) -> Vec<JumpCandidate> {
        self.fighters
            .iter()
            .enumerate()
            .filter(|(i, f)| *i != index && f.is_alive())
            .map(|(_, f)| JumpCandidate {
                id: f.id,
                position: f.body.position,
                constrained: f.is_constrained(),
            })
            .collect()
    }

    fn begin_takedown(&mut self, owner: FighterId, target: FighterId) {
        let (Some(owner_fighter), Some(victim)) = (self.fighter(owner), self.fighter(target)) else {
            return;
        };
        let throw_dir = throw_direction(
            owner_fighter.body.position,
            victim.body.position,
            owner_fighter.aim.extend(0.0),
        );
        self.attach_constraint(target, Constraint::takedown(owner, throw_dir));
    }

    /// Attach a constraint to `victim`. A second takedown on the same victim is refused.
    pub fn attach_constraint(&mut self, victim: FighterId, constraint: Constraint) -> bool {
        let Some(index) = self.index_of(victim) else {
            return false;
        };
        let takedown = matches!(constraint.kind, ConstraintKind::Takedown { .. });
        if takedown && self.fighters[index].has_takedown() {
            return false;
        }

        let owner = constraint.owner;
        let name = constraint.kind.name();
        self.fighters[index].constraints.push(constraint);

        if takedown {
            if let Some(owner_index) = self.index_of(owner) {
                if let ArchetypeState::Brawler { grabbing, .. } = &mut self.fighters[owner_index].state {
                    *grabbing = true;
                }
            }
        }

        debug!(victim = %victim, owner = %owner, constraint = name, "constraint attached");
        self.events.push(GameEvent::ConstraintAttached {
            victim,
            owner,
            constraint: name.to_string(),
        });
        true
    }

    /// Pin a fighter where it stands until `release`
    pub fn freeze(&mut self, id: FighterId) -> bool {
        let Some(fighter) = self.fighter(id) else {
            return false;
        };
        let already = fighter
            .constraints
            .iter()
            .any(|c| matches!(c.kind, ConstraintKind::Freeze { .. }) && !c.is_completed());
        if already {
            return false;
        }
        let anchor = fighter.body.position;
        self.attach_constraint(id, Constraint::freeze(id, anchor))
    }

    pub fn release(&mut self, id: FighterId) {
        if let Some(fighter) = self.fighter_mut(id) {
            for constraint in &mut fighter.constraints {
                if matches!(constraint.kind, ConstraintKind::Freeze { .. }) {
                    constraint.complete();
                }
            }
        }
    }

    /// Advance the world by `dt` and return the events it produced
    pub fn tick(&mut self, dt: f32, high_latency: bool) -> Vec<GameEvent> {
        self.do_updates(dt, high_latency);
        self.tick_physics(dt);
        self.tick += 1;
        mem::take(&mut self.events)
    }

    fn do_updates(&mut self, dt: f32, high_latency: bool) {
        for index in 0..self.fighters.len() {
            self.fighters[index].tick_cooldowns(dt);
            self.discharge_weapon(index, high_latency);
        }

        if self.reap_dead {
            let dead: Vec<FighterId> = self
                .fighters
                .iter()
                .filter(|f| !f.is_alive())
                .map(|f| f.id)
                .collect();
            for id in dead {
                if let Some(fighter) = self.remove_fighter(id) {
                    self.events.push(GameEvent::Death {
                        fighter: fighter.id,
                        player: fighter.player,
                        archetype: fighter.archetype,
                    });
                }
            }
        }
    }

    /// Fire as many shots as the cooldown allows. In high-latency mode the
    /// recoil of catch-up shots does not stack.
    fn discharge_weapon(&mut self, index: usize, high_latency: bool) {
        let mut shots = 0;
        while shots < MAX_SHOTS_PER_TICK && self.fighters[index].can_fire() {
            let fighter = &self.fighters[index];
            let archetype = fighter.archetype;
            let stats = archetype.on_fire_weapon(fighter);
            let aim = fighter.aim.heading();
            let owner = fighter.id;

            let spread = if stats.spread > 0.0 {
                self.random.spread(stats.spread)
            } else {
                0.0
            };
            let direction = planar_direction(aim + spread);
            let origin = self.fighters[index].muzzle(direction);
            let kind = archetype.weapon();
            let projectile = self.spawn_projectile(owner, kind, origin, direction);

            let fighter = &mut self.fighters[index];
            fighter.consume_shot(stats.interval);
            if stats.recoil > 0.0 && !(high_latency && fighter.bullet_shock) {
                fighter.apply_momentum(-direction * stats.recoil, None, None);
            }
            fighter.bullet_shock = true;

            self.events.push(GameEvent::Shot {
                shooter: owner,
                projectile,
                kind,
                position: origin,
                direction,
            });
            shots += 1;
        }
    }

    fn tick_physics(&mut self, dt: f32) {
        for prop in &mut self.props {
            prop.last_position = prop.body.position;
            prop.on_surface = false;
            if prop.is_kinematic() {
                PhysicsSystem::step_kinematic(prop, dt);
            }
        }

        // Lower bodies resolve before anything stacked on them
        self.fighters
            .sort_by(|a, b| a.body.position.z.total_cmp(&b.body.position.z));
        self.compute_effective_mass();

        let map = self.map;
        for index in 0..self.fighters.len() {
            let start = self.fighters[index].body.position;
            self.fighters[index].set_last_position(start);

            let scripted = self.run_constraints(index, dt);
            self.fighters[index].scripted = scripted;
            if !scripted {
                if let Some(impact) = PhysicsSystem::step_fighter(&mut self.fighters[index], &map, dt) {
                    if impact < 0.0 {
                        self.land(index, impact);
                    }
                }
            }
            self.fighters[index].clear_contacts();
        }

        self.carry_riders();

        for index in 0..self.fighters.len() {
            if !self.fighters[index].scripted {
                self.resolve_collisions(index);
            }
        }

        self.tick_projectiles(dt);
        self.prune_constraints();
    }

    /// Own mass plus the mass of everything riding on top, transitively.
    /// Expects fighters sorted by height so riders come after their mounts.
    fn compute_effective_mass(&mut self) {
        for fighter in &mut self.fighters {
            fighter.effective_mass = fighter.mass();
        }
        for index in (0..self.fighters.len()).rev() {
            let Some(carrier) = self.fighters[index].riding else {
                continue;
            };
            if let Some(carrier_index) = self.index_of(carrier).filter(|&c| c < index) {
                let mass = self.fighters[index].effective_mass;
                self.fighters[carrier_index].effective_mass += mass;
            }
        }
    }

    fn run_constraints(&mut self, index: usize, dt: f32) -> bool {
        if self.fighters[index].constraints.is_empty() {
            return false;
        }
        let mut constraints = mem::take(&mut self.fighters[index].constraints);
        let mut scripted = false;
        for constraint in constraints.iter_mut() {
            let owner = self.index_of(constraint.owner).filter(|&o| o != index);
            scripted |= match owner {
                Some(owner) => {
                    let (victim, owner) = pair_mut(&mut self.fighters, index, owner);
                    constraint.tick(dt, victim, Some(&*owner))
                }
                None => constraint.tick(dt, &mut self.fighters[index], None),
            };
        }
        self.fighters[index].constraints = constraints;
        scripted
    }

    /// Move riders by their mount's displacement, bottom of each stack first
    fn carry_riders(&mut self) {
        for index in 0..self.fighters.len() {
            let shift = if let Some(carrier) = self.fighters[index].rode_this_tick {
                self.index_of(carrier)
                    .filter(|&c| c != index)
                    .map(|c| self.fighters[c].displacement())
            } else if let Some(prop_id) = self.fighters[index].rested_this_tick {
                self.props
                    .iter()
                    .find(|p| p.id == prop_id)
                    .map(|p| p.displacement())
            } else {
                None
            };
            if let Some(shift) = shift {
                self.fighters[index].body.position += shift;
            }
        }
    }

    fn land(&mut self, index: usize, impact: f32) {
        let fighter = &mut self.fighters[index];
        fighter.land();
        self.events.push(GameEvent::Landed {
            fighter: fighter.id,
            impact_velocity: impact,
            mass: fighter.effective_mass,
        });
    }

    fn resolve_collisions(&mut self, index: usize) {
        let me = &self.fighters[index];
        let ray = Ray::new(me.last_position, me.body.position);
        let mut best: Option<TraceResult> = None;

        for (other_index, other) in self.fighters.iter().enumerate() {
            if other_index == index
                || other.scripted
                || other.bumped == Some(me.id)
                || other.last_position.z > me.last_position.z + SURFACE_TOLERANCE
                || me.ignores_collision_with(other)
            {
                continue;
            }

            // Sweep in the candidate's pre-move frame
            let shift = other.displacement();
            let relative = Ray::new(ray.start, ray.end - shift);
            let reach = me.radius() + other.radius() + relative.length();
            if (relative.start - other.last_position).length_xy() > reach {
                continue;
            }

            let mut hit = other
                .collider
                .trace(other.last_position, &relative, me.radius(), me.height(), false);
            if hit.collided {
                hit.position += shift;
                hit.target = Some(HitTarget::Fighter(other_index));
                if hit.beats(&best) {
                    best = Some(hit);
                }
            }
        }

        for (prop_index, prop) in self.props.iter().enumerate() {
            let mut hit = prop.sweep(&ray, me.radius(), me.height());
            if hit.collided {
                hit.target = Some(HitTarget::Prop(prop_index));
                if hit.beats(&best) {
                    best = Some(hit);
                }
            }
        }

        if let Some(hit) = best {
            match hit.target {
                Some(HitTarget::Fighter(other)) => self.resolve_fighter_hit(index, other, &hit),
                Some(HitTarget::Prop(prop)) => self.resolve_prop_hit(index, prop, &hit),
                None => {}
            }
        }

        let me = &self.fighters[index];
        let was_supported = me.rode_this_tick.is_some() || me.rested_this_tick.is_some();
        let supported = me.riding.is_some() || me.resting_on.is_some();
        if was_supported && !supported && me.body.velocity.z <= 0.0 && !me.on_ground() {
            self.probe_support(index);
        }
    }

    fn resolve_fighter_hit(&mut self, index: usize, other_index: usize, hit: &TraceResult) {
        let mut stomped = None;
        let mut landed = None;
        {
            let (me, other) = pair_mut(&mut self.fighters, index, other_index);

            if hit.top_face {
                let impact = me.body.velocity.z;
                me.body.position = hit.position;
                me.body.velocity.z = me.body.velocity.z.max(0.0);
                me.riding = Some(other.id);
                other.on_surface = true;
                if impact < 0.0 {
                    landed = Some(impact);
                    if me.archetype.on_landed_on_fighter(impact) {
                        stomped = Some((other.id, me.id));
                    }
                }
            } else if hit.normal.z < 0.0 {
                me.body.position = hit.position;
                me.body.velocity.z = me.body.velocity.z.min(0.0);
            } else {
                me.body.position = hit.position + hit.normal * SKIN;
                let mounted = me.rode_this_tick == Some(other.id) || other.rode_this_tick == Some(me.id);
                if mounted {
                    let into = me.body.velocity.dot(hit.normal);
                    if into < 0.0 {
                        me.body.velocity -= hit.normal * into;
                    }
                } else {
                    swap_momentum(me, other);
                }
                me.bumped = Some(other.id);
                other.bumped = Some(me.id);
            }
        }

        if let Some(impact) = landed {
            self.land(index, impact);
        }
        if let Some((victim, owner)) = stomped {
            self.attach_constraint(victim, Constraint::stun(owner));
        }
    }

    fn resolve_prop_hit(&mut self, index: usize, prop_index: usize, hit: &TraceResult) {
        let prop = &mut self.props[prop_index];
        let fighter = &mut self.fighters[index];
        let span = fighter.height();
        if let ContactFace::Top { impact } = prop.reposition(hit, &mut fighter.body, span) {
            fighter.resting_on = Some(prop.id);
            prop.on_surface = true;
            if impact < 0.0 {
                self.land(index, impact);
            }
        }
    }

    /// Short downward trace that re-establishes support on a top face
    fn probe_support(&mut self, index: usize) {
        let me = &self.fighters[index];
        let origin = me.body.position;
        let ray = Ray::new(origin, origin - Vec3::Z * SUPPORT_PROBE);
        let mut best: Option<TraceResult> = None;

        for (other_index, other) in self.fighters.iter().enumerate() {
            if other_index == index || other.scripted || me.ignores_collision_with(other) {
                continue;
            }
            let mut hit = other.collider.trace(other.body.position, &ray, me.radius(), me.height(), false);
            if hit.collided && hit.top_face {
                hit.target = Some(HitTarget::Fighter(other_index));
                if hit.beats(&best) {
                    best = Some(hit);
                }
            }
        }
        for (prop_index, prop) in self.props.iter().enumerate() {
            let mut hit = prop.trace(&ray, me.radius(), me.height(), false);
            if hit.collided && hit.top_face {
                hit.target = Some(HitTarget::Prop(prop_index));
                if hit.beats(&best) {
                    best = Some(hit);
                }
            }
        }

        let Some(hit) = best else {
            return;
        };
        match hit.target {
            Some(HitTarget::Fighter(other_index)) => {
                let (me, other) = pair_mut(&mut self.fighters, index, other_index);
                me.body.position.z = hit.position.z;
                me.body.velocity.z = 0.0;
                me.riding = Some(other.id);
                other.on_surface = true;
            }
            Some(HitTarget::Prop(prop_index)) => {
                let prop = &mut self.props[prop_index];
                let me = &mut self.fighters[index];
                me.body.position.z = hit.position.z;
                me.body.velocity.z = 0.0;
                me.resting_on = Some(prop.id);
                prop.on_surface = true;
            }
            None => {}
        }
    }

    fn tick_projectiles(&mut self, dt: f32) {
        for projectile in &mut self.projectiles {
            projectile.tick(dt);
        }
        self.projectiles.retain(|p| !p.is_expired());

        let mut destroyed = Vec::new();
        for index in 0..self.projectiles.len() {
            let projectile = &self.projectiles[index];
            let ray = Ray::new(projectile.last_position, projectile.body.position);
            let boost = projectile.hit_radius();
            let mut best: Option<TraceResult> = None;

            for (fighter_index, fighter) in self.fighters.iter().enumerate() {
                if fighter.id == projectile.owner || !fighter.is_alive() {
                    continue;
                }
                let mut hit = fighter.collider.trace(fighter.body.position, &ray, boost, 0.0, true);
                if hit.collided {
                    hit.target = Some(HitTarget::Fighter(fighter_index));
                    if hit.beats(&best) {
                        best = Some(hit);
                    }
                }
            }
            for (prop_index, prop) in self.props.iter().enumerate() {
                let mut hit = prop.trace(&ray, boost, 0.0, true);
                if hit.collided {
                    hit.target = Some(HitTarget::Prop(prop_index));
                    if hit.beats(&best) {
                        best = Some(hit);
                    }
                }
            }

            let Some(hit) = best else {
                continue;
            };
            match hit.target {
                Some(HitTarget::Fighter(fighter_index)) => {
                    let damage = projectile.damage;
                    let owner = projectile.owner;
                    destroyed.push(projectile.id);
                    self.apply_damage(fighter_index, damage, Some(owner), "shot", hit.position);
                }
                Some(HitTarget::Prop(_)) if hit.top_face => {
                    let projectile = &mut self.projectiles[index];
                    projectile.body.position.x = hit.position.x;
                    projectile.body.position.y = hit.position.y;
                    projectile.bounce_at(hit.position.z);
                }
                Some(HitTarget::Prop(_)) => destroyed.push(projectile.id),
                None => {}
            }
        }

        if !destroyed.is_empty() {
            self.projectiles.retain(|p| !destroyed.contains(&p.id));
        }
    }

    /// Damage a fighter, credit the attacker and report the hit and any kill
    pub fn apply_damage(&mut self, index: usize, amount: f32, attacker: Option<FighterId>, cause: &str, position: Vec3) {
        let target = &mut self.fighters[index];
        let before = target.health;
        let lethal = target.take_damage(amount, attacker);
        let dealt = before - target.health;
        let victim = target.id;
        if dealt <= 0.0 {
            return;
        }

        if let Some(attacker_index) = attacker.and_then(|a| self.index_of(a)) {
            let killer = &mut self.fighters[attacker_index];
            killer.damage_dealt += dealt;
            if lethal && attacker_index != index {
                killer.earn_kill();
            }
        }

        self.events.push(GameEvent::Hit {
            attacker,
            target: victim,
            damage: dealt,
            position,
        });
        if lethal {
            debug!(victim = %victim, cause, "fighter killed");
            self.events.push(GameEvent::Kill {
                killer: attacker,
                victim,
                cause: cause.to_string(),
            });
        }
    }

    /// Finish and detach completed constraints
    fn prune_constraints(&mut self) {
        for index in 0..self.fighters.len() {
            if !self.fighters[index].constraints.iter().any(|c| c.is_completed()) {
                continue;
            }
            let mut constraints = mem::take(&mut self.fighters[index].constraints);
            let mut outcomes = Vec::new();
            let victim_id = self.fighters[index].id;

            for constraint in constraints.iter_mut().filter(|c| c.is_completed()) {
                let owner = self.index_of(constraint.owner).filter(|&o| o != index);
                let outcome = match owner {
                    Some(owner) => {
                        let (victim, owner) = pair_mut(&mut self.fighters, index, owner);
                        constraint.finish(victim, Some(&*owner), &mut self.random)
                    }
                    None => constraint.finish(&mut self.fighters[index], None, &mut self.random),
                };
                outcomes.extend(outcome);

                if let (ConstraintKind::Takedown { .. }, Some(owner)) = (constraint.kind, owner) {
                    if let ArchetypeState::Brawler { grabbing, .. } = &mut self.fighters[owner].state {
                        *grabbing = false;
                    }
                }

                let name = constraint.kind.name();
                debug!(victim = %victim_id, constraint = name, "constraint detached");
                self.events.push(GameEvent::ConstraintDetached {
                    victim: victim_id,
                    constraint: name.to_string(),
                });
            }

            constraints.retain(|c| !c.is_completed());
            self.fighters[index].constraints = constraints;

            for outcome in outcomes {
                let position = self.fighters[index].body.position;
                self.apply_damage(index, outcome.damage, Some(outcome.attacker), "takedown", position);
            }
        }
    }

    pub fn next_fighter_id(&self) -> u32 {
        self.next_fighter_id
    }

    /// Re-derive id counters after collections were replaced wholesale
    pub fn sync_id_counters(&mut self) {
        let fighter = self.fighters.iter().map(|f| f.id.0 + 1).max().unwrap_or(1);
        let projectile = self.projectiles.iter().map(|p| p.id.0 + 1).max().unwrap_or(1);
        let prop = self.props.iter().map(|p| p.id + 1).max().unwrap_or(1);
        self.next_fighter_id = self.next_fighter_id.max(fighter);
        self.next_projectile_id = self.next_projectile_id.max(projectile);
        self.next_prop_id = self.next_prop_id.max(prop);
    }
}

/// Exchange planar momentum between two colliding fighters. Each body leaves
/// with the other's momentum divided by its own effective mass.
fn swap_momentum(a: &mut Fighter, b: &mut Fighter) {
    let (mass_a, mass_b) = (a.effective_mass.max(EPSILON), b.effective_mass.max(EPSILON));
    let momentum_a = a.body.velocity.truncate() * mass_a;
    let momentum_b = b.body.velocity.truncate() * mass_b;

    let velocity_a = (momentum_b / mass_a).extend(a.body.velocity.z);
    let velocity_b = (momentum_a / mass_b).extend(b.body.velocity.z);
    a.body.velocity = velocity_a.clamp_length_xy(a.terminal_speed());
    b.body.velocity = velocity_b.clamp_length_xy(b.terminal_speed());
}

fn pair_mut<T>(items: &mut [T], first: usize, second: usize) -> (&mut T, &mut T) {
    debug_assert_ne!(first, second);
    if first < second {
        let (low, high) = items.split_at_mut(second);
        (&mut low[first], &mut high[0])
    } else {
        let (low, high) = items.split_at_mut(first);
        (&mut high[0], &mut low[second])
    }
}
