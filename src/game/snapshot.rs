//! Snapshot capture, JSON codec and client-side ingestion

use std::collections::{HashMap, HashSet};

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::net::protocol::{GameEvent, ServerMsg};

use super::archetype::{Archetype, SpecialState};
use super::combat::{Projectile, ProjectileId, ProjectileKind};
use super::constraint::Constraint;
use super::error::SnapshotError;
use super::fighter::{Boost, Fighter, FighterId};
use super::prop::Prop;
use super::random::RandomState;
use super::world::{ArenaMap, World};

/// Consecutive snapshots a fighter may be missing from before a client drops it
pub const STALE_SNAPSHOT_LIMIT: u32 = 3;

/// Replicated fighter state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FighterSnapshot {
    pub id: FighterId,
    pub player: Uuid,
    pub archetype: Archetype,
    pub position: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    pub aim: Vec2,
    pub firing: bool,
    pub attack_cooldown: f32,
    pub health: f32,
    pub kills: u32,
    pub special: SpecialState,
    pub boost: Option<Boost>,
    /// Active constraints, so a held or stunned fighter is not predicted moving
    pub constraints: Vec<Constraint>,
}

impl FighterSnapshot {
    pub fn capture(fighter: &Fighter) -> Self {
        Self {
            id: fighter.id,
            player: fighter.player,
            archetype: fighter.archetype,
            position: fighter.body.position,
            velocity: fighter.body.velocity,
            acceleration: fighter.body.acceleration,
            aim: fighter.aim,
            firing: fighter.firing,
            attack_cooldown: fighter.attack_cooldown,
            health: fighter.health,
            kills: fighter.kills,
            special: fighter.archetype.special_state(fighter),
            boost: fighter.boost,
            constraints: fighter.constraints.clone(),
        }
    }

    /// Overwrite every replicated field of `fighter`
    pub fn apply(&self, fighter: &mut Fighter) {
        fighter.id = self.id;
        fighter.body.position = self.position;
        fighter.body.velocity = self.velocity;
        fighter.body.acceleration = self.acceleration;
        fighter.last_position = self.position;
        fighter.aim = self.aim;
        fighter.firing = self.firing;
        fighter.attack_cooldown = self.attack_cooldown;
        fighter.health = self.health;
        fighter.kills = self.kills;
        let archetype = fighter.archetype;
        archetype.set_special_state(fighter, self.special);
        fighter.boost = self.boost;
        fighter.constraints = self.constraints.clone();
    }

    pub fn to_fighter(&self) -> Fighter {
        let mut fighter = Fighter::new(self.id, self.player, self.archetype, self.position);
        self.apply(&mut fighter);
        fighter
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileSnapshot {
    pub id: ProjectileId,
    pub owner: FighterId,
    pub kind: ProjectileKind,
    pub position: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    pub lifetime: f32,
}

impl ProjectileSnapshot {
    pub fn capture(projectile: &Projectile) -> Self {
        Self {
            id: projectile.id,
            owner: projectile.owner,
            kind: projectile.kind,
            position: projectile.body.position,
            velocity: projectile.body.velocity,
            acceleration: projectile.body.acceleration,
            lifetime: projectile.lifetime,
        }
    }

    pub fn to_projectile(&self) -> Projectile {
        let mut projectile = Projectile::new(self.id, self.owner, self.kind, self.position, self.velocity);
        projectile.body.velocity = self.velocity;
        projectile.body.acceleration = self.acceleration;
        projectile.lifetime = self.lifetime;
        projectile
    }
}

/// Full simulation state at the end of a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub random: RandomState,
    pub map: ArenaMap,
    pub fighters: Vec<FighterSnapshot>,
    pub projectiles: Vec<ProjectileSnapshot>,
    pub props: Vec<Prop>,
}

impl WorldSnapshot {
    pub fn capture(world: &World) -> Self {
        let mut fighters: Vec<FighterSnapshot> = world.fighters.iter().map(FighterSnapshot::capture).collect();
        fighters.sort_by_key(|f| f.id);

        Self {
            tick: world.tick,
            random: world.random.state(),
            map: world.map,
            fighters,
            projectiles: world.projectiles.iter().map(ProjectileSnapshot::capture).collect(),
            props: world.props.clone(),
        }
    }

    pub fn encode(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl World {
    /// Build a fresh world from a snapshot
    pub fn from_snapshot(snapshot: &WorldSnapshot) -> Self {
        let mut world = World::new(snapshot.map, snapshot.random.seed);
        world.random.restore(snapshot.random);
        world.tick = snapshot.tick;
        for fighter in &snapshot.fighters {
            world.insert_fighter(fighter.to_fighter());
        }
        for projectile in &snapshot.projectiles {
            world.insert_projectile(projectile.to_projectile());
        }
        for prop in &snapshot.props {
            world.insert_prop(settled(prop));
        }
        world
    }
}

fn settled(prop: &Prop) -> Prop {
    let mut prop = prop.clone();
    prop.last_position = prop.body.position;
    prop
}

/// Client-side ingestion of host snapshots
#[derive(Debug)]
pub struct SnapshotReceiver {
    /// Consecutive snapshots each local fighter was absent from
    misses: HashMap<(Uuid, Archetype), u32>,
    stale_limit: u32,
}

impl SnapshotReceiver {
    pub fn new(stale_limit: u32) -> Self {
        Self {
            misses: HashMap::new(),
            stale_limit,
        }
    }

    /// Overwrite local state with the host's. The random source is restored
    /// before anything else so prediction resumes from the host's draw.
    pub fn apply(&mut self, world: &mut World, snapshot: &WorldSnapshot) {
        world.random.restore(snapshot.random);
        world.map = snapshot.map;
        world.tick = snapshot.tick;

        let mut refreshed: HashSet<FighterId> = HashSet::new();
        for replicated in &snapshot.fighters {
            let key = (replicated.player, replicated.archetype);
            self.misses.remove(&key);

            let local = world
                .fighters
                .iter_mut()
                .find(|f| (f.player, f.archetype) == key && !refreshed.contains(&f.id));
            match local {
                Some(fighter) => replicated.apply(fighter),
                None => world.insert_fighter(replicated.to_fighter()),
            }
            refreshed.insert(replicated.id);
        }

        let mut stale = Vec::new();
        for fighter in world.fighters.iter().filter(|f| !refreshed.contains(&f.id)) {
            let key = (fighter.player, fighter.archetype);
            let misses = self.misses.entry(key).or_insert(0);
            *misses += 1;
            if *misses > self.stale_limit {
                stale.push((fighter.id, key));
            }
        }
        for (id, key) in stale {
            world.remove_fighter(id);
            self.misses.remove(&key);
        }

        world.projectiles.clear();
        for projectile in &snapshot.projectiles {
            world.insert_projectile(projectile.to_projectile());
        }
        world.props.clear();
        for prop in &snapshot.props {
            world.insert_prop(settled(prop));
        }
        world.sync_id_counters();
    }
}

impl Default for SnapshotReceiver {
    fn default() -> Self {
        Self::new(STALE_SNAPSHOT_LIMIT)
    }
}

/// Builds snapshots for network transmission
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force snapshot on next check (joins, leaves)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    pub fn build(&self, world: &World, events: Vec<GameEvent>) -> ServerMsg {
        ServerMsg::Snapshot {
            snapshot: WorldSnapshot::capture(world),
            events,
        }
    }
}
