//! Arena host: owns the authoritative World and drives its tick loop

use dashmap::DashMap;
use glam::{Vec2, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::net::protocol::{ClientMsg, GameEvent, ServerMsg};
use crate::util::rate_limit::PlayerRateLimiter;
use crate::util::time::{
    snapshot_interval, tick_delta, tick_duration, unix_millis, Timer, DEFAULT_SIMULATION_TPS,
    DEFAULT_SNAPSHOT_TPS,
};

use super::archetype::Archetype;
use super::fighter::FighterId;
use super::snapshot::SnapshotBuilder;
use super::world::{Action, ArenaMap, World};
use super::PlayerInput;

/// Longest simulated step a single late tick may cover, in timesteps
const MAX_CATCH_UP_STEPS: f32 = 3.0;
/// Distance kept between spawn points and the arena edge
const SPAWN_MARGIN: f32 = 5.0;

/// Arena tuning handed to a match at creation
#[derive(Debug, Clone)]
pub struct MatchSettings {
    pub simulation_tps: u32,
    pub snapshot_tps: u32,
    pub map: ArenaMap,
    pub seed: u64,
    pub max_players: usize,
    /// Fighters stay frozen until this many players are present
    pub min_players: usize,
    pub reap_dead: bool,
    pub high_latency_factor: f32,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            simulation_tps: DEFAULT_SIMULATION_TPS,
            snapshot_tps: DEFAULT_SNAPSHOT_TPS,
            map: ArenaMap::default(),
            seed: 0,
            max_players: 8,
            min_players: 2,
            reap_dead: true,
            high_latency_factor: 2.0,
        }
    }
}

impl MatchSettings {
    pub fn tick_delta(&self) -> f32 {
        tick_delta(self.simulation_tps)
    }

    pub fn snapshot_interval(&self) -> u32 {
        snapshot_interval(self.simulation_tps, self.snapshot_tps)
    }
}

/// A connected player and the fighter it controls
#[derive(Clone)]
struct PlayerSlot {
    fighter: FighterId,
    last_input_seq: u32,
    /// Latest intent, re-applied every tick until replaced
    action: Action,
    limiter: PlayerRateLimiter,
}

impl PlayerSlot {
    fn new(fighter: FighterId) -> Self {
        Self {
            fighter,
            last_input_seq: 0,
            action: Action::default(),
            limiter: PlayerRateLimiter::new(),
        }
    }
}

/// Handle to a running match
#[derive(Clone)]
pub struct MatchHandle {
    pub id: Uuid,
    pub input_tx: mpsc::Sender<PlayerInput>,
    pub snapshot_tx: broadcast::Sender<ServerMsg>,
    pub player_count: Arc<AtomicUsize>,
}

impl MatchHandle {
    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.snapshot_tx.subscribe()
    }
}

/// Registry of all active matches
pub struct MatchRegistry {
    matches: DashMap<Uuid, MatchHandle>,
}

impl MatchRegistry {
    pub fn new() -> Self {
        Self {
            matches: DashMap::new(),
        }
    }

    pub fn insert(&self, handle: MatchHandle) {
        self.matches.insert(handle.id, handle);
    }

    pub fn remove(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.remove(id).map(|(_, h)| h)
    }

    pub fn active_matches(&self) -> usize {
        self.matches.len()
    }

    pub fn total_players(&self) -> usize {
        self.matches
            .iter()
            .map(|m| m.value().player_count())
            .sum()
    }
}

impl Default for MatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The authoritative arena
pub struct GameMatch {
    id: Uuid,
    world: World,
    settings: MatchSettings,
    players: HashMap<Uuid, PlayerSlot>,
    /// Spawn placement, kept apart from the replicated random source
    spawn_rng: ChaCha8Rng,
    input_rx: mpsc::Receiver<PlayerInput>,
    snapshot_tx: broadcast::Sender<ServerMsg>,
    snapshot_builder: SnapshotBuilder,
    player_count: Arc<AtomicUsize>,
    /// Events since the last broadcast snapshot
    pending_events: Vec<GameEvent>,
    /// Fighters are held frozen until enough players joined
    holding: bool,
}

impl GameMatch {
    /// Create a new match
    pub fn new(id: Uuid, settings: MatchSettings) -> (Self, MatchHandle) {
        let (input_tx, input_rx) = mpsc::channel(256);
        let (snapshot_tx, _) = broadcast::channel(64);
        let player_count = Arc::new(AtomicUsize::new(0));

        let handle = MatchHandle {
            id,
            input_tx,
            snapshot_tx: snapshot_tx.clone(),
            player_count: player_count.clone(),
        };

        let mut world = World::new(settings.map, settings.seed);
        world.reap_dead = settings.reap_dead;

        let game_match = Self {
            id,
            world,
            spawn_rng: ChaCha8Rng::seed_from_u64(settings.seed ^ 0x5eed),
            input_rx,
            snapshot_tx,
            snapshot_builder: SnapshotBuilder::new(settings.snapshot_interval()),
            player_count,
            pending_events: Vec::new(),
            holding: settings.min_players > 1,
            settings,
            players: HashMap::new(),
        };

        (game_match, handle)
    }

    /// Run the authoritative tick loop until every handle is dropped
    pub async fn run(mut self) {
        info!(
            match_id = %self.id,
            tps = self.settings.simulation_tps,
            seed = self.world.random.seed(),
            "Match started"
        );

        let dt = self.settings.tick_delta();
        let mut tick_interval = interval(tick_duration(self.settings.simulation_tps));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_tick = Instant::now();

        loop {
            tick_interval.tick().await;

            let now = Instant::now();
            let gap = now.duration_since(last_tick).as_secs_f32();
            last_tick = now;

            // Late ticks cover the lost time in one longer step
            let high_latency = gap > dt * self.settings.high_latency_factor;
            let step = if high_latency {
                gap.min(dt * MAX_CATCH_UP_STEPS)
            } else {
                dt
            };

            if !self.step(step, high_latency) {
                break;
            }
        }

        info!(match_id = %self.id, tick = self.world.tick, "Match closed");
    }

    /// One host tick. Returns false once the input channel has closed.
    pub fn step(&mut self, dt: f32, high_latency: bool) -> bool {
        let timer = Timer::new();
        let open = self.process_inputs();

        self.apply_actions();
        let events = self.world.tick(dt, high_latency);
        self.handle_eliminations(&events);
        self.pending_events.extend(events);

        if self.snapshot_builder.should_send() {
            let events = mem::take(&mut self.pending_events);
            let snapshot = self.snapshot_builder.build(&self.world, events);
            let _ = self.snapshot_tx.send(snapshot);
        }

        let elapsed = timer.elapsed_micros();
        let budget = (dt * 1_000_000.0) as u64;
        if elapsed > budget {
            warn!(match_id = %self.id, elapsed_us = elapsed, budget_us = budget, "Slow tick");
        }
        open
    }

    /// Drain the input queue
    fn process_inputs(&mut self) -> bool {
        loop {
            let input = match self.input_rx.try_recv() {
                Ok(input) => input,
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            };

            match input.msg {
                ClientMsg::JoinMatch { archetype } => {
                    self.handle_join(input.user_id, &archetype);
                }
                ClientMsg::InputTick {
                    seq,
                    move_x,
                    move_y,
                    aim_x,
                    aim_y,
                    firing,
                    jump,
                } => {
                    let action = Action {
                        move_direction: Vec2::new(move_x, move_y),
                        aim_direction: Vec2::new(aim_x, aim_y),
                        firing,
                        jump,
                    };
                    self.handle_input(input.user_id, seq, action);
                }
                ClientMsg::Ping { t } => {
                    let _ = self.snapshot_tx.send(ServerMsg::Pong {
                        t,
                        server_time: unix_millis(),
                    });
                }
                ClientMsg::LeaveMatch => {
                    self.handle_leave(input.user_id, "left");
                }
            }
        }
    }

    fn handle_join(&mut self, user_id: Uuid, archetype: &str) {
        if self.players.contains_key(&user_id) {
            warn!(user_id = %user_id, "Player already in match");
            return;
        }

        let archetype: Archetype = match archetype.parse() {
            Ok(archetype) => archetype,
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "Rejected join");
                let _ = self
                    .snapshot_tx
                    .send(ServerMsg::error("unknown_archetype", err.to_string()));
                return;
            }
        };

        if self.players.len() >= self.settings.max_players {
            let _ = self.snapshot_tx.send(ServerMsg::error("match_full", "Match is full"));
            return;
        }

        let position = self.spawn_position();
        let fighter_id = self.world.spawn_fighter(user_id, archetype, position);
        if self.holding {
            self.world.freeze(fighter_id);
        }
        self.players.insert(user_id, PlayerSlot::new(fighter_id));
        self.player_count.store(self.players.len(), Ordering::Relaxed);

        let _ = self.snapshot_tx.send(ServerMsg::PlayerJoined {
            user_id,
            fighter_id,
            archetype,
        });
        let _ = self.snapshot_tx.send(ServerMsg::MatchJoined {
            match_id: self.id,
            fighter_id,
            seed: self.world.random.seed(),
        });
        self.snapshot_builder.force_next();

        info!(
            match_id = %self.id,
            user_id = %user_id,
            fighter = %fighter_id,
            archetype = %archetype,
            player_count = self.players.len(),
            "Player joined match"
        );

        self.release_if_ready();
    }

    /// Lift the pre-round freeze once enough players are present
    fn release_if_ready(&mut self) {
        if !self.holding || self.players.len() < self.settings.min_players {
            return;
        }
        self.holding = false;
        for slot in self.players.values() {
            self.world.release(slot.fighter);
        }
        info!(match_id = %self.id, player_count = self.players.len(), "Arena live");
    }

    fn handle_input(&mut self, user_id: Uuid, seq: u32, action: Action) {
        let Some(slot) = self.players.get_mut(&user_id) else {
            return;
        };
        if !slot.limiter.check_input() {
            warn!(user_id = %user_id, "Input rate limit exceeded");
            return;
        }
        if seq <= slot.last_input_seq {
            return;
        }
        slot.last_input_seq = seq;
        // Keep an unconsumed jump press
        let jump = action.jump || slot.action.jump;
        slot.action = Action { jump, ..action };
    }

    fn handle_leave(&mut self, user_id: Uuid, reason: &str) {
        let Some(slot) = self.players.remove(&user_id) else {
            return;
        };
        self.world.remove_fighter(slot.fighter);
        self.player_count.store(self.players.len(), Ordering::Relaxed);
        self.snapshot_builder.force_next();

        let _ = self.snapshot_tx.send(ServerMsg::PlayerLeft {
            user_id,
            reason: reason.to_string(),
        });

        info!(
            match_id = %self.id,
            user_id = %user_id,
            reason,
            "Player left match"
        );
    }

    fn apply_actions(&mut self) {
        let mut slots: Vec<&mut PlayerSlot> = self.players.values_mut().collect();
        slots.sort_by_key(|slot| slot.fighter);
        for slot in slots {
            if let Err(err) = self.world.apply_action(slot.fighter, &slot.action) {
                debug!(error = %err, "Dropped input");
            }
            slot.action.jump = false;
        }
    }

    /// Free the slot of every player whose fighter was reaped
    fn handle_eliminations(&mut self, events: &[GameEvent]) {
        for event in events {
            if let GameEvent::Death { fighter, player, .. } = event {
                let owned = self.players.get(player).is_some_and(|slot| slot.fighter == *fighter);
                if owned {
                    self.handle_leave(*player, "eliminated");
                }
            }
        }
    }

    fn spawn_position(&mut self) -> Vec3 {
        let map = self.world.map;
        let margin_x = SPAWN_MARGIN.min(map.width * 0.5);
        let margin_y = SPAWN_MARGIN.min(map.height * 0.5);
        let x = margin_x + self.spawn_rng.gen::<f32>() * (map.width - 2.0 * margin_x).max(0.0);
        let y = margin_y + self.spawn_rng.gen::<f32>() * (map.height - 2.0 * margin_y).max(0.0);
        Vec3::new(x, y, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_test::assert_ok;

    const DT: f32 = 1.0 / 60.0;

    fn settings(min_players: usize, max_players: usize) -> MatchSettings {
        MatchSettings {
            seed: 77,
            min_players,
            max_players,
            ..MatchSettings::default()
        }
    }

    fn input(user_id: Uuid, msg: ClientMsg) -> PlayerInput {
        PlayerInput {
            user_id,
            msg,
            received_at: unix_millis(),
        }
    }

    fn join(user_id: Uuid, archetype: &str) -> PlayerInput {
        input(
            user_id,
            ClientMsg::JoinMatch {
                archetype: archetype.to_string(),
            },
        )
    }

    fn drain(rx: &mut broadcast::Receiver<ServerMsg>) -> Vec<ServerMsg> {
        let mut messages = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            messages.push(msg);
        }
        messages
    }

    #[tokio::test]
    async fn join_spawns_fighter_in_bounds() {
        let (mut game, handle) = GameMatch::new(Uuid::new_v4(), settings(1, 4));
        let mut rx = handle.subscribe();
        let user = Uuid::new_v4();

        assert_ok!(handle.input_tx.send(join(user, "scout")).await);
        assert!(game.step(DT, false));

        assert_eq!(handle.player_count(), 1);
        let messages = drain(&mut rx);
        let fighter_id = messages
            .iter()
            .find_map(|m| match m {
                ServerMsg::MatchJoined { fighter_id, seed, .. } => {
                    assert_eq!(*seed, 77);
                    Some(*fighter_id)
                }
                _ => None,
            })
            .expect("match joined reply");
        assert!(messages.iter().any(|m| matches!(m, ServerMsg::Snapshot { .. })));

        let fighter = game.world.fighter(fighter_id).unwrap();
        assert_eq!(fighter.archetype, Archetype::Scout);
        assert!(game.world.map.contains(fighter.body.position));
        assert!(fighter.constraints.is_empty());
    }

    #[tokio::test]
    async fn rejects_unknown_archetype_and_full_arena() {
        let (mut game, handle) = GameMatch::new(Uuid::new_v4(), settings(1, 1));
        let mut rx = handle.subscribe();

        assert_ok!(handle.input_tx.send(join(Uuid::new_v4(), "wizard")).await);
        assert_ok!(handle.input_tx.send(join(Uuid::new_v4(), "gunner")).await);
        assert_ok!(handle.input_tx.send(join(Uuid::new_v4(), "brawler")).await);
        game.step(DT, false);

        let codes: Vec<String> = drain(&mut rx)
            .into_iter()
            .filter_map(|m| match m {
                ServerMsg::Error { code, .. } => Some(code),
                _ => None,
            })
            .collect();
        assert_eq!(codes, vec!["unknown_archetype".to_string(), "match_full".to_string()]);
        assert_eq!(handle.player_count(), 1);
    }

    #[tokio::test]
    async fn fighters_frozen_until_min_players() {
        let (mut game, handle) = GameMatch::new(Uuid::new_v4(), settings(2, 4));
        let first = Uuid::new_v4();

        assert_ok!(handle.input_tx.send(join(first, "gunner")).await);
        game.step(DT, false);
        let fighter = game.players[&first].fighter;
        assert!(game.world.fighter(fighter).unwrap().is_constrained());

        assert_ok!(handle.input_tx.send(join(Uuid::new_v4(), "brawler")).await);
        game.step(DT, false);
        assert!(!game.holding);
        assert!(game.world.fighter(fighter).unwrap().constraints.is_empty());
    }

    #[tokio::test]
    async fn stale_input_sequence_is_ignored() {
        let (mut game, handle) = GameMatch::new(Uuid::new_v4(), settings(1, 4));
        let user = Uuid::new_v4();
        assert_ok!(handle.input_tx.send(join(user, "gunner")).await);
        game.step(DT, false);

        let tick = |seq: u32, move_x: f32| {
            input(
                user,
                ClientMsg::InputTick {
                    seq,
                    move_x,
                    move_y: 0.0,
                    aim_x: 1.0,
                    aim_y: 0.0,
                    firing: false,
                    jump: false,
                },
            )
        };
        assert_ok!(handle.input_tx.send(tick(5, 1.0)).await);
        assert_ok!(handle.input_tx.send(tick(3, -1.0)).await);
        game.step(DT, false);

        let slot = &game.players[&user];
        assert_eq!(slot.last_input_seq, 5);
        assert_eq!(slot.action.move_direction, Vec2::X);
        let fighter = game.world.fighter(slot.fighter).unwrap();
        assert!(fighter.body.velocity.x > 0.0);
    }

    #[tokio::test]
    async fn leave_removes_fighter() {
        let (mut game, handle) = GameMatch::new(Uuid::new_v4(), settings(1, 4));
        let mut rx = handle.subscribe();
        let user = Uuid::new_v4();
        assert_ok!(handle.input_tx.send(join(user, "brawler")).await);
        game.step(DT, false);
        assert_ok!(handle.input_tx.send(input(user, ClientMsg::LeaveMatch)).await);
        game.step(DT, false);

        assert!(game.world.fighters.is_empty());
        assert_eq!(handle.player_count(), 0);
        assert!(drain(&mut rx)
            .iter()
            .any(|m| matches!(m, ServerMsg::PlayerLeft { user_id, .. } if *user_id == user)));
    }

    #[tokio::test]
    async fn ping_gets_pong() {
        let (mut game, handle) = GameMatch::new(Uuid::new_v4(), settings(1, 4));
        let mut rx = handle.subscribe();
        assert_ok!(handle.input_tx.send(input(Uuid::new_v4(), ClientMsg::Ping { t: 42 })).await);
        game.step(DT, false);
        assert!(drain(&mut rx)
            .iter()
            .any(|m| matches!(m, ServerMsg::Pong { t: 42, .. })));
    }

    #[tokio::test]
    async fn run_exits_when_handles_drop() {
        let (game, handle) = GameMatch::new(Uuid::new_v4(), settings(1, 4));
        let task = tokio::spawn(game.run());
        drop(handle);
        let finished = tokio::time::timeout(Duration::from_secs(2), task).await;
        assert_ok!(assert_ok!(finished));
    }

    #[test]
    fn registry_tracks_matches() {
        let registry = MatchRegistry::new();
        let (_game, handle) = GameMatch::new(Uuid::new_v4(), settings(1, 2));
        let id = handle.id;
        registry.insert(handle);

        assert_eq!(registry.active_matches(), 1);
        assert_eq!(registry.total_players(), 0);
        assert!(registry.remove(&id).is_some());
        assert_eq!(registry.active_matches(), 0);
    }

    #[test]
    fn settings_derive_intervals() {
        let settings = MatchSettings::default();
        assert_eq!(settings.snapshot_interval(), 3);
        assert!((settings.tick_delta() - DT).abs() < 1.0e-7);
    }
}
