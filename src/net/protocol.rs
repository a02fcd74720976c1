//! Wire message definitions
//! These are the types exchanged between the arena host and its clients

use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::archetype::Archetype;
use crate::game::combat::{ProjectileId, ProjectileKind};
use crate::game::fighter::FighterId;
use crate::game::snapshot::WorldSnapshot;

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Request a fighter in the arena
    JoinMatch {
        /// Archetype name, e.g. "gunner"
        archetype: String,
    },

    /// Player intent for the next tick
    InputTick {
        /// Sequence number for client-side prediction reconciliation
        seq: u32,
        /// Planar move direction, normalized by the server
        move_x: f32,
        move_y: f32,
        /// Planar aim direction
        aim_x: f32,
        aim_y: f32,
        /// Trigger held
        firing: bool,
        /// Jump pressed
        jump: bool,
    },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },

    /// Leave the arena
    LeaveMatch,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Confirmation of a join
    MatchJoined {
        match_id: Uuid,
        fighter_id: FighterId,
        /// Seed of the simulation random source
        seed: u64,
    },

    /// Another player entered the arena
    PlayerJoined {
        user_id: Uuid,
        fighter_id: FighterId,
        archetype: Archetype,
    },

    /// Player left the arena
    PlayerLeft {
        user_id: Uuid,
        reason: String,
    },

    /// Full world state (sent at regular intervals)
    Snapshot {
        snapshot: WorldSnapshot,
        /// Events that occurred since the last snapshot
        events: Vec<GameEvent>,
    },

    /// Error message
    Error {
        code: String,
        message: String,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
        server_time: u64,
    },
}

impl ServerMsg {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerMsg::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Fire-and-forget notifications from the simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum GameEvent {
    /// Projectile fired
    Shot {
        shooter: FighterId,
        projectile: ProjectileId,
        kind: ProjectileKind,
        position: Vec3,
        direction: Vec3,
    },

    /// Damage dealt
    Hit {
        attacker: Option<FighterId>,
        target: FighterId,
        damage: f32,
        position: Vec3,
    },

    /// Fighter came down on the floor, a prop or another fighter
    Landed {
        fighter: FighterId,
        impact_velocity: f32,
        mass: f32,
    },

    /// Fighter killed
    Kill {
        killer: Option<FighterId>,
        victim: FighterId,
        /// "shot", "takedown"
        cause: String,
    },

    /// Dead fighter removed from the arena
    Death {
        fighter: FighterId,
        player: Uuid,
        archetype: Archetype,
    },

    ConstraintAttached {
        victim: FighterId,
        owner: FighterId,
        constraint: String,
    },

    ConstraintDetached {
        victim: FighterId,
        constraint: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_are_tagged() {
        let msg: ClientMsg = serde_json::from_str(r#"{"type":"join_match","archetype":"scout"}"#)
            .expect("valid join");
        assert_eq!(
            msg,
            ClientMsg::JoinMatch {
                archetype: "scout".to_string()
            }
        );

        let msg: ClientMsg = serde_json::from_str(
            r#"{"type":"input_tick","seq":4,"move_x":1.0,"move_y":0.0,"aim_x":0.0,"aim_y":1.0,"firing":true,"jump":false}"#,
        )
        .expect("valid input");
        assert!(matches!(msg, ClientMsg::InputTick { seq: 4, firing: true, .. }));
    }

    #[test]
    fn events_use_event_type_tag() {
        let event = GameEvent::Kill {
            killer: Some(FighterId(3)),
            victim: FighterId(7),
            cause: "shot".to_string(),
        };
        let json = serde_json::to_value(&event).expect("serializable");
        assert_eq!(json["event_type"], "kill");
        assert_eq!(json["victim"], 7);
    }
}
