//! Game simulation modules

pub mod archetype;
pub mod combat;
pub mod constraint;
pub mod entity;
pub mod error;
pub mod fighter;
pub mod r#match;
pub mod math;
pub mod physics;
pub mod prop;
pub mod random;
pub mod snapshot;
pub mod world;

pub use archetype::Archetype;
pub use error::{SimError, SnapshotError};
pub use fighter::{Fighter, FighterId};
pub use r#match::{GameMatch, MatchHandle, MatchRegistry, MatchSettings};
pub use snapshot::{SnapshotReceiver, WorldSnapshot};
pub use world::{Action, ArenaMap, World};

use crate::net::protocol::ClientMsg;
use uuid::Uuid;

/// Player message queued for the match task
#[derive(Debug, Clone)]
pub struct PlayerInput {
    pub user_id: Uuid,
    pub msg: ClientMsg,
    pub received_at: u64,
}
