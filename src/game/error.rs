use thiserror::Error;

use super::fighter::FighterId;

/// Construction-time failures. The tick itself never errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimError {
    #[error("unknown archetype: {0}")]
    UnknownArchetype(String),

    #[error("unknown projectile kind tag: {0}")]
    UnknownProjectileKind(u8),

    #[error("no fighter with id {0}")]
    UnknownFighter(FighterId),
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot codec error: {0}")]
    Json(#[from] serde_json::Error),
}
