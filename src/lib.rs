//! Deterministic arena combat simulation and its authoritative host.
//!
//! The `game` modules are pure simulation and can run on a client for
//! prediction; `game::match` and the binary wrap them in a tokio tick loop.

pub mod config;
pub mod game;
pub mod net;
pub mod util;
