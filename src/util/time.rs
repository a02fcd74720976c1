//! Time utilities for game simulation

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Default tick rates
pub const DEFAULT_SIMULATION_TPS: u32 = 60;
pub const DEFAULT_SNAPSHOT_TPS: u32 = 20;

/// Fixed timestep in seconds
pub fn tick_delta(tps: u32) -> f32 {
    1.0 / tps.max(1) as f32
}

pub fn tick_duration(tps: u32) -> Duration {
    Duration::from_micros(1_000_000 / u64::from(tps.max(1)))
}

/// Simulation ticks between two snapshots, never zero
pub fn snapshot_interval(simulation_tps: u32, snapshot_tps: u32) -> u32 {
    (simulation_tps / snapshot_tps.max(1)).max(1)
}

/// A simple timer for measuring durations
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_micros(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_helpers() {
        assert!((tick_delta(60) - 1.0 / 60.0).abs() < 1.0e-7);
        assert_eq!(tick_duration(50), Duration::from_millis(20));
        assert_eq!(snapshot_interval(60, 20), 3);
        assert_eq!(snapshot_interval(20, 60), 1);
        assert_eq!(snapshot_interval(60, 0), 60);
    }

    #[test]
    fn uptime_starts_at_zero() {
        init_server_time();
        assert!(uptime_secs() < 5);
        assert!(unix_millis() > 1_600_000_000_000);
    }
}
