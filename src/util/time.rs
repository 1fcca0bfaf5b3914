//! Time utilities for the relay and peer loops

use std::time::{Duration, Instant};

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

/// Default peer tick rate
pub const DEFAULT_TICK_RATE: u32 = 60;

/// Highest accepted peer tick rate
pub const MAX_TICK_RATE: u32 = 1000;

/// Tick period for a given rate; zero falls back to the default and
/// anything above [`MAX_TICK_RATE`] is capped, so the period is never zero
pub fn tick_duration(tick_rate: u32) -> Duration {
    let rate = if tick_rate == 0 {
        DEFAULT_TICK_RATE
    } else {
        tick_rate.min(MAX_TICK_RATE)
    };
    Duration::from_micros(1_000_000 / rate as u64)
}

/// Delta time for physics (in seconds)
pub fn tick_delta(tick_rate: u32) -> f32 {
    tick_duration(tick_rate).as_secs_f32()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_duration() {
        assert_eq!(tick_duration(50), Duration::from_millis(20));
        assert_eq!(tick_duration(0), tick_duration(DEFAULT_TICK_RATE));
        assert_eq!(tick_duration(2_000_000), Duration::from_millis(1));
        assert!(!tick_duration(u32::MAX).is_zero());
        assert!((tick_delta(60) - 1.0 / 60.0).abs() < 1e-5);
    }
}
