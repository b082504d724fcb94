//! Session configuration
//!
//! The tick budget is `tick_rate_hz * duration_secs`; defaults reproduce a
//! three minute game at 15 Hz (2700 ticks).

use std::time::Duration;

pub const DEFAULT_INITIAL_CASH: f64 = 10_000.0;
pub const DEFAULT_TICK_RATE_HZ: u32 = 15;
pub const DEFAULT_DURATION_SECS: u64 = 180;
pub const DEFAULT_FUND_COUNT: usize = 2;

/// Capacity of the command queue feeding the session task.
pub const COMMAND_QUEUE_CAPACITY: usize = 256;

/// Capacity of the outbound event broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Cash each participant starts with, split across its funds
    pub initial_cash: f64,
    pub tick_rate_hz: u32,
    pub duration_secs: u64,
    /// Number of tradable symbols per session
    pub fund_count: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_cash: DEFAULT_INITIAL_CASH,
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
            duration_secs: DEFAULT_DURATION_SECS,
            fund_count: DEFAULT_FUND_COUNT,
        }
    }
}

impl SessionConfig {
    /// Total ticks in one session
    pub fn tick_budget(&self) -> u64 {
        u64::from(self.tick_rate_hz).saturating_mul(self.duration_secs)
    }

    /// Period between ticks
    pub fn tick_interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.tick_rate_hz.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.initial_cash, 10_000.0);
        assert_eq!(config.fund_count, 2);
        assert_eq!(config.tick_budget(), 2700);
    }

    #[test]
    fn test_tick_interval() {
        let config = SessionConfig {
            tick_rate_hz: 10,
            ..SessionConfig::default()
        };
        assert_eq!(config.tick_interval(), Duration::from_millis(100));
    }
}
