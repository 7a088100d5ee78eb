//! Linear reconnect backoff

use std::time::Duration;

use crate::config::RealtimeConfig;

/// Attempt `n` waits `n * base_interval`; nothing after `max_attempts`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub base_interval: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_interval: Duration::from_millis(1000),
        }
    }
}

impl ReconnectPolicy {
    pub fn from_config(config: &RealtimeConfig) -> Self {
        Self {
            max_attempts: config.max_reconnect_attempts,
            base_interval: Duration::from_millis(config.reconnect_interval_ms),
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_interval * attempt
    }
}

/// Consecutive-failure counter, reset on a successful open
#[derive(Debug, Clone, Default)]
pub struct ReconnectState {
    attempts: u32,
}

impl ReconnectState {
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Delay before the next attempt, or `None` once the budget is spent
    pub fn next_delay(&mut self, policy: &ReconnectPolicy) -> Option<Duration> {
        if self.attempts >= policy.max_attempts {
            return None;
        }
        self.attempts += 1;
        Some(policy.delay_for(self.attempts))
    }

    pub fn exhausted(&self, policy: &ReconnectPolicy) -> bool {
        self.attempts >= policy.max_attempts
    }
}
