//! Clock and timer configuration parameters.
//!
//! Controls how the tick loop moves virtual time:
//! - Fixed step added at the start of every tick
//! - Starting value the clock is reset to when a run begins
//! - Advisory timer capacity

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

/// Virtual clock configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct ClockConfig {
    /// Milliseconds added to the clock at the start of every tick.
    /// Zero means the clock only moves when the loop jumps to the next due task.
    #[serde(default)]
    #[validate(range(max = 60000))]
    pub tick_step_ms: u64,

    /// Clock value (milliseconds) a run starts from.
    #[serde(default)]
    pub start_millis: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            tick_step_ms: 0,
            start_millis: 0,
        }
    }
}

/// Timer registry configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct TimerConfig {
    /// Maximum pending timer count reported to callers. Advisory only, never enforced.
    #[serde(default = "default_max_timer_count")]
    #[validate(range(min = 1))]
    pub max_timer_count: usize,
}

fn default_max_timer_count() -> usize {
    100_000
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            max_timer_count: default_max_timer_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_oversized_tick_step() {
        let clock = ClockConfig {
            tick_step_ms: 120_000,
            start_millis: 0,
        };
        assert!(clock.validate().is_err());
    }

    #[test]
    fn rejects_zero_timer_capacity() {
        let timers = TimerConfig { max_timer_count: 0 };
        assert!(timers.validate().is_err());
    }
}
