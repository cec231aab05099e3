use crate::config::{
    DEFAULT_FRAME_INTERVAL_MS, DEFAULT_SETTLE_DELAY_MS, default_frame_interval_ms,
    default_settle_delay_ms,
};

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing of the composer loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviourConfig {
    /// Milliseconds between the first mic press and the automatic start.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Milliseconds between display frames.
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
}

impl Default for BehaviourConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
        }
    }
}

impl BehaviourConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}
