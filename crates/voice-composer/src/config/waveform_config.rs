use crate::config::{DEFAULT_BAR_COUNT, default_bar_count};

use serde::{Deserialize, Serialize};

/// Clip waveform summary settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveformConfig {
    /// Number of bars in every clip's waveform.
    #[serde(default = "default_bar_count")]
    pub bar_count: usize,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            bar_count: DEFAULT_BAR_COUNT,
        }
    }
}
