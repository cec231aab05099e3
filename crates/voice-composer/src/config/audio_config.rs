use serde::{Deserialize, Serialize};

/// Input device configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Selected input device name (None = default device).
    #[serde(default)]
    pub selected_device: Option<String>,
}
