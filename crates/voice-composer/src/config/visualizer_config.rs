use crate::config::{
    DEFAULT_VISUALIZER_HEIGHT, DEFAULT_VISUALIZER_WIDTH, default_visualizer_height,
    default_visualizer_width,
};

use serde::{Deserialize, Serialize};

/// Size of the live spectrum display surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizerConfig {
    #[serde(default = "default_visualizer_width")]
    pub width: f32,

    #[serde(default = "default_visualizer_height")]
    pub height: f32,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_VISUALIZER_WIDTH,
            height: DEFAULT_VISUALIZER_HEIGHT,
        }
    }
}
