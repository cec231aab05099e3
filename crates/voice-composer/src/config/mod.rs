mod audio_config;
mod behaviour_config;
#[allow(clippy::module_inception)]
mod config;
mod visualizer_config;
mod waveform_config;

pub(crate) use {
    audio_config::AudioConfig, behaviour_config::BehaviourConfig, config::Config,
    visualizer_config::VisualizerConfig, waveform_config::WaveformConfig,
};

pub(crate) const DEFAULT_BAR_COUNT: usize = 50;
pub(crate) const DEFAULT_VISUALIZER_WIDTH: f32 = 200.0;
pub(crate) const DEFAULT_VISUALIZER_HEIGHT: f32 = 40.0;
pub(crate) const DEFAULT_SETTLE_DELAY_MS: u64 = 500;
pub(crate) const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;

pub(crate) fn default_bar_count() -> usize {
    DEFAULT_BAR_COUNT
}

pub(crate) fn default_visualizer_width() -> f32 {
    DEFAULT_VISUALIZER_WIDTH
}

pub(crate) fn default_visualizer_height() -> f32 {
    DEFAULT_VISUALIZER_HEIGHT
}

pub(crate) fn default_settle_delay_ms() -> u64 {
    DEFAULT_SETTLE_DELAY_MS
}

pub(crate) fn default_frame_interval_ms() -> u64 {
    DEFAULT_FRAME_INTERVAL_MS
}
