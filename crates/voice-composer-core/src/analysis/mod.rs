mod live_loop;
mod spectrum;
mod waveform;

pub use {
    live_loop::{LiveAnalysisLoop, LiveSnapshot},
    spectrum::{SpectrumAnalyser, SpectrumBar, SpectrumLayout, compute_rms, layout_bars},
    waveform::{
        DEFAULT_BAR_COUNT, Extraction, RenderedBar, SILENCE_FLOOR, Waveform, WaveformExtractor,
        summarize,
    },
};
