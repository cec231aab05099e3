use crate::{
    analysis::{SpectrumAnalyser, SpectrumBar, SpectrumLayout, compute_rms, layout_bars},
    audio::DeviceHandle,
};

use tracing::debug;

use super::spectrum::FFT_SIZE;

/// What one analysis tick hands to the host.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveSnapshot {
    /// RMS of the latest time-domain window.
    pub level: f32,
    /// Byte magnitudes per frequency bin.
    pub spectrum: Vec<u8>,
    /// Bars laid out for the configured draw surface.
    pub bars: Vec<SpectrumBar>,
}

/// Frame-driven sampling of an active input handle.
///
/// Every executed tick requests the next one, so the loop keeps running
/// until [`LiveAnalysisLoop::cancel`] or until a tick finds no handle.
#[derive(Debug)]
pub struct LiveAnalysisLoop {
    analyser: SpectrumAnalyser,
    layout: SpectrumLayout,
    window: Vec<f32>,
    /// A tick is requested for the next frame.
    scheduled: bool,
}

impl LiveAnalysisLoop {
    /// Creates a stopped loop drawing into `layout`.
    pub fn new(layout: SpectrumLayout) -> Self {
        Self {
            analyser: SpectrumAnalyser::new(),
            layout,
            window: vec![0.0; FFT_SIZE],
            scheduled: false,
        }
    }

    /// Requests the first tick.
    pub fn start(&mut self) {
        self.scheduled = true;
    }

    /// Drops the pending request for the next tick.
    pub fn cancel(&mut self) {
        if self.scheduled {
            debug!("Analysis loop cancelled");
        }
        self.scheduled = false;
    }

    /// Whether a tick will run on the next frame.
    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }

    /// Runs the pending tick, if any, against the borrowed handle.
    ///
    /// A missing handle ends the loop silently.
    pub fn run_frame<H: DeviceHandle>(&mut self, handle: Option<&H>) -> Option<LiveSnapshot> {
        if !self.scheduled {
            return None;
        }

        let Some(handle) = handle.filter(|h| !h.is_released()) else {
            debug!("Analyser handle missing, analysis loop ended");
            self.scheduled = false;
            return None;
        };

        let written = handle.read_window(&mut self.window);
        let recent = &self.window[..written];

        let level = compute_rms(recent);
        let spectrum = self.analyser.analyse(recent).to_vec();
        let bars = layout_bars(&spectrum, &self.layout);

        Some(LiveSnapshot {
            level,
            spectrum,
            bars,
        })
    }
}
