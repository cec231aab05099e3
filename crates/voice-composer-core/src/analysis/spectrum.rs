//! Live frequency analysis compatible with the browser analyser node:
//! FFT size 256, Hann window, 0.8 smoothing, [-100, -30] dB mapped to bytes.

use std::{f32::consts::PI, fmt, sync::Arc};

use realfft::{RealFftPlanner, RealToComplex, num_complex::Complex32};
use tracing::warn;

/// Time-domain window length fed to the FFT.
pub const FFT_SIZE: usize = 256;
/// Number of frequency bins produced per snapshot.
pub const FREQUENCY_BINS: usize = FFT_SIZE / 2;

const SMOOTHING: f32 = 0.8;
const MIN_DECIBELS: f32 = -100.0;
const MAX_DECIBELS: f32 = -30.0;

/// Root-mean-square of a time-domain window. Zero for an empty window.
///
/// Typical speech lands around 0.0..0.3.
pub fn compute_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

/// FFT magnitude analyser with smoothing carried across ticks.
pub struct SpectrumAnalyser {
    plan: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
    smoothed: Vec<f32>,
    bytes: Vec<u8>,
}

impl Default for SpectrumAnalyser {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectrumAnalyser {
    /// Plans a forward FFT of [`FFT_SIZE`].
    pub fn new() -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(FFT_SIZE);
        let window = (0..FFT_SIZE).map(|i| hann_value(i, FFT_SIZE)).collect();

        Self {
            input: plan.make_input_vec(),
            spectrum: plan.make_output_vec(),
            scratch: plan.make_scratch_vec(),
            plan,
            window,
            smoothed: vec![0.0; FREQUENCY_BINS],
            bytes: vec![0; FREQUENCY_BINS],
        }
    }

    /// Byte magnitudes (0..=255) for the most recent window.
    ///
    /// Shorter windows are left-padded with silence.
    pub fn analyse(&mut self, time_domain: &[f32]) -> &[u8] {
        let take = time_domain.len().min(FFT_SIZE);
        let pad = FFT_SIZE - take;
        let recent = &time_domain[time_domain.len() - take..];

        self.input[..pad].fill(0.0);
        for (i, sample) in recent.iter().enumerate() {
            self.input[pad + i] = sample * self.window[pad + i];
        }

        if let Err(e) = self
            .plan
            .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)
        {
            warn!("Spectrum FFT failed: {}", e);
            self.bytes.fill(0);
            return &self.bytes;
        }

        let scale = 1.0 / FFT_SIZE as f32;
        for (bin, value) in self.spectrum.iter().take(FREQUENCY_BINS).enumerate() {
            let magnitude = value.norm() * scale;
            self.smoothed[bin] = SMOOTHING * self.smoothed[bin] + (1.0 - SMOOTHING) * magnitude;

            let decibels = if self.smoothed[bin] > 0.0 {
                20.0 * self.smoothed[bin].log10()
            } else {
                f32::NEG_INFINITY
            };
            let scaled = 255.0 * (decibels - MIN_DECIBELS) / (MAX_DECIBELS - MIN_DECIBELS);
            self.bytes[bin] = scaled.clamp(0.0, 255.0) as u8;
        }

        &self.bytes
    }
}

impl fmt::Debug for SpectrumAnalyser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumAnalyser")
            .field("fft_size", &FFT_SIZE)
            .finish()
    }
}

fn hann_value(index: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }
    0.5 - 0.5 * ((2.0 * PI * index as f32) / len as f32).cos()
}

/// Geometry of the live bar visualization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumLayout {
    /// Available draw width in pixels.
    pub width: f32,
    /// Available draw height in pixels.
    pub height: f32,
    /// Width of one bar.
    pub bar_width: f32,
    /// Gap between bars.
    pub gap: f32,
    /// Bars never render shorter than this, even in silence.
    pub min_bar_height: f32,
}

impl Default for SpectrumLayout {
    fn default() -> Self {
        Self {
            width: 200.0,
            height: 40.0,
            bar_width: 4.0,
            gap: 3.0,
            min_bar_height: 4.0,
        }
    }
}

impl SpectrumLayout {
    /// Layout with the default bar pitch for a `width` x `height` surface.
    pub fn with_size(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Bars that fit the width at the fixed pitch.
    pub fn bar_count(&self) -> usize {
        let pitch = self.bar_width + self.gap;
        if pitch <= 0.0 || self.width <= 0.0 {
            return 0;
        }
        (self.width / pitch).floor() as usize
    }
}

/// One rectangle of the live visualization, vertically centred.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumBar {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Bar height, at least the layout minimum.
    pub height: f32,
}

/// Buckets `magnitudes` into as many equal groups as fit `layout` and maps
/// each bucket average to a bar height.
///
/// When more bars fit than there are bins, one bar per bin is drawn.
pub fn layout_bars(magnitudes: &[u8], layout: &SpectrumLayout) -> Vec<SpectrumBar> {
    let bar_count = layout.bar_count().min(magnitudes.len());
    if bar_count == 0 {
        return Vec::new();
    }

    let step = magnitudes.len() / bar_count;
    let pitch = layout.bar_width + layout.gap;

    magnitudes
        .chunks_exact(step)
        .take(bar_count)
        .enumerate()
        .map(|(i, bucket)| {
            let average = bucket.iter().map(|&m| f32::from(m)).sum::<f32>() / step as f32;
            let height = (average / 255.0 * layout.height).max(layout.min_bar_height);
            SpectrumBar {
                x: i as f32 * pitch,
                y: (layout.height - height) / 2.0,
                height,
            }
        })
        .collect()
}
