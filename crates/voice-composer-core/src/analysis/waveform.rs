use crate::audio::{AudioDecoder, SymphoniaDecoder};

use std::time::Duration;

use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Bars produced when no count is configured.
pub const DEFAULT_BAR_COUNT: usize = 50;

/// Amplitude every bar takes when the whole input is silent.
pub const SILENCE_FLOOR: f32 = 0.1;

/// Synthetic bars are drawn from `[FALLBACK_LOW, FALLBACK_LOW + FALLBACK_SPAN)`.
const FALLBACK_LOW: f32 = 0.2;
const FALLBACK_SPAN: f32 = 0.5;

const RENDER_MAX_HEIGHT_PX: f32 = 36.0;
const RENDER_MIN_HEIGHT_PX: f32 = 4.0;

/// Fixed-length amplitude summary, every value in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    bars: Vec<f32>,
    synthetic: bool,
}

/// One waveform bar ready for drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderedBar {
    /// Bar height in pixels, never below the minimum visible height.
    pub height_px: f32,
    /// Whether playback has passed this bar.
    pub played: bool,
}

impl Waveform {
    /// Wraps already-normalized bars, clamping each into `[0, 1]`.
    pub fn from_bars(bars: Vec<f32>) -> Self {
        Self {
            bars: bars.into_iter().map(|b| b.clamp(0.0, 1.0)).collect(),
            synthetic: false,
        }
    }

    /// Normalized amplitudes.
    pub fn bars(&self) -> &[f32] {
        &self.bars
    }

    /// Number of bars.
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Whether there are no bars.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// True when the bars are the degraded-mode placeholder, not real data.
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    /// Bars as drawn at `progress` (0..=1): bar `i` counts as played when
    /// `progress > 0` and `i / len <= progress`.
    pub fn render(&self, progress: f32) -> Vec<RenderedBar> {
        let len = self.bars.len() as f32;
        self.bars
            .iter()
            .enumerate()
            .map(|(i, amplitude)| RenderedBar {
                height_px: (amplitude * RENDER_MAX_HEIGHT_PX).max(RENDER_MIN_HEIGHT_PX),
                played: progress > 0.0 && i as f32 / len <= progress,
            })
            .collect()
    }
}

/// Result of summarizing a payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Fixed-length summary.
    pub waveform: Waveform,
    /// Decoded length, `None` when decoding failed.
    pub duration: Option<Duration>,
}

/// Decodes a payload and reduces it to a fixed number of bars.
///
/// Never fails: undecodable input yields a synthetic waveform so callers are
/// never blocked on malformed data.
#[derive(Debug, Clone)]
pub struct WaveformExtractor<D = SymphoniaDecoder> {
    decoder: D,
    bar_count: usize,
}

impl Default for WaveformExtractor<SymphoniaDecoder> {
    fn default() -> Self {
        Self::new(SymphoniaDecoder, DEFAULT_BAR_COUNT)
    }
}

impl<D: AudioDecoder> WaveformExtractor<D> {
    /// Extractor producing `bar_count` bars.
    pub fn new(decoder: D, bar_count: usize) -> Self {
        Self { decoder, bar_count }
    }

    /// Configured bar count.
    pub fn bar_count(&self) -> usize {
        self.bar_count
    }

    /// Summarizes `bytes` from the first decoded channel.
    #[instrument(skip(self, bytes), fields(byte_len = bytes.len(), bar_count = self.bar_count))]
    pub fn extract(&self, bytes: &[u8]) -> Extraction {
        match self.decoder.decode(bytes) {
            Ok(decoded) => {
                let bars = summarize(decoded.first_channel(), self.bar_count);
                debug!(samples = decoded.first_channel().len(), "Waveform extracted");
                Extraction {
                    waveform: Waveform {
                        bars,
                        synthetic: false,
                    },
                    duration: decoded.duration(),
                }
            }
            Err(e) => {
                warn!(error = %e, "Waveform decode failed, using synthetic bars");
                Extraction {
                    waveform: Waveform {
                        bars: synthetic_bars(self.bar_count),
                        synthetic: true,
                    },
                    duration: None,
                }
            }
        }
    }
}

/// Mean absolute amplitude per block, normalized so the loudest block is 1.0.
///
/// Samples are split into `bar_count` contiguous blocks of
/// `len / bar_count`; the remainder is dropped. With fewer samples than
/// bars each sample gets its own block and the rest stay empty. All-silent
/// input maps every bar to [`SILENCE_FLOOR`].
pub fn summarize(samples: &[f32], bar_count: usize) -> Vec<f32> {
    if bar_count == 0 {
        return Vec::new();
    }

    let block_size = (samples.len() / bar_count).max(1);
    let mut bars: Vec<f32> = samples
        .chunks_exact(block_size)
        .take(bar_count)
        .map(|block| {
            let sum: f32 = block
                .iter()
                .map(|s| if s.is_finite() { s.abs() } else { 0.0 })
                .sum();
            sum / block_size as f32
        })
        .collect();
    bars.resize(bar_count, 0.0);

    let max = bars.iter().copied().fold(0.0_f32, f32::max);
    if max > 0.0 {
        bars.iter_mut().for_each(|b| *b /= max);
    } else {
        bars.fill(SILENCE_FLOOR);
    }
    bars
}

fn synthetic_bars(bar_count: usize) -> Vec<f32> {
    let mut bars = Vec::with_capacity(bar_count);
    while bars.len() < bar_count {
        let random = Uuid::new_v4();
        // Bytes 6 and 8 carry the version and variant bits.
        let values = random
            .as_bytes()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 6 && *i != 8)
            .map(|(_, &b)| FALLBACK_LOW + FALLBACK_SPAN * f32::from(b) / 256.0);
        let missing = bar_count - bars.len();
        bars.extend(values.take(missing));
    }
    bars
}
