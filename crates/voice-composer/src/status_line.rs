//! Terminal rendering of composer events.
//!
//! Persistent messages (notices, staged clips, library listings) are printed
//! as whole lines. Live state (elapsed time, level, spectrum, playback
//! progress) shares a single line that is redrawn in place.

use voice_composer_core::{Clip, HostEvent, SpectrumBar, Waveform, format_clock};

const GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const WAVEFORM_MAX_PX: f32 = 36.0;
const LEVEL_METER_WIDTH: usize = 10;
const LEVEL_METER_GAIN: f32 = 4.0;
const PLAYED_START: &str = "\x1b[36m";
const PLAYED_END: &str = "\x1b[0m";

/// Return to column 0 and erase the line.
pub(crate) const CLEAR_LINE: &str = "\r\x1b[2K";

/// Live state accumulated from the event stream.
#[derive(Debug)]
pub(crate) struct StatusLine {
    spectrum_height: f32,
    recording: bool,
    elapsed: u64,
    level: f32,
    spectrum: String,
    playback: Option<f32>,
    dirty: bool,
}

impl StatusLine {
    pub(crate) fn new(spectrum_height: f32) -> Self {
        Self {
            spectrum_height,
            recording: false,
            elapsed: 0,
            level: 0.0,
            spectrum: String::new(),
            playback: None,
            dirty: false,
        }
    }

    /// Folds `event` into the live state, returning a message line when the
    /// event deserves one of its own.
    pub(crate) fn apply(&mut self, event: &HostEvent) -> Option<String> {
        match event {
            HostEvent::RecordingChanged(recording) => {
                self.recording = *recording;
                self.dirty = true;
                if !recording {
                    self.spectrum.clear();
                }
                Some(if *recording {
                    "● Recording".to_string()
                } else {
                    "■ Recording stopped".to_string()
                })
            }
            HostEvent::LevelChanged(level) => {
                self.level = *level;
                self.dirty = true;
                None
            }
            HostEvent::SpectrumChanged(bars) => {
                self.spectrum = spectrum_line(bars, self.spectrum_height);
                self.dirty = true;
                None
            }
            HostEvent::ElapsedChanged(seconds) => {
                self.elapsed = *seconds;
                self.dirty = true;
                None
            }
            HostEvent::MicVisualChanged(_) => None,
            HostEvent::StagingRevealed => Some("Staging area open".to_string()),
            HostEvent::WaveformComputing => Some("Computing waveform...".to_string()),
            HostEvent::PendingChanged(None) => Some("Pending clip cleared".to_string()),
            HostEvent::PendingChanged(Some(_)) | HostEvent::LibraryChanged => None,
            HostEvent::PendingProgress(progress)
            | HostEvent::PlaybackProgress { progress, .. } => {
                self.playback = (*progress > 0.0 && *progress < 1.0).then_some(*progress);
                self.dirty = true;
                None
            }
            HostEvent::Notice(notice) => Some(format!("! {}", notice)),
            HostEvent::CommitRequested(clip) => Some(format!(
                "Sent \"{}\" ({})",
                clip.name(),
                clock_of(clip)
            )),
        }
    }

    /// The live line, if anything changed since the last call.
    ///
    /// An empty string means the line should be cleared.
    pub(crate) fn take_live(&mut self) -> Option<String> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;

        let line = if self.recording {
            format!(
                "● {} [{}] {}",
                format_clock(self.elapsed),
                level_meter(self.level),
                self.spectrum
            )
        } else if let Some(progress) = self.playback {
            format!("▶ {:>3.0}%", progress * 100.0)
        } else {
            String::new()
        };

        Some(line)
    }
}

/// One clip as a listing line: label, name, duration, waveform.
pub(crate) fn clip_line(label: &str, clip: &Clip, progress: f32) -> String {
    let mut line = format!(
        "{} {}  {}  {}",
        label,
        clip.name(),
        clock_of(clip),
        waveform_line(clip.waveform(), progress)
    );
    if clip.waveform().is_synthetic() {
        line.push_str("  (preview unavailable)");
    }
    line
}

/// Waveform bars as block glyphs, with the played prefix highlighted.
pub(crate) fn waveform_line(waveform: &Waveform, progress: f32) -> String {
    let mut out = String::new();
    let mut in_played = false;
    for bar in waveform.render(progress) {
        if bar.played != in_played {
            out.push_str(if bar.played { PLAYED_START } else { PLAYED_END });
            in_played = bar.played;
        }
        out.push(glyph(bar.height_px / WAVEFORM_MAX_PX));
    }
    if in_played {
        out.push_str(PLAYED_END);
    }
    out
}

/// Spectrum bars as block glyphs scaled to the surface height.
pub(crate) fn spectrum_line(bars: &[SpectrumBar], height: f32) -> String {
    bars.iter()
        .map(|bar| glyph(if height > 0.0 { bar.height / height } else { 0.0 }))
        .collect()
}

fn level_meter(level: f32) -> String {
    let filled = ((level.max(0.0) * LEVEL_METER_GAIN * LEVEL_METER_WIDTH as f32).round()
        as usize)
        .min(LEVEL_METER_WIDTH);
    format!(
        "{}{}",
        "#".repeat(filled),
        " ".repeat(LEVEL_METER_WIDTH - filled)
    )
}

fn clock_of(clip: &Clip) -> String {
    clip.duration()
        .map(|d| format_clock(d.as_secs()))
        .unwrap_or_else(|| "-:--".to_string())
}

fn glyph(fraction: f32) -> char {
    let index = (fraction.clamp(0.0, 1.0) * GLYPHS.len() as f32).ceil() as usize;
    GLYPHS[index.saturating_sub(1).min(GLYPHS.len() - 1)]
}
