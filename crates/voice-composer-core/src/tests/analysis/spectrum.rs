use crate::{SpectrumAnalyser, SpectrumLayout, compute_rms, layout_bars};

use std::f32::consts::PI;

const FFT_SIZE: usize = 256;

/// WHAT: RMS of a constant signal equals its magnitude; empty input is silent
/// WHY: The live level drives the mic scale and must be stable at the edges
#[test]
fn given_windows_when_computing_rms_then_level_matches_signal() {
    // Given/When/Then: Constant, alternating, and empty windows
    assert!((compute_rms(&[0.25; 64]) - 0.25).abs() < 1e-6);
    assert!((compute_rms(&[0.5, -0.5, 0.5, -0.5]) - 0.5).abs() < 1e-6);
    assert_eq!(compute_rms(&[]), 0.0);
}

/// WHAT: Silence maps every bin to zero
/// WHY: The byte spectrum floor is -100 dB, anything quieter is 0
#[test]
fn given_silence_when_analysing_then_all_bins_zero() {
    // Given: An analyser and a silent window
    let mut analyser = SpectrumAnalyser::new();

    // When: Analysing the window
    let bytes = analyser.analyse(&[0.0; FFT_SIZE]).to_vec();

    // Then: 128 bins, all zero
    assert_eq!(bytes.len(), FFT_SIZE / 2);
    assert!(bytes.iter().all(|&b| b == 0));
}

/// WHAT: A pure tone lights up its own bin
/// WHY: Bars must reflect where the energy is, not just how much there is
#[test]
fn given_tone_when_analysing_repeatedly_then_its_bin_saturates() {
    // Given: A full-scale tone centred on bin 16
    let mut analyser = SpectrumAnalyser::new();
    let tone: Vec<f32> = (0..FFT_SIZE)
        .map(|i| (2.0 * PI * 16.0 * i as f32 / FFT_SIZE as f32).sin())
        .collect();

    // When: Analysing enough ticks for smoothing to settle
    let mut bytes = Vec::new();
    for _ in 0..30 {
        bytes = analyser.analyse(&tone).to_vec();
    }

    // Then: The tone's bin saturates while distant bins stay near the floor
    assert_eq!(bytes[16], 255);
    assert_eq!(bytes.iter().copied().max(), Some(255));
    assert!(bytes[64] < 50);
}

/// WHAT: Bar count follows width and pitch; silent bars keep the minimum height
/// WHY: Silence must never render as a broken, empty visualization
#[test]
fn given_silent_spectrum_when_laying_out_then_bars_fill_width_at_min_height() {
    // Given: Default 200x40 layout (pitch 7px) and a silent spectrum
    let layout = SpectrumLayout::default();
    let magnitudes = [0u8; FFT_SIZE / 2];

    // When: Laying out bars
    let bars = layout_bars(&magnitudes, &layout);

    // Then: 28 bars, each at the minimum height, centred vertically
    assert_eq!(layout.bar_count(), 28);
    assert_eq!(bars.len(), 28);
    assert!(bars.iter().all(|b| (b.height - 4.0).abs() < f32::EPSILON));
    assert!((bars[0].y - 18.0).abs() < f32::EPSILON);
    assert!((bars[1].x - 7.0).abs() < f32::EPSILON);
}

/// WHAT: Bucket averages scale to the layout height
/// WHY: Full magnitude should reach the full draw height
#[test]
fn given_full_spectrum_when_laying_out_then_bars_reach_full_height() {
    // Given: A narrow layout and a saturated spectrum
    let layout = SpectrumLayout::with_size(70.0, 40.0);
    let magnitudes = [255u8; FFT_SIZE / 2];

    // When: Laying out bars
    let bars = layout_bars(&magnitudes, &layout);

    // Then: Ten full-height bars
    assert_eq!(bars.len(), 10);
    assert!(bars.iter().all(|b| (b.height - 40.0).abs() < 1e-4 && b.y.abs() < 1e-4));
}

/// WHAT: A surface wider than the bin count draws one bar per bin
/// WHY: Buckets can never be smaller than a single bin
#[test]
fn given_wide_layout_when_laying_out_then_bar_count_capped_at_bins() {
    // Given: A layout with room for far more bars than bins
    let layout = SpectrumLayout::with_size(7_000.0, 40.0);
    let magnitudes = [128u8; 8];

    // When: Laying out bars
    let bars = layout_bars(&magnitudes, &layout);

    // Then: Exactly one bar per bin
    assert_eq!(bars.len(), 8);
}
