use crate::{AudioError, CoreResult};

use std::panic::Location;

use audioadapter_buffers::direct::InterleavedSlice;
use error_location::ErrorLocation;
use rubato::{Fft, FixedSync, Resampler as RubatoResampler};
use tracing::{debug, instrument};

const CHUNK_SIZE: usize = 1024;
const SUB_CHUNKS: usize = 2;

/// Mono sample-rate converter used to match a clip to the output device.
pub struct Resampler {
    resampler: Fft<f32>,
    input_rate: u32,
    output_rate: u32,
    input_chunk: Vec<f32>,
    output_chunk: Vec<f32>,
}

impl Resampler {
    #[track_caller]
    #[instrument]
    pub fn new(input_rate: u32, output_rate: u32) -> CoreResult<Self> {
        let resampler = Fft::<f32>::new(
            input_rate as usize,
            output_rate as usize,
            CHUNK_SIZE,
            SUB_CHUNKS,
            1,
            FixedSync::Input,
        )
        .map_err(|e| AudioError::ResamplingError {
            reason: format!("Failed to create resampler: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        // The FFT resampler may round the requested chunk to its own block size.
        let input_frames = resampler.input_frames_next();
        let output_chunk = vec![0.0; resampler.output_frames_max()];

        debug!(input_rate, output_rate, input_frames, "Resampler initialized");

        Ok(Self {
            resampler,
            input_rate,
            output_rate,
            input_chunk: vec![0.0; input_frames],
            output_chunk,
        })
    }

    /// Converts a whole clip. The final partial chunk is zero-padded and the
    /// output truncated to the expected length.
    #[track_caller]
    #[instrument(skip(self, samples), fields(input_len = samples.len()))]
    pub fn process(&mut self, samples: &[f32]) -> CoreResult<Vec<f32>> {
        if samples.is_empty() {
            return Ok(Vec::new());
        }

        let expected_len =
            (samples.len() as f64 * f64::from(self.output_rate) / f64::from(self.input_rate)) as usize;
        let mut output = Vec::with_capacity(expected_len + self.output_chunk.len());

        let input_frames = self.input_chunk.len();
        for chunk in samples.chunks(input_frames) {
            self.input_chunk[..chunk.len()].copy_from_slice(chunk);
            self.input_chunk[chunk.len()..].fill(0.0);

            let input_adapter = InterleavedSlice::new(&self.input_chunk, 1, input_frames).map_err(|e| {
                AudioError::ResamplingError {
                    reason: format!("Failed to create input adapter: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                }
            })?;

            let capacity = self.output_chunk.len();
            let mut output_adapter = InterleavedSlice::new_mut(&mut self.output_chunk, 1, capacity)
                .map_err(|e| AudioError::ResamplingError {
                    reason: format!("Failed to create output adapter: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                })?;

            let (_consumed, written) = self
                .resampler
                .process_into_buffer(&input_adapter, &mut output_adapter, None)
                .map_err(|e| AudioError::ResamplingError {
                    reason: format!("Resampling failed: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                })?;

            output.extend_from_slice(&self.output_chunk[..written]);
        }

        output.truncate(expected_len);

        debug!(
            output_len = output.len(),
            input_rate = self.input_rate,
            output_rate = self.output_rate,
            "Clip resampled for playback"
        );

        Ok(output)
    }
}
