use crate::{
    AudioError, CoreResult,
    audio::{Payload, payload::WAV_MIME},
};

use std::{collections::VecDeque, io::Cursor, panic::Location, time::Duration};

use error_location::ErrorLocation;
use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::{debug, instrument};

use super::capture::MAX_BUFFER_SAMPLES;

/// Capture sink: collects chunks delivered by a device handle and encodes
/// them into one mono 32-bit float WAV payload on [`ChunkRecorder::finish`].
#[derive(Debug)]
pub struct ChunkRecorder {
    sample_rate: u32,
    samples: VecDeque<f32>,
    chunk_count: usize,
}

impl ChunkRecorder {
    /// Begins a new capture at the device's sample rate.
    pub fn begin(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            samples: VecDeque::new(),
            chunk_count: 0,
        }
    }

    /// Appends one delivered chunk. Oldest samples are dropped past five minutes.
    pub fn push(&mut self, chunk: &[f32]) {
        self.samples.extend(chunk.iter().copied());
        while self.samples.len() > MAX_BUFFER_SAMPLES {
            self.samples.pop_front();
        }
        self.chunk_count += 1;
    }

    /// Sample rate passed to [`ChunkRecorder::begin`].
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of buffered mono samples.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Length of the buffered audio.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }

    /// Concatenates every buffered chunk into a WAV payload.
    #[track_caller]
    #[instrument(skip(self), fields(sample_count = self.samples.len(), chunk_count = self.chunk_count))]
    pub fn finish(self) -> CoreResult<Payload> {
        let spec = WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };

        let mut cursor = Cursor::new(Vec::with_capacity(44 + self.samples.len() * 4));
        let mut writer = WavWriter::new(&mut cursor, spec).map_err(|e| AudioError::EncodeError {
            reason: format!("Failed to create WAV writer: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        for sample in &self.samples {
            writer
                .write_sample(*sample)
                .map_err(|e| AudioError::EncodeError {
                    reason: format!("Failed to write sample: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                })?;
        }

        writer.finalize().map_err(|e| AudioError::EncodeError {
            reason: format!("Failed to finalize WAV: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let bytes = cursor.into_inner();
        debug!(byte_len = bytes.len(), "Capture encoded");

        Ok(Payload::new(bytes, WAV_MIME))
    }
}
