use crate::{AudioError, CoreResult};

use std::{
    io::{Cursor, ErrorKind},
    panic::Location,
    time::Duration,
};

use error_location::ErrorLocation;
use symphonia::core::{
    audio::SampleBuffer,
    codecs::{CODEC_TYPE_NULL, DecoderOptions},
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};
use tracing::{debug, instrument, warn};

/// Decoded PCM, one sample sequence per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Frames per second.
    pub sample_rate: u32,
    /// De-interleaved samples in [-1, 1], one `Vec` per channel.
    pub channels: Vec<Vec<f32>>,
}

impl DecodedAudio {
    /// Samples of the first channel, empty when there are no channels.
    pub fn first_channel(&self) -> &[f32] {
        self.channels.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Playback length derived from the first channel.
    pub fn duration(&self) -> Option<Duration> {
        if self.sample_rate == 0 {
            return None;
        }
        Some(Duration::from_secs_f64(
            self.first_channel().len() as f64 / f64::from(self.sample_rate),
        ))
    }
}

/// Decode capability: payload bytes to per-channel samples.
pub trait AudioDecoder {
    /// Decodes `bytes`, failing with [`AudioError::DecodeError`] for corrupt
    /// or unsupported input.
    fn decode(&self, bytes: &[u8]) -> CoreResult<DecodedAudio>;
}

/// Decoder for any container and codec Symphonia recognizes: WAV, FLAC,
/// MP3, Ogg Vorbis, WebM/Matroska, and MP4/M4A (AAC).
///
/// The container is detected from the bytes themselves; the first track with
/// a known codec is decoded in full. Individually corrupt packets are
/// skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaDecoder;

impl AudioDecoder for SymphoniaDecoder {
    #[track_caller]
    #[instrument(skip(self, bytes), fields(byte_len = bytes.len()))]
    fn decode(&self, bytes: &[u8]) -> CoreResult<DecodedAudio> {
        let location = ErrorLocation::from(Location::caller());
        let source =
            MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

        let detected = symphonia::default::get_probe()
            .format(
                &Hint::new(),
                source,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| AudioError::DecodeError {
                reason: format!("Unrecognized audio container: {}", e),
                location,
            })?;
        let mut format = detected.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| AudioError::DecodeError {
                reason: "No decodable audio track".to_string(),
                location,
            })?;
        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate;
        let declared_channels = track.codec_params.channels.map(|c| c.count());

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| AudioError::DecodeError {
                reason: format!("Unsupported codec: {}", e),
                location,
            })?;

        let mut channels: Vec<Vec<f32>> = Vec::new();
        let mut skipped_packets = 0usize;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => {
                    return Err(AudioError::DecodeError {
                        reason: format!("Failed to read packet: {}", e),
                        location,
                    });
                }
            };
            if packet.track_id() != track_id {
                continue;
            }

            let buffer = match decoder.decode(&packet) {
                Ok(buffer) => buffer,
                Err(SymphoniaError::DecodeError(reason)) => {
                    skipped_packets += 1;
                    debug!(reason, "Skipping corrupt packet");
                    continue;
                }
                Err(e) => {
                    return Err(AudioError::DecodeError {
                        reason: format!("Decoder failed: {}", e),
                        location,
                    });
                }
            };

            let spec = *buffer.spec();
            let channel_count = spec.channels.count();
            if channel_count == 0 {
                continue;
            }
            if channels.len() != channel_count {
                channels.resize_with(channel_count, Vec::new);
            }
            sample_rate.get_or_insert(spec.rate);

            let mut interleaved = SampleBuffer::<f32>::new(buffer.capacity() as u64, spec);
            interleaved.copy_interleaved_ref(buffer);
            for frame in interleaved.samples().chunks_exact(channel_count) {
                for (channel, sample) in channels.iter_mut().zip(frame) {
                    channel.push(*sample);
                }
            }
        }

        if channels.is_empty() {
            if skipped_packets > 0 {
                return Err(AudioError::DecodeError {
                    reason: format!("All {} packets were corrupt", skipped_packets),
                    location,
                });
            }
            channels = vec![Vec::new(); declared_channels.unwrap_or(1).max(1)];
        }
        if skipped_packets > 0 {
            warn!(skipped_packets, "Decoded with corrupt packets skipped");
        }

        let sample_rate = sample_rate.ok_or_else(|| AudioError::DecodeError {
            reason: "Stream declares no sample rate".to_string(),
            location,
        })?;

        debug!(
            sample_rate,
            channels = channels.len(),
            frames = channels[0].len(),
            "Payload decoded"
        );

        Ok(DecodedAudio {
            sample_rate,
            channels,
        })
    }
}
