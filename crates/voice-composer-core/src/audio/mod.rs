pub(crate) mod capture;
mod decoder;
mod device;
pub(crate) mod payload;
mod playback;
pub(crate) mod recorder;
mod resampler;

pub(crate) use resampler::Resampler;

pub use {
    capture::{CpalInputDevice, CpalInputHandle},
    decoder::{AudioDecoder, DecodedAudio, SymphoniaDecoder},
    device::{DeviceHandle, InputDevice},
    payload::Payload,
    playback::{CpalPlayback, PlayableRef, PlaybackBackend, PlaybackEvent},
    recorder::ChunkRecorder,
};
