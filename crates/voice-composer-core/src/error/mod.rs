use error_location::ErrorLocation;
use thiserror::Error;

/// Audio pipeline errors with source location tracking.
#[derive(Error, Debug)]
pub enum AudioError {
    /// Microphone permission denied or no input device present.
    #[error("Microphone unavailable: {reason} {location}")]
    DeviceUnavailable {
        /// Description of why the device could not be acquired.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Input device was found but its stream could not be built or started.
    #[error("Audio device error: {reason} {location}")]
    DeviceError {
        /// Description of the device error.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Payload could not be decoded into samples.
    #[error("Decode failed: {reason} {location}")]
    DecodeError {
        /// Description of the decode failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Upload ingestion received a file that is not audio.
    #[error("Unsupported payload of type {mime:?} {location}")]
    UnsupportedPayload {
        /// MIME type reported for the rejected file.
        mime: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Captured samples could not be encoded into a payload.
    #[error("Encode failed: {reason} {location}")]
    EncodeError {
        /// Description of the encode failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Playback of a clip could not be started.
    #[error("Playback error: {reason} {location}")]
    PlaybackError {
        /// Description of the playback error.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Audio resampling failed.
    #[error("Resampling error: {reason} {location}")]
    ResamplingError {
        /// Description of the resampling error.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

/// Result type alias using [`AudioError`].
pub type Result<T> = std::result::Result<T, AudioError>;
