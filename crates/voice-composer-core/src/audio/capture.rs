use crate::{
    AudioError, CoreResult,
    audio::{DeviceHandle, InputDevice},
};

use std::{
    collections::VecDeque,
    panic::Location,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
};

use cpal::{
    Device, Stream, StreamConfig,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use error_location::ErrorLocation;
use tracing::{debug, error, info, instrument, warn};

/// Maximum samples held between two `take_chunk` calls (5 minutes at 48kHz mono).
/// Prevents unbounded memory growth if the owner stops draining.
///
/// **Memory footprint at max capacity:**
/// - 48,000 Hz * 60s * 5 min * 4 bytes/f32 = ~58MB
pub(crate) const MAX_BUFFER_SAMPLES: usize = 48_000 * 60 * 5;

/// Number of recent samples kept for read-only analyser sampling.
pub(crate) const WINDOW_SAMPLES: usize = 2048;

/// Shared between the cpal callback thread and the handle owner.
#[derive(Default)]
pub(crate) struct CaptureBuffers {
    pub(crate) pending: VecDeque<f32>,
    pub(crate) window: VecDeque<f32>,
}

impl CaptureBuffers {
    /// Appends interleaved frames, downmixed to mono.
    pub(crate) fn push_interleaved(&mut self, data: &[f32], channels: usize) {
        let channels = channels.max(1);
        for frame in data.chunks(channels) {
            let mono = frame.iter().sum::<f32>() / frame.len() as f32;
            self.pending.push_back(mono);
            self.window.push_back(mono);
        }
        // Ring buffer: O(1) amortized drop of oldest samples via VecDeque
        while self.pending.len() > MAX_BUFFER_SAMPLES {
            self.pending.pop_front();
        }
        while self.window.len() > WINDOW_SAMPLES {
            self.window.pop_front();
        }
    }
}

/// Microphone source backed by the default cpal host.
#[derive(Debug, Clone, Default)]
pub struct CpalInputDevice {
    selected_device: Option<String>,
}

impl CpalInputDevice {
    /// Uses the named input device, or the host default when `None`.
    pub fn new(selected_device: Option<String>) -> Self {
        Self { selected_device }
    }

    #[track_caller]
    fn find_device(&self) -> CoreResult<Device> {
        let host = cpal::default_host();

        let Some(wanted) = self.selected_device.as_deref() else {
            return host
                .default_input_device()
                .ok_or(AudioError::DeviceUnavailable {
                    reason: "No microphone found".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                });
        };

        let mut devices = host
            .input_devices()
            .map_err(|e| AudioError::DeviceUnavailable {
                reason: format!("Failed to enumerate input devices: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        #[allow(deprecated)]
        let found = devices.find(|d| d.name().map(|n| n == wanted).unwrap_or(false));

        found.ok_or_else(|| AudioError::DeviceUnavailable {
            reason: format!("Input device {:?} not found", wanted),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}

impl InputDevice for CpalInputDevice {
    type Handle = CpalInputHandle;

    #[track_caller]
    #[instrument(skip(self))]
    fn acquire(&mut self) -> CoreResult<CpalInputHandle> {
        let device = self.find_device()?;

        let supported = device
            .default_input_config()
            .map_err(|e| AudioError::DeviceUnavailable {
                reason: format!("Failed to get config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;
        let config: StreamConfig = supported.into();
        let channels = usize::from(config.channels);

        let buffers = Arc::new(Mutex::new(CaptureBuffers::default()));
        let shutdown = Arc::new(AtomicBool::new(false));

        let stream = {
            let buffers = Arc::clone(&buffers);
            let shutdown = Arc::clone(&shutdown);
            device
                .build_input_stream(
                    &config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        // Once release() sets this flag no new samples are
                        // written, even if cpal fires one more callback
                        // before the stream is dropped.
                        if shutdown.load(Ordering::Acquire) {
                            return;
                        }
                        let mut buf = buffers.lock().unwrap_or_else(|e| {
                            error!("Capture buffer lock poisoned, recovering: {}", e);
                            e.into_inner()
                        });
                        buf.push_interleaved(data, channels);
                    },
                    |err| {
                        error!("Audio stream error: {}", err);
                    },
                    None,
                )
                .map_err(|e| AudioError::DeviceError {
                    reason: format!("Failed to build stream: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                })?
        };

        stream.play().map_err(|e| AudioError::DeviceError {
            reason: format!("Failed to start stream: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(
            device_id = ?device.id(),
            sample_rate = config.sample_rate,
            channels = config.channels,
            "Microphone acquired"
        );

        Ok(CpalInputHandle {
            stream: Some(stream),
            sample_rate: config.sample_rate,
            buffers,
            shutdown,
        })
    }
}

/// Open cpal input stream. Dropping it releases the device.
pub struct CpalInputHandle {
    stream: Option<Stream>,
    sample_rate: u32,
    buffers: Arc<Mutex<CaptureBuffers>>,
    /// Signals the audio callback to stop writing. Set to `true` before
    /// dropping the stream so no in-flight callback writes afterwards.
    shutdown: Arc<AtomicBool>,
}

impl CpalInputHandle {
    fn buffers(&self) -> MutexGuard<'_, CaptureBuffers> {
        self.buffers.lock().unwrap_or_else(|e| {
            warn!("Capture buffer lock poisoned, recovering: {}", e);
            e.into_inner()
        })
    }
}

impl DeviceHandle for CpalInputHandle {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn take_chunk(&mut self) -> Option<Vec<f32>> {
        let mut buf = self.buffers();
        if buf.pending.is_empty() {
            return None;
        }
        Some(buf.pending.drain(..).collect())
    }

    fn read_window(&self, out: &mut [f32]) -> usize {
        let buf = self.buffers();
        let count = out.len().min(buf.window.len());
        let skip = buf.window.len() - count;
        for (slot, sample) in out.iter_mut().zip(buf.window.iter().skip(skip)) {
            *slot = *sample;
        }
        count
    }

    #[instrument(skip(self))]
    fn release(&mut self) {
        self.shutdown.store(true, Ordering::Release);

        if let Some(stream) = self.stream.take() {
            drop(stream);
            // Lets any in-flight callback observe the shutdown flag on
            // backends whose drop() returns before the final callback.
            std::thread::sleep(std::time::Duration::from_millis(5));
            info!("Microphone released");
        } else {
            debug!("Microphone already released");
        }
    }

    fn is_released(&self) -> bool {
        self.stream.is_none()
    }
}

impl Drop for CpalInputHandle {
    fn drop(&mut self) {
        self.release();
    }
}
