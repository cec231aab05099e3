use crate::CoreResult;

/// Source of exclusive microphone handles.
///
/// Acquisition fails with [`crate::AudioError::DeviceUnavailable`] when the
/// platform denies access or has no input device.
pub trait InputDevice {
    /// Handle type returned by a successful acquisition.
    type Handle: DeviceHandle;

    /// Opens the device and starts delivering data into the returned handle.
    fn acquire(&mut self) -> CoreResult<Self::Handle>;
}

/// An open, exclusively owned input stream.
///
/// The owner must call [`DeviceHandle::release`] before the device is
/// considered free again. Buffered data stays readable after release.
pub trait DeviceHandle {
    /// Sample rate of the mono data delivered by this handle.
    fn sample_rate(&self) -> u32;

    /// Returns the samples delivered since the previous call, if any.
    fn take_chunk(&mut self) -> Option<Vec<f32>>;

    /// Copies the most recent time-domain samples into `out`, oldest first,
    /// and returns how many were written. Never consumes capture data.
    fn read_window(&self, out: &mut [f32]) -> usize;

    /// Stops every track backing this handle. Idempotent.
    fn release(&mut self);

    /// Whether [`DeviceHandle::release`] has run.
    fn is_released(&self) -> bool;
}
