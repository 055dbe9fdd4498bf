use crate::domain::{AudioFormat, AudioProperties};

/// Best-effort extraction of sample rate, channel count and duration from an
/// uploaded file. Returns `AudioProperties::default()` when the container
/// cannot be read; probing never blocks an upload.
pub trait AudioProbe: Send + Sync {
    fn probe(&self, data: &[u8], format: AudioFormat) -> AudioProperties;
}
