use async_trait::async_trait;

use crate::domain::AudioFormat;

/// Result of a processing pass: encoded output bytes plus the format they
/// are encoded in.
#[derive(Debug, Clone)]
pub struct ProcessedAudio {
    pub data: Vec<u8>,
    pub format: AudioFormat,
}

#[async_trait]
pub trait AudioProcessor: Send + Sync {
    async fn process(
        &self,
        data: &[u8],
        format: AudioFormat,
    ) -> Result<ProcessedAudio, AudioProcessorError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AudioProcessorError {
    #[error("decoding failed: {0}")]
    DecodingFailed(String),
    #[error("encoding failed: {0}")]
    EncodingFailed(String),
    #[error("empty audio stream")]
    EmptyStream,
}
