use async_trait::async_trait;

use crate::application::ports::{AudioProcessor, AudioProcessorError, ProcessedAudio};
use crate::domain::AudioFormat;

use super::decode::decode_interleaved;
use super::wav::encode_wav_pcm16;

const MIN_PEAK: f32 = 1e-6;

/// Speech-enhancement pass: decodes the upload, scales it so the loudest
/// sample hits the target peak, and re-encodes as 16-bit PCM WAV. Channel
/// layout and sample rate are preserved. Near-silent input is passed through
/// unscaled rather than amplified into noise.
pub struct PeakNormalizer {
    target_peak: f32,
}

impl PeakNormalizer {
    pub fn new(target_peak: f32) -> Self {
        Self { target_peak }
    }
}

impl Default for PeakNormalizer {
    fn default() -> Self {
        Self::new(0.95)
    }
}

#[async_trait]
impl AudioProcessor for PeakNormalizer {
    async fn process(
        &self,
        data: &[u8],
        format: AudioFormat,
    ) -> Result<ProcessedAudio, AudioProcessorError> {
        let data = data.to_vec();
        let target = self.target_peak;

        // Decoding is CPU-bound; keep it off the async runtime threads.
        tokio::task::spawn_blocking(move || {
            let decoded = decode_interleaved(&data, format)?;

            let peak = decoded
                .samples
                .iter()
                .fold(0.0f32, |max, s| max.max(s.abs()));
            let gain = if peak > MIN_PEAK { target / peak } else { 1.0 };

            let scaled: Vec<f32> = decoded.samples.iter().map(|s| s * gain).collect();

            tracing::debug!(
                samples = scaled.len(),
                sample_rate = decoded.sample_rate,
                channels = decoded.channels,
                peak,
                gain,
                "Audio normalized"
            );

            Ok(ProcessedAudio {
                data: encode_wav_pcm16(&scaled, decoded.sample_rate, decoded.channels),
                format: AudioFormat::Wav,
            })
        })
        .await
        .map_err(|e| AudioProcessorError::DecodingFailed(format!("decode task: {}", e)))?
    }
}
