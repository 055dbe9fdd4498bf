use std::io::Cursor;

use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::application::ports::AudioProbe;
use crate::domain::{AudioFormat, AudioProperties};

/// Reads container metadata without decoding the payload. Probe failures are
/// logged at debug and reported as unknown properties; the upload proceeds
/// either way.
pub struct SymphoniaProbe;

impl AudioProbe for SymphoniaProbe {
    fn probe(&self, data: &[u8], format: AudioFormat) -> AudioProperties {
        match probe_params(data, format) {
            Ok(properties) => properties,
            Err(e) => {
                tracing::debug!(error = %e, format = %format, "Audio probe failed");
                AudioProperties::default()
            }
        }
    }
}

fn probe_params(data: &[u8], format: AudioFormat) -> Result<AudioProperties, String> {
    let cursor = Cursor::new(data.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    hint.with_extension(format.extension());

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| format!("probe: {}", e))?;

    let track = probed
        .format
        .default_track()
        .ok_or_else(|| "no audio track found".to_string())?;
    let params = &track.codec_params;

    let sample_rate = params.sample_rate;
    let channels = params.channels.map(|c| c.count() as u16);
    let duration_secs = match (params.n_frames, params.sample_rate) {
        (Some(frames), Some(rate)) if rate > 0 => Some(frames as f64 / f64::from(rate)),
        _ => None,
    };

    Ok(AudioProperties {
        sample_rate,
        channels,
        duration_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::audio::encode_wav_pcm16;

    #[test]
    fn probes_generated_wav() {
        let samples = vec![0.1f32; 16_000];
        let wav = encode_wav_pcm16(&samples, 16_000, 1);

        let properties = SymphoniaProbe.probe(&wav, AudioFormat::Wav);
        assert_eq!(properties.sample_rate, Some(16_000));
        assert_eq!(properties.channels, Some(1));
        let duration = properties.duration_secs.expect("duration");
        assert!((duration - 1.0).abs() < 0.01, "duration was {}", duration);
    }

    #[test]
    fn unreadable_input_yields_unknown_properties() {
        let properties = SymphoniaProbe.probe(b"not audio at all", AudioFormat::Mp3);
        assert_eq!(properties, AudioProperties::default());
    }
}
