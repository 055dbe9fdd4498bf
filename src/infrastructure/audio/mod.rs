mod decode;
mod peak_normalizer;
mod symphonia_probe;
mod wav;

pub use peak_normalizer::PeakNormalizer;
pub use symphonia_probe::SymphoniaProbe;
pub use wav::encode_wav_pcm16;
