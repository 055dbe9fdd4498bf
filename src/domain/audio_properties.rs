/// Properties probed from an uploaded file. All fields are optional: a file
/// that fails probing is still accepted for processing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AudioProperties {
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub duration_secs: Option<f64>,
}
