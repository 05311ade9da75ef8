//! Lossy/lossless classification of output formats

use crate::types::AudioFormat;

/// True for exactly ALAC, FLAC and WAV
///
/// Lossless downloads go through the confirmation gate, and their bitrate
/// control is disabled.
pub fn is_lossless(format: AudioFormat) -> bool {
    matches!(
        format,
        AudioFormat::Alac | AudioFormat::Flac | AudioFormat::Wav
    )
}

/// Whether the bitrate selection has any effect for `format`
pub fn bitrate_applies(format: AudioFormat) -> bool {
    !is_lossless(format)
}
