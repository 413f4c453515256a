//! Audio frame types and the output normalization contract.
//!
//! Every audio path in the pipeline converges on one output shape: planar
//! f32 samples, [`AUDIO_OUTPUT_CHANNELS`] channels, at
//! [`AUDIO_OUTPUT_SAMPLE_RATE`]. The renderer-side audio sink and A/V sync
//! both depend on this single normalization point.

use ffmpeg_next as ffmpeg;
use ffmpeg_next::format::{sample, Sample};

use crate::video::Timebase;

/// Fixed output sample rate of the audio resampler.
pub const AUDIO_OUTPUT_SAMPLE_RATE: u32 = 44_100;

/// Fixed output channel count of the audio resampler.
pub const AUDIO_OUTPUT_CHANNELS: u16 = 2;

/// Fixed output sample format: 32-bit float, planar.
pub fn audio_output_format() -> Sample {
    Sample::F32(sample::Type::Planar)
}

/// Structural identity of an audio stream's sample layout.
///
/// Two descriptors comparing equal means an existing resampling context can
/// be reused; any difference forces a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioDescriptor {
    pub channels: u16,
    pub sample_rate: u32,
    pub format: Sample,
}

impl AudioDescriptor {
    /// Reads the descriptor off a decoded frame. Streams occasionally report
    /// zero channels or rate; those fall back to the output defaults so a
    /// context can still be built.
    pub fn from_frame(frame: &ffmpeg::frame::Audio) -> Self {
        let channels = frame.channels();
        let sample_rate = frame.rate();
        Self {
            channels: if channels == 0 {
                AUDIO_OUTPUT_CHANNELS
            } else {
                channels
            },
            sample_rate: if sample_rate == 0 {
                AUDIO_OUTPUT_SAMPLE_RATE
            } else {
                sample_rate
            },
            format: frame.format(),
        }
    }
}

/// A resampled audio frame in the fixed output layout.
#[derive(Debug)]
pub struct AudioFrame {
    /// One plane of f32 bytes per channel.
    pub planes: Vec<Vec<u8>>,
    /// Samples per channel.
    pub samples: usize,
    pub sample_rate: u32,
    pub channels: u16,
    /// Duration in time-base units; derived from the sample count when the
    /// packet reports none.
    pub duration: i64,
    /// Compressed packet size in bytes, for bitrate accounting.
    pub size: i64,
    pub timebase: Timebase,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_structural_equality() {
        let a = AudioDescriptor {
            channels: 2,
            sample_rate: 48_000,
            format: audio_output_format(),
        };
        let b = a;
        assert_eq!(a, b);

        let c = AudioDescriptor {
            sample_rate: 44_100,
            ..a
        };
        assert_ne!(a, c);

        let d = AudioDescriptor {
            format: Sample::I16(sample::Type::Packed),
            ..a
        };
        assert_ne!(a, d);
    }

    #[test]
    fn test_output_format_is_planar_float() {
        assert_eq!(audio_output_format(), Sample::F32(sample::Type::Planar));
    }
}
