//! Playback configuration.
//!
//! All tunables live in one plain struct handed to the components that need
//! them. There is no implicit observation: the playback loop calls
//! [`crate::loading::LoadController::apply_options`] after editing a field.

/// Maximum decoded audio frames buffered per stream.
pub const AUDIO_FRAME_MAX_COUNT: usize = 16;

/// Maximum decoded video frames buffered per stream.
pub const VIDEO_FRAME_MAX_COUNT: usize = 8;

/// Playback tunables consumed by the buffering controller, the bitrate
/// adapter, and the decode pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerOptions {
    /// Seconds of media to buffer ahead before steady-state playback.
    pub preferred_forward_buffer_duration: f64,
    /// Upper bound on buffered media; also paces bitrate adaptation.
    pub max_buffer_duration: f64,
    /// Fast-start: allow video streams to satisfy the first-load gate the
    /// way audio streams do.
    pub is_second_open: bool,
    /// Decode forward to the exact seek target instead of stopping at the
    /// nearest keyframe.
    pub is_accurate_seek: bool,
    /// Restart playback from the beginning at end of stream.
    pub is_loop_play: bool,
    /// Begin playback as soon as the first evaluation reports playable.
    pub is_auto_play: bool,
    /// Resume playback automatically once a seek completes.
    pub is_seeked_auto_play: bool,
    /// Prefer the platform H.264 hardware decoder when available.
    pub hardware_decode_h264: bool,
    /// Prefer the platform H.265 hardware decoder when available.
    pub hardware_decode_h265: bool,
    /// Allow automatic bitrate ladder switching.
    pub video_adaptable: bool,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            preferred_forward_buffer_duration: 3.0,
            max_buffer_duration: 30.0,
            is_second_open: false,
            is_accurate_seek: true,
            is_loop_play: false,
            is_auto_play: false,
            is_seeked_auto_play: true,
            hardware_decode_h264: true,
            hardware_decode_h265: true,
            video_adaptable: true,
        }
    }
}
