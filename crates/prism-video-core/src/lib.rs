//! prism-video-core: buffering control, bitrate adaptation, and frame
//! resampling for media playback.
//!
//! This crate is the GPU-free foundation of the prism-video pipeline. It
//! contains:
//!
//! - Playback configuration: [`options`]
//! - Buffer-fill evaluation and playability: [`loading`]
//! - Bitrate ladder adaptation: [`adaptation`]
//! - Frame types and pixel-format mapping: [`video`], [`audio`]
//! - FFmpeg-backed format conversion: [`resample`]
//! - Shared plane-buffer pooling: [`pool`]
//!
//! The pipeline shape is decode → capacity snapshot → [`loading`] →
//! playability decision → [`resample`] → converted frame → renderer. The
//! renderer itself lives in the `prism-video` crate; this crate has **zero
//! GPU dependency**.
//!
//! Each stream's decode loop owns its resamplers exclusively. The
//! [`loading::LoadController`] and [`adaptation`] helpers are invoked
//! synchronously from the playback-control loop and never block: a throttled
//! evaluation simply returns `None`.

pub mod adaptation;
pub mod audio;
pub mod loading;
pub mod options;
pub mod pool;
pub mod resample;
pub mod video;

pub use adaptation::{propose_transition, BitRateState, VideoAdaptationState};
pub use audio::{
    AudioDescriptor, AudioFrame, AUDIO_OUTPUT_CHANNELS, AUDIO_OUTPUT_SAMPLE_RATE,
};
pub use loading::{
    LoadController, LoadingState, MediaKind, MediaLoadState, MediaPlaybackState, StreamCapacity,
};
pub use options::{PlayerOptions, AUDIO_FRAME_MAX_COUNT, VIDEO_FRAME_MAX_COUNT};
pub use pool::{BufferPool, BufferRole};
pub use resample::{AudioResampler, ResampleError, VideoResampler};
pub use video::{
    ColorRange, ColorSpace, CpuFrame, FrameBuffer, HwSurface, PixelFormat, Plane, Timebase,
    VideoFrame,
};
