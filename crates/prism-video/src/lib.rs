//! prism-video: GPU color-conversion rendering for the prism media pipeline.
//!
//! This crate turns converted frames from `prism-video-core` into pixels on
//! a wgpu surface. Pipeline selection is a pure function of the frame's
//! plane count:
//!
//! | Planes | Pipeline | Layout |
//! |--------|--------------|---------------------|
//! | 3 | planar | YUV 4:2:0 (Y, U, V) |
//! | 2 | bi-planar | NV12 (Y, interleaved UV) |
//! | 1 | packed | RGBA/BGRA |
//!
//! YUV pipelines bind one of four fixed conversion matrices selected by the
//! frame's color primaries and range; packed frames are already
//! display-referred and sample straight through.
//!
//! The renderer must be driven from the thread that owns the GPU queue. The
//! host supplies the drawable target per frame; the renderer only binds
//! textures, issues the draw, and presents.

pub mod render;

pub use render::color::{color_matrix, color_offset, ColorMatrix, ColorOffset};
pub use render::renderer::{pipeline_for_plane_count, PipelineKind, VideoRenderer};
