//! Fixed YCbCr→RGB conversion constants.
//!
//! Eight numbers-only constants cover every YUV frame the pipeline renders:
//! four 3×3 matrices selected by (color primaries × range) and two offset
//! vectors selected by range. The fragment shader computes
//! `rgb = matrix * (yuv + offset)`. The values are a behavioral contract;
//! they are uploaded verbatim, never computed at runtime.

use bytemuck::{Pod, Zeroable};
use prism_video_core::{ColorRange, ColorSpace};

/// A column-major 3×3 matrix padded to std140 uniform layout
/// (each column occupies 16 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ColorMatrix {
    cols: [[f32; 4]; 3],
}

impl ColorMatrix {
    const fn new(c0: [f32; 3], c1: [f32; 3], c2: [f32; 3]) -> Self {
        Self {
            cols: [
                [c0[0], c0[1], c0[2], 0.0],
                [c1[0], c1[1], c1[2], 0.0],
                [c2[0], c2[1], c2[2], 0.0],
            ],
        }
    }

    /// Column `index` without padding.
    pub fn column(&self, index: usize) -> [f32; 3] {
        let c = self.cols[index];
        [c[0], c[1], c[2]]
    }
}

/// A vec3 offset padded to std140 uniform layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ColorOffset {
    value: [f32; 4],
}

impl ColorOffset {
    const fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            value: [x, y, z, 0.0],
        }
    }

    pub fn xyz(&self) -> [f32; 3] {
        [self.value[0], self.value[1], self.value[2]]
    }
}

pub const MATRIX_601_VIDEO_RANGE: ColorMatrix = ColorMatrix::new(
    [1.164, 1.164, 1.164],
    [0.0, -0.392, 2.017],
    [1.596, -0.813, 0.0],
);

pub const MATRIX_601_FULL_RANGE: ColorMatrix = ColorMatrix::new(
    [1.0, 1.0, 1.0],
    [0.0, -0.343, 1.765],
    [1.4, -0.711, 0.0],
);

pub const MATRIX_709_VIDEO_RANGE: ColorMatrix = ColorMatrix::new(
    [1.164, 1.164, 1.164],
    [0.0, -0.213, 2.112],
    [1.793, -0.533, 0.0],
);

pub const MATRIX_709_FULL_RANGE: ColorMatrix = ColorMatrix::new(
    [1.0, 1.0, 1.0],
    [0.0, -0.187, 1.856],
    [1.570, -0.467, 0.0],
);

/// Video-range luma sits on a 16/255 pedestal; chroma is centered either way.
pub const OFFSET_VIDEO_RANGE: ColorOffset = ColorOffset::new(-16.0 / 255.0, -0.5, -0.5);

pub const OFFSET_FULL_RANGE: ColorOffset = ColorOffset::new(0.0, -0.5, -0.5);

/// Selects the conversion matrix for a YUV frame.
pub fn color_matrix(space: ColorSpace, range: ColorRange) -> &'static ColorMatrix {
    match (space, range) {
        (ColorSpace::Bt601, ColorRange::Video) => &MATRIX_601_VIDEO_RANGE,
        (ColorSpace::Bt601, ColorRange::Full) => &MATRIX_601_FULL_RANGE,
        (ColorSpace::Bt709, ColorRange::Video) => &MATRIX_709_VIDEO_RANGE,
        (ColorSpace::Bt709, ColorRange::Full) => &MATRIX_709_FULL_RANGE,
    }
}

/// Selects the luma/chroma offset for a YUV frame.
pub fn color_offset(range: ColorRange) -> &'static ColorOffset {
    match range {
        ColorRange::Video => &OFFSET_VIDEO_RANGE,
        ColorRange::Full => &OFFSET_FULL_RANGE,
    }
}
