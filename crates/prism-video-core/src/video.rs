//! Core video frame types and pixel-format mapping.
//!
//! Decoded frames arrive from FFmpeg in whatever layout the codec produced.
//! The resampler normalizes them into the closed set of renderable layouts
//! defined here: planar YUV (3 planes), bi-planar NV12 (2 planes), and packed
//! RGB variants (1 plane). Hardware-decoded surfaces pass through untouched
//! as [`HwSurface`].

use ffmpeg_next as ffmpeg;
use ffmpeg_next::format::Pixel;

/// Pixel layout of a renderable frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// YUV 4:2:0 planar (most common software-decode output)
    Yuv420p,
    /// NV12 (Y plane + interleaved UV, common for hardware decoders)
    Nv12,
    /// RGB 24-bit packed
    Rgb24,
    /// RGBA 32-bit packed
    Rgba,
    /// BGRA 32-bit packed (common on some platforms)
    Bgra,
}

impl PixelFormat {
    /// Returns the number of planes for this format.
    pub fn num_planes(&self) -> usize {
        match self {
            PixelFormat::Yuv420p => 3,
            PixelFormat::Nv12 => 2,
            PixelFormat::Rgb24 | PixelFormat::Rgba | PixelFormat::Bgra => 1,
        }
    }

    /// Returns true if this is a YUV-based format requiring color conversion.
    pub fn is_yuv(&self) -> bool {
        matches!(self, PixelFormat::Yuv420p | PixelFormat::Nv12)
    }

    /// Width of plane `index` for a frame of the given width.
    /// Chroma planes use ceiling division to handle odd dimensions.
    pub fn plane_width(&self, index: usize, width: u32) -> u32 {
        if index == 0 || !self.is_yuv() {
            width
        } else {
            width.div_ceil(2)
        }
    }

    /// Height of plane `index` for a frame of the given height.
    pub fn plane_height(&self, index: usize, height: u32) -> u32 {
        if index == 0 || !self.is_yuv() {
            height
        } else {
            height.div_ceil(2)
        }
    }

    /// Maps an FFmpeg pixel format into the renderable set.
    ///
    /// `None` is the "unsupported" sentinel: the resampler must convert such
    /// frames rather than wrap them. The mapping is intentionally exhaustive
    /// over the formats the pipeline can represent; everything else converts.
    pub fn from_av(pixel: Pixel) -> Option<PixelFormat> {
        match pixel {
            Pixel::YUV420P | Pixel::YUVJ420P => Some(PixelFormat::Yuv420p),
            Pixel::NV12 => Some(PixelFormat::Nv12),
            Pixel::RGB24 => Some(PixelFormat::Rgb24),
            Pixel::RGBA | Pixel::RGB0 => Some(PixelFormat::Rgba),
            Pixel::BGRA | Pixel::BGR0 => Some(PixelFormat::Bgra),
            _ => None,
        }
    }

    /// Maps back to the FFmpeg pixel format, the inverse of [`from_av`].
    ///
    /// [`from_av`]: PixelFormat::from_av
    pub fn to_av(self) -> Pixel {
        match self {
            PixelFormat::Yuv420p => Pixel::YUV420P,
            PixelFormat::Nv12 => Pixel::NV12,
            PixelFormat::Rgb24 => Pixel::RGB24,
            PixelFormat::Rgba => Pixel::RGBA,
            PixelFormat::Bgra => Pixel::BGRA,
        }
    }

    /// Returns true when `pixel` names a hardware surface format rather than
    /// CPU-addressable memory.
    pub fn is_hardware(pixel: Pixel) -> bool {
        matches!(
            pixel,
            Pixel::VIDEOTOOLBOX
                | Pixel::VAAPI
                | Pixel::D3D11
                | Pixel::DXVA2_VLD
                | Pixel::CUDA
                | Pixel::QSV
        )
    }

    /// Layouts the renderer consumes without a conversion pass.
    pub fn is_directly_renderable(pixel: Pixel) -> bool {
        matches!(pixel, Pixel::NV12 | Pixel::YUV420P | Pixel::BGRA)
    }
}

/// Color primaries tag for YUV frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Bt601,
    Bt709,
}

impl ColorSpace {
    /// BT.709-tagged streams select the 709 matrices; every other tag
    /// (SMPTE 170M, BT.470BG, unspecified, ...) falls back to BT.601.
    pub fn from_av(space: ffmpeg::color::Space) -> ColorSpace {
        if space == ffmpeg::color::Space::BT709 {
            ColorSpace::Bt709
        } else {
            ColorSpace::Bt601
        }
    }
}

/// Luma range of a YUV frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorRange {
    /// Broadcast-safe 16–235 luma.
    Video,
    /// Full 0–255 luma.
    Full,
}

impl ColorRange {
    pub fn from_av(range: ffmpeg::color::Range) -> ColorRange {
        if range == ffmpeg::color::Range::JPEG {
            ColorRange::Full
        } else {
            ColorRange::Video
        }
    }
}

/// Rational stream time base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timebase {
    pub num: i32,
    pub den: i32,
}

impl Timebase {
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// Duration of `samples` audio samples in time-base units, used when the
    /// packet carries no duration of its own.
    pub fn sample_duration(&self, samples: usize, sample_rate: u32) -> i64 {
        if sample_rate == 0 || self.num == 0 {
            return 0;
        }
        samples as i64 * self.den as i64 / (sample_rate as i64 * self.num as i64)
    }
}

impl From<ffmpeg::Rational> for Timebase {
    fn from(rational: ffmpeg::Rational) -> Self {
        Self {
            num: rational.numerator(),
            den: rational.denominator(),
        }
    }
}

/// A single plane of pixel data. The buffer is pool-owned; see
/// [`crate::pool::BufferPool::recycle_video`].
#[derive(Debug, Clone)]
pub struct Plane {
    /// Raw pixel bytes.
    pub data: Vec<u8>,
    /// Bytes per row, may include padding.
    pub stride: usize,
}

/// A renderable frame with CPU-accessible pixel data.
#[derive(Debug, Clone)]
pub struct CpuFrame {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    /// One entry per plane, `format.num_planes()` long.
    pub planes: Vec<Plane>,
    pub color_space: ColorSpace,
    pub color_range: ColorRange,
    /// Presentation size after sample-aspect-ratio correction.
    pub drawable_size: (u32, u32),
}

impl CpuFrame {
    pub fn plane(&self, index: usize) -> Option<&Plane> {
        self.planes.get(index)
    }

    /// Applies the stream's sample aspect ratio to the stored dimensions.
    /// Square pixels (or a missing ratio) leave the size unchanged.
    pub fn drawable_size_for(width: u32, height: u32, sar_num: i32, sar_den: i32) -> (u32, u32) {
        if sar_num > 0 && sar_den > 0 && sar_num != sar_den {
            (width, (height as i64 * sar_den as i64 / sar_num as i64) as u32)
        } else {
            (width, height)
        }
    }
}

/// A hardware-decoded surface wrapped without conversion.
///
/// The underlying FFmpeg frame is refcounted; holding it here keeps the
/// driver surface alive until the host's platform import path consumes it.
pub struct HwSurface {
    pub width: u32,
    pub height: u32,
    frame: ffmpeg::frame::Video,
}

impl HwSurface {
    pub fn new(frame: ffmpeg::frame::Video) -> Self {
        Self {
            width: frame.width(),
            height: frame.height(),
            frame,
        }
    }

    /// The raw decoder frame, for platform zero-copy import.
    pub fn as_raw(&self) -> &ffmpeg::frame::Video {
        &self.frame
    }
}

impl std::fmt::Debug for HwSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HwSurface")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Pixel storage of a converted frame.
#[derive(Debug)]
pub enum FrameBuffer {
    /// CPU-accessible planes, ready for texture upload.
    Cpu(CpuFrame),
    /// Hardware surface passed through zero-copy.
    Hw(HwSurface),
}

impl FrameBuffer {
    pub fn as_cpu(&self) -> Option<&CpuFrame> {
        match self {
            FrameBuffer::Cpu(frame) => Some(frame),
            FrameBuffer::Hw(_) => None,
        }
    }

    pub fn is_hardware(&self) -> bool {
        matches!(self, FrameBuffer::Hw(_))
    }
}

/// A converted video frame plus timing metadata, consumed exactly once by
/// the renderer.
#[derive(Debug)]
pub struct VideoFrame {
    pub buffer: FrameBuffer,
    /// Duration in time-base units, as reported by the decoder packet.
    pub duration: i64,
    /// Compressed packet size in bytes, for bitrate accounting.
    pub size: i64,
    pub timebase: Timebase,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_counts() {
        assert_eq!(PixelFormat::Yuv420p.num_planes(), 3);
        assert_eq!(PixelFormat::Nv12.num_planes(), 2);
        assert_eq!(PixelFormat::Rgba.num_planes(), 1);
        assert_eq!(PixelFormat::Bgra.num_planes(), 1);
        assert_eq!(PixelFormat::Rgb24.num_planes(), 1);
    }

    #[test]
    fn test_chroma_plane_dimensions_round_up() {
        let format = PixelFormat::Yuv420p;
        assert_eq!(format.plane_width(0, 1921), 1921);
        assert_eq!(format.plane_width(1, 1921), 961);
        assert_eq!(format.plane_height(2, 1081), 541);
        // Packed formats have a single full-size plane.
        assert_eq!(PixelFormat::Bgra.plane_width(0, 1921), 1921);
    }

    #[test]
    fn test_pixel_format_mapping_round_trip() {
        for format in [
            PixelFormat::Yuv420p,
            PixelFormat::Nv12,
            PixelFormat::Rgb24,
            PixelFormat::Rgba,
            PixelFormat::Bgra,
        ] {
            assert_eq!(PixelFormat::from_av(format.to_av()), Some(format));
        }
    }

    #[test]
    fn test_unmapped_formats_yield_sentinel() {
        assert_eq!(PixelFormat::from_av(Pixel::YUV444P), None);
        assert_eq!(PixelFormat::from_av(Pixel::GRAY8), None);
        assert_eq!(PixelFormat::from_av(Pixel::None), None);
    }

    #[test]
    fn test_hardware_format_detection() {
        assert!(PixelFormat::is_hardware(Pixel::VIDEOTOOLBOX));
        assert!(PixelFormat::is_hardware(Pixel::VAAPI));
        assert!(!PixelFormat::is_hardware(Pixel::YUV420P));
    }

    #[test]
    fn test_color_space_defaults_to_bt601() {
        assert_eq!(
            ColorSpace::from_av(ffmpeg::color::Space::BT709),
            ColorSpace::Bt709
        );
        assert_eq!(
            ColorSpace::from_av(ffmpeg::color::Space::SMPTE170M),
            ColorSpace::Bt601
        );
        assert_eq!(
            ColorSpace::from_av(ffmpeg::color::Space::Unspecified),
            ColorSpace::Bt601
        );
    }

    #[test]
    fn test_sample_duration_derivation() {
        // 1024 samples at 44.1kHz in a 1/44100 time base: one unit per sample.
        let timebase = Timebase::new(1, 44_100);
        assert_eq!(timebase.sample_duration(1024, 44_100), 1024);
        // 1/90000 time base at 48kHz: 1024 * 90000 / 48000 = 1920.
        let timebase = Timebase::new(1, 90_000);
        assert_eq!(timebase.sample_duration(1024, 48_000), 1920);
        // Degenerate inputs never divide by zero.
        assert_eq!(Timebase::new(0, 90_000).sample_duration(1024, 48_000), 0);
        assert_eq!(timebase.sample_duration(1024, 0), 0);
    }

    #[test]
    fn test_drawable_size_applies_aspect_ratio() {
        assert_eq!(CpuFrame::drawable_size_for(1920, 1080, 1, 1), (1920, 1080));
        assert_eq!(CpuFrame::drawable_size_for(1920, 1080, 0, 1), (1920, 1080));
        assert_eq!(CpuFrame::drawable_size_for(720, 576, 16, 15), (720, 540));
    }
}
