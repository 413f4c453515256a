//! Frame format conversion via FFmpeg's swscale/swresample.
//!
//! Both resamplers follow the same lifecycle: a conversion context is built
//! lazily on the first frame, reused while the input's structural identity
//! is unchanged, and torn down on any failure so the next frame starts
//! fresh. Errors are returned to the caller, whose policy is to drop the
//! affected frame and continue; a single bad frame never stops the
//! pipeline.
//!
//! Each resampler instance is owned by exactly one stream's decode pipeline
//! and must not be shared across threads.

use std::sync::Arc;

use ffmpeg_next as ffmpeg;
use ffmpeg_next::ffi;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::{resampling, scaling};
use ffmpeg_next::ChannelLayout;

use crate::audio::{
    audio_output_format, AudioDescriptor, AudioFrame, AUDIO_OUTPUT_CHANNELS,
    AUDIO_OUTPUT_SAMPLE_RATE,
};
use crate::pool::{BufferPool, BufferRole};
use crate::video::{
    ColorRange, ColorSpace, CpuFrame, FrameBuffer, HwSurface, PixelFormat, Plane, Timebase,
    VideoFrame,
};

/// Errors surfaced by the resampling layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResampleError {
    /// A scaler/resampler context could not be created.
    Allocation(String),
    /// The scale/convert call itself failed.
    Conversion(String),
    /// The pixel or sample format has no usable mapping.
    UnsupportedFormat(String),
    /// The input's structural format changed and the rebuild failed.
    ContextStale(String),
}

impl std::fmt::Display for ResampleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Allocation(msg) => write!(f, "Context allocation failed: {msg}"),
            Self::Conversion(msg) => write!(f, "Conversion failed: {msg}"),
            Self::UnsupportedFormat(msg) => write!(f, "Unsupported format: {msg}"),
            Self::ContextStale(msg) => write!(f, "Stale context: {msg}"),
        }
    }
}

impl std::error::Error for ResampleError {}

/// Converts decoded video frames into renderable layouts.
///
/// The scaling context is rebuilt only when the source `(format, width,
/// height)` triple changes; the destination frame is allocated once per
/// context and reused across calls.
pub struct VideoResampler {
    dst_format: Pixel,
    /// Convert even when the source layout is directly renderable
    /// (snapshot/thumbnail extraction).
    force_transfer: bool,
    scaler: Option<scaling::Context>,
    src: Option<(Pixel, u32, u32)>,
    dst_frame: Option<ffmpeg::frame::Video>,
    pool: Arc<BufferPool>,
    rebuilds: usize,
}

impl VideoResampler {
    /// Streaming converter targeting `dst_format` for sources the renderer
    /// cannot consume directly.
    pub fn new(dst_format: PixelFormat, pool: Arc<BufferPool>) -> Self {
        Self {
            dst_format: dst_format.to_av(),
            force_transfer: false,
            scaler: None,
            src: None,
            dst_frame: None,
            pool,
            rebuilds: 0,
        }
    }

    /// One-shot converter that always scales, used for thumbnail/snapshot
    /// extraction outside the streaming path.
    pub fn snapshot_converter(dst_format: PixelFormat, pool: Arc<BufferPool>) -> Self {
        Self {
            force_transfer: true,
            ..Self::new(dst_format, pool)
        }
    }

    /// Times the scaling context has been (re)built. Context reuse is a
    /// correctness property; tests assert on this.
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    /// Converts one decoded frame into a renderable [`VideoFrame`].
    ///
    /// Hardware surfaces are wrapped zero-copy without scaling. Directly
    /// renderable layouts are wrapped without a scaling pass; everything
    /// else is converted to the target format.
    pub fn transfer(
        &mut self,
        frame: &ffmpeg::frame::Video,
        timebase: Timebase,
    ) -> Result<VideoFrame, ResampleError> {
        let packet = frame.packet();
        if PixelFormat::is_hardware(frame.format()) {
            return Ok(VideoFrame {
                buffer: FrameBuffer::Hw(HwSurface::new(ref_frame(frame)?)),
                duration: packet.duration,
                size: packet.size as i64,
                timebase,
            });
        }

        let buffer = FrameBuffer::Cpu(self.convert(frame)?);
        Ok(VideoFrame {
            buffer,
            duration: packet.duration,
            size: packet.size as i64,
            timebase,
        })
    }

    /// Converts a software frame into a [`CpuFrame`], scaling only when the
    /// source layout demands it. This is also the snapshot entry point.
    pub fn convert(&mut self, frame: &ffmpeg::frame::Video) -> Result<CpuFrame, ResampleError> {
        let needs_scale = self.ensure_context(frame.format(), frame.width(), frame.height())?;
        if !needs_scale {
            return self.wrap(frame, frame);
        }

        let run_result = match (self.scaler.as_mut(), self.dst_frame.as_mut()) {
            (Some(scaler), Some(dst)) => scaler.run(frame, dst),
            _ => {
                return Err(ResampleError::ContextStale(
                    "scaler missing after setup".to_string(),
                ))
            }
        };
        if let Err(e) = run_result {
            self.shutdown();
            return Err(ResampleError::Conversion(format!("sws_scale failed: {e}")));
        }

        // Pixel data comes from the destination; color and aspect metadata
        // stay with the source stream.
        match self.dst_frame.as_ref() {
            Some(dst) => self.wrap(dst, frame),
            None => Err(ResampleError::ContextStale(
                "destination frame missing after setup".to_string(),
            )),
        }
    }

    /// Rebuilds the scaling context when the source triple changed.
    ///
    /// Returns whether a scaling pass is required for this source; `false`
    /// means frames of this layout are wrapped directly.
    fn ensure_context(
        &mut self,
        format: Pixel,
        width: u32,
        height: u32,
    ) -> Result<bool, ResampleError> {
        if self.src == Some((format, width, height)) {
            return Ok(self.scaler.is_some());
        }
        self.shutdown();
        self.src = Some((format, width, height));

        if !self.force_transfer && PixelFormat::is_directly_renderable(format) {
            return Ok(false);
        }

        let scaler = scaling::Context::get(
            format,
            width,
            height,
            self.dst_format,
            width,
            height,
            scaling::Flags::BICUBIC,
        )
        .map_err(|e| {
            self.src = None;
            ResampleError::Allocation(format!("sws context for {format:?} {width}x{height}: {e}"))
        })?;
        self.scaler = Some(scaler);
        self.dst_frame = Some(ffmpeg::frame::Video::new(self.dst_format, width, height));
        self.rebuilds += 1;
        tracing::debug!(?format, width, height, dst = ?self.dst_format, "scaler rebuilt");
        Ok(true)
    }

    /// Copies `pixels`' planes into pool-backed buffers, tagging the result
    /// with `meta`'s color and aspect information.
    fn wrap(
        &self,
        pixels: &ffmpeg::frame::Video,
        meta: &ffmpeg::frame::Video,
    ) -> Result<CpuFrame, ResampleError> {
        let format = PixelFormat::from_av(pixels.format()).ok_or_else(|| {
            ResampleError::UnsupportedFormat(format!("{:?} is not renderable", pixels.format()))
        })?;
        let width = pixels.width();
        let height = pixels.height();

        let mut planes = Vec::with_capacity(format.num_planes());
        for index in 0..format.num_planes() {
            let stride = pixels.stride(index);
            let plane_height = format.plane_height(index, height) as usize;
            let data = pixels.data(index);
            let len = (stride * plane_height).min(data.len());
            let mut buf = self.pool.acquire(BufferRole::VideoPlane, len);
            buf.copy_from_slice(&data[..len]);
            planes.push(Plane { data: buf, stride });
        }

        let aspect = meta.aspect_ratio();
        Ok(CpuFrame {
            format,
            width,
            height,
            planes,
            color_space: ColorSpace::from_av(meta.color_space()),
            color_range: ColorRange::from_av(meta.color_range()),
            drawable_size: CpuFrame::drawable_size_for(
                width,
                height,
                aspect.numerator(),
                aspect.denominator(),
            ),
        })
    }

    /// Releases the scaling context and destination buffer.
    pub fn shutdown(&mut self) {
        self.scaler = None;
        self.dst_frame = None;
        self.src = None;
    }
}

/// Adds a reference to `frame`'s buffers without copying pixel data.
fn ref_frame(frame: &ffmpeg::frame::Video) -> Result<ffmpeg::frame::Video, ResampleError> {
    let mut owned = ffmpeg::frame::Video::empty();
    // SAFETY: both pointers are valid AVFrames for the duration of the call;
    // av_frame_ref only increments the source's buffer refcounts and copies
    // properties into the empty destination.
    let ret = unsafe { ffi::av_frame_ref(owned.as_mut_ptr(), frame.as_ptr()) };
    if ret < 0 {
        return Err(ResampleError::Allocation(format!(
            "av_frame_ref failed: {ret}"
        )));
    }
    Ok(owned)
}

/// Normalizes decoded audio into the fixed output layout: planar f32,
/// [`AUDIO_OUTPUT_CHANNELS`] channels, [`AUDIO_OUTPUT_SAMPLE_RATE`].
///
/// The resampling context is rebuilt only when the structural
/// [`AudioDescriptor`] of the input changes.
pub struct AudioResampler {
    ctx: Option<resampling::Context>,
    descriptor: Option<AudioDescriptor>,
    pool: Arc<BufferPool>,
    rebuilds: usize,
}

impl AudioResampler {
    pub fn new(pool: Arc<BufferPool>) -> Self {
        Self {
            ctx: None,
            descriptor: None,
            pool,
            rebuilds: 0,
        }
    }

    /// Times the resampling context has been (re)built.
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    /// Resamples one decoded frame into the fixed output layout.
    ///
    /// On context failure the caller should drop the frame; the next call
    /// retries with a fresh context.
    pub fn transfer(
        &mut self,
        frame: &ffmpeg::frame::Audio,
        timebase: Timebase,
    ) -> Result<AudioFrame, ResampleError> {
        self.ensure_context(frame)?;

        let mut output = ffmpeg::frame::Audio::empty();
        let run_result = match self.ctx.as_mut() {
            Some(ctx) => ctx.run(frame, &mut output),
            None => {
                return Err(ResampleError::ContextStale(
                    "resampler missing after setup".to_string(),
                ))
            }
        };
        if let Err(e) = run_result {
            self.shutdown();
            return Err(ResampleError::Conversion(format!(
                "swr_convert failed: {e}"
            )));
        }

        // The resampler may buffer internally and emit nothing for this
        // frame; an unallocated output frame has no planes to read.
        let samples = output.samples();
        let bytes_per_plane = samples * std::mem::size_of::<f32>();
        let mut planes = Vec::with_capacity(AUDIO_OUTPUT_CHANNELS as usize);
        for channel in 0..AUDIO_OUTPUT_CHANNELS as usize {
            if samples == 0 || channel >= output.planes() {
                planes.push(Vec::new());
                continue;
            }
            let data = output.data(channel);
            let len = bytes_per_plane.min(data.len());
            let mut buf = self.pool.acquire(BufferRole::AudioPlane, len);
            buf.copy_from_slice(&data[..len]);
            planes.push(buf);
        }

        let packet = frame.packet();
        let duration = if packet.duration == 0 {
            timebase.sample_duration(frame.samples(), frame.rate())
        } else {
            packet.duration
        };

        Ok(AudioFrame {
            planes,
            samples,
            sample_rate: AUDIO_OUTPUT_SAMPLE_RATE,
            channels: AUDIO_OUTPUT_CHANNELS,
            duration,
            size: packet.size as i64,
            timebase,
        })
    }

    fn ensure_context(&mut self, frame: &ffmpeg::frame::Audio) -> Result<(), ResampleError> {
        let descriptor = AudioDescriptor::from_frame(frame);
        if self.ctx.is_some() && self.descriptor == Some(descriptor) {
            return Ok(());
        }

        let ctx = resampling::Context::get(
            descriptor.format,
            frame.channel_layout(),
            descriptor.sample_rate,
            audio_output_format(),
            ChannelLayout::STEREO,
            AUDIO_OUTPUT_SAMPLE_RATE,
        )
        .map_err(|e| {
            self.shutdown();
            ResampleError::Allocation(format!("swr context for {descriptor:?}: {e}"))
        })?;

        self.ctx = Some(ctx);
        self.descriptor = Some(descriptor);
        self.rebuilds += 1;
        tracing::debug!(?descriptor, "audio resampler rebuilt");
        Ok(())
    }

    /// Releases the resampling context.
    pub fn shutdown(&mut self) {
        self.ctx = None;
        self.descriptor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffmpeg_next::format::{sample, Sample};

    fn pool() -> Arc<BufferPool> {
        BufferPool::new()
    }

    fn audio_frame(format: Sample, rate: u32, samples: usize) -> ffmpeg::frame::Audio {
        ffmpeg::init().expect("ffmpeg init");
        let mut frame = ffmpeg::frame::Audio::new(format, samples, ChannelLayout::STEREO);
        frame.set_rate(rate);
        frame
    }

    #[test]
    fn test_audio_output_is_normalized() {
        let mut resampler = AudioResampler::new(pool());
        let frame = audio_frame(Sample::I16(sample::Type::Packed), 48_000, 1024);
        let timebase = Timebase::new(1, 48_000);
        let out = resampler.transfer(&frame, timebase).expect("resample");
        assert_eq!(out.sample_rate, AUDIO_OUTPUT_SAMPLE_RATE);
        assert_eq!(out.channels, AUDIO_OUTPUT_CHANNELS);
        assert_eq!(out.planes.len(), AUDIO_OUTPUT_CHANNELS as usize);
    }

    #[test]
    fn test_audio_context_reused_for_same_descriptor() {
        let mut resampler = AudioResampler::new(pool());
        let timebase = Timebase::new(1, 48_000);
        let frame = audio_frame(Sample::I16(sample::Type::Packed), 48_000, 512);
        resampler.transfer(&frame, timebase).expect("first");
        resampler.transfer(&frame, timebase).expect("second");
        assert_eq!(resampler.rebuilds(), 1);

        // A rate change is a structural change: rebuild exactly once more.
        let frame = audio_frame(Sample::I16(sample::Type::Packed), 32_000, 512);
        resampler.transfer(&frame, timebase).expect("third");
        assert_eq!(resampler.rebuilds(), 2);
    }

    #[test]
    fn test_audio_duration_derived_when_packet_reports_none() {
        let mut resampler = AudioResampler::new(pool());
        // Decoder-made frames carry no packet duration.
        let frame = audio_frame(Sample::F32(sample::Type::Planar), 48_000, 960);
        let out = resampler
            .transfer(&frame, Timebase::new(1, 90_000))
            .expect("resample");
        assert_eq!(out.duration, 960 * 90_000 / 48_000);
    }

    #[test]
    fn test_video_direct_wrap_skips_scaling() {
        ffmpeg::init().expect("ffmpeg init");
        let mut resampler = VideoResampler::new(PixelFormat::Bgra, pool());
        let frame = ffmpeg::frame::Video::new(Pixel::YUV420P, 64, 64);
        let out = resampler
            .transfer(&frame, Timebase::new(1, 1000))
            .expect("transfer");
        let cpu = out.buffer.as_cpu().expect("cpu frame");
        assert_eq!(cpu.format, PixelFormat::Yuv420p);
        assert_eq!(cpu.planes.len(), 3);
        // Directly renderable input never builds a scaler.
        assert_eq!(resampler.rebuilds(), 0);
    }

    #[test]
    fn test_video_scaler_reused_until_source_changes() {
        ffmpeg::init().expect("ffmpeg init");
        let mut resampler = VideoResampler::new(PixelFormat::Bgra, pool());
        let frame = ffmpeg::frame::Video::new(Pixel::YUV422P, 64, 64);
        resampler.transfer(&frame, Timebase::new(1, 1000)).expect("first");
        resampler.transfer(&frame, Timebase::new(1, 1000)).expect("second");
        assert_eq!(resampler.rebuilds(), 1);

        let frame = ffmpeg::frame::Video::new(Pixel::YUV422P, 128, 64);
        resampler.transfer(&frame, Timebase::new(1, 1000)).expect("third");
        assert_eq!(resampler.rebuilds(), 2);
    }

    #[test]
    fn test_video_unsupported_layout_converts_to_target() {
        ffmpeg::init().expect("ffmpeg init");
        let mut resampler = VideoResampler::new(PixelFormat::Bgra, pool());
        let frame = ffmpeg::frame::Video::new(Pixel::YUV444P, 32, 32);
        let out = resampler
            .transfer(&frame, Timebase::new(1, 1000))
            .expect("transfer");
        let cpu = out.buffer.as_cpu().expect("cpu frame");
        assert_eq!(cpu.format, PixelFormat::Bgra);
        assert_eq!(cpu.planes.len(), 1);
    }

    #[test]
    fn test_snapshot_converter_always_scales() {
        ffmpeg::init().expect("ffmpeg init");
        let mut converter = VideoResampler::snapshot_converter(PixelFormat::Rgba, pool());
        // YUV420P would be wrapped by the streaming path; the snapshot path
        // must still convert it to the packed target.
        let frame = ffmpeg::frame::Video::new(Pixel::YUV420P, 32, 32);
        let cpu = converter.convert(&frame).expect("convert");
        assert_eq!(cpu.format, PixelFormat::Rgba);
        assert_eq!(cpu.planes.len(), 1);
        assert_eq!(converter.rebuilds(), 1);
    }

    #[test]
    fn test_shutdown_then_reuse_rebuilds() {
        ffmpeg::init().expect("ffmpeg init");
        let mut resampler = VideoResampler::new(PixelFormat::Bgra, pool());
        let frame = ffmpeg::frame::Video::new(Pixel::YUV444P, 32, 32);
        resampler.transfer(&frame, Timebase::new(1, 1000)).expect("first");
        resampler.shutdown();
        resampler.transfer(&frame, Timebase::new(1, 1000)).expect("second");
        assert_eq!(resampler.rebuilds(), 2);
    }
}
