//! Plane texture sets with geometry-keyed reuse.
//!
//! One GPU texture per frame plane. Textures are recreated only when the
//! incoming frame's `(width, height, format)` changes; steady-state playback
//! re-uploads into the cached set.

use std::borrow::Cow;

use prism_video_core::{CpuFrame, PixelFormat};

/// wgpu requires bytes_per_row to be aligned to this value.
const COPY_BYTES_PER_ROW_ALIGNMENT: u32 = 256;

/// Aligns a value up to the nearest multiple of alignment.
fn align_up(value: u32, alignment: u32) -> u32 {
    (value + alignment - 1) & !(alignment - 1)
}

/// Pads row data to meet wgpu's bytes_per_row alignment requirement.
/// Returns (aligned_bytes_per_row, data); borrows when already aligned.
fn pad_plane_data(data: &[u8], stride: usize, height: u32) -> (u32, Cow<'_, [u8]>) {
    let stride_u32 = stride as u32;
    let aligned_stride = align_up(stride_u32, COPY_BYTES_PER_ROW_ALIGNMENT);

    if aligned_stride == stride_u32 {
        return (stride_u32, Cow::Borrowed(data));
    }

    let mut padded = Vec::with_capacity((aligned_stride * height) as usize);
    for row in 0..height as usize {
        let row_start = row * stride;
        let row_end = row_start + stride;
        if row_end <= data.len() {
            padded.extend_from_slice(&data[row_start..row_end]);
        } else {
            // Truncated plane data: zero-fill the missing tail.
            let available = data.len().saturating_sub(row_start);
            if available > 0 {
                padded.extend_from_slice(&data[row_start..row_start + available]);
            }
            padded.resize(padded.len() + stride - available, 0);
        }
        padded.resize(padded.len() + (aligned_stride - stride_u32) as usize, 0);
    }

    (aligned_stride, Cow::Owned(padded))
}

/// GPU texture format of plane `index` for a frame layout.
fn plane_texture_format(format: PixelFormat, index: usize) -> wgpu::TextureFormat {
    match format {
        PixelFormat::Yuv420p => wgpu::TextureFormat::R8Unorm,
        PixelFormat::Nv12 => {
            if index == 0 {
                wgpu::TextureFormat::R8Unorm
            } else {
                // Interleaved UV
                wgpu::TextureFormat::Rg8Unorm
            }
        }
        // RGB24 is expanded to RGBA during upload.
        PixelFormat::Rgb24 | PixelFormat::Rgba => wgpu::TextureFormat::Rgba8Unorm,
        PixelFormat::Bgra => wgpu::TextureFormat::Bgra8Unorm,
    }
}

/// The cached per-plane textures for one frame geometry.
pub struct PlaneTextures {
    textures: Vec<wgpu::Texture>,
    views: Vec<wgpu::TextureView>,
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl PlaneTextures {
    /// Creates textures sized for `frame`'s planes.
    pub fn new(device: &wgpu::Device, frame: &CpuFrame) -> Self {
        let format = frame.format;
        let mut textures = Vec::with_capacity(format.num_planes());
        let mut views = Vec::with_capacity(format.num_planes());

        for index in 0..format.num_planes() {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("video_plane_texture"),
                size: wgpu::Extent3d {
                    width: format.plane_width(index, frame.width).max(1),
                    height: format.plane_height(index, frame.height).max(1),
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: plane_texture_format(format, index),
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            views.push(texture.create_view(&wgpu::TextureViewDescriptor::default()));
            textures.push(texture);
        }

        Self {
            textures,
            views,
            width: frame.width,
            height: frame.height,
            format,
        }
    }

    /// True when the cached set can carry `frame` without recreation.
    pub fn matches(&self, frame: &CpuFrame) -> bool {
        self.width == frame.width && self.height == frame.height && self.format == frame.format
    }

    pub fn view(&self, index: usize) -> Option<&wgpu::TextureView> {
        self.views.get(index)
    }

    /// Uploads `frame`'s planes into the cached textures.
    pub fn upload(&self, queue: &wgpu::Queue, frame: &CpuFrame) {
        if frame.format == PixelFormat::Rgb24 {
            self.upload_rgb24(queue, frame);
            return;
        }
        for index in 0..self.format.num_planes().min(frame.planes.len()) {
            let plane = &frame.planes[index];
            let plane_height = self.format.plane_height(index, frame.height);
            let (bytes_per_row, data) = pad_plane_data(&plane.data, plane.stride, plane_height);
            self.write_plane(queue, index, bytes_per_row, &data, plane_height);
        }
    }

    /// RGB24 has no matching wgpu texel format; expand to RGBA row by row.
    fn upload_rgb24(&self, queue: &wgpu::Queue, frame: &CpuFrame) {
        let Some(plane) = frame.plane(0) else {
            return;
        };
        let rgba_stride = frame.width * 4;
        let aligned_stride = align_up(rgba_stride, COPY_BYTES_PER_ROW_ALIGNMENT);
        let padding = (aligned_stride - rgba_stride) as usize;

        let mut rgba = Vec::with_capacity((aligned_stride * frame.height) as usize);
        for y in 0..frame.height as usize {
            for x in 0..frame.width as usize {
                let offset = y * plane.stride + x * 3;
                if offset + 2 < plane.data.len() {
                    rgba.push(plane.data[offset]);
                    rgba.push(plane.data[offset + 1]);
                    rgba.push(plane.data[offset + 2]);
                    rgba.push(255);
                } else {
                    rgba.extend_from_slice(&[0, 0, 0, 255]);
                }
            }
            rgba.resize(rgba.len() + padding, 0);
        }

        self.write_plane(queue, 0, aligned_stride, &rgba, frame.height);
    }

    fn write_plane(
        &self,
        queue: &wgpu::Queue,
        index: usize,
        bytes_per_row: u32,
        data: &[u8],
        rows: u32,
    ) {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.textures[index],
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(rows),
            },
            wgpu::Extent3d {
                width: self.format.plane_width(index, self.width),
                height: self.format.plane_height(index, self.height),
                depth_or_array_layers: 1,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 256), 0);
        assert_eq!(align_up(1, 256), 256);
        assert_eq!(align_up(256, 256), 256);
        assert_eq!(align_up(257, 256), 512);
    }

    #[test]
    fn test_pad_plane_data_borrows_when_aligned() {
        let data = vec![7u8; 256 * 4];
        let (bytes_per_row, padded) = pad_plane_data(&data, 256, 4);
        assert_eq!(bytes_per_row, 256);
        assert!(matches!(padded, Cow::Borrowed(_)));
    }

    #[test]
    fn test_pad_plane_data_pads_rows() {
        let data = vec![7u8; 100 * 2];
        let (bytes_per_row, padded) = pad_plane_data(&data, 100, 2);
        assert_eq!(bytes_per_row, 256);
        assert_eq!(padded.len(), 512);
        assert_eq!(padded[0], 7);
        assert_eq!(padded[100], 0); // first padding byte
        assert_eq!(padded[256], 7); // second row starts aligned
    }

    #[test]
    fn test_pad_plane_data_zero_fills_truncated_input() {
        // Claims 4 rows of 100 bytes but carries only 350.
        let data = vec![7u8; 350];
        let (bytes_per_row, padded) = pad_plane_data(&data, 100, 4);
        assert_eq!(bytes_per_row, 256);
        assert_eq!(padded.len(), 1024);
        assert_eq!(padded[3 * 256 + 49], 7); // last real byte
        assert_eq!(padded[3 * 256 + 50], 0); // zero-filled tail
    }

    #[test]
    fn test_plane_texture_formats() {
        use wgpu::TextureFormat;
        assert_eq!(
            plane_texture_format(PixelFormat::Yuv420p, 2),
            TextureFormat::R8Unorm
        );
        assert_eq!(
            plane_texture_format(PixelFormat::Nv12, 1),
            TextureFormat::Rg8Unorm
        );
        assert_eq!(
            plane_texture_format(PixelFormat::Bgra, 0),
            TextureFormat::Bgra8Unorm
        );
        assert_eq!(
            plane_texture_format(PixelFormat::Rgb24, 0),
            TextureFormat::Rgba8Unorm
        );
    }
}
