//! The color-conversion renderer.
//!
//! Owns the three render pipelines, the sampler, the pre-uploaded color
//! uniform buffers, and the cached plane textures. Drive it from the thread
//! that owns the GPU queue. Draw failures (zero-sized frames, missing
//! planes) skip the frame rather than surfacing an error; playback never
//! stops for a single bad frame.

use std::borrow::Cow;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicBool, Ordering};

use prism_video_core::{ColorRange, ColorSpace, CpuFrame, PixelFormat};
use wgpu::util::DeviceExt;

use super::color::{self, ColorMatrix, ColorOffset};
use super::texture::PlaneTextures;

/// The GPU pipeline to bind for a frame, keyed purely by plane count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    /// 3 planes: planar YUV
    Planar,
    /// 2 planes: bi-planar NV12
    BiPlanar,
    /// 1 plane (and any unknown count): packed RGBA/BGRA
    Packed,
}

/// Pure pipeline selection. Unknown plane counts fall back to packed.
pub fn pipeline_for_plane_count(planes: usize) -> PipelineKind {
    match planes {
        3 => PipelineKind::Planar,
        2 => PipelineKind::BiPlanar,
        _ => PipelineKind::Packed,
    }
}

/// Identity of the bind group currently cached by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BindKey {
    width: u32,
    height: u32,
    format: PixelFormat,
    color_space: ColorSpace,
    color_range: ColorRange,
}

impl BindKey {
    fn of(frame: &CpuFrame) -> Self {
        Self {
            width: frame.width,
            height: frame.height,
            format: frame.format,
            color_space: frame.color_space,
            color_range: frame.color_range,
        }
    }
}

/// GPU color-conversion renderer.
pub struct VideoRenderer {
    pipeline_planar: wgpu::RenderPipeline,
    pipeline_biplanar: wgpu::RenderPipeline,
    pipeline_packed: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    /// Pre-uploaded conversion constants, indexed by (space, range).
    matrix_buffers: [wgpu::Buffer; 4],
    offset_buffers: [wgpu::Buffer; 2],
    /// 1x1 stand-in for plane slots a layout does not use.
    dummy_texture_view: wgpu::TextureView,
    textures: Option<PlaneTextures>,
    bind_group: Option<(BindKey, wgpu::BindGroup)>,
    shutdown: AtomicBool,
}

impl VideoRenderer {
    /// Builds pipelines and static resources for a target surface format.
    /// Call once per surface; expensive.
    pub fn new(device: &wgpu::Device, target_format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("video_color_shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!("shader.wgsl"))),
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("video_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("video_bind_group_layout"),
            entries: &[
                // Y / UV / V plane textures
                texture_entry(0),
                texture_entry(1),
                texture_entry(2),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                uniform_entry(4, std::mem::size_of::<ColorMatrix>() as u64),
                uniform_entry(5, std::mem::size_of::<ColorOffset>() as u64),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("video_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let create_pipeline = |entry_point: &str, label: &str| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(entry_point),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: target_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let pipeline_planar = create_pipeline("fs_planar", "video_pipeline_planar");
        let pipeline_biplanar = create_pipeline("fs_biplanar", "video_pipeline_biplanar");
        let pipeline_packed = create_pipeline("fs_packed", "video_pipeline_packed");

        let matrix_buffer = |matrix: &ColorMatrix, label| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::bytes_of(matrix),
                usage: wgpu::BufferUsages::UNIFORM,
            })
        };
        let offset_buffer = |offset: &ColorOffset, label| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::bytes_of(offset),
                usage: wgpu::BufferUsages::UNIFORM,
            })
        };

        let matrix_buffers = [
            matrix_buffer(&color::MATRIX_601_VIDEO_RANGE, "color_matrix_601_video"),
            matrix_buffer(&color::MATRIX_601_FULL_RANGE, "color_matrix_601_full"),
            matrix_buffer(&color::MATRIX_709_VIDEO_RANGE, "color_matrix_709_video"),
            matrix_buffer(&color::MATRIX_709_FULL_RANGE, "color_matrix_709_full"),
        ];
        let offset_buffers = [
            offset_buffer(&color::OFFSET_VIDEO_RANGE, "color_offset_video"),
            offset_buffer(&color::OFFSET_FULL_RANGE, "color_offset_full"),
        ];

        let dummy_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("video_dummy_texture"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let dummy_texture_view = dummy_texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            pipeline_planar,
            pipeline_biplanar,
            pipeline_packed,
            bind_group_layout,
            sampler,
            matrix_buffers,
            offset_buffers,
            dummy_texture_view,
            textures: None,
            bind_group: None,
            shutdown: AtomicBool::new(false),
        }
    }

    /// Stops issuing draws. An in-flight submission completes; every later
    /// `draw`/`clear` call is a no-op.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Draws `frame` into `target` and submits.
    ///
    /// Skips silently (logged at debug) after shutdown or for frames the
    /// pipelines cannot carry.
    pub fn draw(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        frame: &CpuFrame,
        target: &wgpu::TextureView,
    ) {
        if self.shutdown.load(Ordering::Acquire) {
            tracing::debug!("draw skipped: shutdown requested");
            return;
        }
        if frame.planes.is_empty() || frame.width == 0 || frame.height == 0 {
            tracing::debug!(
                width = frame.width,
                height = frame.height,
                planes = frame.planes.len(),
                "draw skipped: degenerate frame"
            );
            return;
        }

        self.prepare(device, queue, frame);
        let Some((_, bind_group)) = self.bind_group.as_ref() else {
            return;
        };

        let pipeline = match pipeline_for_plane_count(frame.planes.len()) {
            PipelineKind::Planar => &self.pipeline_planar,
            PipelineKind::BiPlanar => &self.pipeline_biplanar,
            PipelineKind::Packed => &self.pipeline_packed,
        };

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("video_draw_encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("video_draw_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
        queue.submit(std::iter::once(encoder.finish()));
    }

    /// Draws into an acquired surface texture and presents it.
    pub fn draw_to_surface(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        frame: &CpuFrame,
        surface_texture: wgpu::SurfaceTexture,
    ) {
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.draw(device, queue, frame, &view);
        surface_texture.present();
    }

    /// Clears `target` without drawing any geometry; the blank-frame path
    /// used before the first frame arrives.
    pub fn clear(&self, device: &wgpu::Device, queue: &wgpu::Queue, target: &wgpu::TextureView) {
        if self.shutdown.load(Ordering::Acquire) {
            return;
        }
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("video_clear_encoder"),
        });
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("video_clear_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        queue.submit(std::iter::once(encoder.finish()));
    }

    /// Clears an acquired surface texture and presents it.
    pub fn clear_surface(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_texture: wgpu::SurfaceTexture,
    ) {
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.clear(device, queue, &view);
        surface_texture.present();
    }

    /// Uploads the frame and refreshes the cached textures/bind group when
    /// the frame's identity changed.
    fn prepare(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, frame: &CpuFrame) {
        let recreate_textures = self
            .textures
            .as_ref()
            .is_none_or(|textures| !textures.matches(frame));
        if recreate_textures {
            tracing::debug!(
                width = frame.width,
                height = frame.height,
                format = ?frame.format,
                "recreating plane textures"
            );
            self.textures = Some(PlaneTextures::new(device, frame));
            self.bind_group = None;
        }
        let Some(textures) = self.textures.as_ref() else {
            return;
        };
        textures.upload(queue, frame);

        let key = BindKey::of(frame);
        let stale = self
            .bind_group
            .as_ref()
            .is_none_or(|(cached, _)| *cached != key);
        if !stale {
            return;
        }

        let matrix_index = match (frame.color_space, frame.color_range) {
            (ColorSpace::Bt601, ColorRange::Video) => 0,
            (ColorSpace::Bt601, ColorRange::Full) => 1,
            (ColorSpace::Bt709, ColorRange::Video) => 2,
            (ColorSpace::Bt709, ColorRange::Full) => 3,
        };
        let offset_index = match frame.color_range {
            ColorRange::Video => 0,
            ColorRange::Full => 1,
        };

        let plane_view = |index: usize| {
            textures
                .view(index)
                .unwrap_or(&self.dummy_texture_view)
        };

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("video_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(plane_view(0)),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(plane_view(1)),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(plane_view(2)),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: self.matrix_buffers[matrix_index].as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: self.offset_buffers[offset_index].as_entire_binding(),
                },
            ],
        });
        self.bind_group = Some((key, bind_group));
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn uniform_entry(binding: u32, size: u64) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(size),
        },
        count: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_selection_is_pure_in_plane_count() {
        assert_eq!(pipeline_for_plane_count(3), PipelineKind::Planar);
        assert_eq!(pipeline_for_plane_count(2), PipelineKind::BiPlanar);
        assert_eq!(pipeline_for_plane_count(1), PipelineKind::Packed);
        // Unknown counts fall back to packed.
        assert_eq!(pipeline_for_plane_count(0), PipelineKind::Packed);
        assert_eq!(pipeline_for_plane_count(4), PipelineKind::Packed);
        assert_eq!(pipeline_for_plane_count(17), PipelineKind::Packed);
    }

    #[test]
    fn test_pipeline_matches_format_plane_counts() {
        assert_eq!(
            pipeline_for_plane_count(PixelFormat::Yuv420p.num_planes()),
            PipelineKind::Planar
        );
        assert_eq!(
            pipeline_for_plane_count(PixelFormat::Nv12.num_planes()),
            PipelineKind::BiPlanar
        );
        assert_eq!(
            pipeline_for_plane_count(PixelFormat::Bgra.num_planes()),
            PipelineKind::Packed
        );
    }
}
