//! Bloom post-processing
//!
//! The entity layer is rendered to an offscreen texture, bright pixels are
//! extracted at half resolution, blurred horizontally then vertically, and the
//! result is added back in the composite pass.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::settings::BloomSettings;

/// Format of the offscreen scene and bloom textures
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct BloomParams {
    pub texel: [f32; 2],
    pub direction: [f32; 2],
    pub threshold: f32,
    pub strength: f32,
    pub radius: f32,
    pub _pad: f32,
}

impl BloomParams {
    pub fn new(source_size: (u32, u32), direction: [f32; 2], settings: &BloomSettings) -> Self {
        Self {
            texel: [
                1.0 / source_size.0.max(1) as f32,
                1.0 / source_size.1.max(1) as f32,
            ],
            direction,
            threshold: settings.threshold,
            strength: settings.strength,
            radius: settings.radius,
            _pad: 0.0,
        }
    }
}

/// Size of the bloom textures for a given surface size
pub fn bloom_size(width: u32, height: u32) -> (u32, u32) {
    ((width / 2).max(1), (height / 2).max(1))
}

/// An offscreen color target
pub struct RenderTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub size: (u32, u32),
}

impl RenderTarget {
    pub fn new(device: &wgpu::Device, label: &str, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OFFSCREEN_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            size: (width.max(1), height.max(1)),
        }
    }
}

fn uniform_layout_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

pub(crate) fn texture_layout_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
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

pub(crate) fn sampler_layout_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

/// Fullscreen-triangle pipeline (no vertex buffers)
pub(crate) fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    shader: &wgpu::ShaderModule,
    fragment_entry: &str,
    layouts: &[&wgpu::BindGroupLayout],
    format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
) -> wgpu::RenderPipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: layouts,
        immediate_size: 0,
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[], // No vertex buffers - fullscreen triangle
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

/// Draw one fullscreen triangle into `target`
pub(crate) fn fullscreen_pass(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    target: &wgpu::TextureView,
    pipeline: &wgpu::RenderPipeline,
    bind_groups: &[&wgpu::BindGroup],
) {
    let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
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
        multiview_mask: None,
    });

    render_pass.set_pipeline(pipeline);
    for (i, group) in bind_groups.iter().enumerate() {
        render_pass.set_bind_group(i as u32, *group, &[]);
    }
    render_pass.draw(0..3, 0..1); // Fullscreen triangle
}

/// Bright-pass and blur pipelines plus their half-resolution targets
pub struct BloomPass {
    bright_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,

    bright_params: wgpu::Buffer,
    blur_h_params: wgpu::Buffer,
    blur_v_params: wgpu::Buffer,
    bright_group: wgpu::BindGroup,
    blur_h_group: wgpu::BindGroup,
    blur_v_group: wgpu::BindGroup,

    /// Receives the bright pass and the vertical blur (final bloom)
    pub ping: RenderTarget,
    /// Receives the horizontal blur
    pong: RenderTarget,
    /// Input bind groups: scene, ping, pong
    scene_input: wgpu::BindGroup,
    ping_input: wgpu::BindGroup,
    pong_input: wgpu::BindGroup,
}

impl BloomPass {
    pub fn new(
        device: &wgpu::Device,
        scene: &RenderTarget,
        settings: &BloomSettings,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("bloom_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("bloom.wgsl").into()),
        });

        let params_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bloom_params_layout"),
            entries: &[uniform_layout_entry(0)],
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bloom_texture_layout"),
            entries: &[texture_layout_entry(0), sampler_layout_entry(1)],
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("bloom_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let layouts = [&params_layout, &texture_layout];
        let bright_pipeline = fullscreen_pipeline(
            device,
            "bloom_bright",
            &shader,
            "fs_bright",
            &layouts,
            OFFSCREEN_FORMAT,
            None,
        );
        let blur_pipeline = fullscreen_pipeline(
            device,
            "bloom_blur",
            &shader,
            "fs_blur",
            &layouts,
            OFFSCREEN_FORMAT,
            None,
        );

        let half = bloom_size(scene.size.0, scene.size.1);
        let params_buffer = |label: &str, params: BloomParams| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
        };
        let bright_params = params_buffer("bloom_bright_params", BloomParams::new(scene.size, [0.0, 0.0], settings));
        let blur_h_params = params_buffer("bloom_blur_h_params", BloomParams::new(half, [1.0, 0.0], settings));
        let blur_v_params = params_buffer("bloom_blur_v_params", BloomParams::new(half, [0.0, 1.0], settings));

        let params_group = |label: &str, buffer: &wgpu::Buffer| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &params_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            })
        };
        let bright_group = params_group("bloom_bright_group", &bright_params);
        let blur_h_group = params_group("bloom_blur_h_group", &blur_h_params);
        let blur_v_group = params_group("bloom_blur_v_group", &blur_v_params);

        let ping = RenderTarget::new(device, "bloom_ping", half.0, half.1);
        let pong = RenderTarget::new(device, "bloom_pong", half.0, half.1);
        let scene_input = Self::input_group(device, &texture_layout, &sampler, &scene.view);
        let ping_input = Self::input_group(device, &texture_layout, &sampler, &ping.view);
        let pong_input = Self::input_group(device, &texture_layout, &sampler, &pong.view);

        Self {
            bright_pipeline,
            blur_pipeline,
            texture_layout,
            sampler,
            bright_params,
            blur_h_params,
            blur_v_params,
            bright_group,
            blur_h_group,
            blur_v_group,
            ping,
            pong,
            scene_input,
            ping_input,
            pong_input,
        }
    }

    fn input_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        view: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bloom_input"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    /// Recreate targets after the scene texture changed size
    pub fn resize(&mut self, device: &wgpu::Device, scene: &RenderTarget) {
        let half = bloom_size(scene.size.0, scene.size.1);
        self.ping = RenderTarget::new(device, "bloom_ping", half.0, half.1);
        self.pong = RenderTarget::new(device, "bloom_pong", half.0, half.1);
        self.scene_input = Self::input_group(device, &self.texture_layout, &self.sampler, &scene.view);
        self.ping_input = Self::input_group(device, &self.texture_layout, &self.sampler, &self.ping.view);
        self.pong_input = Self::input_group(device, &self.texture_layout, &self.sampler, &self.pong.view);
    }

    /// Upload thresholds and texel sizes
    pub fn update_params(&self, queue: &wgpu::Queue, scene_size: (u32, u32), settings: &BloomSettings) {
        let half = bloom_size(scene_size.0, scene_size.1);
        queue.write_buffer(
            &self.bright_params,
            0,
            bytemuck::bytes_of(&BloomParams::new(scene_size, [0.0, 0.0], settings)),
        );
        queue.write_buffer(
            &self.blur_h_params,
            0,
            bytemuck::bytes_of(&BloomParams::new(half, [1.0, 0.0], settings)),
        );
        queue.write_buffer(
            &self.blur_v_params,
            0,
            bytemuck::bytes_of(&BloomParams::new(half, [0.0, 1.0], settings)),
        );
    }

    /// Scene -> bright (ping) -> blur H (pong) -> blur V (ping)
    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder) {
        fullscreen_pass(
            encoder,
            "bloom_bright_pass",
            &self.ping.view,
            &self.bright_pipeline,
            &[&self.bright_group, &self.scene_input],
        );
        fullscreen_pass(
            encoder,
            "bloom_blur_h_pass",
            &self.pong.view,
            &self.blur_pipeline,
            &[&self.blur_h_group, &self.ping_input],
        );
        fullscreen_pass(
            encoder,
            "bloom_blur_v_pass",
            &self.ping.view,
            &self.blur_pipeline,
            &[&self.blur_v_group, &self.pong_input],
        );
    }

    /// Clear the bloom result (used when bloom is disabled)
    pub fn clear(&self, encoder: &mut wgpu::CommandEncoder) {
        let _ = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("bloom_clear_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.ping.view,
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
            multiview_mask: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bloom_size_halves_and_never_zero() {
        assert_eq!(bloom_size(1280, 720), (640, 360));
        assert_eq!(bloom_size(1, 1), (1, 1));
        assert_eq!(bloom_size(0, 3), (1, 1));
    }

    #[test]
    fn test_params_layout() {
        assert_eq!(std::mem::size_of::<BloomParams>(), 32);
        let p = BloomParams::new((640, 360), [1.0, 0.0], &BloomSettings::default());
        assert_eq!(p.texel[0], 1.0 / 640.0);
        assert_eq!(p.threshold, 0.1);
        assert_eq!(p.radius, 0.9);
    }
}
