//! SDF-based WebGPU render pipeline
//!
//! Pass order each frame:
//! 1. `fs_entities` draws gameplay objects into the offscreen scene texture
//! 2. [`BloomPass`] extracts and blurs the bright parts of that texture
//! 3. `fs_composite` draws background, scene, bloom and overlay to the surface

use super::bloom::{
    BloomPass, OFFSCREEN_FORMAT, RenderTarget, fullscreen_pass, fullscreen_pipeline,
    sampler_layout_entry, texture_layout_entry,
};
use super::frame::{
    EntityData, FlashData, FrameData, Globals, LaserData, MAX_ENTITIES, MAX_FLASHES, MAX_LASERS,
    MAX_PARTICLES, ParticleData,
};
use crate::error::RenderError;
use crate::settings::Settings;
use crate::sim::GameState;

// ============================================================================
// SDF RENDER STATE
// ============================================================================

pub struct SdfRenderState {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,

    entities_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,

    // Uniform buffers
    globals_buffer: wgpu::Buffer,
    entities_buffer: wgpu::Buffer,
    particles_buffer: wgpu::Buffer,
    lasers_buffer: wgpu::Buffer,
    flashes_buffer: wgpu::Buffer,

    frame_group: wgpu::BindGroup,
    composite_layout: wgpu::BindGroupLayout,
    composite_group: wgpu::BindGroup,
    sampler: wgpu::Sampler,

    scene: RenderTarget,
    bloom: BloomPass,

    pub size: (u32, u32),
    start_time: f64,
}

fn uniform_buffer(device: &wgpu::Device, label: &str, size: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: size as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

impl SdfRenderState {
    pub async fn new(
        surface: wgpu::Surface<'static>,
        adapter: &wgpu::Adapter,
        width: u32,
        height: u32,
        settings: &Settings,
    ) -> Result<Self, RenderError> {
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("jingle-rocket-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults(),
                memory_hints: Default::default(),
                trace: Default::default(),
                experimental_features: Default::default(),
            })
            .await?;

        let surface_caps = surface.get_capabilities(adapter);
        log::info!("Surface formats: {:?}", surface_caps.formats);
        log::info!("Surface alpha modes: {:?}", surface_caps.alpha_modes);

        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(RenderError::NoSurfaceFormat)?;
        log::info!("Using surface format: {:?}", surface_format);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        log::info!("Creating shader module...");
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sdf_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("sdf_shader.wgsl").into()),
        });

        let globals_buffer = uniform_buffer(&device, "globals", std::mem::size_of::<Globals>());
        let entities_buffer = uniform_buffer(
            &device,
            "entities",
            std::mem::size_of::<EntityData>() * MAX_ENTITIES,
        );
        let particles_buffer = uniform_buffer(
            &device,
            "particles",
            std::mem::size_of::<ParticleData>() * MAX_PARTICLES,
        );
        let lasers_buffer = uniform_buffer(
            &device,
            "lasers",
            std::mem::size_of::<LaserData>() * MAX_LASERS,
        );
        let flashes_buffer = uniform_buffer(
            &device,
            "flashes",
            std::mem::size_of::<FlashData>() * MAX_FLASHES,
        );

        // Group 0: per-frame uniforms
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame_bind_group_layout"),
            entries: &(0..5)
                .map(|binding| wgpu::BindGroupLayoutEntry {
                    binding,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                })
                .collect::<Vec<_>>(),
        });

        let frame_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame_bind_group"),
            layout: &frame_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: entities_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: particles_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: lasers_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: flashes_buffer.as_entire_binding(),
                },
            ],
        });

        // Group 1: scene + bloom textures for the composite pass
        let composite_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("composite_bind_group_layout"),
            entries: &[
                texture_layout_entry(0),
                texture_layout_entry(1),
                sampler_layout_entry(2),
            ],
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("composite_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        // fs_entities never touches group 1; the scene texture it writes
        // cannot be bound for sampling in the same pass
        let entities_pipeline = fullscreen_pipeline(
            &device,
            "entities_pipeline",
            &shader,
            "fs_entities",
            &[&frame_layout],
            OFFSCREEN_FORMAT,
            None,
        );
        let composite_pipeline = fullscreen_pipeline(
            &device,
            "composite_pipeline",
            &shader,
            "fs_composite",
            &[&frame_layout, &composite_layout],
            config.format,
            None,
        );

        let scene = RenderTarget::new(&device, "scene", config.width, config.height);
        let bloom = BloomPass::new(&device, &scene, &settings.bloom);
        let composite_group =
            Self::composite_group(&device, &composite_layout, &sampler, &scene, &bloom);

        log::info!("Render pipelines created ({}x{})", config.width, config.height);

        Ok(Self {
            surface,
            device,
            queue,
            size: (config.width, config.height),
            config,
            entities_pipeline,
            composite_pipeline,
            globals_buffer,
            entities_buffer,
            particles_buffer,
            lasers_buffer,
            flashes_buffer,
            frame_group,
            composite_layout,
            composite_group,
            sampler,
            scene,
            bloom,
            start_time: 0.0,
        })
    }

    fn composite_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        scene: &RenderTarget,
        bloom: &BloomPass,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("composite_bind_group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&scene.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&bloom.ping.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) {
        if new_width > 0 && new_height > 0 {
            self.size = (new_width, new_height);
            self.config.width = new_width;
            self.config.height = new_height;
            self.surface.configure(&self.device, &self.config);

            self.scene = RenderTarget::new(&self.device, "scene", new_width, new_height);
            self.bloom.resize(&self.device, &self.scene);
            self.composite_group = Self::composite_group(
                &self.device,
                &self.composite_layout,
                &self.sampler,
                &self.scene,
                &self.bloom,
            );
        }
    }

    pub fn set_start_time(&mut self, time: f64) {
        self.start_time = time;
    }

    /// Update GPU buffers from game state and render
    pub fn render(
        &mut self,
        state: &GameState,
        settings: &Settings,
        time: f64,
    ) -> Result<(), wgpu::SurfaceError> {
        // time is ms since page load from requestAnimationFrame
        let elapsed = ((time - self.start_time).max(0.0) / 1000.0) as f32;
        // Shapes are laid out in world units; the backing store may be larger (DPR)
        let extent = (
            state.viewport.width.round() as u32,
            state.viewport.height.round() as u32,
        );
        let frame = FrameData::from_state(state, settings, extent, elapsed);

        self.queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&frame.globals));
        self.queue.write_buffer(
            &self.entities_buffer,
            0,
            bytemuck::cast_slice(&frame.entities),
        );
        self.queue.write_buffer(
            &self.particles_buffer,
            0,
            bytemuck::cast_slice(&frame.particles),
        );
        self.queue
            .write_buffer(&self.lasers_buffer, 0, bytemuck::cast_slice(&frame.lasers));
        self.queue.write_buffer(
            &self.flashes_buffer,
            0,
            bytemuck::cast_slice(&frame.flashes),
        );

        let bloom_on = settings.quality.bloom_enabled();
        if bloom_on {
            self.bloom
                .update_params(&self.queue, self.scene.size, &settings.bloom);
        }

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });

        fullscreen_pass(
            &mut encoder,
            "entities_pass",
            &self.scene.view,
            &self.entities_pipeline,
            &[&self.frame_group],
        );

        if bloom_on {
            self.bloom.encode(&mut encoder);
        } else {
            self.bloom.clear(&mut encoder);
        }

        fullscreen_pass(
            &mut encoder,
            "composite_pass",
            &view,
            &self.composite_pipeline,
            &[&self.frame_group, &self.composite_group],
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}
