//! Rendering system with wgpu pipeline and egui overlay pass.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::panel::PanelFrame;
use crate::surface::{PlaneMesh, SurfaceId, SurfaceParams, Vertex};

/// Uniform buffer contents for one water surface
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SurfaceUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub deep_color: [f32; 4],
    pub surface_color: [f32; 4],
    pub frequency: [f32; 2],
    pub elevation: f32,
    pub speed: f32,
    pub time: f32,
    pub color_offset: f32,
    pub color_multiplier: f32,
    pub _padding: f32,
}

impl SurfaceUniforms {
    pub fn new(view_proj: Mat4, id: SurfaceId, params: &SurfaceParams, time: f32) -> Self {
        let [dr, dg, db] = params.deep_color;
        let [sr, sg, sb] = params.surface_color;
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            model: id.model_matrix().to_cols_array_2d(),
            deep_color: [dr, dg, db, 1.0],
            surface_color: [sr, sg, sb, 1.0],
            frequency: params.frequency,
            elevation: params.elevation,
            speed: params.speed,
            time,
            color_offset: params.color_offset,
            color_multiplier: params.color_multiplier,
            _padding: 0.0,
        }
    }
}

/// Clamp a physical surface size to the configured device pixel ratio cap.
///
/// Windows on displays past the cap render at the capped density and are
/// scaled up by the compositor, matching a 2x pixel-ratio ceiling.
pub fn capped_surface_size(
    physical: (u32, u32),
    scale_factor: f64,
    max_pixel_ratio: f64,
) -> (u32, u32) {
    if scale_factor <= max_pixel_ratio {
        return physical;
    }
    let scale = max_pixel_ratio / scale_factor;
    (
        ((physical.0 as f64 * scale) as u32).max(1),
        ((physical.1 as f64 * scale) as u32).max(1),
    )
}

/// Rendering system managing wgpu device, pipeline, and per-surface buffers
pub struct RenderSystem {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    render_pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    uniform_buffers: [wgpu::Buffer; 2],
    bind_groups: [wgpu::BindGroup; 2],
    index_count: u32,
    egui_renderer: egui_wgpu::Renderer,
}

impl RenderSystem {
    /// Create new rendering system
    pub async fn new(
        window: std::sync::Arc<winit::window::Window>,
        mesh: &PlaneMesh,
    ) -> Result<Self, String> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Surface requires the window to live for 'static, hence the Arc
        let surface = instance
            .create_surface(window)
            .map_err(|e| format!("Failed to create surface: {}", e))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or("Failed to find suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Main Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| format!("Failed to request device: {}", e))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Water Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("water.wgsl").into()),
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Surface Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        // One uniform buffer and bind group per surface
        let make_uniform_buffer = |label: &str| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(&[SurfaceUniforms::new(
                    Mat4::IDENTITY,
                    SurfaceId::Left,
                    &SurfaceParams::left(),
                    0.0,
                )]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
        };
        let uniform_buffers = [
            make_uniform_buffer("Left Surface Uniforms"),
            make_uniform_buffer("Right Surface Uniforms"),
        ];

        let bind_groups = [0, 1].map(|i| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Surface Bind Group"),
                layout: &bind_group_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffers[i].as_entire_binding(),
                }],
            })
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Water Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[
                        wgpu::VertexAttribute {
                            offset: 0,
                            shader_location: 0,
                            format: wgpu::VertexFormat::Float32x3,
                        },
                        wgpu::VertexAttribute {
                            offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                            shader_location: 1,
                            format: wgpu::VertexFormat::Float32x2,
                        },
                    ],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            render_pipeline,
            vertex_buffer,
            index_buffer,
            uniform_buffers,
            bind_groups,
            index_count: mesh.indices.len() as u32,
            egui_renderer,
        })
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Reconfigure the surface for a new output size. Idempotent.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if self.config.width == width && self.config.height == height {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
    }

    /// Update one surface's uniform buffer
    pub fn update_surface(&self, id: SurfaceId, uniforms: &SurfaceUniforms) {
        let index = match id {
            SurfaceId::Left => 0,
            SurfaceId::Right => 1,
        };
        self.queue.write_buffer(
            &self.uniform_buffers[index],
            0,
            bytemuck::cast_slice(&[*uniforms]),
        );
    }

    /// Render a frame: both surfaces, then the panel overlay
    pub fn render(&mut self, panel_frame: Option<PanelFrame>) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: panel_frame.as_ref().map_or(1.0, |f| f.pixels_per_point),
        };

        let mut panel_cmd_buffers = Vec::new();
        if let Some(frame) = &panel_frame {
            for (id, image_delta) in &frame.textures_delta.set {
                self.egui_renderer
                    .update_texture(&self.device, &self.queue, *id, image_delta);
            }
            panel_cmd_buffers = self.egui_renderer.update_buffers(
                &self.device,
                &self.queue,
                &mut encoder,
                &frame.primitives,
                &screen_descriptor,
            );
        }

        {
            let mut render_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::WHITE),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                })
                .forget_lifetime();

            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

            for bind_group in &self.bind_groups {
                render_pass.set_bind_group(0, bind_group, &[]);
                render_pass.draw_indexed(0..self.index_count, 0, 0..1);
            }

            if let Some(frame) = &panel_frame {
                self.egui_renderer
                    .render(&mut render_pass, &frame.primitives, &screen_descriptor);
            }
        }

        self.queue.submit(
            panel_cmd_buffers
                .into_iter()
                .chain(std::iter::once(encoder.finish())),
        );
        output.present();

        if let Some(frame) = panel_frame {
            for id in &frame.textures_delta.free {
                self.egui_renderer.free_texture(id);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_uniforms_layout() {
        // Uniform buffer structs must be 16-byte aligned for WGSL
        assert_eq!(std::mem::size_of::<SurfaceUniforms>(), 192);
        assert_eq!(std::mem::size_of::<SurfaceUniforms>() % 16, 0);
    }

    #[test]
    fn test_surface_uniforms_from_params() {
        let params = SurfaceParams::left();
        let uniforms = SurfaceUniforms::new(Mat4::IDENTITY, SurfaceId::Left, &params, 1.5);

        assert_eq!(uniforms.frequency, params.frequency);
        assert_eq!(uniforms.elevation, params.elevation);
        assert_eq!(uniforms.time, 1.5);
        assert_eq!(uniforms.surface_color, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(uniforms.model[3][0], -2.1);
    }

    #[test]
    fn test_capped_surface_size() {
        // At or below the cap the physical size passes through
        assert_eq!(capped_surface_size((1280, 720), 1.0, 2.0), (1280, 720));
        assert_eq!(capped_surface_size((2560, 1440), 2.0, 2.0), (2560, 1440));

        // Above the cap the output scales down to the capped density
        assert_eq!(capped_surface_size((3840, 2160), 3.0, 2.0), (2560, 1440));

        // Degenerate sizes never reach zero
        assert_eq!(capped_surface_size((1, 1), 4.0, 2.0), (1, 1));
    }

    #[test]
    fn test_capped_surface_size_idempotent() {
        let once = capped_surface_size((3000, 2000), 3.0, 2.0);
        let twice = capped_surface_size(once, 2.0, 2.0);
        assert_eq!(once, twice);
    }
}
