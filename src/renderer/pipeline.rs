//! WebGPU render pipeline setup
//!
//! `GpuSurface` records draw calls into a `MeshSurface` and uploads the
//! finished triangle list on `end_frame`.

use glam::Vec2;
use wgpu::util::DeviceExt;

use super::mesh::MeshSurface;
use super::surface::{Color, Surface, SurfaceError};
use super::vertex::{Vertex, colors};

/// A canvas-backed surface
pub struct GpuSurface {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
    mesh: MeshSurface,
}

impl GpuSurface {
    pub async fn new(
        surface: wgpu::Surface<'static>,
        adapter: &wgpu::Adapter,
        width: u32,
        height: u32,
    ) -> Result<Self, SurfaceError> {
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("wind-tunnel-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults(),
                memory_hints: Default::default(),
                trace: Default::default(),
                experimental_features: Default::default(),
            })
            .await
            .map_err(|e| SurfaceError::Unavailable(format!("no device: {}", e)))?;

        let surface_caps = surface.get_capabilities(adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| SurfaceError::Unavailable("surface has no formats".into()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        log::info!("Using surface format: {:?}", surface_format);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pipeline_layout"),
            bind_group_layouts: &[],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("render_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::desc()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
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
            multiview_mask: None,
            cache: None,
        });

        // Placeholder until the first frame is uploaded
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("vertex_buffer"),
            contents: bytemuck::cast_slice(&[Vertex::new(0.0, 0.0, [1.0; 4])]),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        Ok(Self {
            surface,
            device,
            queue,
            config,
            pipeline,
            vertex_buffer,
            vertex_count: 0,
            mesh: MeshSurface::new(width, height),
        })
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) {
        if new_width > 0 && new_height > 0 {
            self.config.width = new_width;
            self.config.height = new_height;
            self.surface.configure(&self.device, &self.config);
            self.mesh.resize(new_width, new_height);
        }
    }

    /// Upload the last presented mesh and draw it
    fn present(&mut self) -> Result<(), SurfaceError> {
        let size = self.mesh.size();
        let ndc_vertices: Vec<Vertex> = self
            .mesh
            .vertices()
            .iter()
            .map(|v| pixel_to_ndc(v, size))
            .collect();

        self.vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("vertex_buffer"),
                contents: bytemuck::cast_slice(&ndc_vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        self.vertex_count = ndc_vertices.len() as u32;

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return Err(SurfaceError::Lost);
            }
            Err(e) => return Err(SurfaceError::Unavailable(e.to_string())),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("render_encoder"),
            });

        {
            let [r, g, b, a] = colors::BACKGROUND;
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("render_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.draw(0..self.vertex_count, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

impl Surface for GpuSurface {
    fn size(&self) -> (u32, u32) {
        self.mesh.size()
    }

    fn begin_frame(&mut self) -> Result<(), SurfaceError> {
        self.mesh.begin_frame()
    }

    fn fill_rect(&mut self, min: Vec2, max: Vec2, color: Color) -> Result<(), SurfaceError> {
        self.mesh.fill_rect(min, max, color)
    }

    fn fill_polygon(&mut self, points: &[Vec2], color: Color) -> Result<(), SurfaceError> {
        self.mesh.fill_polygon(points, color)
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) -> Result<(), SurfaceError> {
        self.mesh.fill_circle(center, radius, color)
    }

    fn stroke_polyline(
        &mut self,
        points: &[Vec2],
        width: f32,
        color: Color,
    ) -> Result<(), SurfaceError> {
        self.mesh.stroke_polyline(points, width, color)
    }

    fn end_frame(&mut self) -> Result<(), SurfaceError> {
        self.mesh.end_frame()?;
        self.present()
    }
}

/// Surface pixels (origin top-left, y down) to normalized device coordinates
pub fn pixel_to_ndc(v: &Vertex, (w, h): (u32, u32)) -> Vertex {
    let (w, h) = (w.max(1) as f32, h.max(1) as f32);
    let [x, y] = v.position;
    Vertex::new(x / w * 2.0 - 1.0, 1.0 - y / h * 2.0, v.color)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_to_ndc_corners() {
        let c = [1.0; 4];
        assert_eq!(pixel_to_ndc(&Vertex::new(0.0, 0.0, c), (800, 600)).position, [-1.0, 1.0]);
        assert_eq!(pixel_to_ndc(&Vertex::new(800.0, 600.0, c), (800, 600)).position, [1.0, -1.0]);
        assert_eq!(pixel_to_ndc(&Vertex::new(400.0, 300.0, c), (800, 600)).position, [0.0, 0.0]);
    }

    #[test]
    fn test_pixel_to_ndc_zero_size() {
        let v = pixel_to_ndc(&Vertex::new(0.0, 0.0, [1.0; 4]), (0, 0));
        assert!(v.position.iter().all(|c| c.is_finite()));
    }
}
