//! World axes helper of the main view
//!
//! Same shader as the HUD, without a depth buffer: the pass order alone
//! decides whether the field covers the axes.

use glam::Mat4;
use irmf_core::hud::HudVertex;

use super::hud::{line_binding, line_pipeline, line_shader, write_view_proj};

const VERTEX_COUNT: u32 = 6;

pub struct AxesRenderer {
    pipeline: wgpu::RenderPipeline,
    vertices: wgpu::Buffer,
    uniforms: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl AxesRenderer {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = line_shader(device);
        let (uniforms, bind_group, layout) = line_binding(device, "Axes");
        let pipeline = line_pipeline(device, &layout, &shader, format, wgpu::PrimitiveTopology::LineList, None);
        let vertices = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Axes Vertices"),
            size: std::mem::size_of::<[HudVertex; 6]>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            pipeline,
            vertices,
            uniforms,
            bind_group,
        }
    }

    /// Draws the axes over `target`, loading or clearing it first.
    pub fn render(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        view_proj: Mat4,
        lines: &[HudVertex; 6],
        load: wgpu::LoadOp<wgpu::Color>,
    ) {
        write_view_proj(queue, &self.uniforms, view_proj);
        queue.write_buffer(&self.vertices, 0, bytemuck::cast_slice(lines));

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Axes Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertices.slice(..));
        pass.draw(0..VERTEX_COUNT, 0..1);
    }
}
