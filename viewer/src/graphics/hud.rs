//! Orientation widget renderer
//!
//! Drawn in its own pass after the field, restricted to the HUD viewport, so
//! nothing it sets leaks into the main view.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use irmf_core::hud::{HudCamera, HudVertex, widget_axes, widget_triangles};
use wgpu::util::DeviceExt;

const HUD_SHADER: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/hud.wgsl"));
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4];

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct LineUniforms {
    view_proj: [[f32; 4]; 4],
}

struct HudMesh {
    buffer: wgpu::Buffer,
    count: u32,
}

impl HudMesh {
    fn new(device: &wgpu::Device, label: &str, vertices: &[HudVertex]) -> Self {
        Self {
            buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            count: vertices.len() as u32,
        }
    }
}

pub struct HudRenderer {
    discs_pipeline: wgpu::RenderPipeline,
    axes_pipeline: wgpu::RenderPipeline,
    discs: HudMesh,
    axes: HudMesh,
    uniforms: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    depth_view: wgpu::TextureView,
}

impl HudRenderer {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        let shader = line_shader(device);

        let (uniforms, bind_group, layout) = line_binding(device, "HUD");

        let discs_pipeline = line_pipeline(
            device,
            &layout,
            &shader,
            format,
            wgpu::PrimitiveTopology::TriangleList,
            Some(depth_state()),
        );
        let axes_pipeline = line_pipeline(
            device,
            &layout,
            &shader,
            format,
            wgpu::PrimitiveTopology::LineList,
            Some(depth_state()),
        );

        Self {
            discs_pipeline,
            axes_pipeline,
            discs: HudMesh::new(device, "HUD Discs", &widget_triangles()),
            axes: HudMesh::new(device, "HUD Axes", &widget_axes()),
            uniforms,
            bind_group,
            depth_view: depth_view(device, width, height),
        }
    }

    /// Recreates the depth buffer for a new surface size.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_view = depth_view(device, width, height);
    }

    /// Draws the widget over `target` inside the camera's viewport.
    pub fn render(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        camera: &HudCamera,
    ) {
        let viewport = camera.viewport();
        if viewport.is_empty() {
            return;
        }
        write_view_proj(queue, &self.uniforms, camera.view_proj());

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("HUD Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_viewport(
            viewport.x as f32,
            viewport.y as f32,
            viewport.width as f32,
            viewport.height as f32,
            0.0,
            1.0,
        );
        pass.set_scissor_rect(viewport.x, viewport.y, viewport.width, viewport.height);
        pass.set_bind_group(0, &self.bind_group, &[]);

        pass.set_pipeline(&self.discs_pipeline);
        pass.set_vertex_buffer(0, self.discs.buffer.slice(..));
        pass.draw(0..self.discs.count, 0..1);

        pass.set_pipeline(&self.axes_pipeline);
        pass.set_vertex_buffer(0, self.axes.buffer.slice(..));
        pass.draw(0..self.axes.count, 0..1);
    }
}

fn depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("HUD Depth"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn depth_state() -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::LessEqual,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

pub(super) fn line_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Line Shader"),
        source: wgpu::ShaderSource::Wgsl(HUD_SHADER.into()),
    })
}

pub(super) fn write_view_proj(queue: &wgpu::Queue, buffer: &wgpu::Buffer, view_proj: Mat4) {
    let uniforms = LineUniforms {
        view_proj: view_proj.to_cols_array_2d(),
    };
    queue.write_buffer(buffer, 0, bytemuck::bytes_of(&uniforms));
}

/// Uniform buffer holding one view-projection matrix, its bind group and the
/// pipeline layout for `hud.wgsl`.
pub(super) fn line_binding(
    device: &wgpu::Device,
    label: &str,
) -> (wgpu::Buffer, wgpu::BindGroup, wgpu::PipelineLayout) {
    let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(format!("{label} Uniforms").as_str()),
        size: std::mem::size_of::<LineUniforms>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(format!("{label} Bind Group Layout").as_str()),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(format!("{label} Bind Group").as_str()),
        layout: &bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: uniforms.as_entire_binding(),
        }],
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(format!("{label} Pipeline Layout").as_str()),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });
    (uniforms, bind_group, layout)
}

/// Flat-colored pipeline over [`HudVertex`] data. Without `depth_stencil`
/// later draws always win.
pub(super) fn line_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    topology: wgpu::PrimitiveTopology,
    depth_stencil: Option<wgpu::DepthStencilState>,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Line Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<HudVertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &VERTEX_ATTRIBUTES,
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}
