//! Instanced slice quads

use wgpu::util::DeviceExt;

use super::backend::{FieldPipelineDesc, create_field_pipeline};
use crate::shader_gen::CompiledProgram;

/// Unit quad in the slice plane, two triangles.
const QUAD: [[f32; 3]; 6] = [
    [-0.5, -0.5, 0.0],
    [0.5, -0.5, 0.0],
    [0.5, 0.5, 0.0],
    [-0.5, -0.5, 0.0],
    [0.5, 0.5, 0.0],
    [-0.5, 0.5, 0.0],
];

const QUAD_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

/// Alpha-over for color; alpha accumulates toward opaque.
const SLICE_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    },
};

/// Draws `resolution` instances of one quad; instance 0 is the farthest.
pub struct SlicerPipeline {
    pipeline: wgpu::RenderPipeline,
    quad: wgpu::Buffer,
}

impl SlicerPipeline {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::PipelineLayout,
        format: wgpu::TextureFormat,
        program: &CompiledProgram,
    ) -> Self {
        let quad = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Slice Quad"),
            contents: bytemuck::cast_slice(&QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let pipeline = create_field_pipeline(
            device,
            &FieldPipelineDesc {
                label: "Slicer",
                layout,
                format,
                program,
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &QUAD_ATTRIBUTES,
                }],
                blend: SLICE_BLEND,
            },
        );

        Self { pipeline, quad }
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, slices: u32) {
        pass.set_pipeline(&self.pipeline);
        pass.set_vertex_buffer(0, self.quad.slice(..));
        pass.draw(0..QUAD.len() as u32, 0..slices.max(1));
    }
}
