//! Full-screen sphere tracing
//!
//! Precondition: the field's fourth component must be a true or conservative
//! signed distance. The kernel steps by exactly that amount.

use super::backend::{FieldPipelineDesc, create_field_pipeline};
use crate::shader_gen::CompiledProgram;

pub struct RaymarchPipeline {
    pipeline: wgpu::RenderPipeline,
}

impl RaymarchPipeline {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::PipelineLayout,
        format: wgpu::TextureFormat,
        program: &CompiledProgram,
    ) -> Self {
        let pipeline = create_field_pipeline(
            device,
            &FieldPipelineDesc {
                label: "Raymarch",
                layout,
                format,
                program,
                buffers: &[],
                // Misses are discarded, hits are opaque.
                blend: wgpu::BlendState::ALPHA_BLENDING,
            },
        );
        Self { pipeline }
    }

    /// One triangle covering the viewport.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_pipeline(&self.pipeline);
        pass.draw(0..3, 0..1);
    }
}
