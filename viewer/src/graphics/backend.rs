//! Active field renderer

use super::GraphicsError;
use super::init::Gpu;
use super::raymarch::RaymarchPipeline;
use super::slicer::SlicerPipeline;
use super::uniforms::FieldBinding;
use crate::shader_gen::{BackendKind, CompiledProgram, FRAGMENT_ENTRY, VERTEX_ENTRY};

/// GPU resources of whichever backend is active.
pub enum RenderBackend {
    Slicer(SlicerPipeline),
    Raymarcher(RaymarchPipeline),
}

impl RenderBackend {
    /// Builds the pipeline for `program.backend`.
    ///
    /// Every wgpu error raised while building is captured. Out-of-memory and
    /// internal errors mean the device could not handle the program; the
    /// caller must tear down and re-initialize.
    pub fn build(gpu: &Gpu, binding: &FieldBinding, program: &CompiledProgram) -> Result<Self, GraphicsError> {
        if gpu.is_lost() {
            return Err(GraphicsError::DeviceLost);
        }
        let device = gpu.device();
        let layout = binding.pipeline_layout();
        let format = gpu.surface_format();

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Internal);
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let backend = match program.backend {
            BackendKind::Slicer => RenderBackend::Slicer(SlicerPipeline::new(device, layout, format, program)),
            BackendKind::Raymarcher => {
                RenderBackend::Raymarcher(RaymarchPipeline::new(device, layout, format, program))
            }
        };

        let validation = pollster::block_on(device.pop_error_scope());
        let internal = pollster::block_on(device.pop_error_scope());
        let out_of_memory = pollster::block_on(device.pop_error_scope());

        if gpu.is_lost() {
            return Err(GraphicsError::DeviceLost);
        }
        if let Some(e) = out_of_memory {
            return Err(GraphicsError::OutOfMemory(e.to_string()));
        }
        if let Some(e) = internal {
            return Err(GraphicsError::PipelineTooComplex(e.to_string()));
        }
        if let Some(e) = validation {
            return Err(GraphicsError::Shader(e.to_string()));
        }

        tracing::info!("Built {} pipeline", program.backend.name());
        Ok(backend)
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            RenderBackend::Slicer(_) => BackendKind::Slicer,
            RenderBackend::Raymarcher(_) => BackendKind::Raymarcher,
        }
    }

    /// Records the field draw. `slices` is ignored by the raymarcher.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, slices: u32) {
        match self {
            RenderBackend::Slicer(slicer) => slicer.draw(pass, slices),
            RenderBackend::Raymarcher(raymarch) => raymarch.draw(pass),
        }
    }
}

pub(super) struct FieldPipelineDesc<'a> {
    pub label: &'a str,
    pub layout: &'a wgpu::PipelineLayout,
    pub format: wgpu::TextureFormat,
    pub program: &'a CompiledProgram,
    pub buffers: &'a [wgpu::VertexBufferLayout<'a>],
    pub blend: wgpu::BlendState,
}

/// Render pipeline for a compiled field program.
///
/// GLSL programs bring a separate vertex module; WGSL programs hold both
/// entry points in one.
pub(super) fn create_field_pipeline(device: &wgpu::Device, desc: &FieldPipelineDesc<'_>) -> wgpu::RenderPipeline {
    let fragment_label = format!("{} Shader", desc.label);
    let fragment = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&fragment_label),
        source: wgpu::ShaderSource::Wgsl(desc.program.fragment.as_str().into()),
    });
    let vertex_label = format!("{} Vertex Shader", desc.label);
    let separate_vertex = desc.program.vertex.as_deref().map(|source| {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&vertex_label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        })
    });
    let vertex = separate_vertex.as_ref().unwrap_or(&fragment);

    let pipeline_label = format!("{} Pipeline", desc.label);
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&pipeline_label),
        layout: Some(desc.layout),
        vertex: wgpu::VertexState {
            module: vertex,
            entry_point: Some(VERTEX_ENTRY),
            buffers: desc.buffers,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &fragment,
            entry_point: Some(FRAGMENT_ENTRY),
            targets: &[Some(wgpu::ColorTargetState {
                format: desc.format,
                blend: Some(desc.blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}
