//! Per-frame uniform block shared by every field program
//!
//! Layout matches `Uniforms` in `prelude.wgsl` and the uniform block in
//! `prelude.glsl` (std140).

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use irmf_core::camera::CameraRig;
use irmf_core::metadata::MAX_MATERIALS;
use irmf_core::raymarch::RaymarchSettings;
use irmf_core::region::BoundingRegion;
use irmf_core::slicer::{Resolution, SliceStack};

use crate::shader_gen::BackendKind;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub projection: [[f32; 4]; 4],
    pub model_view: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub inv_model_view: [[f32; 4]; 4],
    /// Region minimum corner, `w` unused
    pub ll: [f32; 4],
    /// Region maximum corner, `w` unused
    pub ur: [f32; 4],
    pub min_d: f32,
    pub max_d: f32,
    pub diagonal: f32,
    pub resolution: f32,
    pub aspect: f32,
    pub tan_half_fov: f32,
    pub hit_epsilon: f32,
    pub normal_epsilon: f32,
    pub max_distance: f32,
    pub ambient_floor: f32,
    pub max_steps: f32,
    pub _pad: f32,
    pub colors: [[f32; 4]; MAX_MATERIALS],
}

/// Everything a frame's uniforms are derived from.
#[derive(Debug, Clone, Copy)]
pub struct FrameScene<'a> {
    pub region: &'a BoundingRegion,
    pub rig: &'a CameraRig,
    pub resolution: Resolution,
    pub raymarch: &'a RaymarchSettings,
    pub palette: [[f32; 4]; MAX_MATERIALS],
}

impl FrameUniforms {
    pub const SIZE: u64 = std::mem::size_of::<FrameUniforms>() as u64;

    /// Uniforms for `backend`.
    ///
    /// The slicer's model matrix orients the slice stack toward the camera.
    /// The raymarcher works in world space, so its model matrix is identity
    /// and `inv_model_view` takes view-space rays straight to the field.
    pub fn new(backend: BackendKind, scene: &FrameScene<'_>) -> Self {
        let region = scene.region;
        let rig = scene.rig;
        let view = rig.view_matrix();
        let settings = scene.raymarch;

        let (model, projection, extents, resolution) = match backend {
            BackendKind::Slicer => {
                let stack = SliceStack::new(region, &rig.pose(), scene.resolution.get());
                (stack.model, projection(backend, rig), stack.extents, stack.count as f32)
            }
            BackendKind::Raymarcher => (
                Mat4::IDENTITY,
                projection(backend, rig),
                region.depth_extents(),
                scene.resolution.get() as f32,
            ),
        };
        let model_view = view * model;

        Self {
            projection: projection.to_cols_array_2d(),
            model_view: model_view.to_cols_array_2d(),
            model: model.to_cols_array_2d(),
            inv_model_view: model_view.inverse().to_cols_array_2d(),
            ll: region.min().extend(0.0).to_array(),
            ur: region.max().extend(0.0).to_array(),
            min_d: extents.min_d,
            max_d: extents.max_d,
            diagonal: extents.diagonal,
            resolution,
            aspect: rig.aspect(),
            tan_half_fov: (settings.fov_degrees.to_radians() * 0.5).tan(),
            hit_epsilon: settings.hit_epsilon,
            normal_epsilon: settings.normal_epsilon,
            max_distance: settings.max_distance_factor,
            ambient_floor: settings.ambient_floor,
            max_steps: settings.max_steps as f32,
            _pad: 0.0,
            colors: scene.palette,
        }
    }
}

/// The raymarcher always casts perspective rays, even while the rig is
/// orthographic.
fn projection(backend: BackendKind, rig: &CameraRig) -> Mat4 {
    match backend {
        BackendKind::Slicer => rig.projection_matrix(),
        BackendKind::Raymarcher => rig.perspective.projection_matrix(),
    }
}

/// World-to-clip transform matching what `backend` shows, for geometry drawn
/// alongside the field.
pub fn scene_view_proj(backend: BackendKind, rig: &CameraRig) -> Mat4 {
    projection(backend, rig) * rig.view_matrix()
}

/// Uniform buffer plus the bind group and pipeline layout every field
/// pipeline is built against.
pub struct FieldBinding {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    pipeline_layout: wgpu::PipelineLayout,
}

impl FieldBinding {
    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Field Uniforms"),
            size: FrameUniforms::SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Field Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(FrameUniforms::SIZE),
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Field Bind Group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Field Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        Self {
            buffer,
            bind_group,
            pipeline_layout,
        }
    }

    pub fn write(&self, queue: &wgpu::Queue, uniforms: &FrameUniforms) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(uniforms));
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn pipeline_layout(&self) -> &wgpu::PipelineLayout {
        &self.pipeline_layout
    }
}
