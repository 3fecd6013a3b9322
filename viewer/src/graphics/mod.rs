//! wgpu rendering for the field viewer
//!
//! - [`Gpu`]: device, queue and window surface
//! - [`FrameUniforms`]: per-frame parameters shared by both backends
//! - [`RenderBackend`]: slicer or raymarch pipeline for a compiled program
//! - [`HudRenderer`]: orientation widget, drawn last in its own viewport
//! - [`AxesRenderer`]: world axes before or after the field

mod axes;
mod backend;
mod hud;
mod init;
mod raymarch;
mod slicer;
mod uniforms;

pub use axes::AxesRenderer;
pub use backend::RenderBackend;
pub use hud::HudRenderer;
pub use init::Gpu;
pub use raymarch::RaymarchPipeline;
pub use slicer::SlicerPipeline;
pub use uniforms::{FieldBinding, FrameScene, FrameUniforms, scene_view_proj};

/// Failure while turning a compiled program into GPU state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphicsError {
    #[error("graphics device lost; it will be re-acquired on the next frame")]
    DeviceLost,
    #[error("out of GPU memory while building the pipeline: {0}. Try simplifying the field program")]
    OutOfMemory(String),
    #[error("the GPU could not build a pipeline for this program: {0}. Try simplifying the field program")]
    PipelineTooComplex(String),
    #[error("shader rejected by the GPU driver: {0}")]
    Shader(String),
}

impl GraphicsError {
    /// Whether the device must be torn down and acquired again.
    pub fn requires_reinit(&self) -> bool {
        !matches!(self, GraphicsError::Shader(_))
    }
}
