//! IRMF Viewer
//!
//! wgpu runtime for IRMF field programs:
//! - [`shader_gen`]: wraps the user's `mainModel4` and compiles it with naga
//! - [`graphics`]: device, slicer and raymarch pipelines, HUD widget
//! - [`context`]: renderer state shared by the frame loop
//! - [`app`]: winit window and input handling

pub mod app;
pub mod context;
pub mod graphics;
pub mod shader_gen;
