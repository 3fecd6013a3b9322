//! IRMF Core - GPU-free model of the field viewer
//!
//! Everything the viewer decides without talking to a GPU lives here, so it
//! can be tested headless:
//!
//! - [`region::BoundingRegion`] - the visualized box, source of all extents
//! - [`camera`] - perspective/orthographic pair, 14 presets, trackball
//! - [`hud`] - orientation widget camera and picking
//! - [`axes`] - world axes helper of the main view
//! - [`slicer`] - slice stack transforms
//! - [`raymarch`] - CPU reference of the sphere-tracing kernel
//! - [`metadata`] - IRMF document header
//! - [`materials`] - material color mixer
//! - [`config`] - persisted settings

pub mod axes;
pub mod camera;
pub mod config;
pub mod hud;
pub mod materials;
pub mod metadata;
pub mod raymarch;
pub mod region;
pub mod slicer;

pub use camera::{CameraPose, CameraRig, PresetId, Projection};
pub use metadata::{Dialect, IrmfDocument, MetadataError};
pub use region::BoundingRegion;
pub use slicer::Resolution;
