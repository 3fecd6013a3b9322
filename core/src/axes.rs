//! World axes helper of the main view
//!
//! Three lines from the world origin along +X, +Y and +Z, as long as the
//! region's diagonal. With show-through on they are drawn after the field so
//! the model never hides them.

use serde::{Deserialize, Serialize};

use crate::hud::HudVertex;
use crate::region::BoundingRegion;

const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
const GREEN: [f32; 4] = [0.0, 1.0, 0.0, 1.0];
const BLUE: [f32; 4] = [0.0, 0.0, 1.0, 1.0];

/// Axes helper toggles, the `[axes]` section of the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxesSettings {
    pub show: bool,
    /// Draw over the field instead of behind it
    pub show_through: bool,
}

impl Default for AxesSettings {
    fn default() -> Self {
        Self {
            show: true,
            show_through: true,
        }
    }
}

/// Where the axes go relative to the field pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxesPass {
    Hidden,
    BeforeField,
    AfterField,
}

impl AxesSettings {
    pub fn pass(&self) -> AxesPass {
        match (self.show, self.show_through) {
            (false, _) => AxesPass::Hidden,
            (true, false) => AxesPass::BeforeField,
            (true, true) => AxesPass::AfterField,
        }
    }
}

/// Line list of the three axes with the given length, X red, Y green, Z blue.
pub fn axis_lines(length: f32) -> [HudVertex; 6] {
    let origin = [0.0; 3];
    let line = |end: [f32; 3], color| {
        [
            HudVertex { position: origin, color },
            HudVertex { position: end, color },
        ]
    };
    let [x0, x1] = line([length, 0.0, 0.0], RED);
    let [y0, y1] = line([0.0, length, 0.0], GREEN);
    let [z0, z1] = line([0.0, 0.0, length], BLUE);
    [x0, x1, y0, y1, z0, z1]
}

/// Axes of the main view, sized by the region's diagonal.
pub fn main_axes(region: &BoundingRegion) -> [HudVertex; 6] {
    axis_lines(region.depth_extents().diagonal)
}
