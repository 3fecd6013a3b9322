//! The 14 canonical view presets
//!
//! Six orthographic face views look straight down an axis of the region and
//! eight perspective corner views look at the center from each octant.

use glam::Vec3;

use super::{OrthoFrustum, Projection};
use crate::region::{Axis, BoundingRegion};

/// Identifies one of the 14 presets. Discriminants are the table index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PresetId {
    /// Looking from +X
    Right = 0,
    /// Looking from -X
    Left = 1,
    /// Looking from +Y
    Back = 2,
    /// Looking from -Y
    Front = 3,
    /// Looking from +Z
    Top = 4,
    /// Looking from -Z
    Bottom = 5,
    FrontRightTop = 6,
    BackRightTop = 7,
    BackLeftTop = 8,
    FrontLeftTop = 9,
    FrontRightBottom = 10,
    BackRightBottom = 11,
    BackLeftBottom = 12,
    FrontLeftBottom = 13,
}

impl PresetId {
    /// Number of presets
    pub const COUNT: usize = 14;

    /// View used on startup and whenever the region is resized.
    pub const DEFAULT: PresetId = PresetId::FrontRightTop;

    pub const ALL: [PresetId; Self::COUNT] = [
        PresetId::Right,
        PresetId::Left,
        PresetId::Back,
        PresetId::Front,
        PresetId::Top,
        PresetId::Bottom,
        PresetId::FrontRightTop,
        PresetId::BackRightTop,
        PresetId::BackLeftTop,
        PresetId::FrontLeftTop,
        PresetId::FrontRightBottom,
        PresetId::BackRightBottom,
        PresetId::BackLeftBottom,
        PresetId::FrontLeftBottom,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    #[inline]
    pub fn preset(self) -> &'static Preset {
        &PRESETS[self.index()]
    }
}

/// Static description of a preset view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preset {
    pub id: PresetId,
    pub name: &'static str,
    pub projection: Projection,
    /// Offset of the camera from the region center, in units of the reset distance
    pub direction: Vec3,
    pub up: Vec3,
    /// In-plane axes (horizontal, vertical) for orthographic framing
    pub face_axes: Option<(Axis, Axis)>,
}

const fn face(id: PresetId, name: &'static str, direction: Vec3, up: Vec3, h: Axis, v: Axis) -> Preset {
    Preset {
        id,
        name,
        projection: Projection::Orthographic,
        direction,
        up,
        face_axes: Some((h, v)),
    }
}

const fn corner(id: PresetId, name: &'static str, x: f32, y: f32, z: f32) -> Preset {
    Preset {
        id,
        name,
        projection: Projection::Perspective,
        direction: Vec3::new(x, y, z),
        up: Vec3::Z,
        face_axes: None,
    }
}

/// Preset table, indexed by [`PresetId::index`].
pub static PRESETS: [Preset; PresetId::COUNT] = [
    face(PresetId::Right, "right", Vec3::X, Vec3::Z, Axis::Y, Axis::Z),
    face(PresetId::Left, "left", Vec3::NEG_X, Vec3::Z, Axis::Y, Axis::Z),
    face(PresetId::Back, "back", Vec3::Y, Vec3::Z, Axis::X, Axis::Z),
    face(PresetId::Front, "front", Vec3::NEG_Y, Vec3::Z, Axis::X, Axis::Z),
    face(PresetId::Top, "top", Vec3::Z, Vec3::Y, Axis::X, Axis::Y),
    face(PresetId::Bottom, "bottom", Vec3::NEG_Z, Vec3::NEG_Y, Axis::X, Axis::Y),
    corner(PresetId::FrontRightTop, "front-right-top", 1.0, -1.0, 1.0),
    corner(PresetId::BackRightTop, "back-right-top", 1.0, 1.0, 1.0),
    corner(PresetId::BackLeftTop, "back-left-top", -1.0, 1.0, 1.0),
    corner(PresetId::FrontLeftTop, "front-left-top", -1.0, -1.0, 1.0),
    corner(PresetId::FrontRightBottom, "front-right-bottom", 1.0, -1.0, -1.0),
    corner(PresetId::BackRightBottom, "back-right-bottom", 1.0, 1.0, -1.0),
    corner(PresetId::BackLeftBottom, "back-left-bottom", -1.0, 1.0, -1.0),
    corner(PresetId::FrontLeftBottom, "front-left-bottom", -1.0, -1.0, -1.0),
];

/// Where a preset puts the active camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
}

impl Preset {
    /// Camera placement for this preset.
    ///
    /// Face views sit `reset_distance` away along their axis; corner views are
    /// offset by `reset_distance` on every axis.
    pub fn placement(&self, region: &BoundingRegion, reset_distance: f32) -> Placement {
        let target = region.center();
        Placement {
            position: target + self.direction * reset_distance,
            target,
            up: self.up,
        }
    }

    /// Orthographic frustum framing the face of `region`, or `None` for
    /// perspective presets.
    pub fn ortho_frustum(&self, region: &BoundingRegion, aspect: f32, factor: f32) -> Option<OrthoFrustum> {
        let (h, v) = self.face_axes?;
        let size = region.size();
        Some(frame_extent(size[h.index()], size[v.index()], aspect, factor))
    }
}

/// Symmetric frustum that keeps a `width` x `height` rectangle in view.
///
/// Half-height starts at `factor * height` and grows when the rectangle would
/// otherwise be clipped horizontally.
pub fn frame_extent(width: f32, height: f32, aspect: f32, factor: f32) -> OrthoFrustum {
    let width = width.abs();
    let height = height.abs();
    let aspect = if aspect > 0.0 { aspect } else { 1.0 };
    let mut half = factor * height;
    if half * aspect < factor * width {
        half = factor * width / aspect;
    }
    if half <= 0.0 {
        half = factor;
    }
    OrthoFrustum {
        left: -aspect * half,
        right: aspect * half,
        top: half,
        bottom: -half,
    }
}
