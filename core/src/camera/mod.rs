//! Main-view cameras
//!
//! A perspective and an orthographic camera share one look-at target. The
//! [`rig::CameraRig`] decides which one is active and keeps them consistent
//! across preset changes and projection switches.

pub mod preset;
pub mod rig;
pub mod trackball;

use glam::{Mat3, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

pub use preset::{PRESETS, Preset, PresetId};
pub use rig::{CameraRig, CameraSettings};
pub use trackball::{DragMode, Trackball, TrackballSettings, WheelDelta};

/// Vertical field of view of the main perspective camera, in degrees.
pub const DEFAULT_FOV_DEGREES: f32 = 75.0;
pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 1000.0;

/// Active projection of the main view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Projection {
    Perspective,
    Orthographic,
}

/// Position, look-at target and up vector of a camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
}

impl CameraPose {
    /// `position - target`
    #[inline]
    pub fn eye(&self) -> Vec3 {
        self.position - self.target
    }

    /// Camera-to-world rotation (the camera looks down its local -Z).
    pub fn orientation(&self) -> Quat {
        look_rotation(self.position, self.target, self.up)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation(), self.position).inverse()
    }

    /// Unit vector from the camera toward the target.
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or(Vec3::NEG_Z)
    }
}

/// Rotation whose -Z axis points from `position` toward `target`.
///
/// When `up` is parallel to the view direction the basis is nudged so the
/// result stays well defined.
pub fn look_rotation(position: Vec3, target: Vec3, up: Vec3) -> Quat {
    let mut z = position - target;
    if z.length_squared() == 0.0 {
        z = Vec3::Z;
    }
    let z = z.normalize();

    let up = up.normalize_or(Vec3::Y);
    let mut x = up.cross(z);
    if x.length_squared() < 1e-12 {
        let nudged = if up.z.abs() == 1.0 {
            Vec3::new(z.x + 1e-4, z.y, z.z)
        } else {
            Vec3::new(z.x, z.y, z.z + 1e-4)
        }
        .normalize();
        x = up.cross(nudged);
    }
    let x = (x - z * x.dot(z)).normalize();
    let y = z.cross(x);
    Quat::from_mat3(&Mat3::from_cols(x, y, z)).normalize()
}

/// Perspective main-view camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub up: Vec3,
    pub fov_y_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl PerspectiveCamera {
    pub fn new(fov_y_degrees: f32, aspect: f32) -> Self {
        Self {
            position: Vec3::new(5.0, -5.0, 5.0),
            up: Vec3::Z,
            fov_y_degrees,
            aspect,
            near: NEAR_PLANE,
            far: FAR_PLANE,
        }
    }

    /// Depth range is `[0, 1]`.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_degrees.to_radians(),
            self.aspect.max(f32::EPSILON),
            self.near,
            self.far,
        )
    }

    /// `tan(fov / 2)`
    #[inline]
    pub fn half_fov_tan(&self) -> f32 {
        (0.5 * self.fov_y_degrees.to_radians()).tan()
    }
}

/// Frustum bounds of an orthographic camera before zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthoFrustum {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

/// Orthographic main-view camera.
///
/// The frustum is stored as a half-height so that a resize only needs the new
/// aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthographicCamera {
    pub position: Vec3,
    pub up: Vec3,
    pub half_height: f32,
    pub aspect: f32,
    pub zoom: f32,
    pub near: f32,
    pub far: f32,
}

impl OrthographicCamera {
    pub fn new(half_height: f32, aspect: f32) -> Self {
        Self {
            position: Vec3::new(0.0, -2.0, 0.0),
            up: Vec3::Z,
            half_height,
            aspect,
            zoom: 1.0,
            near: NEAR_PLANE,
            far: FAR_PLANE,
        }
    }

    pub fn frustum(&self) -> OrthoFrustum {
        OrthoFrustum {
            left: -self.aspect * self.half_height,
            right: self.aspect * self.half_height,
            top: self.half_height,
            bottom: -self.half_height,
        }
    }

    /// Visible height of the frustum after zoom.
    pub fn visible_height(&self) -> f32 {
        let f = self.frustum();
        (f.top - f.bottom) / self.zoom
    }

    /// Depth range is `[0, 1]`.
    pub fn projection_matrix(&self) -> Mat4 {
        let f = self.frustum();
        let dx = (f.right - f.left) / (2.0 * self.zoom);
        let dy = (f.top - f.bottom) / (2.0 * self.zoom);
        let cx = 0.5 * (f.right + f.left);
        let cy = 0.5 * (f.top + f.bottom);
        Mat4::orthographic_rh(cx - dx, cx + dx, cy - dy, cy + dy, self.near, self.far)
    }
}
