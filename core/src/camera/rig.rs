//! Perspective/orthographic camera pair with a shared target
//!
//! The rig is a two-state machine over [`Projection`]. Presets land in their
//! declared projection; a click while orthographic switches back to
//! perspective at a distance that keeps the on-screen scale.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::preset::{Preset, PresetId};
use super::trackball::Trackball;
use super::{CameraPose, DEFAULT_FOV_DEGREES, OrthoFrustum, OrthographicCamera, PerspectiveCamera, Projection};
use crate::region::BoundingRegion;

/// Framing constants for the main view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    /// Vertical field of view of the perspective camera (default: 75)
    #[serde(default = "default_fov")]
    pub fov_degrees: f32,
    /// Orthographic half-extent per unit of face size (default: 0.542)
    #[serde(default = "default_ortho_factor")]
    pub ortho_frustum_factor: f32,
    /// Extra distance, in region radii, added when leaving orthographic (default: 0.5)
    #[serde(default = "default_match_offset")]
    pub persp_match_offset: f32,
}

fn default_fov() -> f32 {
    DEFAULT_FOV_DEGREES
}
fn default_ortho_factor() -> f32 {
    0.542
}
fn default_match_offset() -> f32 {
    0.5
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_degrees: default_fov(),
            ortho_frustum_factor: default_ortho_factor(),
            persp_match_offset: default_match_offset(),
        }
    }
}

/// The main-view camera pair.
#[derive(Debug, Clone)]
pub struct CameraRig {
    pub perspective: PerspectiveCamera,
    pub orthographic: OrthographicCamera,
    mode: Projection,
    target: Vec3,
    region: BoundingRegion,
    settings: CameraSettings,
    last_preset: Option<PresetId>,
}

impl CameraRig {
    /// Creates a rig framed on `region` with the default preset applied.
    pub fn new(region: BoundingRegion, aspect: f32, settings: CameraSettings) -> Self {
        let mut rig = Self {
            perspective: PerspectiveCamera::new(settings.fov_degrees, aspect),
            orthographic: OrthographicCamera::new(1.0, aspect),
            mode: Projection::Perspective,
            target: region.center(),
            region,
            settings,
            last_preset: None,
        };
        rig.apply_preset(PresetId::DEFAULT);
        rig
    }

    #[inline]
    pub fn mode(&self) -> Projection {
        self.mode
    }

    #[inline]
    pub fn target(&self) -> Vec3 {
        self.target
    }

    #[inline]
    pub fn region(&self) -> &BoundingRegion {
        &self.region
    }

    #[inline]
    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    /// Most recently applied preset, cleared by free camera movement.
    #[inline]
    pub fn last_preset(&self) -> Option<PresetId> {
        self.last_preset
    }

    /// Distance at which the region's bounding sphere fits the vertical FOV.
    pub fn reset_distance(&self) -> f32 {
        self.region.reset_distance(self.settings.fov_degrees)
    }

    /// Pose of the active camera.
    pub fn pose(&self) -> CameraPose {
        let (position, up) = match self.mode {
            Projection::Perspective => (self.perspective.position, self.perspective.up),
            Projection::Orthographic => (self.orthographic.position, self.orthographic.up),
        };
        CameraPose {
            position,
            target: self.target,
            up,
        }
    }

    /// Overwrites the active camera's pose and the shared target.
    pub fn set_pose(&mut self, pose: CameraPose) {
        self.target = pose.target;
        match self.mode {
            Projection::Perspective => {
                self.perspective.position = pose.position;
                self.perspective.up = pose.up;
            }
            Projection::Orthographic => {
                self.orthographic.position = pose.position;
                self.orthographic.up = pose.up;
            }
        }
    }

    pub fn orientation(&self) -> Quat {
        self.pose().orientation()
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.pose().view_matrix()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        match self.mode {
            Projection::Perspective => self.perspective.projection_matrix(),
            Projection::Orthographic => self.orthographic.projection_matrix(),
        }
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    #[inline]
    pub fn aspect(&self) -> f32 {
        self.perspective.aspect
    }

    /// Updates the region and the shared target.
    ///
    /// The default preset is re-applied only when the region was resized.
    /// Otherwise both cameras follow the center so the view direction and
    /// distance are kept.
    pub fn set_region(&mut self, region: BoundingRegion, resized: bool) {
        let delta = region.center() - self.region.center();
        self.region = region;
        self.target = region.center();
        if resized {
            self.apply_preset(PresetId::DEFAULT);
        } else {
            self.perspective.position += delta;
            self.orthographic.position += delta;
        }
    }

    /// Jumps to a preset view, switching projection as the preset declares.
    pub fn apply_preset(&mut self, id: PresetId) {
        let preset: &Preset = id.preset();
        match preset.projection {
            Projection::Orthographic => {
                if let Some(frustum) =
                    preset.ortho_frustum(&self.region, self.aspect(), self.settings.ortho_frustum_factor)
                {
                    self.to_ortho(frustum);
                }
            }
            Projection::Perspective => self.to_persp(false),
        }
        let placement = preset.placement(&self.region, self.reset_distance());
        self.set_pose(CameraPose {
            position: placement.position,
            target: placement.target,
            up: placement.up,
        });
        self.last_preset = Some(id);
        tracing::debug!("Applied view preset {}", preset.name);
    }

    /// Switches to orthographic, inheriting the perspective pose.
    pub fn to_ortho(&mut self, frustum: OrthoFrustum) {
        self.orthographic.position = self.perspective.position;
        self.orthographic.up = self.perspective.up;
        self.orthographic.half_height = frustum.top;
        self.orthographic.zoom = 1.0;
        self.perspective.fov_y_degrees = self.settings.fov_degrees;
        self.mode = Projection::Orthographic;
    }

    /// Switches to perspective, inheriting the orthographic pose.
    ///
    /// With `match_ortho` the camera distance is chosen so that the visible
    /// height at the matching plane equals the orthographic frustum height.
    /// That plane sits `persp_match_offset * radius` in front of the target.
    /// Without it the eye is only pushed out to at least the reset distance.
    pub fn to_persp(&mut self, match_ortho: bool) {
        self.perspective.fov_y_degrees = self.settings.fov_degrees;
        let eye = self.orthographic.position - self.target;

        let distance = if match_ortho {
            self.persp_match_distance()
        } else {
            eye.length().max(self.reset_distance())
        };

        self.perspective.position = if eye.length_squared() < 1e-6 {
            self.target + Vec3::new(distance, -distance, distance)
        } else {
            self.target + eye.normalize() * distance
        };
        self.perspective.up = self.orthographic.up;
        self.mode = Projection::Perspective;
    }

    /// Camera-to-target distance used when leaving orthographic.
    pub fn persp_match_distance(&self) -> f32 {
        let ortho_height = self.orthographic.visible_height();
        ortho_height / (2.0 * self.perspective.half_fov_tan())
            + self.region.framing_radius() * self.settings.persp_match_offset
    }

    /// Left click or single tap in the main view.
    ///
    /// Returns `true` when the click switched projection.
    pub fn click(&mut self) -> bool {
        if self.mode == Projection::Orthographic {
            self.to_persp(true);
            self.last_preset = None;
            tracing::debug!("Switched to perspective from orthographic click");
            return true;
        }
        false
    }

    /// Applies a new canvas size to both cameras.
    pub fn resize(&mut self, width: u32, height: u32) {
        let aspect = if height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        };
        self.perspective.aspect = aspect;
        self.orthographic.aspect = aspect;
    }

    /// Runs one trackball step on the active camera.
    ///
    /// Returns `true` when the camera moved.
    pub fn update_controls(&mut self, trackball: &mut Trackball) -> bool {
        let mut pose = self.pose();
        let step = trackball.update(&mut pose, self.mode);
        if self.mode == Projection::Orthographic && step.zoom != 1.0 && step.zoom > 0.0 {
            self.orthographic.zoom /= step.zoom;
        }
        if step.moved {
            self.set_pose(pose);
            self.last_preset = None;
        }
        step.moved || step.zoom != 1.0
    }
}
