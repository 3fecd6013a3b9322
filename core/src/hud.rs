//! HUD orientation widget: viewport, camera and picking
//!
//! The widget lives in a fixed-size square in the top-right corner of the
//! canvas. Its camera copies the main camera's orientation every frame and
//! sits at a fixed distance from the widget origin, so the widget is framed
//! identically however far the main camera is from the region.

use glam::{Mat4, Quat, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::camera::{FAR_PLANE, NEAR_PLANE, PresetId, Projection};

/// Rectangular pixel region of the canvas, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Size in pixels, `None` while the canvas has no area (minimized window).
    fn extent(&self) -> Option<(f32, f32)> {
        (self.width > 0 && self.height > 0).then(|| (self.width as f32, self.height as f32))
    }

    pub fn is_empty(&self) -> bool {
        self.extent().is_none()
    }

    /// Maps a canvas pixel into `[0, 1]` viewport-local coordinates, or `None`
    /// when the pixel lies outside.
    pub fn local(&self, px: f32, py: f32) -> Option<(f32, f32)> {
        let (w, h) = self.extent()?;
        let u = (px - self.x as f32) / w;
        let v = (py - self.y as f32) / h;
        ((0.0..=1.0).contains(&u) && (0.0..=1.0).contains(&v)).then_some((u, v))
    }
}

/// Widget sizing and camera constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HudSettings {
    /// Edge length of the widget in pixels (default: 256)
    #[serde(default = "default_size")]
    pub size: u32,
    /// Distance of the HUD camera from the widget origin (default: 3.25)
    #[serde(default = "default_distance")]
    pub distance: f32,
    /// Vertical FOV of the HUD perspective camera (default: 45)
    #[serde(default = "default_fov")]
    pub fov_degrees: f32,
    /// Half-height of the HUD orthographic frustum (default: 1.25)
    #[serde(default = "default_ortho_size")]
    pub ortho_frustum_size: f32,
}

fn default_size() -> u32 {
    256
}
fn default_distance() -> f32 {
    3.25
}
fn default_fov() -> f32 {
    45.0
}
fn default_ortho_size() -> f32 {
    1.25
}

impl Default for HudSettings {
    fn default() -> Self {
        Self {
            size: default_size(),
            distance: default_distance(),
            fov_degrees: default_fov(),
            ortho_frustum_size: default_ortho_size(),
        }
    }
}

/// HUD viewport in the top-right corner, clamped to the canvas.
pub fn hud_viewport(canvas_width: u32, canvas_height: u32, size: u32) -> Viewport {
    let width = size.min(canvas_width);
    let height = size.min(canvas_height);
    Viewport {
        x: canvas_width - width,
        y: 0,
        width,
        height,
    }
}

/// A pickable disc on the widget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickTarget {
    pub preset: PresetId,
    pub center: Vec3,
    /// Unit normal of the disc plane
    pub normal: Vec3,
    pub radius: f32,
}

/// Radius of the face discs
pub const FACE_DISC_RADIUS: f32 = 0.4;
/// Radius of the corner discs
pub const CORNER_DISC_RADIUS: f32 = 0.1;

/// Discs of the widget in preset order: six face discs, then eight corner discs.
pub fn pick_targets() -> [PickTarget; PresetId::COUNT] {
    PresetId::ALL.map(|id| {
        let dir = id.preset().direction;
        if id.index() < 6 {
            PickTarget {
                preset: id,
                center: dir * 0.5,
                normal: dir,
                radius: FACE_DISC_RADIUS,
            }
        } else {
            PickTarget {
                preset: id,
                center: dir * 0.4,
                normal: dir.normalize(),
                radius: CORNER_DISC_RADIUS,
            }
        }
    })
}

/// Distance along the ray to a two-sided disc, if hit.
fn ray_disc(origin: Vec3, dir: Vec3, disc: &PickTarget) -> Option<f32> {
    let denom = disc.normal.dot(dir);
    if denom.abs() < 1e-8 {
        return None;
    }
    let t = disc.normal.dot(disc.center - origin) / denom;
    if t < 0.0 {
        return None;
    }
    let hit = origin + dir * t;
    ((hit - disc.center).length_squared() <= disc.radius * disc.radius).then_some(t)
}

/// Camera for the HUD widget.
#[derive(Debug, Clone)]
pub struct HudCamera {
    settings: HudSettings,
    projection: Projection,
    orientation: Quat,
    viewport: Viewport,
}

impl HudCamera {
    pub fn new(settings: HudSettings, canvas_width: u32, canvas_height: u32) -> Self {
        let viewport = hud_viewport(canvas_width, canvas_height, settings.size);
        Self {
            settings,
            projection: Projection::Perspective,
            orientation: Quat::IDENTITY,
            viewport,
        }
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[inline]
    pub fn projection(&self) -> Projection {
        self.projection
    }

    #[inline]
    pub fn settings(&self) -> &HudSettings {
        &self.settings
    }

    /// Recomputes the viewport for a new canvas size.
    pub fn resize(&mut self, canvas_width: u32, canvas_height: u32) {
        self.viewport = hud_viewport(canvas_width, canvas_height, self.settings.size);
    }

    /// Mirrors the main camera: same orientation, same kind of projection.
    pub fn sync(&mut self, main_orientation: Quat, main_projection: Projection) {
        self.orientation = main_orientation;
        self.projection = main_projection;
    }

    /// HUD camera position, `distance` along the camera's local +Z.
    pub fn position(&self) -> Vec3 {
        self.orientation * Vec3::new(0.0, 0.0, self.settings.distance)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position()).inverse()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        // The widget is square unless the canvas is smaller than it.
        let aspect = self.viewport.extent().map_or(1.0, |(w, h)| w / h);
        match self.projection {
            Projection::Perspective => Mat4::perspective_rh(
                self.settings.fov_degrees.to_radians(),
                aspect,
                NEAR_PLANE,
                FAR_PLANE,
            ),
            Projection::Orthographic => {
                let s = self.settings.ortho_frustum_size;
                Mat4::orthographic_rh(-aspect * s, aspect * s, -s, s, NEAR_PLANE, FAR_PLANE)
            }
        }
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Casts a ray from a canvas pixel through the widget.
    ///
    /// Returns the preset of the nearest disc hit, or `None` when the pixel is
    /// outside the widget or hits nothing.
    pub fn pick(&self, px: f32, py: f32) -> Option<PresetId> {
        let (u, v) = self.viewport.local(px, py)?;
        let ndc_x = u * 2.0 - 1.0;
        let ndc_y = -(v * 2.0 - 1.0);

        let inv = self.view_proj().inverse();
        let near = inv * Vec4::new(ndc_x, ndc_y, 0.0, 1.0);
        let far = inv * Vec4::new(ndc_x, ndc_y, 1.0, 1.0);
        let near = near.truncate() / near.w;
        let far = far.truncate() / far.w;
        let dir = (far - near).normalize_or_zero();
        if dir == Vec3::ZERO {
            return None;
        }

        pick_targets()
            .iter()
            .filter_map(|disc| ray_disc(near, dir, disc).map(|t| (t, disc.preset)))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, preset)| preset)
    }
}

/// Vertex of the widget mesh.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct HudVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

const DISC_SEGMENTS: usize = 32;

fn face_color(id: PresetId) -> [f32; 4] {
    match id {
        PresetId::Right => [0.85, 0.25, 0.25, 1.0],
        PresetId::Left => [0.55, 0.15, 0.15, 1.0],
        PresetId::Back => [0.25, 0.8, 0.3, 1.0],
        PresetId::Front => [0.15, 0.5, 0.2, 1.0],
        PresetId::Top => [0.3, 0.45, 0.95, 1.0],
        PresetId::Bottom => [0.15, 0.25, 0.6, 1.0],
        _ => [1.0, 1.0, 0.0, 1.0],
    }
}

/// Triangle list for all pick discs.
pub fn widget_triangles() -> Vec<HudVertex> {
    let mut out = Vec::with_capacity(PresetId::COUNT * DISC_SEGMENTS * 3);
    for disc in pick_targets() {
        let color = face_color(disc.preset);
        let helper = if disc.normal.z.abs() < 0.9 { Vec3::Z } else { Vec3::X };
        let a = disc.normal.cross(helper).normalize();
        let b = disc.normal.cross(a);
        for i in 0..DISC_SEGMENTS {
            let t0 = i as f32 / DISC_SEGMENTS as f32 * std::f32::consts::TAU;
            let t1 = (i + 1) as f32 / DISC_SEGMENTS as f32 * std::f32::consts::TAU;
            let p0 = disc.center + (a * t0.cos() + b * t0.sin()) * disc.radius;
            let p1 = disc.center + (a * t1.cos() + b * t1.sin()) * disc.radius;
            for p in [disc.center, p0, p1] {
                out.push(HudVertex {
                    position: p.to_array(),
                    color,
                });
            }
        }
    }
    out
}

/// Line list for the X/Y/Z axes of the widget.
pub fn widget_axes() -> [HudVertex; 6] {
    crate::axes::axis_lines(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraPose;

    #[test]
    fn test_viewport_top_right() {
        let vp = hud_viewport(1280, 720, 256);
        assert_eq!(vp, Viewport { x: 1024, y: 0, width: 256, height: 256 });
    }

    #[test]
    fn test_viewport_clamped_to_small_canvas() {
        let vp = hud_viewport(200, 100, 256);
        assert_eq!(vp, Viewport { x: 0, y: 0, width: 200, height: 100 });
        assert!(!vp.is_empty());

        let minimized = hud_viewport(0, 0, 256);
        assert!(minimized.is_empty());
        assert_eq!(minimized.local(0.0, 0.0), None);
    }

    #[test]
    fn test_viewport_local() {
        let vp = hud_viewport(1000, 800, 200);
        assert_eq!(vp.local(900.0, 100.0), Some((0.5, 0.5)));
        assert_eq!(vp.local(700.0, 100.0), None);
        assert_eq!(vp.local(900.0, 300.0), None);
    }

    #[test]
    fn test_hud_camera_ignores_main_distance() {
        let mut hud = HudCamera::new(HudSettings::default(), 800, 600);
        let near = CameraPose {
            position: Vec3::new(2.0, -2.0, 2.0),
            target: Vec3::ZERO,
            up: Vec3::Z,
        };
        let far = CameraPose {
            position: near.position * 50.0,
            ..near
        };
        hud.sync(near.orientation(), Projection::Perspective);
        let a = hud.position();
        hud.sync(far.orientation(), Projection::Perspective);
        let b = hud.position();
        assert!((a - b).length() < 1e-4);
        assert!((a.length() - 3.25).abs() < 1e-4);
        assert!(a.normalize().dot(near.position.normalize()) > 0.9999);
    }

    fn synced(position: Vec3, up: Vec3, projection: Projection) -> HudCamera {
        let mut hud = HudCamera::new(HudSettings::default(), 800, 600);
        let pose = CameraPose {
            position,
            target: Vec3::ZERO,
            up,
        };
        hud.sync(pose.orientation(), projection);
        hud
    }

    #[test]
    fn test_pick_center_of_face() {
        // Viewport is x in 544..800, y in 0..256; its center looks at the origin.
        let hud = synced(Vec3::new(10.0, 0.0, 0.0), Vec3::Z, Projection::Perspective);
        assert_eq!(hud.pick(672.0, 128.0), Some(PresetId::Right));

        let hud = synced(Vec3::new(0.0, 0.0, -10.0), Vec3::NEG_Y, Projection::Orthographic);
        assert_eq!(hud.pick(672.0, 128.0), Some(PresetId::Bottom));
    }

    #[test]
    fn test_pick_corner_from_diagonal() {
        let hud = synced(Vec3::new(1.0, -1.0, 1.0), Vec3::Z, Projection::Perspective);
        assert_eq!(hud.pick(672.0, 128.0), Some(PresetId::FrontRightTop));
    }

    #[test]
    fn test_pick_outside_widget() {
        let hud = synced(Vec3::new(10.0, 0.0, 0.0), Vec3::Z, Projection::Perspective);
        assert_eq!(hud.pick(100.0, 500.0), None);
        // Inside the widget but past the edge of every disc.
        assert_eq!(hud.pick(545.0, 1.0), None);
    }

    #[test]
    fn test_widget_mesh_sizes() {
        assert_eq!(widget_triangles().len(), PresetId::COUNT * DISC_SEGMENTS * 3);
        assert_eq!(widget_axes().len(), 6);
    }
}
