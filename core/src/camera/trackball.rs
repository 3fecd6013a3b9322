//! Trackball-style orbit, zoom and pan
//!
//! Raw pointer events are fed in through [`Trackball::begin`],
//! [`Trackball::drag`], [`Trackball::end`] and [`Trackball::wheel`]; once per
//! frame [`Trackball::update`] applies the accumulated motion to a
//! [`CameraPose`].

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::{CameraPose, Projection};

/// Controller tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackballSettings {
    #[serde(default = "default_rotate_speed")]
    pub rotate_speed: f32,
    #[serde(default = "default_zoom_speed")]
    pub zoom_speed: f32,
    #[serde(default = "default_pan_speed")]
    pub pan_speed: f32,
    /// Stop immediately on release instead of coasting (default: true)
    #[serde(default = "default_true")]
    pub static_moving: bool,
    /// Per-frame velocity decay when coasting (default: 0.3)
    #[serde(default = "default_damping")]
    pub damping_factor: f32,
    #[serde(default)]
    pub min_distance: f32,
    #[serde(default = "default_max_distance")]
    pub max_distance: f32,
}

fn default_rotate_speed() -> f32 {
    2.0
}
fn default_zoom_speed() -> f32 {
    1.2
}
fn default_pan_speed() -> f32 {
    0.8
}
fn default_true() -> bool {
    true
}
fn default_damping() -> f32 {
    0.3
}
fn default_max_distance() -> f32 {
    f32::MAX
}

impl Default for TrackballSettings {
    fn default() -> Self {
        Self {
            rotate_speed: default_rotate_speed(),
            zoom_speed: default_zoom_speed(),
            pan_speed: default_pan_speed(),
            static_moving: default_true(),
            damping_factor: default_damping(),
            min_distance: 0.0,
            max_distance: default_max_distance(),
        }
    }
}

/// Interaction started by a pointer press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Rotate,
    Zoom,
    Pan,
}

/// Scroll amount. Positive values move away from the content (zoom out).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WheelDelta {
    Lines(f32),
    Pixels(f32),
}

/// Outcome of one [`Trackball::update`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlStep {
    /// Pose changed
    pub moved: bool,
    /// Zoom factor for this step; `1.0` when there was none. In orthographic
    /// mode the eye is left alone and the caller scales the frustum instead.
    pub zoom: f32,
}

/// Screen rectangle the pointer coordinates are relative to.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Screen {
    left: f32,
    top: f32,
    width: f32,
    height: f32,
}

#[derive(Debug, Clone)]
pub struct Trackball {
    settings: TrackballSettings,
    screen: Screen,
    state: Option<DragMode>,

    move_prev: Vec2,
    move_curr: Vec2,
    last_axis: Vec3,
    last_angle: f32,

    zoom_start: Vec2,
    zoom_end: Vec2,

    pan_start: Vec2,
    pan_end: Vec2,
}

impl Trackball {
    pub fn new(settings: TrackballSettings, width: u32, height: u32) -> Self {
        let mut tb = Self {
            settings,
            screen: Screen {
                left: 0.0,
                top: 0.0,
                width: 1.0,
                height: 1.0,
            },
            state: None,
            move_prev: Vec2::ZERO,
            move_curr: Vec2::ZERO,
            last_axis: Vec3::ZERO,
            last_angle: 0.0,
            zoom_start: Vec2::ZERO,
            zoom_end: Vec2::ZERO,
            pan_start: Vec2::ZERO,
            pan_end: Vec2::ZERO,
        };
        tb.handle_resize(width, height);
        tb
    }

    #[inline]
    pub fn settings(&self) -> &TrackballSettings {
        &self.settings
    }

    #[inline]
    pub fn active(&self) -> Option<DragMode> {
        self.state
    }

    pub fn handle_resize(&mut self, width: u32, height: u32) {
        self.screen.width = width.max(1) as f32;
        self.screen.height = height.max(1) as f32;
    }

    /// Pointer position in `[0, 1]` screen units.
    fn mouse_on_screen(&self, x: f32, y: f32) -> Vec2 {
        Vec2::new(
            (x - self.screen.left) / self.screen.width,
            (y - self.screen.top) / self.screen.height,
        )
    }

    /// Pointer position on the virtual trackball, both axes scaled by width.
    fn mouse_on_circle(&self, x: f32, y: f32) -> Vec2 {
        Vec2::new(
            (x - self.screen.width * 0.5 - self.screen.left) / (self.screen.width * 0.5),
            (self.screen.height + 2.0 * (self.screen.top - y)) / self.screen.width,
        )
    }

    pub fn begin(&mut self, mode: DragMode, x: f32, y: f32) {
        if self.state.is_some() {
            return;
        }
        self.state = Some(mode);
        match mode {
            DragMode::Rotate => {
                self.move_curr = self.mouse_on_circle(x, y);
                self.move_prev = self.move_curr;
            }
            DragMode::Zoom => {
                self.zoom_start = self.mouse_on_screen(x, y);
                self.zoom_end = self.zoom_start;
            }
            DragMode::Pan => {
                self.pan_start = self.mouse_on_screen(x, y);
                self.pan_end = self.pan_start;
            }
        }
    }

    pub fn drag(&mut self, x: f32, y: f32) {
        match self.state {
            Some(DragMode::Rotate) => {
                self.move_prev = self.move_curr;
                self.move_curr = self.mouse_on_circle(x, y);
            }
            Some(DragMode::Zoom) => self.zoom_end = self.mouse_on_screen(x, y),
            Some(DragMode::Pan) => self.pan_end = self.mouse_on_screen(x, y),
            None => {}
        }
    }

    pub fn end(&mut self) {
        self.state = None;
    }

    pub fn wheel(&mut self, delta: WheelDelta) {
        match delta {
            WheelDelta::Lines(lines) => self.zoom_start.y -= lines * 0.01,
            WheelDelta::Pixels(pixels) => self.zoom_start.y -= pixels * 0.00025,
        }
    }

    /// Stops any coasting motion.
    pub fn reset(&mut self) {
        self.state = None;
        self.move_prev = self.move_curr;
        self.last_angle = 0.0;
        self.zoom_start = self.zoom_end;
        self.pan_start = self.pan_end;
    }

    /// Applies accumulated input to `pose`.
    pub fn update(&mut self, pose: &mut CameraPose, projection: Projection) -> ControlStep {
        let before = *pose;
        let mut eye = pose.eye();

        self.rotate(&mut eye, &mut pose.up);
        let zoom = self.zoom(&mut eye, projection);
        self.pan(eye, pose);

        pose.position = pose.target + eye;
        self.check_distances(pose);

        let moved = (pose.position - before.position).length_squared() > 1e-12
            || (pose.target - before.target).length_squared() > 1e-12
            || (pose.up - before.up).length_squared() > 1e-12;
        ControlStep { moved, zoom }
    }

    fn rotate(&mut self, eye: &mut Vec3, up: &mut Vec3) {
        let delta = self.move_curr - self.move_prev;
        let mut angle = delta.length();

        if angle > 0.0 {
            let eye_dir = eye.normalize_or_zero();
            let object_up = up.normalize_or_zero();
            let sideways = object_up.cross(eye_dir).normalize_or_zero();

            let move_dir = object_up * delta.y + sideways * delta.x;
            let axis = move_dir.cross(*eye).normalize_or_zero();

            angle *= self.settings.rotate_speed;
            if axis != Vec3::ZERO {
                let q = Quat::from_axis_angle(axis, angle);
                *eye = q * *eye;
                *up = q * *up;
            }
            self.last_axis = axis;
            self.last_angle = angle;
        } else if !self.settings.static_moving && self.last_angle != 0.0 && self.last_axis != Vec3::ZERO {
            self.last_angle *= (1.0 - self.settings.damping_factor).sqrt();
            let q = Quat::from_axis_angle(self.last_axis, self.last_angle);
            *eye = q * *eye;
            *up = q * *up;
            if self.last_angle.abs() < 1e-6 {
                self.last_angle = 0.0;
            }
        }

        self.move_prev = self.move_curr;
    }

    fn zoom(&mut self, eye: &mut Vec3, projection: Projection) -> f32 {
        let factor = 1.0 + (self.zoom_end.y - self.zoom_start.y) * self.settings.zoom_speed;
        let mut applied = 1.0;
        if factor != 1.0 && factor > 0.0 {
            if projection == Projection::Perspective {
                *eye *= factor;
            }
            applied = factor;
        }

        if self.settings.static_moving {
            self.zoom_start = self.zoom_end;
        } else {
            self.zoom_start.y += (self.zoom_end.y - self.zoom_start.y) * self.settings.damping_factor;
        }
        applied
    }

    fn pan(&mut self, eye: Vec3, pose: &mut CameraPose) {
        let mut change = self.pan_end - self.pan_start;
        if change.length_squared() == 0.0 {
            return;
        }

        change *= eye.length() * self.settings.pan_speed;
        let pan = eye.cross(pose.up).normalize_or_zero() * change.x + pose.up.normalize_or_zero() * change.y;
        pose.position += pan;
        pose.target += pan;

        if self.settings.static_moving {
            self.pan_start = self.pan_end;
        } else {
            self.pan_start += (self.pan_end - self.pan_start) * self.settings.damping_factor;
        }
    }

    fn check_distances(&mut self, pose: &mut CameraPose) {
        let eye = pose.eye();
        let max = self.settings.max_distance;
        let min = self.settings.min_distance;
        if eye.length_squared() > max * max {
            pose.position = pose.target + eye.normalize() * max;
            self.zoom_start = self.zoom_end;
        }
        let eye = pose.eye();
        if eye.length_squared() < min * min {
            pose.position = pose.target + eye.normalize_or(Vec3::Z) * min;
            self.zoom_start = self.zoom_end;
        }
    }
}
