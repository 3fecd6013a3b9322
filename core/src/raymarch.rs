//! CPU reference for the raymarch renderer
//!
//! The fragment kernel in the viewer follows these functions step for step,
//! so their behavior (step counts, bail-out, shading) can be tested without a
//! GPU.

use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Tunables of the sphere tracer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaymarchSettings {
    /// Don't take more steps than this
    pub max_steps: u32,
    /// A sample closer than this to the surface counts as a hit
    pub hit_epsilon: f32,
    /// Offset of the tetrahedral normal samples
    pub normal_epsilon: f32,
    /// The march gives up once `t` exceeds `diagonal * max_distance_factor`
    pub max_distance_factor: f32,
    /// Minimum diffuse term, so surfaces facing away stay visible
    pub ambient_floor: f32,
    pub fov_degrees: f32,
}

impl Default for RaymarchSettings {
    fn default() -> Self {
        Self {
            max_steps: 256,
            hit_epsilon: 0.001,
            normal_epsilon: 0.001,
            max_distance_factor: 2.0,
            ambient_floor: 0.2,
            fov_degrees: 75.0,
        }
    }
}

/// Direction of the single directional light.
pub fn light_direction() -> Vec3 {
    Vec3::new(0.5, 1.0, 0.5).normalize()
}

/// Base color of every raymarched surface.
pub const SURFACE_COLOR: Vec3 = Vec3::new(1.0, 0.5, 0.2);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length
    pub dir: Vec3,
}

impl Ray {
    #[inline]
    pub fn point_along(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }
}

/// Primary ray through `uv` (NDC, each component in `[-1, 1]`, +y up).
///
/// `inv_model_view` maps view space back to field space; its translation is
/// the ray origin.
pub fn primary_ray(uv: Vec2, aspect: f32, inv_model_view: Mat4, settings: &RaymarchSettings) -> Ray {
    let half = (0.5 * settings.fov_degrees.to_radians()).tan();
    let view_dir = Vec3::new(uv.x * half * aspect, uv.y * half, -1.0).normalize();
    Ray {
        origin: inv_model_view.transform_point3(Vec3::ZERO),
        dir: inv_model_view.transform_vector3(view_dir).normalize(),
    }
}

/// Why a march ended without hitting anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    /// `t` went past the distance limit
    Bailout,
    /// The step budget ran out
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TraceOutcome {
    Hit { t: f32, steps: u32 },
    Miss { reason: MissReason, steps: u32 },
}

impl TraceOutcome {
    pub fn is_hit(&self) -> bool {
        matches!(self, TraceOutcome::Hit { .. })
    }

    pub fn steps(&self) -> u32 {
        match *self {
            TraceOutcome::Hit { steps, .. } | TraceOutcome::Miss { steps, .. } => steps,
        }
    }
}

/// Sphere-traces `ray` through the signed distance field `sd`.
///
/// `sd` must never overestimate the distance to the surface. Fields that do
/// (such as material densities) can step through geometry; the march is still
/// bounded by `settings.max_steps`.
pub fn sphere_trace(
    mut sd: impl FnMut(Vec3) -> f32,
    ray: Ray,
    diagonal: f32,
    settings: &RaymarchSettings,
) -> TraceOutcome {
    let limit = diagonal * settings.max_distance_factor;
    let mut t = 0.0;
    for step in 0..settings.max_steps {
        let d = sd(ray.point_along(t));
        if d < settings.hit_epsilon {
            return TraceOutcome::Hit { t, steps: step + 1 };
        }
        t += d;
        if t > limit {
            return TraceOutcome::Miss {
                reason: MissReason::Bailout,
                steps: step + 1,
            };
        }
    }
    TraceOutcome::Miss {
        reason: MissReason::Exhausted,
        steps: settings.max_steps,
    }
}

/// Surface normal from four tetrahedral samples of `sd` around `p`.
pub fn estimate_normal(mut sd: impl FnMut(Vec3) -> f32, p: Vec3, epsilon: f32) -> Vec3 {
    let k0 = Vec3::new(1.0, -1.0, -1.0);
    let k1 = Vec3::new(-1.0, -1.0, 1.0);
    let k2 = Vec3::new(-1.0, 1.0, -1.0);
    let k3 = Vec3::new(1.0, 1.0, 1.0);
    let n = k0 * sd(p + k0 * epsilon)
        + k1 * sd(p + k1 * epsilon)
        + k2 * sd(p + k2 * epsilon)
        + k3 * sd(p + k3 * epsilon);
    n.normalize_or_zero()
}

/// Lambert shading with an ambient floor.
pub fn shade(normal: Vec3, settings: &RaymarchSettings) -> Vec3 {
    let diffuse = normal.dot(light_direction()).max(settings.ambient_floor);
    SURFACE_COLOR * diffuse
}

/// Full per-pixel evaluation: `None` where the fragment is discarded.
pub fn render_pixel(
    mut sd: impl FnMut(Vec3) -> f32,
    uv: Vec2,
    aspect: f32,
    inv_model_view: Mat4,
    diagonal: f32,
    settings: &RaymarchSettings,
) -> Option<Vec3> {
    let ray = primary_ray(uv, aspect, inv_model_view, settings);
    match sphere_trace(&mut sd, ray, diagonal, settings) {
        TraceOutcome::Hit { t, .. } => {
            let n = estimate_normal(&mut sd, ray.point_along(t), settings.normal_epsilon);
            Some(shade(n, settings))
        }
        TraceOutcome::Miss { .. } => None,
    }
}
