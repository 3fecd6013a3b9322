//! Slice stack geometry
//!
//! The slicer draws `resolution` square quads, all facing the camera, spaced
//! evenly through the region's depth range. Instance 0 is the farthest from
//! the camera, so drawing instances in index order composites back-to-front.

use std::fmt;

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::camera::{CameraPose, look_rotation};
use crate::region::{BoundingRegion, DepthExtents};

/// Number of slices drawn by the slicer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Resolution(u32);

impl Resolution {
    /// Resolutions offered to the user
    pub const SUPPORTED: [u32; 7] = [32, 64, 128, 256, 512, 1024, 2048];

    pub const DEFAULT: Resolution = Resolution(512);

    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }

    /// Next larger supported resolution, saturating at the top.
    pub fn step_up(self) -> Self {
        Self::SUPPORTED
            .iter()
            .find(|&&r| r > self.0)
            .map_or(self, |&r| Resolution(r))
    }

    /// Next smaller supported resolution, saturating at the bottom.
    pub fn step_down(self) -> Self {
        Self::SUPPORTED
            .iter()
            .rev()
            .find(|&&r| r < self.0)
            .map_or(self, |&r| Resolution(r))
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for Resolution {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if Self::SUPPORTED.contains(&value) {
            Ok(Resolution(value))
        } else {
            Err(format!(
                "unsupported resolution {value}, expected one of {:?}",
                Self::SUPPORTED
            ))
        }
    }
}

impl From<Resolution> for u32 {
    fn from(r: Resolution) -> u32 {
        r.0
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared frame of the slice stack for one camera position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceStack {
    /// Translates to the region center and turns local +Z toward the camera
    pub model: Mat4,
    pub extents: DepthExtents,
    pub count: u32,
}

/// Placement of a single slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceTransform {
    /// Maps the unit quad (`[-0.5, 0.5]^2` at z = 0) to world space
    pub model: Mat4,
    /// Offset of the slice from the center along the view axis
    pub depth: f32,
    /// Interpolation parameter in `[0, 1]`, 0 for the farthest slice
    pub t: f32,
}

impl SliceStack {
    /// Builds the stack for `count` slices. A count of 0 is treated as 1.
    pub fn new(region: &BoundingRegion, camera: &CameraPose, count: u32) -> Self {
        let center = region.center();
        let rotation = look_rotation(camera.position, center, camera.up);
        Self {
            model: Mat4::from_rotation_translation(rotation, center),
            extents: region.depth_extents(),
            count: count.max(1),
        }
    }

    /// Denominator shared by the depth step and the interpolation parameter.
    #[inline]
    fn denom(&self) -> f32 {
        (self.count as f32 - 1.0).max(1.0)
    }

    #[inline]
    pub fn step(&self) -> f32 {
        self.extents.diagonal / self.denom()
    }

    pub fn depth(&self, i: u32) -> f32 {
        self.extents.min_d + i as f32 * self.step()
    }

    pub fn slice(&self, i: u32) -> SliceTransform {
        let depth = self.depth(i);
        let d = self.extents.diagonal;
        SliceTransform {
            model: self.model
                * Mat4::from_translation(Vec3::new(0.0, 0.0, depth))
                * Mat4::from_scale(Vec3::new(d, d, 1.0)),
            depth,
            t: i as f32 / self.denom(),
        }
    }
}

/// All slice transforms for the current camera, in draw order.
pub fn compute_slice_transforms(region: &BoundingRegion, camera: &CameraPose, resolution: u32) -> Vec<SliceTransform> {
    let stack = SliceStack::new(region, camera, resolution);
    (0..stack.count).map(|i| stack.slice(i)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CameraRig, CameraSettings, PresetId};

    fn default_pose() -> CameraPose {
        CameraRig::new(BoundingRegion::default(), 1.0, CameraSettings::default()).pose()
    }

    fn slice_center(s: &SliceTransform) -> Vec3 {
        s.model.transform_point3(Vec3::ZERO)
    }

    #[test]
    fn test_resolution_parsing() {
        assert_eq!(Resolution::try_from(512).map(Resolution::get), Ok(512));
        assert!(Resolution::try_from(500).is_err());
        assert_eq!(Resolution::try_from(32).unwrap().step_down().get(), 32);
        assert_eq!(Resolution::try_from(2048).unwrap().step_up().get(), 2048);
        assert_eq!(Resolution::DEFAULT.step_up().get(), 1024);
    }

    #[test]
    fn test_count_matches_resolution_for_all_supported() {
        let region = BoundingRegion::default();
        let pose = default_pose();
        for r in Resolution::SUPPORTED {
            let slices = compute_slice_transforms(&region, &pose, r);
            assert_eq!(slices.len(), r as usize);
        }
    }

    #[test]
    fn test_back_to_front_order() {
        let region = BoundingRegion::new(Vec3::new(-1.0, -2.0, -3.0), Vec3::new(4.0, 2.0, 1.0));
        let mut rig = CameraRig::new(region, 1.5, CameraSettings::default());
        for id in PresetId::ALL {
            rig.apply_preset(id);
            let pose = rig.pose();
            for r in [32, 128, 2048] {
                let slices = compute_slice_transforms(&region, &pose, r);
                let dist: Vec<f32> = slices
                    .iter()
                    .map(|s| (slice_center(s) - pose.position).length())
                    .collect();
                for pair in dist.windows(2) {
                    assert!(pair[0] > pair[1], "{id:?} r={r}: {} <= {}", pair[0], pair[1]);
                }
            }
        }
    }

    #[test]
    fn test_slices_face_camera() {
        let region = BoundingRegion::default();
        let pose = default_pose();
        let to_camera = (pose.position - region.center()).normalize();
        for s in compute_slice_transforms(&region, &pose, 64) {
            let normal = s.model.transform_vector3(Vec3::Z).normalize();
            assert!(normal.dot(to_camera) > 0.9999);
        }
    }

    #[test]
    fn test_interpolation_parameter_spans_unit_range() {
        let slices = compute_slice_transforms(&BoundingRegion::default(), &default_pose(), 256);
        assert_eq!(slices[0].t, 0.0);
        assert!((slices[255].t - 1.0).abs() < 1e-6);
        let d = BoundingRegion::default().depth_extents();
        assert!((slices[0].depth - d.min_d).abs() < 1e-5);
        assert!((slices[255].depth - d.max_d).abs() < 1e-3);
    }

    #[test]
    fn test_single_slice_is_finite() {
        let slices = compute_slice_transforms(&BoundingRegion::default(), &default_pose(), 1);
        assert_eq!(slices.len(), 1);
        assert!(slices[0].model.is_finite());
        assert_eq!(slices[0].t, 0.0);
    }

    #[test]
    fn test_sphere_silhouette_is_circular_on_face_views() {
        // Sphere of radius 5 in [-5, 5]^3, seen through a 512-slice stack.
        let region = BoundingRegion::new(Vec3::splat(-5.0), Vec3::splat(5.0));
        let mut rig = CameraRig::new(region, 1.0, CameraSettings::default());
        let inside = |p: Vec3| region.contains(p) && p.length() <= 5.0;

        for id in &PresetId::ALL[..6] {
            rig.apply_preset(*id);
            let stack = SliceStack::new(&region, &rig.pose(), 512);
            let half = 0.5 * stack.extents.diagonal;

            for gy in -12..=12 {
                for gx in -12..=12 {
                    let (u, v) = (gx as f32 * 0.5, gy as f32 * 0.5);
                    let r = (u * u + v * v).sqrt();
                    if (r - 5.0).abs() < 0.25 || u.abs() > half || v.abs() > half {
                        continue;
                    }
                    let covered = (0..stack.count).any(|i| {
                        let local = Vec3::new(u, v, stack.depth(i));
                        inside(stack.model.transform_point3(local))
                    });
                    assert_eq!(covered, r < 5.0, "{id:?} at ({u}, {v})");
                }
            }
        }
    }
}
