//! Axis-aligned bounding region of the visualized field
//!
//! The region is the single source of truth for spatial extents. Cameras are
//! framed from it and slice depths are derived from it.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// One of the three world axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Which face of the region an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bound {
    Min,
    Max,
}

/// Depth range of the region along the camera axis, measured from its center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthExtents {
    /// Signed distance from the center to the far corner (always <= 0)
    pub min_d: f32,
    /// Distance from the center to the near corner (always >= 0)
    pub max_d: f32,
    /// `max_d - min_d`, replaced by 1.0 for degenerate regions
    pub diagonal: f32,
}

/// Result of an interactive edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegionEdit {
    /// Any bound moved
    pub changed: bool,
    /// The region's size changed, so cameras should be re-framed
    pub resized: bool,
}

/// Axis-aligned box with `min[i] <= max[i]` on every axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RegionCorners")]
pub struct BoundingRegion {
    min: Vec3,
    max: Vec3,
}

/// Corners as written in config and session files, possibly unsorted.
#[derive(Deserialize)]
struct RegionCorners {
    min: Vec3,
    max: Vec3,
}

impl From<RegionCorners> for BoundingRegion {
    fn from(corners: RegionCorners) -> Self {
        Self::new(corners.min, corners.max)
    }
}

impl Default for BoundingRegion {
    fn default() -> Self {
        Self {
            min: Vec3::splat(-5.0),
            max: Vec3::splat(5.0),
        }
    }
}

impl BoundingRegion {
    /// Creates a region from two corners. Corners are sorted per axis.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    #[inline]
    pub fn min(&self) -> Vec3 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> Vec3 {
        self.max
    }

    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        0.5 * (self.min + self.max)
    }

    /// Half the length of the main diagonal.
    #[inline]
    pub fn radius(&self) -> f32 {
        0.5 * self.size().length()
    }

    #[inline]
    pub fn diagonal(&self) -> f32 {
        self.size().length()
    }

    /// Radius used for camera framing; falls back to 1.0 for a point region.
    pub fn framing_radius(&self) -> f32 {
        let r = self.radius();
        if r <= 0.0 { 1.0 } else { r }
    }

    /// Camera distance at which the bounding sphere exactly fits a vertical FOV.
    pub fn reset_distance(&self, fov_y_degrees: f32) -> f32 {
        self.framing_radius() / (0.5 * fov_y_degrees.to_radians()).tan()
    }

    /// Depth range used to stack slices around the center.
    pub fn depth_extents(&self) -> DepthExtents {
        let center = self.center();
        let min_d = -(center - self.min).length();
        let max_d = (self.max - center).length();
        let mut diagonal = max_d - min_d;
        if diagonal <= 0.0 {
            diagonal = 1.0;
        }
        DepthExtents {
            min_d,
            max_d,
            diagonal,
        }
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Sets one bound on one axis.
    ///
    /// If the new value crosses the paired bound, the paired bound is snapped
    /// to the same value instead of rejecting the edit.
    pub fn clamp_edit(&mut self, bound: Bound, axis: Axis, value: f32) -> RegionEdit {
        if !value.is_finite() {
            return RegionEdit::default();
        }
        let before = *self;
        let i = axis.index();
        match bound {
            Bound::Min => {
                self.min[i] = value;
                if self.max[i] < value {
                    self.max[i] = value;
                }
            }
            Bound::Max => {
                self.max[i] = value;
                if self.min[i] > value {
                    self.min[i] = value;
                }
            }
        }
        RegionEdit {
            changed: before != *self,
            resized: before.size() != self.size(),
        }
    }

    /// Replaces the whole region, reporting what changed.
    pub fn replace(&mut self, other: BoundingRegion) -> RegionEdit {
        let before = *self;
        *self = other;
        RegionEdit {
            changed: before != other,
            resized: before.size() != other.size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_ordered(r: &BoundingRegion) {
        for axis in Axis::ALL {
            let i = axis.index();
            assert!(r.min()[i] <= r.max()[i], "axis {axis:?} inverted: {r:?}");
        }
    }

    #[test]
    fn test_derived_values() {
        let r = BoundingRegion::new(Vec3::splat(-5.0), Vec3::splat(5.0));
        assert_eq!(r.center(), Vec3::ZERO);
        assert!((r.diagonal() - 300.0f32.sqrt()).abs() < 1e-4);
        assert!((r.radius() - 0.5 * 300.0f32.sqrt()).abs() < 1e-4);
    }

    #[test]
    fn test_new_sorts_corners() {
        let r = BoundingRegion::new(Vec3::new(1.0, -2.0, 3.0), Vec3::new(-1.0, 2.0, -3.0));
        assert_eq!(r.min(), Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(r.max(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_deserialize_sorts_corners() {
        let json = r#"{"min":[4.0,-1.0,2.0],"max":[-4.0,1.0,-2.0]}"#;
        let r: BoundingRegion = serde_json::from_str(json).unwrap();
        assert_eq!(r.min(), Vec3::new(-4.0, -1.0, -2.0));
        assert_eq!(r.max(), Vec3::new(4.0, 1.0, 2.0));
        assert_ordered(&r);
    }

    #[test]
    fn test_clamp_edit_min_above_max_snaps_max() {
        let mut r = BoundingRegion::default();
        let edit = r.clamp_edit(Bound::Min, Axis::X, 7.0);
        assert_eq!(r.min().x, 7.0);
        assert_eq!(r.max().x, 7.0);
        assert!(edit.changed && edit.resized);
        assert_ordered(&r);
    }

    #[test]
    fn test_clamp_edit_max_below_min_snaps_min() {
        let mut r = BoundingRegion::default();
        r.clamp_edit(Bound::Max, Axis::Z, -9.0);
        assert_eq!(r.min().z, -9.0);
        assert_eq!(r.max().z, -9.0);
        assert_ordered(&r);
    }

    #[test]
    fn test_clamp_edit_never_inverts() {
        let values = [-100.0, -5.0, -0.5, 0.0, 0.25, 5.0, 42.0];
        for bound in [Bound::Min, Bound::Max] {
            for axis in Axis::ALL {
                for &v in &values {
                    let mut r = BoundingRegion::new(Vec3::new(-1.0, -2.0, -3.0), Vec3::new(4.0, 5.0, 6.0));
                    r.clamp_edit(bound, axis, v);
                    assert_ordered(&r);
                }
            }
        }
    }

    #[test]
    fn test_clamp_edit_noop_reports_unchanged() {
        let mut r = BoundingRegion::default();
        let edit = r.clamp_edit(Bound::Max, Axis::Y, 5.0);
        assert_eq!(edit, RegionEdit::default());
    }

    #[test]
    fn test_clamp_edit_rejects_nan() {
        let mut r = BoundingRegion::default();
        let edit = r.clamp_edit(Bound::Min, Axis::X, f32::NAN);
        assert!(!edit.changed);
        assert_eq!(r, BoundingRegion::default());
    }

    #[test]
    fn test_translate_without_resize() {
        let mut r = BoundingRegion::default();
        let edit = r.replace(BoundingRegion::new(Vec3::splat(-4.0), Vec3::splat(6.0)));
        assert!(edit.changed);
        assert!(!edit.resized);
    }

    #[test]
    fn test_depth_extents() {
        let r = BoundingRegion::default();
        let d = r.depth_extents();
        assert!((d.min_d + r.radius()).abs() < 1e-5);
        assert!((d.max_d - r.radius()).abs() < 1e-5);
        assert!((d.diagonal - r.diagonal()).abs() < 1e-4);
    }

    #[test]
    fn test_degenerate_region() {
        let r = BoundingRegion::new(Vec3::ONE, Vec3::ONE);
        assert_eq!(r.depth_extents().diagonal, 1.0);
        assert_eq!(r.framing_radius(), 1.0);
    }

    #[test]
    fn test_reset_distance_fits_sphere() {
        let r = BoundingRegion::default();
        let d = r.reset_distance(75.0);
        let half = (37.5f32).to_radians();
        assert!((d * half.tan() - r.radius()).abs() < 1e-4);
    }
}
