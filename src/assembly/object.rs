//! Emitted object hypothesis and its bounding representation.

use serde::{Deserialize, Serialize};

use crate::core::Point3;

/// Axis-aligned 3D bounding box over an object's member points.
///
/// The empty box has min > max on every axis, so it expands to fit any point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds3 {
    /// Minimum corner.
    pub min: [f32; 3],
    /// Maximum corner.
    pub max: [f32; 3],
}

impl Default for Bounds3 {
    fn default() -> Self {
        Self::empty()
    }
}

impl Bounds3 {
    /// Create an empty (invalid) box.
    #[inline]
    pub fn empty() -> Self {
        Self {
            min: [f32::INFINITY; 3],
            max: [f32::NEG_INFINITY; 3],
        }
    }

    /// Check if the box is empty (no point folded in yet).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min[0] > self.max[0]
    }

    /// Grow the box to include a point.
    #[inline]
    pub fn expand_to_include(&mut self, point: &Point3) {
        self.min[0] = self.min[0].min(point.x);
        self.min[1] = self.min[1].min(point.y);
        self.min[2] = self.min[2].min(point.z);
        self.max[0] = self.max[0].max(point.x);
        self.max[1] = self.max[1].max(point.y);
        self.max[2] = self.max[2].max(point.z);
    }

    /// Extent along each axis (zero for the empty box).
    pub fn size(&self) -> [f32; 3] {
        if self.is_empty() {
            return [0.0; 3];
        }
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    /// Center of the box.
    pub fn center(&self) -> [f32; 3] {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        ]
    }
}

/// One segmented object hypothesis. Immutable once emitted.
///
/// Point indices refer to the frame's point buffer; shape extraction beyond
/// the axis-aligned bounds happens downstream.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SegmentedObject {
    /// Member point indices into the frame's point buffer.
    pub point_indices: Vec<u32>,
    /// Aggregate objectness over member cells.
    pub score: f32,
    /// Aggregate category confidence over member cells.
    pub category_confidence: f32,
    /// Aggregate predicted object height over member cells, meters.
    pub predicted_height: f32,
    /// Vertical extent of the member points (max z - min z), meters.
    pub height_range: f32,
    /// Number of member points.
    pub point_count: usize,
    /// Axis-aligned bounds of the member points.
    pub bounds: Bounds3,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_bounds() {
        let bounds = Bounds3::empty();
        assert!(bounds.is_empty());
        assert_eq!(bounds.size(), [0.0; 3]);
    }

    #[test]
    fn test_expand_to_include() {
        let mut bounds = Bounds3::empty();
        bounds.expand_to_include(&Point3::new(1.0, 2.0, 3.0, 0.0));
        bounds.expand_to_include(&Point3::new(-1.0, 4.0, 0.0, 0.0));

        assert!(!bounds.is_empty());
        assert_eq!(bounds.min, [-1.0, 2.0, 0.0]);
        assert_eq!(bounds.max, [1.0, 4.0, 3.0]);
        assert_eq!(bounds.size(), [2.0, 2.0, 3.0]);
        assert_eq!(bounds.center(), [0.0, 3.0, 1.5]);
    }

    #[test]
    fn test_single_point_bounds() {
        let mut bounds = Bounds3::empty();
        bounds.expand_to_include(&Point3::new(5.0, -2.0, 1.0, 0.0));
        assert_eq!(bounds.size(), [0.0, 0.0, 0.0]);
        assert_eq!(bounds.center(), [5.0, -2.0, 1.0]);
    }
}
