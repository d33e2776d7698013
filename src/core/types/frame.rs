//! One sensor frame of point-cloud data.

use serde::{Deserialize, Serialize};

use super::point::PointCloud;

/// A single frame of raw point-cloud data as delivered by the sensor stack.
///
/// Timestamp and frame id are pass-through bookkeeping: the segmentation core
/// copies them onto its output but never interprets them. The frame id names
/// the coordinate frame the cloud is expressed in, which the transform seam
/// uses to decide whether a transform is needed.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CloudFrame {
    /// The raw points.
    pub cloud: PointCloud,
    /// Capture timestamp in microseconds since epoch.
    pub timestamp_us: u64,
    /// Coordinate frame the cloud is expressed in (e.g. "velodyne").
    pub frame_id: String,
}

impl CloudFrame {
    /// Create a new frame.
    pub fn new(cloud: PointCloud, timestamp_us: u64, frame_id: impl Into<String>) -> Self {
        Self {
            cloud,
            timestamp_us,
            frame_id: frame_id.into(),
        }
    }
}
