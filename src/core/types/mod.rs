//! Core data types for point-cloud segmentation.
//!
//! - [`Point3`]: 3D point with intensity, in meters
//! - [`PointCloud`]: Collection of points in Cartesian coordinates
//! - [`CloudFrame`]: One sensor frame (cloud + timestamp + frame id)

mod frame;
mod point;

pub use frame::CloudFrame;
pub use point::{Point3, PointCloud};
