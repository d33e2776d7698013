//! Coordinate-frame transform seam.
//!
//! Frame lookup and rigid-body transforms are an external collaborator; the
//! core only consumes them through [`CloudTransformer`]. A transform failure
//! skips the whole frame — recoverable, never process-fatal.

use thiserror::Error;

use crate::core::{CloudFrame, PointCloud};

/// Transform errors.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("no transform from '{from}' to '{to}' available")]
    Unavailable {
        /// Source frame id.
        from: String,
        /// Requested target frame id.
        to: String,
    },

    #[error("transform lookup failed: {0}")]
    Lookup(String),
}

/// Fallible transform of a cloud into a target coordinate frame.
pub trait CloudTransformer {
    /// Return the frame's cloud expressed in `target_frame`.
    fn transform(&self, frame: &CloudFrame, target_frame: &str)
    -> Result<PointCloud, TransformError>;
}

/// Pass-through transformer for inputs already in the target frame.
///
/// Errors on any actual frame change, which makes mismatched wiring visible
/// on the first frame instead of producing silently-wrong geometry.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityTransform;

impl CloudTransformer for IdentityTransform {
    fn transform(
        &self,
        frame: &CloudFrame,
        target_frame: &str,
    ) -> Result<PointCloud, TransformError> {
        if frame.frame_id == target_frame {
            Ok(frame.cloud.clone())
        } else {
            Err(TransformError::Unavailable {
                from: frame.frame_id.clone(),
                to: target_frame.to_string(),
            })
        }
    }
}
