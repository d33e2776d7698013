//! Orchestration layer.
//!
//! Ties the feature encoder, inference backend, clusterer, and assembler
//! into the per-frame pipeline, behind the external transform seam.
//!
//! # Contents
//!
//! - [`SegmentationEngine`]: transform → encode → infer → cluster → assemble
//! - [`CloudTransformer`] / [`IdentityTransform`]: the transform boundary
//! - [`FrameError`]: per-frame recoverable failures

mod segmentation;
mod transform;

pub use segmentation::{FrameError, SegmentationEngine, SegmentationOutput};
pub use transform::{CloudTransformer, IdentityTransform, TransformError};
