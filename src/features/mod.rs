//! BEV feature encoding layer.
//!
//! Rasterizes an unordered point cloud into a fixed-size grid of per-cell
//! statistical features, producing the inference input tensor and the
//! cell-to-points inverse index consumed by clustering.
//!
//! # Contents
//!
//! - [`BevGrid`]: pure point-to-cell indexing
//! - [`CellAccumulators`] / [`InverseIndex`]: per-frame scratch
//! - [`FeatureTensor`] / [`FeatureLayout`]: the model input contract
//! - [`FeatureEncoder`]: the per-frame builder

mod accumulator;
mod encoder;
mod grid;
mod tensor;

pub use accumulator::{CellAccumulators, InverseIndex};
pub use encoder::{EncodeSummary, FeatureEncoder};
pub use grid::{BevGrid, CellCoord};
pub use tensor::{FeatureChannel, FeatureLayout, FeatureTensor};
