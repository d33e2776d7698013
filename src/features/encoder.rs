//! Feature map builder: rasterizes a point cloud into the BEV feature tensor
//! and the cell-to-points inverse index.
//!
//! One pass over the points feeds the per-cell accumulators, then per-cell
//! statistics are derived into the fixed-layout tensor. All storage is
//! allocated at construction and reused across frames.

use crate::config::{BevGridConfig, FeatureConfig};
use crate::core::PointCloud;

use super::accumulator::{CellAccumulators, InverseIndex};
use super::grid::BevGrid;
use super::tensor::{FeatureChannel, FeatureLayout, FeatureTensor};

/// Counters for one encoding pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncodeSummary {
    /// Points written into the grid.
    pub indexed: usize,
    /// Points dropped for non-finite coordinates.
    pub dropped_non_finite: usize,
    /// Points dropped for lying outside the grid extent.
    pub dropped_out_of_range: usize,
}

/// Builds the feature tensor and inverse index for each frame.
pub struct FeatureEncoder {
    grid: BevGrid,
    z_offset: f32,
    accumulators: CellAccumulators,
    inverse_index: InverseIndex,
    tensor: FeatureTensor,
    /// Precomputed direction plane (empty when constant channels are off).
    direction: Vec<f32>,
    /// Precomputed distance plane (empty when constant channels are off).
    distance: Vec<f32>,
}

impl FeatureEncoder {
    /// Create an encoder for the given grid and feature configuration.
    pub fn new(grid_config: &BevGridConfig, feature_config: &FeatureConfig) -> Self {
        let grid = BevGrid::new(grid_config);
        let layout = FeatureLayout::from_config(feature_config);
        let cell_count = grid.cell_count();

        let (direction, distance) = if feature_config.use_constant {
            Self::precompute_constant_planes(&grid)
        } else {
            (Vec::new(), Vec::new())
        };

        Self {
            grid,
            z_offset: feature_config.z_offset,
            accumulators: CellAccumulators::new(cell_count),
            inverse_index: InverseIndex::new(cell_count),
            tensor: FeatureTensor::new(layout, grid.height(), grid.width()),
            direction,
            distance,
        }
    }

    /// The grid geometry this encoder rasterizes into.
    #[inline]
    pub fn grid(&self) -> &BevGrid {
        &self.grid
    }

    /// The tensor produced by the latest [`encode`](Self::encode) call.
    #[inline]
    pub fn tensor(&self) -> &FeatureTensor {
        &self.tensor
    }

    /// The inverse index produced by the latest [`encode`](Self::encode) call.
    #[inline]
    pub fn inverse_index(&self) -> &InverseIndex {
        &self.inverse_index
    }

    /// Rasterize one frame's cloud.
    ///
    /// Non-finite and out-of-range points are skipped silently; neither is an
    /// error. The tensor is always fully populated afterwards (empty cells
    /// hold the documented zero defaults).
    pub fn encode(&mut self, cloud: &PointCloud) -> EncodeSummary {
        self.accumulators.reset();
        self.inverse_index.reset();

        let mut summary = EncodeSummary::default();
        for (index, point) in cloud.iter().enumerate() {
            if !point.is_finite() {
                summary.dropped_non_finite += 1;
                continue;
            }
            match self.grid.locate_flat(point.x, point.y) {
                Some(cell) => {
                    self.accumulators
                        .observe(cell, point.z + self.z_offset, point.intensity);
                    self.inverse_index.push(cell, index as u32);
                    summary.indexed += 1;
                }
                None => summary.dropped_out_of_range += 1,
            }
        }

        self.derive_channels();

        log::debug!(
            "encoded {} points ({} non-finite, {} out of range dropped)",
            summary.indexed,
            summary.dropped_non_finite,
            summary.dropped_out_of_range
        );
        summary
    }

    /// Write final per-cell features from the raw accumulators.
    fn derive_channels(&mut self) {
        let cell_count = self.grid.cell_count();

        for position in 0..self.tensor.channel_count() {
            let channel = self.tensor.layout().channels()[position];
            let plane = self.tensor.channel_mut(position);
            match channel {
                FeatureChannel::MaxHeight => {
                    for cell in 0..cell_count {
                        plane[cell] = self.accumulators.max_height(cell);
                    }
                }
                FeatureChannel::MeanHeight => {
                    for cell in 0..cell_count {
                        plane[cell] = self.accumulators.mean_height(cell);
                    }
                }
                FeatureChannel::LogCount => {
                    for cell in 0..cell_count {
                        plane[cell] = (self.accumulators.count(cell) as f32 + 1.0).log2();
                    }
                }
                FeatureChannel::TopIntensity => {
                    for cell in 0..cell_count {
                        plane[cell] = self.accumulators.top_intensity(cell);
                    }
                }
                FeatureChannel::MeanIntensity => {
                    for cell in 0..cell_count {
                        plane[cell] = self.accumulators.mean_intensity(cell);
                    }
                }
                FeatureChannel::Direction => plane.copy_from_slice(&self.direction),
                FeatureChannel::Distance => plane.copy_from_slice(&self.distance),
                FeatureChannel::NonEmpty => {
                    for cell in 0..cell_count {
                        plane[cell] = if self.accumulators.is_nonempty(cell) {
                            1.0
                        } else {
                            0.0
                        };
                    }
                }
            }
        }
    }

    /// Cell-position channels depend only on geometry; compute them once.
    fn precompute_constant_planes(grid: &BevGrid) -> (Vec<f32>, Vec<f32>) {
        let cell_count = grid.cell_count();
        let mut direction = vec![0.0; cell_count];
        let mut distance = vec![0.0; cell_count];
        for index in 0..cell_count {
            let (cx, cy) = grid.cell_center(grid.coord(index));
            direction[index] = cy.atan2(cx) / (2.0 * std::f32::consts::PI);
            distance[index] = cx.hypot(cy) / grid.range() - 0.5;
        }
        (direction, distance)
    }
}
