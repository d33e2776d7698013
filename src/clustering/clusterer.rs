//! Offset-driven grid clustering.
//!
//! Points belonging to one physical object can land in grid cells that are
//! not adjacent (an L-shaped vehicle spanning a corner), so plain
//! 4/8-connectivity under-merges. Each eligible cell instead carries a
//! learned vector pointing toward its object's estimated center; cells whose
//! vectors land on each other are merged with a disjoint-set structure.

use crate::config::BevGridConfig;
use crate::features::{BevGrid, CellCoord, InverseIndex};
use crate::inference::PredictionMap;

use super::union_find::DisjointSet;

/// A maximal set of grid cells joined by the offset merge rule, with the
/// union of their contributing point indices.
#[derive(Clone, Debug, Default)]
pub struct CellCluster {
    /// Member cells as flat indices, ascending (row-major order).
    pub cells: Vec<usize>,
    /// Member point indices: each member cell's list in cell order,
    /// preserving per-cell insertion order.
    pub point_indices: Vec<u32>,
}

impl CellCluster {
    /// Smallest member cell index; clusters are ordered by this.
    #[inline]
    pub fn min_cell(&self) -> usize {
        self.cells[0]
    }

    /// Number of member points.
    #[inline]
    pub fn point_count(&self) -> usize {
        self.point_indices.len()
    }
}

/// Clusters eligible grid cells by following predicted center offsets.
pub struct GridClusterer {
    grid: BevGrid,
    sets: DisjointSet,
    /// Per-cell eligibility scratch, rebuilt each frame.
    eligible: Vec<bool>,
}

impl GridClusterer {
    /// Create a clusterer for the given grid geometry.
    pub fn new(grid_config: &BevGridConfig) -> Self {
        let grid = BevGrid::new(grid_config);
        Self {
            grid,
            sets: DisjointSet::new(),
            eligible: vec![false; grid.cell_count()],
        }
    }

    /// Partition the eligible cells into clusters.
    ///
    /// A cell is eligible iff it is non-empty and its objectness meets the
    /// threshold; everything else is excluded from clustering and from any
    /// object. The caller must have validated that `predictions` mirrors the
    /// grid's spatial shape.
    ///
    /// The returned partition is deterministic: member cells ascend in
    /// row-major order and clusters are ordered by their smallest cell
    /// index. It is also independent of the union iteration order (the
    /// disjoint-set result is order-free by construction).
    pub fn cluster(
        &mut self,
        predictions: &PredictionMap,
        inverse_index: &InverseIndex,
        objectness_threshold: f32,
    ) -> Vec<CellCluster> {
        let cell_count = self.grid.cell_count();
        debug_assert_eq!(predictions.plane_len(), cell_count);
        debug_assert_eq!(inverse_index.cell_count(), cell_count);

        // 1. Eligibility: non-empty and above the objectness threshold.
        self.eligible.clear();
        self.eligible.resize(cell_count, false);
        let mut eligible_count = 0usize;
        for cell in 0..cell_count {
            if !inverse_index.points(cell).is_empty()
                && predictions.objectness(cell) >= objectness_threshold
            {
                self.eligible[cell] = true;
                eligible_count += 1;
            }
        }

        // 2. Single pass: union each eligible cell with its offset target.
        self.sets.reset(cell_count);
        let inv_cell_x = 1.0 / self.grid.cell_size_x();
        let inv_cell_y = 1.0 / self.grid.cell_size_y();
        for cell in 0..cell_count {
            if !self.eligible[cell] {
                continue;
            }
            let coord = self.grid.coord(cell);
            let (dx, dy) = predictions.center_offset(cell);
            // Nearest-cell rounding of the displaced cell index.
            let target = CellCoord::new(
                (coord.row as f32 + dx * inv_cell_x).round() as i32,
                (coord.col as f32 + dy * inv_cell_y).round() as i32,
            );
            if let Some(target_cell) = self.grid.flat(target)
                && self.eligible[target_cell]
            {
                // Self-pointing cells stay singletons; union(c, c) is a no-op.
                self.sets.union(cell as u32, target_cell as u32);
            }
        }

        // 3. Materialize clusters. Scanning cells in ascending order makes
        // each root's first-seen cell its minimum, so first-seen order is
        // min-cell order.
        let mut cluster_of_root: std::collections::HashMap<u32, usize> =
            std::collections::HashMap::with_capacity(eligible_count);
        let mut clusters: Vec<CellCluster> = Vec::new();
        for cell in 0..cell_count {
            if !self.eligible[cell] {
                continue;
            }
            let root = self.sets.find(cell as u32);
            let slot = *cluster_of_root.entry(root).or_insert_with(|| {
                clusters.push(CellCluster::default());
                clusters.len() - 1
            });
            let cluster = &mut clusters[slot];
            cluster.cells.push(cell);
            cluster
                .point_indices
                .extend_from_slice(inverse_index.points(cell));
        }

        log::debug!(
            "clustered {} eligible cells into {} clusters",
            eligible_count,
            clusters.len()
        );
        clusters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::PredictionChannel;

    fn grid_4x4() -> BevGridConfig {
        BevGridConfig {
            width: 4,
            height: 4,
            range: 4.0,
        }
    }

    /// Mark a cell non-empty with one synthetic point index.
    fn occupy(index: &mut InverseIndex, cell: usize, point: u32) {
        index.push(cell, point);
    }

    /// Predictions with objectness 1.0 on the given cells, zero offsets.
    fn confident_cells(cells: &[usize]) -> PredictionMap {
        let mut map = PredictionMap::zeros(4, 4);
        for &cell in cells {
            map.set(PredictionChannel::Objectness, cell, 1.0);
        }
        map
    }

    #[test]
    fn test_isolated_cells_stay_singletons() {
        let mut clusterer = GridClusterer::new(&grid_4x4());
        let mut index = InverseIndex::new(16);
        occupy(&mut index, 0, 0);
        occupy(&mut index, 15, 1);
        let predictions = confident_cells(&[0, 15]);

        let clusters = clusterer.cluster(&predictions, &index, 0.5);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].cells, vec![0]);
        assert_eq!(clusters[1].cells, vec![15]);
    }

    #[test]
    fn test_offset_merges_cells() {
        // Cell size is 2m. Cell 0 = (0,0), cell 1 = (0,1). Point cell 0 at
        // cell 1 with dy = +2m; cell 1 points at itself.
        let mut clusterer = GridClusterer::new(&grid_4x4());
        let mut index = InverseIndex::new(16);
        occupy(&mut index, 0, 0);
        occupy(&mut index, 1, 1);
        let mut predictions = confident_cells(&[0, 1]);
        predictions.set(PredictionChannel::OffsetY, 0, 2.0);

        let clusters = clusterer.cluster(&predictions, &index, 0.5);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].cells, vec![0, 1]);
        assert_eq!(clusters[0].point_indices, vec![0, 1]);
    }

    #[test]
    fn test_below_threshold_cells_excluded() {
        let mut clusterer = GridClusterer::new(&grid_4x4());
        let mut index = InverseIndex::new(16);
        occupy(&mut index, 0, 0);
        occupy(&mut index, 1, 1);
        let mut predictions = confident_cells(&[0]);
        predictions.set(PredictionChannel::Objectness, 1, 0.3);
        // Cell 0 points at cell 1, but 1 is ineligible: no union, and 1
        // belongs to no cluster.
        predictions.set(PredictionChannel::OffsetY, 0, 2.0);

        let clusters = clusterer.cluster(&predictions, &index, 0.5);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].cells, vec![0]);
    }

    #[test]
    fn test_empty_cell_never_clustered() {
        // Objectness alone is not enough: a cell with no points is excluded.
        let mut clusterer = GridClusterer::new(&grid_4x4());
        let mut index = InverseIndex::new(16);
        occupy(&mut index, 5, 0);
        let predictions = confident_cells(&[5, 6]);

        let clusters = clusterer.cluster(&predictions, &index, 0.5);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].cells, vec![5]);
    }

    #[test]
    fn test_out_of_bounds_target_ignored() {
        let mut clusterer = GridClusterer::new(&grid_4x4());
        let mut index = InverseIndex::new(16);
        occupy(&mut index, 3, 0); // cell (0, 3), right edge
        let mut predictions = confident_cells(&[3]);
        predictions.set(PredictionChannel::OffsetY, 3, 10.0); // points past the edge

        let clusters = clusterer.cluster(&predictions, &index, 0.5);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].cells, vec![3]);
    }

    #[test]
    fn test_offset_chain_forms_one_cluster() {
        // 0 -> 1 -> 2: transitive merging through the shared target.
        let mut clusterer = GridClusterer::new(&grid_4x4());
        let mut index = InverseIndex::new(16);
        for cell in [0usize, 1, 2] {
            occupy(&mut index, cell, cell as u32);
        }
        let mut predictions = confident_cells(&[0, 1, 2]);
        predictions.set(PredictionChannel::OffsetY, 0, 2.0);
        predictions.set(PredictionChannel::OffsetY, 1, 2.0);

        let clusters = clusterer.cluster(&predictions, &index, 0.5);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].cells, vec![0, 1, 2]);
    }

    #[test]
    fn test_deterministic_across_runs() {
        let mut index = InverseIndex::new(16);
        for cell in [0usize, 1, 4, 5, 10, 11] {
            occupy(&mut index, cell, cell as u32);
        }
        let mut predictions = confident_cells(&[0, 1, 4, 5, 10, 11]);
        predictions.set(PredictionChannel::OffsetY, 0, 2.0);
        predictions.set(PredictionChannel::OffsetX, 4, -2.0);
        predictions.set(PredictionChannel::OffsetY, 10, 2.0);

        let mut clusterer = GridClusterer::new(&grid_4x4());
        let first = clusterer.cluster(&predictions, &index, 0.5);
        let second = clusterer.cluster(&predictions, &index, 0.5);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.cells, b.cells);
            assert_eq!(a.point_indices, b.point_indices);
        }
    }

    #[test]
    fn test_clusters_ordered_by_min_cell() {
        let mut clusterer = GridClusterer::new(&grid_4x4());
        let mut index = InverseIndex::new(16);
        for cell in [2usize, 7, 9, 14] {
            occupy(&mut index, cell, cell as u32);
        }
        let clusters = clusterer.cluster(&confident_cells(&[2, 7, 9, 14]), &index, 0.5);

        let mins: Vec<usize> = clusters.iter().map(CellCluster::min_cell).collect();
        assert_eq!(mins, vec![2, 7, 9, 14]);
    }

    #[test]
    fn test_point_order_follows_cell_order() {
        let mut clusterer = GridClusterer::new(&grid_4x4());
        let mut index = InverseIndex::new(16);
        // Insertion order within a cell is preserved; cells are traversed
        // ascending regardless of occupation order.
        index.push(1, 30);
        index.push(1, 31);
        index.push(0, 10);
        let mut predictions = confident_cells(&[0, 1]);
        predictions.set(PredictionChannel::OffsetY, 0, 2.0);

        let clusters = clusterer.cluster(&predictions, &index, 0.5);
        assert_eq!(clusters[0].point_indices, vec![10, 30, 31]);
    }
}
