//! Cluster filtering and object emission.
//!
//! Scores each cluster, measures its vertical extent, and emits an object
//! only when every acceptance threshold passes. Most small or noisy clusters
//! are discarded every frame; that is expected behavior, not an error.

use crate::clustering::CellCluster;
use crate::config::AssemblyConfig;
use crate::core::PointCloud;
use crate::inference::PredictionMap;

use super::object::{Bounds3, SegmentedObject};

/// Turns accepted clusters into the final object list.
#[derive(Clone, Debug)]
pub struct ObjectAssembler {
    config: AssemblyConfig,
}

impl ObjectAssembler {
    /// Create an assembler with the given acceptance thresholds.
    pub fn new(config: AssemblyConfig) -> Self {
        Self { config }
    }

    /// The acceptance thresholds in use.
    #[inline]
    pub fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    /// Filter clusters and emit objects.
    ///
    /// Output order follows the input cluster order, which the clusterer
    /// guarantees is ascending minimal cell index — reproducible for
    /// identical input.
    pub fn assemble(
        &self,
        clusters: &[CellCluster],
        cloud: &PointCloud,
        predictions: &PredictionMap,
    ) -> Vec<SegmentedObject> {
        let mut objects = Vec::new();
        let mut discarded = 0usize;

        for cluster in clusters {
            match self.try_assemble(cluster, cloud, predictions) {
                Some(object) => objects.push(object),
                None => discarded += 1,
            }
        }

        log::debug!(
            "assembled {} objects ({} clusters discarded)",
            objects.len(),
            discarded
        );
        objects
    }

    /// Evaluate one cluster against the acceptance thresholds.
    fn try_assemble(
        &self,
        cluster: &CellCluster,
        cloud: &PointCloud,
        predictions: &PredictionMap,
    ) -> Option<SegmentedObject> {
        let point_count = cluster.point_count();
        if point_count < self.config.min_points {
            return None;
        }

        // Mean pooling over member cells.
        let cell_count = cluster.cells.len() as f32;
        let mut score_sum = 0.0;
        let mut category_sum = 0.0;
        let mut height_sum = 0.0;
        for &cell in &cluster.cells {
            score_sum += predictions.objectness(cell);
            category_sum += predictions.category_confidence(cell);
            height_sum += predictions.predicted_height(cell);
        }
        let score = score_sum / cell_count;
        if score < self.config.score_threshold {
            return None;
        }

        // Vertical extent over member points (true z; the encoder's lift
        // never reaches this path).
        let mut bounds = Bounds3::empty();
        for &point_index in &cluster.point_indices {
            bounds.expand_to_include(&cloud[point_index as usize]);
        }
        let height_range = bounds.size()[2];
        if height_range < self.config.height_threshold {
            return None;
        }

        Some(SegmentedObject {
            point_indices: cluster.point_indices.clone(),
            score,
            category_confidence: category_sum / cell_count,
            predicted_height: height_sum / cell_count,
            height_range,
            point_count,
            bounds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Point3;
    use crate::inference::PredictionChannel;

    fn assembler() -> ObjectAssembler {
        ObjectAssembler::new(AssemblyConfig {
            score_threshold: 0.8,
            height_threshold: 0.5,
            min_points: 3,
        })
    }

    /// A cluster over one cell holding the given points, plus the matching
    /// cloud and a prediction map with the given objectness at that cell.
    fn fixture(
        points: &[(f32, f32, f32)],
        objectness: f32,
    ) -> (Vec<CellCluster>, PointCloud, PredictionMap) {
        let cloud: PointCloud = points
            .iter()
            .map(|&(x, y, z)| Point3::new(x, y, z, 0.0))
            .collect();
        let cluster = CellCluster {
            cells: vec![0],
            point_indices: (0..points.len() as u32).collect(),
        };
        let mut predictions = PredictionMap::zeros(4, 4);
        predictions.set(PredictionChannel::Objectness, 0, objectness);
        predictions.set(PredictionChannel::Category, 0, 0.9);
        predictions.set(PredictionChannel::Height, 0, 1.6);
        (vec![cluster], cloud, predictions)
    }

    #[test]
    fn test_accepts_passing_cluster() {
        let (clusters, cloud, predictions) =
            fixture(&[(0.0, 0.0, 0.0), (0.1, 0.0, 0.4), (0.0, 0.1, 1.0)], 0.9);
        let objects = assembler().assemble(&clusters, &cloud, &predictions);

        assert_eq!(objects.len(), 1);
        let object = &objects[0];
        assert_eq!(object.point_count, 3);
        assert!((object.score - 0.9).abs() < 1e-6);
        assert!((object.height_range - 1.0).abs() < 1e-6);
        assert!((object.category_confidence - 0.9).abs() < 1e-6);
        assert!((object.predicted_height - 1.6).abs() < 1e-6);
        assert_eq!(object.point_indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_rejects_low_score() {
        let (clusters, cloud, predictions) =
            fixture(&[(0.0, 0.0, 0.0), (0.1, 0.0, 0.4), (0.0, 0.1, 1.0)], 0.7);
        assert!(
            assembler()
                .assemble(&clusters, &cloud, &predictions)
                .is_empty()
        );
    }

    #[test]
    fn test_rejects_flat_cluster() {
        let (clusters, cloud, predictions) =
            fixture(&[(0.0, 0.0, 0.0), (0.1, 0.0, 0.1), (0.0, 0.1, 0.2)], 0.9);
        assert!(
            assembler()
                .assemble(&clusters, &cloud, &predictions)
                .is_empty()
        );
    }

    #[test]
    fn test_rejects_min_points_boundary() {
        // Exactly min_points - 1 members with otherwise-passing stats.
        let (clusters, cloud, predictions) = fixture(&[(0.0, 0.0, 0.0), (0.1, 0.0, 1.0)], 0.9);
        assert!(
            assembler()
                .assemble(&clusters, &cloud, &predictions)
                .is_empty()
        );
    }

    #[test]
    fn test_accepts_exactly_min_points() {
        let (clusters, cloud, predictions) =
            fixture(&[(0.0, 0.0, 0.0), (0.1, 0.0, 0.5), (0.0, 0.1, 1.0)], 0.9);
        let objects = assembler().assemble(&clusters, &cloud, &predictions);
        assert_eq!(objects.len(), 1);
    }

    #[test]
    fn test_score_is_mean_over_cells() {
        let cloud: PointCloud = (0..4)
            .map(|i| Point3::new(0.0, 0.0, i as f32 * 0.4, 0.0))
            .collect();
        let cluster = CellCluster {
            cells: vec![0, 1],
            point_indices: vec![0, 1, 2, 3],
        };
        let mut predictions = PredictionMap::zeros(4, 4);
        predictions.set(PredictionChannel::Objectness, 0, 1.0);
        predictions.set(PredictionChannel::Objectness, 1, 0.7);

        let objects = assembler().assemble(&[cluster], &cloud, &predictions);
        assert_eq!(objects.len(), 1);
        assert!((objects[0].score - 0.85).abs() < 1e-6);
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        // score == threshold and height_range == threshold both pass.
        let (clusters, cloud, predictions) =
            fixture(&[(0.0, 0.0, 0.0), (0.1, 0.0, 0.25), (0.0, 0.1, 0.5)], 0.8);
        let objects = assembler().assemble(&clusters, &cloud, &predictions);
        assert_eq!(objects.len(), 1);
    }

    #[test]
    fn test_bounds_cover_members() {
        let (clusters, cloud, predictions) =
            fixture(&[(1.0, -1.0, 0.0), (2.0, 1.0, 0.5), (1.5, 0.0, 1.0)], 0.9);
        let objects = assembler().assemble(&clusters, &cloud, &predictions);

        let bounds = objects[0].bounds;
        assert_eq!(bounds.min, [1.0, -1.0, 0.0]);
        assert_eq!(bounds.max, [2.0, 1.0, 1.0]);
    }
}
