//! Per-frame segmentation orchestration.
//!
//! Runs transform → encode → infer → cluster → assemble strictly
//! sequentially for one frame at a time. All scratch (grid accumulators,
//! inverse index, union-find arrays) is owned here and fully reset at the
//! start of each frame's build step, so no state leaks between frames.

use thiserror::Error;

use crate::assembly::{ObjectAssembler, SegmentedObject};
use crate::clustering::GridClusterer;
use crate::config::{ConfigError, SegmentationConfig};
use crate::core::CloudFrame;
use crate::features::FeatureEncoder;
use crate::inference::{InferenceEngine, InferenceError};

use super::transform::{CloudTransformer, IdentityTransform, TransformError};

/// Per-frame failure. Always recoverable: the caller skips the frame and
/// continues with the next one.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("transform failed: {0}")]
    Transform(#[from] TransformError),

    #[error("inference failed: {0}")]
    Inference(#[from] InferenceError),
}

/// Result of segmenting one frame, with the frame's bookkeeping passed
/// through untouched.
#[derive(Clone, Debug, Default)]
pub struct SegmentationOutput {
    /// Capture timestamp of the source frame.
    pub timestamp_us: u64,
    /// Frame id of the source frame.
    pub frame_id: String,
    /// Emitted objects, deterministically ordered.
    pub objects: Vec<SegmentedObject>,
}

/// The full per-frame pipeline around an inference backend.
pub struct SegmentationEngine<E: InferenceEngine> {
    config: SegmentationConfig,
    transformer: Box<dyn CloudTransformer + Send>,
    encoder: FeatureEncoder,
    clusterer: GridClusterer,
    assembler: ObjectAssembler,
    inference: E,
}

impl<E: InferenceEngine> SegmentationEngine<E> {
    /// Create an engine with the identity transform.
    ///
    /// Fails on invalid configuration; the pipeline must refuse to run
    /// rather than produce silently-wrong output.
    pub fn new(config: SegmentationConfig, inference: E) -> Result<Self, ConfigError> {
        Self::with_transformer(config, inference, Box::new(IdentityTransform))
    }

    /// Create an engine with an explicit transform service.
    pub fn with_transformer(
        config: SegmentationConfig,
        inference: E,
        transformer: Box<dyn CloudTransformer + Send>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            encoder: FeatureEncoder::new(&config.grid, &config.features),
            clusterer: GridClusterer::new(&config.grid),
            assembler: ObjectAssembler::new(config.assembly),
            transformer,
            inference,
            config,
        })
    }

    /// The validated configuration in use.
    #[inline]
    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// Segment one frame into objects.
    ///
    /// An empty or fully out-of-range cloud yields an empty object list
    /// without touching the inference backend. Transform and inference
    /// failures surface as [`FrameError`]; the engine itself stays usable
    /// for the next frame either way.
    pub fn process_frame(&mut self, frame: &CloudFrame) -> Result<Vec<SegmentedObject>, FrameError> {
        let cloud = self
            .transformer
            .transform(frame, &self.config.target_frame)?;

        let summary = self.encoder.encode(&cloud);
        if summary.indexed == 0 {
            return Ok(Vec::new());
        }

        let predictions = self.inference.infer(self.encoder.tensor())?;
        let grid = self.encoder.grid();
        if predictions.height() != grid.height() || predictions.width() != grid.width() {
            return Err(FrameError::Inference(InferenceError::ShapeMismatch {
                expected: format!("{}x{} spatial shape", grid.height(), grid.width()),
                actual: format!("{}x{}", predictions.height(), predictions.width()),
            }));
        }

        let clusters = self.clusterer.cluster(
            &predictions,
            self.encoder.inverse_index(),
            self.config.clustering.objectness_threshold,
        );
        Ok(self.assembler.assemble(&clusters, &cloud, &predictions))
    }

    /// Segment one frame, carrying its bookkeeping onto the output.
    pub fn segment(&mut self, frame: &CloudFrame) -> Result<SegmentationOutput, FrameError> {
        let objects = self.process_frame(frame)?;
        Ok(SegmentationOutput {
            timestamp_us: frame.timestamp_us,
            frame_id: frame.frame_id.clone(),
            objects,
        })
    }
}
