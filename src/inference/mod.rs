//! External inference contract.
//!
//! The neural network itself (training, weight format, the accelerator that
//! executes it) lives outside this crate. The core sees it only as a
//! synchronous tensor-in/tensor-out call behind [`InferenceEngine`]; any
//! backend can satisfy the trait. Inference failure is a per-frame
//! recoverable condition — the caller skips the frame, never crashes.

use thiserror::Error;

use crate::features::FeatureTensor;

/// Inference errors.
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("prediction shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Expected element count or spatial shape description.
        expected: String,
        /// What the backend produced.
        actual: String,
    },

    #[error("inference backend error: {0}")]
    Backend(String),
}

/// Per-cell prediction channels, in tensor order.
///
/// The backend must produce exactly these five planes, spatially identical
/// to the input grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum PredictionChannel {
    /// Confidence that the cell belongs to some object, in `[0, 1]`.
    Objectness = 0,
    /// Confidence in the category assignment.
    Category = 1,
    /// Predicted x component of the center offset, meters.
    OffsetX = 2,
    /// Predicted y component of the center offset, meters.
    OffsetY = 3,
    /// Predicted object height at the cell, meters.
    Height = 4,
}

/// Number of prediction channels.
pub const PREDICTION_CHANNELS: usize = 5;

/// Dense per-cell prediction tensor returned by the inference backend.
///
/// Layout is `5 × height × width`, row-major per channel, mirroring the
/// input grid's spatial dimensions.
#[derive(Clone, Debug)]
pub struct PredictionMap {
    height: usize,
    width: usize,
    data: Vec<f32>,
}

impl PredictionMap {
    /// Wrap a backend output buffer, validating its shape.
    pub fn from_data(height: usize, width: usize, data: Vec<f32>) -> Result<Self, InferenceError> {
        let expected = PREDICTION_CHANNELS * height * width;
        if data.len() != expected {
            return Err(InferenceError::ShapeMismatch {
                expected: format!("{PREDICTION_CHANNELS}x{height}x{width} = {expected}"),
                actual: format!("{} elements", data.len()),
            });
        }
        Ok(Self {
            height,
            width,
            data,
        })
    }

    /// An all-zero prediction map (useful for scripted backends and tests).
    pub fn zeros(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            data: vec![0.0; PREDICTION_CHANNELS * height * width],
        }
    }

    /// Spatial height (rows).
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Spatial width (columns).
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Cells per channel plane.
    #[inline]
    pub fn plane_len(&self) -> usize {
        self.height * self.width
    }

    /// One channel plane.
    #[inline]
    pub fn channel(&self, channel: PredictionChannel) -> &[f32] {
        let plane = self.plane_len();
        let start = channel as usize * plane;
        &self.data[start..start + plane]
    }

    /// Set one cell of one channel.
    #[inline]
    pub fn set(&mut self, channel: PredictionChannel, cell: usize, value: f32) {
        let plane = self.plane_len();
        self.data[channel as usize * plane + cell] = value;
    }

    /// Objectness score for a cell.
    #[inline]
    pub fn objectness(&self, cell: usize) -> f32 {
        self.channel(PredictionChannel::Objectness)[cell]
    }

    /// Category confidence for a cell.
    #[inline]
    pub fn category_confidence(&self, cell: usize) -> f32 {
        self.channel(PredictionChannel::Category)[cell]
    }

    /// Center offset `(dx, dy)` for a cell, meters.
    #[inline]
    pub fn center_offset(&self, cell: usize) -> (f32, f32) {
        (
            self.channel(PredictionChannel::OffsetX)[cell],
            self.channel(PredictionChannel::OffsetY)[cell],
        )
    }

    /// Predicted height for a cell, meters.
    #[inline]
    pub fn predicted_height(&self, cell: usize) -> f32 {
        self.channel(PredictionChannel::Height)[cell]
    }
}

/// Synchronous inference boundary: submit the feature tensor, block until the
/// prediction tensor is available.
///
/// Backends are swapped via this trait, not inheritance; the pipeline holds
/// whatever implementation it is constructed with.
pub trait InferenceEngine {
    /// Run one forward pass.
    fn infer(&mut self, input: &FeatureTensor) -> Result<PredictionMap, InferenceError>;
}

/// Closures are engines, so tests and tools can inject scripted predictions.
impl<F> InferenceEngine for F
where
    F: FnMut(&FeatureTensor) -> Result<PredictionMap, InferenceError>,
{
    fn infer(&mut self, input: &FeatureTensor) -> Result<PredictionMap, InferenceError> {
        self(input)
    }
}
