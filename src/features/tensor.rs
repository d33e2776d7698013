//! Fixed-shape feature tensor and its channel-layout contract.
//!
//! The channel set and ordering form a versioned contract shared with the
//! paired inference model; they are derived from configuration once at
//! startup and never change mid-run.

use serde::{Deserialize, Serialize};

use crate::config::FeatureConfig;

/// One feature channel of the input tensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureChannel {
    /// Maximum lifted z per cell (0 for empty cells).
    MaxHeight,
    /// Mean lifted z per cell (0 for empty cells).
    MeanHeight,
    /// `log2(count + 1)` per cell.
    LogCount,
    /// Cell-position channel: `atan2(cy, cx) / (2*pi)`. Precomputed.
    Direction,
    /// Intensity of the highest point per cell.
    TopIntensity,
    /// Mean intensity per cell.
    MeanIntensity,
    /// Cell-position channel: `hypot(cx, cy) / range - 0.5`. Precomputed.
    Distance,
    /// 1.0 where at least one point landed, else 0.0.
    NonEmpty,
}

/// Ordered channel set for a configuration.
///
/// The mask and height statistics are always present; the intensity pair and
/// the constant (cell-position) pair are each toggled by configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureLayout {
    channels: Vec<FeatureChannel>,
}

impl FeatureLayout {
    /// Build the layout for a feature configuration.
    pub fn from_config(config: &FeatureConfig) -> Self {
        let mut channels = vec![
            FeatureChannel::MaxHeight,
            FeatureChannel::MeanHeight,
            FeatureChannel::LogCount,
        ];
        if config.use_constant {
            channels.push(FeatureChannel::Direction);
        }
        if config.use_intensity {
            channels.push(FeatureChannel::TopIntensity);
            channels.push(FeatureChannel::MeanIntensity);
        }
        if config.use_constant {
            channels.push(FeatureChannel::Distance);
        }
        channels.push(FeatureChannel::NonEmpty);
        Self { channels }
    }

    /// Number of channels.
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Channels in tensor order.
    #[inline]
    pub fn channels(&self) -> &[FeatureChannel] {
        &self.channels
    }

    /// Position of a channel in the tensor, if present.
    #[inline]
    pub fn position(&self, channel: FeatureChannel) -> Option<usize> {
        self.channels.iter().position(|&c| c == channel)
    }
}

/// Dense `channels × height × width` feature tensor, row-major per channel.
#[derive(Clone, Debug)]
pub struct FeatureTensor {
    layout: FeatureLayout,
    height: usize,
    width: usize,
    data: Vec<f32>,
}

impl FeatureTensor {
    /// Allocate a zeroed tensor.
    pub fn new(layout: FeatureLayout, height: usize, width: usize) -> Self {
        let len = layout.channel_count() * height * width;
        Self {
            layout,
            height,
            width,
            data: vec![0.0; len],
        }
    }

    /// Channel layout contract.
    #[inline]
    pub fn layout(&self) -> &FeatureLayout {
        &self.layout
    }

    /// Number of channels.
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.layout.channel_count()
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

    /// One channel plane by position.
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        let plane = self.plane_len();
        &self.data[index * plane..(index + 1) * plane]
    }

    /// One channel plane, mutable.
    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        let plane = self.plane_len();
        &mut self.data[index * plane..(index + 1) * plane]
    }

    /// Channel plane by semantic channel, if present in the layout.
    #[inline]
    pub fn named_channel(&self, channel: FeatureChannel) -> Option<&[f32]> {
        self.layout.position(channel).map(|i| self.channel(i))
    }

    /// Flat data slice in C×H×W order (the inference input buffer).
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}
