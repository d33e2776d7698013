//! Thread infrastructure.
//!
//! # Contents
//!
//! - [`PipelineThread`]: the drop-and-replace segmentation worker

mod pipeline_thread;

pub use pipeline_thread::{PipelineThread, PipelineThreadConfig, create_frame_channel};
