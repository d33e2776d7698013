//! DrishtiSeg - BEV point-cloud instance segmentation core
//!
//! Converts one frame of raw 3D point-cloud data into discrete object
//! hypotheses for an autonomous perception stack: rasterize the cloud into a
//! bird's-eye-view feature grid, hand the tensor to an external inference
//! backend, then turn the per-cell predictions back into point-level object
//! clusters with an offset-driven union-find.
//!
//! # Architecture
//!
//! The crate is organized into 5 logical layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   threads/                          │  ← Pipeline thread
//! │              (drop-and-replace worker)              │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    engine/                          │  ← Orchestration
//! │          (per-frame pipeline, transform seam)       │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │        features/   inference/   clustering/         │  ← Core algorithms
//! │          assembly/  (encode → infer → cluster)      │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    config/                          │  ← Run configuration
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │                 (points, frames)                    │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Frame pipeline
//!
//! Per frame, strictly sequential: transform → feature encoding → inference
//! → grid clustering → object assembly. The inference call is the single
//! blocking point; everything else is pure CPU work over flat, reused
//! buffers. Per-frame failures (transform lookup, backend errors) skip the
//! frame and the pipeline continues; only configuration errors are fatal.

// ============================================================================
// Layer 1: Core foundation (no internal deps)
// ============================================================================
pub mod core;

// ============================================================================
// Layer 2: Run configuration (depends on core)
// ============================================================================
pub mod config;

// ============================================================================
// Layer 3: Algorithms (depend on core, config)
// ============================================================================
pub mod assembly;
pub mod clustering;
pub mod features;
pub mod inference;

// ============================================================================
// Layer 4: Engine orchestration (depends on all algorithm layers)
// ============================================================================
pub mod engine;

// ============================================================================
// Layer 5: Thread infrastructure (depends on engine)
// ============================================================================
pub mod threads;

// ============================================================================
// Convenience re-exports (flat namespace for common use)
// ============================================================================

// Core types
pub use self::core::{CloudFrame, Point3, PointCloud};

// Configuration
pub use config::{
    AssemblyConfig, BevGridConfig, ClusteringConfig, ConfigError, FeatureConfig,
    SegmentationConfig,
};

// Features
pub use features::{
    BevGrid, CellCoord, EncodeSummary, FeatureChannel, FeatureEncoder, FeatureLayout,
    FeatureTensor, InverseIndex,
};

// Inference contract
pub use inference::{
    InferenceEngine, InferenceError, PREDICTION_CHANNELS, PredictionChannel, PredictionMap,
};

// Clustering
pub use clustering::{CellCluster, DisjointSet, GridClusterer};

// Assembly
pub use assembly::{Bounds3, ObjectAssembler, SegmentedObject};

// Engine
pub use engine::{
    CloudTransformer, FrameError, IdentityTransform, SegmentationEngine, SegmentationOutput,
    TransformError,
};

// Threads
pub use threads::{PipelineThread, PipelineThreadConfig, create_frame_channel};
