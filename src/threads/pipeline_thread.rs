//! Segmentation pipeline thread.
//!
//! One worker thread drives the per-frame engine:
//! - Receives [`CloudFrame`]s via a bounded crossbeam channel
//! - Applies the drop-and-replace policy before each frame
//! - Publishes [`SegmentationOutput`]s on a second channel
//!
//! # Drop-and-replace
//!
//! The inference call dominates per-frame latency. When frames arrive faster
//! than it completes, the worker drains its input queue down to the most
//! recent frame before starting work, so the system always processes the
//! freshest available data instead of accumulating backlog. The policy is
//! explicit: disable `drop_stale_frames` to process every frame in arrival
//! order instead.
//!
//! All scratch buffers live inside the engine owned by this thread and are
//! fully reset at the start of each frame's build step, so discarded stale
//! frames can never leak state into the next frame.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::core::CloudFrame;
use crate::engine::{SegmentationEngine, SegmentationOutput};
use crate::inference::InferenceEngine;

/// Poll interval for the running flag while the input queue is idle.
const IDLE_POLL: Duration = Duration::from_millis(100);

/// How often to log throughput statistics, in processed frames.
const STATS_LOG_INTERVAL: u64 = 100;

/// Configuration for the pipeline thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineThreadConfig {
    /// Drain the input queue to the newest frame before each run
    /// (drop-and-replace). When false, frames are processed in arrival order.
    pub drop_stale_frames: bool,
    /// Capacity of the frame input channel.
    pub queue_capacity: usize,
}

impl Default for PipelineThreadConfig {
    fn default() -> Self {
        Self {
            drop_stale_frames: true,
            queue_capacity: 4,
        }
    }
}

/// Create the bounded frame input channel for a pipeline thread.
pub fn create_frame_channel(
    config: &PipelineThreadConfig,
) -> (Sender<CloudFrame>, Receiver<CloudFrame>) {
    bounded(config.queue_capacity.max(1))
}

/// Pipeline thread handle.
pub struct PipelineThread {
    handle: JoinHandle<()>,
}

impl PipelineThread {
    /// Spawn the worker thread.
    ///
    /// The thread exits when `running` clears or when either channel
    /// disconnects.
    pub fn spawn<E>(
        config: PipelineThreadConfig,
        engine: SegmentationEngine<E>,
        frame_rx: Receiver<CloudFrame>,
        output_tx: Sender<SegmentationOutput>,
        running: Arc<AtomicBool>,
    ) -> Self
    where
        E: InferenceEngine + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name("segmentation".into())
            .spawn(move || run_loop(config, engine, frame_rx, output_tx, running))
            .expect("Failed to spawn segmentation thread");

        Self { handle }
    }

    /// Wait for the thread to finish.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

fn run_loop<E: InferenceEngine>(
    config: PipelineThreadConfig,
    mut engine: SegmentationEngine<E>,
    frame_rx: Receiver<CloudFrame>,
    output_tx: Sender<SegmentationOutput>,
    running: Arc<AtomicBool>,
) {
    log::info!(
        "segmentation thread starting (drop_stale_frames={})",
        config.drop_stale_frames
    );

    let mut processed: u64 = 0;
    let mut dropped: u64 = 0;
    let mut skipped: u64 = 0;

    while running.load(Ordering::Relaxed) {
        let mut frame = match frame_rx.recv_timeout(IDLE_POLL) {
            Ok(frame) => frame,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                log::info!("frame channel closed, segmentation thread exiting");
                break;
            }
        };

        if config.drop_stale_frames {
            // Newest frame wins; everything older in the queue is stale.
            while let Ok(newer) = frame_rx.try_recv() {
                dropped += 1;
                frame = newer;
            }
        }

        let output = match engine.segment(&frame) {
            Ok(output) => output,
            Err(e) => {
                // Per-frame recoverable: skip, emit an empty object list,
                // keep the thread alive for the next frame.
                skipped += 1;
                log::warn!("skipping frame at {} us: {}", frame.timestamp_us, e);
                SegmentationOutput {
                    timestamp_us: frame.timestamp_us,
                    frame_id: frame.frame_id.clone(),
                    objects: Vec::new(),
                }
            }
        };

        if output_tx.send(output).is_err() {
            log::info!("output channel closed, segmentation thread exiting");
            break;
        }

        processed += 1;
        if processed.is_multiple_of(STATS_LOG_INTERVAL) {
            log::info!(
                "segmentation: {} frames processed, {} stale dropped, {} skipped",
                processed,
                dropped,
                skipped
            );
        }
    }

    log::info!(
        "segmentation thread shutdown ({} processed, {} dropped, {} skipped)",
        processed,
        dropped,
        skipped
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BevGridConfig, SegmentationConfig};
    use crate::core::{Point3, PointCloud};
    use crate::features::FeatureTensor;
    use crate::inference::{PredictionChannel, PredictionMap};

    fn test_engine(
        infer_delay: Duration,
    ) -> SegmentationEngine<impl InferenceEngine + Send + 'static> {
        let config = SegmentationConfig {
            grid: BevGridConfig {
                width: 4,
                height: 4,
                range: 4.0,
            },
            ..Default::default()
        };
        SegmentationEngine::new(config, move |input: &FeatureTensor| {
            std::thread::sleep(infer_delay);
            let mut map = PredictionMap::zeros(input.height(), input.width());
            for cell in 0..map.plane_len() {
                map.set(PredictionChannel::Objectness, cell, 1.0);
            }
            Ok(map)
        })
        .unwrap()
    }

    fn test_frame(timestamp_us: u64) -> CloudFrame {
        let mut cloud = PointCloud::new();
        cloud.push(Point3::new(0.5, 0.5, 0.0, 0.0));
        cloud.push(Point3::new(0.5, 0.6, 0.5, 0.0));
        cloud.push(Point3::new(0.6, 0.5, 1.0, 0.0));
        CloudFrame::new(cloud, timestamp_us, "base_link")
    }

    #[test]
    fn test_processes_frames_in_order_without_drop() {
        let config = PipelineThreadConfig {
            drop_stale_frames: false,
            queue_capacity: 8,
        };
        let (frame_tx, frame_rx) = create_frame_channel(&config);
        let (output_tx, output_rx) = bounded(8);
        let running = Arc::new(AtomicBool::new(true));

        let thread = PipelineThread::spawn(
            config,
            test_engine(Duration::ZERO),
            frame_rx,
            output_tx,
            running.clone(),
        );

        for t in 0..3 {
            frame_tx.send(test_frame(t)).unwrap();
        }

        let stamps: Vec<u64> = (0..3)
            .map(|_| {
                output_rx
                    .recv_timeout(Duration::from_secs(5))
                    .unwrap()
                    .timestamp_us
            })
            .collect();
        assert_eq!(stamps, vec![0, 1, 2]);

        running.store(false, Ordering::Relaxed);
        drop(frame_tx);
        thread.join().unwrap();
    }

    #[test]
    fn test_drop_and_replace_processes_newest() {
        let config = PipelineThreadConfig {
            drop_stale_frames: true,
            queue_capacity: 8,
        };
        let (frame_tx, frame_rx) = create_frame_channel(&config);
        let (output_tx, output_rx) = bounded(8);
        let running = Arc::new(AtomicBool::new(true));

        // Slow backend so queued frames pile up behind the first one.
        let thread = PipelineThread::spawn(
            config,
            test_engine(Duration::from_millis(150)),
            frame_rx,
            output_tx,
            running.clone(),
        );

        frame_tx.send(test_frame(0)).unwrap();
        // Let the worker pick up frame 0 and block in inference, then queue
        // four more behind its back.
        std::thread::sleep(Duration::from_millis(75));
        for t in 1..5 {
            frame_tx.send(test_frame(t)).unwrap();
        }

        // Collect outputs until the newest frame comes through.
        let mut seen = Vec::new();
        loop {
            let output = output_rx.recv_timeout(Duration::from_secs(5)).unwrap();
            seen.push(output.timestamp_us);
            if output.timestamp_us == 4 {
                break;
            }
        }

        // Frames 1..3 were stale by the time the worker got back to the
        // queue; most of them must have been replaced, never processed.
        assert!(
            seen.len() <= 2,
            "expected stale frames to be dropped, processed {seen:?}"
        );

        running.store(false, Ordering::Relaxed);
        drop(frame_tx);
        thread.join().unwrap();
    }

    #[test]
    fn test_bad_frame_emits_empty_output_and_continues() {
        let config = PipelineThreadConfig::default();
        let (frame_tx, frame_rx) = create_frame_channel(&config);
        let (output_tx, output_rx) = bounded(8);
        let running = Arc::new(AtomicBool::new(true));

        let thread = PipelineThread::spawn(
            config,
            test_engine(Duration::ZERO),
            frame_rx,
            output_tx,
            running.clone(),
        );

        // Wrong frame id: transform fails, frame is skipped.
        let mut bad = test_frame(7);
        bad.frame_id = "velodyne".to_string();
        frame_tx.send(bad).unwrap();
        let output = output_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(output.timestamp_us, 7);
        assert!(output.objects.is_empty());

        // The next good frame still produces objects.
        frame_tx.send(test_frame(8)).unwrap();
        let output = output_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(output.timestamp_us, 8);
        assert_eq!(output.objects.len(), 1);

        running.store(false, Ordering::Relaxed);
        drop(frame_tx);
        thread.join().unwrap();
    }
}
