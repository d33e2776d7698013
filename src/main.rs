//! DrishtiSeg daemon - BEV instance segmentation pipeline.
//!
//! Runs the full segmentation pipeline against a built-in synthetic cloud
//! source and a height-proxy stand-in for the neural backend, so the whole
//! chain (encode → infer → cluster → assemble, drop-and-replace scheduling,
//! shutdown handling) can be smoke-tested without a sensor or a model.
//!
//! A deployment replaces the stand-in with a real [`InferenceEngine`]
//! implementation and feeds frames from the sensor stack instead of the
//! synthetic source.
//!
//! # Usage
//!
//! ```bash
//! # With default config
//! cargo run --release
//!
//! # With custom config file
//! cargo run --release -- --config drishti-seg.yaml
//! ```

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Deserialize;

use drishti_seg::{
    CloudFrame, FeatureChannel, FeatureTensor, InferenceEngine, InferenceError, PipelineThread,
    PipelineThreadConfig, Point3, PointCloud, PredictionChannel, PredictionMap,
    SegmentationConfig, SegmentationEngine, create_frame_channel,
};

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DaemonConfig {
    /// Segmentation pipeline configuration.
    segmentation: SegmentationConfig,
    /// Pipeline thread scheduling.
    pipeline: PipelineCfg,
    /// Synthetic source settings.
    source: SourceCfg,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct PipelineCfg {
    drop_stale_frames: bool,
    queue_capacity: usize,
}

impl Default for PipelineCfg {
    fn default() -> Self {
        let defaults = PipelineThreadConfig::default();
        Self {
            drop_stale_frames: defaults.drop_stale_frames,
            queue_capacity: defaults.queue_capacity,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SourceCfg {
    /// Frame rate of the synthetic source.
    rate_hz: f32,
    /// Stop after this many frames (0 = run until Ctrl-C).
    frame_limit: u64,
}

impl Default for SourceCfg {
    fn default() -> Self {
        Self {
            rate_hz: 10.0,
            frame_limit: 0,
        }
    }
}

// ============================================================================
// Argument Parsing
// ============================================================================

struct Args {
    config_path: Option<String>,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut result = Args { config_path: None };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    result.config_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    result
}

fn print_help() {
    println!("drishti-seg - BEV point-cloud instance segmentation daemon");
    println!();
    println!("USAGE:");
    println!("    drishti-seg [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <FILE>     Configuration file (YAML)");
    println!("    -h, --help              Print help information");
    println!();
    println!("CONFIGURATION:");
    println!("    - [segmentation] grid, features, clustering, assembly thresholds");
    println!("    - [pipeline] drop_stale_frames, queue_capacity");
    println!("    - [source] rate_hz, frame_limit (synthetic smoke source)");
}

/// Load the daemon configuration. A config file that cannot be read, parsed,
/// or validated is fatal: the pipeline refuses to run on bad parameters.
fn load_config(args: &Args) -> DaemonConfig {
    let config = match &args.config_path {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str::<DaemonConfig>(&contents) {
                Ok(cfg) => {
                    log::info!("Loaded config from {}", path);
                    cfg
                }
                Err(e) => {
                    log::error!("Failed to parse config {}: {}", path, e);
                    std::process::exit(1);
                }
            },
            Err(e) => {
                log::error!("Failed to read config {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => DaemonConfig::default(),
    };

    if let Err(e) = config.segmentation.validate() {
        log::error!("{}", e);
        std::process::exit(1);
    }
    config
}

// ============================================================================
// Stand-in Inference Backend
// ============================================================================

/// Height-proxy backend: cells whose top point rises above the ground band
/// are confident object cells, with center offsets pointing at the local
/// centroid of elevated cells. Good enough to exercise clustering end to
/// end; a real model replaces this wholesale.
struct HeightProxyEngine {
    cell_size_x: f32,
    cell_size_y: f32,
    /// Lifted-z level below which a cell counts as ground.
    ground_level: f32,
    /// Half-width of the centroid window, in cells.
    window: i32,
}

impl HeightProxyEngine {
    fn new(config: &SegmentationConfig) -> Self {
        Self {
            cell_size_x: config.grid.cell_size_x(),
            cell_size_y: config.grid.cell_size_y(),
            ground_level: config.features.z_offset + 0.3,
            // The window must cover a typical object's half-extent in cells,
            // or large objects fragment into several clusters.
            window: (3.0 / config.grid.cell_size_x()).ceil() as i32,
        }
    }
}

impl InferenceEngine for HeightProxyEngine {
    fn infer(&mut self, input: &FeatureTensor) -> Result<PredictionMap, InferenceError> {
        let mask = input
            .named_channel(FeatureChannel::NonEmpty)
            .ok_or_else(|| InferenceError::Backend("input tensor lacks mask channel".into()))?;
        let max_height = input
            .named_channel(FeatureChannel::MaxHeight)
            .ok_or_else(|| InferenceError::Backend("input tensor lacks height channel".into()))?;

        let height = input.height();
        let width = input.width();
        let elevated: Vec<bool> = (0..height * width)
            .map(|cell| mask[cell] > 0.0 && max_height[cell] > self.ground_level)
            .collect();

        let mut map = PredictionMap::zeros(height, width);
        for row in 0..height as i32 {
            for col in 0..width as i32 {
                let cell = row as usize * width + col as usize;
                if !elevated[cell] {
                    continue;
                }

                // Centroid of elevated cells in the window around this cell.
                let mut sum_row = 0.0f32;
                let mut sum_col = 0.0f32;
                let mut count = 0.0f32;
                for dr in -self.window..=self.window {
                    for dc in -self.window..=self.window {
                        let (nr, nc) = (row + dr, col + dc);
                        if nr < 0 || nc < 0 || nr >= height as i32 || nc >= width as i32 {
                            continue;
                        }
                        if elevated[nr as usize * width + nc as usize] {
                            sum_row += nr as f32;
                            sum_col += nc as f32;
                            count += 1.0;
                        }
                    }
                }

                map.set(PredictionChannel::Objectness, cell, 0.9);
                map.set(PredictionChannel::Category, cell, 0.5);
                map.set(
                    PredictionChannel::OffsetX,
                    cell,
                    (sum_row / count - row as f32) * self.cell_size_x,
                );
                map.set(
                    PredictionChannel::OffsetY,
                    cell,
                    (sum_col / count - col as f32) * self.cell_size_y,
                );
                map.set(PredictionChannel::Height, cell, max_height[cell]);
            }
        }
        Ok(map)
    }
}

// ============================================================================
// Synthetic Source
// ============================================================================

/// Push surface points of an axis-aligned box onto the cloud.
fn push_box(cloud: &mut PointCloud, cx: f32, cy: f32, size: (f32, f32, f32), step: f32) {
    let (sx, sy, sz) = size;
    let mut x = -sx / 2.0;
    while x <= sx / 2.0 {
        let mut y = -sy / 2.0;
        while y <= sy / 2.0 {
            let mut z = 0.0;
            while z <= sz {
                cloud.push(Point3::new(cx + x, cy + y, z, 0.4));
                z += step;
            }
            y += step;
        }
        x += step;
    }
}

/// One synthetic frame: sparse ground plane plus a moving car-sized box and
/// a static pedestrian-sized box. Fully deterministic in the tick.
fn synthetic_frame(tick: u64, target_frame: &str) -> CloudFrame {
    let mut cloud = PointCloud::with_capacity(4096);

    // Ground plane, 0.5m sampling over a 30m square
    let mut x = -15.0f32;
    while x <= 15.0 {
        let mut y = -15.0f32;
        while y <= 15.0 {
            cloud.push(Point3::new(x, y, 0.0, 0.1));
            y += 0.5;
        }
        x += 0.5;
    }

    // Car-sized box sliding along y
    let phase = (tick as f32 * 0.05).sin();
    push_box(&mut cloud, 10.0, 5.0 + 3.0 * phase, (4.5, 1.8, 1.5), 0.3);

    // Pedestrian-sized box
    push_box(&mut cloud, 6.0, -4.0, (0.5, 0.5, 1.7), 0.2);

    CloudFrame::new(cloud, tick * 100_000, target_frame)
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = parse_args();
    let config = load_config(&args);

    log::info!("drishti-seg starting");
    log::info!(
        "  Grid: {}x{} cells, range {}m",
        config.segmentation.grid.width,
        config.segmentation.grid.height,
        config.segmentation.grid.range
    );
    log::info!(
        "  Thresholds: objectness {}, score {}, height {}m, min points {}",
        config.segmentation.clustering.objectness_threshold,
        config.segmentation.assembly.score_threshold,
        config.segmentation.assembly.height_threshold,
        config.segmentation.assembly.min_points
    );
    log::info!(
        "  Scheduling: drop_stale_frames={}, queue={}",
        config.pipeline.drop_stale_frames,
        config.pipeline.queue_capacity
    );
    log::info!("  Source: synthetic @ {} Hz", config.source.rate_hz);

    // Setup signal handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .expect("Error setting Ctrl-C handler");

    // Build the engine; configuration errors are fatal here.
    let backend = HeightProxyEngine::new(&config.segmentation);
    let engine = match SegmentationEngine::new(config.segmentation.clone(), backend) {
        Ok(engine) => engine,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    // Wire up the pipeline thread.
    let thread_config = PipelineThreadConfig {
        drop_stale_frames: config.pipeline.drop_stale_frames,
        queue_capacity: config.pipeline.queue_capacity,
    };
    let (frame_tx, frame_rx) = create_frame_channel(&thread_config);
    let (output_tx, output_rx) = crossbeam_channel::bounded(thread_config.queue_capacity.max(1));
    let pipeline = PipelineThread::spawn(
        thread_config,
        engine,
        frame_rx,
        output_tx,
        running.clone(),
    );

    // Drive the synthetic source at the configured rate.
    let frame_period = Duration::from_secs_f32(1.0 / config.source.rate_hz.max(0.1));
    let target_frame = config.segmentation.target_frame.clone();
    let mut tick: u64 = 0;
    while running.load(Ordering::Relaxed) {
        let frame = synthetic_frame(tick, &target_frame);
        if frame_tx.send(frame).is_err() {
            break;
        }
        tick += 1;

        while let Ok(output) = output_rx.try_recv() {
            log::info!(
                "frame {} us: {} objects",
                output.timestamp_us,
                output.objects.len()
            );
            for (i, object) in output.objects.iter().enumerate() {
                let center = object.bounds.center();
                log::debug!(
                    "  object {}: {} pts, score {:.2}, height {:.2}m at ({:.1}, {:.1})",
                    i,
                    object.point_count,
                    object.score,
                    object.height_range,
                    center[0],
                    center[1]
                );
            }
        }

        if config.source.frame_limit > 0 && tick >= config.source.frame_limit {
            log::info!("Frame limit reached");
            break;
        }
        std::thread::sleep(frame_period);
    }

    running.store(false, Ordering::Relaxed);
    // Closing both channels unblocks the worker wherever it is waiting.
    drop(frame_tx);
    drop(output_rx);
    pipeline.join().ok();
    log::info!("drishti-seg shutdown complete");
}
