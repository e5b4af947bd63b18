//! High-level facade crate for the `quadtrack-*` workspace.
//!
//! This crate provides:
//! - stable re-exports of the calibration, detection and capture crates
//! - the tracking pipeline that runs the per-cycle
//!   capture -> detect -> triangulate -> fuse -> publish loop
//! - the TCP stream server broadcasting fused points to remote consumers
//! - the persistence sink recording the latest fused coordinate
//!
//! ## Quickstart
//!
//! ```no_run
//! use quadtrack::capture::{FrameSource, SyntheticQuadCam};
//! use quadtrack::core::CalibrationStore;
//! use quadtrack::detect::{ColorRange, MarkerDetector};
//! use quadtrack::{StreamServer, TrackingPipeline};
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(CalibrationStore::load("calibration.json")?);
//! let server = StreamServer::bind("127.0.0.1:5555")?;
//!
//! let device = SyntheticQuadCam::new(320, 200, [128, 200, 64]);
//! let mut pipeline = TrackingPipeline::new(
//!     FrameSource::new(device),
//!     MarkerDetector::new(ColorRange::green()),
//!     store,
//! )
//! .with_broadcaster(server.broadcaster());
//!
//! let shutdown = Arc::new(AtomicBool::new(false));
//! pipeline.open()?;
//! pipeline.run(&shutdown)?;
//! server.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - [`core`]: camera/pair calibration model, store, triangulation, fusion.
//! - [`detect`]: HSV thresholding, blob centroids, marker detection.
//! - [`capture`]: capture-device trait, frame demultiplexing, synthetic rig.
//! - [`TrackingPipeline`], [`StreamServer`], [`LatestPointFile`]: the
//!   orchestration layer in this crate.

pub use quadtrack_capture as capture;
pub use quadtrack_core as core;
pub use quadtrack_detect as detect;

pub use quadtrack_capture::{CaptureDevice, CaptureError, Frame, FrameSet, FrameSource};
pub use quadtrack_core::{
    CalibrationStore, CameraId, CameraIntrinsics, PairKey, StereoCalibration,
};
pub use quadtrack_detect::{ColorRange, Detection, MarkerDetector};

mod config;
mod pipeline;
mod server;
mod sink;

pub use config::TrackerConfig;
pub use pipeline::{CycleOutcome, TrackingPipeline};
pub use server::{format_point, Broadcaster, StreamServer};
pub use sink::{CoordinateSink, LatestPointFile};
