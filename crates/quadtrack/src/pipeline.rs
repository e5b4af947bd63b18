//! The per-cycle tracking loop.
//!
//! One dedicated thread runs capture -> detect -> triangulate -> fuse ->
//! publish at the device's natural frame rate. A capture failure ends the
//! run; a detection or triangulation failure for one camera or pair only
//! skips that contribution for the cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nalgebra::{Matrix3, Point3};

use quadtrack_capture::{CaptureDevice, CaptureError, FrameSource};
use quadtrack_core::{fuse, triangulate_pair, CalibrationStore, CameraId};
use quadtrack_detect::{Detection, MarkerDetector};

use crate::server::Broadcaster;
use crate::sink::CoordinateSink;

/// What one cycle produced; returned so callers and tests can observe the
/// pair gating and fusion behavior.
#[derive(Clone, Debug)]
pub struct CycleOutcome {
    pub seq: u64,
    pub detections: Vec<Detection>,
    pub estimates: Vec<Point3<f64>>,
    pub fused: Option<Point3<f64>>,
}

/// Orchestrates the tracking loop over one frame source, one detector, the
/// calibration store and the downstream consumers.
///
/// The store is read-only for the lifetime of the run, so the pipeline
/// shares it without locking.
pub struct TrackingPipeline<D: CaptureDevice> {
    source: FrameSource<D>,
    detector: MarkerDetector,
    store: Arc<CalibrationStore>,
    world_rotation: Option<Matrix3<f64>>,
    broadcaster: Option<Broadcaster>,
    sink: Option<Box<dyn CoordinateSink>>,
    published: u64,
}

impl<D: CaptureDevice> TrackingPipeline<D> {
    pub fn new(
        source: FrameSource<D>,
        detector: MarkerDetector,
        store: Arc<CalibrationStore>,
    ) -> Self {
        Self {
            source,
            detector,
            store,
            world_rotation: None,
            broadcaster: None,
            sink: None,
            published: 0,
        }
    }

    /// Stream fused points to connected clients.
    pub fn with_broadcaster(mut self, broadcaster: Broadcaster) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    /// Record each fused point to a persistence sink.
    pub fn with_sink(mut self, sink: Box<dyn CoordinateSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Apply a rig-mounting correction to every fused point.
    pub fn with_world_rotation(mut self, rotation: Matrix3<f64>) -> Self {
        self.world_rotation = Some(rotation);
        self
    }

    /// Acquire the capture device. Recoverable on failure: retry or abort.
    pub fn open(&mut self) -> Result<(), CaptureError> {
        self.source.open()
    }

    /// Run one capture cycle. A capture error is fatal to the pipeline;
    /// everything downstream of capture degrades per camera or per pair.
    pub fn run_cycle(&mut self) -> Result<CycleOutcome, CaptureError> {
        let set = self.source.read()?;
        let seq = set.seq;

        let detections: Vec<Detection> = CameraId::all()
            .map(|camera| self.detector.detect(camera, &set.frame(camera).image))
            .collect();

        let mut estimates = Vec::new();
        for calib in self.store.pairs() {
            let point_ref = detections[calib.key.reference.index()].point;
            let point_other = detections[calib.key.other.index()].point;
            let (Some(a), Some(b)) = (point_ref, point_other) else {
                log::debug!("cycle {seq}: {} skipped, marker not seen by both cameras", calib.key);
                continue;
            };
            match triangulate_pair(&a, &b, calib) {
                Ok(estimate) => estimates.push(estimate),
                Err(e) => log::warn!("cycle {seq}: {} triangulation failed: {e}", calib.key),
            }
        }

        let fused = if estimates.is_empty() {
            // Not an error: the marker simply was not reconstructible this
            // cycle, so there is no output.
            None
        } else {
            match fuse(&estimates) {
                Ok(point) => Some(match &self.world_rotation {
                    Some(r) => Point3::from(r * point.coords),
                    None => point,
                }),
                Err(e) => {
                    // Unreachable by the gating above; if it fires, the
                    // fusion contract itself is broken.
                    log::error!("cycle {seq}: fusion invariant violated: {e}");
                    None
                }
            }
        };

        if let Some(point) = &fused {
            self.publish(seq, point);
        }

        Ok(CycleOutcome {
            seq,
            detections,
            estimates,
            fused,
        })
    }

    fn publish(&mut self, seq: u64, point: &Point3<f64>) {
        if let Some(broadcaster) = &self.broadcaster {
            let clients = broadcaster.broadcast(point);
            log::debug!("cycle {seq}: fused point sent to {clients} client(s)");
        }
        if let Some(sink) = &mut self.sink {
            if let Err(e) = sink.record(point) {
                log::warn!("cycle {seq}: sink write failed: {e}");
            }
        }
        self.published += 1;
    }

    /// Loop [`run_cycle`](Self::run_cycle) until `shutdown` is raised or a
    /// capture error occurs. The frame source is closed on every exit path.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<(), CaptureError> {
        let result = loop {
            if shutdown.load(Ordering::SeqCst) {
                break Ok(());
            }
            if let Err(e) = self.run_cycle() {
                log::error!("capture failed, stopping pipeline: {e}");
                break Err(e);
            }
        };
        self.source.close();
        log::info!("pipeline stopped after publishing {} point(s)", self.published);
        result
    }

    pub fn published(&self) -> u64 {
        self.published
    }
}
