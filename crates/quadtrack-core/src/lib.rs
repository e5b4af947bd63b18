//! Core calibration and reconstruction types for the quadtrack rig.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! depend on any capture device or image type: it holds per-camera
//! intrinsics, per-pair extrinsics, the calibration store with its JSON
//! snapshot format, and the two-view triangulation / fusion math.

mod camera;
mod error;
mod logger;
mod pair;
mod store;
mod triangulate;

pub use camera::{CameraId, CameraIntrinsics, CAMERA_COUNT};
pub use error::{CalibrationError, SnapshotError};
pub use pair::{PairKey, StereoCalibration};
pub use store::CalibrationStore;
pub use triangulate::{
    fuse, projection_matrix, triangulate_pair, TriangulationError, W_EPSILON,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
