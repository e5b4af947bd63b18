use crate::camera::CameraId;

/// Rejected calibration input. All variants are configuration-time errors:
/// a store that refuses an entry is left unchanged.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CalibrationError {
    #[error("camera index {0} is out of range (rig has {max} cameras)", max = crate::CAMERA_COUNT)]
    InvalidCamera(u8),
    #[error("a stereo pair needs two distinct cameras, got {0} twice")]
    SelfPair(CameraId),
    #[error("{0} has no recorded intrinsics; solo-calibrate it before the stereo pair")]
    MissingIntrinsics(CameraId),
}

/// Calibration snapshot could not be read or written. Fatal at startup:
/// a pipeline must never run against a silently empty store.
#[derive(thiserror::Error, Debug)]
pub enum SnapshotError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("snapshot rejected: {0}")]
    Invalid(#[from] CalibrationError),
}
