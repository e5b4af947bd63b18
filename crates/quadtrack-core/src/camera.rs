use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

use crate::error::CalibrationError;

/// Number of synchronized cameras on the rig.
pub const CAMERA_COUNT: usize = 4;

/// Index of one camera on the rig, validated to `0..CAMERA_COUNT`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct CameraId(u8);

impl CameraId {
    pub fn new(index: u8) -> Result<Self, CalibrationError> {
        if (index as usize) < CAMERA_COUNT {
            Ok(Self(index))
        } else {
            Err(CalibrationError::InvalidCamera(index))
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// All camera ids on the rig, in index order.
    pub fn all() -> impl Iterator<Item = CameraId> {
        (0..CAMERA_COUNT as u8).map(CameraId)
    }
}

impl TryFrom<u8> for CameraId {
    type Error = CalibrationError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Self::new(index)
    }
}

impl From<CameraId> for u8 {
    fn from(id: CameraId) -> u8 {
        id.0
    }
}

impl std::fmt::Display for CameraId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "camera{}", self.0)
    }
}

/// Internal projection parameters of one camera: the 3x3 intrinsic matrix
/// plus the 5 lens distortion coefficients.
///
/// Produced once by an external calibration routine and immutable after
/// creation; the store owns the only mutable slot per camera.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub camera: CameraId,
    pub matrix: Matrix3<f64>,
    pub distortion: [f64; 5],
}

impl CameraIntrinsics {
    pub fn new(camera: CameraId, matrix: Matrix3<f64>, distortion: [f64; 5]) -> Self {
        Self {
            camera,
            matrix,
            distortion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_id_rejects_out_of_range() {
        assert!(CameraId::new(0).is_ok());
        assert!(CameraId::new(3).is_ok());
        assert_eq!(
            CameraId::new(4),
            Err(CalibrationError::InvalidCamera(4))
        );
    }

    #[test]
    fn camera_id_serializes_as_plain_index() {
        let id = CameraId::new(2).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "2");
        let back: CameraId = serde_json::from_str("2").unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<CameraId>("9").is_err());
    }
}
