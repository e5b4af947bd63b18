use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::camera::{CameraId, CameraIntrinsics};
use crate::error::CalibrationError;

/// Ordered key of a stereo pair.
///
/// `reference` is the camera whose coordinate frame the pair extrinsics are
/// expressed in; every triangulated point for this pair comes out in that
/// frame. The two cameras must be distinct.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct PairKey {
    pub reference: CameraId,
    pub other: CameraId,
}

impl PairKey {
    pub fn new(reference: CameraId, other: CameraId) -> Result<Self, CalibrationError> {
        if reference == other {
            return Err(CalibrationError::SelfPair(reference));
        }
        Ok(Self { reference, other })
    }
}

impl std::fmt::Display for PairKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pair{}{}", u8::from(self.reference), u8::from(self.other))
    }
}

/// Extrinsic calibration of one stereo pair, with both cameras' intrinsics
/// embedded so a pipeline can operate from pair data alone.
///
/// `rotation`/`translation` map the other camera's frame onto the reference
/// camera's frame. `rms_error` is the reprojection RMSE reported by the
/// calibration routine; `None` when the parameters were supplied externally
/// and no residual is known.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StereoCalibration {
    pub key: PairKey,
    pub reference: CameraIntrinsics,
    pub other: CameraIntrinsics,
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
    #[serde(default)]
    pub essential: Option<Matrix3<f64>>,
    #[serde(default)]
    pub fundamental: Option<Matrix3<f64>>,
    #[serde(default)]
    pub rms_error: Option<f64>,
}

impl StereoCalibration {
    /// Build a pair calibration, checking that the embedded intrinsics match
    /// the key's endpoints.
    pub fn new(
        key: PairKey,
        reference: CameraIntrinsics,
        other: CameraIntrinsics,
        rotation: Matrix3<f64>,
        translation: Vector3<f64>,
    ) -> Result<Self, CalibrationError> {
        if reference.camera != key.reference {
            return Err(CalibrationError::MissingIntrinsics(key.reference));
        }
        if other.camera != key.other {
            return Err(CalibrationError::MissingIntrinsics(key.other));
        }
        Ok(Self {
            key,
            reference,
            other,
            rotation,
            translation,
            essential: None,
            fundamental: None,
            rms_error: None,
        })
    }

    pub fn with_rms_error(mut self, rms: f64) -> Self {
        self.rms_error = Some(rms);
        self
    }

    pub fn with_epipolar(mut self, essential: Matrix3<f64>, fundamental: Matrix3<f64>) -> Self {
        self.essential = Some(essential);
        self.fundamental = Some(fundamental);
        self
    }
}
