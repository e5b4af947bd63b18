use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::camera::{CameraId, CameraIntrinsics, CAMERA_COUNT};
use crate::error::{CalibrationError, SnapshotError};
use crate::pair::{PairKey, StereoCalibration};

/// Holds, validates and persists the rig calibration: one optional
/// intrinsics slot per camera and one extrinsics entry per stereo pair.
///
/// The store is populated once at startup (by running calibration or by
/// loading a snapshot) and is read-only while a pipeline runs.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CalibrationStore {
    intrinsics: [Option<CameraIntrinsics>; CAMERA_COUNT],
    pairs: HashMap<PairKey, StereoCalibration>,
}

/// On-disk snapshot format. Intrinsics travel embedded inside each pair
/// entry, so the pair list alone reconstructs the full store.
#[derive(Serialize, Deserialize)]
struct Snapshot {
    pairs: Vec<StereoCalibration>,
}

impl CalibrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or overwrite the intrinsics for one camera.
    pub fn record_intrinsics(&mut self, params: CameraIntrinsics) {
        let index = params.camera.index();
        self.intrinsics[index] = Some(params);
    }

    /// Register a stereo pair. Both endpoint cameras must already have
    /// recorded intrinsics (solo calibration precedes stereo calibration).
    pub fn record_pair(&mut self, calib: StereoCalibration) -> Result<(), CalibrationError> {
        for cam in [calib.key.reference, calib.key.other] {
            if self.intrinsics[cam.index()].is_none() {
                return Err(CalibrationError::MissingIntrinsics(cam));
            }
        }
        self.pairs.insert(calib.key, calib);
        Ok(())
    }

    pub fn intrinsics(&self, camera: CameraId) -> Option<&CameraIntrinsics> {
        self.intrinsics[camera.index()].as_ref()
    }

    /// A missing pair means "do not triangulate this pair this cycle",
    /// never a fatal condition.
    pub fn pair(&self, key: PairKey) -> Option<&StereoCalibration> {
        self.pairs.get(&key)
    }

    /// All registered pairs in deterministic (key-sorted) order.
    pub fn pairs(&self) -> Vec<&StereoCalibration> {
        let mut out: Vec<&StereoCalibration> = self.pairs.values().collect();
        out.sort_by_key(|c| c.key);
        out
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Serialize the pair mapping (embedded intrinsics included) as JSON.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let snapshot = Snapshot {
            pairs: self.pairs().into_iter().cloned().collect(),
        };
        let json = serde_json::to_string_pretty(&snapshot)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Rebuild a store from a snapshot written by [`persist`](Self::persist).
    ///
    /// Each pair's embedded intrinsics are re-recorded before the pair is
    /// re-registered, so the loaded store satisfies the same invariants as
    /// one built by calibration.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let raw = fs::read_to_string(&path)?;
        let snapshot: Snapshot = serde_json::from_str(&raw)?;

        let mut store = Self::new();
        for calib in snapshot.pairs {
            store.record_intrinsics(calib.reference.clone());
            store.record_intrinsics(calib.other.clone());
            store.record_pair(calib)?;
        }
        log::info!(
            "loaded calibration snapshot: {} pair(s) from {}",
            store.pair_count(),
            path.as_ref().display()
        );
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Matrix3, Rotation3, Vector3};

    fn cam(i: u8) -> CameraId {
        CameraId::new(i).unwrap()
    }

    fn intrinsics(i: u8, focal: f64) -> CameraIntrinsics {
        let k = Matrix3::new(focal, 0.0, 320.0, 0.0, focal, 200.0, 0.0, 0.0, 1.0);
        CameraIntrinsics::new(cam(i), k, [0.01, -0.02, 0.0, 0.0, 0.003])
    }

    fn pair(store: &CalibrationStore, a: u8, b: u8) -> StereoCalibration {
        let key = PairKey::new(cam(a), cam(b)).unwrap();
        StereoCalibration::new(
            key,
            store.intrinsics(cam(a)).unwrap().clone(),
            store.intrinsics(cam(b)).unwrap().clone(),
            Rotation3::from_axis_angle(&Vector3::y_axis(), 0.2).into_inner(),
            Vector3::new(-4.5, 0.0, 0.3),
        )
        .unwrap()
        .with_rms_error(0.37)
    }

    #[test]
    fn pair_before_intrinsics_is_rejected() {
        let mut store = CalibrationStore::new();
        store.record_intrinsics(intrinsics(0, 800.0));
        let key = PairKey::new(cam(0), cam(1)).unwrap();
        let calib = StereoCalibration::new(
            key,
            intrinsics(0, 800.0),
            intrinsics(1, 810.0),
            Matrix3::identity(),
            Vector3::zeros(),
        )
        .unwrap();
        assert_eq!(
            store.record_pair(calib),
            Err(CalibrationError::MissingIntrinsics(cam(1)))
        );
        assert!(store.is_empty());
    }

    #[test]
    fn missing_pair_reads_as_none() {
        let store = CalibrationStore::new();
        let key = PairKey::new(cam(2), cam(3)).unwrap();
        assert!(store.pair(key).is_none());
    }

    #[test]
    fn snapshot_round_trip_is_lossless() {
        let mut store = CalibrationStore::new();
        for i in 0..3 {
            store.record_intrinsics(intrinsics(i, 780.0 + i as f64 * 7.0));
        }
        store.record_pair(pair(&store, 0, 1)).unwrap();
        store.record_pair(pair(&store, 0, 2)).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.json");
        store.persist(&path).unwrap();
        let loaded = CalibrationStore::load(&path).unwrap();

        assert_eq!(loaded.pair_count(), 2);
        // Bit-identical round trip: every intrinsics slot and pair entry.
        assert_eq!(loaded, store);
    }

    #[test]
    fn loading_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = CalibrationStore::load(dir.path().join("absent.json"));
        assert!(matches!(err, Err(SnapshotError::Io(_))));
    }

    #[test]
    fn loading_corrupt_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = CalibrationStore::load(&path);
        assert!(matches!(err, Err(SnapshotError::Json(_))));
    }
}
