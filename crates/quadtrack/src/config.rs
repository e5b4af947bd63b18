//! Runtime configuration for a tracking run.

use std::fs;
use std::path::{Path, PathBuf};

use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

use quadtrack_core::SnapshotError;
use quadtrack_detect::ColorRange;

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5555
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("calibration.json")
}

/// JSON-backed configuration of one tracking run.
///
/// `world_rotation` is the optional rig-mounting correction applied to every
/// fused point before publishing: a calibration constant specific to how the
/// physical rig is mounted (for the original rig, roughly -120 degrees about
/// the x axis), not a property of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Calibration snapshot consumed at startup. Missing or corrupt is
    /// fatal: the pipeline never runs uncalibrated.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
    /// Text artifact overwritten with the latest fused coordinate.
    #[serde(default)]
    pub sink_path: Option<PathBuf>,
    #[serde(default = "ColorRange::green")]
    pub marker: ColorRange,
    #[serde(default)]
    pub world_rotation: Option<Matrix3<f64>>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            snapshot_path: default_snapshot_path(),
            sink_path: None,
            marker: ColorRange::green(),
            world_rotation: None,
        }
    }
}

impl TrackerConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg: TrackerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.listen_addr(), "127.0.0.1:5555");
        assert_eq!(cfg.marker, ColorRange::green());
        assert!(cfg.world_rotation.is_none());
    }

    #[test]
    fn config_round_trips_through_disk() {
        let mut cfg = TrackerConfig::default();
        cfg.port = 6001;
        cfg.world_rotation = Some(Matrix3::new(
            1.0, 0.0, 0.0, //
            0.0, 0.81733806, 0.57615839, //
            0.0, -0.57615839, 0.81733806,
        ));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.json");
        cfg.write_json(&path).unwrap();
        let loaded = TrackerConfig::load_json(&path).unwrap();
        assert_eq!(loaded.port, 6001);
        assert_eq!(loaded.world_rotation, cfg.world_rotation);
    }
}
