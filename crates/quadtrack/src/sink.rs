//! Persistence sink for fused coordinates.

use std::fs;
use std::io;
use std::path::PathBuf;

use nalgebra::Point3;

use crate::server::format_point;

/// Downstream consumer of fused points outside the streaming path.
pub trait CoordinateSink: Send {
    fn record(&mut self, point: &Point3<f64>) -> io::Result<()>;
}

/// Overwrites a small text file with the latest fused coordinate, using the
/// same `"<x> <y> <z>"` line format as the wire protocol.
pub struct LatestPointFile {
    path: PathBuf,
}

impl LatestPointFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl CoordinateSink for LatestPointFile {
    fn record(&mut self, point: &Point3<f64>) -> io::Result<()> {
        fs::write(&self.path, format_point(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_keeps_only_the_latest_point() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest.txt");
        let mut sink = LatestPointFile::new(&path);

        sink.record(&Point3::new(1.0, 2.0, 3.0)).unwrap();
        sink.record(&Point3::new(-4.5, 0.25, 19.0)).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "-4.500000 0.250000 19.000000\n");
    }
}
