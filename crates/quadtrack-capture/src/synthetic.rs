//! Deterministic stand-in for the physical quadcam.

use image::{Rgb, RgbImage};

use quadtrack_core::CAMERA_COUNT;

use crate::device::{CaptureDevice, CaptureError};

/// Renders combined frames with one filled marker disc per selected camera
/// slice, following a scripted per-cycle position. Drives the pipeline in
/// tests and the demo binary, where a real capture driver is unavailable.
pub struct SyntheticQuadCam {
    slice_width: u32,
    height: u32,
    marker: [u8; 3],
    radius: i32,
    /// Marker position per camera slice for each upcoming cycle; `None`
    /// hides the marker from that camera. The last entry repeats once the
    /// script runs out.
    script: Vec<[Option<(i32, i32)>; CAMERA_COUNT]>,
    cursor: usize,
    opened: bool,
}

impl SyntheticQuadCam {
    pub fn new(slice_width: u32, height: u32, marker: [u8; 3]) -> Self {
        Self {
            slice_width,
            height,
            marker,
            radius: 4,
            script: vec![[Some((slice_width as i32 / 2, height as i32 / 2)); CAMERA_COUNT]],
            cursor: 0,
            opened: false,
        }
    }

    /// Replace the default centered-marker script.
    pub fn with_script(mut self, script: Vec<[Option<(i32, i32)>; CAMERA_COUNT]>) -> Self {
        assert!(!script.is_empty(), "script needs at least one cycle");
        self.script = script;
        self
    }

    pub fn with_radius(mut self, radius: i32) -> Self {
        self.radius = radius;
        self
    }

    fn render(&self, positions: &[Option<(i32, i32)>; CAMERA_COUNT]) -> RgbImage {
        let width = self.slice_width * CAMERA_COUNT as u32;
        let mut combined = RgbImage::from_pixel(width, self.height, Rgb([18, 18, 18]));
        for (slice, pos) in positions.iter().enumerate() {
            let Some((cx, cy)) = *pos else { continue };
            let x_offset = slice as i32 * self.slice_width as i32;
            for dy in -self.radius..=self.radius {
                for dx in -self.radius..=self.radius {
                    if dx * dx + dy * dy > self.radius * self.radius {
                        continue;
                    }
                    let x = x_offset + cx + dx;
                    let y = cy + dy;
                    let in_slice = cx + dx >= 0 && cx + dx < self.slice_width as i32;
                    if in_slice && y >= 0 && y < self.height as i32 {
                        combined.put_pixel(x as u32, y as u32, Rgb(self.marker));
                    }
                }
            }
        }
        combined
    }
}

impl CaptureDevice for SyntheticQuadCam {
    fn open(&mut self) -> Result<(), CaptureError> {
        self.opened = true;
        Ok(())
    }

    fn grab(&mut self) -> Result<RgbImage, CaptureError> {
        if !self.opened {
            return Err(CaptureError::ReadFailed("device not opened".into()));
        }
        let positions = &self.script[self.cursor.min(self.script.len() - 1)];
        let frame = self.render(positions);
        self.cursor += 1;
        Ok(frame)
    }

    fn close(&mut self) {
        self.opened = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FrameSource;

    const MARKER: [u8; 3] = [128, 200, 64];

    #[test]
    fn marker_lands_in_the_scripted_slice_only() {
        let device = SyntheticQuadCam::new(40, 30, MARKER).with_script(vec![[
            Some((10, 15)),
            None,
            Some((30, 5)),
            None,
        ]]);
        let mut source = FrameSource::new(device);
        source.open().unwrap();
        let set = source.read().unwrap();

        for frame in set.frames() {
            let has_marker = frame.image.pixels().any(|p| p.0 == MARKER);
            let expected = matches!(frame.camera.index(), 0 | 2);
            assert_eq!(has_marker, expected, "{}", frame.camera);
        }
    }

    #[test]
    fn script_advances_per_cycle_and_repeats_last_entry() {
        let device = SyntheticQuadCam::new(40, 30, MARKER).with_script(vec![
            [None; CAMERA_COUNT],
            [Some((20, 15)); CAMERA_COUNT],
        ]);
        let mut source = FrameSource::new(device);
        source.open().unwrap();

        let empty = source.read().unwrap();
        assert!(empty
            .frames()
            .iter()
            .all(|f| f.image.pixels().all(|p| p.0 != MARKER)));

        for _ in 0..2 {
            let lit = source.read().unwrap();
            assert!(lit
                .frames()
                .iter()
                .all(|f| f.image.pixels().any(|p| p.0 == MARKER)));
        }
    }
}
