use image::RgbImage;

use quadtrack_core::CameraId;

/// One camera's sub-frame for one capture cycle.
///
/// Created by the frame source, consumed by detection within the same
/// cycle, then discarded; frames are never retained across cycles.
#[derive(Clone, Debug)]
pub struct Frame {
    pub camera: CameraId,
    /// Monotonic capture-cycle counter shared by all frames of one set.
    pub seq: u64,
    pub image: RgbImage,
}

/// The per-cycle snapshot: exactly one frame per camera, in fixed
/// camera-index order regardless of how the rig is mounted.
#[derive(Clone, Debug)]
pub struct FrameSet {
    pub seq: u64,
    frames: Vec<Frame>,
}

impl FrameSet {
    pub(crate) fn new(seq: u64, frames: Vec<Frame>) -> Self {
        debug_assert!(frames
            .iter()
            .enumerate()
            .all(|(i, f)| f.camera.index() == i));
        Self { seq, frames }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame(&self, camera: CameraId) -> &Frame {
        &self.frames[camera.index()]
    }

    pub fn camera_count(&self) -> usize {
        self.frames.len()
    }
}
