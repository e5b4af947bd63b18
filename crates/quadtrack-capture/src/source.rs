use image::RgbImage;

use quadtrack_core::{CameraId, CAMERA_COUNT};

use crate::device::{CaptureDevice, CaptureError};
use crate::frame::{Frame, FrameSet};

/// Owns the capture device and demultiplexes each combined frame into one
/// sub-frame per camera.
///
/// `read` replaces the previous frame set and stamps the new one with the
/// next value of a monotonic sequence counter. Slices are produced in
/// camera-index order 0..N-1; nothing downstream may reorder them.
pub struct FrameSource<D: CaptureDevice> {
    device: D,
    opened: bool,
    seq: u64,
    current: Option<FrameSet>,
}

impl<D: CaptureDevice> FrameSource<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            opened: false,
            seq: 0,
            current: None,
        }
    }

    /// Acquire the device. Failure is recoverable: the source stays closed
    /// and `open` may be retried.
    pub fn open(&mut self) -> Result<(), CaptureError> {
        self.device.open()?;
        self.opened = true;
        log::info!("capture source opened ({CAMERA_COUNT} cameras)");
        Ok(())
    }

    /// Pull one combined frame, split it into equal-width vertical slices
    /// and store them as the current frame set.
    pub fn read(&mut self) -> Result<&FrameSet, CaptureError> {
        if !self.opened {
            return Err(CaptureError::Closed);
        }

        let combined = self.device.grab()?;
        let (width, height) = combined.dimensions();
        if width == 0 || width % CAMERA_COUNT as u32 != 0 {
            return Err(CaptureError::BadFrame {
                width,
                height,
                cameras: CAMERA_COUNT,
            });
        }

        self.seq += 1;
        let slice_width = width / CAMERA_COUNT as u32;
        let frames = CameraId::all()
            .map(|camera| {
                let x0 = camera.index() as u32 * slice_width;
                let image = crop(&combined, x0, slice_width, height);
                Frame {
                    camera,
                    seq: self.seq,
                    image,
                }
            })
            .collect();

        Ok(&*self.current.insert(FrameSet::new(self.seq, frames)))
    }

    /// The most recent frame set, if any cycle has completed.
    pub fn current(&self) -> Option<&FrameSet> {
        self.current.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.opened
    }

    /// Release the device. Idempotent; `read` afterwards fails with
    /// [`CaptureError::Closed`].
    pub fn close(&mut self) {
        if self.opened {
            self.device.close();
            self.opened = false;
            log::info!("capture source closed after {} cycle(s)", self.seq);
        }
    }
}

impl<D: CaptureDevice> Drop for FrameSource<D> {
    fn drop(&mut self) {
        self.close();
    }
}

fn crop(combined: &RgbImage, x0: u32, width: u32, height: u32) -> RgbImage {
    let mut out = RgbImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            out.put_pixel(x, y, *combined.get_pixel(x0 + x, y));
        }
    }
    out
}
