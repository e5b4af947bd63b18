//! Capture device contract.

use image::RgbImage;
use thiserror::Error;

/// Errors raised by a capture device or the frame source wrapping it.
///
/// `DeviceUnavailable` and `OpenFailed` are recoverable: the caller may
/// retry or abort cleanly. A failure during a running capture loop is fatal
/// to that loop.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture device not found: {0}")]
    DeviceUnavailable(String),

    #[error("failed to open capture device: {0}")]
    OpenFailed(String),

    #[error("failed to read a frame: {0}")]
    ReadFailed(String),

    #[error("capture source is closed")]
    Closed,

    #[error("combined frame {width}x{height} does not split into {cameras} equal-width slices")]
    BadFrame {
        width: u32,
        height: u32,
        cameras: usize,
    },
}

/// One physical (or simulated) capture device delivering combined frames.
///
/// The contract mirrors a video-capture handle: `open` acquires the device,
/// `grab` blocks until the next combined frame is available (bounded by the
/// device's own timeout), `close` releases it. Implementations live outside
/// this workspace except for the synthetic test device.
pub trait CaptureDevice: Send {
    fn open(&mut self) -> Result<(), CaptureError>;

    fn grab(&mut self) -> Result<RgbImage, CaptureError>;

    fn close(&mut self);
}
