//! Frame capture for the quadtrack rig.
//!
//! The rig's four synchronized cameras arrive as one combined frame per
//! capture cycle. This crate owns the device abstraction, the demultiplexer
//! that slices the combined frame into per-camera sub-frames, and a
//! deterministic synthetic device used by tests and the demo binary.
//! Real device drivers (V4L2 and friends) live outside this workspace.

mod device;
mod frame;
mod source;
mod synthetic;

pub use device::{CaptureDevice, CaptureError};
pub use frame::{Frame, FrameSet};
pub use source::FrameSource;
pub use synthetic::SyntheticQuadCam;
