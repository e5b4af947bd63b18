//! Color-marker detection for the quadtrack rig.
//!
//! Given one camera frame and a configured HSV color range, this crate
//! thresholds the frame into a binary mask, extracts connected blobs,
//! computes each blob's area-weighted centroid, and reports the mean of the
//! centroids as the representative marker point. A frame with no matching
//! pixels yields an explicit "no detection", never a sentinel coordinate.

mod blobs;
mod color;
mod detector;

pub use blobs::{extract_blobs, Blob};
pub use color::{rgb_to_hsv, ColorRange};
pub use detector::{Detection, MarkerDetector};
