use serde::{Deserialize, Serialize};

/// Convert one RGB pixel to HSV with OpenCV-compatible scaling: hue in
/// `0..180`, saturation and value in `0..=255`. Using the same scaling the
/// rig's color bounds were originally tuned in lets those numbers port
/// unchanged into config files.
#[inline]
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let r = rgb[0] as f32 / 255.0;
    let g = rgb[1] as f32 / 255.0;
    let b = rgb[2] as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let value = max;
    let saturation = if max > 0.0 { delta / max } else { 0.0 };

    let hue_deg = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta) % 6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let hue_deg = if hue_deg < 0.0 { hue_deg + 360.0 } else { hue_deg };

    [
        (hue_deg / 2.0).round().min(179.0) as u8,
        (saturation * 255.0).round() as u8,
        (value * 255.0).round() as u8,
    ]
}

/// Inclusive HSV bounds describing the marker color.
///
/// Channels use the scaling of [`rgb_to_hsv`]. Hue does not wrap: a range
/// straddling the red wrap-around is expressed as two detector passes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ColorRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl ColorRange {
    pub fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    /// Bounds tuned for the green surgical marker.
    pub fn green() -> Self {
        Self::new([40, 90, 20], [50, 255, 255])
    }

    /// Bounds tuned for the red marker variant.
    pub fn red() -> Self {
        Self::new([0, 100, 100], [10, 255, 255])
    }

    #[inline]
    pub fn contains_rgb(&self, rgb: [u8; 3]) -> bool {
        let hsv = rgb_to_hsv(rgb);
        (0..3).all(|c| self.lower[c] <= hsv[c] && hsv[c] <= self.upper[c])
    }
}
