use image::RgbImage;
use nalgebra::Point2;

use quadtrack_core::CameraId;

use crate::blobs::extract_blobs;
use crate::color::ColorRange;

/// What one camera saw in one frame.
///
/// `point` is the arithmetic mean of all blob centroids and is `None`
/// exactly when `centroids` is empty. Derived entirely from one frame;
/// carries no state across cycles.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub camera: CameraId,
    pub centroids: Vec<Point2<f64>>,
    pub point: Option<Point2<f64>>,
}

impl Detection {
    fn from_centroids(camera: CameraId, centroids: Vec<Point2<f64>>) -> Self {
        let point = mean_point(&centroids);
        Self {
            camera,
            centroids,
            point,
        }
    }
}

fn mean_point(centroids: &[Point2<f64>]) -> Option<Point2<f64>> {
    if centroids.is_empty() {
        return None;
    }
    let n = centroids.len() as f64;
    let (sx, sy) = centroids
        .iter()
        .fold((0.0, 0.0), |(sx, sy), c| (sx + c.x, sy + c.y));
    Some(Point2::new(sx / n, sy / n))
}

/// Detects the colored marker in single-camera frames.
///
/// Pure function of the frame and the configured bounds: thresholds the
/// frame into a binary mask over the color range, extracts connected blobs,
/// and averages their area-weighted centroids.
#[derive(Clone, Debug)]
pub struct MarkerDetector {
    range: ColorRange,
}

impl MarkerDetector {
    pub fn new(range: ColorRange) -> Self {
        Self { range }
    }

    pub fn range(&self) -> &ColorRange {
        &self.range
    }

    pub fn detect(&self, camera: CameraId, image: &RgbImage) -> Detection {
        let centroids = self.centroids(image);
        log::trace!("{camera}: {} marker blob(s)", centroids.len());
        Detection::from_centroids(camera, centroids)
    }

    /// Diagnostic variant: same detection data, plus a copy of the frame
    /// with blob pixels lifted and centroids marked for on-screen review.
    pub fn detect_with_overlay(&self, camera: CameraId, image: &RgbImage) -> (Detection, RgbImage) {
        let detection = self.detect(camera, image);
        let mut overlay = image.clone();
        for pixel in overlay.pixels_mut() {
            if self.range.contains_rgb(pixel.0) {
                pixel.0 = [255, 255, 255];
            }
        }
        for c in &detection.centroids {
            draw_marker(&mut overlay, c, 2, [255, 255, 255]);
        }
        if let Some(p) = &detection.point {
            draw_marker(&mut overlay, p, 6, [255, 0, 0]);
        }
        (detection, overlay)
    }

    fn centroids(&self, image: &RgbImage) -> Vec<Point2<f64>> {
        let (width, height) = (image.width() as usize, image.height() as usize);
        let mut mask = vec![false; width * height];
        for (x, y, pixel) in image.enumerate_pixels() {
            mask[y as usize * width + x as usize] = self.range.contains_rgb(pixel.0);
        }

        extract_blobs(&mask, width, height)
            .into_iter()
            .map(|blob| blob.centroid)
            .collect()
    }
}

fn draw_marker(image: &mut RgbImage, at: &Point2<f64>, radius: i32, color: [u8; 3]) {
    let (cx, cy) = (at.x.round() as i32, at.y.round() as i32);
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy > radius * radius {
                continue;
            }
            let (x, y) = (cx + dx, cy + dy);
            if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
                image.put_pixel(x as u32, y as u32, image::Rgb(color));
            }
        }
    }
}
