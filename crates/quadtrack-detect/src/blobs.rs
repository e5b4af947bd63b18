//! Connected-blob extraction over a binary mask.
//!
//! The external-contour pass of the original imaging library reduces, for
//! centroid purposes, to 8-connected component labeling: one blob per
//! component, weighted by its pixel count.

use nalgebra::Point2;

/// One connected region of mask pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct Blob {
    /// Number of mask pixels in the region.
    pub area: usize,
    /// Area-weighted centroid in pixel coordinates.
    pub centroid: Point2<f64>,
}

const NEIGHBORS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Label 8-connected components of `mask` (row-major, `width * height`) and
/// return one blob per component.
///
/// A component with zero accumulated weight is skipped instead of producing
/// a division by zero; with a binary mask that case cannot arise from a
/// seeded fill, so the guard only protects against degenerate inputs.
pub fn extract_blobs(mask: &[bool], width: usize, height: usize) -> Vec<Blob> {
    debug_assert_eq!(mask.len(), width * height);

    let mut visited = vec![false; mask.len()];
    let mut stack: Vec<(usize, usize)> = Vec::new();
    let mut blobs = Vec::new();

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            if !mask[idx] || visited[idx] {
                continue;
            }

            let mut area = 0usize;
            let mut sum_x = 0.0f64;
            let mut sum_y = 0.0f64;

            visited[idx] = true;
            stack.push((x, y));
            while let Some((cx, cy)) = stack.pop() {
                area += 1;
                sum_x += cx as f64;
                sum_y += cy as f64;

                for (dx, dy) in NEIGHBORS {
                    let nx = cx as i32 + dx;
                    let ny = cy as i32 + dy;
                    if nx < 0 || ny < 0 || nx >= width as i32 || ny >= height as i32 {
                        continue;
                    }
                    let nidx = ny as usize * width + nx as usize;
                    if mask[nidx] && !visited[nidx] {
                        visited[nidx] = true;
                        stack.push((nx as usize, ny as usize));
                    }
                }
            }

            if area == 0 {
                continue;
            }
            blobs.push(Blob {
                area,
                centroid: Point2::new(sum_x / area as f64, sum_y / area as f64),
            });
        }
    }

    blobs
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn mask_from(rows: &[&str]) -> (Vec<bool>, usize, usize) {
        let height = rows.len();
        let width = rows[0].len();
        let mut mask = Vec::with_capacity(width * height);
        for row in rows {
            mask.extend(row.bytes().map(|b| b == b'#'));
        }
        (mask, width, height)
    }

    #[test]
    fn empty_mask_has_no_blobs() {
        let (mask, w, h) = mask_from(&["....", "....", "...."]);
        assert!(extract_blobs(&mask, w, h).is_empty());
    }

    #[test]
    fn single_square_centroid() {
        let (mask, w, h) = mask_from(&[
            "......", //
            ".##...", //
            ".##...", //
            "......",
        ]);
        let blobs = extract_blobs(&mask, w, h);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].area, 4);
        assert_relative_eq!(blobs[0].centroid.x, 1.5);
        assert_relative_eq!(blobs[0].centroid.y, 1.5);
    }

    #[test]
    fn separated_regions_become_two_blobs() {
        let (mask, w, h) = mask_from(&[
            "##....##", //
            "##....##", //
            "........",
        ]);
        let blobs = extract_blobs(&mask, w, h);
        assert_eq!(blobs.len(), 2);
        assert_eq!(blobs[0].area + blobs[1].area, 8);
    }

    #[test]
    fn diagonal_pixels_join_one_blob() {
        let (mask, w, h) = mask_from(&[
            "#...", //
            ".#..", //
            "..#.",
        ]);
        let blobs = extract_blobs(&mask, w, h);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].area, 3);
    }
}
