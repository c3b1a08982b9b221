// THEORY:
// The `RegionDetector` is the spatial grouping step between a binary mask and a
// physical area. It traces the outer boundary of every connected foreground region
// and measures the area that boundary encloses.
//
// Key architectural principles & algorithm steps:
// 1.  **Border following**: the mask is rendered as an 8-bit image inside a one
//     pixel background frame and handed to `imageproc`'s Suzuki-Abe border
//     follower, which yields every border together with its place in the nesting
//     hierarchy. The follower assumes the image edge is background; without the
//     frame, regions touching the edge come back mislabelled or not at all.
// 2.  **External only**: only top-level outer borders are kept. Holes inside a
//     region are not tracked separately and neither are islands inside holes; an
//     island is already covered by the polygon of the region that surrounds it.
// 3.  **Polygon area**: each border is a closed chain of boundary pixel centres.
//     Its area is the shoelace area of that polygon, the usual "contour area"
//     definition. A lone pixel or a one-pixel-wide line therefore encloses nothing.
// 4.  **Stateless utility**: like the rest of the spatial layer it has no memory
//     between images.

use crate::core_modules::region_mask::RegionMask;
use image::{GrayImage, Luma};

const FRAME: u32 = 1;

/// `mask` as 0 / 255 with a background frame of `FRAME` pixels on every side.
fn framed_gray_image(mask: &RegionMask) -> GrayImage {
    GrayImage::from_fn(mask.width() + 2 * FRAME, mask.height() + 2 * FRAME, |x, y| {
        let inside = x >= FRAME && y >= FRAME && mask.get(x - FRAME, y - FRAME);
        if inside { Luma([255u8]) } else { Luma([0u8]) }
    })
}

pub mod region_detector {
    use super::*;
    use imageproc::contours::{find_contours, BorderType};

    /// A connected foreground region described by its outer boundary.
    #[derive(Debug, Clone, PartialEq)]
    pub struct ExternalRegion {
        /// Boundary pixel centres in tracing order; the polygon closes implicitly.
        pub boundary: Vec<(i32, i32)>,
        /// Area enclosed by `boundary`, in square pixels.
        pub pixel_area: f64,
    }

    /// Finds every top-level outer boundary in `mask`.
    pub fn find_external_regions(mask: &RegionMask) -> Vec<ExternalRegion> {
        if mask.is_empty() {
            return Vec::new();
        }

        let offset = FRAME as i32;
        find_contours::<i32>(&framed_gray_image(mask))
            .into_iter()
            .filter(|contour| contour.parent.is_none() && matches!(contour.border_type, BorderType::Outer))
            .map(|contour| {
                let boundary: Vec<(i32, i32)> = contour
                    .points
                    .iter()
                    .map(|p| (p.x - offset, p.y - offset))
                    .collect();
                let pixel_area = polygon_area(&boundary);
                ExternalRegion { boundary, pixel_area }
            })
            .collect()
    }

    /// Total area, in square pixels, enclosed by the external boundaries of `mask`.
    pub fn external_pixel_area(mask: &RegionMask) -> f64 {
        // Folding from +0.0 keeps a blank mask at +0.0; an empty `sum` yields -0.0.
        find_external_regions(mask)
            .iter()
            .fold(0.0, |total, region| total + region.pixel_area)
    }

    /// Shoelace area of a closed polygon. Orientation does not matter.
    pub fn polygon_area(points: &[(i32, i32)]) -> f64 {
        if points.len() < 3 {
            return 0.0;
        }
        let mut twice_area = 0i64;
        for (i, &(x0, y0)) in points.iter().enumerate() {
            let (x1, y1) = points[(i + 1) % points.len()];
            twice_area += x0 as i64 * y1 as i64 - x1 as i64 * y0 as i64;
        }
        twice_area.abs() as f64 / 2.0
    }
}
