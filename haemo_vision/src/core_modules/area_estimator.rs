// THEORY:
// The area estimator turns a pair of masks into physical footprints. Raw pixel areas
// come from the region detector; the calibration model turns them into cm².
//
// Standing liquid usually sits on top of a soaked patch, so the standing footprint is
// also counted in the absorbed footprint. To avoid counting that liquid twice, the
// raw standing pixel area is taken off the raw absorbed pixel area before
// calibration, floored at zero. The standing area itself is left as measured.

use crate::core_modules::calibration::Calibration;
use crate::core_modules::region_detector::region_detector::external_pixel_area;
use crate::core_modules::region_mask::{MaskPair, RegionMask};

/// Physical footprints of one image, before rounding.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AreaEstimate {
    /// Raw enclosed pixel area of the absorbed mask.
    pub absorbed_pixels: f64,
    /// Raw enclosed pixel area of the standing mask.
    pub standing_pixels: f64,
    /// Absorbed-only area in cm², overlap with standing removed.
    pub absorbed_cm2: f64,
    /// Standing area in cm².
    pub standing_cm2: f64,
}

/// Area of one mask in cm², for an image as wide as the mask.
pub fn area(mask: &RegionMask, calibration: &Calibration) -> f64 {
    calibration.pixel_area_to_cm2(external_pixel_area(mask), mask.width())
}

/// Areas of both masks with the overlap correction applied.
pub fn estimate(masks: &MaskPair, calibration: &Calibration) -> AreaEstimate {
    let pixel_width = masks.absorbed.width();
    let absorbed_pixels = external_pixel_area(&masks.absorbed);
    let standing_pixels = external_pixel_area(&masks.standing);
    let absorbed_only_pixels = (absorbed_pixels - standing_pixels).max(0.0);

    AreaEstimate {
        absorbed_pixels,
        standing_pixels,
        absorbed_cm2: calibration.pixel_area_to_cm2(absorbed_only_pixels, pixel_width),
        standing_cm2: calibration.pixel_area_to_cm2(standing_pixels, pixel_width),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(size: u32, x0: u32, y0: u32, side: u32) -> RegionMask {
        RegionMask::from_fn(size, size, |x, y| {
            (x0..x0 + side).contains(&x) && (y0..y0 + side).contains(&y)
        })
    }

    #[test]
    fn standing_footprint_is_taken_off_absorbed() {
        // 100 px across 10 cm: 10 px/cm, 100 px² per cm².
        let calibration = Calibration::new(10.0).unwrap();
        let masks = MaskPair {
            absorbed: block(100, 10, 10, 41), // 40x40 = 1600 px²
            standing: block(100, 20, 20, 21), // 20x20 = 400 px²
        };
        let estimate = estimate(&masks, &calibration);
        assert_eq!(estimate.absorbed_pixels, 1600.0);
        assert_eq!(estimate.standing_pixels, 400.0);
        assert!((estimate.absorbed_cm2 - 12.0).abs() < 1e-9);
        assert!((estimate.standing_cm2 - 4.0).abs() < 1e-9);
    }

    #[test]
    fn absorbed_area_never_goes_negative() {
        let calibration = Calibration::new(10.0).unwrap();
        let masks = MaskPair {
            absorbed: block(100, 10, 10, 11),
            standing: block(100, 10, 10, 51),
        };
        let estimate = estimate(&masks, &calibration);
        assert_eq!(estimate.absorbed_cm2, 0.0);
        assert!(estimate.standing_cm2 > 0.0);
    }

    #[test]
    fn empty_masks_have_zero_area() {
        let calibration = Calibration::new(10.0).unwrap();
        let masks = MaskPair {
            absorbed: RegionMask::empty(64, 48),
            standing: RegionMask::empty(64, 48),
        };
        assert_eq!(estimate(&masks, &calibration), AreaEstimate::default());
        assert_eq!(area(&masks.absorbed, &calibration), 0.0);
    }

    #[test]
    fn single_mask_area_uses_mask_width() {
        let calibration = Calibration::new(5.0).unwrap();
        // 50 px across 5 cm: 10 px/cm.
        let mask = block(50, 1, 1, 11);
        assert!((area(&mask, &calibration) - 1.0).abs() < 1e-9);
    }
}
