// THEORY:
// The calibration model is the bridge between pixel space and physical space. The
// photographs are framed so that the image's full horizontal extent covers a known
// physical width, so a single scale factor (`px_per_cm`) converts lengths, and its
// square converts areas. The factor is recomputed per image because resolutions
// vary across a collection. Nothing is measured here; the reference width is
// supplied by configuration and validated once, up front.

use crate::error::ConfigError;

/// Known physical width represented by an image's horizontal extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    known_width_cm: f64,
}

impl Calibration {
    /// Rejects zero, negative and non-finite widths.
    pub fn new(known_width_cm: f64) -> Result<Self, ConfigError> {
        if !known_width_cm.is_finite() || known_width_cm <= 0.0 {
            return Err(ConfigError::NonPositiveWidth(known_width_cm));
        }
        Ok(Self { known_width_cm })
    }

    pub fn known_width_cm(&self) -> f64 {
        self.known_width_cm
    }

    /// Pixels per centimetre for an image `pixel_width` pixels wide.
    pub fn px_per_cm(&self, pixel_width: u32) -> f64 {
        pixel_width as f64 / self.known_width_cm
    }

    /// Converts an area in square pixels to cm² for an image `pixel_width` pixels wide.
    pub fn pixel_area_to_cm2(&self, pixel_area: f64, pixel_width: u32) -> f64 {
        let px_per_cm = self.px_per_cm(pixel_width);
        if px_per_cm <= 0.0 {
            return 0.0;
        }
        pixel_area / (px_per_cm * px_per_cm)
    }
}
