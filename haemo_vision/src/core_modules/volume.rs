// THEORY:
// The volume converter is a pure linear map from physical area to millilitres, with
// one coefficient per region type:
// - absorbed: an empirical mL per cm² standing in for the average soak depth;
// - standing: the assumed depth of pooled liquid in cm (1 cm³ = 1 mL).
// Both coefficients are fixed per deployment rather than fitted per surface, which
// is a known source of estimation error on materials that soak differently.

use crate::core_modules::region_mask::RegionType;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ABSORBED_ML_PER_CM2: f64 = 0.075;
pub const DEFAULT_STANDING_DEPTH_CM: f64 = 0.1;

/// The two area-to-volume coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeConverter {
    absorbed_ml_per_cm2: f64,
    standing_depth_cm: f64,
}

impl Default for VolumeConverter {
    fn default() -> Self {
        Self {
            absorbed_ml_per_cm2: DEFAULT_ABSORBED_ML_PER_CM2,
            standing_depth_cm: DEFAULT_STANDING_DEPTH_CM,
        }
    }
}

impl VolumeConverter {
    pub fn new(absorbed_ml_per_cm2: f64, standing_depth_cm: f64) -> Result<Self, ConfigError> {
        for (name, value) in [
            ("absorbed_ml_per_cm2", absorbed_ml_per_cm2),
            ("standing_depth_cm", standing_depth_cm),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidCoefficient { name, value });
            }
        }
        Ok(Self {
            absorbed_ml_per_cm2,
            standing_depth_cm,
        })
    }

    /// Volume in mL for `area_cm2` of the given region type.
    pub fn volume(&self, area_cm2: f64, region: RegionType) -> f64 {
        match region {
            RegionType::Absorbed => area_cm2 * self.absorbed_ml_per_cm2,
            RegionType::Standing => area_cm2 * self.standing_depth_cm,
        }
    }
}

/// Rounds half away from zero to two decimal places.
pub fn round_to_hundredths(value: f64) -> f64 {
    // Adding +0.0 turns a negative zero into a positive one.
    (value * 100.0).round() / 100.0 + 0.0
}

/// A volume triple for one image or one day.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VolumeBreakdown {
    pub absorbed_ml: f64,
    pub standing_ml: f64,
    pub total_ml: f64,
}

impl VolumeBreakdown {
    /// Rounds each component and derives the total from the rounded parts, so
    /// `total_ml == absorbed_ml + standing_ml` holds to the hundredth.
    pub fn rounded(absorbed_ml: f64, standing_ml: f64) -> Self {
        let absorbed_ml = round_to_hundredths(absorbed_ml);
        let standing_ml = round_to_hundredths(standing_ml);
        Self {
            absorbed_ml,
            standing_ml,
            total_ml: round_to_hundredths(absorbed_ml + standing_ml),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_region_uses_its_own_coefficient() {
        let converter = VolumeConverter::default();
        assert!((converter.volume(10.0, RegionType::Absorbed) - 0.75).abs() < 1e-12);
        assert!((converter.volume(10.0, RegionType::Standing) - 1.0).abs() < 1e-12);
        assert_eq!(converter.volume(0.0, RegionType::Standing), 0.0);
    }

    #[test]
    fn negative_or_nan_coefficients_are_rejected() {
        assert!(VolumeConverter::new(-0.1, 0.1).is_err());
        assert!(matches!(
            VolumeConverter::new(0.075, f64::NAN),
            Err(ConfigError::InvalidCoefficient { name: "standing_depth_cm", .. })
        ));
        assert!(VolumeConverter::new(0.0, 0.0).is_ok());
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_to_hundredths(1.234), 1.23);
        assert_eq!(round_to_hundredths(1.236), 1.24);
        assert_eq!(round_to_hundredths(0.125), 0.13);
        assert_eq!(round_to_hundredths(0.0), 0.0);
    }

    #[test]
    fn rounding_never_yields_negative_zero() {
        assert!(round_to_hundredths(-0.0).is_sign_positive());
        assert!(round_to_hundredths(-0.001).is_sign_positive());
    }

    #[test]
    fn total_is_the_sum_of_rounded_parts() {
        let breakdown = VolumeBreakdown::rounded(0.004, 0.004);
        assert_eq!(breakdown.absorbed_ml, 0.0);
        assert_eq!(breakdown.standing_ml, 0.0);
        assert_eq!(breakdown.total_ml, 0.0);

        let breakdown = VolumeBreakdown::rounded(1.116, 2.226);
        assert_eq!(breakdown.absorbed_ml, 1.12);
        assert_eq!(breakdown.standing_ml, 2.23);
        assert!((breakdown.total_ml - (breakdown.absorbed_ml + breakdown.standing_ml)).abs() < 1e-9);
    }
}
