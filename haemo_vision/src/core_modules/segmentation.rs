// THEORY:
// The segmentation layer turns one photograph into two candidate masks: "absorbed"
// (everything that looks stained) and "standing" (the most strongly stained subset,
// taken to be pooled liquid). It is the only place in the engine that reads pixels.
//
// Key architectural principles:
// 1.  **One capability, several strategies**: every strategy implements the
//     `Segmenter` trait (`segment(image) -> MaskPair`). The pipeline holds a
//     `SegmentationStrategy` chosen by configuration and never branches on it.
// 2.  **Percentile strategy**: works on the a* (green-red) channel of L*a*b*, smooths
//     it with a small binomial (Gaussian) kernel, 5x5 by default, and cuts at two percentiles of the image's own value
//     distribution. It adapts to exposure and to how much of the frame is stained.
// 3.  **Fixed-threshold strategy**: works on Rec. 601 grayscale and treats anything
//     at or below two fixed gray levels as liquid (inverse binary threshold).
// 4.  **Stateless**: strategies hold only their thresholds; two images never share
//     intermediate state, so segmenting distinct images concurrently is safe.

use crate::core_modules::pixel::pixel::Pixel;
use crate::core_modules::region_mask::{MaskPair, RegionMask};
use crate::error::ConfigError;
use image::{GrayImage, Luma, RgbImage};
use imageproc::filter::separable_filter_equal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const HISTOGRAM_BINS: usize = 256;
const MAX_BLUR_RADIUS: u32 = 15;

/// Tuning knobs for both strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationThresholds {
    /// Percentile of the blurred a* distribution above which a pixel is absorbed.
    pub absorbed_percentile: f64,
    /// Percentile of the blurred a* distribution above which a pixel is standing.
    pub standing_percentile: f64,
    /// Radius of the binomial kernel applied to the a* channel; the kernel is
    /// `2 * radius + 1` taps wide in each direction. Zero disables the blur.
    pub blur_radius: u32,
    /// Gray level at or below which a pixel is absorbed.
    pub absorbed_intensity: u8,
    /// Gray level at or below which a pixel is standing.
    pub standing_intensity: u8,
}

impl Default for SegmentationThresholds {
    fn default() -> Self {
        Self {
            absorbed_percentile: 75.0,
            standing_percentile: 95.0,
            // 5x5: taps 1 4 6 4 1.
            blur_radius: 2,
            absorbed_intensity: 150,
            standing_intensity: 80,
        }
    }
}

impl SegmentationThresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("absorbed_percentile", self.absorbed_percentile),
            ("standing_percentile", self.standing_percentile),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::InvalidPercentile { name, value });
            }
        }
        if self.blur_radius > MAX_BLUR_RADIUS {
            return Err(ConfigError::InvalidBlurRadius(self.blur_radius));
        }
        Ok(())
    }
}

/// Anything that can split an image into absorbed and standing candidates.
pub trait Segmenter {
    fn segment(&self, image: &RgbImage) -> MaskPair;
}

/// Adaptive segmentation on the blurred a* channel.
#[derive(Debug, Clone)]
pub struct PercentileSegmenter {
    absorbed_percentile: f64,
    standing_percentile: f64,
    blur_radius: u32,
}

impl PercentileSegmenter {
    pub fn new(thresholds: &SegmentationThresholds) -> Self {
        Self {
            absorbed_percentile: thresholds.absorbed_percentile,
            standing_percentile: thresholds.standing_percentile,
            blur_radius: thresholds.blur_radius,
        }
    }

    /// The blurred, 8-bit encoded a* channel the thresholds are computed on.
    pub fn stain_channel(&self, image: &RgbImage) -> GrayImage {
        let a_channel = GrayImage::from_fn(image.width(), image.height(), |x, y| {
            Luma([Pixel::from(*image.get_pixel(x, y)).lab_a_encoded()])
        });
        smooth(&a_channel, self.blur_radius)
    }
}

impl Segmenter for PercentileSegmenter {
    fn segment(&self, image: &RgbImage) -> MaskPair {
        let channel = self.stain_channel(image);
        let histogram = histogram(&channel);
        let absorbed_threshold = percentile(&histogram, self.absorbed_percentile);
        let standing_threshold = percentile(&histogram, self.standing_percentile);

        let above = |threshold: Option<f64>| {
            RegionMask::from_fn(channel.width(), channel.height(), |x, y| match threshold {
                Some(t) => channel.get_pixel(x, y).0[0] as f64 > t,
                None => false,
            })
        };

        MaskPair {
            absorbed: above(absorbed_threshold),
            standing: above(standing_threshold),
        }
    }
}

/// Inverse binary thresholding of grayscale at two fixed levels.
#[derive(Debug, Clone)]
pub struct FixedThresholdSegmenter {
    absorbed_intensity: u8,
    standing_intensity: u8,
}

impl FixedThresholdSegmenter {
    pub fn new(thresholds: &SegmentationThresholds) -> Self {
        Self {
            absorbed_intensity: thresholds.absorbed_intensity,
            standing_intensity: thresholds.standing_intensity,
        }
    }
}

impl Segmenter for FixedThresholdSegmenter {
    fn segment(&self, image: &RgbImage) -> MaskPair {
        let gray = GrayImage::from_fn(image.width(), image.height(), |x, y| {
            Luma([Pixel::from(*image.get_pixel(x, y)).gray_level()])
        });
        let at_or_below = |cutoff: u8| {
            RegionMask::from_fn(gray.width(), gray.height(), |x, y| {
                gray.get_pixel(x, y).0[0] <= cutoff
            })
        };

        MaskPair {
            absorbed: at_or_below(self.absorbed_intensity),
            standing: at_or_below(self.standing_intensity),
        }
    }
}

/// Which segmenter the pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationStrategy {
    Percentile,
    #[default]
    FixedThreshold,
}

impl SegmentationStrategy {
    pub fn segmenter(&self, thresholds: &SegmentationThresholds) -> Box<dyn Segmenter + Send + Sync> {
        match self {
            SegmentationStrategy::Percentile => Box::new(PercentileSegmenter::new(thresholds)),
            SegmentationStrategy::FixedThreshold => Box::new(FixedThresholdSegmenter::new(thresholds)),
        }
    }
}

impl fmt::Display for SegmentationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentationStrategy::Percentile => write!(f, "percentile"),
            SegmentationStrategy::FixedThreshold => write!(f, "fixed_threshold"),
        }
    }
}

impl FromStr for SegmentationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "percentile" => Ok(SegmentationStrategy::Percentile),
            "fixed_threshold" | "fixed" => Ok(SegmentationStrategy::FixedThreshold),
            other => Err(format!(
                "unknown segmentation strategy `{other}` (expected `percentile` or `fixed_threshold`)"
            )),
        }
    }
}

/// Normalised binomial weights `C(2r, k) / 4^r`: the discrete Gaussian of
/// `2r + 1` taps. Every weight is a dyadic fraction, so integer inputs blur exactly.
pub fn binomial_kernel(radius: u32) -> Vec<f32> {
    let taps = 2 * radius as usize + 1;
    let mut row = vec![1.0f64];
    for _ in 1..taps {
        let mut next = vec![1.0f64; row.len() + 1];
        for i in 1..row.len() {
            next[i] = row[i - 1] + row[i];
        }
        row = next;
    }
    let total: f64 = row.iter().sum();
    row.into_iter().map(|weight| (weight / total) as f32).collect()
}

/// Separable binomial blur. Edges are clamped; results are converted back to 8 bits.
pub fn smooth(channel: &GrayImage, radius: u32) -> GrayImage {
    if radius == 0 || channel.width() == 0 || channel.height() == 0 {
        return channel.clone();
    }
    separable_filter_equal(channel, &binomial_kernel(radius))
}

fn histogram(channel: &GrayImage) -> [u64; HISTOGRAM_BINS] {
    let mut bins = [0u64; HISTOGRAM_BINS];
    for pixel in channel.pixels() {
        bins[pixel.0[0] as usize] += 1;
    }
    bins
}

/// The `q`-th percentile (0..=100) of the values counted in `histogram`, using
/// linear interpolation between the two closest ranks. `None` for an empty histogram.
pub fn percentile(histogram: &[u64; HISTOGRAM_BINS], q: f64) -> Option<f64> {
    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return None;
    }
    let rank = (q.clamp(0.0, 100.0) / 100.0) * (total - 1) as f64;
    let lower_rank = rank.floor() as u64;
    let upper_rank = rank.ceil() as u64;
    let lower = value_at_rank(histogram, lower_rank);
    let upper = value_at_rank(histogram, upper_rank);
    Some(lower + (upper - lower) * (rank - lower_rank as f64))
}

fn value_at_rank(histogram: &[u64; HISTOGRAM_BINS], rank: u64) -> f64 {
    let mut seen = 0u64;
    for (value, &count) in histogram.iter().enumerate() {
        seen += count;
        if seen > rank {
            return value as f64;
        }
    }
    (HISTOGRAM_BINS - 1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn histogram_of(values: &[u8]) -> [u64; HISTOGRAM_BINS] {
        let mut bins = [0u64; HISTOGRAM_BINS];
        for &v in values {
            bins[v as usize] += 1;
        }
        bins
    }

    #[test]
    fn percentile_interpolates_between_ranks() {
        let bins = histogram_of(&[1, 2, 3, 4]);
        assert_eq!(percentile(&bins, 0.0), Some(1.0));
        assert_eq!(percentile(&bins, 100.0), Some(4.0));
        assert_eq!(percentile(&bins, 50.0), Some(2.5));
        assert_eq!(percentile(&bins, 75.0), Some(3.25));
    }

    #[test]
    fn percentile_of_empty_histogram_is_none() {
        assert_eq!(percentile(&[0u64; HISTOGRAM_BINS], 50.0), None);
    }

    #[test]
    fn fixed_threshold_is_inclusive_and_inverted() {
        // Columns: white, gray 150, gray 100, gray 80, black.
        let levels = [255u8, 150, 100, 80, 0];
        let image = RgbImage::from_fn(5, 1, |x, _| {
            let v = levels[x as usize];
            Rgb([v, v, v])
        });
        let masks = FixedThresholdSegmenter::new(&SegmentationThresholds::default()).segment(&image);
        let absorbed: Vec<bool> = (0..5).map(|x| masks.absorbed.get(x, 0)).collect();
        let standing: Vec<bool> = (0..5).map(|x| masks.standing.get(x, 0)).collect();
        assert_eq!(absorbed, vec![false, true, true, true, true]);
        assert_eq!(standing, vec![false, false, false, true, true]);
    }

    #[test]
    fn percentile_strategy_picks_out_the_red_stain() {
        // A 20x20 white card with a 6x6 red square; 36/400 = 9% of the frame.
        let image = RgbImage::from_fn(20, 20, |x, y| {
            if (7..13).contains(&x) && (7..13).contains(&y) {
                Rgb([170, 10, 10])
            } else {
                Rgb([235, 235, 235])
            }
        });
        let thresholds = SegmentationThresholds {
            blur_radius: 0,
            ..SegmentationThresholds::default()
        };
        let masks = PercentileSegmenter::new(&thresholds).segment(&image);
        // The 75th percentile falls on the white background, so everything red is
        // strictly above it; the 95th percentile falls on the red value itself, so
        // nothing is strictly above it.
        assert_eq!(masks.absorbed.foreground_count(), 36);
        assert!(masks.absorbed.get(10, 10));
        assert!(!masks.absorbed.get(0, 0));
        assert_eq!(masks.standing.foreground_count(), 0);
    }

    #[test]
    fn uniform_image_has_no_percentile_foreground() {
        let image = RgbImage::from_pixel(8, 8, Rgb([120, 40, 40]));
        let masks = PercentileSegmenter::new(&SegmentationThresholds::default()).segment(&image);
        assert!(masks.absorbed.is_empty());
        assert!(masks.standing.is_empty());
    }

    #[test]
    fn default_kernel_is_five_binomial_taps() {
        let expected: Vec<f32> = [1.0, 4.0, 6.0, 4.0, 1.0].iter().map(|w| w / 16.0).collect();
        assert_eq!(binomial_kernel(2), expected);
        assert_eq!(binomial_kernel(0), vec![1.0]);
        assert!((binomial_kernel(5).iter().sum::<f32>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn blur_support_stays_within_five_by_five() {
        let mut impulse = GrayImage::new(11, 11);
        impulse.put_pixel(5, 5, Luma([128]));
        let blurred = smooth(&impulse, SegmentationThresholds::default().blur_radius);
        // 128 * 36/256
        assert_eq!(blurred.get_pixel(5, 5).0[0], 18);
        // 128 * 24/256
        assert_eq!(blurred.get_pixel(6, 5).0[0], 12);
        // 128 * 16/256
        assert_eq!(blurred.get_pixel(6, 6).0[0], 8);
        // Three pixels out is past the kernel.
        assert_eq!(blurred.get_pixel(8, 5).0[0], 0);
        assert_eq!(blurred.get_pixel(5, 2).0[0], 0);
    }

    #[test]
    fn uniform_channel_is_unchanged_by_blur() {
        let flat = GrayImage::from_pixel(9, 7, Luma([131]));
        assert_eq!(smooth(&flat, 2), flat);
        assert_eq!(smooth(&flat, 0), flat);
    }

    #[test]
    fn oversized_blur_radius_fails_validation() {
        let thresholds = SegmentationThresholds {
            blur_radius: 40,
            ..SegmentationThresholds::default()
        };
        assert_eq!(thresholds.validate(), Err(ConfigError::InvalidBlurRadius(40)));
    }

    #[test]
    fn strategy_parses_from_cli_spellings() {
        assert_eq!("percentile".parse::<SegmentationStrategy>(), Ok(SegmentationStrategy::Percentile));
        assert_eq!("fixed-threshold".parse::<SegmentationStrategy>(), Ok(SegmentationStrategy::FixedThreshold));
        assert_eq!("FIXED".parse::<SegmentationStrategy>(), Ok(SegmentationStrategy::FixedThreshold));
        assert!("otsu".parse::<SegmentationStrategy>().is_err());
    }

    #[test]
    fn out_of_range_percentiles_fail_validation() {
        let thresholds = SegmentationThresholds {
            standing_percentile: 101.0,
            ..SegmentationThresholds::default()
        };
        assert!(matches!(
            thresholds.validate(),
            Err(ConfigError::InvalidPercentile { name: "standing_percentile", .. })
        ));
    }
}
