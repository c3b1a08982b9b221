// THEORY:
// The inspector is a debugging aid that sits on top of a finished per-image summary.
// It picks the photographs at both ends of the volume range, re-runs segmentation on
// them and lays the result out side by side so a human can judge whether the masks
// match the stain. It never changes an estimate; it only shows how one was reached.
//
// A panel is a horizontal strip of four equally sized tiles:
//
//   original | absorbed mask | standing mask | contour overlay
//
// The overlay traces the external boundaries the area estimator measures, absorbed
// in green and standing in red, each drawn 2 px wide.

use haemo_vision::core_modules::region_detector::region_detector::find_external_regions;
use haemo_vision::core_modules::region_mask::{MaskPair, RegionMask, RegionType};
use haemo_vision::VolumeRecord;
use image::{imageops, DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};

pub const DEFAULT_EXTREME_COUNT: usize = 5;
pub const PANEL_TILES: u32 = 4;
pub const CONTOUR_THICKNESS: u32 = 2;

const ABSORBED_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const STANDING_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// The images chosen for inspection, largest and smallest `total_ml` first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extremes {
    pub top: Vec<String>,
    pub bottom: Vec<String>,
}

impl Extremes {
    /// Output file names paired with the source image path under `image_dir`.
    pub fn targets(&self, image_dir: &Path) -> Vec<(String, PathBuf)> {
        let top = self
            .top
            .iter()
            .enumerate()
            .map(|(i, name)| (format!("top_{i}.png"), image_dir.join(name)));
        let bottom = self
            .bottom
            .iter()
            .enumerate()
            .map(|(i, name)| (format!("bottom_{i}.png"), image_dir.join(name)));
        top.chain(bottom).collect()
    }
}

/// Picks up to `n` image names with the largest and the smallest total volume.
/// Ties keep summary order.
pub fn select_extremes(records: &[VolumeRecord], n: usize) -> Extremes {
    let mut ascending: Vec<&VolumeRecord> = records.iter().collect();
    ascending.sort_by(|a, b| a.total_ml.total_cmp(&b.total_ml));
    let mut descending: Vec<&VolumeRecord> = records.iter().collect();
    descending.sort_by(|a, b| b.total_ml.total_cmp(&a.total_ml));

    let names = |sorted: Vec<&VolumeRecord>| -> Vec<String> {
        sorted.into_iter().take(n).map(|r| r.image_name.clone()).collect()
    };
    Extremes {
        top: names(descending),
        bottom: names(ascending),
    }
}

/// Renders the four-tile strip for one image and its masks.
pub fn render_panel(image: &RgbImage, masks: &MaskPair) -> RgbImage {
    let (width, height) = image.dimensions();
    let mut panel = RgbImage::new(width * PANEL_TILES, height);

    let tiles = [
        image.clone(),
        mask_tile(&masks.absorbed),
        mask_tile(&masks.standing),
        contour_overlay(image, masks),
    ];
    for (i, tile) in tiles.iter().enumerate() {
        imageops::replace(&mut panel, tile, i as i64 * width as i64, 0);
    }
    panel
}

/// A mask as white-on-black RGB.
pub fn mask_tile(mask: &RegionMask) -> RgbImage {
    DynamicImage::ImageLuma8(mask.to_gray_image()).to_rgb8()
}

/// `image` with the external boundaries of both regions drawn on top.
pub fn contour_overlay(image: &RgbImage, masks: &MaskPair) -> RgbImage {
    let mut overlay = image.clone();
    for (region, color) in [
        (RegionType::Absorbed, ABSORBED_COLOR),
        (RegionType::Standing, STANDING_COLOR),
    ] {
        for external in find_external_regions(masks.get(region)) {
            for &(x, y) in &external.boundary {
                // Out-of-bounds parts of the square are clipped by imageproc.
                let dot = Rect::at(x, y).of_size(CONTOUR_THICKNESS, CONTOUR_THICKNESS);
                draw_filled_rect_mut(&mut overlay, dot, color);
            }
        }
    }
    overlay
}
