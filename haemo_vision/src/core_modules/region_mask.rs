// THEORY:
// A `RegionMask` is the binary verdict of a segmentation strategy for one region
// type over one image: a same-size grid where `true` marks a candidate pixel. It
// is a "dumb" container, produced fresh per image and never persisted. It knows
// how to count itself and how to render itself as an 8-bit image (0 / 255) for
// contour extraction and for the debug inspector; it knows nothing about
// centimetres or volumes.

use image::{GrayImage, Luma};

/// The two kinds of liquid footprint the engine distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionType {
    /// Liquid that has soaked into the surface.
    Absorbed,
    /// Pooled liquid sitting on top of the surface.
    Standing,
}

/// A boolean grid over an image, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionMask {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

impl RegionMask {
    /// An all-background mask.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![false; (width as usize) * (height as usize)],
        }
    }

    /// Builds a mask by evaluating `predicate` at every `(x, y)`.
    pub fn from_fn(width: u32, height: u32, mut predicate: impl FnMut(u32, u32) -> bool) -> Self {
        let mut cells = Vec::with_capacity((width as usize) * (height as usize));
        for y in 0..height {
            for x in 0..width {
                cells.push(predicate(x, y));
            }
        }
        Self { width, height, cells }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.cells[(y as usize) * (self.width as usize) + x as usize]
    }

    /// Number of foreground pixels.
    pub fn foreground_count(&self) -> usize {
        self.cells.iter().filter(|&&cell| cell).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.cells.iter().any(|&cell| cell)
    }

    /// Foreground as 255, background as 0.
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            if self.get(x, y) { Luma([255u8]) } else { Luma([0u8]) }
        })
    }
}

/// The pair of masks a segmentation strategy produces for one image.
/// `standing` is expected to lie mostly inside `absorbed`, but nothing enforces it;
/// the area estimator corrects for the overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskPair {
    pub absorbed: RegionMask,
    pub standing: RegionMask,
}

impl MaskPair {
    pub fn get(&self, region: RegionType) -> &RegionMask {
        match region {
            RegionType::Absorbed => &self.absorbed,
            RegionType::Standing => &self.standing,
        }
    }
}
