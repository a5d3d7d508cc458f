use std::time::Duration;

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::error::{AnalysisError, LeafSegError, Result};

/// Fixed inference resolution shared by both segmenters
pub const INPUT_SIZE: u32 = 256;

/// Colour channels fed to the models (RGB, alpha dropped)
pub const INPUT_CHANNELS: usize = 3;

/// RGBA buffer at inference resolution. The resized source, the leaf-isolated
/// and the disease-highlighted images are always separate buffers.
pub type PixelImage = RgbaImage;

/// Which of the two segmentation models a call targets
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash,
    Serialize, Deserialize,
    Display, EnumString, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ModelRole {
    /// Separates leaf pixels from background
    LeafSegmenter,
    /// Separates diseased tissue from healthy tissue
    DiseaseSegmenter,
}

/// Per-pixel model confidence, row-major, one value per pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityGrid {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl ProbabilityGrid {
    /// Wrap a row-major buffer, rejecting buffers whose length does not match the dimensions
    pub fn new(width: u32, height: u32, values: Vec<f32>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if values.len() != expected {
            return Err(LeafSegError::InvalidGrid(format!(
                "expected {expected} values for {width}x{height}, got {}",
                values.len()
            )));
        }
        Ok(Self { width, height, values })
    }

    /// A grid with every cell set to `value`
    pub fn filled(width: u32, height: u32, value: f32) -> Self {
        Self {
            width,
            height,
            values: vec![value; width as usize * height as usize],
        }
    }

    /// Build a grid by evaluating `f(x, y)` for every cell
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> f32) -> Self {
        let mut values = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                values.push(f(x, y));
            }
        }
        Self { width, height, values }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `(x, y)`, or `None` outside the grid
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.values.get(y as usize * self.width as usize + x as usize).copied()
    }
}

/// Model input: a single image in NHWC layout, `[1, height, width, 3]`.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    shape: [usize; 4],
    data: Vec<f32>,
}

impl InputTensor {
    pub(crate) fn new(height: u32, width: u32, data: Vec<f32>) -> Self {
        Self {
            shape: [1, height as usize, width as usize, INPUT_CHANNELS],
            data,
        }
    }

    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Spatial size as `(width, height)`
    pub fn spatial_dimensions(&self) -> (u32, u32) {
        (self.shape[2] as u32, self.shape[1] as u32)
    }
}

/// Diseased-pixel count over leaf-pixel count. Only constructible from a
/// non-zero leaf count, so it is always finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct SeverityRatio(f64);

impl SeverityRatio {
    pub fn from_counts(diseased_pixels: u32, leaf_pixels: u32) -> std::result::Result<Self, AnalysisError> {
        if leaf_pixels == 0 {
            return Err(AnalysisError::DegenerateRatio);
        }
        Ok(Self(f64::from(diseased_pixels) / f64::from(leaf_pixels)))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn percentage(&self) -> f64 {
        self.0 * 100.0
    }
}

/// Terminal value of a successful pipeline run
#[derive(Debug, Clone)]
pub struct InferenceResult {
    pub resized: PixelImage,
    pub disease_highlighted: PixelImage,
    pub leaf_isolated: PixelImage,
    pub leaf_pixel_count: u32,
    pub diseased_pixel_count: u32,
    /// Wall-clock time from the start of preprocessing to the end of fusion
    pub elapsed: Duration,
    pub ratio: SeverityRatio,
}

impl InferenceResult {
    pub fn elapsed_millis(&self) -> u128 {
        self.elapsed.as_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_rejects_wrong_length() {
        let err = ProbabilityGrid::new(4, 4, vec![0.0; 15]).unwrap_err();
        assert!(matches!(err, LeafSegError::InvalidGrid(_)));
    }

    #[test]
    fn test_grid_from_fn_is_row_major() {
        let grid = ProbabilityGrid::from_fn(3, 2, |x, y| (y * 3 + x) as f32);
        assert_eq!(grid.values(), &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(grid.get(2, 1), Some(5.0));
        assert_eq!(grid.get(3, 0), None);
    }

    #[test]
    fn test_ratio_requires_leaf_pixels() {
        assert_eq!(SeverityRatio::from_counts(10, 0), Err(AnalysisError::DegenerateRatio));
        assert_eq!(SeverityRatio::from_counts(0, 0), Err(AnalysisError::DegenerateRatio));

        let ratio = SeverityRatio::from_counts(25, 100).unwrap();
        assert_eq!(ratio.value(), 0.25);
        assert_eq!(ratio.percentage(), 25.0);
    }

    #[test]
    fn test_ratio_may_exceed_one() {
        let ratio = SeverityRatio::from_counts(150, 100).unwrap();
        assert!(ratio.value() > 1.0);
    }

    #[test]
    fn test_model_role_names() {
        assert_eq!(ModelRole::LeafSegmenter.to_string(), "leaf-segmenter");
        assert_eq!("disease-segmenter".parse::<ModelRole>().unwrap(), ModelRole::DiseaseSegmenter);
    }
}
