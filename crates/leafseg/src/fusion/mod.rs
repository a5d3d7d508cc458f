//! Pixel-wise fusion of the leaf and disease probability grids.
//!
//! Both passes walk the grid once, read from the resized source and write
//! into a freshly allocated output buffer by index. A probability counts as
//! positive only when it is strictly above its threshold, so `0.5` (and NaN)
//! is always negative.

pub mod disease;
pub mod leaf;

pub use disease::*;
pub use leaf::*;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigError, LeafSegError, Result},
    traits::HighlightPolicy,
    types::{PixelImage, ProbabilityGrid},
};

pub const DEFAULT_THRESHOLD: f32 = 0.5;
pub const DEFAULT_BRIGHTEN_GAIN: f32 = 1.1;
pub const DEFAULT_DARKEN_FACTOR: f32 = 0.5;

/// Thresholds and gains for mask fusion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct FusionConfig {
    #[schemars(range(min = 0.0, max = 1.0))]
    pub leaf_threshold: f32,
    #[schemars(range(min = 0.0, max = 1.0))]
    pub disease_threshold: f32,
    /// Multiplier applied to diseased pixels
    pub brighten_gain: f32,
    /// Multiplier applied to every other pixel
    pub darken_factor: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            leaf_threshold: DEFAULT_THRESHOLD,
            disease_threshold: DEFAULT_THRESHOLD,
            brighten_gain: DEFAULT_BRIGHTEN_GAIN,
            darken_factor: DEFAULT_DARKEN_FACTOR,
        }
    }
}

impl FusionConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        validate_thresholds(self.leaf_threshold, self.disease_threshold)?;
        for (name, factor) in [
            ("fusion.brighten_gain", self.brighten_gain),
            ("fusion.darken_factor", self.darken_factor),
        ] {
            if !factor.is_finite() || factor <= 0.0 {
                return Err(ConfigError::Invalid(format!("{name} must be finite and positive, got {factor}")));
            }
        }
        Ok(())
    }
}

/// Both thresholds must lie in `[0, 1]`
pub fn validate_thresholds(leaf: f32, disease: f32) -> std::result::Result<(), ConfigError> {
    for (name, threshold) in [("fusion.leaf_threshold", leaf), ("fusion.disease_threshold", disease)] {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Invalid(format!("{name} must be within [0, 1], got {threshold}")));
        }
    }
    Ok(())
}

/// Strict comparison; the threshold value itself is negative.
#[inline]
pub fn is_positive(probability: f32, threshold: f32) -> bool {
    probability > threshold
}

/// Multiply a channel and clamp into `0..=255`
#[inline]
pub fn scale_channel(value: u8, factor: f32) -> u8 {
    // `as u8` truncates and maps NaN to 0
    (f32::from(value) * factor).clamp(0.0, 255.0) as u8
}

/// Runs both fusion policies with a fixed pair of thresholds
pub struct FusionEngine {
    leaf_threshold: f32,
    disease_threshold: f32,
    highlighter: Box<dyn HighlightPolicy>,
}

impl FusionEngine {
    pub fn new(leaf_threshold: f32, disease_threshold: f32, highlighter: Box<dyn HighlightPolicy>) -> Self {
        Self {
            leaf_threshold,
            disease_threshold,
            highlighter,
        }
    }

    /// Engine using the canonical brighten/darken highlighter
    pub fn from_config(config: &FusionConfig) -> Self {
        Self::new(
            config.leaf_threshold,
            config.disease_threshold,
            Box::new(BrightenDarkenHighlighter::new(config.brighten_gain, config.darken_factor)),
        )
    }

    pub fn isolate_leaf(&self, resized: &PixelImage, leaf: &ProbabilityGrid) -> Result<LeafIsolation> {
        isolate_leaf(resized, leaf, self.leaf_threshold)
    }

    pub fn highlight_disease(
        &self,
        resized: &PixelImage,
        leaf: &ProbabilityGrid,
        disease: &ProbabilityGrid,
    ) -> Result<DiseaseHighlight> {
        highlight_disease(
            resized,
            leaf,
            disease,
            self.leaf_threshold,
            self.disease_threshold,
            self.highlighter.as_ref(),
        )
    }

    pub fn highlighter_name(&self) -> &'static str {
        self.highlighter.name()
    }
}

impl Default for FusionEngine {
    fn default() -> Self {
        Self::from_config(&FusionConfig::default())
    }
}

fn check_dimensions(image: &PixelImage, grid: &ProbabilityGrid, label: &str) -> Result<()> {
    if image.dimensions() != grid.dimensions() {
        let (iw, ih) = image.dimensions();
        let (gw, gh) = grid.dimensions();
        return Err(LeafSegError::InvalidGrid(format!(
            "{label} grid is {gw}x{gh} but the image is {iw}x{ih}"
        )));
    }
    Ok(())
}

fn into_image(width: u32, height: u32, buffer: Vec<u8>) -> Result<PixelImage> {
    PixelImage::from_raw(width, height, buffer)
        .ok_or_else(|| LeafSegError::InvalidGrid("output buffer does not match image size".to_string()))
}
