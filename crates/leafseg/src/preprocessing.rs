use image::{DynamicImage, imageops::FilterType};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AnalysisError, ConfigError},
    types::{INPUT_CHANNELS, INPUT_SIZE, InputTensor, PixelImage},
};

/// Resampling kernel used when scaling the source photo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    Nearest,
    /// Bilinear
    #[default]
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Preprocessing shared by both segmenters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Square inference resolution in pixels
    pub input_size: u32,
    /// Per-channel value subtracted before scaling
    pub pixel_mean: [f32; 3],
    /// Per-channel divisor applied after the mean is removed
    pub pixel_std: [f32; 3],
    pub filter: ResizeFilter,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        // Raw 0..255 channel values, which is what the segmenters were exported with
        Self {
            input_size: INPUT_SIZE,
            pixel_mean: [0.0; 3],
            pixel_std: [1.0; 3],
            filter: ResizeFilter::default(),
        }
    }
}

impl PreprocessConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_size == 0 {
            return Err(ConfigError::Invalid("preprocess.input_size must be positive".to_string()));
        }
        if self.pixel_std.iter().any(|std| !std.is_finite() || *std <= 0.0) {
            return Err(ConfigError::Invalid(
                "preprocess.pixel_std values must be finite and positive".to_string(),
            ));
        }
        if self.pixel_mean.iter().any(|mean| !mean.is_finite()) {
            return Err(ConfigError::Invalid("preprocess.pixel_mean values must be finite".to_string()));
        }
        Ok(())
    }
}

/// Resizes decoded photos and turns them into model input tensors
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Scale `image` to the configured square resolution as RGBA
    pub fn resize(&self, image: &DynamicImage) -> Result<PixelImage, AnalysisError> {
        let size = self.config.input_size;
        resize(image, size, size, self.config.filter)
    }

    /// NHWC float tensor, `(channel - mean) / std` per channel
    pub fn to_tensor(&self, image: &PixelImage) -> InputTensor {
        to_tensor(image, &self.config.pixel_mean, &self.config.pixel_std)
    }
}

/// Scale an arbitrary image to exactly `width` x `height`
pub fn resize(
    image: &DynamicImage,
    width: u32,
    height: u32,
    filter: ResizeFilter,
) -> Result<PixelImage, AnalysisError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(AnalysisError::InvalidImage(format!(
            "zero-area image ({}x{})",
            image.width(),
            image.height()
        )));
    }
    if width == 0 || height == 0 {
        return Err(AnalysisError::InvalidImage(format!(
            "zero-area target size ({width}x{height})"
        )));
    }

    Ok(image.resize_exact(width, height, filter.into()).into_rgba8())
}

/// Convert an RGBA image into a `[1, H, W, 3]` tensor; alpha is dropped.
pub fn to_tensor(image: &PixelImage, pixel_mean: &[f32; 3], pixel_std: &[f32; 3]) -> InputTensor {
    let (width, height) = image.dimensions();
    let mut data = Vec::with_capacity(width as usize * height as usize * INPUT_CHANNELS);

    for pixel in image.pixels() {
        for channel in 0..INPUT_CHANNELS {
            data.push((f32::from(pixel[channel]) - pixel_mean[channel]) / pixel_std[channel]);
        }
    }

    InputTensor::new(height, width, data)
}
