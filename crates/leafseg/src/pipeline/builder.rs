use crate::{
    config::AnalyzerConfig,
    error::ConfigError,
    fusion::{
        BrightenDarkenHighlighter, DEFAULT_THRESHOLD, FusionConfig, FusionEngine, RedChannelHighlighter,
        validate_thresholds,
    },
    pipeline::Pipeline,
    preprocessing::{PreprocessConfig, Preprocessor, ResizeFilter},
    traits::HighlightPolicy,
};

/// Builder for analysis pipelines with a fluent API
pub struct PipelineBuilder {
    preprocess: PreprocessConfig,
    leaf_threshold: f32,
    disease_threshold: f32,
    highlighter: Option<Box<dyn HighlightPolicy>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            preprocess: PreprocessConfig::default(),
            leaf_threshold: DEFAULT_THRESHOLD,
            disease_threshold: DEFAULT_THRESHOLD,
            highlighter: None,
        }
    }

    /// Start from a loaded configuration
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self::new()
            .with_preprocess(config.preprocess.clone())
            .with_fusion(&config.fusion)
    }

    pub fn with_preprocess(mut self, preprocess: PreprocessConfig) -> Self {
        self.preprocess = preprocess;
        self
    }

    pub fn with_input_size(mut self, size: u32) -> Self {
        self.preprocess.input_size = size;
        self
    }

    pub fn with_normalization(mut self, pixel_mean: [f32; 3], pixel_std: [f32; 3]) -> Self {
        self.preprocess.pixel_mean = pixel_mean;
        self.preprocess.pixel_std = pixel_std;
        self
    }

    pub fn with_resize_filter(mut self, filter: ResizeFilter) -> Self {
        self.preprocess.filter = filter;
        self
    }

    pub fn with_thresholds(mut self, leaf: f32, disease: f32) -> Self {
        self.leaf_threshold = leaf;
        self.disease_threshold = disease;
        self
    }

    /// Thresholds plus the canonical brighten/darken highlighter
    pub fn with_fusion(self, fusion: &FusionConfig) -> Self {
        self.with_thresholds(fusion.leaf_threshold, fusion.disease_threshold)
            .with_highlighter(BrightenDarkenHighlighter::new(fusion.brighten_gain, fusion.darken_factor))
    }

    /// Set the highlight policy (replaces any existing one)
    pub fn with_highlighter<H>(mut self, highlighter: H) -> Self
    where
        H: HighlightPolicy + 'static,
    {
        self.highlighter = Some(Box::new(highlighter));
        self
    }

    /// Use the red-channel-only highlighter instead of brighten/darken
    pub fn with_red_channel_highlighting(self, gain: f32) -> Self {
        self.with_highlighter(RedChannelHighlighter { gain })
    }

    /// Like [`PipelineBuilder::build`], but first applies the same checks as
    /// [`AnalyzerConfig::validate`] to the preprocessing values and thresholds
    pub fn try_build(self) -> Result<Pipeline, ConfigError> {
        self.preprocess.validate()?;
        validate_thresholds(self.leaf_threshold, self.disease_threshold)?;
        Ok(self.build())
    }

    /// Build the pipeline with the brighten/darken highlighter if none was set.
    ///
    /// Values are not checked; a zero `pixel_std` yields a non-finite tensor.
    /// Use [`PipelineBuilder::try_build`] for values that did not come from a
    /// validated [`AnalyzerConfig`].
    pub fn build(self) -> Pipeline {
        let highlighter = self
            .highlighter
            .unwrap_or_else(|| Box::new(BrightenDarkenHighlighter::default()));

        Pipeline::new(
            Preprocessor::new(self.preprocess),
            FusionEngine::new(self.leaf_threshold, self.disease_threshold, highlighter),
        )
    }

    /// Build a pipeline straight from configuration
    pub fn build_from_config(config: &AnalyzerConfig) -> Pipeline {
        Self::from_config(config).build()
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_build() {
        let pipeline = PipelineBuilder::new().build();
        assert_eq!(pipeline.preprocessor().config().input_size, 256);
        assert_eq!(pipeline.fusion.highlighter_name(), "brighten_darken");
    }

    #[test]
    fn test_red_channel_selection() {
        let pipeline = Pipeline::builder().with_red_channel_highlighting(1.5).build();
        assert_eq!(pipeline.fusion.highlighter_name(), "red_channel");
    }

    #[test]
    fn test_try_build_rejects_bad_values() {
        let err = PipelineBuilder::new()
            .with_normalization([0.0; 3], [1.0, 0.0, 1.0])
            .try_build()
            .err()
            .expect("Zero std should be rejected");
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = PipelineBuilder::new().with_input_size(0).try_build().err().expect("Zero size should be rejected");
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = PipelineBuilder::new()
            .with_thresholds(0.5, 1.5)
            .try_build()
            .err()
            .expect("Threshold above 1 should be rejected");
        assert!(matches!(err, ConfigError::Invalid(_)));

        let pipeline = PipelineBuilder::new()
            .with_normalization([10.0; 3], [2.0; 3])
            .try_build()
            .expect("Should build");
        assert_eq!(pipeline.preprocessor().config().pixel_std, [2.0; 3]);
    }

    #[test]
    fn test_from_config() {
        let mut config = AnalyzerConfig::default();
        config.preprocess.input_size = 128;
        config.preprocess.filter = ResizeFilter::Nearest;

        let pipeline = PipelineBuilder::build_from_config(&config);
        assert_eq!(pipeline.preprocessor().config().input_size, 128);
        assert_eq!(pipeline.preprocessor().config().filter, ResizeFilter::Nearest);
    }
}
