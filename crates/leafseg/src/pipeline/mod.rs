pub mod builder;

use std::time::Instant;

use chrono::Utc;
use image::DynamicImage;
use serde::Serialize;
use strum::Display;
use tracing::{debug, info, warn};

use crate::{
    error::{AnalysisError, LeafSegError},
    fusion::FusionEngine,
    preprocessing::Preprocessor,
    report::AnalysisReport,
    runtime::ModelRuntime,
    severity::SeverityAssessment,
    types::{InferenceResult, ModelRole, SeverityRatio},
};

/// Orchestrator states, in the order a successful run visits them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    Preprocessing,
    InferringLeaf,
    FusingLeaf,
    InferringDisease,
    FusingDisease,
    Classifying,
    Done,
    Failed,
}

/// Tracks the current stage of one run
struct StageTracker {
    stage: PipelineStage,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            stage: PipelineStage::Idle,
        }
    }

    fn advance(&mut self, next: PipelineStage) {
        debug!("Pipeline stage {} -> {}", self.stage, next);
        self.stage = next;
    }

    fn fail(&mut self, error: &AnalysisError) {
        warn!("Pipeline failed during {}: {}", self.stage, error);
        self.stage = PipelineStage::Failed;
    }
}

/// Sequences preprocessing, both inferences, both fusions and classification
pub struct Pipeline {
    preprocessor: Preprocessor,
    fusion: FusionEngine,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    pub fn new(preprocessor: Preprocessor, fusion: FusionEngine) -> Self {
        Self { preprocessor, fusion }
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    /// Run inference and fusion, producing the fused images and ratio.
    ///
    /// Fails with `NotReady` up front unless both models are loaded. Partial
    /// state is dropped on any failure.
    pub fn run(&self, runtime: &ModelRuntime, image: &DynamicImage) -> Result<InferenceResult, AnalysisError> {
        let mut tracker = StageTracker::new();
        self.run_stages(runtime, image, &mut tracker).inspect_err(|e| tracker.fail(e))
    }

    /// Full run including severity classification
    pub fn analyze(&self, runtime: &ModelRuntime, image: &DynamicImage) -> Result<AnalysisReport, AnalysisError> {
        let mut tracker = StageTracker::new();
        let result = self
            .run_stages(runtime, image, &mut tracker)
            .inspect_err(|e| tracker.fail(e))?;

        tracker.advance(PipelineStage::Classifying);
        let assessment = SeverityAssessment::assess(result.ratio);
        info!(
            "{} (tier {}, {})",
            assessment.severity_label(),
            assessment.tier,
            assessment.category
        );

        tracker.advance(PipelineStage::Done);
        Ok(AnalysisReport {
            result,
            assessment,
            analyzed_at: Utc::now(),
        })
    }

    fn run_stages(
        &self,
        runtime: &ModelRuntime,
        image: &DynamicImage,
        tracker: &mut StageTracker,
    ) -> Result<InferenceResult, AnalysisError> {
        let readiness = runtime.readiness();
        if !readiness.is_ready() {
            return Err(AnalysisError::NotReady {
                missing: readiness.missing(),
            });
        }

        let started = Instant::now();

        tracker.advance(PipelineStage::Preprocessing);
        let resized = self.preprocessor.resize(image)?;
        let tensor = self.preprocessor.to_tensor(&resized);

        tracker.advance(PipelineStage::InferringLeaf);
        let leaf_grid = runtime.infer(ModelRole::LeafSegmenter, &tensor)?;

        tracker.advance(PipelineStage::FusingLeaf);
        let leaf = self
            .fusion
            .isolate_leaf(&resized, &leaf_grid)
            .map_err(|e| fusion_error(ModelRole::LeafSegmenter, e))?;

        tracker.advance(PipelineStage::InferringDisease);
        let disease_grid = runtime.infer(ModelRole::DiseaseSegmenter, &tensor)?;

        tracker.advance(PipelineStage::FusingDisease);
        let disease = self
            .fusion
            .highlight_disease(&resized, &leaf_grid, &disease_grid)
            .map_err(|e| fusion_error(ModelRole::DiseaseSegmenter, e))?;

        let elapsed = started.elapsed();

        info!("Active leaf mask pixels: {}", leaf.leaf_pixels);
        info!("Active disease mask pixels: {}", disease.diseased_pixels);
        info!("Inference took {} ms", elapsed.as_millis());

        let ratio = SeverityRatio::from_counts(disease.diseased_pixels, leaf.leaf_pixels)?;

        Ok(InferenceResult {
            resized,
            disease_highlighted: disease.image,
            leaf_isolated: leaf.image,
            leaf_pixel_count: leaf.leaf_pixels,
            diseased_pixel_count: disease.diseased_pixels,
            elapsed,
            ratio,
        })
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        builder::PipelineBuilder::new().build()
    }
}

fn fusion_error(role: ModelRole, error: LeafSegError) -> AnalysisError {
    AnalysisError::InferenceError {
        role,
        message: error.to_string(),
    }
}
