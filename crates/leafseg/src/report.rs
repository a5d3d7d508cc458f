use std::{fs, path::Path};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    error::Result,
    severity::{SeverityAssessment, SeverityTier, TreatmentCategory},
    types::InferenceResult,
};

pub const RESIZED_FILENAME: &str = "resized.png";
pub const DISEASE_HIGHLIGHT_FILENAME: &str = "disease_highlight.png";
pub const LEAF_ISOLATED_FILENAME: &str = "leaf_isolated.png";

/// A successful analysis: fused images, counts, timing and the severity verdict
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub result: InferenceResult,
    pub assessment: SeverityAssessment,
    pub analyzed_at: DateTime<Utc>,
}

/// Image-free view of a report, suitable for JSON output
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub leaf_pixels: u32,
    pub diseased_pixels: u32,
    pub ratio: f64,
    pub severity_percent: f64,
    pub tier: SeverityTier,
    pub tier_range: &'static str,
    pub category: TreatmentCategory,
    pub recommendation: String,
    pub elapsed_millis: u128,
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisReport {
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            leaf_pixels: self.result.leaf_pixel_count,
            diseased_pixels: self.result.diseased_pixel_count,
            ratio: self.result.ratio.value(),
            severity_percent: self.assessment.percentage(),
            tier: self.assessment.tier,
            tier_range: self.assessment.tier.range_label(),
            category: self.assessment.category,
            recommendation: self.assessment.recommendation.render(),
            elapsed_millis: self.result.elapsed_millis(),
            analyzed_at: self.analyzed_at,
        }
    }

    /// Write the resized, disease-highlighted and leaf-isolated images as PNG into `dir`
    pub fn save_images<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        self.result.resized.save(dir.join(RESIZED_FILENAME))?;
        self.result.disease_highlighted.save(dir.join(DISEASE_HIGHLIGHT_FILENAME))?;
        self.result.leaf_isolated.save(dir.join(LEAF_ISOLATED_FILENAME))?;
        Ok(())
    }

    /// Write [`ReportSummary`] as pretty JSON
    pub fn save_summary<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.summary())?;
        fs::write(path, json)?;
        Ok(())
    }
}
