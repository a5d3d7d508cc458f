use std::path::{Path, PathBuf};

use image::DynamicImage;
use leafseg::{AnalysisReport, AnalyzerConfig, ConfigError, LeafSegError, SeverityTier, TreatmentCategory};
use serde::Serialize;
use thiserror::Error;

pub const REPORT_FILENAME: &str = "report.json";

#[derive(Error, Debug)]
pub enum LeafScanError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    LeafSeg(#[from] LeafSegError),
    #[error("Failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Load a config file if given, otherwise defaults, then apply model path overrides
pub fn resolve_config(
    config: Option<&Path>,
    leaf_model: Option<PathBuf>,
    disease_model: Option<PathBuf>,
) -> Result<AnalyzerConfig, LeafScanError> {
    let mut config = match config {
        Some(path) => AnalyzerConfig::from_file(path)?,
        None => AnalyzerConfig::default(),
    };
    if let Some(leaf) = leaf_model {
        config.models.leaf = leaf;
    }
    if let Some(disease) = disease_model {
        config.models.disease = disease;
    }
    Ok(config)
}

pub fn open_image(path: &Path) -> Result<DynamicImage, LeafScanError> {
    image::open(path).map_err(|source| LeafScanError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Write the three images and `report.json` into `dir`, returning the report path
pub fn write_outputs(report: &AnalysisReport, dir: &Path) -> Result<PathBuf, LeafScanError> {
    report.save_images(dir)?;
    let summary_path = dir.join(REPORT_FILENAME);
    report.save_summary(&summary_path)?;
    Ok(summary_path)
}

/// One row of the severity table as printed by `leafscan tiers`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TierRow {
    pub tier: SeverityTier,
    pub range: &'static str,
    pub category: TreatmentCategory,
}

pub fn tier_table() -> Vec<TierRow> {
    SeverityTier::all()
        .map(|tier| TierRow {
            tier,
            range: tier.range_label(),
            category: tier.category(),
        })
        .collect()
}

pub fn format_tier_table(rows: &[TierRow]) -> String {
    let mut out = format!("{:<6} {:<12} {}\n", "Tier", "Ratio", "Category");
    for row in rows {
        out.push_str(&format!("{:<6} {:<12} {}\n", row.tier.index(), row.range, row.category));
    }
    out
}
