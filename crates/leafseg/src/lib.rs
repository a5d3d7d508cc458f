//! # Leaf Disease Severity Library
//!
//! Segments a leaf photograph with two pretrained models, fuses their
//! probability grids back onto the image and grades the infection.
//!
//! ## Core Features
//!
//! - **Dual-model Runtime**: Leaf and disease segmenters loaded independently, with explicit readiness
//! - **Mask Fusion**: Leaf isolation and non-destructive disease highlighting on preallocated buffers
//! - **Severity Grading**: Fixed 12-tier table mapping the diseased/leaf ratio to treatment guidance
//! - **Async Service**: Background model loading and single-flight analysis on tokio
//! - **Reporting**: PNG outputs and a JSON summary per analysis
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use leafseg::{AnalyzerConfig, ModelRuntime, Pipeline, TractModelLoader};
//!
//! let config = AnalyzerConfig::default();
//! let loader = TractModelLoader::new(&config.models, config.preprocess.input_size);
//! let runtime = ModelRuntime::initialize(&loader);
//!
//! let pipeline = Pipeline::builder().build();
//! let image = image::open("leaf.jpg")?;
//! let report = pipeline.analyze(&runtime, &image)?;
//!
//! println!("{}", report.assessment.severity_label());
//! println!("{}", report.assessment.recommendation.render());
//! report.save_images("out")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Async Service
//!
//! ```rust,no_run
//! use leafseg::{AnalyzerConfig, LeafAnalyzer, PipelineBuilder, TractModelLoader};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AnalyzerConfig::from_file("leafseg.toml")?;
//! let loader = TractModelLoader::new(&config.models, config.preprocess.input_size);
//! let analyzer = LeafAnalyzer::start(loader, PipelineBuilder::build_from_config(&config));
//!
//! analyzer.wait_until_loaded().await?;
//! let report = analyzer.analyze(image::open("leaf.jpg")?).await?;
//! println!("{}", report.assessment.severity_label());
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod traits;
pub mod config;
pub mod preprocessing;
pub mod runtime;
pub mod fusion;
pub mod severity;
pub mod pipeline;
pub mod service;
pub mod report;

// Re-exports for convenience
pub use config::{AnalyzerConfig, ModelPaths};
pub use error::{AnalysisError, ConfigError, LeafSegError, Result, RuntimeError};
pub use fusion::{BrightenDarkenHighlighter, FusionConfig, FusionEngine, RedChannelHighlighter};
pub use pipeline::{Pipeline, PipelineStage, builder::PipelineBuilder};
pub use preprocessing::{PreprocessConfig, Preprocessor, ResizeFilter};
pub use report::{AnalysisReport, ReportSummary};
pub use runtime::{ModelRuntime, ModelSlot, Readiness};
#[cfg(feature = "tract")]
pub use runtime::{TractModelLoader, TractSegmenter};
pub use service::LeafAnalyzer;
pub use severity::{Recommendation, SeverityAssessment, SeverityTier, TreatmentCategory};
pub use traits::*;
pub use types::{INPUT_SIZE, InferenceResult, InputTensor, ModelRole, PixelImage, ProbabilityGrid, SeverityRatio};
