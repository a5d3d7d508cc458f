//! Model runtime adapter: owns the two segmenters for the life of the process.

#[cfg(feature = "tract")]
pub mod tract;

#[cfg(feature = "tract")]
pub use self::tract::{TractModelLoader, TractSegmenter};

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Mutex,
};

use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::{error, info};

use crate::{
    error::{AnalysisError, RuntimeError},
    traits::{ModelLoader, SegmentationModel},
    types::{InputTensor, ModelRole, ProbabilityGrid},
};

/// Load outcome for one role
pub enum ModelSlot {
    Ready(Mutex<Box<dyn SegmentationModel>>),
    Failed(String),
}

impl ModelSlot {
    fn from_load(role: ModelRole, outcome: Result<Box<dyn SegmentationModel>, RuntimeError>) -> Self {
        match outcome {
            Ok(model) => {
                info!("Loaded {role} model");
                Self::Ready(Mutex::new(model))
            }
            Err(e) => {
                error!("Model initialization failed for {role}: {e}");
                Self::Failed(e.to_string())
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

impl std::fmt::Debug for ModelSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(_) => f.write_str("Ready"),
            Self::Failed(reason) => f.debug_tuple("Failed").field(reason).finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadFailure {
    pub role: ModelRole,
    pub reason: String,
}

/// Whether every model the pipeline needs is loaded
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Readiness {
    Ready,
    Degraded { failures: Vec<LoadFailure> },
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn missing(&self) -> Vec<ModelRole> {
        match self {
            Self::Ready => Vec::new(),
            Self::Degraded { failures } => failures.iter().map(|f| f.role).collect(),
        }
    }

    /// `Ok` when ready, otherwise the first load failure
    pub fn into_result(self) -> Result<(), AnalysisError> {
        match self {
            Self::Ready => Ok(()),
            Self::Degraded { failures } => match failures.into_iter().next() {
                Some(LoadFailure { role, reason }) => Err(AnalysisError::ModelLoadFailure { role, reason }),
                None => Ok(()),
            },
        }
    }
}

/// The leaf and disease segmenters, each loaded independently
#[derive(Debug)]
pub struct ModelRuntime {
    leaf: ModelSlot,
    disease: ModelSlot,
}

impl ModelRuntime {
    /// Attempt both loads. A failure or panic for one role never skips the other.
    pub fn initialize(loader: &dyn ModelLoader) -> Self {
        let leaf = ModelSlot::from_load(ModelRole::LeafSegmenter, load_isolated(loader, ModelRole::LeafSegmenter));
        let disease = ModelSlot::from_load(
            ModelRole::DiseaseSegmenter,
            load_isolated(loader, ModelRole::DiseaseSegmenter),
        );
        Self { leaf, disease }
    }

    /// Runtime over models that are already in memory
    pub fn from_models(leaf: Box<dyn SegmentationModel>, disease: Box<dyn SegmentationModel>) -> Self {
        Self {
            leaf: ModelSlot::Ready(Mutex::new(leaf)),
            disease: ModelSlot::Ready(Mutex::new(disease)),
        }
    }

    pub fn slot(&self, role: ModelRole) -> &ModelSlot {
        match role {
            ModelRole::LeafSegmenter => &self.leaf,
            ModelRole::DiseaseSegmenter => &self.disease,
        }
    }

    pub fn readiness(&self) -> Readiness {
        let failures: Vec<LoadFailure> = ModelRole::iter()
            .filter_map(|role| match self.slot(role) {
                ModelSlot::Ready(_) => None,
                ModelSlot::Failed(reason) => Some(LoadFailure {
                    role,
                    reason: reason.clone(),
                }),
            })
            .collect();

        if failures.is_empty() {
            Readiness::Ready
        } else {
            Readiness::Degraded { failures }
        }
    }

    /// Run one model. Calls to the same model are serialized; panics inside
    /// the backend are reported as inference errors.
    pub fn infer(&self, role: ModelRole, input: &InputTensor) -> Result<ProbabilityGrid, RuntimeError> {
        let model = match self.slot(role) {
            ModelSlot::Ready(model) => model,
            ModelSlot::Failed(_) => return Err(RuntimeError::NotReady { role }),
        };

        let guard = model.lock().map_err(|_| RuntimeError::Inference {
            role,
            message: "model lock poisoned by an earlier failure".to_string(),
        })?;

        let grid = catch_unwind(AssertUnwindSafe(|| guard.infer(input))).map_err(|_| RuntimeError::Inference {
            role,
            message: "model panicked during inference".to_string(),
        })??;

        let expected = input.spatial_dimensions();
        if grid.dimensions() != expected {
            return Err(RuntimeError::Inference {
                role,
                message: format!(
                    "shape mismatch: expected {}x{} output, got {}x{}",
                    expected.0,
                    expected.1,
                    grid.width(),
                    grid.height()
                ),
            });
        }

        Ok(grid)
    }
}

fn load_isolated(loader: &dyn ModelLoader, role: ModelRole) -> Result<Box<dyn SegmentationModel>, RuntimeError> {
    catch_unwind(AssertUnwindSafe(|| loader.load(role))).unwrap_or_else(|payload| {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|msg| msg.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(RuntimeError::Load {
            role,
            reason: format!("loader panicked: {detail}"),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::to_tensor;
    use image::RgbaImage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Constant(f32);

    impl SegmentationModel for Constant {
        fn infer(&self, input: &InputTensor) -> Result<ProbabilityGrid, RuntimeError> {
            let (w, h) = input.spatial_dimensions();
            Ok(ProbabilityGrid::filled(w, h, self.0))
        }
    }

    struct WrongShape;

    impl SegmentationModel for WrongShape {
        fn infer(&self, _input: &InputTensor) -> Result<ProbabilityGrid, RuntimeError> {
            Ok(ProbabilityGrid::filled(3, 3, 1.0))
        }
    }

    struct Panics;

    impl SegmentationModel for Panics {
        fn infer(&self, _input: &InputTensor) -> Result<ProbabilityGrid, RuntimeError> {
            panic!("native failure")
        }
    }

    fn tensor(size: u32) -> InputTensor {
        to_tensor(&RgbaImage::new(size, size), &[0.0; 3], &[1.0; 3])
    }

    #[test]
    fn test_both_loads_attempted_when_first_fails() {
        let attempts = AtomicUsize::new(0);
        let loader = |role: ModelRole| -> Result<Box<dyn SegmentationModel>, RuntimeError> {
            attempts.fetch_add(1, Ordering::SeqCst);
            match role {
                ModelRole::LeafSegmenter => Err(RuntimeError::Load {
                    role,
                    reason: "missing file".to_string(),
                }),
                ModelRole::DiseaseSegmenter => Ok(Box::new(Constant(1.0))),
            }
        };

        let runtime = ModelRuntime::initialize(&loader);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(!runtime.slot(ModelRole::LeafSegmenter).is_ready());
        assert!(runtime.slot(ModelRole::DiseaseSegmenter).is_ready());
        assert_eq!(runtime.readiness().missing(), vec![ModelRole::LeafSegmenter]);
    }

    #[test]
    fn test_loader_panic_does_not_skip_other_role() {
        let attempts = AtomicUsize::new(0);
        let loader = |role: ModelRole| -> Result<Box<dyn SegmentationModel>, RuntimeError> {
            attempts.fetch_add(1, Ordering::SeqCst);
            match role {
                ModelRole::LeafSegmenter => panic!("malformed model graph"),
                ModelRole::DiseaseSegmenter => Ok(Box::new(Constant(1.0))),
            }
        };

        let runtime = ModelRuntime::initialize(&loader);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(runtime.slot(ModelRole::DiseaseSegmenter).is_ready());

        let err = runtime.readiness().into_result().unwrap_err();
        match err {
            AnalysisError::ModelLoadFailure { role, reason } => {
                assert_eq!(role, ModelRole::LeafSegmenter);
                assert!(reason.contains("malformed model graph"), "reason: {reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_failed_slot_reports_not_ready() {
        let loader = |role: ModelRole| -> Result<Box<dyn SegmentationModel>, RuntimeError> {
            Err(RuntimeError::Load {
                role,
                reason: "corrupt".to_string(),
            })
        };
        let runtime = ModelRuntime::initialize(&loader);

        let err = runtime.infer(ModelRole::DiseaseSegmenter, &tensor(4)).unwrap_err();
        assert_eq!(err, RuntimeError::NotReady { role: ModelRole::DiseaseSegmenter });

        let err = runtime.readiness().into_result().unwrap_err();
        assert!(matches!(err, AnalysisError::ModelLoadFailure { role: ModelRole::LeafSegmenter, .. }));
    }

    #[test]
    fn test_shape_mismatch_is_inference_error() {
        let runtime = ModelRuntime::from_models(Box::new(WrongShape), Box::new(Constant(0.0)));
        let err = runtime.infer(ModelRole::LeafSegmenter, &tensor(8)).unwrap_err();
        assert!(matches!(err, RuntimeError::Inference { role: ModelRole::LeafSegmenter, .. }));
    }

    #[test]
    fn test_panic_is_contained_and_runtime_stays_usable() {
        let runtime = ModelRuntime::from_models(Box::new(Constant(1.0)), Box::new(Panics));

        let err = runtime.infer(ModelRole::DiseaseSegmenter, &tensor(4)).unwrap_err();
        assert!(matches!(err, RuntimeError::Inference { .. }));

        let grid = runtime.infer(ModelRole::LeafSegmenter, &tensor(4)).expect("Leaf model still usable");
        assert_eq!(grid.dimensions(), (4, 4));
    }

    #[test]
    fn test_ready_runtime() {
        let runtime = ModelRuntime::from_models(Box::new(Constant(0.2)), Box::new(Constant(0.9)));
        assert!(runtime.readiness().is_ready());
        assert!(runtime.readiness().into_result().is_ok());
    }
}
