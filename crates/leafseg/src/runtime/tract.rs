use std::path::{Path, PathBuf};

use tract_onnx::prelude::*;
use tracing::{debug, info};

use crate::{
    config::ModelPaths,
    error::RuntimeError,
    traits::{ModelLoader, SegmentationModel},
    types::{INPUT_CHANNELS, InputTensor, ModelRole, ProbabilityGrid},
};

type Plan = TypedRunnableModel<TypedModel>;

/// An ONNX segmenter executed with tract
pub struct TractSegmenter {
    role: ModelRole,
    plan: Plan,
}

impl TractSegmenter {
    /// Load, pin the input to `[1, size, size, 3]` f32, optimize and plan.
    pub fn load(role: ModelRole, path: &Path, input_size: u32) -> Result<Self, RuntimeError> {
        info!("Loading {role} model from {}", path.display());
        let size = input_size as usize;

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact([1, size, size, INPUT_CHANNELS]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| RuntimeError::Load {
                role,
                reason: format!("{}: {e:#}", path.display()),
            })?;

        Ok(Self { role, plan })
    }

    pub fn role(&self) -> ModelRole {
        self.role
    }

    fn inference_error(&self, message: String) -> RuntimeError {
        RuntimeError::Inference {
            role: self.role,
            message,
        }
    }
}

impl SegmentationModel for TractSegmenter {
    fn infer(&self, input: &InputTensor) -> Result<ProbabilityGrid, RuntimeError> {
        let tensor = Tensor::from_shape(&input.shape(), input.data())
            .map_err(|e| self.inference_error(format!("malformed input tensor: {e:#}")))?;

        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(|e| self.inference_error(format!("{e:#}")))?;

        let output = outputs
            .first()
            .ok_or_else(|| self.inference_error("model produced no outputs".to_string()))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| self.inference_error(format!("output is not f32: {e:#}")))?;

        // [1,H,W,1], [1,1,H,W], [1,H,W] and [H,W] all flatten to the same row-major grid
        let (width, height) = input.spatial_dimensions();
        let expected = width as usize * height as usize;
        if view.len() != expected {
            return Err(self.inference_error(format!(
                "shape mismatch: output {:?} does not hold a {width}x{height} grid",
                view.shape()
            )));
        }
        debug!("{} output shape {:?}", self.role, view.shape());

        let values: Vec<f32> = view.iter().copied().collect();
        ProbabilityGrid::new(width, height, values).map_err(|e| self.inference_error(e.to_string()))
    }
}

/// Loads both segmenters from ONNX files on disk
#[derive(Debug, Clone)]
pub struct TractModelLoader {
    leaf_model: PathBuf,
    disease_model: PathBuf,
    input_size: u32,
}

impl TractModelLoader {
    pub fn new(paths: &ModelPaths, input_size: u32) -> Self {
        Self {
            leaf_model: paths.leaf.clone(),
            disease_model: paths.disease.clone(),
            input_size,
        }
    }

    pub fn path(&self, role: ModelRole) -> &Path {
        match role {
            ModelRole::LeafSegmenter => &self.leaf_model,
            ModelRole::DiseaseSegmenter => &self.disease_model,
        }
    }
}

impl ModelLoader for TractModelLoader {
    fn load(&self, role: ModelRole) -> Result<Box<dyn SegmentationModel>, RuntimeError> {
        let path = self.path(role);
        if !path.exists() {
            return Err(RuntimeError::Load {
                role,
                reason: format!("model file not found: {}", path.display()),
            });
        }
        let model = TractSegmenter::load(role, path, self.input_size)?;
        Ok(Box::new(model))
    }
}
