use crate::{
    error::RuntimeError,
    types::{InputTensor, ModelRole, ProbabilityGrid},
};

/// A loaded segmentation model: one NHWC tensor in, one probability grid out.
///
/// Implementations need not be safe for concurrent calls; the runtime
/// serializes access to each model.
pub trait SegmentationModel: Send {
    fn infer(&self, input: &InputTensor) -> Result<ProbabilityGrid, RuntimeError>;
}

/// Produces a model for a role. Called once per role at startup.
pub trait ModelLoader: Send + Sync {
    fn load(&self, role: ModelRole) -> Result<Box<dyn SegmentationModel>, RuntimeError>;
}

impl<F> ModelLoader for F
where
    F: Fn(ModelRole) -> Result<Box<dyn SegmentationModel>, RuntimeError> + Send + Sync,
{
    fn load(&self, role: ModelRole) -> Result<Box<dyn SegmentationModel>, RuntimeError> {
        self(role)
    }
}

/// Colour transform applied while highlighting disease.
/// Pixels are RGBA; implementations must keep every channel in range.
pub trait HighlightPolicy: Send + Sync {
    /// Pixel classified as diseased leaf tissue
    fn diseased(&self, pixel: [u8; 4]) -> [u8; 4];

    /// Any other pixel (healthy leaf or background)
    fn background(&self, pixel: [u8; 4]) -> [u8; 4];

    fn name(&self) -> &'static str;
}
