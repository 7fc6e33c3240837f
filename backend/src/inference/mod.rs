pub mod classifier;
pub mod enhancer;
pub mod model;
pub mod preprocess;
pub mod quality;
pub mod saliency;
pub mod severity;
#[cfg(feature = "torch")]
pub mod torch;

use std::path::Path;
use std::sync::Arc;

pub use classifier::{ClassificationResult, Classifier};
pub use enhancer::{Enhancement, Enhancer};
pub use model::{ClassifierModel, InferenceError, UpscaleModel};

#[cfg(feature = "torch")]
pub fn load_classifier_model(path: &Path) -> Result<Arc<dyn ClassifierModel>, InferenceError> {
    Ok(Arc::new(torch::TorchClassifier::load(path)?))
}

#[cfg(not(feature = "torch"))]
pub fn load_classifier_model(_path: &Path) -> Result<Arc<dyn ClassifierModel>, InferenceError> {
    Err(InferenceError::BackendUnavailable)
}

#[cfg(feature = "torch")]
pub fn load_upscale_model(path: &Path, scale: u32) -> Result<Arc<dyn UpscaleModel>, InferenceError> {
    Ok(Arc::new(torch::TorchUpscaler::load(path, scale)?))
}

#[cfg(not(feature = "torch"))]
pub fn load_upscale_model(
    _path: &Path,
    _scale: u32,
) -> Result<Arc<dyn UpscaleModel>, InferenceError> {
    Err(InferenceError::BackendUnavailable)
}
