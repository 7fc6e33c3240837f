use image::RgbImage;
use ndarray::Array4;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Image decoding error: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Preprocessing error: {0}")]
    Preprocessing(String),
    #[error("Model error: {0}")]
    Model(String),
    #[error("Model returned {actual} scores, expected {expected}")]
    OutputShape { expected: usize, actual: usize },
    #[error("Model returned no scores")]
    EmptyOutput,
    #[error("No inference backend compiled in (enable the `torch` feature)")]
    BackendUnavailable,
}

/// A network that maps a normalized `[1, 3, H, W]` batch to raw class logits.
pub trait ClassifierModel: Send + Sync {
    fn forward(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError>;
}

/// A super-resolution network.
pub trait UpscaleModel: Send + Sync {
    fn upscale(&self, image: &RgbImage) -> Result<RgbImage, InferenceError>;

    fn scale(&self) -> u32;
}
