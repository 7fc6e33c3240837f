use std::sync::Arc;

use cropguard_shared::DiseaseClass;
use ndarray::Array4;
use strum::EnumCount;

use super::model::{ClassifierModel, InferenceError};
use super::preprocess;
use super::saliency;
use super::severity::severity_level;

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub disease: DiseaseClass,
    /// Top-class probability in percent, rounded to two decimals.
    pub confidence: f32,
    pub severity_level: u8,
    /// Base64 PNG heat overlay, filled in by the caller from `explain`.
    pub visualization: Option<String>,
}

#[derive(Clone)]
pub struct Classifier {
    model: Arc<dyn ClassifierModel>,
    saliency_grid: Option<usize>,
}

impl Classifier {
    pub fn new(model: Arc<dyn ClassifierModel>, saliency_grid: Option<usize>) -> Self {
        Self {
            model,
            saliency_grid,
        }
    }

    /// Label, confidence and severity. `visualization` is left empty; see
    /// [`Classifier::explain`].
    pub fn classify(&self, image: &[u8]) -> Result<ClassificationResult, InferenceError> {
        let decoded = preprocess::decode(image)?;
        let input = preprocess::to_tensor(&preprocess::resize_for_model(&decoded));

        let probabilities = self.probabilities(&input)?;
        let (index, probability) = argmax(&probabilities).ok_or(InferenceError::EmptyOutput)?;
        let disease = DiseaseClass::from_index(index).ok_or(InferenceError::OutputShape {
            expected: DiseaseClass::COUNT,
            actual: probabilities.len(),
        })?;

        let confidence = (probability * 100.0 * 100.0).round() / 100.0;
        Ok(ClassificationResult {
            disease,
            confidence,
            severity_level: severity_level(disease, confidence),
            visualization: None,
        })
    }

    /// Occlusion heat map for `disease` over `image`, as a base64 PNG. `None`
    /// when saliency is disabled or rendering fails.
    pub fn explain(&self, image: &[u8], disease: DiseaseClass) -> Option<String> {
        let grid = self.saliency_grid?;
        match self.render_saliency(image, disease.index(), grid) {
            Ok(encoded) => Some(encoded),
            Err(e) => {
                log::warn!("Saliency rendering failed, returning no visualization: {}", e);
                None
            }
        }
    }

    fn render_saliency(&self, image: &[u8], target: usize, grid: usize) -> Result<String, InferenceError> {
        let decoded = preprocess::decode(image)?;
        let resized = preprocess::resize_for_model(&decoded);
        let input = preprocess::to_tensor(&resized);

        let baseline = self
            .probabilities(&input)?
            .get(target)
            .copied()
            .ok_or(InferenceError::EmptyOutput)?;
        let heat = saliency::occlusion_map(&input, target, baseline, grid, |occluded| {
            self.probabilities(occluded)
        })?;
        saliency::encode_base64_png(&saliency::render_overlay(&resized, &heat))
    }

    fn probabilities(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        let logits = self.model.forward(input)?;
        if logits.len() != DiseaseClass::COUNT {
            return Err(InferenceError::OutputShape {
                expected: DiseaseClass::COUNT,
                actual: logits.len(),
            });
        }
        Ok(softmax(&logits))
    }
}

pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / sum).collect()
}

fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (index, value)| match best {
            Some((_, top)) if top >= value => best,
            _ => Some((index, value)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    struct FixedLogits(Vec<f32>);

    impl ClassifierModel for FixedLogits {
        fn forward(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
            assert_eq!(input.shape(), &[1, 3, 224, 224]);
            Ok(self.0.clone())
        }
    }

    fn peaked_logits(index: usize, peak: f32) -> Vec<f32> {
        let mut logits = vec![0.0; DiseaseClass::COUNT];
        logits[index] = peak;
        logits
    }

    fn png_bytes() -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([40, 160, 60])));
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn softmax_is_a_distribution() {
        let probabilities = softmax(&[1000.0, 1000.0, 998.0]);
        let sum: f32 = probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!((probabilities[0] - probabilities[1]).abs() < 1e-6);
        assert!(probabilities[2] < probabilities[0]);
    }

    #[test]
    fn argmax_prefers_first_of_ties() {
        assert_eq!(argmax(&[0.1, 0.7, 0.7]), Some((1, 0.7)));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn classifies_confident_disease_as_severe() {
        let model = FixedLogits(peaked_logits(29, 20.0));
        let classifier = Classifier::new(Arc::new(model), None);
        let result = classifier.classify(&png_bytes()).unwrap();

        assert_eq!(result.disease, DiseaseClass::PotatoLateBlight);
        assert_eq!(result.confidence, 100.0);
        assert_eq!(result.severity_level, 5);
        assert!(result.visualization.is_none());
    }

    #[test]
    fn confidence_is_rounded_percent() {
        // e^2 / (e^2 + 30) = 0.19759...
        let model = FixedLogits(peaked_logits(0, 2.0));
        let classifier = Classifier::new(Arc::new(model), None);
        let result = classifier.classify(&png_bytes()).unwrap();

        assert_eq!(result.disease, DiseaseClass::AppleBlackRot);
        assert!((result.confidence - 19.76).abs() < 1e-3);
        assert_eq!(result.severity_level, 2);
    }

    #[test]
    fn wrong_output_width_is_an_error() {
        let classifier = Classifier::new(Arc::new(FixedLogits(vec![1.0, 2.0])), None);
        assert!(matches!(
            classifier.classify(&png_bytes()),
            Err(InferenceError::OutputShape {
                expected: 31,
                actual: 2
            })
        ));
    }

    #[test]
    fn undecodable_bytes_are_an_error() {
        let classifier = Classifier::new(Arc::new(FixedLogits(peaked_logits(0, 1.0))), None);
        assert!(matches!(
            classifier.classify(b"GIF89a-but-not-really"),
            Err(InferenceError::Decode(_))
        ));
    }

    #[test]
    fn explain_renders_only_when_enabled() {
        let logits = peaked_logits(3, 5.0);
        let enabled = Classifier::new(Arc::new(FixedLogits(logits.clone())), Some(2));
        let result = enabled.classify(&png_bytes()).unwrap();
        assert!(result.visualization.is_none());

        let encoded = enabled.explain(&png_bytes(), result.disease);
        assert!(encoded.is_some_and(|encoded| !encoded.is_empty()));

        let disabled = Classifier::new(Arc::new(FixedLogits(logits)), None);
        assert!(disabled.explain(&png_bytes(), result.disease).is_none());
    }

    #[test]
    fn explain_failure_is_swallowed() {
        let classifier = Classifier::new(Arc::new(FixedLogits(peaked_logits(3, 5.0))), Some(2));
        assert!(classifier.explain(b"not an image", DiseaseClass::AppleScab).is_none());
    }
}
