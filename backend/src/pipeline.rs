use cropguard_shared::{ImageQuality, Prediction};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::{ModelConfig, SaliencyConfig};
use crate::error::ApiError;
use crate::inference::{self, ClassificationResult, Classifier, Enhancement, Enhancer, quality};

#[derive(Debug, Clone)]
pub struct Analysis {
    pub result: ClassificationResult,
    pub quality: ImageQuality,
}

impl Analysis {
    pub fn to_prediction(&self) -> Prediction {
        Prediction {
            disease_name: self.result.disease.to_string(),
            confidence: self.result.confidence,
            severity_level: self.result.severity_level,
            gradcam_image: self.result.visualization.clone(),
            image_quality: self.quality,
            message: format!(
                "Disease detected. Severity level {}/5.",
                self.result.severity_level
            ),
        }
    }
}

/// Classify, check sharpness, and re-classify a super-resolved copy when the
/// upload is blurry. Either model may be missing; only the classifier is
/// required to answer.
pub struct AnalysisPipeline {
    classifier: Option<Classifier>,
    enhancer: Option<Enhancer>,
    blur_threshold: f64,
}

impl AnalysisPipeline {
    pub fn new(classifier: Option<Classifier>, enhancer: Option<Enhancer>, blur_threshold: f64) -> Self {
        Self {
            classifier,
            enhancer,
            blur_threshold,
        }
    }

    /// Loads both models once. A model that fails to load is logged and left
    /// out so the server can still start and report the failure per request.
    pub fn load(models: &ModelConfig, saliency: &SaliencyConfig) -> Self {
        let classifier = match inference::load_classifier_model(&models.classifier_path) {
            Ok(model) => {
                log::info!("Classifier loaded from {}", models.classifier_path.display());
                Some(Classifier::new(model, saliency.grid()))
            }
            Err(e) => {
                log::error!(
                    "Failed to load classifier from {}: {}",
                    models.classifier_path.display(),
                    e
                );
                None
            }
        };

        let enhancer =
            match inference::load_upscale_model(&models.enhancer_path, models.enhancer_scale) {
                Ok(model) => {
                    log::info!(
                        "Enhancer (x{}) loaded from {}",
                        models.enhancer_scale,
                        models.enhancer_path.display()
                    );
                    Some(Enhancer::new(model, models.blur_variance_threshold))
                }
                Err(e) => {
                    log::warn!(
                        "Enhancer unavailable ({}): {}; blurry uploads will be classified as-is",
                        models.enhancer_path.display(),
                        e
                    );
                    None
                }
            };

        Self::new(classifier, enhancer, models.blur_variance_threshold)
    }

    pub fn classifier_loaded(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn enhancer_loaded(&self) -> bool {
        self.enhancer.is_some()
    }

    pub fn analyze(&self, image: &[u8]) -> Result<Analysis, ApiError> {
        let classifier = self.classifier.as_ref().ok_or(ApiError::ModelUnavailable)?;
        let request_id = Uuid::new_v4();
        log::debug!(
            "[{}] analyzing {} bytes (sha256 {})",
            request_id,
            image.len(),
            short_digest(image)
        );

        let mut result = classifier.classify(image)?;
        log::info!(
            "[{}] {} at {:.2}% (severity {})",
            request_id,
            result.disease,
            result.confidence,
            result.severity_level
        );

        let mut quality = ImageQuality::Good;
        let mut enhanced_image = None;
        if quality::needs_enhancement(image, self.blur_threshold) {
            quality = ImageQuality::Blurry;
            match &self.enhancer {
                None => log::warn!("[{}] blurry upload, no enhancer loaded", request_id),
                Some(enhancer) => {
                    if let Enhancement::Enhanced(enhanced) = enhancer.enhance(image, true) {
                        match classifier.classify(&enhanced) {
                            Ok(sharper) => {
                                log::info!(
                                    "[{}] after enhancement: {} at {:.2}% (severity {})",
                                    request_id,
                                    sharper.disease,
                                    sharper.confidence,
                                    sharper.severity_level
                                );
                                result = sharper;
                                quality = ImageQuality::Enhanced;
                                enhanced_image = Some(enhanced);
                            }
                            Err(e) => log::warn!(
                                "[{}] enhanced image could not be classified, keeping original result: {}",
                                request_id,
                                e
                            ),
                        }
                    }
                }
            }
        }

        let kept_image = enhanced_image.as_deref().unwrap_or(image);
        result.visualization = classifier.explain(kept_image, result.disease);

        Ok(Analysis { result, quality })
    }
}

fn short_digest(image: &[u8]) -> String {
    let hash = Sha256::digest(image);
    hex::encode(&hash[..6])
}
