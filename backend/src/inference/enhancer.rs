use std::sync::Arc;

use image::imageops::{self, FilterType};

use super::model::{InferenceError, UpscaleModel};
use super::preprocess;
use super::quality;

/// Outcome of an enhancement attempt. Enhancement never fails outward: any
/// problem yields the caller's original bytes.
#[derive(Debug, PartialEq)]
pub enum Enhancement<'a> {
    Enhanced(Vec<u8>),
    Original(&'a [u8]),
}

impl Enhancement<'_> {
    pub fn bytes(&self) -> &[u8] {
        match self {
            Enhancement::Enhanced(bytes) => bytes,
            Enhancement::Original(bytes) => bytes,
        }
    }

    pub fn is_enhanced(&self) -> bool {
        matches!(self, Enhancement::Enhanced(_))
    }
}

#[derive(Clone)]
pub struct Enhancer {
    model: Arc<dyn UpscaleModel>,
    blur_threshold: f64,
}

impl Enhancer {
    pub fn new(model: Arc<dyn UpscaleModel>, blur_threshold: f64) -> Self {
        Self {
            model,
            blur_threshold,
        }
    }

    pub fn scale(&self) -> u32 {
        self.model.scale()
    }

    /// Upscales `image` and re-encodes it as PNG. Unless `force` is set the
    /// image is only touched when it fails the sharpness check.
    pub fn enhance<'a>(&self, image: &'a [u8], force: bool) -> Enhancement<'a> {
        if !force && !quality::needs_enhancement(image, self.blur_threshold) {
            log::info!("Enhancement skipped, image passed the sharpness check");
            return Enhancement::Original(image);
        }

        log::info!("Running enhancement (scale {}x)", self.model.scale());
        match self.upscale(image) {
            Ok(enhanced) => {
                log::info!("Enhancement complete ({} -> {} bytes)", image.len(), enhanced.len());
                Enhancement::Enhanced(enhanced)
            }
            Err(e) => {
                log::warn!("Enhancement failed, keeping the original image: {}", e);
                Enhancement::Original(image)
            }
        }
    }

    /// The network's native factor may differ from the configured one, so
    /// the output is resampled to exactly `input * scale`.
    fn upscale(&self, image: &[u8]) -> Result<Vec<u8>, InferenceError> {
        let decoded = preprocess::decode(image)?.to_rgb8();
        let upscaled = self.model.upscale(&decoded)?;

        let scale = self.model.scale();
        let target = (decoded.width() * scale, decoded.height() * scale);
        if upscaled.dimensions() == target {
            return preprocess::encode_png(&upscaled);
        }
        log::debug!(
            "Resampling enhancer output {:?} to {:?} for x{}",
            upscaled.dimensions(),
            target,
            scale
        );
        let resized = imageops::resize(&upscaled, target.0, target.1, FilterType::Lanczos3);
        preprocess::encode_png(&resized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    struct Nearest(u32);

    impl UpscaleModel for Nearest {
        fn upscale(&self, image: &RgbImage) -> Result<RgbImage, InferenceError> {
            let (w, h) = image.dimensions();
            Ok(imageops::resize(image, w * self.0, h * self.0, FilterType::Nearest))
        }

        fn scale(&self) -> u32 {
            self.0
        }
    }

    /// Network that always upscales x4 regardless of the configured factor.
    struct FixedX4 {
        configured: u32,
    }

    impl UpscaleModel for FixedX4 {
        fn upscale(&self, image: &RgbImage) -> Result<RgbImage, InferenceError> {
            let (w, h) = image.dimensions();
            Ok(imageops::resize(image, w * 4, h * 4, FilterType::Nearest))
        }

        fn scale(&self) -> u32 {
            self.configured
        }
    }

    struct Broken;

    impl UpscaleModel for Broken {
        fn upscale(&self, _image: &RgbImage) -> Result<RgbImage, InferenceError> {
            Err(InferenceError::Model("out of memory".into()))
        }

        fn scale(&self) -> u32 {
            4
        }
    }

    fn flat_png() -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        RgbImage::from_pixel(8, 6, Rgb([10, 120, 30]))
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn blurry_image_is_upscaled() {
        let enhancer = Enhancer::new(Arc::new(Nearest(4)), quality::DEFAULT_BLUR_THRESHOLD);
        let original = flat_png();
        let outcome = enhancer.enhance(&original, false);

        assert!(outcome.is_enhanced());
        let decoded = image::load_from_memory(outcome.bytes()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 24));
    }

    #[test]
    fn output_follows_configured_scale() {
        let original = flat_png();
        for configured in [2, 4, 3] {
            let enhancer = Enhancer::new(Arc::new(FixedX4 { configured }), quality::DEFAULT_BLUR_THRESHOLD);
            let outcome = enhancer.enhance(&original, true);

            assert!(outcome.is_enhanced());
            let decoded = image::load_from_memory(outcome.bytes()).unwrap();
            assert_eq!(
                (decoded.width(), decoded.height()),
                (8 * configured, 6 * configured)
            );
        }
    }

    #[test]
    fn sharp_image_is_left_alone_unless_forced() {
        let enhancer = Enhancer::new(Arc::new(Nearest(2)), -1.0);
        let original = flat_png();

        assert_eq!(enhancer.enhance(&original, false), Enhancement::Original(&original));
        assert!(enhancer.enhance(&original, true).is_enhanced());
    }

    #[test]
    fn model_failure_falls_back_to_original() {
        let enhancer = Enhancer::new(Arc::new(Broken), quality::DEFAULT_BLUR_THRESHOLD);
        let original = flat_png();
        let outcome = enhancer.enhance(&original, true);

        assert!(!outcome.is_enhanced());
        assert_eq!(outcome.bytes(), original.as_slice());
    }

    #[test]
    fn undecodable_input_falls_back_to_original() {
        let enhancer = Enhancer::new(Arc::new(Nearest(2)), quality::DEFAULT_BLUR_THRESHOLD);
        let outcome = enhancer.enhance(b"nope", true);
        assert_eq!(outcome, Enhancement::Original(b"nope"));
    }
}
