use std::path::Path;
use std::sync::Mutex;

use image::RgbImage;
use ndarray::Array4;
use tch::{CModule, Device, Kind, Tensor};

use super::model::{ClassifierModel, InferenceError, UpscaleModel};

fn load_module(path: &Path, device: Device) -> Result<Mutex<CModule>, InferenceError> {
    let module = CModule::load_on_device(path, device)
        .map_err(|e| InferenceError::Model(format!("failed to load {}: {}", path.display(), e)))?;
    Ok(Mutex::new(module))
}

fn run(module: &Mutex<CModule>, input: &Tensor) -> Result<Tensor, InferenceError> {
    let module = module
        .lock()
        .map_err(|_| InferenceError::Model("model lock poisoned".into()))?;
    tch::no_grad(|| module.forward_ts(&[input]))
        .map_err(|e| InferenceError::Model(e.to_string()))
}

/// TorchScript image classifier.
pub struct TorchClassifier {
    module: Mutex<CModule>,
    device: Device,
}

impl TorchClassifier {
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        let device = Device::cuda_if_available();
        let module = load_module(path, device)?;
        log::info!("Classifier loaded from {} on {:?}", path.display(), device);
        Ok(Self { module, device })
    }
}

impl ClassifierModel for TorchClassifier {
    fn forward(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        let shape: Vec<i64> = input.shape().iter().map(|&d| d as i64).collect();
        let data = input
            .as_slice()
            .ok_or_else(|| InferenceError::Preprocessing("input tensor is not contiguous".into()))?;
        let tensor = Tensor::from_slice(data).view(shape.as_slice()).to_device(self.device);

        let output = run(&self.module, &tensor)?
            .to_device(Device::Cpu)
            .to_kind(Kind::Float)
            .view([-1]);
        let num_elements = output.size()[0] as usize;
        let mut logits = vec![0.0f32; num_elements];
        output.copy_data(&mut logits, num_elements);
        Ok(logits)
    }
}

/// TorchScript super-resolution network taking and returning `[1, 3, H, W]`
/// RGB in [0, 1].
pub struct TorchUpscaler {
    module: Mutex<CModule>,
    device: Device,
    scale: u32,
}

impl TorchUpscaler {
    pub fn load(path: &Path, scale: u32) -> Result<Self, InferenceError> {
        let device = Device::cuda_if_available();
        let module = load_module(path, device)?;
        log::info!("Enhancer loaded from {} on {:?}", path.display(), device);
        Ok(Self {
            module,
            device,
            scale,
        })
    }
}

impl UpscaleModel for TorchUpscaler {
    fn upscale(&self, image: &RgbImage) -> Result<RgbImage, InferenceError> {
        let (width, height) = image.dimensions();
        let input = (Tensor::from_slice(image.as_raw().as_slice())
            .view([height as i64, width as i64, 3])
            .permute([2, 0, 1])
            .to_kind(Kind::Float)
            / 255.0)
            .unsqueeze(0)
            .to_device(self.device);

        let output = run(&self.module, &input)?;
        let size = output.size();
        if size.len() != 4 || size[1] != 3 {
            return Err(InferenceError::Model(format!(
                "unexpected enhancer output shape {:?}",
                size
            )));
        }
        let (out_height, out_width) = (size[2] as u32, size[3] as u32);

        let pixels = (output.squeeze_dim(0).clamp(0.0, 1.0) * 255.0)
            .round()
            .to_kind(Kind::Uint8)
            .permute([1, 2, 0])
            .contiguous()
            .to_device(Device::Cpu)
            .view([-1]);
        let num_elements = pixels.size()[0] as usize;
        let mut raw = vec![0u8; num_elements];
        pixels.copy_data(&mut raw, num_elements);

        RgbImage::from_raw(out_width, out_height, raw)
            .ok_or_else(|| InferenceError::Model("enhancer output buffer size mismatch".into()))
    }

    fn scale(&self) -> u32 {
        self.scale
    }
}
