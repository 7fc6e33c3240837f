use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageFormat, Luma, RgbImage};
use ndarray::Array4;

use super::model::InferenceError;

/// Side length of the square classifier input.
pub const INPUT_SIZE: u32 = 224;

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

pub fn decode(image: &[u8]) -> Result<DynamicImage, InferenceError> {
    Ok(image::load_from_memory(image)?)
}

pub fn resize_for_model(image: &DynamicImage) -> RgbImage {
    image
        .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle)
        .to_rgb8()
}

/// Scales to [0, 1], applies ImageNet normalization and lays the pixels out
/// as a CHW batch of one.
pub fn to_tensor(image: &RgbImage) -> Array4<f32> {
    let (width, height) = image.dimensions();
    Array4::from_shape_fn(
        (1, 3, height as usize, width as usize),
        |(_, channel, y, x)| {
            let value = image.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0;
            (value - IMAGENET_MEAN[channel]) / IMAGENET_STD[channel]
        },
    )
}

/// Luma with ITU-R 601 weights, matching the usual `L` conversion.
pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let luma = (r as u32 * 299 + g as u32 * 587 + b as u32 * 114 + 500) / 1000;
        Luma([luma as u8])
    })
}

pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, InferenceError> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}
