//! Sharpness check: variance of the Laplacian over the grayscale image.

use image::GrayImage;

use super::preprocess;

pub const DEFAULT_BLUR_THRESHOLD: f64 = 8.0;

/// Population variance of the 4-neighbour Laplacian with reflect-101
/// borders. Low values mean few edges, i.e. a blurry picture.
pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (width, height) = gray.dimensions();
    let (w, h) = (width as i64, height as i64);
    let pixel = |x: i64, y: i64| gray.get_pixel(reflect_101(x, w), reflect_101(y, h))[0] as f64;

    let count = (width as u64 * height as u64) as f64;
    if count == 0.0 {
        return 0.0;
    }

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for y in 0..h {
        for x in 0..w {
            let response = pixel(x, y - 1) + pixel(x - 1, y) + pixel(x + 1, y) + pixel(x, y + 1)
                - 4.0 * pixel(x, y);
            sum += response;
            sum_sq += response * response;
        }
    }

    let mean = sum / count;
    (sum_sq / count - mean * mean).max(0.0)
}

/// `None` when the bytes are not a decodable image.
pub fn blur_variance(image: &[u8]) -> Option<f64> {
    let decoded = preprocess::decode(image).ok()?;
    Some(laplacian_variance(&preprocess::to_grayscale(&decoded)))
}

/// True when the picture is blurry enough to be worth upscaling. Undecodable
/// input never asks for enhancement.
pub fn needs_enhancement(image: &[u8], threshold: f64) -> bool {
    blur_variance(image).is_some_and(|variance| variance < threshold)
}

fn reflect_101(index: i64, len: i64) -> u32 {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let folded = index.rem_euclid(period);
    (if folded < len { folded } else { period - folded }) as u32
}
