//! Occlusion-sensitivity heat maps.
//!
//! Each cell of an N×N grid over the model input is masked in turn (set to
//! zero, which is the dataset mean after normalization) and the drop in the
//! top-class probability is recorded. Cells whose masking hurts the
//! prediction most are the ones the network relied on.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{Rgb, RgbImage};
use ndarray::{Array2, Array4, s};

use super::model::InferenceError;
use super::preprocess::encode_png;

const OVERLAY_ALPHA: f32 = 0.4;

/// Largest grid accepted; beyond this a cell is smaller than 8 input pixels.
pub const MAX_GRID: usize = 28;

pub fn occlusion_map<F>(
    input: &Array4<f32>,
    target: usize,
    baseline: f32,
    grid: usize,
    mut probabilities: F,
) -> Result<Array2<f32>, InferenceError>
where
    F: FnMut(&Array4<f32>) -> Result<Vec<f32>, InferenceError>,
{
    let (height, width) = (input.shape()[2], input.shape()[3]);
    if grid == 0 || grid > height.min(width) {
        return Err(InferenceError::Preprocessing(format!(
            "saliency grid {grid} does not fit a {width}x{height} input"
        )));
    }

    let mut heat = Array2::<f32>::zeros((grid, grid));
    let mut occluded = input.clone();

    for row in 0..grid {
        let (y0, y1) = cell_bounds(row, grid, height);
        for col in 0..grid {
            let (x0, x1) = cell_bounds(col, grid, width);

            occluded.slice_mut(s![.., .., y0..y1, x0..x1]).fill(0.0);
            let score = probabilities(&occluded)?
                .get(target)
                .copied()
                .ok_or(InferenceError::EmptyOutput)?;
            occluded
                .slice_mut(s![.., .., y0..y1, x0..x1])
                .assign(&input.slice(s![.., .., y0..y1, x0..x1]));

            heat[[row, col]] = (baseline - score).max(0.0);
        }
    }

    let peak = heat.iter().copied().fold(0.0f32, f32::max);
    if peak > 0.0 {
        heat.mapv_inplace(|value| value / peak);
    }
    Ok(heat)
}

/// Blends a jet-colored, bilinearly upsampled heat map over `base`.
pub fn render_overlay(base: &RgbImage, heat: &Array2<f32>) -> RgbImage {
    let (width, height) = base.dimensions();
    let (rows, cols) = heat.dim();

    RgbImage::from_fn(width, height, |x, y| {
        let gx = (x as f32 + 0.5) / width as f32 * cols as f32 - 0.5;
        let gy = (y as f32 + 0.5) / height as f32 * rows as f32 - 0.5;
        let color = jet(sample_bilinear(heat, gx, gy));
        let pixel = base.get_pixel(x, y);

        let mut blended = [0u8; 3];
        for channel in 0..3 {
            let value = (1.0 - OVERLAY_ALPHA) * pixel[channel] as f32
                + OVERLAY_ALPHA * color[channel] as f32;
            blended[channel] = value.round().clamp(0.0, 255.0) as u8;
        }
        Rgb(blended)
    })
}

pub fn encode_base64_png(image: &RgbImage) -> Result<String, InferenceError> {
    Ok(STANDARD.encode(encode_png(image)?))
}

fn cell_bounds(index: usize, grid: usize, extent: usize) -> (usize, usize) {
    (index * extent / grid, (index + 1) * extent / grid)
}

fn sample_bilinear(heat: &Array2<f32>, gx: f32, gy: f32) -> f32 {
    let (rows, cols) = heat.dim();
    let gx = gx.clamp(0.0, (cols - 1) as f32);
    let gy = gy.clamp(0.0, (rows - 1) as f32);

    let (x0, y0) = (gx.floor() as usize, gy.floor() as usize);
    let (x1, y1) = ((x0 + 1).min(cols - 1), (y0 + 1).min(rows - 1));
    let (tx, ty) = (gx - x0 as f32, gy - y0 as f32);

    let top = heat[[y0, x0]] * (1.0 - tx) + heat[[y0, x1]] * tx;
    let bottom = heat[[y1, x0]] * (1.0 - tx) + heat[[y1, x1]] * tx;
    top * (1.0 - ty) + bottom * ty
}

fn jet(value: f32) -> [u8; 3] {
    let v = value.clamp(0.0, 1.0);
    let channel = |offset: f32| ((1.5 - (4.0 * v - offset).abs()).clamp(0.0, 1.0) * 255.0) as u8;
    [channel(3.0), channel(2.0), channel(1.0)]
}
