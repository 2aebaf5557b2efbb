//! Luminance conversion
//! Y = 0.299*R + 0.587*G + 0.114*B
//! Uses fast integer arithmetic: Y = (76*R + 150*G + 29*B) >> 8

use image::{GrayImage, RgbImage};
use rayon::prelude::*;

/// Coefficients for grayscale conversion: Y = (76*R + 150*G + 29*B) >> 8
const COEF_R: i32 = 76;
const COEF_G: i32 = 150;
const COEF_B: i32 = 29;

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    let lum = (COEF_R * r as i32 + COEF_G * g as i32 + COEF_B * b as i32) >> 8;
    lum.min(255) as u8
}

/// Convert an RGB image to luminance, rows in parallel
pub fn rgb_to_grayscale(rgb: &RgbImage) -> GrayImage {
    let (width, height) = rgb.dimensions();
    let w = width as usize;
    let mut gray = vec![0u8; w * height as usize];
    if w == 0 {
        return GrayImage::new(width, height);
    }
    let src = rgb.as_raw();

    gray.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        let row_start = y * w * 3;
        for (x, out) in row.iter_mut().enumerate() {
            let idx = row_start + x * 3;
            *out = luma(src[idx], src[idx + 1], src[idx + 2]);
        }
    });

    GrayImage::from_raw(width, height, gray).unwrap_or_else(|| GrayImage::new(width, height))
}

/// Replicate a gray image into three channels
pub fn gray_to_rgb(gray: &GrayImage) -> RgbImage {
    let (width, height) = gray.dimensions();
    let raw: Vec<u8> = gray.as_raw().iter().flat_map(|&v| [v, v, v]).collect();
    RgbImage::from_raw(width, height, raw).unwrap_or_else(|| RgbImage::new(width, height))
}
