//! Contrast and sharpness enhancement kernels

use image::{GrayImage, ImageBuffer, Luma, RgbImage};
use imageproc::filter::separable_filter_equal;
use rayon::prelude::*;

use crate::models::Frame;

/// Contrast-limited adaptive histogram equalization.
///
/// The image is split into a `tiles_x` x `tiles_y` grid; each tile gets a
/// clipped-histogram equalization LUT and every pixel is mapped by bilinear
/// interpolation between the four nearest tile LUTs. `clip_limit` is relative
/// to the average bin height, as in OpenCV.
pub fn clahe(gray: &GrayImage, clip_limit: f32, tiles_x: u32, tiles_y: u32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let (w, h) = (width as usize, height as usize);
    if w == 0 || h == 0 || tiles_x == 0 || tiles_y == 0 {
        return gray.clone();
    }

    // Small regions get fewer, at-least-one-pixel tiles
    let tile_w = w.div_ceil(tiles_x as usize).max(1);
    let tile_h = h.div_ceil(tiles_y as usize).max(1);
    let grid_x = w.div_ceil(tile_w);
    let grid_y = h.div_ceil(tile_h);
    let src = gray.as_raw();

    let luts: Vec<[u8; 256]> = (0..grid_x * grid_y)
        .into_par_iter()
        .map(|idx| {
            let tx = idx % grid_x;
            let ty = idx / grid_x;
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(w);
            let y1 = (y0 + tile_h).min(h);
            tile_lut(src, w, x0, y0, x1, y1, clip_limit)
        })
        .collect();

    let mut out = vec![0u8; w * h];
    let tw = tile_w as f32;
    let th = tile_h as f32;

    out.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        let fy = (y as f32 + 0.5) / th - 0.5;
        let ty0 = (fy.floor() as i64).clamp(0, grid_y as i64 - 1) as usize;
        let ty1 = (fy.floor() as i64 + 1).clamp(0, grid_y as i64 - 1) as usize;
        let ay = fy - fy.floor();

        for (x, px) in row.iter_mut().enumerate() {
            let v = src[y * w + x] as usize;
            let fx = (x as f32 + 0.5) / tw - 0.5;
            let tx0 = (fx.floor() as i64).clamp(0, grid_x as i64 - 1) as usize;
            let tx1 = (fx.floor() as i64 + 1).clamp(0, grid_x as i64 - 1) as usize;
            let ax = fx - fx.floor();

            let v00 = luts[ty0 * grid_x + tx0][v] as f32;
            let v10 = luts[ty0 * grid_x + tx1][v] as f32;
            let v01 = luts[ty1 * grid_x + tx0][v] as f32;
            let v11 = luts[ty1 * grid_x + tx1][v] as f32;

            let top = v00 * (1.0 - ax) + v10 * ax;
            let bottom = v01 * (1.0 - ax) + v11 * ax;
            *px = (top * (1.0 - ay) + bottom * ay).round().clamp(0.0, 255.0) as u8;
        }
    });

    GrayImage::from_raw(width, height, out).unwrap_or_else(|| gray.clone())
}

fn tile_lut(
    src: &[u8],
    stride: usize,
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
    clip_limit: f32,
) -> [u8; 256] {
    let mut hist = [0u32; 256];
    for y in y0..y1 {
        for &v in &src[y * stride + x0..y * stride + x1] {
            hist[v as usize] += 1;
        }
    }
    let area = ((x1 - x0) * (y1 - y0)) as u32;

    if clip_limit > 0.0 {
        let clip = ((clip_limit * area as f32 / 256.0) as u32).max(1);
        let mut excess = 0u32;
        for bin in hist.iter_mut() {
            if *bin > clip {
                excess += *bin - clip;
                *bin = clip;
            }
        }
        let per_bin = excess / 256;
        let remainder = (excess % 256) as usize;
        for (i, bin) in hist.iter_mut().enumerate() {
            *bin += per_bin;
            if i < remainder {
                *bin += 1;
            }
        }
    }

    let scale = 255.0 / area.max(1) as f32;
    let mut lut = [0u8; 256];
    let mut cdf = 0u32;
    for (i, entry) in lut.iter_mut().enumerate() {
        cdf += hist[i];
        *entry = (cdf as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Normalized 1D Gaussian kernel with radius `ceil(3 * sigma)`
fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (3.0 * sigma).ceil().max(1.0) as i32;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|i| (-((i * i) as f32) / denom).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    kernel.iter_mut().for_each(|k| *k /= sum);
    kernel
}

/// Gaussian blur kept in f32, so flat areas come back unchanged
pub fn gaussian_blur(gray: &GrayImage, sigma: f32) -> Vec<f32> {
    let (width, height) = gray.dimensions();
    let raw: Vec<f32> = gray.as_raw().iter().map(|&v| v as f32).collect();
    match ImageBuffer::<Luma<f32>, Vec<f32>>::from_raw(width, height, raw) {
        Some(src) => separable_filter_equal(&src, &gaussian_kernel(sigma)).into_raw(),
        None => gray.as_raw().iter().map(|&v| v as f32).collect(),
    }
}

/// Unsharp mask: `weight_original * src + weight_blur * gaussian(src, sigma)`,
/// saturated to 8 bits.
pub fn unsharp_mask(gray: &GrayImage, sigma: f32, weight_original: f32, weight_blur: f32) -> GrayImage {
    if gray.width() == 0 || gray.height() == 0 || sigma <= 0.0 {
        return gray.clone();
    }
    let blurred = gaussian_blur(gray, sigma);
    let mut out = gray.clone();
    out.as_mut()
        .par_iter_mut()
        .zip(blurred.par_iter())
        .for_each(|(px, &b)| {
            let v = weight_original * *px as f32 + weight_blur * b;
            *px = v.round().clamp(0.0, 255.0) as u8;
        });
    out
}

#[inline]
fn scale_abs(v: u8, alpha: f32, beta: f32) -> u8 {
    (alpha * v as f32 + beta).abs().round().min(255.0) as u8
}

/// Software gain: `saturate(|alpha * src + beta|)` per channel
pub fn software_boost_gray(gray: &GrayImage, alpha: f32, beta: f32) -> GrayImage {
    let mut out = gray.clone();
    out.as_mut()
        .par_iter_mut()
        .for_each(|px| *px = scale_abs(*px, alpha, beta));
    out
}

/// Software gain applied to an RGB buffer
pub fn software_boost_rgb(rgb: &RgbImage, alpha: f32, beta: f32) -> RgbImage {
    let mut out = rgb.clone();
    out.as_mut()
        .par_iter_mut()
        .for_each(|px| *px = scale_abs(*px, alpha, beta));
    out
}

/// Software gain applied to either kind of frame
pub fn software_boost(frame: &Frame, alpha: f32, beta: f32) -> Frame {
    match frame {
        Frame::Color(img) => Frame::Color(software_boost_rgb(img, alpha, beta)),
        Frame::Gray(img) => Frame::Gray(software_boost_gray(img, alpha, beta)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_clahe_preserves_dimensions() {
        let gray = GrayImage::from_fn(80, 60, |x, y| Luma([((x + y) % 256) as u8]));
        assert_eq!(clahe(&gray, 2.0, 8, 8).dimensions(), (80, 60));
    }

    #[test]
    fn test_clahe_uniform_stays_uniform() {
        let gray = GrayImage::from_pixel(64, 64, Luma([128]));
        let out = clahe(&gray, 2.0, 8, 8);
        let first = out.get_pixel(0, 0)[0];
        assert!(out.pixels().all(|p| p[0] == first));
    }

    #[test]
    fn test_clahe_stretches_low_contrast() {
        // Two close gray levels should be pulled apart
        let gray = GrayImage::from_fn(256, 256, |x, _| Luma([if x % 2 == 0 { 100 } else { 104 }]));
        let out = clahe(&gray, 2.0, 8, 8);
        let a = out.get_pixel(40, 40)[0] as i32;
        let b = out.get_pixel(41, 40)[0] as i32;
        assert!((a - b).abs() > 4);
    }

    #[test]
    fn test_clahe_tiny_region() {
        let gray = GrayImage::from_pixel(3, 2, Luma([50]));
        assert_eq!(clahe(&gray, 2.0, 8, 8).dimensions(), (3, 2));
    }

    #[test]
    fn test_unsharp_flat_is_identity() {
        for v in [0u8, 77, 200, 255] {
            let gray = GrayImage::from_pixel(64, 64, Luma([v]));
            let out = unsharp_mask(&gray, 2.0, 1.5, -0.5);
            assert!(out.pixels().all(|p| p[0] == v), "flat {} changed", v);
        }
    }

    #[test]
    fn test_gaussian_blur_keeps_flat_level() {
        let gray = GrayImage::from_pixel(64, 64, Luma([200]));
        let blurred = gaussian_blur(&gray, 2.0);
        assert!(blurred.iter().all(|&b| (b - 200.0).abs() < 0.01));
    }

    #[test]
    fn test_gaussian_kernel_sums_to_one() {
        let kernel = gaussian_kernel(2.0);
        assert_eq!(kernel.len(), 13);
        assert!((kernel.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_unsharp_increases_edge_contrast() {
        let gray = GrayImage::from_fn(32, 8, |x, _| Luma([if x < 16 { 60 } else { 180 }]));
        let out = unsharp_mask(&gray, 2.0, 1.5, -0.5);
        assert!(out.get_pixel(15, 4)[0] < 60);
        assert!(out.get_pixel(16, 4)[0] > 180);
    }

    #[test]
    fn test_boost_saturates() {
        let gray = GrayImage::from_pixel(2, 2, Luma([200]));
        let out = software_boost_gray(&gray, 2.0, 10.0);
        assert_eq!(out.get_pixel(0, 0)[0], 255);
        let out = software_boost_gray(&gray, 1.0, -250.0);
        assert_eq!(out.get_pixel(0, 0)[0], 50);
    }
}
