//! Adaptive thresholding and morphological cleanup

use image::GrayImage;
use imageproc::distance_transform::Norm;
use imageproc::morphology;
use rayon::prelude::*;

/// Summed-area table with one row/column of zero padding
fn integral_image(gray: &GrayImage) -> Vec<u64> {
    let (width, height) = gray.dimensions();
    let (w, h) = (width as usize, height as usize);
    let stride = w + 1;
    let mut integral = vec![0u64; stride * (h + 1)];
    let src = gray.as_raw();

    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += src[y * w + x] as u64;
            integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row_sum;
        }
    }

    integral
}

/// Adaptive threshold by local mean.
///
/// A pixel becomes white (255) when it is brighter than the mean of the
/// `block_size` x `block_size` neighbourhood minus `c`, black (0) otherwise.
/// Near the borders the mean is taken over the part of the block inside the
/// image. Even block sizes are bumped to the next odd value.
pub fn adaptive_mean_threshold(gray: &GrayImage, block_size: u32, c: i32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let (w, h) = (width as usize, height as usize);
    if w == 0 || h == 0 {
        return GrayImage::new(width, height);
    }

    let block = (block_size.max(3) | 1) as usize;
    let radius = block / 2;
    let stride = w + 1;
    let integral = integral_image(gray);
    let src = gray.as_raw();
    let mut out = vec![0u8; w * h];

    out.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        let y0 = y.saturating_sub(radius);
        let y1 = (y + radius + 1).min(h);
        for (x, px) in row.iter_mut().enumerate() {
            let x0 = x.saturating_sub(radius);
            let x1 = (x + radius + 1).min(w);
            let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
                - integral[y0 * stride + x1]
                - integral[y1 * stride + x0];
            let count = ((x1 - x0) * (y1 - y0)) as f64;
            let threshold = sum as f64 / count - c as f64;
            *px = if src[y * w + x] as f64 > threshold { 255 } else { 0 };
        }
    });

    GrayImage::from_raw(width, height, out).unwrap_or_else(|| GrayImage::new(width, height))
}

/// One morphological closing pass with a 3x3 square structuring element.
///
/// Closes small black gaps inside white areas, merging broken strokes.
pub fn close_3x3(binary: &GrayImage) -> GrayImage {
    morphology::close(binary, Norm::LInf, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_uniform_image_is_white() {
        // Every pixel equals its local mean, so with c > 0 it passes the threshold
        let gray = GrayImage::from_pixel(20, 20, Luma([90]));
        let binary = adaptive_mean_threshold(&gray, 11, 2);
        assert!(binary.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_dark_stroke_on_light_background() {
        let mut gray = GrayImage::from_pixel(30, 30, Luma([220]));
        for y in 0..30 {
            for x in 14..17 {
                gray.put_pixel(x, y, Luma([20]));
            }
        }
        let binary = adaptive_mean_threshold(&gray, 11, 2);
        assert_eq!(binary.get_pixel(15, 15)[0], 0);
        assert_eq!(binary.get_pixel(2, 15)[0], 255);
    }

    #[test]
    fn test_close_fills_single_pixel_gap() {
        let mut binary = GrayImage::from_pixel(9, 9, Luma([255]));
        binary.put_pixel(4, 4, Luma([0]));
        let closed = close_3x3(&binary);
        assert_eq!(closed.get_pixel(4, 4)[0], 255);
    }

    #[test]
    fn test_empty_image() {
        let gray = GrayImage::new(0, 0);
        assert_eq!(adaptive_mean_threshold(&gray, 11, 2).dimensions(), (0, 0));
    }
}
