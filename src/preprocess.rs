//! Region preprocessing: enhancement and binarization variants
//!
//! Every variant is a pure function of the input image and
//! [`PreprocessParams`]; nothing is cached between calls.

use image::GrayImage;

use crate::models::Frame;
use crate::utils::binarization::{adaptive_mean_threshold, close_3x3};
use crate::utils::enhance::{clahe, unsharp_mask};

/// Tunable constants of the preprocessing stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessParams {
    /// CLAHE clip limit, relative to the mean histogram bin height
    pub clahe_clip_limit: f32,
    /// CLAHE tile grid (columns, rows)
    pub clahe_tiles: (u32, u32),
    /// Adaptive threshold neighbourhood size (odd)
    pub threshold_block_size: u32,
    /// Constant subtracted from the local mean
    pub threshold_c: i32,
    /// Gaussian sigma used by the unsharp mask
    pub blur_sigma: f32,
    /// Weight of the original image in the unsharp mask
    pub sharpen_weight_original: f32,
    /// Weight of the blurred image in the unsharp mask
    pub sharpen_weight_blur: f32,
}

impl Default for PreprocessParams {
    fn default() -> Self {
        Self {
            clahe_clip_limit: 2.0,
            clahe_tiles: (8, 8),
            threshold_block_size: 11,
            threshold_c: 2,
            blur_sigma: 2.0,
            sharpen_weight_original: 1.5,
            sharpen_weight_blur: -0.5,
        }
    }
}

/// All variants produced for one image
#[derive(Debug, Clone)]
pub struct Variants {
    /// Plain luminance
    pub gray: GrayImage,
    /// CLAHE on luminance
    pub enhanced: GrayImage,
    /// Adaptive mean threshold of `enhanced`, closed with a 3x3 kernel
    pub binary: GrayImage,
    /// Unsharp mask of `enhanced`
    pub sharpened: GrayImage,
}

/// Deterministic preprocessing pipeline
#[derive(Debug, Clone, Default)]
pub struct PreprocessingPipeline {
    params: PreprocessParams,
}

impl PreprocessingPipeline {
    /// Pipeline using `params`
    pub fn new(params: PreprocessParams) -> Self {
        Self { params }
    }

    /// Constants in use
    pub fn params(&self) -> &PreprocessParams {
        &self.params
    }

    /// Luminance of a color frame, or the frame itself when already gray
    pub fn gray(&self, image: &Frame) -> GrayImage {
        image.to_gray()
    }

    /// Contrast-limited equalization applied to the luminance channel only
    pub fn enhance(&self, gray: &GrayImage) -> GrayImage {
        let (tx, ty) = self.params.clahe_tiles;
        clahe(gray, self.params.clahe_clip_limit, tx, ty)
    }

    /// Local-mean threshold followed by one closing pass
    pub fn binarize(&self, gray: &GrayImage) -> GrayImage {
        let binary = adaptive_mean_threshold(
            gray,
            self.params.threshold_block_size,
            self.params.threshold_c,
        );
        close_3x3(&binary)
    }

    /// `w_orig * gray + w_blur * gaussian(gray)`
    pub fn sharpen(&self, gray: &GrayImage) -> GrayImage {
        unsharp_mask(
            gray,
            self.params.blur_sigma,
            self.params.sharpen_weight_original,
            self.params.sharpen_weight_blur,
        )
    }

    /// Produce every variant. Binary and sharpened are derived from the
    /// enhanced image, so a region is equalized once.
    pub fn run(&self, image: &Frame) -> Variants {
        let gray = self.gray(image);
        let enhanced = self.enhance(&gray);
        let binary = self.binarize(&enhanced);
        let sharpened = self.sharpen(&enhanced);
        Variants {
            gray,
            enhanced,
            binary,
            sharpened,
        }
    }
}
