//! Utility functions for image processing
//!
//! This module provides the pixel kernels used by the detection pipeline:
//! - Grayscale conversion (RGB to luminance)
//! - Binarization (adaptive mean threshold, morphological closing)
//! - Enhancement (CLAHE, unsharp mask, software boost)
//! - Geometry (perspective transforms and warping)

pub mod binarization;
pub mod enhance;
pub mod geometry;
pub mod grayscale;
