use image::{GrayImage, RgbImage, imageops};

use super::BoundingBox;
use crate::utils::grayscale::{gray_to_rgb, rgb_to_grayscale};

/// A captured (or derived) image, color or grayscale.
///
/// Frames are never mutated after capture; crops produce new owned buffers.
#[derive(Debug, Clone)]
pub enum Frame {
    /// 8-bit RGB
    Color(RgbImage),
    /// 8-bit luminance
    Gray(GrayImage),
}

impl Frame {
    /// Frame width
    pub fn width(&self) -> u32 {
        match self {
            Frame::Color(img) => img.width(),
            Frame::Gray(img) => img.width(),
        }
    }

    /// Frame height
    pub fn height(&self) -> u32 {
        match self {
            Frame::Color(img) => img.height(),
            Frame::Gray(img) => img.height(),
        }
    }

    /// (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// True when the frame has no pixels
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// True for color frames
    pub fn is_color(&self) -> bool {
        matches!(self, Frame::Color(_))
    }

    /// Luminance view of the frame (copies gray frames)
    pub fn to_gray(&self) -> GrayImage {
        match self {
            Frame::Color(img) => rgb_to_grayscale(img),
            Frame::Gray(img) => img.clone(),
        }
    }

    /// RGB view of the frame (gray is replicated into all channels)
    pub fn to_rgb(&self) -> RgbImage {
        match self {
            Frame::Color(img) => img.clone(),
            Frame::Gray(img) => gray_to_rgb(img),
        }
    }

    /// Copy the pixels under `bbox`; the box is clamped to this frame first
    pub fn crop(&self, bbox: &BoundingBox) -> Frame {
        let (w, h) = self.dimensions();
        let b = BoundingBox::clamped(
            bbox.x as i32,
            bbox.y as i32,
            bbox.w as i32,
            bbox.h as i32,
            w,
            h,
        );
        match self {
            Frame::Color(img) => {
                Frame::Color(imageops::crop_imm(img, b.x, b.y, b.w, b.h).to_image())
            }
            Frame::Gray(img) => Frame::Gray(imageops::crop_imm(img, b.x, b.y, b.w, b.h).to_image()),
        }
    }
}

impl From<RgbImage> for Frame {
    fn from(img: RgbImage) -> Self {
        Frame::Color(img)
    }
}

impl From<GrayImage> for Frame {
    fn from(img: GrayImage) -> Self {
        Frame::Gray(img)
    }
}

/// Crop a grayscale buffer, clamping the box to its bounds
pub fn crop_gray(img: &GrayImage, bbox: &BoundingBox) -> GrayImage {
    let b = BoundingBox::clamped(
        bbox.x as i32,
        bbox.y as i32,
        bbox.w as i32,
        bbox.h as i32,
        img.width(),
        img.height(),
    );
    imageops::crop_imm(img, b.x, b.y, b.w, b.h).to_image()
}
