use crate::models::{BoundingBox, Frame, Point, Polygon};
use crate::utils::geometry::{PerspectiveTransform, warp_perspective};

/// Margin added on every side of a region before cropping
pub const REGION_MARGIN: f32 = 0.2;
/// Smallest rectified width
pub const MIN_RECTIFIED_WIDTH: u32 = 100;
/// Smallest rectified height
pub const MIN_RECTIFIED_HEIGHT: u32 = 50;
/// Largest rectified size, as a multiple of the crop size
pub const MAX_UPSCALE: u32 = 4;

/// Output of [`RegionRectifier::rectify`]
#[derive(Debug, Clone)]
pub struct RectifiedRegion {
    /// Warped image, or the plain crop if the transform failed
    pub image: Frame,
    /// Crop rectangle in frame coordinates
    pub crop: BoundingBox,
    /// Whether a perspective warp was applied
    pub warped: bool,
}

/// Turns a detected quadrilateral into a fronto-parallel image
#[derive(Debug, Clone, Copy)]
pub struct RegionRectifier {
    margin: f32,
    min_width: u32,
    min_height: u32,
}

impl Default for RegionRectifier {
    fn default() -> Self {
        Self {
            margin: REGION_MARGIN,
            min_width: MIN_RECTIFIED_WIDTH,
            min_height: MIN_RECTIFIED_HEIGHT,
        }
    }
}

impl RegionRectifier {
    /// Target size: longest horizontal and vertical polygon edges, floored
    pub fn target_size(&self, polygon: &Polygon) -> (u32, u32) {
        let w = polygon.max_horizontal_edge();
        let h = polygon.max_vertical_edge();
        // NaN casts to 0 and is floored like any short edge
        let w = (w as u32).max(self.min_width);
        let h = (h as u32).max(self.min_height);
        (w, h)
    }

    /// Crop `bbox` (plus margin) out of `frame` and warp `polygon` to a rectangle.
    ///
    /// Returns `None` only when the crop itself is empty; a degenerate polygon
    /// falls back to the unwarped crop.
    pub fn rectify(
        &self,
        frame: &Frame,
        bbox: &BoundingBox,
        polygon: &Polygon,
    ) -> Option<RectifiedRegion> {
        let (frame_w, frame_h) = frame.dimensions();
        let crop = bbox.expand(self.margin, frame_w, frame_h);
        if crop.is_empty() {
            return None;
        }
        let roi = frame.crop(&crop);
        if roi.is_empty() {
            return None;
        }

        let local = polygon.relative_to(crop.x, crop.y);
        let plain = |reason: &str| {
            log::debug!(
                "{} polygon {:?}, using plain {}x{} crop",
                reason,
                local.points(),
                crop.w,
                crop.h
            );
            Some(RectifiedRegion {
                image: roi.clone(),
                crop,
                warped: false,
            })
        };

        if !fits_crop(&local, &crop) {
            return plain("out-of-region");
        }
        let (w, h) = self.target_size(&local);
        let max_w = (crop.w * MAX_UPSCALE).max(self.min_width);
        let max_h = (crop.h * MAX_UPSCALE).max(self.min_height);
        if w > max_w || h > max_h {
            return plain("oversized");
        }

        let (wf, hf) = ((w - 1) as f32, (h - 1) as f32);
        let corners = [
            Point::new(0.0, 0.0),
            Point::new(wf, 0.0),
            Point::new(wf, hf),
            Point::new(0.0, hf),
        ];

        // Inverse mapping: output pixel -> crop pixel
        match PerspectiveTransform::from_points(&corners, local.points()) {
            Some(transform) => Some(RectifiedRegion {
                image: warp_perspective(&roi, &transform, w, h),
                crop,
                warped: true,
            }),
            None => plain("degenerate"),
        }
    }
}

/// Every corner finite and no more than one crop size outside the crop
fn fits_crop(local: &Polygon, crop: &BoundingBox) -> bool {
    let (cw, ch) = (crop.w as f32, crop.h as f32);
    local.points().iter().all(|p| {
        p.x.is_finite()
            && p.y.is_finite()
            && p.x >= -cw
            && p.x <= 2.0 * cw
            && p.y >= -ch
            && p.y <= 2.0 * ch
    })
}
