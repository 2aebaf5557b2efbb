//! Processed-frame rendering

use std::time::Duration;

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use crate::models::{BoundingBox, DetectedCode, Frame, Polygon};

const CODE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BAR_COLOR: Rgb<u8> = Rgb([205, 90, 106]);
const BAR_BACKGROUND: Rgb<u8> = Rgb([40, 40, 40]);
const BOX_THICKNESS: i32 = 3;
const BAR_HEIGHT: u32 = 8;
const BAR_MARGIN: u32 = 10;

/// Progress of a running inspection, drawn as two bars
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InspectionOverlay {
    /// Unique codes so far
    pub detected: u32,
    /// Codes the session expects
    pub expected: u32,
    /// Time since start
    pub elapsed: Duration,
    /// Session timeout
    pub timeout: Duration,
}

/// Color copy of `frame` with every code outlined and, if given, the
/// inspection progress along the top edge
pub fn annotate(frame: &Frame, codes: &[DetectedCode], overlay: Option<&InspectionOverlay>) -> RgbImage {
    let mut img = frame.to_rgb();
    for code in codes {
        draw_box(&mut img, code.bbox());
        draw_polygon(&mut img, code.polygon());
    }
    if let Some(overlay) = overlay {
        let progress = if overlay.expected == 0 {
            0.0
        } else {
            overlay.detected as f32 / overlay.expected as f32
        };
        let time = if overlay.timeout.is_zero() {
            1.0
        } else {
            overlay.elapsed.as_secs_f32() / overlay.timeout.as_secs_f32()
        };
        draw_bar(&mut img, BAR_MARGIN, progress);
        draw_bar(&mut img, BAR_MARGIN * 2 + BAR_HEIGHT, time);
    }
    img
}

fn draw_box(img: &mut RgbImage, bbox: &BoundingBox) {
    if bbox.is_empty() {
        return;
    }
    for t in 0..BOX_THICKNESS {
        let w = bbox.w + 2 * t as u32;
        let h = bbox.h + 2 * t as u32;
        let rect = Rect::at(bbox.x as i32 - t, bbox.y as i32 - t).of_size(w, h);
        draw_hollow_rect_mut(img, rect, CODE_COLOR);
    }
}

fn draw_polygon(img: &mut RgbImage, polygon: &Polygon) {
    let points = polygon.points();
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        if [a.x, a.y, b.x, b.y].iter().all(|v| v.is_finite()) {
            draw_line_segment_mut(img, (a.x, a.y), (b.x, b.y), CODE_COLOR);
        }
    }
}

fn draw_bar(img: &mut RgbImage, top: u32, fraction: f32) {
    let (width, height) = img.dimensions();
    if width <= 2 * BAR_MARGIN || top + BAR_HEIGHT > height {
        return;
    }
    let full = width - 2 * BAR_MARGIN;
    let background = Rect::at(BAR_MARGIN as i32, top as i32).of_size(full, BAR_HEIGHT);
    draw_filled_rect_mut(img, background, BAR_BACKGROUND);

    let filled = (full as f32 * fraction.clamp(0.0, 1.0)).round() as u32;
    if filled > 0 {
        let bar = Rect::at(BAR_MARGIN as i32, top as i32).of_size(filled, BAR_HEIGHT);
        draw_filled_rect_mut(img, bar, BAR_COLOR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;

    use crate::models::{CodeImages, DetectionStage, Point, Symbology, VariantKind};

    fn code(bbox: BoundingBox) -> DetectedCode {
        let polygon = Polygon::new([
            Point::new(bbox.x as f32, bbox.y as f32),
            Point::new((bbox.x + bbox.w) as f32, bbox.y as f32),
            Point::new((bbox.x + bbox.w) as f32, (bbox.y + bbox.h) as f32),
            Point::new(bbox.x as f32, (bbox.y + bbox.h) as f32),
        ]);
        DetectedCode::new(
            Symbology::Qr,
            "BOX-1".into(),
            bbox,
            polygon,
            DetectionStage::Refined(VariantKind::Binary),
            1,
            CodeImages {
                original: Frame::Gray(GrayImage::new(1, 1)),
                enhanced: GrayImage::new(1, 1),
                gray: GrayImage::new(1, 1),
                binary: GrayImage::new(1, 1),
            },
        )
    }

    #[test]
    fn test_box_is_three_pixels_thick() {
        let frame = Frame::Gray(GrayImage::new(100, 100));
        let img = annotate(&frame, &[code(BoundingBox { x: 40, y: 40, w: 20, h: 20 })], None);
        for x in [38, 39, 40] {
            assert_eq!(*img.get_pixel(x, 50), CODE_COLOR);
        }
        assert_eq!(*img.get_pixel(37, 50), Rgb([0, 0, 0]));
        assert_eq!(*img.get_pixel(50, 50), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_progress_bars() {
        let frame = Frame::Gray(GrayImage::new(120, 60));
        let overlay = InspectionOverlay {
            detected: 1,
            expected: 2,
            elapsed: Duration::from_secs(0),
            timeout: Duration::from_secs(10),
        };
        let img = annotate(&frame, &[], Some(&overlay));
        // half of the 100px bar is filled
        assert_eq!(*img.get_pixel(BAR_MARGIN + 10, BAR_MARGIN + 1), BAR_COLOR);
        assert_eq!(*img.get_pixel(BAR_MARGIN + 80, BAR_MARGIN + 1), BAR_BACKGROUND);
        // time bar empty at t=0
        assert_eq!(*img.get_pixel(BAR_MARGIN + 1, 2 * BAR_MARGIN + BAR_HEIGHT + 1), BAR_BACKGROUND);
    }

    #[test]
    fn test_box_at_edge_does_not_panic() {
        let frame = Frame::Gray(GrayImage::new(30, 30));
        let img = annotate(&frame, &[code(BoundingBox { x: 0, y: 0, w: 30, h: 30 })], None);
        assert_eq!(*img.get_pixel(0, 15), CODE_COLOR);
    }
}
