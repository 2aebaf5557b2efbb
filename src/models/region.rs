use super::Point;

/// Axis-aligned rectangle in frame coordinates.
///
/// Always non-negative and contained in the frame it was built for; use
/// [`BoundingBox::clamped`] to build one from raw decoder output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundingBox {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Width in pixels
    pub w: u32,
    /// Height in pixels
    pub h: u32,
}

impl BoundingBox {
    /// Build a box from signed coordinates, clamped to a `frame_w` x `frame_h` frame
    pub fn clamped(x: i32, y: i32, w: i32, h: i32, frame_w: u32, frame_h: u32) -> Self {
        let fw = frame_w as i64;
        let fh = frame_h as i64;
        let x0 = (x as i64).clamp(0, fw);
        let y0 = (y as i64).clamp(0, fh);
        let x1 = (x as i64 + w.max(0) as i64).clamp(0, fw);
        let y1 = (y as i64 + h.max(0) as i64).clamp(0, fh);
        Self {
            x: x0 as u32,
            y: y0 as u32,
            w: (x1 - x0) as u32,
            h: (y1 - y0) as u32,
        }
    }

    /// Expand by `ratio` of the width/height on every side, clamped to the frame.
    ///
    /// Margins are truncated to whole pixels.
    pub fn expand(&self, ratio: f32, frame_w: u32, frame_h: u32) -> Self {
        let margin_x = (self.w as f32 * ratio) as i32;
        let margin_y = (self.h as f32 * ratio) as i32;
        Self::clamped(
            self.x as i32 - margin_x,
            self.y as i32 - margin_y,
            self.w as i32 + 2 * margin_x,
            self.h as i32 + 2 * margin_y,
            frame_w,
            frame_h,
        )
    }

    /// Area in pixels
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }

    /// True when the box covers no pixels
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }
}

/// The four corners of a detected symbol, in cyclic order.
///
/// Orientation (clockwise or not) is whatever the decoder reported.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Polygon(pub [Point; 4]);

impl Polygon {
    /// Create a polygon from four corners
    pub fn new(points: [Point; 4]) -> Self {
        Self(points)
    }

    /// Corner points
    pub fn points(&self) -> &[Point; 4] {
        &self.0
    }

    /// Shift every corner by (-origin_x, -origin_y)
    pub fn relative_to(&self, origin_x: u32, origin_y: u32) -> Self {
        let dx = -(origin_x as f32);
        let dy = -(origin_y as f32);
        Self(self.0.map(|p| p.translate(dx, dy)))
    }

    /// Longer of the two "horizontal" edges (p0-p1, p2-p3)
    pub fn max_horizontal_edge(&self) -> f32 {
        let [p0, p1, p2, p3] = &self.0;
        p0.distance(p1).max(p2.distance(p3))
    }

    /// Longer of the two "vertical" edges (p1-p2, p3-p0)
    pub fn max_vertical_edge(&self) -> f32 {
        let [p0, p1, p2, p3] = &self.0;
        p1.distance(p2).max(p3.distance(p0))
    }

    /// Absolute shoelace area
    pub fn area(&self) -> f32 {
        let mut twice = 0.0f32;
        for i in 0..4 {
            let a = &self.0[i];
            let b = &self.0[(i + 1) % 4];
            twice += a.x * b.y - b.x * a.y;
        }
        twice.abs() / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped_box_stays_in_frame() {
        let b = BoundingBox::clamped(-10, 5, 50, 200, 30, 100);
        assert_eq!(b, BoundingBox { x: 0, y: 5, w: 30, h: 95 });
    }

    #[test]
    fn test_clamped_negative_size() {
        let b = BoundingBox::clamped(10, 10, -5, -5, 100, 100);
        assert!(b.is_empty());
    }

    #[test]
    fn test_expand_twenty_percent() {
        let b = BoundingBox { x: 100, y: 100, w: 50, h: 20 };
        let e = b.expand(0.2, 640, 480);
        assert_eq!(e, BoundingBox { x: 90, y: 96, w: 70, h: 28 });
    }

    #[test]
    fn test_expand_clamps_at_edges() {
        let b = BoundingBox { x: 2, y: 1, w: 50, h: 20 };
        let e = b.expand(0.2, 55, 22);
        assert_eq!(e.x, 0);
        assert_eq!(e.y, 0);
        assert_eq!(e.x + e.w, 55);
        assert_eq!(e.y + e.h, 22);
    }

    #[test]
    fn test_polygon_edges() {
        let poly = Polygon::new([
            Point::new(0.0, 0.0),
            Point::new(40.0, 0.0),
            Point::new(40.0, 10.0),
            Point::new(0.0, 12.0),
        ]);
        // bottom edge (40,10)-(0,12) is slightly longer than the top one
        assert!((poly.max_horizontal_edge() - 1604f32.sqrt()).abs() < 1e-3);
        assert!((poly.max_vertical_edge() - 12.0).abs() < 1e-3);
    }

    #[test]
    fn test_polygon_area_and_relative() {
        let poly = Polygon::new([
            Point::new(10.0, 10.0),
            Point::new(20.0, 10.0),
            Point::new(20.0, 20.0),
            Point::new(10.0, 20.0),
        ]);
        assert!((poly.area() - 100.0).abs() < 1e-3);
        let local = poly.relative_to(10, 10);
        assert_eq!(local.points()[0], Point::new(0.0, 0.0));
        assert_eq!(local.points()[2], Point::new(10.0, 10.0));
    }
}
