//! Geometry utilities for perspective transformations and warping

use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::models::{Frame, Point};

/// Perspective transformation matrix (3x3, a33 = 1)
#[derive(Debug, Clone, Copy)]
pub struct PerspectiveTransform {
    a11: f64,
    a12: f64,
    a13: f64,
    a21: f64,
    a22: f64,
    a23: f64,
    a31: f64,
    a32: f64,
    a33: f64,
}

impl PerspectiveTransform {
    /// Create transform from 4 source points to 4 destination points
    ///
    /// Returns `None` when the point configuration is degenerate (the
    /// 8x8 system is singular) or any coordinate is not finite.
    pub fn from_points(src: &[Point; 4], dst: &[Point; 4]) -> Option<Self> {
        if src.iter().chain(dst.iter()).any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return None;
        }

        // Direct linear transform
        let mut a = [[0.0f64; 8]; 8];
        let mut b = [0.0f64; 8];

        for i in 0..4 {
            let (sx, sy) = (src[i].x as f64, src[i].y as f64);
            let (dx, dy) = (dst[i].x as f64, dst[i].y as f64);

            let row = i * 2;
            a[row] = [sx, sy, 1.0, 0.0, 0.0, 0.0, -dx * sx, -dx * sy];
            b[row] = dx;
            a[row + 1] = [0.0, 0.0, 0.0, sx, sy, 1.0, -dy * sx, -dy * sy];
            b[row + 1] = dy;
        }

        solve_linear_system(&a, &b).map(|s| Self {
            a11: s[0],
            a12: s[1],
            a13: s[2],
            a21: s[3],
            a22: s[4],
            a23: s[5],
            a31: s[6],
            a32: s[7],
            a33: 1.0,
        })
    }

    /// Transform a point; `None` if it maps to infinity
    pub fn transform(&self, p: &Point) -> Option<Point> {
        let (x, y) = (p.x as f64, p.y as f64);
        let (tx, ty) = self.apply(x, y)?;
        Some(Point::new(tx as f32, ty as f32))
    }

    #[inline]
    fn apply(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let denominator = self.a31 * x + self.a32 * y + self.a33;
        if denominator.abs() < 1e-12 {
            return None;
        }
        let x_new = (self.a11 * x + self.a12 * y + self.a13) / denominator;
        let y_new = (self.a21 * x + self.a22 * y + self.a23) / denominator;
        Some((x_new, y_new))
    }
}

/// Solve 8x8 linear system using Gaussian elimination with partial pivoting
#[allow(clippy::needless_range_loop)]
fn solve_linear_system(a: &[[f64; 8]; 8], b: &[f64; 8]) -> Option<[f64; 8]> {
    let mut a = *a;
    let mut b = *b;
    let n = 8;

    // Forward elimination
    for i in 0..n {
        let mut max_val = a[i][i].abs();
        let mut max_row = i;
        for k in (i + 1)..n {
            if a[k][i].abs() > max_val {
                max_val = a[k][i].abs();
                max_row = k;
            }
        }

        // Singular matrix
        if max_val < 1e-10 {
            return None;
        }

        if max_row != i {
            a.swap(i, max_row);
            b.swap(i, max_row);
        }

        for k in (i + 1)..n {
            let factor = a[k][i] / a[i][i];
            b[k] -= factor * b[i];
            for j in i..n {
                a[k][j] -= factor * a[i][j];
            }
        }
    }

    // Back substitution
    let mut x = [0.0f64; 8];
    for i in (0..n).rev() {
        let mut sum = b[i];
        for j in (i + 1)..n {
            sum -= a[i][j] * x[j];
        }
        if a[i][i].abs() < 1e-10 {
            return None;
        }
        x[i] = sum / a[i][i];
    }

    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}

/// Warp `src` into a `width` x `height` image.
///
/// `dst_to_src` maps output pixel coordinates back into the source; samples
/// are bilinear, and anything falling outside the source is black.
pub fn warp_perspective(
    src: &Frame,
    dst_to_src: &PerspectiveTransform,
    width: u32,
    height: u32,
) -> Frame {
    match src {
        Frame::Color(img) => {
            let mut out = RgbImage::new(width, height);
            for (x, y, px) in out.enumerate_pixels_mut() {
                if let Some((sx, sy)) = dst_to_src.apply(x as f64, y as f64) {
                    *px = Rgb(sample_bilinear::<3>(img.as_raw(), img.width(), img.height(), sx, sy));
                }
            }
            Frame::Color(out)
        }
        Frame::Gray(img) => {
            let mut out = GrayImage::new(width, height);
            for (x, y, px) in out.enumerate_pixels_mut() {
                if let Some((sx, sy)) = dst_to_src.apply(x as f64, y as f64) {
                    *px = Luma(sample_bilinear::<1>(img.as_raw(), img.width(), img.height(), sx, sy));
                }
            }
            Frame::Gray(out)
        }
    }
}

fn sample_bilinear<const C: usize>(raw: &[u8], width: u32, height: u32, x: f64, y: f64) -> [u8; C] {
    let mut out = [0u8; C];
    let (w, h) = (width as i64, height as i64);
    if !x.is_finite() || !y.is_finite() || w == 0 || h == 0 {
        return out;
    }
    if x < -1.0 || y < -1.0 || x > w as f64 || y > h as f64 {
        return out;
    }

    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let fetch = |xx: i64, yy: i64, c: usize| -> f64 {
        if xx < 0 || yy < 0 || xx >= w || yy >= h {
            0.0
        } else {
            raw[((yy * w + xx) as usize) * C + c] as f64
        }
    };

    for (c, value) in out.iter_mut().enumerate() {
        let top = fetch(x0, y0, c) * (1.0 - fx) + fetch(x0 + 1, y0, c) * fx;
        let bottom = fetch(x0, y0 + 1, c) * (1.0 - fx) + fetch(x0 + 1, y0 + 1, c) * fx;
        *value = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    out
}
