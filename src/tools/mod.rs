//! Helpers shared by the CLI, benches and integration tests

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use image::{GenericImageView, GrayImage};

use crate::models::{Frame, Point};

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

fn max_dim_from_env() -> Option<u32> {
    match env::var("INSPECT_MAX_DIM") {
        Ok(value) => match value.trim().parse::<u32>() {
            Ok(0) => None,
            Ok(v) => Some(v),
            Err(_) => None,
        },
        Err(_) => None,
    }
}

/// Load an image file as a color frame.
///
/// Images larger than `INSPECT_MAX_DIM` on either side are downscaled.
pub fn load_frame<P: AsRef<Path>>(path: P) -> Result<Frame, image::ImageError> {
    let img = image::open(path)?;
    let rgb = match max_dim_from_env() {
        Some(max_dim) if img.dimensions().0.max(img.dimensions().1) > max_dim => img
            .resize(max_dim, max_dim, image::imageops::FilterType::Triangle)
            .to_rgb8(),
        _ => img.to_rgb8(),
    };
    Ok(Frame::Color(rgb))
}

/// Summary statistics for grayscale data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrayStats {
    /// Darkest value
    pub min: u8,
    /// Brightest value
    pub max: u8,
    /// Mean value, truncated
    pub avg: u8,
}

/// Share of foreground (black) pixels in a binary image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryStats {
    /// Pixels equal to 0
    pub black_pixels: usize,
    /// All pixels
    pub total_pixels: usize,
    /// `black_pixels / total_pixels`
    pub black_ratio: f64,
}

/// Compute min/max/avg for grayscale values.
pub fn grayscale_stats(gray: &GrayImage) -> GrayStats {
    let raw = gray.as_raw();
    let mut min = u8::MAX;
    let mut max = u8::MIN;
    let mut sum: u64 = 0;
    for &v in raw {
        min = min.min(v);
        max = max.max(v);
        sum += v as u64;
    }
    if raw.is_empty() {
        return GrayStats { min: 0, max: 0, avg: 0 };
    }
    GrayStats {
        min,
        max,
        avg: (sum / raw.len() as u64) as u8,
    }
}

/// Count black pixels of a 0/255 image.
pub fn binary_stats(binary: &GrayImage) -> BinaryStats {
    let total = binary.as_raw().len();
    let black = binary.as_raw().iter().filter(|&&v| v == 0).count();
    let ratio = if total == 0 {
        0.0
    } else {
        black as f64 / total as f64
    };
    BinaryStats {
        black_pixels: black,
        total_pixels: total,
        black_ratio: ratio,
    }
}

/// Default dataset root for benches (`INSPECT_DATASET_ROOT`).
pub fn dataset_root_from_env() -> PathBuf {
    env::var("INSPECT_DATASET_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("benches/images"))
}

/// Bench sample limit (`INSPECT_BENCH_LIMIT`); `None` means everything.
pub fn bench_limit_from_env() -> Option<usize> {
    match env::var("INSPECT_BENCH_LIMIT") {
        Ok(value) => value
            .parse::<usize>()
            .ok()
            .and_then(|v| if v == 0 { None } else { Some(v) }),
        Err(_) => None,
    }
}

/// True for file names with a supported image extension
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Image files directly inside `dir`, sorted by path.
pub fn list_images(dir: &Path) -> Vec<PathBuf> {
    let mut images: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_image_path(path))
            .collect(),
        Err(_) => Vec::new(),
    };
    images.sort();
    images
}

/// Recursively collect image paths under `root`, sorted, with an optional limit.
pub fn dataset_iter<P: AsRef<Path>>(root: P, limit: Option<usize>) -> impl Iterator<Item = PathBuf> {
    let mut stack = vec![root.as_ref().to_path_buf()];
    let mut images = Vec::new();

    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if is_image_path(&path) {
                images.push(path);
            }
        }
    }

    images.sort();
    if let Some(limit) = limit {
        images.truncate(limit);
    }
    images.into_iter()
}

/// Parse `x0,y0,x1,y1,x2,y2,x3,y3` into four corners
pub fn parse_points(text: &str) -> Option<[Point; 4]> {
    let values: Vec<f32> = text
        .split(',')
        .map(|v| v.trim().parse::<f32>())
        .collect::<Result<_, _>>()
        .ok()?;
    if values.len() != 8 || values.iter().any(|v| !v.is_finite()) {
        return None;
    }
    Some([
        Point::new(values[0], values[1]),
        Point::new(values[2], values[3]),
        Point::new(values[4], values[5]),
        Point::new(values[6], values[7]),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEMP_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> PathBuf {
        let sequence = TEMP_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = env::temp_dir().join(format!(
            "code_inspect_tools_{}_{sequence}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&path);
        fs::create_dir_all(&path).expect("failed to create temp dir");
        path
    }

    #[test]
    fn list_images_filters_and_sorts() {
        let dir = temp_dir();
        for name in ["b.PNG", "a.jpg", "notes.txt", "c.bmp"] {
            fs::write(dir.join(name), b"x").unwrap();
        }
        fs::create_dir_all(dir.join("nested.png")).unwrap();
        let names: Vec<String> = list_images(&dir)
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.PNG", "c.bmp"]);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn stats_on_small_images() {
        let gray = GrayImage::from_fn(4, 1, |x, _| Luma([(x * 60) as u8]));
        assert_eq!(grayscale_stats(&gray), GrayStats { min: 0, max: 180, avg: 90 });

        let binary = GrayImage::from_fn(4, 1, |x, _| Luma([if x < 1 { 0 } else { 255 }]));
        let stats = binary_stats(&binary);
        assert_eq!(stats.black_pixels, 1);
        assert!((stats.black_ratio - 0.25).abs() < 1e-9);
    }

    #[test]
    fn parse_points_requires_eight_values() {
        let pts = parse_points("0,0, 10,0, 10,5, 0,5").unwrap();
        assert_eq!(pts[2], Point::new(10.0, 5.0));
        assert!(parse_points("0,0,1,1").is_none());
        assert!(parse_points("a,0,1,1,2,2,3,3").is_none());
    }
}
