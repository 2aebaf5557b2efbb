//! Core data structures

/// Decoded, validated codes and their provenance
pub mod detected_code;
/// Color or grayscale image buffers
pub mod frame;
/// 2D points
pub mod point;
/// Bounding boxes and quadrilaterals
pub mod region;
/// Code encoding families
pub mod symbology;

pub use detected_code::{CodeImages, DetectedCode, DetectionStage, VariantKind, composite_key};
pub use frame::Frame;
pub use point::Point;
pub use region::{BoundingBox, Polygon};
pub use symbology::Symbology;
