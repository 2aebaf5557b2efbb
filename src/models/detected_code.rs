use std::fmt;

use image::GrayImage;

use super::{BoundingBox, Frame, Polygon, Symbology};

/// One processed variant of a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantKind {
    /// Adaptive threshold + closing
    Binary,
    /// Unsharp-masked grayscale
    Sharpened,
    /// CLAHE on luminance
    Enhanced,
    /// Plain luminance
    Gray,
}

impl VariantKind {
    /// Lowercase name used in stage labels
    pub fn name(&self) -> &'static str {
        match self {
            VariantKind::Binary => "binary",
            VariantKind::Sharpened => "sharpened",
            VariantKind::Enhanced => "enhanced",
            VariantKind::Gray => "gray",
        }
    }
}

/// Which pipeline stage produced a code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectionStage {
    /// Re-detected on a rectified region
    Refined(VariantKind),
    /// Found by the whole-frame fallback
    FullFrame(VariantKind),
}

impl DetectionStage {
    /// The variant that yielded the winning decode
    pub fn variant(&self) -> VariantKind {
        match self {
            DetectionStage::Refined(v) | DetectionStage::FullFrame(v) => *v,
        }
    }
}

impl fmt::Display for DetectionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionStage::Refined(v) => write!(f, "refined_{}", v.name()),
            DetectionStage::FullFrame(v) => write!(f, "fullframe_{}", v.name()),
        }
    }
}

/// Region images attached to a detection, one per enhancement kind
#[derive(Debug, Clone)]
pub struct CodeImages {
    /// Rectified (or cropped) region, unprocessed
    pub original: Frame,
    /// CLAHE-enhanced luminance
    pub enhanced: GrayImage,
    /// Sharpened grayscale (plain grayscale for full-frame detections)
    pub gray: GrayImage,
    /// Binarized
    pub binary: GrayImage,
}

/// A validated, decoded symbol. Immutable after construction.
#[derive(Debug, Clone)]
pub struct DetectedCode {
    symbology: Symbology,
    text: String,
    bbox: BoundingBox,
    polygon: Polygon,
    stage: DetectionStage,
    confidence: u64,
    images: CodeImages,
}

impl DetectedCode {
    /// Assemble a detection
    pub fn new(
        symbology: Symbology,
        text: String,
        bbox: BoundingBox,
        polygon: Polygon,
        stage: DetectionStage,
        confidence: u64,
        images: CodeImages,
    ) -> Self {
        Self {
            symbology,
            text,
            bbox,
            polygon,
            stage,
            confidence,
            images,
        }
    }

    /// Symbology
    pub fn symbology(&self) -> &Symbology {
        &self.symbology
    }

    /// Decoded printable text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Bounding box in frame coordinates
    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Outline in frame coordinates
    pub fn polygon(&self) -> &Polygon {
        &self.polygon
    }

    /// Producing stage
    pub fn stage(&self) -> DetectionStage {
        self.stage
    }

    /// Bounding-box area of the winning decode
    pub fn confidence(&self) -> u64 {
        self.confidence
    }

    /// Region images
    pub fn images(&self) -> &CodeImages {
        &self.images
    }

    /// `TYPE:text`, the key used for duplicate suppression
    pub fn key(&self) -> String {
        composite_key(&self.symbology, &self.text)
    }
}

/// Composite identity of a symbol: symbology tag + decoded text
pub fn composite_key(symbology: &Symbology, text: &str) -> String {
    format!("{}:{}", symbology.tag(), text)
}
