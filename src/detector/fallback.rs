use std::collections::HashSet;

use image::GrayImage;

use super::localizer::Candidate;
use crate::decoder::{SymbolDecoder, decode_isolated};
use crate::models::frame::crop_gray;
use crate::models::{CodeImages, DetectedCode, DetectionStage, Frame, VariantKind};
use crate::preprocess::PreprocessingPipeline;

/// Whole-frame decode order
pub const FALLBACK_ORDER: [VariantKind; 3] =
    [VariantKind::Binary, VariantKind::Enhanced, VariantKind::Gray];

/// Whole-frame decode used when no region could be refined
#[derive(Debug, Clone, Default)]
pub struct FullFrameFallback {
    preprocess: PreprocessingPipeline,
}

impl FullFrameFallback {
    /// Fallback using `preprocess` for the full-frame variants
    pub fn new(preprocess: PreprocessingPipeline) -> Self {
        Self { preprocess }
    }

    /// Decode `frame` through its binary, enhanced and plain gray variants.
    ///
    /// `gray` is the frame's luminance, already computed for localization.
    /// A text accepted from one variant is not reported again by a later one.
    pub fn run<D: SymbolDecoder + ?Sized>(
        &self,
        decoder: &D,
        frame: &Frame,
        gray: &GrayImage,
    ) -> Vec<DetectedCode> {
        let (width, height) = frame.dimensions();
        let enhanced = self.preprocess.enhance(gray);
        let binary = self.preprocess.binarize(&enhanced);

        let mut seen: HashSet<String> = HashSet::new();
        let mut codes = Vec::new();

        for kind in FALLBACK_ORDER {
            let image = match kind {
                VariantKind::Binary => &binary,
                VariantKind::Enhanced => &enhanced,
                VariantKind::Gray | VariantKind::Sharpened => gray,
            };
            let variant = Frame::Gray(image.clone());

            for raw in decode_isolated(decoder, &variant) {
                let Some(candidate) = Candidate::from_raw(&raw, width, height) else {
                    continue;
                };
                if !seen.insert(candidate.text.clone()) {
                    continue;
                }
                let bbox = candidate.bbox;
                let images = CodeImages {
                    original: frame.crop(&bbox),
                    enhanced: crop_gray(&enhanced, &bbox),
                    gray: crop_gray(gray, &bbox),
                    binary: crop_gray(&binary, &bbox),
                };
                codes.push(DetectedCode::new(
                    candidate.symbology,
                    candidate.text,
                    bbox,
                    candidate.polygon,
                    DetectionStage::FullFrame(kind),
                    raw.rect.area(),
                    images,
                ));
            }
        }

        if !codes.is_empty() {
            log::debug!("full-frame fallback found {} code(s)", codes.len());
        }
        codes
    }
}
