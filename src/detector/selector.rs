use super::localizer::{Candidate, MIN_TEXT_LEN};
use super::rectifier::RectifiedRegion;
use crate::decoder::{SymbolDecoder, decode_isolated};
use crate::models::{CodeImages, DetectedCode, DetectionStage, Frame, Symbology, VariantKind};
use crate::preprocess::PreprocessingPipeline;

/// Re-decode order for rectified regions
pub const REFINE_ORDER: [VariantKind; 3] =
    [VariantKind::Binary, VariantKind::Sharpened, VariantKind::Enhanced];

/// Picks the highest-confidence decode of a rectified region
#[derive(Debug, Clone, Default)]
pub struct ConfidenceSelector {
    preprocess: PreprocessingPipeline,
}

struct Best {
    symbology: Symbology,
    text: String,
    variant: VariantKind,
    confidence: u64,
}

impl ConfidenceSelector {
    /// Selector using `preprocess` for the region variants
    pub fn new(preprocess: PreprocessingPipeline) -> Self {
        Self { preprocess }
    }

    /// Try every variant of `region` and keep the result with the largest
    /// decoded area. Ties keep the earlier variant.
    ///
    /// The winner inherits the candidate's frame-space box and polygon.
    pub fn select<D: SymbolDecoder + ?Sized>(
        &self,
        decoder: &D,
        candidate: &Candidate,
        region: RectifiedRegion,
    ) -> Option<DetectedCode> {
        let variants = self.preprocess.run(&region.image);
        let mut best: Option<Best> = None;

        for kind in REFINE_ORDER {
            let image = match kind {
                VariantKind::Binary => &variants.binary,
                VariantKind::Sharpened => &variants.sharpened,
                VariantKind::Enhanced => &variants.enhanced,
                VariantKind::Gray => &variants.gray,
            };
            let frame = Frame::Gray(image.clone());

            for raw in decode_isolated(decoder, &frame) {
                let text = raw.text();
                if text.chars().count() < MIN_TEXT_LEN {
                    continue;
                }
                let confidence = raw.rect.area();
                let best_so_far = best.as_ref().map_or(0, |b| b.confidence);
                if confidence > best_so_far {
                    best = Some(Best {
                        symbology: Symbology::from_tag(&raw.symbology),
                        text,
                        variant: kind,
                        confidence,
                    });
                }
            }
        }

        let Some(best) = best else {
            log::debug!(
                "no variant decoded region {:?} ({} {:?})",
                candidate.bbox,
                candidate.symbology,
                candidate.text
            );
            return None;
        };

        let images = CodeImages {
            original: region.image,
            enhanced: variants.enhanced,
            gray: variants.sharpened,
            binary: variants.binary,
        };
        Some(DetectedCode::new(
            best.symbology,
            best.text,
            candidate.bbox,
            candidate.polygon,
            DetectionStage::Refined(best.variant),
            best.confidence,
            images,
        ))
    }
}
