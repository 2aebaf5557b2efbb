use std::collections::HashSet;

use crate::decoder::SymbolDecoder;
use crate::detector::{ConfidenceSelector, FullFrameFallback, RegionRectifier, localize};
use crate::models::{DetectedCode, Frame};
use crate::preprocess::{PreprocessParams, PreprocessingPipeline};

/// Per-frame stage counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectionTelemetry {
    /// Regions that passed the validity filter
    pub candidates: usize,
    /// Regions that produced a crop
    pub rectified: usize,
    /// Regions where the perspective warp fell back to the plain crop
    pub rectify_fallbacks: usize,
    /// Codes accepted from refined regions
    pub refined: usize,
    /// Refined codes dropped as same-frame duplicates
    pub duplicates: usize,
    /// Whether the whole-frame fallback ran
    pub fallback_used: bool,
    /// Codes accepted from the whole-frame fallback
    pub fallback_codes: usize,
}

/// Localize, rectify, re-decode and, if nothing was found, fall back to the
/// whole frame.
pub struct DetectionPipeline {
    decoder: Box<dyn SymbolDecoder>,
    preprocess: PreprocessingPipeline,
    rectifier: RegionRectifier,
    selector: ConfidenceSelector,
    fallback: FullFrameFallback,
}

impl DetectionPipeline {
    /// Pipeline with the default preprocessing constants
    pub fn new(decoder: Box<dyn SymbolDecoder>) -> Self {
        Self::with_params(decoder, PreprocessParams::default())
    }

    /// Pipeline with custom preprocessing constants
    pub fn with_params(decoder: Box<dyn SymbolDecoder>, params: PreprocessParams) -> Self {
        let preprocess = PreprocessingPipeline::new(params);
        Self {
            decoder,
            rectifier: RegionRectifier::default(),
            selector: ConfidenceSelector::new(preprocess.clone()),
            fallback: FullFrameFallback::new(preprocess.clone()),
            preprocess,
        }
    }

    /// Detect every code in `frame`
    pub fn detect(&self, frame: &Frame) -> Vec<DetectedCode> {
        self.detect_with_telemetry(frame).0
    }

    /// Like [`detect`](Self::detect) but also returns stage counters
    pub fn detect_with_telemetry(&self, frame: &Frame) -> (Vec<DetectedCode>, DetectionTelemetry) {
        let mut telemetry = DetectionTelemetry::default();
        if frame.is_empty() {
            return (Vec::new(), telemetry);
        }

        let gray = self.preprocess.gray(frame);
        let candidates = localize(self.decoder.as_ref(), &Frame::Gray(gray.clone()));
        telemetry.candidates = candidates.len();

        let mut codes: Vec<DetectedCode> = Vec::new();
        let mut keys: HashSet<String> = HashSet::new();

        for candidate in &candidates {
            let Some(region) = self.rectifier.rectify(frame, &candidate.bbox, &candidate.polygon)
            else {
                continue;
            };
            telemetry.rectified += 1;
            if !region.warped {
                telemetry.rectify_fallbacks += 1;
            }

            let Some(code) = self.selector.select(self.decoder.as_ref(), candidate, region) else {
                continue;
            };
            if keys.insert(code.key()) {
                codes.push(code);
            } else {
                telemetry.duplicates += 1;
            }
        }
        telemetry.refined = codes.len();

        if codes.is_empty() {
            telemetry.fallback_used = true;
            codes = self.fallback.run(self.decoder.as_ref(), frame, &gray);
            telemetry.fallback_codes = codes.len();
        }

        if crate::debug::debug_enabled() {
            log::debug!(
                "frame {}x{}: {:?}",
                frame.width(),
                frame.height(),
                telemetry
            );
        }

        (codes, telemetry)
    }
}
