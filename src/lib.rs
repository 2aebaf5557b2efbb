//! code_inspect - live-stream 1D/2D optical code inspection
//!
//! Frames from a capture device are localized with an external symbol
//! decoder, each symbol region is rectified and re-decoded through several
//! enhancement variants, and the surviving codes are counted against an
//! expected total within a timeout.
//!
//! The decoder itself is not part of this crate; plug one in through
//! [`SymbolDecoder`].

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Processed-frame rendering
pub mod annotation;
/// Frame sources, device controls and the capture worker
pub mod capture;
/// External decoder contract
pub mod decoder;
/// Localization, rectification, re-detection and fallback stages
pub mod detector;
/// Error types
pub mod errors;
/// Outbound events
pub mod events;
/// Emission suppression and inspection sessions
pub mod inspection;
/// Core data structures (Frame, DetectedCode, BoundingBox, etc.)
pub mod models;
/// Shared parameter store
pub mod params;
/// Configuration snapshot files
pub mod persistence;
/// Per-frame detection pipeline
pub mod pipeline;
/// Enhancement and binarization variants
pub mod preprocess;
/// Environment tunables
pub mod settings;
/// Helpers for the CLI and benches
pub mod tools;
/// Image kernels (grayscale, threshold, CLAHE, geometry)
pub mod utils;

mod debug;

pub use capture::{CaptureLoop, FrameSource, LoopConfig, ThumbnailMode};
pub use decoder::{RawRect, RawSymbol, SymbolDecoder};
pub use errors::{CaptureError, ConfigError, DecodeError, DeviceError, InspectionError, ParamError};
pub use events::{EventBus, InspectionEvent};
pub use inspection::{InspectionOutcome, InspectionState, InspectionStateMachine, Verdict};
pub use models::{BoundingBox, DetectedCode, DetectionStage, Frame, Point, Polygon, Symbology};
pub use params::{ParamUpdate, ParameterStore, PipelineParams};
pub use persistence::ConfigStore;
pub use pipeline::{DetectionPipeline, DetectionTelemetry};
pub use preprocess::{PreprocessParams, PreprocessingPipeline};

/// Detect codes in a single frame with default settings
///
/// Convenience wrapper for one-off use; long-running callers should keep a
/// [`DetectionPipeline`] around instead.
pub fn detect<D: SymbolDecoder + 'static>(decoder: D, frame: &Frame) -> Vec<DetectedCode> {
    DetectionPipeline::new(Box::new(decoder)).detect(frame)
}
