//! Symbol detection stages
//!
//! Per frame, in order:
//! - Localization of candidate regions on the grayscale frame, with the
//!   validity filter applied to every decoder result
//! - Rectification of each region (margin, crop, perspective warp)
//! - Confidence-based re-decoding of the rectified region's variants
//! - Whole-frame fallback when no region survives the steps above

/// Whole-frame decode over binary, enhanced and gray variants
pub mod fallback;
/// Initial localization and the validity filter
pub mod localizer;
/// Region crop and perspective correction
pub mod rectifier;
/// Best-of-variants re-decoding
pub mod selector;

pub use fallback::FullFrameFallback;
pub use localizer::{Candidate, Rejection, localize, validate};
pub use rectifier::{RectifiedRegion, RegionRectifier};
pub use selector::ConfidenceSelector;
