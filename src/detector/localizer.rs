use std::fmt;

use crate::decoder::{RawRect, RawSymbol, SymbolDecoder, decode_isolated};
use crate::models::{BoundingBox, Frame, Polygon, Symbology};

/// Smallest accepted decoder rectangle width
pub const MIN_SYMBOL_WIDTH: i32 = 15;
/// Smallest accepted decoder rectangle height
pub const MIN_SYMBOL_HEIGHT: i32 = 8;
/// Shortest accepted payload, in characters
pub const MIN_TEXT_LEN: usize = 3;
/// Shortest accepted payload for numeric-only symbologies
pub const MIN_NUMERIC_TEXT_LEN: usize = 10;

/// Why a raw decoder result was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Box narrower than 15 or lower than 8 pixels
    TooSmall,
    /// Fewer than 3 characters
    TextTooShort,
    /// Character outside printable ASCII
    NotPrintable,
    /// DataBar payload not 10+ digits
    NotNumeric,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Rejection::TooSmall => "bounding box too small",
            Rejection::TextTooShort => "text too short",
            Rejection::NotPrintable => "non-printable character",
            Rejection::NotNumeric => "numeric symbology with invalid digits",
        };
        f.write_str(reason)
    }
}

/// Validity filter applied to every raw decoder result.
///
/// Size is checked on the rectangle exactly as reported, before clamping.
pub fn validate(symbology: &Symbology, text: &str, rect: &RawRect) -> Result<(), Rejection> {
    if rect.w < MIN_SYMBOL_WIDTH || rect.h < MIN_SYMBOL_HEIGHT {
        return Err(Rejection::TooSmall);
    }
    let len = text.chars().count();
    if len < MIN_TEXT_LEN {
        return Err(Rejection::TextTooShort);
    }
    if !text.chars().all(|c| (' '..='~').contains(&c)) {
        return Err(Rejection::NotPrintable);
    }
    if symbology.is_numeric_only()
        && (len < MIN_NUMERIC_TEXT_LEN || !text.chars().all(|c| c.is_ascii_digit()))
    {
        return Err(Rejection::NotNumeric);
    }
    Ok(())
}

/// A validated region of interest in frame coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Encoding family
    pub symbology: Symbology,
    /// Decoded payload
    pub text: String,
    /// Clamped decoder rectangle
    pub bbox: BoundingBox,
    /// Decoder outline, frame coordinates
    pub polygon: Polygon,
}

impl Candidate {
    /// Validate a raw result and clamp its box to a `frame_w` x `frame_h` frame
    pub fn from_raw(raw: &RawSymbol, frame_w: u32, frame_h: u32) -> Option<Self> {
        let symbology = Symbology::from_tag(&raw.symbology);
        let text = raw.text();
        if let Err(reason) = validate(&symbology, &text, &raw.rect) {
            log::debug!("rejected {} candidate {:?}: {}", symbology, text, reason);
            return None;
        }
        let r = raw.rect;
        Some(Self {
            symbology,
            text,
            bbox: BoundingBox::clamped(r.x, r.y, r.w, r.h, frame_w, frame_h),
            polygon: Polygon::new(raw.polygon),
        })
    }
}

/// Initial localization pass over the grayscale full frame
pub fn localize<D: SymbolDecoder + ?Sized>(decoder: &D, gray: &Frame) -> Vec<Candidate> {
    let (width, height) = gray.dimensions();
    decode_isolated(decoder, gray)
        .iter()
        .filter_map(|raw| Candidate::from_raw(raw, width, height))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect() -> RawRect {
        RawRect::new(0, 0, 40, 20)
    }

    #[test]
    fn test_accepts_regular_code() {
        assert_eq!(validate(&Symbology::Code128, "ABC", &rect()), Ok(()));
    }

    #[test]
    fn test_size_limits() {
        let sym = Symbology::Qr;
        assert_eq!(validate(&sym, "HELLO", &RawRect::new(0, 0, 14, 20)), Err(Rejection::TooSmall));
        assert_eq!(validate(&sym, "HELLO", &RawRect::new(0, 0, 40, 7)), Err(Rejection::TooSmall));
        assert_eq!(validate(&sym, "HELLO", &RawRect::new(0, 0, 15, 8)), Ok(()));
    }

    #[test]
    fn test_text_rules() {
        let sym = Symbology::Code39;
        assert_eq!(validate(&sym, "AB", &rect()), Err(Rejection::TextTooShort));
        assert_eq!(validate(&sym, "AB\tC", &rect()), Err(Rejection::NotPrintable));
        assert_eq!(validate(&sym, "Ação", &rect()), Err(Rejection::NotPrintable));
        assert_eq!(validate(&sym, " ~!", &rect()), Ok(()));
    }

    #[test]
    fn test_numeric_only_family() {
        for sym in [Symbology::DataBar, Symbology::DataBarExpanded] {
            assert_eq!(validate(&sym, "ABC1234567", &rect()), Err(Rejection::NotNumeric));
            assert_eq!(validate(&sym, "123456789", &rect()), Err(Rejection::NotNumeric));
            assert_eq!(validate(&sym, "0123456789", &rect()), Ok(()));
        }
        assert_eq!(validate(&Symbology::Qr, "ABC1234567", &rect()), Ok(()));
    }

    #[test]
    fn test_candidate_box_is_clamped() {
        let raw = RawSymbol {
            symbology: "CODE128".into(),
            data: b"PART-42".to_vec(),
            rect: RawRect::new(-5, 90, 50, 30),
            polygon: [Default::default(); 4],
        };
        let c = Candidate::from_raw(&raw, 100, 100).unwrap();
        assert_eq!(c.bbox, BoundingBox { x: 0, y: 90, w: 45, h: 10 });
        assert_eq!(c.symbology, Symbology::Code128);
    }
}
