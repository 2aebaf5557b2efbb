//! External symbol decoder contract
//!
//! Symbology decoding itself is provided by an external library (zbar,
//! zxing, libdmtx, ...) behind [`SymbolDecoder`]. This module defines what the
//! pipeline expects from it and isolates each call so that a failing or
//! panicking decoder only ever means "nothing found".

use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::errors::DecodeError;
use crate::models::{Frame, Point};

/// Axis-aligned rectangle as reported by a decoder (may exceed the image)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawRect {
    /// Left edge
    pub x: i32,
    /// Top edge
    pub y: i32,
    /// Width
    pub w: i32,
    /// Height
    pub h: i32,
}

impl RawRect {
    /// Create a rectangle
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Area used as the confidence proxy; negative sizes count as zero
    pub fn area(&self) -> u64 {
        self.w.max(0) as u64 * self.h.max(0) as u64
    }
}

/// One decoder result
#[derive(Debug, Clone, PartialEq)]
pub struct RawSymbol {
    /// Symbology tag, e.g. `QRCODE`, `CODE128`, `DATABAR`
    pub symbology: String,
    /// Raw decoded payload
    pub data: Vec<u8>,
    /// Bounding rectangle in the decoded image's coordinates
    pub rect: RawRect,
    /// Outline in the decoded image's coordinates
    pub polygon: [Point; 4],
}

impl RawSymbol {
    /// Payload as text, see [`decode_text`]
    pub fn text(&self) -> String {
        decode_text(&self.data)
    }
}

/// An external optical-code decoder.
///
/// Implementations must not keep mutable state shared between calls: the
/// pipeline invokes them many times per frame on different buffers.
pub trait SymbolDecoder: Send {
    /// Decode every symbol found in `image` (gray or color)
    fn decode(&self, image: &Frame) -> Result<Vec<RawSymbol>, DecodeError>;
}

impl<D: SymbolDecoder + Sync + ?Sized> SymbolDecoder for std::sync::Arc<D> {
    fn decode(&self, image: &Frame) -> Result<Vec<RawSymbol>, DecodeError> {
        (**self).decode(image)
    }
}

impl<D: SymbolDecoder + ?Sized> SymbolDecoder for Box<D> {
    fn decode(&self, image: &Frame) -> Result<Vec<RawSymbol>, DecodeError> {
        (**self).decode(image)
    }
}

/// Run the decoder, turning errors and panics into an empty result
pub fn decode_isolated<D: SymbolDecoder + ?Sized>(decoder: &D, image: &Frame) -> Vec<RawSymbol> {
    if image.is_empty() {
        return Vec::new();
    }
    let outcome = catch_unwind(AssertUnwindSafe(|| decoder.decode(image)))
        .unwrap_or_else(|payload| Err(DecodeError::Panicked(panic_message(payload.as_ref()))));

    match outcome {
        Ok(symbols) => symbols,
        Err(e) => {
            log::debug!(
                "decoder error on {}x{} image: {}",
                image.width(),
                image.height(),
                e
            );
            Vec::new()
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Decode a payload as UTF-8, silently dropping invalid sequences
pub fn decode_text(data: &[u8]) -> String {
    String::from_utf8_lossy(data)
        .chars()
        .filter(|&c| c != char::REPLACEMENT_CHARACTER)
        .collect()
}
