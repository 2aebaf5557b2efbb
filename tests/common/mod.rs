#![allow(dead_code)]

use code_inspect::{DecodeError, Frame, Point, RawRect, RawSymbol, SymbolDecoder};
use image::{Rgb, RgbImage};

pub const FRAME_W: u32 = 320;
pub const FRAME_H: u32 = 240;

/// Decoder answering by image size: the full frame gets `frame_symbols`,
/// a rectified region gets the entries registered for its dimensions.
#[derive(Clone, Default)]
pub struct ScriptedDecoder {
    pub frame_symbols: Vec<RawSymbol>,
    pub region_symbols: Vec<((u32, u32), RawSymbol)>,
}

impl ScriptedDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A code seen by localization at `rect`, decoded again from its
    /// rectified region
    pub fn with_code(mut self, tag: &str, text: &str, rect: (i32, i32, i32, i32)) -> Self {
        let sym = symbol(tag, text, rect);
        let region = (rect.2.max(100) as u32, rect.3.max(50) as u32);
        self.frame_symbols.push(sym.clone());
        self.region_symbols.push((region, symbol(tag, text, (2, 2, rect.2 - 4, rect.3 - 4))));
        self
    }

    /// A code seen by localization only; refinement finds nothing
    pub fn with_unrefinable_code(mut self, tag: &str, text: &str, rect: (i32, i32, i32, i32)) -> Self {
        self.frame_symbols.push(symbol(tag, text, rect));
        self
    }
}

impl SymbolDecoder for ScriptedDecoder {
    fn decode(&self, image: &Frame) -> Result<Vec<RawSymbol>, DecodeError> {
        let dims = image.dimensions();
        if dims == (FRAME_W, FRAME_H) {
            return Ok(self.frame_symbols.clone());
        }
        Ok(self
            .region_symbols
            .iter()
            .filter(|(size, _)| *size == dims)
            .map(|(_, sym)| sym.clone())
            .collect())
    }
}

pub struct PanickingDecoder;

impl SymbolDecoder for PanickingDecoder {
    fn decode(&self, _image: &Frame) -> Result<Vec<RawSymbol>, DecodeError> {
        panic!("native decoder crashed")
    }
}

pub fn symbol(tag: &str, text: &str, rect: (i32, i32, i32, i32)) -> RawSymbol {
    let (x, y, w, h) = rect;
    let (x0, y0, x1, y1) = (x as f32, y as f32, (x + w) as f32, (y + h) as f32);
    RawSymbol {
        symbology: tag.to_string(),
        data: text.as_bytes().to_vec(),
        rect: RawRect::new(x, y, w, h),
        polygon: [
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ],
    }
}

pub fn blank_frame() -> Frame {
    Frame::Color(RgbImage::from_pixel(FRAME_W, FRAME_H, Rgb([220, 220, 220])))
}
