use std::fmt;

/// Encoding family of an optical code.
///
/// Decoders report an open-ended string tag; the known tags map onto closed
/// variants and anything else is kept verbatim in [`Symbology::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Symbology {
    /// QR Code
    Qr,
    /// Data Matrix
    DataMatrix,
    /// PDF417
    Pdf417,
    /// Code 128
    Code128,
    /// Code 39
    Code39,
    /// Code 93
    Code93,
    /// EAN-13
    Ean13,
    /// EAN-8
    Ean8,
    /// UPC-A
    UpcA,
    /// UPC-E
    UpcE,
    /// Interleaved 2 of 5
    I25,
    /// Codabar
    Codabar,
    /// GS1 DataBar (RSS-14)
    DataBar,
    /// GS1 DataBar Expanded (RSS Expanded)
    DataBarExpanded,
    /// Any tag not listed above
    Other(String),
}

impl Symbology {
    /// Map a decoder tag (case-insensitive) onto a symbology
    pub fn from_tag(tag: &str) -> Self {
        let upper = tag.trim().to_ascii_uppercase();
        match upper.as_str() {
            "QRCODE" | "QR" | "QR_CODE" => Symbology::Qr,
            "DATAMATRIX" | "DATA_MATRIX" => Symbology::DataMatrix,
            "PDF417" => Symbology::Pdf417,
            "CODE128" => Symbology::Code128,
            "CODE39" => Symbology::Code39,
            "CODE93" => Symbology::Code93,
            "EAN13" => Symbology::Ean13,
            "EAN8" => Symbology::Ean8,
            "UPCA" => Symbology::UpcA,
            "UPCE" => Symbology::UpcE,
            "I25" => Symbology::I25,
            "CODABAR" => Symbology::Codabar,
            "DATABAR" | "RSS14" => Symbology::DataBar,
            "DATABAR_EXP" | "RSS_EXP" => Symbology::DataBarExpanded,
            _ => Symbology::Other(tag.to_string()),
        }
    }

    /// Canonical tag used in composite keys and labels
    pub fn tag(&self) -> &str {
        match self {
            Symbology::Qr => "QRCODE",
            Symbology::DataMatrix => "DATAMATRIX",
            Symbology::Pdf417 => "PDF417",
            Symbology::Code128 => "CODE128",
            Symbology::Code39 => "CODE39",
            Symbology::Code93 => "CODE93",
            Symbology::Ean13 => "EAN13",
            Symbology::Ean8 => "EAN8",
            Symbology::UpcA => "UPCA",
            Symbology::UpcE => "UPCE",
            Symbology::I25 => "I25",
            Symbology::Codabar => "CODABAR",
            Symbology::DataBar => "DATABAR",
            Symbology::DataBarExpanded => "DATABAR_EXP",
            Symbology::Other(tag) => tag,
        }
    }

    /// DataBar family: payload must be all digits
    pub fn is_numeric_only(&self) -> bool {
        matches!(self, Symbology::DataBar | Symbology::DataBarExpanded)
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
