//! Fixed watermark appearance

/// Appearance shared by every stamp
///
/// The stamp is centred on the page, rotated along the lower-left to
/// upper-right diagonal and drawn beneath the existing page content.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkStyle {
    /// Standard 14 font used for the text
    pub font: &'static str,
    /// Font size in points before any shrink-to-fit
    pub font_size: f32,
    /// Constant alpha for fill and stroke (0.0 to 1.0)
    pub opacity: f32,
    /// Gray level for fill and stroke (0.0 black, 1.0 white)
    pub gray: f32,
}

impl Default for WatermarkStyle {
    fn default() -> Self {
        Self {
            font: "Helvetica",
            font_size: 48.0,
            opacity: 0.3,
            gray: 0.5,
        }
    }
}

/// One text stamp ready to hand to a rendering engine
#[derive(Debug, Clone, PartialEq)]
pub struct TextWatermark {
    pub text: String,
    pub style: WatermarkStyle,
}

impl TextWatermark {
    /// Stamp `text` with the default style
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: WatermarkStyle::default(),
        }
    }
}
