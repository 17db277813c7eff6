//! Stamp geometry
//!
//! All values are PDF points in default user space, origin at the bottom-left
//! of the page.

/// Visible page rectangle, taken from a page's `MediaBox`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub llx: f32,
    pub lly: f32,
    pub urx: f32,
    pub ury: f32,
}

impl PageBox {
    /// US Letter size (8.5" × 11")
    pub fn letter() -> Self {
        Self { llx: 0.0, lly: 0.0, urx: 612.0, ury: 792.0 }
    }

    /// A4 size (210mm × 297mm)
    pub fn a4() -> Self {
        Self { llx: 0.0, lly: 0.0, urx: 595.276, ury: 841.89 }
    }

    /// Build from the four numbers of a `MediaBox` array
    ///
    /// Corners may be given in any order; degenerate boxes are rejected.
    pub fn from_corners(values: [f32; 4]) -> Option<Self> {
        let [x0, y0, x1, y1] = values;
        let page = Self {
            llx: x0.min(x1),
            lly: y0.min(y1),
            urx: x0.max(x1),
            ury: y0.max(y1),
        };
        if page.width() > 0.0 && page.height() > 0.0 {
            Some(page)
        } else {
            None
        }
    }

    pub fn width(&self) -> f32 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f32 {
        self.ury - self.lly
    }

    /// Centre point of the page
    pub fn center(&self) -> (f32, f32) {
        (self.llx + self.width() / 2.0, self.lly + self.height() / 2.0)
    }

    /// Length of the lower-left to upper-right diagonal
    pub fn diagonal(&self) -> f32 {
        self.width().hypot(self.height())
    }
}

/// Where and how large a diagonal stamp is drawn on one page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StampPlacement {
    /// Rotation in radians, counter-clockwise from the x axis
    pub angle: f32,
    /// Font size actually used
    pub font_size: f32,
    /// Text matrix `[a b c d e f]` positioning the text origin at page centre
    pub matrix: [f32; 6],
    /// Offset from the centre to the text baseline start, in text space
    pub offset: (f32, f32),
}

/// Share of the page diagonal the stamp may cover before it is shrunk
const MAX_DIAGONAL_SHARE: f32 = 0.9;

/// Cap height of Helvetica as a fraction of the font size
const CAP_HEIGHT: f32 = 0.718;

/// Centre `text` on the page diagonal running lower-left to upper-right
///
/// The requested font size is kept unless the text would run past the page
/// corners, in which case it is reduced to fit.
pub fn diagonal_placement(page: &PageBox, text: &str, font_size: f32) -> StampPlacement {
    let angle = page.height().atan2(page.width());
    let (cx, cy) = page.center();

    let natural_width = estimate_text_width(text, font_size);
    let limit = page.diagonal() * MAX_DIAGONAL_SHARE;
    let font_size = if natural_width > limit && natural_width > 0.0 {
        font_size * limit / natural_width
    } else {
        font_size
    };
    let text_width = estimate_text_width(text, font_size);

    let (sin, cos) = angle.sin_cos();

    StampPlacement {
        angle,
        font_size,
        matrix: [cos, sin, -sin, cos, cx, cy],
        offset: (-text_width / 2.0, -font_size * CAP_HEIGHT / 2.0),
    }
}

/// Estimate text width for Helvetica
///
/// Uses per-class average advance widths (per 1000 em) rather than the
/// full metrics table.
pub fn estimate_text_width(text: &str, font_size: f32) -> f32 {
    let units: u32 = text
        .chars()
        .map(|c| match c {
            ' ' => 278,
            'i' | 'j' | 'l' | 'I' | '.' | ',' | ':' | ';' | '\'' | '!' => 250,
            'm' | 'w' | 'M' | 'W' => 850,
            c if c.is_ascii_uppercase() => 680,
            c if c.is_ascii_digit() => 556,
            c if c.is_ascii_lowercase() => 520,
            _ => 556,
        })
        .sum();
    units as f32 * font_size / 1000.0
}
