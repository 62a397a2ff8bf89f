// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Bleedwerk: units, colors, page geometry and paper
// formats.

use serde::{Deserialize, Serialize};

/// Millimetres per inch.
pub const MM_PER_INCH: f32 = 25.4;

/// PDF user-space points per inch.
pub const PT_PER_INCH: f32 = 72.0;

/// Convert millimetres to PDF points.
pub fn mm_to_pt(mm: f32) -> f32 {
    mm * PT_PER_INCH / MM_PER_INCH
}

/// Convert PDF points to millimetres.
pub fn pt_to_mm(pt: f32) -> f32 {
    pt * MM_PER_INCH / PT_PER_INCH
}

// -- Color --------------------------------------------------------------------

/// An 8-bit color sample, either grayscale or RGB.
///
/// Channels stay `u8` through the whole pipeline; averaging and blending
/// happen in wider integers and are rounded back explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    Gray(u8),
    Rgb([u8; 3]),
}

impl Color {
    pub const WHITE: Color = Color::Rgb([255, 255, 255]);

    /// Promote to an RGB triple (gray is replicated on all channels).
    pub fn to_rgb(self) -> [u8; 3] {
        match self {
            Self::Gray(v) => [v, v, v],
            Self::Rgb(rgb) => rgb,
        }
    }

    /// Distance between two colors.
    ///
    /// Absolute difference for two gray values, Euclidean distance in RGB
    /// space otherwise.
    pub fn distance(self, other: Color) -> f32 {
        match (self, other) {
            (Self::Gray(a), Self::Gray(b)) => (a as f32 - b as f32).abs(),
            (a, b) => {
                let a = a.to_rgb();
                let b = b.to_rgb();
                a.iter()
                    .zip(b.iter())
                    .map(|(&x, &y)| {
                        let d = x as f32 - y as f32;
                        d * d
                    })
                    .sum::<f32>()
                    .sqrt()
            }
        }
    }

    /// Channel values normalised to 0.0..=1.0, one entry per channel.
    pub fn components(self) -> Vec<f32> {
        match self {
            Self::Gray(v) => vec![v as f32 / 255.0],
            Self::Rgb(rgb) => rgb.iter().map(|&c| c as f32 / 255.0).collect(),
        }
    }

    /// `rrggbb` hex representation.
    pub fn to_hex(self) -> String {
        let [r, g, b] = self.to_rgb();
        format!("{:02x}{:02x}{:02x}", r, g, b)
    }

    /// Parse `rrggbb` or `#rrggbb`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::Rgb([channel(0)?, channel(2)?, channel(4)?]))
    }
}

// -- Sides and corners --------------------------------------------------------

/// One edge of a page or raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Top, Side::Bottom, Side::Left, Side::Right];

    /// Top and bottom edges run horizontally.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Top | Self::Bottom)
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Left => "left",
            Self::Right => "right",
        };
        f.write_str(name)
    }
}

/// One corner of a page, where two padded sides meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];
}

// -- Geometry -----------------------------------------------------------------

/// Axis-aligned rectangle in PDF points (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    /// True when both dimensions are strictly positive.
    pub fn is_drawable(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// `[llx, lly, urx, ury]` as used by PDF page boxes.
    pub fn to_box(&self) -> [f32; 4] {
        [self.x, self.y, self.right(), self.top()]
    }
}

/// Size of a page's visible box, snapshotted at the start of a composition
/// step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PageGeometry {
    pub fn new(width_pt: f32, height_pt: f32) -> Self {
        Self {
            width_pt,
            height_pt,
        }
    }

    pub fn from_mm(width_mm: f32, height_mm: f32) -> Self {
        Self::new(mm_to_pt(width_mm), mm_to_pt(height_mm))
    }

    pub fn width_mm(&self) -> f32 {
        pt_to_mm(self.width_pt)
    }

    pub fn height_mm(&self) -> f32 {
        pt_to_mm(self.height_pt)
    }

    /// The same page turned by 90 degrees.
    pub fn swapped(&self) -> Self {
        Self::new(self.height_pt, self.width_pt)
    }
}

// -- Modes --------------------------------------------------------------------

/// How content is scaled into the target box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitMode {
    /// Scale to fit entirely inside the target, padding the rest.
    #[default]
    Fit,
    /// Scale to cover the whole target, cropping overflow.
    Fill,
}

/// Strategy used to synthesize padding around scaled content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FillStrategy {
    /// Solid rectangles in the detected border color.
    FlatFill,
    /// Edge strips stretched across the padding, blended corners.
    SmartStretch,
}

impl std::fmt::Display for FillStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FlatFill => f.write_str("flat-fill"),
            Self::SmartStretch => f.write_str("smart-stretch"),
        }
    }
}

/// Whether content is being scaled into the target or only extended outward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperatingMode {
    Scaled,
    Unscaled,
}

// -- Paper formats ------------------------------------------------------------

/// Standard paper sizes (ISO 216 A-series) plus custom formats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PaperSize {
    A0,
    A1,
    A2,
    A3,
    A4,
    A5,
    A6,
    A7,
    A8,
    A9,
    A10,
    Custom { width_mm: f32, height_mm: f32 },
}

impl PaperSize {
    /// Portrait dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (f32, f32) {
        match self {
            Self::A0 => (841.0, 1189.0),
            Self::A1 => (594.0, 841.0),
            Self::A2 => (420.0, 594.0),
            Self::A3 => (297.0, 420.0),
            Self::A4 => (210.0, 297.0),
            Self::A5 => (148.0, 210.0),
            Self::A6 => (105.0, 148.0),
            Self::A7 => (74.0, 105.0),
            Self::A8 => (52.0, 74.0),
            Self::A9 => (37.0, 52.0),
            Self::A10 => (26.0, 37.0),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }

    /// Dimensions with the long edge horizontal.
    pub fn landscape(&self) -> (f32, f32) {
        let (w, h) = self.dimensions_mm();
        (w.max(h), w.min(h))
    }

    /// Dimensions with the long edge vertical.
    pub fn portrait(&self) -> (f32, f32) {
        let (w, h) = self.dimensions_mm();
        (w.min(h), w.max(h))
    }

    /// Parse a format name such as `A6` (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "A0" => Some(Self::A0),
            "A1" => Some(Self::A1),
            "A2" => Some(Self::A2),
            "A3" => Some(Self::A3),
            "A4" => Some(Self::A4),
            "A5" => Some(Self::A5),
            "A6" => Some(Self::A6),
            "A7" => Some(Self::A7),
            "A8" => Some(Self::A8),
            "A9" => Some(Self::A9),
            "A10" => Some(Self::A10),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mm_pt_conversion_round_trips() {
        assert!((mm_to_pt(25.4) - 72.0).abs() < 1e-4);
        assert!((pt_to_mm(mm_to_pt(148.0)) - 148.0).abs() < 1e-3);
    }

    #[test]
    fn gray_distance_is_absolute_difference() {
        assert_eq!(Color::Gray(10).distance(Color::Gray(30)), 20.0);
    }

    #[test]
    fn rgb_distance_is_euclidean() {
        let d = Color::Rgb([0, 0, 0]).distance(Color::Rgb([3, 4, 0]));
        assert!((d - 5.0).abs() < 1e-6);
    }

    #[test]
    fn mixed_distance_promotes_gray() {
        let d = Color::Gray(100).distance(Color::Rgb([100, 100, 100]));
        assert_eq!(d, 0.0);
    }

    #[test]
    fn hex_formatting() {
        assert_eq!(Color::Rgb([0, 255, 16]).to_hex(), "00ff10");
        assert_eq!(Color::Gray(0x80).to_hex(), "808080");
    }

    #[test]
    fn hex_parsing() {
        assert_eq!(Color::from_hex("#00ff10"), Some(Color::Rgb([0, 255, 16])));
        assert_eq!(Color::from_hex("1EA03C"), Some(Color::Rgb([30, 160, 60])));
        assert_eq!(Color::from_hex("12345"), None);
        assert_eq!(Color::from_hex("zz0000"), None);
    }

    #[test]
    fn a6_landscape_is_postcard() {
        assert_eq!(PaperSize::A6.landscape(), (148.0, 105.0));
        assert_eq!(PaperSize::from_name("a6"), Some(PaperSize::A6));
    }

    #[test]
    fn rect_box_and_drawable() {
        let r = Rect::new(5.0, 5.0, 90.0, 40.0);
        assert_eq!(r.to_box(), [5.0, 5.0, 95.0, 45.0]);
        assert!(!Rect::new(0.0, 0.0, 0.0, 10.0).is_drawable());
    }
}
