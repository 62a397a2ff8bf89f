// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster module: the page-to-pixels seam and the transient pixel buffers the
// analysis and synthesis steps work on.

#[cfg(feature = "pdfium")]
pub mod pdfium;

use bleedwerk_core::error::{BleedError, Result};
use bleedwerk_core::types::{Color, MM_PER_INCH, PT_PER_INCH, Side};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage, imageops};

use crate::pdf::PdfPage;

#[cfg(feature = "pdfium")]
pub use pdfium::PdfiumRasterizer;

/// Renders one page to pixels at a requested resolution.
///
/// Implementations must be deterministic for a given page and dpi. Any
/// closure `Fn(&PdfPage, f32) -> Result<RasterSample>` is a rasterizer, which
/// is how tests stand in for a real rendering engine.
pub trait PageRasterizer {
    fn render(&self, page: &PdfPage, dpi: f32) -> Result<RasterSample>;
}

impl<F> PageRasterizer for F
where
    F: Fn(&PdfPage, f32) -> Result<RasterSample>,
{
    fn render(&self, page: &PdfPage, dpi: f32) -> Result<RasterSample> {
        self(page, dpi)
    }
}

/// Pixel storage: 8-bit grayscale or 8-bit RGB, never mixed.
#[derive(Debug, Clone)]
pub enum RasterPixels {
    Gray(GrayImage),
    Rgb(RgbImage),
}

impl RasterPixels {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Gray(img) => img.dimensions(),
            Self::Rgb(img) => img.dimensions(),
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Color {
        match self {
            Self::Gray(img) => Color::Gray(img.get_pixel(x, y).0[0]),
            Self::Rgb(img) => Color::Rgb(img.get_pixel(x, y).0),
        }
    }
}

/// A page rendered at a known resolution. Created per analysis call and
/// dropped right after; never cached across pages.
#[derive(Debug, Clone)]
pub struct RasterSample {
    pixels: RasterPixels,
    dpi: f32,
    pixels_per_mm: f32,
}

impl RasterSample {
    // -- Construction ---------------------------------------------------------

    pub fn new(pixels: RasterPixels, dpi: f32) -> Self {
        Self {
            pixels,
            dpi,
            pixels_per_mm: dpi / MM_PER_INCH,
        }
    }

    pub fn from_gray(image: GrayImage, dpi: f32) -> Self {
        Self::new(RasterPixels::Gray(image), dpi)
    }

    pub fn from_rgb(image: RgbImage, dpi: f32) -> Self {
        Self::new(RasterPixels::Rgb(image), dpi)
    }

    /// Wrap a decoded image. Grayscale stays grayscale; everything else
    /// becomes RGB. Transparent pixels are flattened over white paper.
    pub fn from_dynamic(image: DynamicImage, dpi: f32) -> Self {
        match image {
            DynamicImage::ImageLuma8(gray) => Self::from_gray(gray, dpi),
            DynamicImage::ImageLumaA8(gray_alpha) => {
                let (width, height) = gray_alpha.dimensions();
                let flattened = GrayImage::from_fn(width, height, |x, y| {
                    let [v, a] = gray_alpha.get_pixel(x, y).0;
                    Luma([over_white(v, a)])
                });
                Self::from_gray(flattened, dpi)
            }
            DynamicImage::ImageRgb8(rgb) => Self::from_rgb(rgb, dpi),
            other => {
                let rgba = other.to_rgba8();
                let (width, height) = rgba.dimensions();
                let flattened = RgbImage::from_fn(width, height, |x, y| {
                    let [r, g, b, a] = rgba.get_pixel(x, y).0;
                    Rgb([over_white(r, a), over_white(g, a), over_white(b, a)])
                });
                Self::from_rgb(flattened, dpi)
            }
        }
    }

    /// Build a sample from tightly packed RGBA bytes, as rendering engines
    /// hand them out.
    pub fn from_rgba_bytes(width: u32, height: u32, data: Vec<u8>, dpi: f32) -> Result<Self> {
        let rgba = image::RgbaImage::from_raw(width, height, data).ok_or_else(|| {
            BleedError::rasterization(format!(
                "buffer does not hold {}x{} RGBA pixels",
                width, height
            ))
        })?;
        Ok(Self::from_dynamic(DynamicImage::ImageRgba8(rgba), dpi))
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.pixels.dimensions().0
    }

    pub fn height(&self) -> u32 {
        self.pixels.dimensions().1
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn dpi(&self) -> f32 {
        self.dpi
    }

    pub fn pixels_per_mm(&self) -> f32 {
        self.pixels_per_mm
    }

    pub fn pixels_per_pt(&self) -> f32 {
        self.dpi / PT_PER_INCH
    }

    pub fn width_mm(&self) -> f32 {
        self.width() as f32 / self.pixels_per_mm
    }

    pub fn height_mm(&self) -> f32 {
        self.height() as f32 / self.pixels_per_mm
    }

    pub fn pixel(&self, x: u32, y: u32) -> Color {
        self.pixels.pixel(x, y)
    }

    /// Number of stripes between two opposite edges when walking inward from
    /// `side`.
    pub fn depth(&self, side: Side) -> u32 {
        if side.is_horizontal() {
            self.height()
        } else {
            self.width()
        }
    }

    /// The 1-pixel stripe `index` pixels in from `side`.
    ///
    /// Top and bottom stripes run left to right; left and right stripes run
    /// top to bottom.
    pub fn line(&self, side: Side, index: u32) -> Vec<Color> {
        let (w, h) = (self.width(), self.height());
        match side {
            Side::Top => (0..w).map(|x| self.pixel(x, index)).collect(),
            Side::Bottom => (0..w).map(|x| self.pixel(x, h - 1 - index)).collect(),
            Side::Left => (0..h).map(|y| self.pixel(index, y)).collect(),
            Side::Right => (0..h).map(|y| self.pixel(w - 1 - index, y)).collect(),
        }
    }

    // -- Transformations ------------------------------------------------------

    /// The same raster turned 90 degrees clockwise, matching a page shown
    /// with `/Rotate 90`.
    pub fn rotated_clockwise(&self) -> Self {
        let pixels = match &self.pixels {
            RasterPixels::Gray(img) => RasterPixels::Gray(imageops::rotate90(img)),
            RasterPixels::Rgb(img) => RasterPixels::Rgb(imageops::rotate90(img)),
        };
        Self::new(pixels, self.dpi)
    }

    /// RGB copy of the pixels, for previews.
    pub fn to_rgb_image(&self) -> RgbImage {
        match &self.pixels {
            RasterPixels::Gray(img) => DynamicImage::ImageLuma8(img.clone()).to_rgb8(),
            RasterPixels::Rgb(img) => img.clone(),
        }
    }
}

/// Composite one channel with coverage `alpha` over white paper.
fn over_white(channel: u8, alpha: u8) -> u8 {
    let c = channel as u32;
    let a = alpha as u32;
    ((c * a + 255 * (255 - a) + 127) / 255) as u8
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use image::{LumaA, Rgba, RgbaImage};

    fn numbered_gray(width: u32, height: u32) -> RasterSample {
        RasterSample::from_gray(
            GrayImage::from_fn(width, height, |x, y| Luma([(y * width + x) as u8])),
            72.0,
        )
    }

    #[test]
    fn lines_walk_from_each_edge() {
        let raster = numbered_gray(4, 3);
        assert_eq!(
            raster.line(Side::Top, 0),
            vec![Color::Gray(0), Color::Gray(1), Color::Gray(2), Color::Gray(3)]
        );
        assert_eq!(raster.line(Side::Bottom, 0)[0], Color::Gray(8));
        assert_eq!(
            raster.line(Side::Left, 1),
            vec![Color::Gray(1), Color::Gray(5), Color::Gray(9)]
        );
        assert_eq!(raster.line(Side::Right, 0)[2], Color::Gray(11));
    }

    #[test]
    fn depth_depends_on_walking_direction() {
        let raster = numbered_gray(4, 3);
        assert_eq!(raster.depth(Side::Top), 3);
        assert_eq!(raster.depth(Side::Left), 4);
    }

    #[test]
    fn physical_size_follows_dpi() {
        let raster = RasterSample::from_gray(GrayImage::new(254, 127), 254.0);
        assert!((raster.pixels_per_mm() - 10.0).abs() < 1e-4);
        assert!((raster.width_mm() - 25.4).abs() < 1e-3);
        assert!((raster.height_mm() - 12.7).abs() < 1e-3);
    }

    #[test]
    fn transparent_pixels_become_white() {
        let rgba = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0]));
        let raster = RasterSample::from_dynamic(DynamicImage::ImageRgba8(rgba), 72.0);
        assert_eq!(raster.pixel(0, 0), Color::Rgb([255, 255, 255]));
    }

    #[test]
    fn opaque_pixels_are_kept() {
        let rgba = RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 255]));
        let raster = RasterSample::from_dynamic(DynamicImage::ImageRgba8(rgba), 72.0);
        assert_eq!(raster.pixel(0, 0), Color::Rgb([10, 20, 30]));
    }

    #[test]
    fn gray_alpha_stays_gray() {
        let img = image::ImageBuffer::from_pixel(1, 1, LumaA([0u8, 128]));
        let raster = RasterSample::from_dynamic(DynamicImage::ImageLumaA8(img), 72.0);
        assert!(matches!(raster.pixel(0, 0), Color::Gray(127)));
    }

    #[test]
    fn rgba_bytes_must_match_dimensions() {
        assert!(RasterSample::from_rgba_bytes(2, 2, vec![0; 15], 72.0).is_err());
        let raster = RasterSample::from_rgba_bytes(2, 2, vec![255; 16], 72.0).unwrap();
        assert_eq!(raster.width(), 2);
    }

    #[test]
    fn clockwise_rotation_moves_top_left_to_top_right() {
        let raster = numbered_gray(4, 3);
        let turned = raster.rotated_clockwise();
        assert_eq!((turned.width(), turned.height()), (3, 4));
        assert_eq!(turned.pixel(2, 0), Color::Gray(0));
        assert_eq!(turned.dpi(), raster.dpi());
    }
}
