// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster preview of overlay instructions: the oriented content raster placed
// and scaled like the PDF content, with every draw operation painted on top.

use std::path::Path;

use bleedwerk_core::error::{BleedError, Result};
use bleedwerk_core::types::{Color, PT_PER_INCH, Rect, Side};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use tracing::{debug, instrument};

use crate::raster::RasterSample;
use crate::synth::{DrawOp, OverlayInstructions};

/// Largest color distance across a content/padding boundary that still
/// reads as continuous.
pub const SEAM_TOLERANCE: f32 = 12.0;

/// An output-page rectangle snapped to preview pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PixelRect {
    left: i64,
    top: i64,
    width: u32,
    height: u32,
}

impl PixelRect {
    /// Snap `rect` (PDF points, origin bottom-left) to image pixels (origin
    /// top-left). `None` when it covers no whole pixel.
    fn from_rect(rect: &Rect, page_height_pt: f32, scale: f32) -> Option<Self> {
        let left = (rect.x * scale).round() as i64;
        let right = (rect.right() * scale).round() as i64;
        let top = ((page_height_pt - rect.top()) * scale).round() as i64;
        let bottom = ((page_height_pt - rect.y) * scale).round() as i64;
        (right > left && bottom > top).then(|| Self {
            left,
            top,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        })
    }

    fn right(&self) -> i64 {
        self.left + self.width as i64
    }

    fn bottom(&self) -> i64 {
        self.top + self.height as i64
    }
}

/// Paint the composed page at `dpi`.
///
/// `raster` must be oriented like the placed content, exactly as it was
/// passed to the synthesizer.
#[instrument(skip_all, fields(dpi = dpi))]
pub fn render_preview(raster: &RasterSample, overlay: &OverlayInstructions, dpi: f32) -> RgbImage {
    let scale = dpi / PT_PER_INCH;
    let width = (overlay.page_width_pt * scale).round().max(1.0) as u32;
    let height = (overlay.page_height_pt * scale).round().max(1.0) as u32;
    let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));

    if let Some(content) =
        PixelRect::from_rect(&overlay.placement.rect, overlay.page_height_pt, scale)
        && !raster.is_empty()
    {
        let resized = imageops::resize(
            &raster.to_rgb_image(),
            content.width,
            content.height,
            FilterType::Triangle,
        );
        imageops::overlay(&mut canvas, &resized, content.left, content.top);
    }

    for op in &overlay.operations {
        match op {
            DrawOp::FillRect { rect, color } | DrawOp::CornerPatch { rect, color, .. } => {
                if let Some(area) = PixelRect::from_rect(rect, overlay.page_height_pt, scale) {
                    draw_filled_rect_mut(
                        &mut canvas,
                        imageproc::rect::Rect::at(area.left as i32, area.top as i32)
                            .of_size(area.width, area.height),
                        Rgb(color.to_rgb()),
                    );
                }
            }
            DrawOp::StretchedStrip { side, rect, pixels } => {
                let Some(area) = PixelRect::from_rect(rect, overlay.page_height_pt, scale) else {
                    continue;
                };
                if pixels.is_empty() {
                    continue;
                }
                let strip = strip_image(*side, pixels);
                let stretched =
                    imageops::resize(&strip, area.width, area.height, FilterType::Nearest);
                imageops::overlay(&mut canvas, &stretched, area.left, area.top);
            }
        }
    }

    debug!(width, height, operations = overlay.operations.len(), "Preview rendered");
    canvas
}

/// Largest color distance between a stretched strip's inner edge and the
/// content pixel right next to it, over every strip in `overlay`.
///
/// `image` must come from [`render_preview`] at the same `dpi`.
pub fn max_seam_distance(image: &RgbImage, overlay: &OverlayInstructions, dpi: f32) -> f32 {
    let scale = dpi / PT_PER_INCH;
    let Some(content) =
        PixelRect::from_rect(&overlay.placement.rect, overlay.page_height_pt, scale)
    else {
        return 0.0;
    };
    let pixel = |x: i64, y: i64| -> Option<Color> {
        (x >= 0 && y >= 0 && x < image.width() as i64 && y < image.height() as i64)
            .then(|| Color::Rgb(image.get_pixel(x as u32, y as u32).0))
    };

    let mut worst = 0.0f32;
    let mut compare = |padding: (i64, i64), inside: (i64, i64)| {
        if let (Some(a), Some(b)) = (pixel(padding.0, padding.1), pixel(inside.0, inside.1)) {
            worst = worst.max(a.distance(b));
        }
    };

    for op in &overlay.operations {
        let DrawOp::StretchedStrip { side, rect, .. } = op else {
            continue;
        };
        let Some(strip) = PixelRect::from_rect(rect, overlay.page_height_pt, scale) else {
            continue;
        };
        let rows = strip.top.max(content.top)..strip.bottom().min(content.bottom());
        let columns = strip.left.max(content.left)..strip.right().min(content.right());
        match side {
            Side::Left => rows.for_each(|y| compare((strip.right() - 1, y), (strip.right(), y))),
            Side::Right => rows.for_each(|y| compare((strip.left, y), (strip.left - 1, y))),
            Side::Top => columns.for_each(|x| compare((x, strip.bottom() - 1), (x, strip.bottom()))),
            Side::Bottom => columns.for_each(|x| compare((x, strip.top), (x, strip.top - 1))),
        }
    }
    worst
}

/// Write a preview image; the format follows the file extension.
pub fn save_preview(image: &RgbImage, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    image.save(path).map_err(|err| {
        BleedError::ImageError(format!("cannot write preview {}: {}", path.display(), err))
    })?;
    debug!(path = %path.display(), "Preview saved");
    Ok(())
}

fn strip_image(side: Side, pixels: &[Color]) -> RgbImage {
    let len = pixels.len() as u32;
    let at = |i: u32| Rgb(pixels[i as usize].to_rgb());
    if side.is_horizontal() {
        RgbImage::from_fn(len, 1, |x, _| at(x))
    } else {
        RgbImage::from_fn(1, len, |_, y| at(y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bleedwerk_core::config::TargetSpec;
    use bleedwerk_core::types::{FillStrategy, OperatingMode, PageGeometry};

    use crate::analysis::BorderAnalyzer;
    use crate::plan::ScalePlanner;
    use crate::synth::BorderSynthesizer;
    use crate::testing::{bordered_raster, gradient_raster};

    fn scaled_overlay(
        raster: &RasterSample,
        width_mm: f32,
        height_mm: f32,
        spec: &TargetSpec,
        strategy: FillStrategy,
    ) -> OverlayInstructions {
        let geometry = PageGeometry::from_mm(width_mm, height_mm);
        let (tw, th) = spec.final_size_pt();
        let plan = ScalePlanner::plan(geometry, tw, th, spec.allow_rotation, spec.fit_mode);
        let profile = BorderAnalyzer::from_spec(spec).detect(raster);
        BorderSynthesizer::synthesize(
            geometry,
            raster,
            Some(&profile),
            &plan,
            spec,
            strategy,
            OperatingMode::Scaled,
        )
        .unwrap()
    }

    #[test]
    fn preview_has_output_page_size() {
        let raster = gradient_raster(80.0, 60.0, 150.0);
        let spec = TargetSpec::new(120.5, 90.0);
        let overlay = scaled_overlay(&raster, 80.0, 60.0, &spec, FillStrategy::SmartStretch);
        let image = render_preview(&raster, &overlay, 150.0);
        let expected_w = (overlay.page_width_pt * 150.0 / 72.0).round() as u32;
        let expected_h = (overlay.page_height_pt * 150.0 / 72.0).round() as u32;
        assert_eq!(image.dimensions(), (expected_w, expected_h));
    }

    #[test]
    fn stretched_padding_has_no_visible_seam() {
        let raster = gradient_raster(80.0, 60.0, 150.0);
        let spec = TargetSpec::new(120.5, 90.0);
        let overlay = scaled_overlay(&raster, 80.0, 60.0, &spec, FillStrategy::SmartStretch);
        assert!(!overlay.is_empty());

        let image = render_preview(&raster, &overlay, 150.0);
        let seam = max_seam_distance(&image, &overlay, 150.0);
        assert!(seam < SEAM_TOLERANCE, "seam distance {seam}");
    }

    #[test]
    fn wide_padding_has_no_visible_seam() {
        let raster = gradient_raster(80.0, 60.0, 150.0);
        let spec = TargetSpec::new(120.0, 120.0);
        let overlay = scaled_overlay(&raster, 80.0, 60.0, &spec, FillStrategy::SmartStretch);
        let image = render_preview(&raster, &overlay, 150.0);
        assert!(max_seam_distance(&image, &overlay, 150.0) < SEAM_TOLERANCE);
    }

    #[test]
    fn flat_fill_paints_padding_in_border_color() {
        let green = [0, 140, 70];
        let raster = bordered_raster(100.0, 100.0, 6.0, green, 150.0);
        let spec = TargetSpec::new(148.0, 105.0);
        let overlay = scaled_overlay(&raster, 100.0, 100.0, &spec, FillStrategy::FlatFill);
        let image = render_preview(&raster, &overlay, 150.0);

        let (w, h) = image.dimensions();
        assert_eq!(image.get_pixel(2, h / 2).0, green);
        assert_eq!(image.get_pixel(w - 3, h / 2).0, green);
    }

    #[test]
    fn preview_is_saved_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let image = RgbImage::from_pixel(8, 6, Rgb([0, 140, 70]));

        let path = dir.path().join("preview.png");
        save_preview(&image, &path).unwrap();
        let reloaded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(reloaded.dimensions(), (8, 6));

        let err = save_preview(&image, dir.path().join("preview.unknown")).unwrap_err();
        assert!(matches!(err, BleedError::ImageError(_)));
    }

    #[test]
    fn pixel_rect_flips_the_vertical_axis() {
        let area = PixelRect::from_rect(&Rect::new(0.0, 0.0, 72.0, 36.0), 144.0, 1.0).unwrap();
        assert_eq!((area.left, area.top, area.width, area.height), (0, 108, 72, 36));
        assert!(PixelRect::from_rect(&Rect::new(0.0, 0.0, 0.2, 10.0), 144.0, 1.0).is_none());
    }
}
