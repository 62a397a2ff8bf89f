// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Smart stretch: extend the content's own edges outward.

use bleedwerk_core::error::{BleedError, Result};
use bleedwerk_core::types::{Color, Corner, Rect, Side};
use tracing::trace;

use super::sample::{blend, sample_edge, sample_edge_from_end, sample_strip};
use super::{DrawOp, SynthesisContext};
use crate::raster::RasterSample;

/// Raster pixels skipped at each edge before sampling.
///
/// At least one pixel, at least the analysis skip, and otherwise
/// `overlap_factor` millimetres' worth of pixels.
pub fn edge_inset_px(raster: &RasterSample, skip_pixels: u32, overlap_factor: f32) -> u32 {
    let from_overlap = (overlap_factor * raster.pixels_per_mm()).round() as u32;
    from_overlap.max(skip_pixels).max(1)
}

/// Stretched edge strips on every padded side plus blended corner patches
/// where two padded sides meet.
///
/// Each strip is sampled `inset` pixels in from its edge and drawn from
/// `overdue_border_pt` outside the page to the same inset inside the content,
/// which hides the content's own edge artifacts.
pub(crate) fn smart_stretch(ctx: &SynthesisContext<'_>, raster: &RasterSample) -> Result<Vec<DrawOp>> {
    let inset = edge_inset_px(raster, ctx.spec.skip_pixels, ctx.spec.overlap_factor);
    let too_small = || {
        BleedError::SynthesisFailure(format!(
            "{}x{}px raster is too small to sample edges {}px in",
            raster.width(),
            raster.height(),
            inset
        ))
    };

    let mut strips: [Option<Vec<Color>>; 4] = [None, None, None, None];
    for (slot, side) in strips.iter_mut().zip(Side::ALL) {
        if ctx.padding.is_open(side) {
            *slot = Some(sample_strip(raster, side, inset).ok_or_else(too_small)?);
        }
    }
    let [top, bottom, left, right] = strips;

    let content = ctx.placement.rect;
    let pad = ctx.padding;
    let od = ctx.spec.overdue_border_pt;
    let ov = inset as f32 / raster.pixels_per_pt() * ctx.placement.scale;
    let (cx, cy, cw, ch) = (content.x, content.y, content.width, content.height);
    trace!(inset, overlap_pt = ov, "Stretching edges");

    let mut operations = Vec::with_capacity(8);
    let mut push_strip = |side: Side, rect: Rect, pixels: &Option<Vec<Color>>| {
        if let Some(pixels) = pixels
            && rect.is_drawable()
        {
            operations.push(DrawOp::StretchedStrip {
                side,
                rect,
                pixels: pixels.clone(),
            });
        }
    };

    // Strip ends that meet the page edge run out past it like the strips do.
    let past_edge = |side: Side| if pad.is_open(side) { 0.0 } else { od };
    let (sy, sh) = (
        cy - past_edge(Side::Bottom),
        ch + past_edge(Side::Bottom) + past_edge(Side::Top),
    );
    let (sx, sw) = (
        cx - past_edge(Side::Left),
        cw + past_edge(Side::Left) + past_edge(Side::Right),
    );

    push_strip(Side::Left, Rect::new(-od, sy, pad.left + ov + od, sh), &left);
    push_strip(Side::Right, Rect::new(cx + cw - ov, sy, pad.right + ov + od, sh), &right);
    push_strip(Side::Top, Rect::new(sx, cy + ch - ov, sw, pad.top + ov + od), &top);
    push_strip(Side::Bottom, Rect::new(sx, -od, sw, pad.bottom + ov + od), &bottom);

    let offset = inset as usize;
    for corner in Corner::ALL {
        let (color, rect) = match (corner, &top, &bottom, &left, &right) {
            (Corner::TopLeft, Some(top), _, Some(left), _) => (
                blend(sample_edge(top, offset), sample_edge(left, offset)),
                Rect::new(-od, cy + ch, pad.left + od, pad.top + od),
            ),
            (Corner::TopRight, Some(top), _, _, Some(right)) => (
                blend(sample_edge_from_end(top, offset), sample_edge(right, offset)),
                Rect::new(cx + cw, cy + ch, pad.right + od, pad.top + od),
            ),
            (Corner::BottomLeft, _, Some(bottom), Some(left), _) => (
                blend(sample_edge(bottom, offset), sample_edge_from_end(left, offset)),
                Rect::new(-od, -od, pad.left + od, pad.bottom + od),
            ),
            (Corner::BottomRight, _, Some(bottom), _, Some(right)) => (
                blend(
                    sample_edge_from_end(bottom, offset),
                    sample_edge_from_end(right, offset),
                ),
                Rect::new(cx + cw, -od, pad.right + od, pad.bottom + od),
            ),
            _ => continue,
        };
        if rect.is_drawable() {
            operations.push(DrawOp::CornerPatch {
                corner,
                rect,
                color,
            });
        }
    }

    Ok(operations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bleedwerk_core::config::TargetSpec;
    use bleedwerk_core::types::{FillStrategy, OperatingMode, PageGeometry, mm_to_pt};
    use image::{Rgb, RgbImage};

    use crate::plan::ScalePlan;
    use crate::synth::BorderSynthesizer;
    use crate::testing::gradient_raster;

    fn bleed_overlay(raster: &RasterSample, spec: &TargetSpec) -> crate::synth::OverlayInstructions {
        let geometry = PageGeometry::new(
            raster.width() as f32 / raster.pixels_per_pt(),
            raster.height() as f32 / raster.pixels_per_pt(),
        );
        let (tw, th) = spec.final_size_pt();
        BorderSynthesizer::synthesize(
            geometry,
            raster,
            None,
            &ScalePlan::identity(tw, th),
            spec,
            FillStrategy::SmartStretch,
            OperatingMode::Unscaled,
        )
        .unwrap()
    }

    #[test]
    fn inset_has_a_floor() {
        let raster = gradient_raster(10.0, 10.0, 25.4);
        assert_eq!(edge_inset_px(&raster, 0, 0.0), 1);
        assert_eq!(edge_inset_px(&raster, 3, 0.0), 3);
        let raster = gradient_raster(10.0, 10.0, 254.0);
        assert_eq!(edge_inset_px(&raster, 3, 0.5), 5);
    }

    #[test]
    fn bleed_extension_draws_four_strips_and_four_corners() {
        let raster = gradient_raster(148.0, 105.0, 150.0);
        let spec = TargetSpec::new(148.0, 105.0).with_bleed(3.0);
        let overlay = bleed_overlay(&raster, &spec);

        let strips = overlay
            .operations
            .iter()
            .filter(|op| matches!(op, DrawOp::StretchedStrip { .. }))
            .count();
        let corners = overlay
            .operations
            .iter()
            .filter(|op| matches!(op, DrawOp::CornerPatch { .. }))
            .count();
        assert_eq!((strips, corners), (4, 4));

        let od = spec.overdue_border_pt;
        let three_mm = mm_to_pt(3.0);
        for op in &overlay.operations {
            if let DrawOp::StretchedStrip { side: Side::Left, rect, pixels } = op {
                assert_eq!(pixels.len() as u32, raster.height());
                assert!((rect.x + od).abs() < 1e-4);
                assert!(rect.right() > three_mm);
            }
            if let DrawOp::CornerPatch {
                corner: Corner::TopLeft,
                rect,
                ..
            } = op
            {
                assert!((rect.width - (three_mm + od)).abs() < 1e-2);
                assert!((rect.top() - (overlay.page_height_pt + od)).abs() < 1e-2);
            }
        }
    }

    #[test]
    fn side_strips_run_past_closed_edges() {
        // Left and right padding only: the strips must cover the page height
        // plus the overdue border at both ends.
        let raster = gradient_raster(100.0, 105.0, 254.0);
        let spec = TargetSpec::new(106.0, 105.0);
        let overlay = bleed_overlay(&raster, &spec);
        let od = spec.overdue_border_pt;
        let h = overlay.page_height_pt;

        let mut sides = Vec::new();
        for op in &overlay.operations {
            if let DrawOp::StretchedStrip { side, rect, .. } = op {
                sides.push(*side);
                assert!((rect.y + od).abs() < 1e-2, "{side} starts at {}", rect.y);
                assert!((rect.top() - (h + od)).abs() < 1e-2, "{side} ends at {}", rect.top());
            }
        }
        assert_eq!(sides, vec![Side::Left, Side::Right]);
        assert!(!overlay.operations.iter().any(|op| matches!(op, DrawOp::CornerPatch { .. })));
    }

    #[test]
    fn corner_color_is_mean_of_adjacent_edge_samples() {
        // Color varies along both axes so the top and left samples differ.
        let img = RgbImage::from_fn(120, 90, |x, y| {
            Rgb([200, (y * 2).min(255) as u8, (x * 2).min(255) as u8])
        });
        let raster = RasterSample::from_rgb(img, 72.0);
        let spec = TargetSpec {
            overlap_factor: 0.0,
            ..TargetSpec::new(50.0, 40.0).with_bleed(2.0)
        };
        let inset = edge_inset_px(&raster, spec.skip_pixels, spec.overlap_factor) as usize;
        let top = sample_strip(&raster, Side::Top, inset as u32).unwrap();
        let left = sample_strip(&raster, Side::Left, inset as u32).unwrap();
        let top_sample = sample_edge(&top, inset);
        let left_sample = sample_edge(&left, inset);
        assert_ne!(top_sample, left_sample);

        let overlay = bleed_overlay(&raster, &spec);
        let corner = overlay
            .operations
            .iter()
            .find_map(|op| match op {
                DrawOp::CornerPatch {
                    corner: Corner::TopLeft,
                    color,
                    ..
                } => Some(*color),
                _ => None,
            })
            .unwrap();

        let (a, b, c) = (top_sample.to_rgb(), left_sample.to_rgb(), corner.to_rgb());
        for channel in 0..3 {
            let mean = (a[channel] as f32 + b[channel] as f32) / 2.0;
            assert!((c[channel] as f32 - mean).abs() <= 0.5, "channel {channel}");
        }
    }

    #[test]
    fn tiny_raster_cannot_be_stretched() {
        let raster = RasterSample::from_rgb(RgbImage::new(4, 4), 72.0);
        let spec = TargetSpec::new(10.0, 10.0).with_bleed(1.0);
        let geometry = PageGeometry::new(4.0, 4.0);
        let (tw, th) = spec.final_size_pt();
        let result = BorderSynthesizer::synthesize(
            geometry,
            &raster,
            None,
            &ScalePlan::identity(tw, th),
            &spec,
            FillStrategy::SmartStretch,
            OperatingMode::Unscaled,
        );
        assert!(matches!(result, Err(BleedError::SynthesisFailure(_))));
    }
}
