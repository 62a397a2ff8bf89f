// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Flat fill: solid rectangles in the detected border color.

use bleedwerk_core::error::{BleedError, Result};
use bleedwerk_core::types::{Rect, Side, mm_to_pt};

use super::{DrawOp, SynthesisContext};
use crate::analysis::BorderProfile;

/// One rectangle per padded side, in the profile's aggregate color.
///
/// Each rectangle starts `overdue_border_pt` outside the page and reaches
/// into the content by `overlap_factor` of that side's scaled border, so it
/// paints over the detected border's anti-aliased inner edge.
pub(crate) fn flat_fill(ctx: &SynthesisContext<'_>, profile: &BorderProfile) -> Result<Vec<DrawOp>> {
    let color = profile.aggregate_color.ok_or_else(|| {
        BleedError::SynthesisFailure("no border color was measured for flat fill".to_string())
    })?;

    let (w, h) = (ctx.page_width_pt, ctx.page_height_pt);
    let od = ctx.spec.overdue_border_pt;
    let pad = ctx.padding;
    let overlap = |side: Side| {
        ctx.spec.overlap_factor * mm_to_pt(profile.thickness_mm(side) * ctx.placement.scale)
    };

    let mut operations = Vec::with_capacity(4);
    let mut push = |side: Side, rect: Rect| {
        if pad.is_open(side) && rect.is_drawable() {
            operations.push(DrawOp::FillRect { rect, color });
        }
    };

    let left = overlap(Side::Left);
    push(Side::Left, Rect::new(-od, -od, pad.left + left + od, h + 2.0 * od));

    let top = overlap(Side::Top);
    push(
        Side::Top,
        Rect::new(-od, h - pad.top - top, w + 2.0 * od, pad.top + top + od),
    );

    let right = overlap(Side::Right);
    push(
        Side::Right,
        Rect::new(w - pad.right - right, -od, pad.right + right + od, h + 2.0 * od),
    );

    let bottom = overlap(Side::Bottom);
    push(Side::Bottom, Rect::new(-od, -od, w + 2.0 * od, pad.bottom + bottom + od));

    Ok(operations)
}

#[cfg(test)]
mod tests {
    use bleedwerk_core::config::TargetSpec;
    use bleedwerk_core::types::{Color, FillStrategy, FitMode, OperatingMode, PageGeometry};

    use crate::analysis::BorderAnalyzer;
    use crate::plan::ScalePlanner;
    use crate::synth::{BorderSynthesizer, DrawOp};
    use crate::testing::bordered_raster;

    const GREEN: [u8; 3] = [20, 150, 70];

    #[test]
    fn square_card_in_landscape_target_gets_side_bars() {
        let geometry = PageGeometry::from_mm(100.0, 100.0);
        let raster = bordered_raster(100.0, 100.0, 6.0, GREEN, 150.0);
        let spec = TargetSpec::new(148.0, 105.0);
        let (tw, th) = spec.final_size_pt();
        let plan = ScalePlanner::plan(geometry, tw, th, false, FitMode::Fit);
        let profile = BorderAnalyzer::from_spec(&spec).detect(&raster);

        let overlay = BorderSynthesizer::synthesize(
            geometry,
            &raster,
            Some(&profile),
            &plan,
            &spec,
            FillStrategy::FlatFill,
            OperatingMode::Scaled,
        )
        .unwrap();

        assert_eq!(overlay.operations.len(), 2);
        let od = spec.overdue_border_pt;
        for op in &overlay.operations {
            let DrawOp::FillRect { rect, color } = op else {
                panic!("flat fill emitted {op:?}");
            };
            assert_eq!(*color, Color::Rgb(GREEN));
            assert!((rect.y + od).abs() < 1e-4);
            assert!((rect.height - (th + 2.0 * od)).abs() < 1e-3);
            // Reaches past the padding into the scaled border.
            assert!(rect.width > overlay.padding.left + od);
        }
        let left = &overlay.operations[0];
        if let DrawOp::FillRect { rect, .. } = left {
            assert!((rect.x + od).abs() < 1e-4);
            assert!(rect.right() < overlay.placement.rect.x + 6.0 * 2.835 * plan.scale_factor);
        }
    }

    #[test]
    fn missing_border_color_is_a_synthesis_failure() {
        let geometry = PageGeometry::from_mm(100.0, 100.0);
        let raster = bordered_raster(100.0, 100.0, 6.0, GREEN, 150.0);
        let spec = TargetSpec::new(148.0, 105.0);
        let (tw, th) = spec.final_size_pt();
        let plan = ScalePlanner::plan(geometry, tw, th, false, FitMode::Fit);
        let mut profile = BorderAnalyzer::from_spec(&spec).detect(&raster);
        profile.aggregate_color = None;
        let result = BorderSynthesizer::synthesize(
            geometry,
            &raster,
            Some(&profile),
            &plan,
            &spec,
            FillStrategy::FlatFill,
            OperatingMode::Scaled,
        );
        assert!(matches!(
            result,
            Err(bleedwerk_core::error::BleedError::SynthesisFailure(_))
        ));
    }
}
