// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Synthesis module: turn a scale plan and a border profile into drawing
// instructions for the padding around placed content.
//
// Nothing here touches a PDF. The instructions are applied by
// `PdfPage::apply` and can be previewed with `preview::render_preview`.

pub mod flat;
pub mod sample;
pub mod stretch;

use bleedwerk_core::config::TargetSpec;
use bleedwerk_core::error::{BleedError, Result};
use bleedwerk_core::types::{Color, Corner, FillStrategy, OperatingMode, PageGeometry, Rect, Side};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::analysis::BorderProfile;
use crate::plan::ScalePlan;
use crate::raster::RasterSample;

/// Paddings at or below this many points are treated as absent.
pub const PADDING_EPSILON_PT: f32 = 0.01;

/// Where and how the source page content lands on the output page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ContentPlacement {
    /// Lower-left corner and size of the scaled content, in output points.
    pub rect: Rect,
    pub scale: f32,
    /// Clockwise turn applied on top of the page's own `/Rotate`.
    pub rotation_degrees: i64,
}

/// Empty space between placed content and the output page edge, per side.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Padding {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Padding {
    pub fn get(&self, side: Side) -> f32 {
        match side {
            Side::Top => self.top,
            Side::Bottom => self.bottom,
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    /// True when `side` has padding worth drawing.
    pub fn is_open(&self, side: Side) -> bool {
        self.get(side) > PADDING_EPSILON_PT
    }

    pub fn is_empty(&self) -> bool {
        Side::ALL.iter().all(|&side| !self.is_open(side))
    }
}

/// One drawing primitive in output-page points.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum DrawOp {
    /// Solid rectangle covering part of the padding.
    FillRect { rect: Rect, color: Color },
    /// A 1-pixel edge strip scaled across `rect`. Horizontal strips for top
    /// and bottom run left to right; vertical strips run top to bottom.
    StretchedStrip {
        side: Side,
        rect: Rect,
        pixels: Vec<Color>,
    },
    /// Solid patch filling the corner between two stretched strips.
    CornerPatch {
        corner: Corner,
        rect: Rect,
        color: Color,
    },
}

/// Everything needed to produce the output page: its size, the content
/// placement and the padding artwork.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayInstructions {
    pub page_width_pt: f32,
    pub page_height_pt: f32,
    pub placement: ContentPlacement,
    pub padding: Padding,
    pub strategy: FillStrategy,
    pub operations: Vec<DrawOp>,
}

impl OverlayInstructions {
    /// No padding artwork at all.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Content placement and padding for a page placed according to `plan`.
///
/// Content is centered. In `Unscaled` mode the plan's scale and rotation are
/// ignored; the page keeps its size and only grows outward.
pub fn layout(
    geometry: PageGeometry,
    plan: &ScalePlan,
    mode: OperatingMode,
) -> (ContentPlacement, Padding) {
    let (target_w, target_h) = plan.target_size();
    let (scale, rotation_degrees, (content_w, content_h)) = match mode {
        OperatingMode::Scaled => (
            plan.scale_factor,
            plan.rotation_degrees(),
            plan.content_size(geometry),
        ),
        OperatingMode::Unscaled => (1.0, 0, (geometry.width_pt, geometry.height_pt)),
    };
    let x = (target_w - content_w) / 2.0;
    let y = (target_h - content_h) / 2.0;
    let placement = ContentPlacement {
        rect: Rect::new(x, y, content_w, content_h),
        scale,
        rotation_degrees,
    };
    // Fill overhangs the target; overhang is cropped, never padded.
    let padding = Padding {
        top: (target_h - (y + content_h)).max(0.0),
        bottom: y.max(0.0),
        left: x.max(0.0),
        right: (target_w - (x + content_w)).max(0.0),
    };
    (placement, padding)
}

/// Inputs shared by both fill strategies.
pub(crate) struct SynthesisContext<'a> {
    pub page_width_pt: f32,
    pub page_height_pt: f32,
    pub placement: ContentPlacement,
    pub padding: Padding,
    pub spec: &'a TargetSpec,
}

/// Produces padding artwork for one page. Stateless.
pub struct BorderSynthesizer;

impl BorderSynthesizer {
    /// Build overlay instructions for `geometry` placed by `plan`.
    ///
    /// `raster` must already be oriented like the placed content (turned
    /// clockwise when the plan rotates). `FlatFill` needs a profile with an
    /// aggregate color; `SmartStretch` needs a raster large enough to sample
    /// clean edges from. Either failure is a `SynthesisFailure`.
    #[instrument(skip_all, fields(strategy = %strategy, mode = ?mode))]
    pub fn synthesize(
        geometry: PageGeometry,
        raster: &RasterSample,
        profile: Option<&BorderProfile>,
        plan: &ScalePlan,
        spec: &TargetSpec,
        strategy: FillStrategy,
        mode: OperatingMode,
    ) -> Result<OverlayInstructions> {
        let (placement, padding) = layout(geometry, plan, mode);
        let (page_width_pt, page_height_pt) = plan.target_size();
        let context = SynthesisContext {
            page_width_pt,
            page_height_pt,
            placement,
            padding,
            spec,
        };

        let operations = if padding.is_empty() {
            Vec::new()
        } else {
            match strategy {
                FillStrategy::FlatFill => {
                    let profile = profile.ok_or_else(|| {
                        BleedError::SynthesisFailure(
                            "flat fill needs a border profile".to_string(),
                        )
                    })?;
                    flat::flat_fill(&context, profile)?
                }
                FillStrategy::SmartStretch => stretch::smart_stretch(&context, raster)?,
            }
        };

        debug!(
            operations = operations.len(),
            left = padding.left,
            right = padding.right,
            top = padding.top,
            bottom = padding.bottom,
            "Overlay synthesized"
        );

        Ok(OverlayInstructions {
            page_width_pt,
            page_height_pt,
            placement,
            padding,
            strategy,
            operations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::BorderAnalyzer;
    use crate::plan::ScalePlanner;
    use crate::testing::{bordered_raster, gradient_raster};
    use bleedwerk_core::types::FitMode;

    #[test]
    fn layout_centers_content() {
        let geometry = PageGeometry::from_mm(100.0, 100.0);
        let spec = TargetSpec::new(148.0, 105.0);
        let (tw, th) = spec.final_size_pt();
        let plan = ScalePlanner::plan(geometry, tw, th, false, FitMode::Fit);
        let (placement, padding) = layout(geometry, &plan, OperatingMode::Scaled);
        assert!((padding.left - padding.right).abs() < 1e-3);
        assert!(padding.top.abs() < 1e-3 && padding.bottom.abs() < 1e-3);
        assert!((placement.rect.right() + padding.right - tw).abs() < 1e-3);
        assert!(padding.is_open(Side::Left));
        assert!(!padding.is_open(Side::Top));
    }

    #[test]
    fn fill_layout_never_pads_negatively() {
        let geometry = PageGeometry::from_mm(100.0, 100.0);
        let spec = TargetSpec::new(148.0, 105.0);
        let (tw, th) = spec.final_size_pt();
        let plan = ScalePlanner::plan(geometry, tw, th, false, FitMode::Fill);
        let (placement, padding) = layout(geometry, &plan, OperatingMode::Scaled);
        for side in Side::ALL {
            assert!(padding.get(side) >= 0.0, "{side} padding {}", padding.get(side));
        }
        assert!(padding.is_empty());
        assert!(placement.rect.y < 0.0 && placement.rect.top() > th);
    }

    #[test]
    fn unscaled_layout_ignores_plan_scale() {
        let geometry = PageGeometry::from_mm(148.0, 105.0);
        let mut plan = ScalePlan::identity(
            PageGeometry::from_mm(154.0, 111.0).width_pt,
            PageGeometry::from_mm(154.0, 111.0).height_pt,
        );
        plan.scale_factor = 2.0;
        let (placement, padding) = layout(geometry, &plan, OperatingMode::Unscaled);
        assert_eq!(placement.scale, 1.0);
        let three_mm = bleedwerk_core::types::mm_to_pt(3.0);
        for side in Side::ALL {
            assert!((padding.get(side) - three_mm).abs() < 1e-3);
        }
    }

    #[test]
    fn flat_fill_without_profile_fails() {
        let geometry = PageGeometry::from_mm(100.0, 100.0);
        let raster = bordered_raster(100.0, 100.0, 6.0, [0, 120, 0], 150.0);
        let spec = TargetSpec::new(148.0, 105.0);
        let (tw, th) = spec.final_size_pt();
        let plan = ScalePlanner::plan(geometry, tw, th, false, FitMode::Fit);
        let result = BorderSynthesizer::synthesize(
            geometry,
            &raster,
            None,
            &plan,
            &spec,
            FillStrategy::FlatFill,
            OperatingMode::Scaled,
        );
        assert!(matches!(result, Err(BleedError::SynthesisFailure(_))));
    }

    #[test]
    fn exact_fit_produces_no_operations() {
        let geometry = PageGeometry::from_mm(148.0, 105.0);
        let raster = gradient_raster(148.0, 105.0, 150.0);
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
            FillStrategy::SmartStretch,
            OperatingMode::Scaled,
        )
        .unwrap();
        assert!(overlay.is_empty());
        assert!(overlay.padding.is_empty());
    }
}
