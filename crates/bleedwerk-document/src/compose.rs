// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page composition: plan, rasterize, analyze, pick a fill strategy,
// synthesize padding and write the result into a new page.

use bleedwerk_core::config::TargetSpec;
use bleedwerk_core::error::{BleedError, Result};
use bleedwerk_core::types::{FillStrategy, OperatingMode, PageGeometry, pt_to_mm};
use image::RgbImage;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::analysis::{BorderAnalyzer, BorderProfile, BorderReport};
use crate::pdf::PdfPage;
use crate::plan::{ScalePlan, ScalePlanner};
use crate::preview::render_preview;
use crate::raster::{PageRasterizer, RasterSample};
use crate::synth::{BorderSynthesizer, OverlayInstructions, Padding, layout};

/// Size differences at or below this many points count as equal.
pub const GEOMETRY_EPSILON_PT: f32 = 0.1;

/// What happened to a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    /// The page was rebuilt at the target size.
    Composed,
    /// The page already had the target size and was left untouched.
    AlreadyFits,
    /// Padding could not be synthesized; the page was left untouched.
    SynthesisSkipped,
}

/// Per-page record of the decisions made.
#[derive(Debug, Clone, Serialize)]
pub struct CompositionReport {
    pub outcome: Outcome,
    pub mode: OperatingMode,
    /// Strategy used (or attempted, for `SynthesisSkipped`).
    pub strategy: Option<FillStrategy>,
    pub plan: ScalePlan,
    /// Only present in scaled mode.
    pub profile: Option<BorderProfile>,
    pub padding: Padding,
    pub note: Option<String>,
}

/// A composed page and how it was produced.
#[derive(Debug, Clone)]
pub struct Composed {
    pub page: PdfPage,
    pub report: CompositionReport,
}

impl Composed {
    /// Whether the returned page differs from the input.
    pub fn changed(&self) -> bool {
        self.report.outcome == Outcome::Composed
    }
}

/// Pick a fill strategy from a border profile.
///
/// Flat fill is used only for a confident, colored border whose thinnest
/// side stays at least `significance_threshold_mm` wide after scaling.
/// Everything else (thin, missing or degenerate borders) is stretched.
pub fn choose_strategy(profile: &BorderProfile, scale: f32, spec: &TargetSpec) -> FillStrategy {
    if let Err(err) = profile.ensure_confident() {
        warn!(%err, "Border analysis not trusted, falling back to smart stretch");
        return FillStrategy::SmartStretch;
    }
    if profile.aggregate_color.is_none() {
        return FillStrategy::SmartStretch;
    }
    let scaled_mm = profile.scaled_min_mm(scale);
    debug!(
        scaled_mm,
        threshold_mm = spec.significance_threshold_mm,
        "Scaled border"
    );
    if scaled_mm >= spec.significance_threshold_mm {
        FillStrategy::FlatFill
    } else {
        FillStrategy::SmartStretch
    }
}

/// Oriented raster, decisions and synthesized overlay for one page.
struct Prepared {
    raster: RasterSample,
    overlay: Result<OverlayInstructions>,
    report: CompositionReport,
}

/// Composes pages into target boxes using a rasterizer for analysis.
pub struct PageComposer<R> {
    rasterizer: R,
}

impl<R: PageRasterizer> PageComposer<R> {
    pub fn new(rasterizer: R) -> Self {
        Self { rasterizer }
    }

    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    /// Scale `page` into the target's final size, padding whatever the content
    /// does not cover.
    ///
    /// The input page is never modified. Rasterization failures are returned
    /// as errors; synthesis failures leave the page untouched and are
    /// reported as [`Outcome::SynthesisSkipped`].
    #[instrument(skip_all, fields(
        target_width_mm = spec.final_width_mm(),
        target_height_mm = spec.final_height_mm()
    ))]
    pub fn compose(&self, page: &PdfPage, spec: &TargetSpec) -> Result<Composed> {
        let prepared = self.prepare(page, spec)?;
        let mut report = prepared.report;

        let overlay = match prepared.overlay {
            Ok(overlay) => overlay,
            Err(BleedError::SynthesisFailure(reason)) => {
                warn!(%reason, "Padding synthesis failed, page left unchanged");
                report.outcome = Outcome::SynthesisSkipped;
                report.note = Some(reason);
                return Ok(Composed {
                    page: page.clone(),
                    report,
                });
            }
            Err(err) => return Err(err),
        };

        let mut composed = page.clone();
        composed.apply(&overlay)?;
        Ok(Composed {
            page: composed,
            report,
        })
    }

    /// Raster preview of what [`PageComposer::compose`] would produce.
    ///
    /// Unlike `compose`, a synthesis failure is returned as an error since
    /// there is nothing to show.
    #[instrument(skip_all)]
    pub fn preview(&self, page: &PdfPage, spec: &TargetSpec) -> Result<RgbImage> {
        let prepared = self.prepare(page, spec)?;
        let overlay = prepared.overlay?;
        Ok(render_preview(&prepared.raster, &overlay, spec.dpi))
    }

    /// Everything `compose` decides before touching the PDF.
    fn prepare(&self, page: &PdfPage, spec: &TargetSpec) -> Result<Prepared> {
        spec.validate()?;
        let geometry = checked_geometry(page)?;
        let (target_w, target_h) = spec.final_size_pt();

        let plan = ScalePlanner::plan(
            geometry,
            target_w,
            target_h,
            spec.allow_rotation,
            spec.fit_mode,
        );
        let raster = self.render(page, spec.dpi)?;
        let raster = if plan.rotated {
            raster.rotated_clockwise()
        } else {
            raster
        };

        let profile = BorderAnalyzer::from_spec(spec).detect(&raster);
        let strategy = choose_strategy(&profile, plan.scale_factor, spec);
        info!(
            scale = plan.scale_factor,
            rotated = plan.rotated,
            %strategy,
            "Composing page"
        );

        let overlay = BorderSynthesizer::synthesize(
            geometry,
            &raster,
            Some(&profile),
            &plan,
            spec,
            strategy,
            OperatingMode::Scaled,
        );

        let report = CompositionReport {
            outcome: Outcome::Composed,
            mode: OperatingMode::Scaled,
            strategy: Some(strategy),
            plan,
            profile: Some(profile),
            padding: layout(geometry, &plan, OperatingMode::Scaled).1,
            note: None,
        };
        Ok(Prepared {
            raster,
            overlay,
            report,
        })
    }

    /// Grow `page` outward to the target's final size without scaling it.
    ///
    /// Always uses smart stretch. A page larger than the target in either
    /// dimension is a `GeometryViolation`; a page already at the target size
    /// is returned unchanged.
    #[instrument(skip_all, fields(
        target_width_mm = spec.final_width_mm(),
        target_height_mm = spec.final_height_mm()
    ))]
    pub fn extend(&self, page: &PdfPage, spec: &TargetSpec) -> Result<Composed> {
        spec.validate()?;
        let geometry = checked_geometry(page)?;
        let (target_w, target_h) = spec.final_size_pt();
        let plan = ScalePlan::identity(target_w, target_h);

        for (dimension, have, want) in [
            ("width", geometry.width_pt, target_w),
            ("height", geometry.height_pt, target_h),
        ] {
            if have > want + GEOMETRY_EPSILON_PT {
                return Err(BleedError::GeometryViolation {
                    dimension,
                    page_mm: pt_to_mm(have),
                    target_mm: pt_to_mm(want),
                });
            }
        }

        let mut report = CompositionReport {
            outcome: Outcome::Composed,
            mode: OperatingMode::Unscaled,
            strategy: Some(FillStrategy::SmartStretch),
            plan,
            profile: None,
            padding: layout(geometry, &plan, OperatingMode::Unscaled).1,
            note: None,
        };

        if target_w - geometry.width_pt <= GEOMETRY_EPSILON_PT
            && target_h - geometry.height_pt <= GEOMETRY_EPSILON_PT
        {
            debug!("Page already at target size");
            report.outcome = Outcome::AlreadyFits;
            report.strategy = None;
            return Ok(Composed {
                page: page.clone(),
                report,
            });
        }

        let raster = self.render(page, spec.dpi)?;
        info!(
            pad_x_mm = pt_to_mm(report.padding.left),
            pad_y_mm = pt_to_mm(report.padding.bottom),
            "Extending page"
        );
        let synthesized = BorderSynthesizer::synthesize(
            geometry,
            &raster,
            None,
            &plan,
            spec,
            FillStrategy::SmartStretch,
            OperatingMode::Unscaled,
        );
        drop(raster);

        let overlay = match synthesized {
            Ok(overlay) => overlay,
            Err(BleedError::SynthesisFailure(reason)) => {
                warn!(%reason, "Bleed synthesis failed, page left unchanged");
                report.outcome = Outcome::SynthesisSkipped;
                report.note = Some(reason);
                return Ok(Composed {
                    page: page.clone(),
                    report,
                });
            }
            Err(err) => return Err(err),
        };

        let mut extended = page.clone();
        extended.apply(&overlay)?;
        Ok(Composed {
            page: extended,
            report,
        })
    }

    /// Border measurements for `page` as rendered at `spec.dpi`.
    #[instrument(skip_all)]
    pub fn analyze(&self, page: &PdfPage, spec: &TargetSpec) -> Result<BorderReport> {
        spec.validate()?;
        let raster = self.render(page, spec.dpi)?;
        let profile = BorderAnalyzer::from_spec(spec).detect(&raster);
        Ok(profile.report(&raster))
    }

    fn render(&self, page: &PdfPage, dpi: f32) -> Result<RasterSample> {
        let raster = self.rasterizer.render(page, dpi).map_err(|err| match err {
            BleedError::Rasterization { .. } => err,
            other => BleedError::rasterization(other.to_string()),
        })?;
        if raster.is_empty() {
            return Err(BleedError::rasterization("rasterizer returned an empty image"));
        }
        debug!(
            width = raster.width(),
            height = raster.height(),
            dpi,
            "Page rasterized"
        );
        Ok(raster)
    }
}

fn checked_geometry(page: &PdfPage) -> Result<PageGeometry> {
    let geometry = page.geometry();
    if geometry.width_pt > 0.0 && geometry.height_pt > 0.0 {
        Ok(geometry)
    } else {
        Err(BleedError::PdfError(format!(
            "page has an empty visible area ({}x{}pt)",
            geometry.width_pt, geometry.height_pt
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        blank_page_mm, bordered_rasterizer, gradient_rasterizer, uniform_rasterizer,
    };
    use bleedwerk_core::types::Color;

    const GREEN: [u8; 3] = [0, 140, 70];

    fn assert_size_mm(page: &PdfPage, width_mm: f32, height_mm: f32) {
        let geometry = page.geometry();
        assert!(
            (geometry.width_mm() - width_mm).abs() < 0.01,
            "width {} != {}",
            geometry.width_mm(),
            width_mm
        );
        assert!(
            (geometry.height_mm() - height_mm).abs() < 0.01,
            "height {} != {}",
            geometry.height_mm(),
            height_mm
        );
    }

    #[test]
    fn thick_border_is_flat_filled() {
        let composer = PageComposer::new(bordered_rasterizer(6.0, GREEN));
        let page = blank_page_mm(100.0, 100.0);
        let composed = composer
            .compose(&page, &TargetSpec::new(148.0, 105.0))
            .unwrap();

        assert!(composed.changed());
        assert_eq!(composed.report.strategy, Some(FillStrategy::FlatFill));
        let profile = composed.report.profile.as_ref().unwrap();
        assert_eq!(profile.aggregate_color, Some(Color::Rgb(GREEN)));
        assert_size_mm(&composed.page, 148.0, 105.0);
        assert_size_mm(&page, 100.0, 100.0);
    }

    #[test]
    fn thin_border_is_stretched() {
        let composer = PageComposer::new(bordered_rasterizer(1.0, GREEN));
        let composed = composer
            .compose(&blank_page_mm(100.0, 100.0), &TargetSpec::new(148.0, 105.0))
            .unwrap();
        assert_eq!(composed.report.strategy, Some(FillStrategy::SmartStretch));
    }

    #[test]
    fn borderless_content_is_stretched() {
        let composer = PageComposer::new(gradient_rasterizer());
        let composed = composer
            .compose(&blank_page_mm(80.0, 60.0), &TargetSpec::new(120.5, 90.0))
            .unwrap();
        assert_eq!(composed.report.strategy, Some(FillStrategy::SmartStretch));
        assert!(composed.report.profile.as_ref().unwrap().is_borderless());
        assert_size_mm(&composed.page, 120.5, 90.0);
    }

    #[test]
    fn degenerate_analysis_falls_back_to_stretch() {
        let composer = PageComposer::new(uniform_rasterizer(Color::Gray(230)));
        let composed = composer
            .compose(&blank_page_mm(100.0, 100.0), &TargetSpec::new(148.0, 105.0))
            .unwrap();
        assert!(composed.report.profile.as_ref().unwrap().is_degenerate());
        assert_eq!(composed.report.strategy, Some(FillStrategy::SmartStretch));
        assert_eq!(composed.report.outcome, Outcome::Composed);
    }

    #[test]
    fn portrait_page_is_turned_when_allowed() {
        let composer = PageComposer::new(gradient_rasterizer());
        let spec = TargetSpec::new(148.0, 105.0).with_rotation(true);
        let composed = composer
            .compose(&blank_page_mm(105.0, 148.0), &spec)
            .unwrap();
        assert!(composed.report.plan.rotated);
        assert_size_mm(&composed.page, 148.0, 105.0);
    }

    #[test]
    fn rasterizer_errors_are_reported_as_rasterization() {
        let failing = |_: &PdfPage, _: f32| -> Result<RasterSample> {
            Err(BleedError::PdfError("engine crashed".to_string()))
        };
        let composer = PageComposer::new(failing);
        let err = composer
            .compose(&blank_page_mm(100.0, 100.0), &TargetSpec::new(148.0, 105.0))
            .unwrap_err();
        assert!(matches!(err, BleedError::Rasterization { .. }));
    }

    #[test]
    fn empty_raster_is_a_rasterization_error() {
        let empty = |_: &PdfPage, _: f32| -> Result<RasterSample> {
            Ok(RasterSample::from_gray(image::GrayImage::new(0, 0), 150.0))
        };
        let composer = PageComposer::new(empty);
        assert!(matches!(
            composer.analyze(&blank_page_mm(10.0, 10.0), &TargetSpec::default()),
            Err(BleedError::Rasterization { .. })
        ));
    }

    #[test]
    fn unsampleable_raster_leaves_page_unchanged() {
        let tiny = |_: &PdfPage, dpi: f32| -> Result<RasterSample> {
            Ok(RasterSample::from_gray(image::GrayImage::new(2, 2), dpi))
        };
        let composer = PageComposer::new(tiny);
        let page = blank_page_mm(100.0, 100.0);
        let composed = composer
            .compose(&page, &TargetSpec::new(148.0, 105.0))
            .unwrap();
        assert_eq!(composed.report.outcome, Outcome::SynthesisSkipped);
        assert!(composed.report.note.is_some());
        assert!(!composed.changed());
        assert_size_mm(&composed.page, 100.0, 100.0);
    }

    #[test]
    fn extend_adds_bleed_on_every_side() {
        let composer = PageComposer::new(gradient_rasterizer());
        let spec = TargetSpec::new(148.0, 105.0).with_bleed(3.0);
        let extended = composer
            .extend(&blank_page_mm(148.0, 105.0), &spec)
            .unwrap();
        assert_eq!(extended.report.mode, OperatingMode::Unscaled);
        assert_eq!(extended.report.strategy, Some(FillStrategy::SmartStretch));
        assert!(extended.report.profile.is_none());
        assert_size_mm(&extended.page, 154.0, 111.0);
    }

    #[test]
    fn extend_with_zero_bleed_is_a_no_op() {
        let composer = PageComposer::new(gradient_rasterizer());
        let page = blank_page_mm(148.0, 105.0);
        let extended = composer
            .extend(&page, &TargetSpec::new(148.0, 105.0))
            .unwrap();
        assert_eq!(extended.report.outcome, Outcome::AlreadyFits);
        assert_eq!(extended.report.strategy, None);
        assert_eq!(
            extended.page.to_bytes().unwrap(),
            page.to_bytes().unwrap()
        );
    }

    #[test]
    fn extend_refuses_to_shrink() {
        let composer = PageComposer::new(gradient_rasterizer());
        let err = composer
            .extend(&blank_page_mm(160.0, 100.0), &TargetSpec::new(148.0, 105.0))
            .unwrap_err();
        match err {
            BleedError::GeometryViolation {
                dimension,
                page_mm,
                target_mm,
            } => {
                assert_eq!(dimension, "width");
                assert!((page_mm - 160.0).abs() < 0.01);
                assert!((target_mm - 148.0).abs() < 0.01);
            }
            other => panic!("expected geometry violation, got {other:?}"),
        }
    }

    #[test]
    fn analyze_reports_border_in_millimetres() {
        let composer = PageComposer::new(bordered_rasterizer(5.0, GREEN));
        let report = composer
            .analyze(&blank_page_mm(100.0, 70.0), &TargetSpec::default())
            .unwrap();
        assert!((report.left_mm - 5.0).abs() <= 0.2);
        assert_eq!(report.color.as_deref(), Some("008c46"));
    }

    #[test]
    fn preview_has_target_size() {
        let composer = PageComposer::new(gradient_rasterizer());
        let spec = TargetSpec::new(120.5, 90.0);
        let image = composer
            .preview(&blank_page_mm(80.0, 60.0), &spec)
            .unwrap();
        let (w, h) = spec.final_size_pt();
        assert_eq!(image.width(), (w * spec.dpi / 72.0).round() as u32);
        assert_eq!(image.height(), (h * spec.dpi / 72.0).round() as u32);
    }

    #[test]
    fn invalid_spec_is_rejected_before_rendering() {
        let composer = PageComposer::new(gradient_rasterizer());
        let spec = TargetSpec::new(0.0, 105.0);
        assert!(matches!(
            composer.compose(&blank_page_mm(100.0, 100.0), &spec),
            Err(BleedError::InvalidSpec(_))
        ));
    }
}
