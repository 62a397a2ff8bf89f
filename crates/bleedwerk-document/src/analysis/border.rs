// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Border detection: walk inward from each raster edge while the stripes stay
// uniform, then average the color of the detected bands.

use bleedwerk_core::config::TargetSpec;
use bleedwerk_core::error::{BleedError, Result};
use bleedwerk_core::types::{Color, Side};
use serde::Serialize;
use tracing::{debug, instrument, trace};

use super::stats::{mean_color, median_color};
use crate::raster::RasterSample;

/// Uniform-border thickness on each side of a raster, in pixels, measured
/// from the physical edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BorderProfile {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
    /// Mean color over every detected band; `None` when no side has a border.
    pub aggregate_color: Option<Color>,
    /// Raster resolution the thicknesses were measured at.
    pub pixels_per_mm: f32,
    /// First side whose walk ran into the half-dimension limit.
    #[serde(skip)]
    degenerate: Option<(Side, u32)>,
}

impl BorderProfile {
    /// A profile without any border, e.g. for content-only pages.
    pub fn borderless(pixels_per_mm: f32) -> Self {
        Self {
            top: 0,
            bottom: 0,
            left: 0,
            right: 0,
            aggregate_color: None,
            pixels_per_mm,
            degenerate: None,
        }
    }

    pub fn thickness(&self, side: Side) -> u32 {
        match side {
            Side::Top => self.top,
            Side::Bottom => self.bottom,
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub fn thickness_mm(&self, side: Side) -> f32 {
        self.thickness(side) as f32 / self.pixels_per_mm
    }

    /// Thinnest side in pixels.
    pub fn min_thickness(&self) -> u32 {
        Side::ALL
            .iter()
            .map(|&side| self.thickness(side))
            .min()
            .unwrap_or(0)
    }

    /// Thinnest side in millimetres after the content is scaled by `scale`.
    pub fn scaled_min_mm(&self, scale: f32) -> f32 {
        self.min_thickness() as f32 / self.pixels_per_mm * scale
    }

    pub fn is_borderless(&self) -> bool {
        Side::ALL.iter().all(|&side| self.thickness(side) == 0)
    }

    pub fn is_degenerate(&self) -> bool {
        self.degenerate.is_some()
    }

    /// Fail when a side's walk consumed half the raster, which means the
    /// "border" is really the whole page.
    pub fn ensure_confident(&self) -> Result<()> {
        match self.degenerate {
            Some((side, limit_px)) => Err(BleedError::AnalysisDegenerate {
                side,
                thickness_px: self.thickness(side),
                limit_px,
            }),
            None => Ok(()),
        }
    }

    /// Physical summary for reporting.
    pub fn report(&self, raster: &RasterSample) -> BorderReport {
        BorderReport {
            top_mm: self.thickness_mm(Side::Top),
            bottom_mm: self.thickness_mm(Side::Bottom),
            left_mm: self.thickness_mm(Side::Left),
            right_mm: self.thickness_mm(Side::Right),
            color: self.aggregate_color.map(Color::to_hex),
            page_width_mm: raster.width_mm(),
            page_height_mm: raster.height_mm(),
            degenerate: self.is_degenerate(),
        }
    }
}

/// Border sizes in millimetres and the border color, as printed by the
/// `analyze` command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BorderReport {
    pub top_mm: f32,
    pub bottom_mm: f32,
    pub left_mm: f32,
    pub right_mm: f32,
    /// `rrggbb`, absent when no border was found.
    pub color: Option<String>,
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub degenerate: bool,
}

/// Detects uniform borders in a raster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderAnalyzer {
    tolerance: f32,
    skip_pixels: u32,
    outlier_fraction: f32,
}

impl Default for BorderAnalyzer {
    fn default() -> Self {
        Self::from_spec(&TargetSpec::default())
    }
}

impl BorderAnalyzer {
    pub fn new(tolerance: f32, skip_pixels: u32, outlier_fraction: f32) -> Self {
        Self {
            tolerance,
            skip_pixels,
            outlier_fraction,
        }
    }

    pub fn from_spec(spec: &TargetSpec) -> Self {
        Self::new(spec.tolerance, spec.skip_pixels, spec.outlier_fraction)
    }

    /// Measure the border on every side of `raster`.
    ///
    /// The first `skip_pixels` stripes are never inspected. Walking stops at
    /// the first non-uniform stripe or at half the raster dimension, whichever
    /// comes first; reaching the limit marks the profile degenerate.
    #[instrument(skip_all, fields(width = raster.width(), height = raster.height()))]
    pub fn detect(&self, raster: &RasterSample) -> BorderProfile {
        let mut profile = BorderProfile::borderless(raster.pixels_per_mm());
        if raster.is_empty() {
            return profile;
        }

        for side in Side::ALL {
            let (thickness, limit) = self.measure_side(raster, side);
            match side {
                Side::Top => profile.top = thickness,
                Side::Bottom => profile.bottom = thickness,
                Side::Left => profile.left = thickness,
                Side::Right => profile.right = thickness,
            }
            if let Some(limit_px) = limit
                && profile.degenerate.is_none()
            {
                profile.degenerate = Some((side, limit_px));
            }
        }

        profile.aggregate_color = self.band_color(raster, &profile);

        debug!(
            top = profile.top,
            bottom = profile.bottom,
            left = profile.left,
            right = profile.right,
            color = ?profile.aggregate_color,
            degenerate = profile.is_degenerate(),
            "Border detected"
        );
        profile
    }

    /// True when at most `outlier_fraction` of the stripe deviates from the
    /// stripe's median by more than `tolerance`.
    pub fn is_uniform(&self, stripe: &[Color]) -> bool {
        let Some(reference) = median_color(stripe) else {
            return false;
        };
        let len = stripe.len() as f32;
        let within = stripe
            .iter()
            .filter(|&&c| c.distance(reference) <= self.tolerance)
            .count() as f32;
        within >= len - len * self.outlier_fraction
    }

    /// Thickness on one side, plus the walk limit when it was reached.
    fn measure_side(&self, raster: &RasterSample, side: Side) -> (u32, Option<u32>) {
        let limit = raster.depth(side) / 2;
        let mut thickness = 0;
        for index in self.skip_pixels..limit {
            if !self.is_uniform(&raster.line(side, index)) {
                trace!(%side, index, "Stripe not uniform");
                return (thickness, None);
            }
            thickness = index + 1;
        }
        if thickness > 0 && thickness == limit {
            (thickness, Some(limit))
        } else {
            (thickness, None)
        }
    }

    /// Mean color over the union of the four bands, excluding the skipped
    /// outer pixels. Corner pixels count once.
    ///
    /// On an axis too short to skip `skip_pixels` from both ends, the skip
    /// shrinks so at least the middle line survives.
    fn band_color(&self, raster: &RasterSample, profile: &BorderProfile) -> Option<Color> {
        if profile.is_borderless() {
            return None;
        }
        let (w, h) = (raster.width(), raster.height());
        let skip_x = self.skip_pixels.min(w.saturating_sub(1) / 2);
        let skip_y = self.skip_pixels.min(h.saturating_sub(1) / 2);
        let (top, bottom) = (profile.top, h - profile.bottom);
        let (left, right) = (profile.left, w - profile.right);

        let pixels = (skip_y..h - skip_y).flat_map(move |y| {
            let full_row = y < top || y >= bottom;
            let columns: Box<dyn Iterator<Item = u32>> = if full_row {
                Box::new(skip_x..w - skip_x)
            } else {
                Box::new((skip_x..left.max(skip_x)).chain(right.min(w - skip_x)..w - skip_x))
            };
            columns.map(move |x| raster.pixel(x, y))
        });
        mean_color(pixels)
    }
}
