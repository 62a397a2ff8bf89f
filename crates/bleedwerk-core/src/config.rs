// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Composition requests and production configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BleedError, Result};
use crate::types::{FitMode, PaperSize, mm_to_pt};

/// Everything one composition request needs. Passed explicitly into every
/// call; nothing is read from global state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetSpec {
    /// Nominal (trimmed) width in millimetres.
    pub width_mm: f32,
    /// Nominal (trimmed) height in millimetres.
    pub height_mm: f32,
    /// Bleed added on every side, in millimetres.
    pub bleed_mm: f32,
    /// Rasterization resolution for border analysis.
    pub dpi: f32,
    /// Color distance below which two pixels count as the same color.
    pub tolerance: f32,
    /// Rows/columns ignored at the physical raster edge (anti-aliasing).
    pub skip_pixels: u32,
    /// Smallest scaled border (mm) trusted for a flat fill.
    pub significance_threshold_mm: f32,
    /// Share of the border (or edge inset) the synthesized padding overlaps.
    pub overlap_factor: f32,
    /// How far padding extends past the page boundary, in points.
    pub overdue_border_pt: f32,
    /// Share of pixels in a stripe allowed to exceed `tolerance`.
    pub outlier_fraction: f32,
    /// Try a 90 degree turn when it fits the target better.
    pub allow_rotation: bool,
    pub fit_mode: FitMode,
}

impl Default for TargetSpec {
    fn default() -> Self {
        Self {
            width_mm: 148.0,
            height_mm: 105.0,
            bleed_mm: 0.0,
            dpi: 150.0,
            tolerance: 10.0,
            skip_pixels: 3,
            significance_threshold_mm: 3.0,
            overlap_factor: 0.5,
            overdue_border_pt: 1.0,
            outlier_fraction: 0.1,
            allow_rotation: false,
            fit_mode: FitMode::Fit,
        }
    }
}

impl TargetSpec {
    /// A target of the given nominal size with default analysis knobs.
    pub fn new(width_mm: f32, height_mm: f32) -> Self {
        Self {
            width_mm,
            height_mm,
            ..Self::default()
        }
    }

    pub fn with_bleed(mut self, bleed_mm: f32) -> Self {
        self.bleed_mm = bleed_mm;
        self
    }

    pub fn with_rotation(mut self, allow_rotation: bool) -> Self {
        self.allow_rotation = allow_rotation;
        self
    }

    /// Final width including bleed on both sides, in millimetres.
    pub fn final_width_mm(&self) -> f32 {
        self.width_mm + 2.0 * self.bleed_mm
    }

    /// Final height including bleed on both sides, in millimetres.
    pub fn final_height_mm(&self) -> f32 {
        self.height_mm + 2.0 * self.bleed_mm
    }

    /// Final (bleed-inclusive) size in points.
    pub fn final_size_pt(&self) -> (f32, f32) {
        (
            mm_to_pt(self.final_width_mm()),
            mm_to_pt(self.final_height_mm()),
        )
    }

    /// Reject specs no composition can satisfy.
    pub fn validate(&self) -> Result<()> {
        if !(self.width_mm > 0.0 && self.height_mm > 0.0) {
            return Err(BleedError::InvalidSpec(format!(
                "target size must be positive, got {}x{}mm",
                self.width_mm, self.height_mm
            )));
        }
        if !(self.bleed_mm >= 0.0) {
            return Err(BleedError::InvalidSpec(format!(
                "bleed must not be negative, got {}mm",
                self.bleed_mm
            )));
        }
        if !(self.dpi > 0.0) {
            return Err(BleedError::InvalidSpec(format!(
                "dpi must be positive, got {}",
                self.dpi
            )));
        }
        if !(0.0..1.0).contains(&self.outlier_fraction) {
            return Err(BleedError::InvalidSpec(format!(
                "outlier fraction must be in [0, 1), got {}",
                self.outlier_fraction
            )));
        }
        if self.tolerance < 0.0 || self.overlap_factor < 0.0 || self.overdue_border_pt < 0.0 {
            return Err(BleedError::InvalidSpec(
                "tolerance, overlap factor and overdue border must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Persistent production settings: one print product, its bleed, and the
/// analysis knobs shared by both pipeline passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductionConfig {
    /// Nominal print format.
    pub format: PaperSize,
    /// Lay the format out with the long edge horizontal.
    pub landscape: bool,
    /// Bleed added on each side for the print version.
    pub bleed_mm: f32,
    /// Analysis and synthesis knobs. Its size fields are ignored; the size
    /// comes from `format`.
    pub analysis: TargetSpec,
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            format: PaperSize::A6,
            landscape: true,
            bleed_mm: 3.0,
            analysis: TargetSpec::default(),
        }
    }
}

impl ProductionConfig {
    /// Load settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.nominal_spec().validate()?;
        Ok(config)
    }

    /// Write settings to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), raw)?;
        Ok(())
    }

    fn format_mm(&self) -> (f32, f32) {
        if self.landscape {
            self.format.landscape()
        } else {
            self.format.portrait()
        }
    }

    /// Target for the first pass: normalize to the pure print size.
    pub fn nominal_spec(&self) -> TargetSpec {
        let (width_mm, height_mm) = self.format_mm();
        TargetSpec {
            width_mm,
            height_mm,
            bleed_mm: 0.0,
            ..self.analysis.clone()
        }
    }

    /// Target for the second pass: extend by the bleed margin.
    pub fn bleed_spec(&self) -> TargetSpec {
        TargetSpec {
            bleed_mm: self.bleed_mm,
            ..self.nominal_spec()
        }
    }
}
