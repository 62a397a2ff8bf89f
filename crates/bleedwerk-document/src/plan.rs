// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scale planning: how much to scale a page, and whether to turn it, so it
// lands in the target box.

use bleedwerk_core::types::{FitMode, PageGeometry};
use serde::Serialize;
use tracing::debug;

/// Outcome of planning one page into one target box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScalePlan {
    /// Uniform scale applied to the page content.
    pub scale_factor: f32,
    /// Content is turned 90 degrees clockwise before placement.
    pub rotated: bool,
    /// Target width in the page's own frame (swapped when rotated).
    pub effective_target_width_pt: f32,
    /// Target height in the page's own frame (swapped when rotated).
    pub effective_target_height_pt: f32,
}

impl ScalePlan {
    /// No scaling, no rotation.
    pub fn identity(target_width_pt: f32, target_height_pt: f32) -> Self {
        Self {
            scale_factor: 1.0,
            rotated: false,
            effective_target_width_pt: target_width_pt,
            effective_target_height_pt: target_height_pt,
        }
    }

    /// Target size in the output frame.
    pub fn target_size(&self) -> (f32, f32) {
        if self.rotated {
            (
                self.effective_target_height_pt,
                self.effective_target_width_pt,
            )
        } else {
            (
                self.effective_target_width_pt,
                self.effective_target_height_pt,
            )
        }
    }

    /// Size the scaled page occupies in the output frame.
    pub fn content_size(&self, geometry: PageGeometry) -> (f32, f32) {
        let oriented = if self.rotated {
            geometry.swapped()
        } else {
            geometry
        };
        (
            oriented.width_pt * self.scale_factor,
            oriented.height_pt * self.scale_factor,
        )
    }

    /// Clockwise rotation applied to the content, in degrees.
    pub fn rotation_degrees(&self) -> i64 {
        if self.rotated { 90 } else { 0 }
    }
}

/// Chooses scale and orientation. Stateless.
pub struct ScalePlanner;

impl ScalePlanner {
    /// Plan `geometry` into a `target_width_pt` x `target_height_pt` box.
    ///
    /// `Fit` keeps the whole page visible; `Fill` covers the whole target.
    /// With `allow_rotation`, the turned orientation wins only when it is
    /// strictly better: more target covered for `Fit`, less content cropped
    /// for `Fill`.
    pub fn plan(
        geometry: PageGeometry,
        target_width_pt: f32,
        target_height_pt: f32,
        allow_rotation: bool,
        fit_mode: FitMode,
    ) -> ScalePlan {
        let upright = Self::orientation(geometry, target_width_pt, target_height_pt, fit_mode);
        let plan = ScalePlan {
            scale_factor: upright,
            rotated: false,
            effective_target_width_pt: target_width_pt,
            effective_target_height_pt: target_height_pt,
        };
        if !allow_rotation {
            return plan;
        }

        let turned = Self::orientation(geometry, target_height_pt, target_width_pt, fit_mode);
        let upright_score = Self::score(geometry, target_width_pt, target_height_pt, upright, fit_mode);
        let turned_score = Self::score(geometry, target_height_pt, target_width_pt, turned, fit_mode);
        debug!(upright_score, turned_score, "Orientation scores");

        if turned_score > upright_score {
            ScalePlan {
                scale_factor: turned,
                rotated: true,
                effective_target_width_pt: target_height_pt,
                effective_target_height_pt: target_width_pt,
            }
        } else {
            plan
        }
    }

    fn orientation(geometry: PageGeometry, tw: f32, th: f32, fit_mode: FitMode) -> f32 {
        let sx = tw / geometry.width_pt;
        let sy = th / geometry.height_pt;
        match fit_mode {
            FitMode::Fit => sx.min(sy),
            FitMode::Fill => sx.max(sy),
        }
    }

    fn score(geometry: PageGeometry, tw: f32, th: f32, scale: f32, fit_mode: FitMode) -> f32 {
        let content_area = geometry.width_pt * geometry.height_pt * scale * scale;
        let target_area = tw * th;
        match fit_mode {
            FitMode::Fit => content_area / target_area,
            FitMode::Fill => target_area / content_area,
        }
    }
}
