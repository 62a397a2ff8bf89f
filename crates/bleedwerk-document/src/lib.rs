// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// bleedwerk-document: page composition for print production.
//
// Scales PDF pages into a target format, detects solid borders on the
// rasterized page, synthesizes matching padding (flat fill or stretched
// edges), and extends finished pages with bleed.

pub mod analysis;
pub mod compose;
pub mod pdf;
pub mod pipeline;
pub mod plan;
pub mod preview;
pub mod raster;
pub mod synth;

// Re-export the primary types so callers can use `bleedwerk_document::PageComposer` etc.
pub use analysis::{BorderAnalyzer, BorderProfile, BorderReport};
pub use compose::{Composed, CompositionReport, Outcome, PageComposer};
pub use pdf::{PdfPage, PdfSource, TestCard};
pub use pipeline::{BatchReport, BleedPipeline, PipelineOutput};
pub use plan::{ScalePlan, ScalePlanner};
pub use raster::{PageRasterizer, RasterSample};
pub use synth::{BorderSynthesizer, OverlayInstructions};

#[cfg(feature = "pdfium")]
pub use raster::PdfiumRasterizer;
