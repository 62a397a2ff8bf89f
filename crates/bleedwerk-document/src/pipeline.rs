// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Two-pass print pipeline: normalize a page to the nominal print size, then
// extend it with bleed and mark the trim box.

use std::path::Path;

use bleedwerk_core::config::TargetSpec;
use bleedwerk_core::error::{BleedError, Result};
use bleedwerk_core::types::{Rect, mm_to_pt};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::compose::{CompositionReport, Outcome, PageComposer};
use crate::pdf::{PdfPage, PdfSource, assemble};
use crate::raster::PageRasterizer;

/// A print-ready page and the reports of both passes.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub page: PdfPage,
    pub nominal: CompositionReport,
    pub bleed: CompositionReport,
}

/// Outcome of one page in a batch.
#[derive(Debug)]
pub struct PageResult {
    /// 1-indexed position in the source document.
    pub page_number: u32,
    pub result: Result<PipelineOutput>,
}

/// Per-page results of [`BleedPipeline::process_document`].
#[derive(Debug, Default)]
pub struct BatchReport {
    pub pages: Vec<PageResult>,
}

/// Serializable one-line-per-page summary of a batch.
#[derive(Debug, Clone, Serialize)]
pub struct PageSummary {
    pub page_number: u32,
    pub nominal: Option<CompositionReport>,
    pub bleed: Option<CompositionReport>,
    pub error: Option<String>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.pages.iter().filter(|page| page.result.is_ok()).count()
    }

    /// Page numbers and errors of every failed page.
    pub fn failures(&self) -> impl Iterator<Item = (u32, &BleedError)> {
        self.pages.iter().filter_map(|page| match &page.result {
            Ok(_) => None,
            Err(err) => Some((page.page_number, err)),
        })
    }

    pub fn summary(&self) -> Vec<PageSummary> {
        self.pages
            .iter()
            .map(|page| match &page.result {
                Ok(output) => PageSummary {
                    page_number: page.page_number,
                    nominal: Some(output.nominal.clone()),
                    bleed: Some(output.bleed.clone()),
                    error: None,
                },
                Err(err) => PageSummary {
                    page_number: page.page_number,
                    nominal: None,
                    bleed: None,
                    error: Some(err.to_string()),
                },
            })
            .collect()
    }

    /// Proof copy of the successful pages with the cutting guide drawn on
    /// each: a gray band `tolerance_mm` wide over every trim edge and a
    /// dashed cut line.
    #[instrument(skip(self))]
    pub fn cut_preview(&self, tolerance_mm: f32) -> Result<Vec<u8>> {
        let mut pages = Vec::with_capacity(self.pages.len());
        for output in self.pages.iter().filter_map(|page| page.result.as_ref().ok()) {
            let mut page = output.page.clone();
            page.mark_cutting_area(mm_to_pt(tolerance_mm))?;
            pages.push(page);
        }
        if pages.is_empty() {
            return Err(BleedError::PdfError(
                "no page could be processed".to_string(),
            ));
        }
        assemble(pages.iter())
    }

    /// Assemble every successfully processed page, in order, into one PDF.
    pub fn into_document(self) -> Result<Vec<u8>> {
        let pages: Vec<PdfPage> = self
            .pages
            .into_iter()
            .filter_map(|page| page.result.ok())
            .map(|output| output.page)
            .collect();
        if pages.is_empty() {
            return Err(BleedError::PdfError(
                "no page could be processed".to_string(),
            ));
        }
        assemble(pages.iter())
    }

    /// Assemble the successful pages and write them to `path`.
    pub fn write_document(self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.into_document()?;
        std::fs::write(path.as_ref(), bytes)?;
        Ok(())
    }
}

/// Nominal composition followed by bleed extension.
pub struct BleedPipeline<R> {
    composer: PageComposer<R>,
}

impl<R: PageRasterizer> BleedPipeline<R> {
    pub fn new(rasterizer: R) -> Self {
        Self {
            composer: PageComposer::new(rasterizer),
        }
    }

    pub fn composer(&self) -> &PageComposer<R> {
        &self.composer
    }

    /// Produce the print version of one page.
    ///
    /// `nominal` is the trimmed format (its bleed is normally zero);
    /// `bleed` is the same format with the bleed margin. With a positive
    /// bleed the returned page's TrimBox is the nominal area.
    #[instrument(skip_all, fields(bleed_mm = bleed.bleed_mm))]
    pub fn process(
        &self,
        raw: &PdfPage,
        nominal: &TargetSpec,
        bleed: &TargetSpec,
    ) -> Result<PipelineOutput> {
        let first = self.composer.compose(raw, nominal)?;
        let second = self.composer.extend(&first.page, bleed)?;

        let mut page = second.page;
        if bleed.bleed_mm > 0.0 && second.report.outcome == Outcome::Composed {
            let margin = mm_to_pt(bleed.bleed_mm);
            let (width, height) = bleed.final_size_pt();
            page.set_trim_box(Rect::new(
                margin,
                margin,
                width - 2.0 * margin,
                height - 2.0 * margin,
            ))?;
        }

        Ok(PipelineOutput {
            page,
            nominal: first.report,
            bleed: second.report,
        })
    }

    /// Run [`BleedPipeline::process`] on every page of `source`.
    ///
    /// Pages are independent: a failing page is recorded and the batch
    /// continues.
    #[instrument(skip_all, fields(pages = source.page_count()))]
    pub fn process_document(
        &self,
        source: &PdfSource,
        nominal: &TargetSpec,
        bleed: &TargetSpec,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        for (page_number, page) in source.pages() {
            let result = page.and_then(|page| self.process(&page, nominal, bleed));
            if let Err(err) = &result {
                warn!(page = page_number, %err, "Page failed");
            }
            report.pages.push(PageResult {
                page_number,
                result,
            });
        }
        info!(
            succeeded = report.succeeded(),
            failed = report.pages.len() - report.succeeded(),
            "Batch complete"
        );
        report
    }
}
