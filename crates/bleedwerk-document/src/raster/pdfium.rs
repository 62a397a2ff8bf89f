// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDFium-backed page rasterizer.

use std::path::Path;

use bleedwerk_core::error::{BleedError, Result};
use pdfium_render::prelude::*;
use tracing::{debug, instrument};

use super::{PageRasterizer, RasterSample};
use crate::pdf::PdfPage;

/// Library directory tried (relative to the working directory) before the
/// system search path.
const VENDOR_LIBRARY_DIR: &str = "vendor/pdfium/lib";

/// Renders pages through a bound PDFium library.
pub struct PdfiumRasterizer {
    pdfium: Pdfium,
}

impl PdfiumRasterizer {
    /// Bind PDFium from `vendor/pdfium/lib` if present, else from the system.
    pub fn new() -> Result<Self> {
        let vendor_dir = std::env::current_dir()
            .ok()
            .map(|dir| dir.join(VENDOR_LIBRARY_DIR))
            .filter(|dir| dir.exists());

        if let Some(dir) = vendor_dir
            && let Ok(rasterizer) = Self::with_library_dir(&dir)
        {
            return Ok(rasterizer);
        }

        let bindings = Pdfium::bind_to_system_library()
            .map_err(|err| BleedError::rasterization(format!("cannot bind PDFium: {}", err)))?;
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }

    /// Bind the PDFium library found in `dir`.
    pub fn with_library_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let bindings =
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)).map_err(
                |err| {
                    BleedError::rasterization(format!(
                        "cannot bind PDFium from {}: {}",
                        dir.display(),
                        err
                    ))
                },
            )?;
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }
}

impl PageRasterizer for PdfiumRasterizer {
    #[instrument(skip(self, page), fields(dpi))]
    fn render(&self, page: &PdfPage, dpi: f32) -> Result<RasterSample> {
        let geometry = page.geometry();
        let scale = dpi / 72.0;
        let width_px = (geometry.width_pt * scale).round().max(1.0) as i32;
        let height_px = (geometry.height_pt * scale).round().max(1.0) as i32;

        let bytes = page
            .to_bytes()
            .map_err(|err| BleedError::rasterization(err.to_string()))?;
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(&bytes, None)
            .map_err(|err| BleedError::rasterization(format!("cannot load page: {}", err)))?;
        let pdf_page = document
            .pages()
            .get(0)
            .map_err(|err| BleedError::rasterization(format!("cannot open page: {}", err)))?;

        let config = PdfRenderConfig::new()
            .set_target_width(width_px)
            .set_target_height(height_px);
        let bitmap = pdf_page
            .render_with_config(&config)
            .map_err(|err| BleedError::rasterization(format!("cannot render page: {}", err)))?;

        let width = bitmap.width() as u32;
        let height = bitmap.height() as u32;
        let rgba = bitmap.as_rgba_bytes().to_vec();
        debug!(width, height, "Page rasterized");

        RasterSample::from_rgba_bytes(width, height, rgba, dpi)
    }
}
