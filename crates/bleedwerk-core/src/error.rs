// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Bleedwerk.

use thiserror::Error;

use crate::types::Side;

/// Top-level error type for all Bleedwerk operations.
///
/// Every variant is reported per page. Whether one failing page aborts a
/// whole document is up to the caller.
#[derive(Debug, Error)]
pub enum BleedError {
    // -- Composition errors --
    #[error("rasterization failed: {reason}")]
    Rasterization { reason: String },

    #[error(
        "page {dimension} ({page_mm:.2}mm) is larger than target {dimension} ({target_mm:.2}mm); cannot expand to a smaller size"
    )]
    GeometryViolation {
        dimension: &'static str,
        page_mm: f32,
        target_mm: f32,
    },

    #[error("border analysis is degenerate: {side} border reached {thickness_px}px (limit {limit_px}px)")]
    AnalysisDegenerate {
        side: Side,
        thickness_px: u32,
        limit_px: u32,
    },

    #[error("border synthesis failed: {0}")]
    SynthesisFailure(String),

    #[error("invalid target spec: {0}")]
    InvalidSpec(String),

    // -- Document errors --
    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("page {page} out of range (document has {count} pages)")]
    PageNotFound { page: u32, count: usize },

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BleedError {
    /// Shorthand for a rasterization failure with a formatted reason.
    pub fn rasterization(reason: impl Into<String>) -> Self {
        Self::Rasterization {
            reason: reason.into(),
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BleedError>;
