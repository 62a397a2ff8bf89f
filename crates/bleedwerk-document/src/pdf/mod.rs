// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: single-page handles, source documents, assembly and test
// cards.

pub mod page;
pub mod reader;
pub mod writer;

pub use page::PdfPage;
pub use reader::{PdfSource, assemble};
pub use writer::TestCard;
