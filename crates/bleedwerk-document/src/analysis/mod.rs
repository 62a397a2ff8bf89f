// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Analysis module: border detection over rendered page rasters.

pub mod border;
pub mod stats;

pub use border::{BorderAnalyzer, BorderProfile, BorderReport};
