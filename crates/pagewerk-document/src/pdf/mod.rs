// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — the page arena over lopdf and the page assembler.

pub(crate) mod crypt;
pub mod reader;
pub mod writer;

pub use reader::{Page, PdfDocument};
pub use writer::{PageAssembler, extract_pages};
