// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagewerk-document — The document transformation engine.
//
// Parses PDFs into a page arena, resolves page selections, merges and splits
// documents, runs the layered compression pipeline, recovers access to
// password-protected files, and turns images into PDFs. Finished documents
// leave through an output sink.

pub mod compress;
pub mod convert;
pub mod inspect;
pub mod merge;
pub mod pdf;
pub mod range;
pub mod sink;
pub mod split;
pub mod unlock;

#[cfg(test)]
mod testing;

// Re-export the primary entry points so callers can use `pagewerk_document::MergeEngine` etc.
pub use compress::{
    CompressionOutcome, CompressionPipeline, ExternalOptimizer, Ghostscript, NoOptimizer,
    estimate_compression,
};
pub use convert::{ImageConversionReport, ImageConverter, SUPPORTED_IMAGE_EXTENSIONS};
pub use inspect::{inspect, inspect_file};
pub use merge::{MergeEngine, MergeInput, MergeReport, MergeSource, MergeSummary};
pub use pdf::{Page, PageAssembler, PdfDocument, extract_pages};
pub use range::resolve_page_range;
pub use sink::{DirectorySink, MemorySink, OutputRecord, OutputSink};
pub use split::{SplitEngine, SplitFailure, SplitOutput, SplitReport};
pub use unlock::{CredentialRecovery, Decryptable, UnlockOutcome, unlock_with_password};
