// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Split engine — partition one document into many independent outputs.
//
// Three modes: fixed-size chunks, explicit named ranges, one file per page.
// Each output unit is built and committed on its own. A unit that fails is
// logged and recorded; the remaining units still run.

use std::ops::Range;
use std::path::Path;

use pagewerk_core::error::{PagewerkError, Result};
use pagewerk_core::report::ErrorReport;
use pagewerk_core::types::SplitRange;
use pagewerk_security::{check_filename, sanitize_filename};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::pdf::{PdfDocument, extract_pages};
use crate::sink::{OutputRecord, OutputSink};

/// One output that was written.
#[derive(Debug, Clone, Serialize)]
pub struct SplitOutput {
    pub name: String,
    /// 1-based page numbers of the source contained in this output.
    pub pages: Vec<usize>,
    pub record: OutputRecord,
}

/// One output that could not be written.
#[derive(Debug, Clone, Serialize)]
pub struct SplitFailure {
    pub name: String,
    pub report: ErrorReport,
}

/// Outcome of a split: every unit ends up in exactly one of the two lists.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SplitReport {
    pub outputs: Vec<SplitOutput>,
    pub failures: Vec<SplitFailure>,
}

impl SplitReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct SplitEngine<'a> {
    document: &'a PdfDocument,
    base_name: String,
}

impl<'a> SplitEngine<'a> {
    /// Output names derive from the source file stem, or `document` for
    /// in-memory sources.
    pub fn new(document: &'a PdfDocument) -> Self {
        let base_name = document
            .source_path()
            .and_then(|path| Path::new(path).file_stem())
            .map(|stem| sanitize_filename(&stem.to_string_lossy()))
            .unwrap_or_else(|| "document".to_owned());
        Self {
            document,
            base_name,
        }
    }

    pub fn with_base_name(mut self, base_name: impl Into<String>) -> Self {
        self.base_name = base_name.into();
        self
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Output `k` holds pages `[k*n, min((k+1)*n, total))`.
    pub fn plan_by_count(total_pages: usize, pages_per_file: usize) -> Result<Vec<Range<usize>>> {
        if pages_per_file == 0 {
            return Err(PagewerkError::InvalidChunkSize(pages_per_file));
        }
        Ok((0..total_pages)
            .step_by(pages_per_file)
            .map(|start| start..(start + pages_per_file).min(total_pages))
            .collect())
    }

    /// Chunks of `pages_per_file` pages, named `<stem>_part_<k>`.
    #[instrument(skip_all, fields(pages_per_file = pages_per_file, base = %self.base_name))]
    pub fn split_by_count(
        &self,
        pages_per_file: usize,
        sink: &mut dyn OutputSink,
    ) -> Result<SplitReport> {
        self.document.ensure_readable()?;
        let plan = Self::plan_by_count(self.document.page_count(), pages_per_file)?;
        let mut report = SplitReport::default();
        for (k, range) in plan.into_iter().enumerate() {
            let name = format!("{}_part_{}", self.base_name, k + 1);
            self.emit(name, range, sink, &mut report);
        }
        self.log_summary("count", &report);
        Ok(report)
    }

    /// One output per range, named after the range (`split_<i>` when the
    /// name is blank). Ranges are clamped to the document; ranges left empty
    /// produce no output. Every name is checked before anything is written.
    #[instrument(skip_all, fields(ranges = ranges.len(), base = %self.base_name))]
    pub fn split_by_ranges(
        &self,
        ranges: &[SplitRange],
        sink: &mut dyn OutputSink,
    ) -> Result<SplitReport> {
        self.document.ensure_readable()?;
        let names = ranges
            .iter()
            .enumerate()
            .map(|(i, range)| {
                let name = match range.name.trim() {
                    "" => format!("split_{}", i + 1),
                    given => given.to_owned(),
                };
                check_filename(&name)?;
                Ok(name)
            })
            .collect::<Result<Vec<_>>>()?;

        let total = self.document.page_count();
        let mut report = SplitReport::default();
        for (range, name) in ranges.iter().zip(names) {
            match range.clamped(total) {
                Some(pages) => self.emit(name, pages, sink, &mut report),
                None => debug!(name = %name, start = range.start, end = range.end, "Skipping empty range"),
            }
        }
        self.log_summary("ranges", &report);
        Ok(report)
    }

    /// One output per page, named `<stem>_page_<n>`.
    #[instrument(skip_all, fields(base = %self.base_name))]
    pub fn split_all_pages(&self, sink: &mut dyn OutputSink) -> Result<SplitReport> {
        self.document.ensure_readable()?;
        let mut report = SplitReport::default();
        for index in 0..self.document.page_count() {
            let name = format!("{}_page_{}", self.base_name, index + 1);
            self.emit(name, index..index + 1, sink, &mut report);
        }
        self.log_summary("pages", &report);
        Ok(report)
    }

    fn emit(
        &self,
        name: String,
        pages: Range<usize>,
        sink: &mut dyn OutputSink,
        report: &mut SplitReport,
    ) {
        let page_numbers: Vec<usize> = pages.clone().map(|i| i + 1).collect();
        let written = extract_pages(self.document, pages).and_then(|bytes| sink.commit(&name, &bytes));
        match written {
            Ok(record) => report.outputs.push(SplitOutput {
                name,
                pages: page_numbers,
                record,
            }),
            Err(err) => {
                warn!(name = %name, %err, "Split output failed, continuing");
                report.failures.push(SplitFailure {
                    name,
                    report: ErrorReport::from_error(&err),
                });
            }
        }
    }

    fn log_summary(&self, mode: &str, report: &SplitReport) {
        info!(
            mode,
            written = report.outputs.len(),
            failed = report.failures.len(),
            "Split finished"
        );
    }
}
