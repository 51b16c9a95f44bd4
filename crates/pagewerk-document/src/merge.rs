// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Merge engine — concatenate selected pages of several documents into one.
//
// Output page order is source order, then ascending page order within each
// source. The whole output is assembled in memory and handed to the sink only
// once every page has been copied, so a failed merge writes nothing.

use std::path::PathBuf;

use pagewerk_core::config::EngineConfig;
use pagewerk_core::error::{PagewerkError, Result};
use pagewerk_core::types::PageSelection;
use pagewerk_security::check_filename;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::pdf::{PageAssembler, PdfDocument};
use crate::range::resolve_page_range;
use crate::sink::{OutputRecord, OutputSink};

/// One parsed input. `selection: None` means every page.
#[derive(Clone)]
pub struct MergeSource<'a> {
    pub document: &'a PdfDocument,
    pub selection: Option<PageSelection>,
}

impl<'a> MergeSource<'a> {
    pub fn all(document: &'a PdfDocument) -> Self {
        Self {
            document,
            selection: None,
        }
    }

    pub fn pages(document: &'a PdfDocument, selection: PageSelection) -> Self {
        Self {
            document,
            selection: Some(selection),
        }
    }

    /// Indices to copy, re-checked against this document's page count.
    /// A document still locked behind a password is refused.
    fn resolved(&self) -> Result<PageSelection> {
        self.document.ensure_readable()?;
        let total = self.document.page_count();
        match &self.selection {
            None => Ok(PageSelection::all(total)),
            Some(selection) => PageSelection::from_indices(selection.iter(), total),
        }
    }
}

/// One input file for [`MergeEngine::merge_files`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeInput {
    pub path: PathBuf,
    /// Page expression such as `"1-3,5"`; absent or `"all"` takes every page.
    #[serde(default)]
    pub pages: Option<String>,
}

impl MergeInput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pages: None,
        }
    }

    pub fn with_pages(mut self, pages: impl Into<String>) -> Self {
        self.pages = Some(pages.into());
        self
    }
}

/// What a successful merge produced.
#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    pub output: OutputRecord,
    pub page_count: usize,
    /// Sources that contributed at least one page.
    pub source_count: usize,
}

pub struct MergeEngine {
    max_sources: usize,
}

impl Default for MergeEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl MergeEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            max_sources: config.max_merge_sources,
        }
    }

    /// Assemble the merged document and return its bytes.
    #[instrument(skip_all, fields(sources = sources.len()))]
    pub fn merge_documents(&self, sources: &[MergeSource<'_>]) -> Result<(Vec<u8>, MergeSummary)> {
        self.check_source_count(sources.len())?;

        let mut plan = Vec::with_capacity(sources.len());
        for source in sources {
            let selection = source.resolved()?;
            if !selection.is_empty() {
                plan.push((source.document, selection));
            }
        }
        if plan.len() < 2 {
            return Err(PagewerkError::InsufficientInputs(plan.len()));
        }

        let mut assembler = PageAssembler::new();
        for (document, selection) in &plan {
            assembler.append_pages(document, selection.iter())?;
        }
        let summary = MergeSummary {
            page_count: assembler.page_count(),
            source_count: plan.len(),
        };
        let bytes = assembler.to_bytes()?;
        debug!(pages = summary.page_count, bytes_len = bytes.len(), "Merge assembled");
        Ok((bytes, summary))
    }

    /// Merge already-parsed documents and commit the result as `name`.
    pub fn merge(
        &self,
        sources: &[MergeSource<'_>],
        sink: &mut dyn OutputSink,
        name: &str,
    ) -> Result<MergeReport> {
        check_filename(name)?;
        let (bytes, summary) = self.merge_documents(sources)?;
        let output = sink.commit(name, &bytes)?;
        info!(
            output = name,
            pages = summary.page_count,
            sources = summary.source_count,
            "Merged PDF"
        );
        Ok(MergeReport {
            output,
            page_count: summary.page_count,
            source_count: summary.source_count,
        })
    }

    /// Open every input, resolve its page expression, then merge.
    ///
    /// All inputs are opened before any page is copied; a missing file fails
    /// the call with nothing written.
    #[instrument(skip_all, fields(inputs = inputs.len(), output = name))]
    pub fn merge_files(
        &self,
        inputs: &[MergeInput],
        sink: &mut dyn OutputSink,
        name: &str,
    ) -> Result<MergeReport> {
        self.check_source_count(inputs.len())?;
        check_filename(name)?;

        let documents = inputs
            .iter()
            .map(|input| PdfDocument::open(&input.path))
            .collect::<Result<Vec<_>>>()?;

        let mut sources = Vec::with_capacity(documents.len());
        for (input, document) in inputs.iter().zip(&documents) {
            document.ensure_readable()?;
            let selection = match input.pages.as_deref() {
                Some(expr) => Some(resolve_page_range(expr, document.page_count())?),
                None => None,
            };
            sources.push(MergeSource {
                document,
                selection,
            });
        }

        self.merge(&sources, sink, name)
    }

    fn check_source_count(&self, count: usize) -> Result<()> {
        if count > self.max_sources {
            return Err(PagewerkError::TooManySources {
                count,
                max: self.max_sources,
            });
        }
        Ok(())
    }
}

/// Page and source totals of an assembled merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    pub page_count: usize,
    pub source_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{DirectorySink, MemorySink};
    use crate::split::SplitEngine;
    use crate::testing::{encrypted_pdf, labelled_pdf, page_text};

    #[test]
    fn merge_then_split_preserves_page_order() {
        let a = PdfDocument::from_bytes(&labelled_pdf(&["A1", "A2"])).expect("a");
        let b = PdfDocument::from_bytes(&labelled_pdf(&["B1", "B2", "B3"])).expect("b");

        let mut sink = MemorySink::new();
        let report = MergeEngine::default()
            .merge(&[MergeSource::all(&a), MergeSource::all(&b)], &mut sink, "merged")
            .expect("merge");
        assert_eq!(report.page_count, 5);
        assert_eq!(report.source_count, 2);

        let merged = PdfDocument::from_bytes(sink.get("merged").expect("output")).expect("reload");
        let mut pages = MemorySink::new();
        let split = SplitEngine::new(&merged).split_all_pages(&mut pages).expect("split");
        assert!(split.failures.is_empty());

        let expected = ["A1", "A2", "B1", "B2", "B3"];
        assert_eq!(pages.documents().len(), expected.len());
        for ((_, bytes), label) in pages.documents().iter().zip(expected) {
            let single = PdfDocument::from_bytes(bytes).expect("page doc");
            assert_eq!(single.page_count(), 1);
            assert!(page_text(&single, 0).contains(label), "expected {label}");
        }
    }

    #[test]
    fn selections_are_copied_in_ascending_order() {
        let a = PdfDocument::from_bytes(&labelled_pdf(&["A1", "A2", "A3"])).expect("a");
        let b = PdfDocument::from_bytes(&labelled_pdf(&["B1", "B2"])).expect("b");
        let selection = PageSelection::from_indices([2, 0], 3).expect("selection");

        let (bytes, summary) = MergeEngine::default()
            .merge_documents(&[MergeSource::pages(&a, selection), MergeSource::all(&b)])
            .expect("merge");
        assert_eq!(summary.page_count, 4);

        let merged = PdfDocument::from_bytes(&bytes).expect("reload");
        assert!(page_text(&merged, 0).contains("A1"));
        assert!(page_text(&merged, 1).contains("A3"));
        assert!(page_text(&merged, 2).contains("B1"));
    }

    #[test]
    fn single_contributing_source_is_insufficient() {
        let a = PdfDocument::from_bytes(&labelled_pdf(&["A1"])).expect("a");
        let b = PdfDocument::from_bytes(&labelled_pdf(&["B1"])).expect("b");
        let empty = PageSelection::from_indices([], 1).expect("empty");

        let engine = MergeEngine::default();
        assert!(matches!(
            engine.merge_documents(&[MergeSource::all(&a)]),
            Err(PagewerkError::InsufficientInputs(1))
        ));
        assert!(matches!(
            engine.merge_documents(&[MergeSource::all(&a), MergeSource::pages(&b, empty)]),
            Err(PagewerkError::InsufficientInputs(1))
        ));
    }

    #[test]
    fn selection_from_another_document_is_rejected() {
        let long = PdfDocument::from_bytes(&labelled_pdf(&["L1", "L2", "L3"])).expect("long");
        let short = PdfDocument::from_bytes(&labelled_pdf(&["S1"])).expect("short");
        let selection = PageSelection::from_indices([2], 3).expect("selection");

        let result = MergeEngine::default()
            .merge_documents(&[MergeSource::all(&long), MergeSource::pages(&short, selection)]);
        assert!(matches!(result, Err(PagewerkError::InvalidPageNumber(_))));
    }

    #[test]
    fn merge_files_resolves_expressions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a_path = dir.path().join("a.pdf");
        let b_path = dir.path().join("b.pdf");
        std::fs::write(&a_path, labelled_pdf(&["A1", "A2", "A3"])).expect("write a");
        std::fs::write(&b_path, labelled_pdf(&["B1", "B2"])).expect("write b");

        let mut sink = DirectorySink::new(dir.path().join("out")).expect("sink");
        let inputs = [
            MergeInput::new(&a_path).with_pages("2-3"),
            MergeInput::new(&b_path).with_pages("all"),
        ];
        let report = MergeEngine::default()
            .merge_files(&inputs, &mut sink, "combined")
            .expect("merge");
        assert_eq!(report.page_count, 4);

        let merged = PdfDocument::open(report.output.path.expect("path")).expect("reload");
        assert_eq!(merged.page_count(), 4);
        assert!(page_text(&merged, 0).contains("A2"));
    }

    #[test]
    fn missing_source_fails_before_writing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a_path = dir.path().join("a.pdf");
        std::fs::write(&a_path, labelled_pdf(&["A1"])).expect("write a");

        let out = dir.path().join("out");
        let mut sink = DirectorySink::new(&out).expect("sink");
        let inputs = [MergeInput::new(&a_path), MergeInput::new(dir.path().join("gone.pdf"))];
        let result = MergeEngine::default().merge_files(&inputs, &mut sink, "combined");

        assert!(matches!(result, Err(PagewerkError::SourceNotFound(_))));
        assert_eq!(std::fs::read_dir(&out).expect("list").count(), 0);
    }

    #[test]
    fn locked_source_is_refused_not_skipped() {
        let a = PdfDocument::from_bytes(&labelled_pdf(&["A1"])).expect("a");
        let b = PdfDocument::from_bytes(&labelled_pdf(&["B1"])).expect("b");
        let locked = PdfDocument::from_bytes(&encrypted_pdf(2, "secret", "owner-secret")).expect("locked");

        let mut sink = MemorySink::new();
        let result = MergeEngine::default().merge(
            &[MergeSource::all(&a), MergeSource::all(&locked), MergeSource::all(&b)],
            &mut sink,
            "merged",
        );
        assert!(matches!(result, Err(PagewerkError::Encrypted)));
        assert!(sink.documents().is_empty());
    }

    #[test]
    fn locked_file_with_page_expression_asks_for_password() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a_path = dir.path().join("a.pdf");
        let locked_path = dir.path().join("locked.pdf");
        std::fs::write(&a_path, labelled_pdf(&["A1"])).expect("write a");
        std::fs::write(&locked_path, encrypted_pdf(2, "secret", "owner-secret")).expect("write locked");

        let inputs = [MergeInput::new(&a_path), MergeInput::new(&locked_path).with_pages("1")];
        let result = MergeEngine::default().merge_files(&inputs, &mut MemorySink::new(), "combined");
        assert!(matches!(result, Err(PagewerkError::Encrypted)));
    }

    #[test]
    fn too_many_sources() {
        let config = EngineConfig {
            max_merge_sources: 2,
            ..EngineConfig::default()
        };
        let inputs = vec![MergeInput::new("x.pdf"); 3];
        let result = MergeEngine::new(&config).merge_files(&inputs, &mut MemorySink::new(), "out");
        assert!(matches!(
            result,
            Err(PagewerkError::TooManySources { count: 3, max: 2 })
        ));
    }
}
