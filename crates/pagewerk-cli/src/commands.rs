// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command handlers — each turns parsed arguments into one engine call and a
// JSON result record.

use std::path::{Path, PathBuf};

use pagewerk_core::error::{PagewerkError, Result};
use pagewerk_core::types::{CompressionLevel, PageSize, SplitRange};
use pagewerk_core::EngineConfig;
use pagewerk_document::{
    CompressionPipeline, CredentialRecovery, DirectorySink, ImageConverter, MergeEngine, MergeInput,
    OutputSink, PdfDocument, SplitEngine, UnlockOutcome, estimate_compression, inspect_file,
};
use serde_json::{Value, json};
use tracing::info;

use crate::Command;

/// What to print, and whether the command achieved its goal.
pub(crate) struct CommandOutput {
    pub(crate) record: Value,
    pub(crate) success: bool,
}

impl CommandOutput {
    fn ok(record: Value) -> Self {
        Self {
            record,
            success: true,
        }
    }
}

pub(crate) fn run(command: Command, config: &EngineConfig) -> Result<CommandOutput> {
    match command {
        Command::Inspect { file, estimate } => inspect(&file, estimate),
        Command::Merge { inputs, out, name } => merge(&inputs, &out, &name, config),
        Command::Split {
            file,
            out,
            every,
            range,
        } => split(&file, &out, every, &range),
        Command::Compress {
            file,
            out,
            level,
            name,
        } => compress(&file, &out, &level, name, config),
        Command::Unlock {
            file,
            out,
            password,
            candidates,
        } => unlock(&file, &out, password.as_deref(), candidates, config),
        Command::Unrestrict {
            file,
            out,
            password,
        } => unrestrict(&file, &out, password.as_deref()),
        Command::Images {
            inputs,
            out,
            name,
            page_size,
        } => images(&inputs, &out, &name, &page_size),
    }
}

fn inspect(file: &Path, estimate: bool) -> Result<CommandOutput> {
    let info = inspect_file(file)?;
    let mut record = serde_json::to_value(&info)?;
    if estimate {
        let document = PdfDocument::open(file)?;
        record["estimate"] = serde_json::to_value(estimate_compression(&document))?;
    }
    Ok(CommandOutput::ok(record))
}

fn merge(inputs: &[String], out: &Path, name: &str, config: &EngineConfig) -> Result<CommandOutput> {
    let inputs: Vec<MergeInput> = inputs.iter().map(|arg| parse_merge_input(arg)).collect();
    let mut sink = DirectorySink::new(out)?;
    let report = MergeEngine::new(config).merge_files(&inputs, &mut sink, name)?;
    Ok(CommandOutput::ok(serde_json::to_value(&report)?))
}

fn split(file: &Path, out: &Path, every: Option<usize>, ranges: &[String]) -> Result<CommandOutput> {
    let document = PdfDocument::open(file)?;
    let engine = SplitEngine::new(&document);
    let mut sink = DirectorySink::new(out)?;

    let report = match (every, ranges.is_empty()) {
        (Some(pages_per_file), _) => engine.split_by_count(pages_per_file, &mut sink)?,
        (None, false) => {
            let parsed = ranges
                .iter()
                .map(|arg| parse_split_range(arg, document.page_count()))
                .collect::<Result<Vec<_>>>()?;
            engine.split_by_ranges(&parsed, &mut sink)?
        }
        (None, true) => engine.split_all_pages(&mut sink)?,
    };

    Ok(CommandOutput {
        success: report.is_complete(),
        record: serde_json::to_value(&report)?,
    })
}

fn compress(
    file: &Path,
    out: &Path,
    level: &str,
    name: Option<String>,
    config: &EngineConfig,
) -> Result<CommandOutput> {
    let level: CompressionLevel = level.parse()?;
    let name = name.unwrap_or_else(|| format!("{}_compressed", stem(file)));
    let mut sink = DirectorySink::new(out)?;
    let (result, output) = CompressionPipeline::new(config.compression.clone())
        .compress_file(file, level, &mut sink, &name)?;
    Ok(CommandOutput::ok(json!({
        "result": result,
        "output": output,
    })))
}

fn unlock(
    file: &Path,
    out: &Path,
    password: Option<&str>,
    mut candidates: Vec<String>,
    config: &EngineConfig,
) -> Result<CommandOutput> {
    let document = PdfDocument::open(file)?;
    candidates.extend(config.credentials.extra_passwords.iter().cloned());

    let outcome = CredentialRecovery::new().recover(&document, password, &candidates);
    write_unlocked(file, out, &outcome, "unlocked")
}

fn unrestrict(file: &Path, out: &Path, password: Option<&str>) -> Result<CommandOutput> {
    let document = PdfDocument::open(file)?;
    let outcome = CredentialRecovery::new().remove_restrictions(&document, password);
    write_unlocked(file, out, &outcome, "unrestricted")
}

/// Result record for unlock-style commands; commits the output if any.
fn write_unlocked(file: &Path, out: &Path, outcome: &UnlockOutcome, suffix: &str) -> Result<CommandOutput> {
    let mut record = json!({
        "result": outcome.result,
        "attempts": outcome.attempts,
    });
    if let Some(shown) = outcome.result.display_password() {
        record["password_found"] = Value::from(shown);
    }

    if let Some(bytes) = &outcome.output {
        let mut sink = DirectorySink::new(out)?;
        let written = sink.commit(&format!("{}_{suffix}", stem(file)), bytes)?;
        info!(pages = outcome.result.pages_unlocked, "Unlocked copy written");
        record["output"] = serde_json::to_value(&written)?;
    }

    Ok(CommandOutput {
        success: outcome.result.success,
        record,
    })
}

fn images(inputs: &[PathBuf], out: &Path, name: &str, page_size: &str) -> Result<CommandOutput> {
    let page_size: PageSize = page_size.parse()?;
    let mut sink = DirectorySink::new(out)?;
    let report = ImageConverter::new(page_size).images_to_pdf(inputs, &mut sink, name)?;
    Ok(CommandOutput::ok(serde_json::to_value(&report)?))
}

/// `path` or `path@pages`.
fn parse_merge_input(arg: &str) -> MergeInput {
    match arg.rsplit_once('@') {
        Some((path, pages)) if !path.is_empty() => MergeInput::new(PathBuf::from(path)).with_pages(pages),
        _ => MergeInput::new(PathBuf::from(arg)),
    }
}

/// `first-last` or `first-last:name`, 1-based and inclusive.
fn parse_split_range(arg: &str, total_pages: usize) -> Result<SplitRange> {
    let (span, name) = match arg.split_once(':') {
        Some((span, name)) => (span, name),
        None => (arg, ""),
    };
    let malformed = || PagewerkError::InvalidPageRange(arg.to_owned());
    let (first, last) = span.split_once('-').ok_or_else(malformed)?;
    let first: usize = first.trim().parse().map_err(|_| malformed())?;
    let last: usize = last.trim().parse().map_err(|_| malformed())?;
    Ok(SplitRange::from_one_based(first, last, name, total_pages))
}

fn stem(file: &Path) -> String {
    file.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_input_syntax() {
        let plain = parse_merge_input("a.pdf");
        assert_eq!(plain.path, PathBuf::from("a.pdf"));
        assert_eq!(plain.pages, None);

        let selected = parse_merge_input("dir/b.pdf@1-3,5");
        assert_eq!(selected.path, PathBuf::from("dir/b.pdf"));
        assert_eq!(selected.pages.as_deref(), Some("1-3,5"));
    }

    #[test]
    fn split_range_syntax() {
        let range = parse_split_range("3-7:chapter_two", 5).expect("valid");
        assert_eq!(range, SplitRange::new(2, 5, "chapter_two"));

        let unnamed = parse_split_range("1-2", 10).expect("valid");
        assert_eq!(unnamed.name, "");

        assert!(matches!(
            parse_split_range("seven", 10),
            Err(PagewerkError::InvalidPageRange(_))
        ));
    }
}
