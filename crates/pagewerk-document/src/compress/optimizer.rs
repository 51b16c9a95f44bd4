// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// External optimizer — an optional out-of-process PDF rewriter.
//
// The binary may be missing. Availability is checked once per optimizer and
// an absent tool reports `OptimizerUnavailable`, which the pipeline treats as
// "skip this strategy", never as a failure.

use std::io::ErrorKind;
use std::process::Command;
use std::sync::OnceLock;

use pagewerk_core::error::{PagewerkError, Result};
use pagewerk_core::types::CompressionLevel;
use tracing::{debug, info, instrument};

/// Something that can rewrite a whole PDF into a smaller one.
pub trait ExternalOptimizer {
    fn name(&self) -> &str;

    /// Whether the tool can run at all. Implementations cache the answer.
    fn is_available(&self) -> bool;

    /// Rewrite `input`. Blocks until the tool exits; no retry.
    fn optimize(&self, input: &[u8], level: CompressionLevel) -> Result<Vec<u8>>;
}

/// Ghostscript's `pdfwrite` device.
pub struct Ghostscript {
    binary: String,
    available: OnceLock<bool>,
}

impl Ghostscript {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            available: OnceLock::new(),
        }
    }

    fn detect(&self) -> bool {
        let found = Command::new(&self.binary)
            .arg("--version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false);
        debug!(binary = %self.binary, found, "Checked external optimizer");
        found
    }

    /// `/screen` trades the most fidelity; `/ebook` is the gentler preset.
    fn preset(level: CompressionLevel) -> &'static str {
        match level {
            CompressionLevel::High => "/screen",
            CompressionLevel::Low | CompressionLevel::Medium => "/ebook",
        }
    }
}

impl ExternalOptimizer for Ghostscript {
    fn name(&self) -> &str {
        &self.binary
    }

    fn is_available(&self) -> bool {
        *self.available.get_or_init(|| self.detect())
    }

    #[instrument(skip(self, input), fields(binary = %self.binary, bytes_len = input.len()))]
    fn optimize(&self, input: &[u8], level: CompressionLevel) -> Result<Vec<u8>> {
        if !self.is_available() {
            return Err(PagewerkError::OptimizerUnavailable);
        }

        let scratch = tempfile::tempdir()?;
        let input_path = scratch.path().join("input.pdf");
        let output_path = scratch.path().join("output.pdf");
        std::fs::write(&input_path, input)?;

        let output = Command::new(&self.binary)
            .arg("-sDEVICE=pdfwrite")
            .arg("-dCompatibilityLevel=1.4")
            .arg(format!("-dPDFSETTINGS={}", Self::preset(level)))
            .args(["-dNOPAUSE", "-dQUIET", "-dBATCH", "-dSAFER"])
            .arg(format!("-sOutputFile={}", output_path.display()))
            .arg(&input_path)
            .output()
            .map_err(|err| match err.kind() {
                ErrorKind::NotFound => PagewerkError::OptimizerUnavailable,
                _ => PagewerkError::Io(err),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PagewerkError::Optimizer(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        let optimized = std::fs::read(&output_path)?;
        info!(
            before = input.len(),
            after = optimized.len(),
            "External optimizer finished"
        );
        Ok(optimized)
    }
}

/// Stands in when the external optimizer is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOptimizer;

impl ExternalOptimizer for NoOptimizer {
    fn name(&self) -> &str {
        "none"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn optimize(&self, _input: &[u8], _level: CompressionLevel) -> Result<Vec<u8>> {
        Err(PagewerkError::OptimizerUnavailable)
    }
}
