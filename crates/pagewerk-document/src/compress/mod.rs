// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Compression pipeline — a fixed-priority chain of strategies.
//
// Strategies run in `StrategyKind::PRIORITY` order. The first one that
// succeeds and beats the minimum-gain threshold wins; when none does, the
// input is returned byte-for-byte. Document metadata is only ever removed at
// the high level.

pub mod optimizer;
mod strategy;

use std::path::Path;

use pagewerk_core::config::CompressionConfig;
use pagewerk_core::error::{PagewerkError, Result};
use pagewerk_core::types::{
    AttemptOutcome, CompressionEstimate, CompressionLevel, CompressionResult, StrategyAttempt,
    StrategyKind, compression_ratio,
};
use tracing::{debug, info, instrument, warn};

use crate::pdf::PdfDocument;
use crate::sink::{OutputRecord, OutputSink};

pub use optimizer::{ExternalOptimizer, Ghostscript, NoOptimizer};

/// Note attached when every strategy fell short.
pub const ALREADY_OPTIMAL_NOTE: &str = "file was already optimally compressed";

/// Why the metadata strip does not run below the high level.
pub const METADATA_KEPT_REASON: &str = "metadata is only removed at the high level";

/// Result record plus the bytes it describes.
#[derive(Debug, Clone)]
pub struct CompressionOutcome {
    pub result: CompressionResult,
    pub output: Vec<u8>,
}

pub struct CompressionPipeline {
    config: CompressionConfig,
    optimizer: Box<dyn ExternalOptimizer>,
}

impl Default for CompressionPipeline {
    fn default() -> Self {
        Self::new(CompressionConfig::default())
    }
}

impl CompressionPipeline {
    /// Uses Ghostscript at `config.optimizer_binary` unless disabled.
    pub fn new(config: CompressionConfig) -> Self {
        let optimizer: Box<dyn ExternalOptimizer> = if config.optimizer_enabled {
            Box::new(Ghostscript::new(config.optimizer_binary.clone()))
        } else {
            Box::new(NoOptimizer)
        };
        Self { config, optimizer }
    }

    pub fn with_optimizer(config: CompressionConfig, optimizer: Box<dyn ExternalOptimizer>) -> Self {
        Self { config, optimizer }
    }

    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    /// Compress `input` at `level`.
    ///
    /// Never fails: a strategy that errors is recorded and skipped, and the
    /// identity copy is always available as the last resort.
    #[instrument(skip_all, fields(bytes_len = input.len(), level = %level))]
    pub fn compress(&self, input: &[u8], level: CompressionLevel) -> CompressionOutcome {
        let original_size = input.len() as u64;
        let mut attempts = Vec::new();

        if level == CompressionLevel::Low {
            debug!("Low level requested, copying input");
            return identity(input, attempts, None);
        }

        // Parsed once; a parse failure only rules out the in-process strategies.
        let parsed = PdfDocument::from_bytes(input);

        for kind in StrategyKind::PRIORITY {
            if kind == StrategyKind::IdentityCopy {
                continue;
            }
            if kind == StrategyKind::MetadataStrip && level != CompressionLevel::High {
                attempts.push(StrategyAttempt {
                    strategy: kind,
                    outcome: AttemptOutcome::Skipped {
                        reason: METADATA_KEPT_REASON.to_owned(),
                    },
                });
                continue;
            }
            let output = match self.run(kind, &parsed, input, level) {
                Ok(output) => output,
                Err(PagewerkError::OptimizerUnavailable) => {
                    debug!(strategy = %kind, "Strategy unavailable, skipping");
                    attempts.push(StrategyAttempt {
                        strategy: kind,
                        outcome: AttemptOutcome::Skipped {
                            reason: PagewerkError::OptimizerUnavailable.to_string(),
                        },
                    });
                    continue;
                }
                Err(err) => {
                    warn!(strategy = %kind, %err, "Strategy failed");
                    attempts.push(StrategyAttempt {
                        strategy: kind,
                        outcome: AttemptOutcome::Failed {
                            reason: err.to_string(),
                        },
                    });
                    continue;
                }
            };

            let output_size = output.len() as u64;
            let ratio_percent = compression_ratio(original_size, output_size);
            if self.is_effective(ratio_percent) {
                attempts.push(StrategyAttempt {
                    strategy: kind,
                    outcome: AttemptOutcome::Effective { ratio_percent },
                });
                info!(strategy = %kind, ratio_percent, original_size, output_size, "Compression applied");
                return CompressionOutcome {
                    result: CompressionResult {
                        success: true,
                        original_size,
                        output_size,
                        ratio_percent,
                        strategy_used: kind,
                        note: None,
                        attempts,
                    },
                    output,
                };
            }
            debug!(strategy = %kind, ratio_percent, "Below threshold");
            attempts.push(StrategyAttempt {
                strategy: kind,
                outcome: AttemptOutcome::BelowThreshold { ratio_percent },
            });
        }

        info!("No strategy cleared the threshold, copying input");
        identity(input, attempts, Some(ALREADY_OPTIMAL_NOTE.to_owned()))
    }

    /// Read `path`, compress, and commit the output as `name`.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), level = %level))]
    pub fn compress_file(
        &self,
        path: impl AsRef<Path>,
        level: CompressionLevel,
        sink: &mut dyn OutputSink,
        name: &str,
    ) -> Result<(CompressionResult, OutputRecord)> {
        let path = path.as_ref();
        let input = std::fs::read(path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                PagewerkError::SourceNotFound(path.display().to_string())
            } else {
                PagewerkError::Io(err)
            }
        })?;
        let outcome = self.compress(&input, level);
        let record = sink.commit(name, &outcome.output)?;
        Ok((outcome.result, record))
    }

    /// Strict: equal to the threshold does not count, negative never does.
    fn is_effective(&self, ratio_percent: f64) -> bool {
        ratio_percent > self.config.min_gain_percent
    }

    fn run(
        &self,
        kind: StrategyKind,
        parsed: &Result<PdfDocument>,
        input: &[u8],
        level: CompressionLevel,
    ) -> Result<Vec<u8>> {
        let high = level == CompressionLevel::High;
        let scale = |factor: f32| high.then_some(factor);

        match kind {
            StrategyKind::StructuralRewrite => {
                strategy::structural_rewrite(document(parsed)?, scale(self.config.structural_scale), high)
            }
            StrategyKind::MetadataStrip => {
                strategy::metadata_strip(document(parsed)?, scale(self.config.metadata_scale))
            }
            StrategyKind::ContentStreamRecompress => strategy::content_stream_recompress(
                document(parsed)?,
                scale(self.config.content_stream_scale),
                high,
            ),
            StrategyKind::ExternalOptimizer => {
                if !self.optimizer.is_available() {
                    return Err(PagewerkError::OptimizerUnavailable);
                }
                self.optimizer.optimize(input, level)
            }
            StrategyKind::IdentityCopy => Ok(input.to_vec()),
        }
    }
}

fn document(parsed: &Result<PdfDocument>) -> Result<&PdfDocument> {
    parsed
        .as_ref()
        .map_err(|err| PagewerkError::Pdf(format!("input not parsed: {}", err)))
}

fn identity(input: &[u8], mut attempts: Vec<StrategyAttempt>, note: Option<String>) -> CompressionOutcome {
    let size = input.len() as u64;
    attempts.push(StrategyAttempt {
        strategy: StrategyKind::IdentityCopy,
        outcome: AttemptOutcome::Fallback,
    });
    CompressionOutcome {
        result: CompressionResult {
            success: true,
            original_size: size,
            output_size: size,
            ratio_percent: 0.0,
            strategy_used: StrategyKind::IdentityCopy,
            note,
            attempts,
        },
        output: input.to_vec(),
    }
}

/// Rough expected reduction without running any strategy.
pub fn estimate_compression(document: &PdfDocument) -> CompressionEstimate {
    let current_size = document.byte_len();
    let page_count = document.page_count();
    let has_metadata = !document.metadata().is_empty();
    let has_images = document.has_images();

    let mut percent: u32 = 0;
    if has_metadata {
        percent += 5;
    }
    if page_count > 10 {
        percent += 15;
    }
    percent += if has_images { 25 } else { 10 };
    let percent = percent.min(60);

    CompressionEstimate {
        current_size,
        estimated_reduction_percent: percent,
        estimated_new_size: current_size - current_size * u64::from(percent) / 100,
        page_count,
        has_metadata,
        has_images,
    }
}
