// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Pagewerk document engine.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PagewerkError;

// -- Page selection -----------------------------------------------------------

/// Sorted, de-duplicated set of 0-based page indices, all below the page
/// count of the document the selection was resolved against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSelection {
    indices: Vec<usize>,
    total_pages: usize,
}

impl PageSelection {
    /// Every page of a `total_pages` document.
    pub fn all(total_pages: usize) -> Self {
        Self {
            indices: (0..total_pages).collect(),
            total_pages,
        }
    }

    /// Build from arbitrary 0-based indices. Sorts and removes duplicates;
    /// any index outside the document is rejected.
    pub fn from_indices(
        indices: impl IntoIterator<Item = usize>,
        total_pages: usize,
    ) -> Result<Self, PagewerkError> {
        let mut indices: Vec<usize> = indices.into_iter().collect();
        if let Some(&bad) = indices.iter().find(|&&i| i >= total_pages) {
            return Err(PagewerkError::InvalidPageNumber(format!(
                "page {} out of range (document has {} pages)",
                bad + 1,
                total_pages
            )));
        }
        indices.sort_unstable();
        indices.dedup();
        Ok(Self {
            indices,
            total_pages,
        })
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Page count of the document this selection was resolved against.
    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    /// 1-based page numbers, for display.
    pub fn page_numbers(&self) -> Vec<usize> {
        self.indices.iter().map(|i| i + 1).collect()
    }
}

// -- Split ranges -------------------------------------------------------------

/// A named, half-open run of 0-based pages `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitRange {
    pub start: usize,
    pub end: usize,
    pub name: String,
}

impl SplitRange {
    pub fn new(start: usize, end: usize, name: impl Into<String>) -> Self {
        Self {
            start,
            end,
            name: name.into(),
        }
    }

    /// Build from an inclusive 1-based `first..=last` pair, clamped to the
    /// document: `first` below 1 starts at the first page and `last` beyond
    /// the document stops at the last page.
    pub fn from_one_based(
        first: usize,
        last: usize,
        name: impl Into<String>,
        total_pages: usize,
    ) -> Self {
        Self {
            start: first.saturating_sub(1),
            end: last.min(total_pages),
            name: name.into(),
        }
    }

    /// Clamp the end to `total_pages`; `None` when nothing remains.
    pub fn clamped(&self, total_pages: usize) -> Option<Range<usize>> {
        let end = self.end.min(total_pages);
        (self.start < end).then_some(self.start..end)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

// -- Compression --------------------------------------------------------------

/// Requested compression aggressiveness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    /// Keep the input bytes unchanged.
    Low,
    /// Recompress content streams.
    #[default]
    Medium,
    /// Recompress, scale pages down slightly, and drop metadata.
    High,
}

impl CompressionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for CompressionLevel {
    type Err = PagewerkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(PagewerkError::InvalidCompressionLevel(s.to_owned())),
        }
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compression strategies, listed in the order the pipeline tries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    StructuralRewrite,
    MetadataStrip,
    ContentStreamRecompress,
    ExternalOptimizer,
    IdentityCopy,
}

impl StrategyKind {
    /// Priority order. `IdentityCopy` is last and is the fallback.
    pub const PRIORITY: [StrategyKind; 5] = [
        StrategyKind::StructuralRewrite,
        StrategyKind::MetadataStrip,
        StrategyKind::ContentStreamRecompress,
        StrategyKind::ExternalOptimizer,
        StrategyKind::IdentityCopy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StructuralRewrite => "structural_rewrite",
            Self::MetadataStrip => "metadata_strip",
            Self::ContentStreamRecompress => "content_stream_recompress",
            Self::ExternalOptimizer => "external_optimizer",
            Self::IdentityCopy => "identity_copy",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened when one strategy was tried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Cleared the threshold and was accepted.
    Effective { ratio_percent: f64 },
    /// Ran, but did not shrink the file enough (possibly grew it).
    BelowThreshold { ratio_percent: f64 },
    /// Raised an error.
    Failed { reason: String },
    /// Not applicable here: optimizer missing, or not allowed at this level.
    Skipped { reason: String },
    /// The unchanged input, returned because nothing else was accepted.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyAttempt {
    pub strategy: StrategyKind,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

/// Outcome of one compression request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionResult {
    pub success: bool,
    pub original_size: u64,
    pub output_size: u64,
    pub ratio_percent: f64,
    pub strategy_used: StrategyKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Strategies tried before the accepted one, in order.
    pub attempts: Vec<StrategyAttempt>,
}

impl CompressionResult {
    /// Bytes saved; zero when the output is not smaller.
    pub fn size_reduction(&self) -> u64 {
        self.original_size.saturating_sub(self.output_size)
    }
}

/// `round((original - output) / original * 100, 2)`, with an empty original
/// reported as no gain. Negative when the output grew.
pub fn compression_ratio(original_size: u64, output_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    let ratio = (original_size as f64 - output_size as f64) / original_size as f64 * 100.0;
    (ratio * 100.0).round() / 100.0
}

/// Rough, pre-flight guess of what compression might achieve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionEstimate {
    pub current_size: u64,
    pub estimated_reduction_percent: u32,
    pub estimated_new_size: u64,
    pub page_count: usize,
    pub has_metadata: bool,
    pub has_images: bool,
}

// -- Credentials --------------------------------------------------------------

/// Outcome of an unlock attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialAttemptResult {
    pub success: bool,
    /// `Some("")` means the empty password worked; `None` means no password
    /// was accepted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub pages_unlocked: usize,
}

impl CredentialAttemptResult {
    pub fn unlocked(password: impl Into<String>, pages_unlocked: usize) -> Self {
        Self {
            success: true,
            password_used: Some(password.into()),
            error: None,
            error_code: None,
            pages_unlocked,
        }
    }

    /// Unencrypted input rewritten as-is; no password was needed.
    pub fn rewritten(pages_unlocked: usize) -> Self {
        Self {
            success: true,
            password_used: None,
            error: None,
            error_code: None,
            pages_unlocked,
        }
    }

    pub fn failed(err: &PagewerkError) -> Self {
        Self::failed_with(err.to_string(), err.code())
    }

    pub fn failed_with(message: impl Into<String>, code: &str) -> Self {
        Self {
            success: false,
            password_used: None,
            error: Some(message.into()),
            error_code: Some(code.to_owned()),
            pages_unlocked: 0,
        }
    }

    /// Password as shown to people; the empty password gets a placeholder.
    pub fn display_password(&self) -> Option<&str> {
        self.password_used.as_deref().map(|password| {
            if password.is_empty() {
                "[empty password]"
            } else {
                password
            }
        })
    }
}

// -- Image conversion ---------------------------------------------------------

/// Page size for image-to-PDF conversion, in PDF points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    /// One page per image, sized to the image.
    #[default]
    Auto,
    A4,
    Letter,
    Legal,
    Custom { width: f32, height: f32 },
}

impl PageSize {
    /// `(width, height)` in points, or `None` for [`PageSize::Auto`].
    pub fn dimensions(&self) -> Option<(f32, f32)> {
        match *self {
            Self::Auto => None,
            Self::A4 => Some((595.0, 842.0)),
            Self::Letter => Some((612.0, 792.0)),
            Self::Legal => Some((612.0, 1008.0)),
            Self::Custom { width, height } => Some((width, height)),
        }
    }
}

impl FromStr for PageSize {
    type Err = PagewerkError;

    /// `auto`, `a4`, `letter`, `legal`, or `WIDTHxHEIGHT` in points.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "auto" => return Ok(Self::Auto),
            "a4" => return Ok(Self::A4),
            "letter" => return Ok(Self::Letter),
            "legal" => return Ok(Self::Legal),
            _ => {}
        }
        let invalid = || PagewerkError::InvalidConfig(format!("unknown page size {s:?}"));
        let (width, height) = lowered.split_once('x').ok_or_else(invalid)?;
        let width: f32 = width.trim().parse().map_err(|_| invalid())?;
        let height: f32 = height.trim().parse().map_err(|_| invalid())?;
        if !(width > 0.0 && height > 0.0) {
            return Err(invalid());
        }
        Ok(Self::Custom { width, height })
    }
}

// -- Inspection ---------------------------------------------------------------

/// Geometry of one page, in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    /// 1-based page number.
    pub page_number: usize,
    pub width: f32,
    pub height: f32,
    /// Clockwise rotation in degrees (0, 90, 180, or 270).
    pub rotation: i32,
}

/// Summary returned by `inspect`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub is_encrypted: bool,
    /// Encrypted with a non-empty user password; pages and metadata stay
    /// unreadable until unlocked.
    pub requires_password: bool,
    /// Empty for documents that require a password.
    pub metadata: BTreeMap<String, String>,
    pub pages: Vec<PageGeometry>,
    pub file_size: u64,
    /// SHA-256 of the input bytes, lowercase hex.
    pub fingerprint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_sorts_and_dedups() {
        let selection = PageSelection::from_indices([4, 0, 2, 0, 4], 5).expect("valid");
        assert_eq!(selection.indices(), &[0, 2, 4]);
        assert_eq!(selection.page_numbers(), vec![1, 3, 5]);
    }

    #[test]
    fn selection_rejects_out_of_bounds() {
        let err = PageSelection::from_indices([0, 5], 5).unwrap_err();
        assert!(matches!(err, PagewerkError::InvalidPageNumber(_)));
    }

    #[test]
    fn one_based_split_range_is_clamped() {
        let range = SplitRange::from_one_based(0, 40, "tail", 10);
        assert_eq!(range.start, 0);
        assert_eq!(range.end, 10);
        assert_eq!(range.clamped(10), Some(0..10));

        let empty = SplitRange::from_one_based(8, 3, "backwards", 10);
        assert!(empty.is_empty());
        assert_eq!(empty.clamped(10), None);
    }

    #[test]
    fn compression_level_parsing() {
        assert_eq!("HIGH".parse::<CompressionLevel>().ok(), Some(CompressionLevel::High));
        assert_eq!(" low ".parse::<CompressionLevel>().ok(), Some(CompressionLevel::Low));
        assert!(matches!(
            "extreme".parse::<CompressionLevel>(),
            Err(PagewerkError::InvalidCompressionLevel(_))
        ));
    }

    #[test]
    fn page_size_parsing() {
        assert_eq!("A4".parse::<PageSize>().ok(), Some(PageSize::A4));
        assert_eq!(PageSize::Legal.dimensions(), Some((612.0, 1008.0)));
        assert_eq!(PageSize::Auto.dimensions(), None);
        assert_eq!(
            "300x400".parse::<PageSize>().ok(),
            Some(PageSize::Custom { width: 300.0, height: 400.0 })
        );
        assert!("tabloid".parse::<PageSize>().is_err());
        assert!("0x400".parse::<PageSize>().is_err());
    }

    #[test]
    fn ratio_rounds_to_two_decimals() {
        assert_eq!(compression_ratio(200, 150), 25.0);
        assert_eq!(compression_ratio(3, 2), 33.33);
        assert_eq!(compression_ratio(100, 100), 0.0);
        assert_eq!(compression_ratio(100, 110), -10.0);
    }

    #[test]
    fn ratio_of_empty_input_is_zero() {
        assert_eq!(compression_ratio(0, 0), 0.0);
        assert_eq!(compression_ratio(0, 10), 0.0);
    }

    #[test]
    fn empty_password_is_displayed_distinctly() {
        let result = CredentialAttemptResult::unlocked("", 3);
        assert_eq!(result.password_used.as_deref(), Some(""));
        assert_eq!(result.display_password(), Some("[empty password]"));

        let failed = CredentialAttemptResult::failed(&PagewerkError::IncorrectPassword);
        assert_eq!(failed.display_password(), None);
        assert_eq!(failed.error_code.as_deref(), Some("INCORRECT_PASSWORD"));
    }

    #[test]
    fn strategy_priority_ends_with_identity() {
        assert_eq!(StrategyKind::PRIORITY.last(), Some(&StrategyKind::IdentityCopy));
        assert_eq!(StrategyKind::PRIORITY[0], StrategyKind::StructuralRewrite);
    }
}
