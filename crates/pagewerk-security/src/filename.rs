// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// File name checks for caller-supplied output names.

use pagewerk_core::error::PagewerkError;
use tracing::error;

/// Substrings that are never allowed in a file name, compared
/// case-insensitively.
pub const DANGEROUS_PATTERNS: &[&str] = &[
    "../",
    "..\\",
    "/etc/",
    "/proc/",
    "/sys/",
    "c:\\windows\\",
    "<script",
    "javascript:",
    "data:",
    "vbscript:",
    "onload=",
    "onerror=",
];

/// Longest name produced by [`sanitize_filename`], in bytes.
pub const MAX_FILENAME_LEN: usize = 255;

/// Reject names containing a path traversal or script-injection pattern.
pub fn check_filename(name: &str) -> Result<(), PagewerkError> {
    let lowered = name.to_ascii_lowercase();
    match DANGEROUS_PATTERNS
        .iter()
        .find(|pattern| lowered.contains(*pattern))
    {
        Some(pattern) => {
            error!(
                target: "security",
                name,
                pattern,
                "Dangerous pattern detected in file name"
            );
            Err(PagewerkError::DisallowedFilename {
                name: name.to_owned(),
                pattern: (*pattern).to_owned(),
            })
        }
        None => Ok(()),
    }
}

/// Reduce `name` to a plain, portable file name.
///
/// Path separators become spaces, runs of whitespace become a single `_`, and
/// everything outside `[A-Za-z0-9._-]` is dropped. Leading and trailing dots
/// and underscores are trimmed so the result can never be hidden or relative.
/// An empty result becomes `unnamed_file`.
pub fn sanitize_filename(name: &str) -> String {
    let spaced: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let filtered: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let mut cleaned = filtered.trim_matches(|c| c == '.' || c == '_').to_owned();

    if cleaned.is_empty() {
        cleaned = "unnamed_file".to_owned();
    }

    if cleaned.len() > MAX_FILENAME_LEN {
        // Keep the extension; `cleaned` is pure ASCII so byte slicing is safe.
        let (stem, ext) = match cleaned.rfind('.') {
            Some(dot) if dot > 0 => cleaned.split_at(dot),
            _ => (cleaned.as_str(), ""),
        };
        let keep = MAX_FILENAME_LEN.saturating_sub(ext.len());
        cleaned = format!("{}{}", &stem[..keep.min(stem.len())], ext);
    }

    cleaned
}
