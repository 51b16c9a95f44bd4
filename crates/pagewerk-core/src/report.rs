// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Structured failure records handed back to callers.
//
// Every terminal error is mapped to a stable code, a plain English message, and
// a suggestion. The category decides whether the caller may simply retry with
// different input.

use serde::{Deserialize, Serialize};

use crate::error::{ErrorCategory, PagewerkError};

/// Serialisable description of a failed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Machine-stable code (see [`PagewerkError::code`]).
    pub code: String,
    /// Error family.
    pub category: ErrorCategory,
    /// Technical message from the underlying error.
    pub message: String,
    /// What the caller should try next.
    pub suggestion: String,
    /// Whether correcting the request can make the operation succeed.
    pub recoverable: bool,
}

impl ErrorReport {
    pub fn from_error(err: &PagewerkError) -> Self {
        let category = err.category();
        Self {
            code: err.code().to_owned(),
            category,
            message: err.to_string(),
            suggestion: suggestion_for(err).to_owned(),
            recoverable: matches!(
                category,
                ErrorCategory::Validation | ErrorCategory::Encryption
            ),
        }
    }
}

impl From<&PagewerkError> for ErrorReport {
    fn from(err: &PagewerkError) -> Self {
        Self::from_error(err)
    }
}

fn suggestion_for(err: &PagewerkError) -> &'static str {
    match err {
        PagewerkError::InvalidPageNumber(_) => {
            "Use page numbers between 1 and the number of pages in the document."
        }
        PagewerkError::InvalidPageRange(_) => {
            "Write ranges as START-END with START <= END, for example 1-3,5,7-9."
        }
        PagewerkError::NoPagesSpecified => "List at least one page, or use \"all\".",
        PagewerkError::InvalidChunkSize(_) => "Choose at least one page per output file.",
        PagewerkError::InvalidCompressionLevel(_) => "Choose low, medium, or high.",
        PagewerkError::InsufficientInputs(_) => {
            "Select at least two documents that contain pages."
        }
        PagewerkError::TooManySources { .. } => "Merge fewer documents at a time.",
        PagewerkError::InvalidConfig(_) => "Check the configuration file values.",
        PagewerkError::NoImages => "Provide JPEG, PNG, BMP, TIFF, or GIF files that exist.",
        PagewerkError::SourceNotFound(_) => "Check that the file exists and is readable.",
        PagewerkError::DisallowedFilename { .. } => {
            "Rename the file using only plain letters, digits, dashes, and underscores."
        }
        PagewerkError::Pdf(_) => "The file may be damaged. Try re-saving it as a PDF.",
        PagewerkError::OptimizerUnavailable | PagewerkError::Optimizer(_) => {
            "Install Ghostscript or use a different compression level."
        }
        PagewerkError::Image(_) => "The image may be damaged or in an unsupported colour format.",
        PagewerkError::IntegrityMismatch { .. } => {
            "The written file does not match what was produced. Check the disk and try again."
        }
        PagewerkError::Io(_) | PagewerkError::Serialization(_) => {
            "Check free disk space and permissions, then try again."
        }
        PagewerkError::NotEncrypted => "This document can be used as-is; no unlock needed.",
        PagewerkError::IncorrectPassword => "Check the password and try again.",
        PagewerkError::Encrypted => "Unlock the document with its password first.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_reports_are_recoverable() {
        let report = ErrorReport::from_error(&PagewerkError::InvalidPageNumber("0".into()));
        assert_eq!(report.code, "INVALID_PAGE_NUMBER");
        assert_eq!(report.category, ErrorCategory::Validation);
        assert!(report.recoverable);
        assert!(report.message.contains('0'));
    }

    #[test]
    fn security_reports_are_not_recoverable() {
        let err = PagewerkError::DisallowedFilename {
            name: "../etc".into(),
            pattern: "../".into(),
        };
        let report = ErrorReport::from(&err);
        assert_eq!(report.code, "SECURITY_VIOLATION");
        assert!(!report.recoverable);
    }

    #[test]
    fn report_serialises_to_json() {
        let report = ErrorReport::from_error(&PagewerkError::IncorrectPassword);
        let json = serde_json::to_string(&report).expect("serialise");
        assert!(json.contains("\"category\":\"encryption\""));
        assert!(json.contains("INCORRECT_PASSWORD"));
    }
}
