// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Pagewerk.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for all Pagewerk operations.
#[derive(Debug, Error)]
pub enum PagewerkError {
    // -- Validation errors --
    #[error("invalid page number: {0}")]
    InvalidPageNumber(String),

    #[error("invalid page range: {0}")]
    InvalidPageRange(String),

    #[error("no valid pages specified")]
    NoPagesSpecified,

    #[error("pages per file must be at least 1, got {0}")]
    InvalidChunkSize(usize),

    #[error("unknown compression level {0:?} (expected low, medium, or high)")]
    InvalidCompressionLevel(String),

    #[error("merging needs at least two documents with pages, got {0}")]
    InsufficientInputs(usize),

    #[error("too many source documents ({count}), maximum is {max}")]
    TooManySources { count: usize, max: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no usable image files given")]
    NoImages,

    // -- Lookup errors --
    #[error("source not found: {0}")]
    SourceNotFound(String),

    // -- Security errors --
    #[error("disallowed pattern {pattern:?} in file name {name:?}")]
    DisallowedFilename { name: String, pattern: String },

    // -- Processing errors --
    #[error("PDF operation failed: {0}")]
    Pdf(String),

    #[error("external optimizer is not available")]
    OptimizerUnavailable,

    #[error("external optimizer failed: {0}")]
    Optimizer(String),

    #[error("image conversion failed: {0}")]
    Image(String),

    #[error("integrity check failed for {name}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Encryption errors --
    #[error("PDF file is not password protected")]
    NotEncrypted,

    #[error("incorrect password provided")]
    IncorrectPassword,

    #[error("PDF is encrypted, password required")]
    Encrypted,
}

/// Coarse error family used to decide how a failure is reported and recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed caller input; always recoverable by fixing the request.
    Validation,
    /// A declared source does not exist.
    NotFound,
    /// Disallowed path pattern; never retried.
    Security,
    /// Codec, strategy, or filesystem failure.
    Processing,
    /// Wrong or missing password.
    Encryption,
}

impl PagewerkError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidPageNumber(_)
            | Self::InvalidPageRange(_)
            | Self::NoPagesSpecified
            | Self::InvalidChunkSize(_)
            | Self::InvalidCompressionLevel(_)
            | Self::InsufficientInputs(_)
            | Self::TooManySources { .. }
            | Self::InvalidConfig(_)
            | Self::NoImages => ErrorCategory::Validation,
            Self::SourceNotFound(_) => ErrorCategory::NotFound,
            Self::DisallowedFilename { .. } => ErrorCategory::Security,
            Self::Pdf(_)
            | Self::OptimizerUnavailable
            | Self::Optimizer(_)
            | Self::Image(_)
            | Self::IntegrityMismatch { .. }
            | Self::Io(_)
            | Self::Serialization(_) => ErrorCategory::Processing,
            Self::NotEncrypted | Self::IncorrectPassword | Self::Encrypted => {
                ErrorCategory::Encryption
            }
        }
    }

    /// Machine-stable code, safe to match on from callers and scripts.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPageNumber(_) => "INVALID_PAGE_NUMBER",
            Self::InvalidPageRange(_) => "INVALID_PAGE_RANGE",
            Self::NoPagesSpecified => "NO_PAGES",
            Self::InvalidChunkSize(_) => "INVALID_CHUNK_SIZE",
            Self::InvalidCompressionLevel(_) => "INVALID_COMPRESSION_LEVEL",
            Self::InsufficientInputs(_) => "INSUFFICIENT_INPUTS",
            Self::TooManySources { .. } => "TOO_MANY_FILES",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::NoImages => "NO_VALID_IMAGES",
            Self::SourceNotFound(_) => "FILE_NOT_FOUND",
            Self::DisallowedFilename { .. } => "SECURITY_VIOLATION",
            Self::Pdf(_) => "PROCESSING_ERROR",
            Self::OptimizerUnavailable => "OPTIMIZER_UNAVAILABLE",
            Self::Optimizer(_) => "OPTIMIZER_FAILED",
            Self::Image(_) => "IMAGE_ERROR",
            Self::IntegrityMismatch { .. } => "INTEGRITY_MISMATCH",
            Self::Io(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
                "PERMISSION_DENIED"
            }
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::NotEncrypted => "NOT_ENCRYPTED",
            Self::IncorrectPassword => "INCORRECT_PASSWORD",
            Self::Encrypted => "PASSWORD_REQUIRED",
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PagewerkError>;
