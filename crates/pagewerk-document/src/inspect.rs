// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Inspection — page count, encryption, metadata, and page geometry.

use std::path::Path;

use pagewerk_core::error::{PagewerkError, Result};
use pagewerk_core::types::DocumentInfo;
use pagewerk_security::hash_bytes;
use tracing::{debug, instrument};

use crate::pdf::PdfDocument;

/// Describe a PDF held in memory.
#[instrument(skip_all, fields(bytes_len = data.len()))]
pub fn inspect(data: &[u8]) -> Result<DocumentInfo> {
    let document = PdfDocument::from_bytes(data)?;
    let info = DocumentInfo {
        page_count: document.page_count(),
        is_encrypted: document.is_encrypted(),
        requires_password: document.requires_password(),
        metadata: document.metadata(),
        pages: document.pages().map(|page| page.geometry()).collect(),
        file_size: data.len() as u64,
        fingerprint: hash_bytes(data),
    };
    debug!(pages = info.page_count, encrypted = info.is_encrypted, "Inspected");
    Ok(info)
}

pub fn inspect_file(path: impl AsRef<Path>) -> Result<DocumentInfo> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            PagewerkError::SourceNotFound(path.display().to_string())
        } else {
            PagewerkError::Io(err)
        }
    })?;
    inspect(&data)
}
