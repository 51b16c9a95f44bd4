// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output sinks — where finished documents go.
//
// A sink receives complete documents only. The directory sink writes through
// a temporary file in the destination directory and renames it into place, so
// a failure at any point leaves no partial output behind. The file that lands
// is read back and checked against the fingerprint of the bytes handed in.

use std::io::Write;
use std::path::{Path, PathBuf};

use pagewerk_core::error::{PagewerkError, Result};
use pagewerk_security::{check_filename, hash_bytes, sanitize_filename, verify_hash};
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

/// Where one committed document ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputRecord {
    /// Logical name the caller asked for.
    pub name: String,
    /// File written, for filesystem sinks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub byte_count: u64,
    /// SHA-256 of the committed bytes, lowercase hex.
    pub fingerprint: String,
}

/// Destination for finished documents.
pub trait OutputSink {
    /// Store one complete document under `name`. Either the whole document
    /// is stored or nothing is.
    fn commit(&mut self, name: &str, bytes: &[u8]) -> Result<OutputRecord>;
}

/// Writes `<dir>/<name>.pdf` files.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Use `dir`, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path a document called `name` would be written to.
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        check_filename(name)?;
        let stem = strip_pdf_extension(name);
        let file_name = sanitize_filename(&format!("{stem}.pdf"));
        Ok(self.dir.join(file_name))
    }
}

impl OutputSink for DirectorySink {
    #[instrument(skip(self, bytes), fields(bytes_len = bytes.len()))]
    fn commit(&mut self, name: &str, bytes: &[u8]) -> Result<OutputRecord> {
        let path = self.path_for(name)?;
        let fingerprint = hash_bytes(bytes);

        let mut staging = NamedTempFile::new_in(&self.dir)?;
        staging.write_all(bytes)?;
        staging.as_file().sync_all()?;
        staging
            .persist(&path)
            .map_err(|err| PagewerkError::Io(err.error))?;

        let written = std::fs::read(&path)?;
        if let Err(err) = verify_hash(name, &written, &fingerprint) {
            std::fs::remove_file(&path)?;
            return Err(err);
        }

        info!("Wrote {}", path.display());
        Ok(OutputRecord {
            name: name.to_owned(),
            path: Some(path),
            byte_count: bytes.len() as u64,
            fingerprint,
        })
    }
}

/// Keeps documents in memory, in commit order.
#[derive(Debug, Default)]
pub struct MemorySink {
    documents: Vec<(String, Vec<u8>)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn documents(&self) -> &[(String, Vec<u8>)] {
        &self.documents
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.documents
            .iter()
            .find(|(stored, _)| stored == name)
            .map(|(_, bytes)| bytes.as_slice())
    }

    pub fn into_documents(self) -> Vec<(String, Vec<u8>)> {
        self.documents
    }
}

impl OutputSink for MemorySink {
    fn commit(&mut self, name: &str, bytes: &[u8]) -> Result<OutputRecord> {
        check_filename(name)?;
        debug!(name, bytes_len = bytes.len(), "Buffered output");
        self.documents.push((name.to_owned(), bytes.to_vec()));
        Ok(OutputRecord {
            name: name.to_owned(),
            path: None,
            byte_count: bytes.len() as u64,
            fingerprint: hash_bytes(bytes),
        })
    }
}

fn strip_pdf_extension(name: &str) -> &str {
    let len = name.len();
    if len > 4 && name.is_char_boundary(len - 4) && name[len - 4..].eq_ignore_ascii_case(".pdf") {
        &name[..len - 4]
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_sink_writes_whole_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut sink = DirectorySink::new(dir.path().join("out")).expect("sink");
        let record = sink.commit("report", b"%PDF-1.5 body").expect("commit");

        let path = record.path.expect("path");
        assert_eq!(path, dir.path().join("out").join("report.pdf"));
        assert_eq!(std::fs::read(&path).expect("read"), b"%PDF-1.5 body");
        assert_eq!(record.byte_count, 13);
        assert_eq!(record.fingerprint, hash_bytes(b"%PDF-1.5 body"));

        // Only the final file remains; the staging file was renamed away.
        let entries = std::fs::read_dir(dir.path().join("out")).expect("list").count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn directory_sink_does_not_double_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sink = DirectorySink::new(dir.path()).expect("sink");
        assert_eq!(
            sink.path_for("Scan.PDF").expect("path"),
            dir.path().join("Scan.pdf")
        );
        assert_eq!(
            sink.path_for("chapter 2").expect("path"),
            dir.path().join("chapter_2.pdf")
        );
    }

    #[test]
    fn traversal_names_are_rejected_before_writing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut sink = DirectorySink::new(dir.path()).expect("sink");
        let err = sink.commit("../escape", b"data").unwrap_err();
        assert!(matches!(err, PagewerkError::DisallowedFilename { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).expect("list").count(), 0);
    }

    #[test]
    fn memory_sink_keeps_order() {
        let mut sink = MemorySink::new();
        sink.commit("first", b"1").expect("commit");
        sink.commit("second", b"22").expect("commit");
        assert_eq!(sink.get("second"), Some(&b"22"[..]));
        let names: Vec<&str> = sink.documents().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }
}
