// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document integrity — SHA-256 fingerprints of input and output bytes.
//
// Inspection reports carry the fingerprint of the input. Filesystem sinks
// fingerprint each output before writing and check the file they read back.

use pagewerk_core::error::PagewerkError;
use sha2::{Digest, Sha256};
use tracing::error;

/// Lowercase hex SHA-256 of `data`.
pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Check `data` against a previously computed fingerprint of the document
/// called `name`. The digest comparison ignores hex case.
pub fn verify_hash(name: &str, data: &[u8], expected_hex: &str) -> Result<(), PagewerkError> {
    let actual = hash_bytes(data);
    if actual.eq_ignore_ascii_case(expected_hex) {
        return Ok(());
    }
    error!(target: "security", name, expected = expected_hex, actual = %actual, "Fingerprint mismatch");
    Err(PagewerkError::IntegrityMismatch {
        name: name.to_owned(),
        expected: expected_hex.to_owned(),
        actual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digests_of_known_inputs() {
        assert_eq!(
            hash_bytes(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            hash_bytes(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn matching_fingerprint_in_any_case() {
        let digest = hash_bytes(b"pagewerk").to_ascii_uppercase();
        assert!(verify_hash("out", b"pagewerk", &digest).is_ok());
    }

    #[test]
    fn mismatch_names_the_document() {
        match verify_hash("report", b"a", "0000") {
            Err(PagewerkError::IntegrityMismatch {
                name,
                expected,
                actual,
            }) => {
                assert_eq!(name, "report");
                assert_eq!(expected, "0000");
                assert_eq!(actual, hash_bytes(b"a"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
