// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagewerk-security — Guards applied at the edges of the document engine.
//
// Output names chosen by callers end up as file names on disk, so they are
// checked for path traversal and script-injection patterns before any writer
// is created. Document bytes are fingerprinted with SHA-256 for inspection
// reports and integrity checks.

pub mod filename;
pub mod integrity;

pub use filename::{check_filename, sanitize_filename};
pub use integrity::{hash_bytes, verify_hash};
