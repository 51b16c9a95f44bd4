// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Credential recovery — open password-protected PDFs with a known password
// or by walking a fixed dictionary of common ones.
//
// Candidates are tried strictly in list order and only the first that works
// is reported. Passwords never appear in logs.

use pagewerk_core::error::{PagewerkError, Result};
use pagewerk_core::types::CredentialAttemptResult;
use tracing::{debug, info, instrument, warn};

use crate::pdf::crypt::decrypt_document;
use crate::pdf::{PageAssembler, PdfDocument};

/// Built-in dictionary, tried after any caller-supplied passwords.
pub const COMMON_PASSWORDS: [&str; 15] = [
    "", "123456", "password", "123456789", "12345678", "abc123", "Password", "123123", "admin",
    "user", "1234", "12345", "qwerty", "letmein", "welcome",
];

pub const EXHAUSTED_MESSAGE: &str = "could not unlock with common passwords";
pub const EXHAUSTED_CODE: &str = "PASSWORD_NOT_FOUND";

/// A document that may be locked behind a password.
pub trait Decryptable: Sized {
    fn is_encrypted(&self) -> bool;

    /// A decrypted copy. A rejected password is `IncorrectPassword`.
    fn decrypt_with(&self, password: &str) -> Result<Self>;

    fn page_count(&self) -> usize;

    /// Serialise the (decrypted) document: all pages, original metadata.
    fn unlocked_bytes(&self) -> Result<Vec<u8>>;
}

impl Decryptable for PdfDocument {
    fn is_encrypted(&self) -> bool {
        PdfDocument::is_encrypted(self)
    }

    fn decrypt_with(&self, password: &str) -> Result<Self> {
        decrypt_document(self, password)
    }

    fn page_count(&self) -> usize {
        PdfDocument::page_count(self)
    }

    fn unlocked_bytes(&self) -> Result<Vec<u8>> {
        let mut assembler = PageAssembler::new();
        assembler.append_pages(self, 0..PdfDocument::page_count(self))?;
        assembler.copy_metadata(self)?;
        assembler.to_bytes()
    }
}

/// Decrypt `document` with one password. Unencrypted input is rejected
/// without attempting decryption.
pub fn unlock_with_password<D: Decryptable>(document: &D, password: &str) -> Result<D> {
    if !document.is_encrypted() {
        return Err(PagewerkError::NotEncrypted);
    }
    document.decrypt_with(password)
}

/// Attempt record plus the decrypted bytes on success.
#[derive(Debug, Clone)]
pub struct UnlockOutcome {
    pub result: CredentialAttemptResult,
    pub output: Option<Vec<u8>>,
    /// Candidates tried before stopping.
    pub attempts: usize,
}

impl UnlockOutcome {
    fn failure(err: &PagewerkError, attempts: usize) -> Self {
        Self {
            result: CredentialAttemptResult::failed(err),
            output: None,
            attempts,
        }
    }
}

pub struct CredentialRecovery {
    dictionary: Vec<String>,
}

impl Default for CredentialRecovery {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialRecovery {
    pub fn new() -> Self {
        Self::with_dictionary(COMMON_PASSWORDS)
    }

    pub fn with_dictionary<I, S>(dictionary: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dictionary: dictionary.into_iter().map(Into::into).collect(),
        }
    }

    /// `extra` first, then the dictionary, order preserved.
    pub fn candidates(&self, extra: &[String]) -> Vec<String> {
        extra.iter().chain(&self.dictionary).cloned().collect()
    }

    /// Unlock with a password the caller knows.
    #[instrument(skip_all)]
    pub fn unlock<D: Decryptable>(&self, document: &D, password: &str) -> UnlockOutcome {
        match unlock_with_password(document, password).and_then(|unlocked| finish(&unlocked, Some(password))) {
            Ok(outcome) => {
                info!(pages = outcome.result.pages_unlocked, "Document unlocked");
                outcome
            }
            Err(err) => {
                debug!(%err, "Unlock failed");
                UnlockOutcome::failure(&err, 1)
            }
        }
    }

    /// Try `extra` and then the dictionary until one password works.
    #[instrument(skip_all, fields(extra = extra.len()))]
    pub fn try_common_passwords<D: Decryptable>(&self, document: &D, extra: &[String]) -> UnlockOutcome {
        if !document.is_encrypted() {
            return UnlockOutcome::failure(&PagewerkError::NotEncrypted, 0);
        }

        let candidates = self.candidates(extra);
        for (index, candidate) in candidates.iter().enumerate() {
            let unlocked = match document.decrypt_with(candidate) {
                Ok(unlocked) => unlocked,
                Err(_) => continue,
            };
            match finish(&unlocked, Some(candidate)) {
                Ok(mut outcome) => {
                    outcome.attempts = index + 1;
                    info!(candidate = index + 1, "Password recovered");
                    return outcome;
                }
                // Accepted but unusable; keep walking like any other miss.
                Err(err) => warn!(candidate = index + 1, %err, "Decrypted document could not be written"),
            }
        }

        info!(tried = candidates.len(), "Dictionary exhausted");
        UnlockOutcome {
            result: CredentialAttemptResult::failed_with(EXHAUSTED_MESSAGE, EXHAUSTED_CODE),
            output: None,
            attempts: candidates.len(),
        }
    }

    /// A given password is used as-is; otherwise walk the dictionary.
    pub fn recover<D: Decryptable>(
        &self,
        document: &D,
        password: Option<&str>,
        extra: &[String],
    ) -> UnlockOutcome {
        match password {
            Some(password) => self.unlock(document, password),
            None => self.try_common_passwords(document, extra),
        }
    }

    /// Rewrite `document` without its security handler, dropping any
    /// print or edit restrictions. Without a password only the empty user
    /// password is tried; unencrypted input is rewritten unchanged.
    #[instrument(skip_all, fields(with_password = password.is_some()))]
    pub fn remove_restrictions<D: Decryptable>(&self, document: &D, password: Option<&str>) -> UnlockOutcome {
        if !document.is_encrypted() {
            return finish(document, None).unwrap_or_else(|err| UnlockOutcome::failure(&err, 0));
        }
        if let Some(password) = password {
            return self.unlock(document, password);
        }
        match document.decrypt_with("").and_then(|unlocked| finish(&unlocked, Some(""))) {
            Ok(outcome) => {
                info!(pages = outcome.result.pages_unlocked, "Restrictions removed");
                outcome
            }
            Err(PagewerkError::IncorrectPassword) => UnlockOutcome::failure(&PagewerkError::Encrypted, 1),
            Err(err) => UnlockOutcome::failure(&err, 1),
        }
    }
}

fn finish<D: Decryptable>(unlocked: &D, password: Option<&str>) -> Result<UnlockOutcome> {
    let pages = unlocked.page_count();
    if pages == 0 {
        return Err(PagewerkError::Pdf("decrypted document has no pages".into()));
    }
    let bytes = unlocked.unlocked_bytes()?;
    let result = match password {
        Some(password) => CredentialAttemptResult::unlocked(password, pages),
        None => CredentialAttemptResult::rewritten(pages),
    };
    Ok(UnlockOutcome {
        result,
        output: Some(bytes),
        attempts: 1,
    })
}
