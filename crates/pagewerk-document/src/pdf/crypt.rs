// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Decryption of password-protected documents.
//
// lopdf decrypts on load only when the empty user password opens a file.
// Anything else is left with an /Encrypt entry and no readable objects, so a
// locked document is parsed again from its bytes with /Encrypt masked out,
// then decrypted in place once the password has been checked.

use std::collections::BTreeMap;

use lopdf::{Document, Object, ObjectId, Reader};
use pagewerk_core::error::{PagewerkError, Result};
use tracing::{debug, instrument};

use crate::pdf::PdfDocument;

const ENCRYPT_NAME: &[u8] = b"/Encrypt";
/// Same length as `/Encrypt` so xref offsets stay valid.
const MASKED_NAME: &[u8] = b"/NoCrypt";
/// Stand-in /Type that keeps object streams from being unpacked while
/// their content is still ciphertext.
const SHELVED_OBJECT_STREAM: &[u8] = b"PwObjStm";

type ObjectFilter = fn(ObjectId, &mut Object) -> Option<(ObjectId, Object)>;

/// A decrypted copy of `source`, opened with its user password. Anything
/// else, owner passwords included, is `IncorrectPassword`: lopdf derives the
/// file key from the user password only.
#[instrument(skip_all)]
pub(crate) fn decrypt_document(source: &PdfDocument, password: &str) -> Result<PdfDocument> {
    let document = source.lopdf();
    if !document.is_encrypted() {
        return Err(PagewerkError::NotEncrypted);
    }
    document
        .authenticate_user_password(password)
        .map_err(|_| PagewerkError::IncorrectPassword)?;

    let decrypted = match source.locked_source() {
        Some(bytes) => {
            let encrypt_id = document
                .trailer
                .get(b"Encrypt")
                .and_then(Object::as_reference)
                .map_err(|err| PagewerkError::Pdf(format!("unusable /Encrypt entry: {err}")))?;
            reload_and_decrypt(bytes, encrypt_id, password)?
        }
        // Opened with the empty user password while loading; objects are
        // already plain text.
        None => {
            let mut copy = document.clone();
            strip_encryption(&mut copy);
            copy
        }
    };

    debug!(objects = decrypted.objects.len(), "Document decrypted");
    Ok(PdfDocument::from_lopdf(
        decrypted,
        source.source_path().map(str::to_owned),
        source.byte_len(),
    ))
}

fn reload_and_decrypt(bytes: &[u8], encrypt_id: ObjectId, password: &str) -> Result<Document> {
    let masked = mask_encrypt_entries(bytes);
    let reader = Reader {
        buffer: &masked,
        document: Document::new(),
        encryption_state: None,
        raw_objects: BTreeMap::new(),
    };
    let mut document = reader
        .read(Some(shelve_object_streams as ObjectFilter))
        .map_err(|err| PagewerkError::Pdf(format!("failed to re-read encrypted PDF: {err}")))?;

    document.trailer.remove(&MASKED_NAME[1..]);
    document.trailer.set("Encrypt", Object::Reference(encrypt_id));
    restore_object_streams(&mut document);

    document
        .decrypt(password)
        .map_err(|_| PagewerkError::IncorrectPassword)?;
    Ok(document)
}

/// Rename every `/Encrypt` name token. `/EncryptMetadata` and other longer
/// names are left alone.
fn mask_encrypt_entries(bytes: &[u8]) -> Vec<u8> {
    let mut masked = bytes.to_vec();
    let mut at = 0;
    while let Some(found) = find(&masked[at..], ENCRYPT_NAME) {
        let start = at + found;
        let end = start + ENCRYPT_NAME.len();
        if masked.get(end).is_none_or(|&next| ends_name(next)) {
            masked[start..end].copy_from_slice(MASKED_NAME);
        }
        at = end;
    }
    masked
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Whitespace or delimiter: the byte cannot continue a PDF name.
fn ends_name(byte: u8) -> bool {
    matches!(
        byte,
        b'\0' | b'\t' | b'\n' | b'\x0C' | b'\r' | b' ' | b'(' | b')' | b'<' | b'>' | b'[' | b']'
            | b'{' | b'}' | b'/' | b'%'
    )
}

// Only the in-place edit matters; the returned pair is discarded for
// top-level objects.
fn shelve_object_streams(id: ObjectId, object: &mut Object) -> Option<(ObjectId, Object)> {
    if let Object::Stream(stream) = object {
        if stream.dict.has_type(b"ObjStm") {
            stream.dict.set("Type", Object::Name(SHELVED_OBJECT_STREAM.to_vec()));
        }
    }
    Some((id, Object::Null))
}

fn restore_object_streams(document: &mut Document) {
    for object in document.objects.values_mut() {
        if let Object::Stream(stream) = object {
            if stream.dict.has_type(SHELVED_OBJECT_STREAM) {
                stream.dict.set("Type", Object::Name(b"ObjStm".to_vec()));
            }
        }
    }
}

fn strip_encryption(document: &mut Document) {
    if let Some(id) = document
        .trailer
        .remove(b"Encrypt")
        .and_then(|object| object.as_reference().ok())
    {
        document.objects.remove(&id);
    }
    document.encryption_state = None;
}
