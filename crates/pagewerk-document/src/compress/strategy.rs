// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-process compression strategies built on lopdf.
//
// Each strategy takes the parsed input and returns complete output bytes.
// A page that cannot be rewritten is left as it was; only document-level
// failures fail the strategy.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use pagewerk_core::error::{PagewerkError, Result};
use tracing::debug;

use crate::pdf::PageAssembler;
use crate::pdf::PdfDocument;
use crate::pdf::reader::{DEFAULT_MEDIA_BOX, inherited_attribute, page_content, rect};
use crate::pdf::writer::save_document;

/// Catalog and page keys that carry metadata rather than content.
const CATALOG_METADATA_KEYS: [&[u8]; 2] = [b"Metadata", b"PieceInfo"];
const PAGE_METADATA_KEYS: [&[u8]; 3] = [b"Metadata", b"PieceInfo", b"Thumb"];

/// Rebuild the document from its pages alone, dropping unreachable objects.
pub(crate) fn structural_rewrite(
    source: &PdfDocument,
    scale: Option<f32>,
    strip_metadata: bool,
) -> Result<Vec<u8>> {
    ensure_plain(source)?;
    let mut assembler = PageAssembler::new();
    assembler.append_pages(source, 0..source.page_count())?;
    if !strip_metadata {
        assembler.copy_metadata(source)?;
    }
    let mut document = assembler.finish();
    if let Some(scale) = scale {
        scale_pages(&mut document, scale);
    }
    finalize(&mut document)
}

/// Remove document and page metadata, keep everything else.
pub(crate) fn metadata_strip(source: &PdfDocument, scale: Option<f32>) -> Result<Vec<u8>> {
    ensure_plain(source)?;
    let mut document = source.lopdf().clone();
    remove_metadata(&mut document);
    if let Some(scale) = scale {
        scale_pages(&mut document, scale);
    }
    finalize(&mut document)
}

/// Re-encode every page's content operators into a single fresh stream.
pub(crate) fn content_stream_recompress(
    source: &PdfDocument,
    scale: Option<f32>,
    strip_metadata: bool,
) -> Result<Vec<u8>> {
    ensure_plain(source)?;
    let mut document = source.lopdf().clone();
    let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();
    let mut rewritten = 0;
    for page_id in page_ids {
        match recompress_page(&mut document, page_id, scale) {
            Ok(()) => rewritten += 1,
            Err(err) => debug!(?page_id, %err, "Page left unmodified"),
        }
    }
    debug!(rewritten, "Content streams re-encoded");
    if strip_metadata {
        remove_metadata(&mut document);
    }
    finalize(&mut document)
}

fn ensure_plain(source: &PdfDocument) -> Result<()> {
    if source.is_encrypted() {
        return Err(PagewerkError::Pdf(
            "cannot rewrite an encrypted document".to_owned(),
        ));
    }
    Ok(())
}

fn recompress_page(document: &mut Document, page_id: ObjectId, scale: Option<f32>) -> Result<()> {
    let raw = page_content(document, page_id)?;
    let content = Content::decode(&raw)
        .map_err(|err| PagewerkError::Pdf(format!("cannot parse content: {}", err)))?;
    let encoded = content
        .encode()
        .map_err(|err| PagewerkError::Pdf(format!("cannot encode content: {}", err)))?;
    replace_page_content(document, page_id, encoded, scale)
}

fn scale_pages(document: &mut Document, scale: f32) {
    let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();
    for page_id in page_ids {
        let result = page_content(document, page_id)
            .and_then(|content| replace_page_content(document, page_id, content, Some(scale)));
        if let Err(err) = result {
            debug!(?page_id, %err, "Page not scaled");
        }
    }
}

/// Point the page at a single new content stream, optionally wrapped in a
/// uniform scale about the origin with the page boxes shrunk to match.
fn replace_page_content(
    document: &mut Document,
    page_id: ObjectId,
    content: Vec<u8>,
    scale: Option<f32>,
) -> Result<()> {
    let boxes = match scale {
        Some(factor) => Some(scaled_boxes(document, page_id, factor)),
        None => None,
    };
    let bytes = match scale {
        Some(factor) => wrap_scaled(content, factor)?,
        None => content,
    };

    let stream_id = document.add_object(Stream::new(Dictionary::new(), bytes));
    let page = document
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|err| PagewerkError::Pdf(format!("cannot update page {:?}: {}", page_id, err)))?;
    page.set("Contents", Object::Reference(stream_id));
    if let Some((media_box, crop_box)) = boxes {
        page.set("MediaBox", rect_object(media_box));
        if let Some(crop_box) = crop_box {
            page.set("CropBox", rect_object(crop_box));
        }
    }
    Ok(())
}

fn scaled_boxes(document: &Document, page_id: ObjectId, factor: f32) -> ([f32; 4], Option<[f32; 4]>) {
    let lookup = |key: &[u8]| {
        inherited_attribute(document, page_id, key).and_then(|object| rect(document, object))
    };
    let media_box = lookup(b"MediaBox").unwrap_or(DEFAULT_MEDIA_BOX);
    let crop_box = lookup(b"CropBox");
    (
        media_box.map(|v| v * factor),
        crop_box.map(|rect| rect.map(|v| v * factor)),
    )
}

fn wrap_scaled(content: Vec<u8>, factor: f32) -> Result<Vec<u8>> {
    let prefix = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(factor.into()),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(factor.into()),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
        ],
    }
    .encode()
    .map_err(|err| PagewerkError::Pdf(format!("cannot encode transform: {}", err)))?;

    let mut bytes = Vec::with_capacity(prefix.len() + content.len() + 3);
    bytes.extend(prefix);
    bytes.push(b'\n');
    bytes.extend(content);
    bytes.extend(b"\nQ");
    Ok(bytes)
}

fn rect_object(values: [f32; 4]) -> Object {
    Object::Array(values.iter().map(|v| Object::Real((*v).into())).collect())
}

fn remove_metadata(document: &mut Document) {
    document.trailer.remove(b"Info");

    let catalog_id = document
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .ok();
    if let Some(catalog) = catalog_id
        .and_then(|id| document.get_object_mut(id).ok())
        .and_then(|object| object.as_dict_mut().ok())
    {
        for key in CATALOG_METADATA_KEYS {
            catalog.remove(key);
        }
    }

    let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();
    for page_id in page_ids {
        if let Ok(page) = document.get_object_mut(page_id).and_then(Object::as_dict_mut) {
            for key in PAGE_METADATA_KEYS {
                page.remove(key);
            }
        }
    }
}

/// Drop orphans, renumber densely, deflate streams, serialise.
fn finalize(document: &mut Document) -> Result<Vec<u8>> {
    document.prune_objects();
    document.renumber_objects();
    document.compress();
    save_document(document)
}
