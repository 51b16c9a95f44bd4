// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — open and inspect existing PDF documents using the `lopdf`
// crate. Pages live in an arena owned by the document; a `Page` is only a
// borrowed index into it.

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::{Document, Object, ObjectId, Stream};
use pagewerk_core::error::{PagewerkError, Result};
use pagewerk_core::types::PageGeometry;
use tracing::{debug, info, instrument};

/// Page size assumed when neither the page nor its ancestors carry a
/// /MediaBox (US Letter, in points).
pub const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Page attributes that may be inherited from /Pages ancestors.
pub(crate) const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guards against cyclic /Parent chains in damaged files.
const MAX_TREE_DEPTH: usize = 64;

/// A parsed PDF document and its page arena.
pub struct PdfDocument {
    /// The underlying lopdf document.
    document: Document,
    /// Page object IDs in reading order; index `i` is page `i + 1`.
    pages: Vec<ObjectId>,
    /// Source path, if opened from a file (useful for diagnostics).
    source_path: Option<String>,
    /// Size of the serialised input.
    byte_len: u64,
    /// Input bytes, kept only when lopdf could not decrypt the file on load.
    locked_source: Option<Vec<u8>>,
}

impl PdfDocument {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let data = std::fs::read(path_ref).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                PagewerkError::SourceNotFound(path_ref.display().to_string())
            } else {
                PagewerkError::Io(err)
            }
        })?;

        let mut reader = Self::from_bytes(&data).map_err(|err| match err {
            PagewerkError::Pdf(detail) => PagewerkError::Pdf(format!(
                "failed to open {}: {}",
                path_ref.display(),
                detail
            )),
            other => other,
        })?;
        reader.source_path = Some(path_ref.display().to_string());
        Ok(reader)
    }

    /// Parse raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data)
            .map_err(|err| PagewerkError::Pdf(format!("failed to load PDF: {}", err)))?;

        let locked = document.is_encrypted() && document.encryption_state.is_none();
        let mut reader = Self::from_lopdf(document, None, data.len() as u64);
        if locked {
            reader.locked_source = Some(data.to_vec());
        }
        debug!(pages = reader.page_count(), locked, "PDF loaded from bytes");
        Ok(reader)
    }

    pub(crate) fn from_lopdf(
        document: Document,
        source_path: Option<String>,
        byte_len: u64,
    ) -> Self {
        // get_pages() is keyed by 1-based page number, already in order.
        let pages = document.get_pages().into_values().collect();
        Self {
            document,
            pages,
            source_path,
            byte_len,
            locked_source: None,
        }
    }

    // -- Inspection -----------------------------------------------------------

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// The file carries an /Encrypt dictionary.
    pub fn is_encrypted(&self) -> bool {
        self.document.is_encrypted()
    }

    /// Encrypted with a user password other than the empty one. Such a
    /// document exposes no pages until it is decrypted.
    pub fn requires_password(&self) -> bool {
        self.locked_source.is_some()
    }

    /// Return the source path if the reader was created via [`PdfDocument::open`].
    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    /// Size in bytes of the data this document was parsed from.
    pub fn byte_len(&self) -> u64 {
        self.byte_len
    }

    /// Borrow page `index` (0-based).
    pub fn page(&self, index: usize) -> Option<Page<'_>> {
        (index < self.pages.len()).then_some(Page { owner: self, index })
    }

    pub fn pages(&self) -> impl Iterator<Item = Page<'_>> + '_ {
        (0..self.pages.len()).map(move |index| Page { owner: self, index })
    }

    /// Document information dictionary as text. Keys lose their leading
    /// slash (`Title`, `Author`, ...). Documents that require a password
    /// report nothing, their strings are still ciphertext.
    pub fn metadata(&self) -> BTreeMap<String, String> {
        let mut metadata = BTreeMap::new();
        if self.requires_password() {
            return metadata;
        }
        let Some(info) = info_dictionary(&self.document) else {
            return metadata;
        };

        for (key, value) in info.iter() {
            let text = match resolve(&self.document, value) {
                Object::String(bytes, _) => decode_text_string(bytes),
                Object::Name(name) => String::from_utf8_lossy(name).into_owned(),
                Object::Integer(n) => n.to_string(),
                Object::Boolean(b) => b.to_string(),
                _ => continue,
            };
            metadata.insert(String::from_utf8_lossy(key).into_owned(), text);
        }
        metadata
    }

    /// Whether any image XObject is present anywhere in the file.
    pub fn has_images(&self) -> bool {
        self.document.objects.values().any(|object| match object {
            Object::Stream(stream) => matches!(
                stream.dict.get(b"Subtype"),
                Ok(Object::Name(name)) if name.as_slice() == b"Image"
            ),
            _ => false,
        })
    }

    // -- Crate internals ------------------------------------------------------

    pub(crate) fn lopdf(&self) -> &Document {
        &self.document
    }

    pub(crate) fn locked_source(&self) -> Option<&[u8]> {
        self.locked_source.as_deref()
    }

    /// Refuse documents whose pages cannot be read yet.
    pub(crate) fn ensure_readable(&self) -> Result<()> {
        if self.requires_password() {
            return Err(PagewerkError::Encrypted);
        }
        Ok(())
    }

    /// Object IDs of every page, for telling page references apart.
    pub(crate) fn page_ids(&self) -> &[ObjectId] {
        &self.pages
    }

    pub(crate) fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.pages.get(index).copied().ok_or_else(|| {
            PagewerkError::Pdf(format!(
                "page {} out of range (document has {} pages)",
                index + 1,
                self.pages.len()
            ))
        })
    }
}

/// Immutable view of one page. Cannot outlive the owning [`PdfDocument`].
#[derive(Clone, Copy)]
pub struct Page<'a> {
    owner: &'a PdfDocument,
    index: usize,
}

impl<'a> Page<'a> {
    /// 0-based position in the document.
    pub fn index(&self) -> usize {
        self.index
    }

    /// 1-based page number.
    pub fn number(&self) -> usize {
        self.index + 1
    }

    fn id(&self) -> ObjectId {
        self.owner.pages[self.index]
    }

    fn media_box(&self) -> [f32; 4] {
        inherited_attribute(&self.owner.document, self.id(), b"MediaBox")
            .and_then(|obj| rect(&self.owner.document, obj))
            .unwrap_or(DEFAULT_MEDIA_BOX)
    }

    pub fn width(&self) -> f32 {
        let [x0, _, x1, _] = self.media_box();
        (x1 - x0).abs()
    }

    pub fn height(&self) -> f32 {
        let [_, y0, _, y1] = self.media_box();
        (y1 - y0).abs()
    }

    /// Clockwise rotation normalised to 0, 90, 180, or 270.
    pub fn rotation(&self) -> i32 {
        inherited_attribute(&self.owner.document, self.id(), b"Rotate")
            .and_then(|obj| obj.as_i64().ok())
            .map(|degrees| (degrees as i32).rem_euclid(360))
            .unwrap_or(0)
    }

    pub fn geometry(&self) -> PageGeometry {
        PageGeometry {
            page_number: self.number(),
            width: self.width(),
            height: self.height(),
            rotation: self.rotation(),
        }
    }

    /// Decoded content stream(s) of this page, concatenated.
    pub fn content(&self) -> Result<Vec<u8>> {
        page_content(&self.owner.document, self.id())
    }
}

// -- Shared lopdf helpers -----------------------------------------------------

/// Follow a single indirect reference; anything else is returned as-is.
pub(crate) fn resolve<'a>(document: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => document.get_object(*id).unwrap_or(object),
        other => other,
    }
}

/// Look up `key` on the page, then on each /Pages ancestor.
pub(crate) fn inherited_attribute<'a>(
    document: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut node_id = page_id;
    for _ in 0..MAX_TREE_DEPTH {
        let node = document.get_dictionary(node_id).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(resolve(document, value));
        }
        node_id = node.get(b"Parent").and_then(Object::as_reference).ok()?;
    }
    None
}

/// Read a four-number rectangle, resolving indirect elements.
pub(crate) fn rect(document: &Document, object: &Object) -> Option<[f32; 4]> {
    let Object::Array(items) = resolve(document, object) else {
        return None;
    };
    if items.len() != 4 {
        return None;
    }
    let mut out = [0.0f32; 4];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = number(resolve(document, item))?;
    }
    Some(out)
}

pub(crate) fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(n) => Some(*n as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

pub(crate) fn info_dictionary(document: &Document) -> Option<&lopdf::Dictionary> {
    let info = document.trailer.get(b"Info").ok()?;
    match resolve(document, info) {
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// IDs of the content streams referenced by a page's /Contents.
pub(crate) fn content_stream_ids(document: &Document, page_id: ObjectId) -> Result<Vec<ObjectId>> {
    let page = document
        .get_dictionary(page_id)
        .map_err(|err| PagewerkError::Pdf(format!("cannot read page {:?}: {}", page_id, err)))?;

    let contents = match page.get(b"Contents") {
        Ok(contents) => contents,
        Err(_) => return Ok(Vec::new()),
    };

    match contents {
        Object::Reference(id) => match document.get_object(*id) {
            Ok(Object::Array(items)) => Ok(items
                .iter()
                .filter_map(|item| item.as_reference().ok())
                .collect()),
            Ok(_) => Ok(vec![*id]),
            Err(err) => Err(PagewerkError::Pdf(format!(
                "page {:?} has a dangling /Contents: {}",
                page_id, err
            ))),
        },
        Object::Array(items) => Ok(items
            .iter()
            .filter_map(|item| item.as_reference().ok())
            .collect()),
        _ => Err(PagewerkError::Pdf(format!(
            "page {:?} has a malformed /Contents",
            page_id
        ))),
    }
}

/// Decoded bytes of a single stream. Unfiltered streams are returned as-is.
pub(crate) fn stream_bytes(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.has(b"Filter") {
        stream
            .decompressed_content()
            .map_err(|err| PagewerkError::Pdf(format!("cannot decode stream: {}", err)))
    } else {
        Ok(stream.content.clone())
    }
}

/// All content streams of a page, decoded and joined with newlines.
pub(crate) fn page_content(document: &Document, page_id: ObjectId) -> Result<Vec<u8>> {
    let mut content = Vec::new();
    for stream_id in content_stream_ids(document, page_id)? {
        let stream = match document.get_object(stream_id) {
            Ok(Object::Stream(stream)) => stream,
            _ => {
                return Err(PagewerkError::Pdf(format!(
                    "content {:?} is not a stream",
                    stream_id
                )));
            }
        };
        if !content.is_empty() {
            content.push(b'\n');
        }
        content.extend(stream_bytes(stream)?);
    }
    Ok(content)
}

/// Decode a PDF text string: UTF-16BE with BOM, UTF-8 with BOM, otherwise
/// treated as Latin-1 (close enough to PDFDocEncoding for metadata).
pub(crate) fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(utf8) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(utf8).into_owned();
    }
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{SampleOptions, labelled_pdf, sample_pdf};

    #[test]
    fn counts_pages_in_order() {
        let doc = PdfDocument::from_bytes(&labelled_pdf(&["A1", "A2", "A3"])).expect("load");
        assert_eq!(doc.page_count(), 3);
        assert!(!doc.is_encrypted());

        let second = doc.page(1).expect("page 2");
        assert_eq!(second.number(), 2);
        let content = String::from_utf8_lossy(&second.content().expect("content")).into_owned();
        assert!(content.contains("A2"));
        assert!(doc.page(3).is_none());
    }

    #[test]
    fn geometry_is_inherited_from_page_tree() {
        let doc = PdfDocument::from_bytes(&sample_pdf(2)).expect("load");
        let geometry = doc.page(0).expect("page").geometry();
        assert_eq!(geometry.page_number, 1);
        assert_eq!(geometry.width, 612.0);
        assert_eq!(geometry.height, 792.0);
        assert_eq!(geometry.rotation, 0);
    }

    #[test]
    fn per_page_rotation_and_size() {
        let options = SampleOptions {
            rotate_first_page: Some(-90),
            first_page_box: Some([0.0, 0.0, 300.0, 400.0]),
            ..SampleOptions::default()
        };
        let doc = PdfDocument::from_bytes(&options.build(&["x", "y"])).expect("load");
        let first = doc.page(0).expect("page");
        assert_eq!(first.rotation(), 270);
        assert_eq!(first.width(), 300.0);
        assert_eq!(first.height(), 400.0);
        assert_eq!(doc.page(1).expect("page").rotation(), 0);
    }

    #[test]
    fn metadata_is_decoded() {
        let doc = PdfDocument::from_bytes(&sample_pdf(1)).expect("load");
        let metadata = doc.metadata();
        assert_eq!(metadata.get("Title").map(String::as_str), Some("Sample Document"));
        assert_eq!(metadata.get("Author").map(String::as_str), Some("Pagewerk Tests"));
    }

    #[test]
    fn open_missing_file_is_source_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = PdfDocument::open(dir.path().join("missing.pdf"));
        assert!(matches!(result, Err(PagewerkError::SourceNotFound(_))));
    }

    #[test]
    fn garbage_is_a_pdf_error() {
        let result = PdfDocument::from_bytes(b"definitely not a pdf");
        assert!(matches!(result, Err(PagewerkError::Pdf(_))));
    }

    #[test]
    fn text_string_decoding() {
        assert_eq!(decode_text_string(b"plain"), "plain");
        assert_eq!(decode_text_string(&[0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69]), "Hi");
        assert_eq!(decode_text_string(&[0xE9]), "\u{e9}");
    }
}
