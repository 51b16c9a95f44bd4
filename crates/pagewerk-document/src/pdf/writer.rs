// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — assemble a fresh document out of pages copied from one or
// more parsed sources.
//
// Every copied page is deep-cloned together with the objects it references.
// Shared resources (fonts, images) are cloned once per source so merged files
// do not balloon, and reference cycles terminate because each source object
// is mapped to its target ID before its children are visited. Links into
// pages that were not selected are cut rather than followed.

use std::collections::{HashMap, HashSet};

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use pagewerk_core::error::{PagewerkError, Result};
use tracing::{debug, instrument, warn};

use super::reader::{INHERITABLE_KEYS, PdfDocument, inherited_attribute, info_dictionary};

/// Builds a new PDF by appending pages in order.
pub struct PageAssembler {
    target: Document,
    /// Reserved ID of the single /Pages node, written in [`PageAssembler::finish`].
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
    info: Option<Dictionary>,
}

impl Default for PageAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl PageAssembler {
    pub fn new() -> Self {
        let mut target = Document::with_version("1.5");
        let pages_id = target.new_object_id();
        Self {
            target,
            pages_id,
            kids: Vec::new(),
            info: None,
        }
    }

    /// Number of pages appended so far.
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append the given 0-based pages of `source`, in the order yielded.
    ///
    /// Returns how many pages were appended. Any failure leaves the assembler
    /// in an unspecified state; callers drop it and report the error.
    #[instrument(skip_all, fields(source = source.source_path().unwrap_or("<memory>")))]
    pub fn append_pages(
        &mut self,
        source: &PdfDocument,
        indices: impl IntoIterator<Item = usize>,
    ) -> Result<usize> {
        let mut scope = CloneScope::new(source.lopdf(), source.page_ids().iter().copied().collect());

        // Every selected page gets its target ID before anything is cloned,
        // so links between selected pages resolve whichever comes first.
        let mut planned = Vec::new();
        for index in indices {
            let page_id = source.page_id(index)?;
            let target_id = match scope.map.get(&page_id) {
                // Repeated page: a second, independent copy.
                Some(_) => self.target.new_object_id(),
                None => {
                    let id = self.target.new_object_id();
                    scope.map.insert(page_id, id);
                    id
                }
            };
            planned.push((page_id, target_id));
        }

        for &(page_id, target_id) in &planned {
            self.clone_page(&mut scope, page_id, target_id)?;
            self.kids.push(target_id);
        }
        debug!(appended = planned.len(), objects = scope.map.len(), "Pages appended");
        Ok(planned.len())
    }

    /// Carry the document information dictionary (/Info) of `source` over.
    pub fn copy_metadata(&mut self, source: &PdfDocument) -> Result<()> {
        if let Some(info) = info_dictionary(source.lopdf()) {
            let mut scope = CloneScope::new(source.lopdf(), HashSet::new());
            let cloned = self.deep_clone(&mut scope, &Object::Dictionary(info.clone()))?;
            if let Object::Dictionary(dict) = cloned {
                self.info = Some(dict);
            }
        }
        Ok(())
    }

    /// Write the page tree, catalog, and trailer and hand back the document.
    pub fn finish(mut self) -> Document {
        let kids: Vec<Object> = self.kids.iter().map(|id| Object::Reference(*id)).collect();
        let pages = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(kids.len() as i64)),
            ("Kids", Object::Array(kids)),
        ]);
        self.target
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_id)),
        ]);
        let catalog_id = self.target.add_object(catalog);
        self.target.trailer.set("Root", Object::Reference(catalog_id));

        if let Some(info) = self.info.take() {
            let info_id = self.target.add_object(info);
            self.target.trailer.set("Info", Object::Reference(info_id));
        }

        self.target
    }

    /// Finish and serialise.
    pub fn to_bytes(self) -> Result<Vec<u8>> {
        let mut document = self.finish();
        save_document(&mut document)
    }

    // -- Helpers --------------------------------------------------------------

    /// Clone one page dictionary into the reserved `target_id`. /Parent is
    /// dropped and re-pointed at our /Pages node; attributes the page
    /// inherited are made explicit since the old ancestors are not copied.
    fn clone_page(&mut self, scope: &mut CloneScope<'_>, page_id: ObjectId, target_id: ObjectId) -> Result<()> {
        let source = scope.source;
        let page = source.get_dictionary(page_id).map_err(|err| {
            PagewerkError::Pdf(format!("cannot read page object {:?}: {}", page_id, err))
        })?;

        let mut new_page = Dictionary::new();
        for (key, value) in page.iter() {
            if key == b"Parent" {
                continue;
            }
            let cloned_value = self.deep_clone(scope, value)?;
            new_page.set(key.clone(), cloned_value);
        }

        for key in INHERITABLE_KEYS {
            if new_page.has(key) {
                continue;
            }
            if let Some(value) = inherited_attribute(source, page_id, key) {
                let cloned_value = self.deep_clone(scope, value)?;
                new_page.set(key.to_vec(), cloned_value);
            }
        }

        new_page.set("Parent", Object::Reference(self.pages_id));
        self.target
            .objects
            .insert(target_id, Object::Dictionary(new_page));
        Ok(())
    }

    /// Deep-clone an object, following references (except /Parent, which
    /// would drag the whole source page tree along). References to pages
    /// outside the selection become Null.
    fn deep_clone(&mut self, scope: &mut CloneScope<'_>, object: &Object) -> Result<Object> {
        match object {
            Object::Dictionary(dict) => Ok(Object::Dictionary(self.clone_dictionary(scope, dict)?)),
            Object::Array(items) => {
                let mut new_items = Vec::with_capacity(items.len());
                for item in items {
                    new_items.push(self.deep_clone(scope, item)?);
                }
                Ok(Object::Array(new_items))
            }
            Object::Stream(stream) => {
                let dict = self.clone_dictionary(scope, &stream.dict)?;
                let mut cloned = Stream::new(dict, stream.content.clone());
                cloned.allows_compression = stream.allows_compression;
                Ok(Object::Stream(cloned))
            }
            Object::Reference(ref_id) => {
                if let Some(mapped) = scope.map.get(ref_id) {
                    return Ok(Object::Reference(*mapped));
                }
                if scope.pages.contains(ref_id) {
                    debug!(?ref_id, "Dropping link to unselected page");
                    return Ok(Object::Null);
                }
                let source = scope.source;
                match source.get_object(*ref_id) {
                    Ok(referenced) => {
                        let new_id = self.target.new_object_id();
                        scope.map.insert(*ref_id, new_id);
                        let cloned = self.deep_clone(scope, referenced)?;
                        self.target.objects.insert(new_id, cloned);
                        Ok(Object::Reference(new_id))
                    }
                    Err(err) => {
                        warn!(?ref_id, %err, "Cannot resolve reference, using Null");
                        Ok(Object::Null)
                    }
                }
            }
            // Boolean, Integer, Real, String, Name, Null.
            other => Ok(other.clone()),
        }
    }

    fn clone_dictionary(&mut self, scope: &mut CloneScope<'_>, dict: &Dictionary) -> Result<Dictionary> {
        let mut new_dict = Dictionary::new();
        for (key, value) in dict.iter() {
            if key == b"Parent" {
                continue;
            }
            let cloned_value = self.deep_clone(scope, value)?;
            new_dict.set(key.clone(), cloned_value);
        }
        Ok(new_dict)
    }
}

/// Cloning state for one source document.
struct CloneScope<'s> {
    source: &'s Document,
    /// Source object ID to target object ID.
    map: HashMap<ObjectId, ObjectId>,
    /// Every page of the source, selected or not.
    pages: HashSet<ObjectId>,
}

impl<'s> CloneScope<'s> {
    fn new(source: &'s Document, pages: HashSet<ObjectId>) -> Self {
        Self {
            source,
            map: HashMap::new(),
            pages,
        }
    }
}

/// Serialise a lopdf document to bytes.
pub(crate) fn save_document(document: &mut Document) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    document
        .save_to(&mut output)
        .map_err(|err| PagewerkError::Pdf(format!("failed to serialise PDF: {}", err)))?;
    Ok(output)
}

/// Copy the given pages of `source` into a standalone PDF.
pub fn extract_pages(
    source: &PdfDocument,
    indices: impl IntoIterator<Item = usize>,
) -> Result<Vec<u8>> {
    let mut assembler = PageAssembler::new();
    assembler.append_pages(source, indices)?;
    assembler.to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{SampleOptions, labelled_pdf, page_text, sample_pdf};

    #[test]
    fn assembled_pages_keep_order() {
        let a = PdfDocument::from_bytes(&labelled_pdf(&["A1", "A2", "A3"])).expect("a");
        let b = PdfDocument::from_bytes(&labelled_pdf(&["B1", "B2"])).expect("b");

        let mut assembler = PageAssembler::new();
        assert_eq!(assembler.append_pages(&a, [2, 0]).expect("append a"), 2);
        assert_eq!(assembler.append_pages(&b, [1]).expect("append b"), 1);
        assert_eq!(assembler.page_count(), 3);

        let merged = PdfDocument::from_bytes(&assembler.to_bytes().expect("bytes")).expect("reload");
        assert_eq!(merged.page_count(), 3);
        assert!(page_text(&merged, 0).contains("A3"));
        assert!(page_text(&merged, 1).contains("A1"));
        assert!(page_text(&merged, 2).contains("B2"));
    }

    #[test]
    fn inherited_geometry_survives_copy() {
        let source = PdfDocument::from_bytes(&sample_pdf(2)).expect("load");
        let bytes = extract_pages(&source, [1]).expect("extract");
        let copy = PdfDocument::from_bytes(&bytes).expect("reload");
        let geometry = copy.page(0).expect("page").geometry();
        assert_eq!((geometry.width, geometry.height), (612.0, 792.0));
    }

    #[test]
    fn metadata_is_only_copied_on_request() {
        let source = PdfDocument::from_bytes(&sample_pdf(1)).expect("load");

        let bare = PdfDocument::from_bytes(&extract_pages(&source, [0]).expect("extract")).expect("reload");
        assert!(bare.metadata().is_empty());

        let mut assembler = PageAssembler::new();
        assembler.append_pages(&source, [0]).expect("append");
        assembler.copy_metadata(&source).expect("metadata");
        let kept = PdfDocument::from_bytes(&assembler.to_bytes().expect("bytes")).expect("reload");
        assert_eq!(kept.metadata().get("Title").map(String::as_str), Some("Sample Document"));
    }

    #[test]
    fn out_of_range_page_is_an_error() {
        let source = PdfDocument::from_bytes(&sample_pdf(2)).expect("load");
        let mut assembler = PageAssembler::new();
        assert!(matches!(
            assembler.append_pages(&source, [5]),
            Err(PagewerkError::Pdf(_))
        ));
    }

    fn page_objects(document: &Document) -> usize {
        document
            .objects
            .values()
            .filter(|object| object.as_dict().is_ok_and(|dict| dict.has_type(b"Page")))
            .count()
    }

    fn first_link_target(document: &Document) -> Object {
        let first_page = document.get_pages()[&1];
        let annots = document
            .get_dictionary(first_page)
            .and_then(|page| page.get(b"Annots"))
            .and_then(Object::as_array)
            .expect("annots");
        let dest = annots[0]
            .as_dict()
            .and_then(|link| link.get(b"Dest"))
            .and_then(Object::as_array)
            .expect("dest");
        dest[0].clone()
    }

    #[test]
    fn links_to_unselected_pages_are_cut() {
        let source = PdfDocument::from_bytes(
            &SampleOptions {
                link_first_to_last: true,
                ..SampleOptions::default()
            }
            .build_pages(3),
        )
        .expect("load");

        let bytes = extract_pages(&source, [0]).expect("extract");
        let extracted = Document::load_mem(&bytes).expect("reload");
        assert_eq!(extracted.get_pages().len(), 1);
        assert_eq!(page_objects(&extracted), 1);
        assert_eq!(first_link_target(&extracted), Object::Null);
    }

    #[test]
    fn links_between_selected_pages_are_kept() {
        let source = PdfDocument::from_bytes(
            &SampleOptions {
                link_first_to_last: true,
                ..SampleOptions::default()
            }
            .build_pages(3),
        )
        .expect("load");

        let bytes = extract_pages(&source, [0, 2]).expect("extract");
        let extracted = Document::load_mem(&bytes).expect("reload");
        assert_eq!(page_objects(&extracted), 2);
        let last_page = extracted.get_pages()[&2];
        assert_eq!(first_link_target(&extracted), Object::Reference(last_page));
    }
}
