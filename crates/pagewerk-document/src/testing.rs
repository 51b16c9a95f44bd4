// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Synthetic PDFs for unit tests.

use lopdf::content::{Content, Operation};
use lopdf::{
    Dictionary, Document, EncryptionState, EncryptionVersion, Object, Permissions, Stream,
    StringFormat,
};

use crate::pdf::PdfDocument;

/// Knobs for [`SampleOptions::build`].
#[derive(Debug, Clone)]
pub struct SampleOptions {
    /// Write a /Info dictionary with a title and author.
    pub with_metadata: bool,
    /// Extra identical text lines per page, to give compressors something to do.
    pub filler_lines: usize,
    /// Explicit /Rotate on the first page.
    pub rotate_first_page: Option<i64>,
    /// Explicit /MediaBox on the first page (others inherit 612x792).
    pub first_page_box: Option<[f32; 4]>,
    /// Add one small image XObject.
    pub with_image: bool,
    /// Give the first page a link annotation that jumps to the last page.
    pub link_first_to_last: bool,
    /// Encrypt with RC4-128 using `(user, owner)` passwords.
    pub encrypt: Option<(&'static str, &'static str)>,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            with_metadata: true,
            filler_lines: 0,
            rotate_first_page: None,
            first_page_box: None,
            with_image: false,
            link_first_to_last: false,
            encrypt: None,
        }
    }
}

impl SampleOptions {
    /// One page per label; each page shows its label.
    pub fn build(&self, labels: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ]));
        let mut fonts = Dictionary::new();
        fonts.set("F1", Object::Reference(font_id));
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(fonts));

        if self.with_image {
            let image = Stream::new(
                Dictionary::from_iter(vec![
                    ("Type", Object::Name(b"XObject".to_vec())),
                    ("Subtype", Object::Name(b"Image".to_vec())),
                    ("Width", Object::Integer(2)),
                    ("Height", Object::Integer(2)),
                    ("ColorSpace", Object::Name(b"DeviceGray".to_vec())),
                    ("BitsPerComponent", Object::Integer(8)),
                ]),
                vec![0, 255, 255, 0],
            );
            let image_id = doc.add_object(image);
            let mut xobjects = Dictionary::new();
            xobjects.set("Im1", Object::Reference(image_id));
            resources.set("XObject", Object::Dictionary(xobjects));
        }
        let resources_id = doc.add_object(resources);

        let mut page_ids = Vec::new();
        for (i, label) in labels.iter().enumerate() {
            let mut operations = vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
                Operation::new("Td", vec![Object::Integer(72), Object::Integer(720)]),
                Operation::new(
                    "Tj",
                    vec![Object::String(label.as_bytes().to_vec(), StringFormat::Literal)],
                ),
                Operation::new("ET", vec![]),
            ];
            for line in 0..self.filler_lines {
                operations.extend([
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(10)]),
                    Operation::new("Td", vec![Object::Integer(72), Object::Integer(700 - (line as i64 % 60) * 10)]),
                    Operation::new(
                        "Tj",
                        vec![Object::String(
                            b"The quick brown fox jumps over the lazy dog".to_vec(),
                            StringFormat::Literal,
                        )],
                    ),
                    Operation::new("ET", vec![]),
                ]);
            }
            let content = Content { operations };
            let encoded = content.encode().expect("encode content");
            let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

            let mut page = Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                ("Contents", Object::Reference(content_id)),
            ]);
            if i == 0 {
                if let Some(rotate) = self.rotate_first_page {
                    page.set("Rotate", Object::Integer(rotate));
                }
                if let Some(rect) = self.first_page_box {
                    page.set(
                        "MediaBox",
                        Object::Array(rect.iter().map(|v| Object::Real((*v).into())).collect()),
                    );
                }
            }
            page_ids.push(doc.add_object(page));
        }

        if let (true, Some(first), Some(last)) =
            (self.link_first_to_last, page_ids.first(), page_ids.last())
        {
            let link = Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Annot".to_vec())),
                ("Subtype", Object::Name(b"Link".to_vec())),
                (
                    "Rect",
                    Object::Array(vec![Object::Integer(0), Object::Integer(0), Object::Integer(100), Object::Integer(20)]),
                ),
                ("P", Object::Reference(*first)),
                (
                    "Dest",
                    Object::Array(vec![Object::Reference(*last), Object::Name(b"Fit".to_vec())]),
                ),
            ]);
            doc.get_object_mut(*first)
                .and_then(Object::as_dict_mut)
                .expect("first page")
                .set("Annots", Object::Array(vec![Object::Dictionary(link)]));
        }

        let pages = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(page_ids.len() as i64)),
            (
                "Kids",
                Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
            ),
            ("Resources", Object::Reference(resources_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ]),
            ),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        if self.with_metadata {
            let info_id = doc.add_object(Dictionary::from_iter(vec![
                (
                    "Title",
                    Object::String(b"Sample Document".to_vec(), StringFormat::Literal),
                ),
                (
                    "Author",
                    Object::String(b"Pagewerk Tests".to_vec(), StringFormat::Literal),
                ),
                (
                    "Producer",
                    Object::String(b"pagewerk test fixtures".to_vec(), StringFormat::Literal),
                ),
            ]));
            doc.trailer.set("Info", Object::Reference(info_id));
        }

        if let Some((user_password, owner_password)) = self.encrypt {
            let id = Object::String(b"pagewerk-fixture!".to_vec(), StringFormat::Hexadecimal);
            doc.trailer.set("ID", Object::Array(vec![id.clone(), id]));
            let state = EncryptionState::try_from(EncryptionVersion::V2 {
                document: &doc,
                owner_password,
                user_password,
                key_length: 128,
                permissions: Permissions::all(),
            })
            .expect("encryption state");
            doc.encrypt(&state).expect("encrypt sample pdf");
        }

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).expect("save sample pdf");
        buffer
    }

    /// [`SampleOptions::build`] with pages labelled `Page 1`, `Page 2`, ...
    pub fn build_pages(&self, pages: usize) -> Vec<u8> {
        let labels = page_labels(pages);
        let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
        self.build(&refs)
    }
}

fn page_labels(pages: usize) -> Vec<String> {
    (1..=pages).map(|n| format!("Page {n}")).collect()
}

/// Decoded content of page `index`, lossily as text.
pub fn page_text(doc: &PdfDocument, index: usize) -> String {
    let bytes = doc.page(index).expect("page").content().expect("content");
    String::from_utf8_lossy(&bytes).into_owned()
}

/// A PDF whose pages show the given labels.
pub fn labelled_pdf(labels: &[&str]) -> Vec<u8> {
    SampleOptions::default().build(labels)
}

/// A PDF with `pages` pages labelled `Page 1`, `Page 2`, ...
pub fn sample_pdf(pages: usize) -> Vec<u8> {
    SampleOptions::default().build_pages(pages)
}

/// Uncompressed, repetitive pages; plenty of room for compression.
pub fn bulky_pdf(pages: usize) -> Vec<u8> {
    SampleOptions {
        filler_lines: 200,
        ..SampleOptions::default()
    }
    .build_pages(pages)
}

/// Pages locked behind `user` (and `owner`) passwords.
pub fn encrypted_pdf(pages: usize, user: &'static str, owner: &'static str) -> Vec<u8> {
    SampleOptions {
        encrypt: Some((user, owner)),
        ..SampleOptions::default()
    }
    .build_pages(pages)
}
