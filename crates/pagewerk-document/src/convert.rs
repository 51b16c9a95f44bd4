// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image conversion — one PDF page per image.
//
// Images are decoded with the `image` crate and embedded as deflated image
// XObjects. `PageSize::Auto` sizes each page to its image at 96 dpi; a fixed
// size fits the image inside the page, centred, aspect ratio kept.

use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};
use pagewerk_core::error::{PagewerkError, Result};
use pagewerk_core::types::PageSize;
use pagewerk_security::check_filename;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::pdf::writer::save_document;
use crate::sink::{OutputRecord, OutputSink};

/// File extensions accepted by [`ImageConverter::images_to_pdf`].
pub const SUPPORTED_IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "bmp", "tif", "tiff", "gif"];

const AUTO_DPI: f32 = 96.0;

/// What an image conversion produced.
#[derive(Debug, Clone, Serialize)]
pub struct ImageConversionReport {
    pub output: OutputRecord,
    pub images_processed: usize,
    /// Inputs left out because they were missing or not a supported image.
    pub skipped: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImageConverter {
    page_size: PageSize,
}

impl ImageConverter {
    pub fn new(page_size: PageSize) -> Self {
        Self { page_size }
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    /// Convert every usable image in `paths` into one PDF, in input order.
    ///
    /// Missing files and unsupported extensions are skipped and listed in
    /// the report. Nothing usable left is `NoImages`; an image that fails to
    /// decode fails the whole call with nothing written.
    #[instrument(skip_all, fields(inputs = paths.len(), output = name))]
    pub fn images_to_pdf<P: AsRef<Path>>(
        &self,
        paths: &[P],
        sink: &mut dyn OutputSink,
        name: &str,
    ) -> Result<ImageConversionReport> {
        check_filename(name)?;

        let mut usable = Vec::new();
        let mut skipped = Vec::new();
        for path in paths.iter().map(AsRef::as_ref) {
            if path.is_file() && is_supported(path) {
                usable.push(path);
            } else {
                debug!(path = %path.display(), "Skipping input");
                skipped.push(path.to_path_buf());
            }
        }
        if usable.is_empty() {
            return Err(PagewerkError::NoImages);
        }

        let images = usable
            .iter()
            .map(|path| open_image(path))
            .collect::<Result<Vec<_>>>()?;
        let bytes = self.build(&images)?;
        let output = sink.commit(name, &bytes)?;
        info!(images = images.len(), skipped = skipped.len(), "Images converted to PDF");
        Ok(ImageConversionReport {
            output,
            images_processed: images.len(),
            skipped,
        })
    }

    /// Convert a single image.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), output = name))]
    pub fn image_to_pdf(
        &self,
        path: impl AsRef<Path>,
        sink: &mut dyn OutputSink,
        name: &str,
    ) -> Result<ImageConversionReport> {
        let path = path.as_ref();
        check_filename(name)?;
        if !path.is_file() {
            return Err(PagewerkError::SourceNotFound(path.display().to_string()));
        }
        let image = open_image(path)?;
        let bytes = self.build(std::slice::from_ref(&image))?;
        let output = sink.commit(name, &bytes)?;
        info!("Image converted to PDF");
        Ok(ImageConversionReport {
            output,
            images_processed: 1,
            skipped: Vec::new(),
        })
    }

    /// Serialise one page per decoded image.
    pub fn build(&self, images: &[DynamicImage]) -> Result<Vec<u8>> {
        if images.is_empty() {
            return Err(PagewerkError::NoImages);
        }

        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        let mut kids = Vec::with_capacity(images.len());

        for image in images {
            let (width_px, height_px) = image.dimensions();
            if width_px == 0 || height_px == 0 {
                return Err(PagewerkError::Image("image has no pixels".to_owned()));
            }
            let natural = (px_to_pt(width_px), px_to_pt(height_px));
            let page_box = self.page_size.dimensions().unwrap_or(natural);
            let placement = fit(natural, page_box);

            let image_id = document.add_object(image_xobject(image));
            let content = draw_image(&placement)?;
            let content_id = document.add_object(Stream::new(Dictionary::new(), content));

            let mut xobjects = Dictionary::new();
            xobjects.set("Im1", Object::Reference(image_id));
            let mut resources = Dictionary::new();
            resources.set("XObject", Object::Dictionary(xobjects));

            let page = Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                (
                    "MediaBox",
                    Object::Array(vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(page_box.0.into()),
                        Object::Real(page_box.1.into()),
                    ]),
                ),
                ("Resources", Object::Dictionary(resources)),
                ("Contents", Object::Reference(content_id)),
            ]);
            kids.push(document.add_object(page));
        }

        let pages = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(kids.len() as i64)),
            (
                "Kids",
                Object::Array(kids.iter().map(|id| Object::Reference(*id)).collect()),
            ),
        ]);
        document.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = document.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        document.trailer.set("Root", Object::Reference(catalog_id));

        document.compress();
        save_document(&mut document)
    }
}

/// Where the image lands on its page, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Placement {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

fn px_to_pt(pixels: u32) -> f32 {
    pixels as f32 * 72.0 / AUTO_DPI
}

/// Largest size with the image's aspect ratio that fits `page`, centred.
fn fit(image: (f32, f32), page: (f32, f32)) -> Placement {
    let scale = (page.0 / image.0).min(page.1 / image.1);
    let width = image.0 * scale;
    let height = image.1 * scale;
    Placement {
        x: (page.0 - width) / 2.0,
        y: (page.1 - height) / 2.0,
        width,
        height,
    }
}

fn draw_image(placement: &Placement) -> Result<Vec<u8>> {
    Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(placement.width.into()),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(placement.height.into()),
                    Object::Real(placement.x.into()),
                    Object::Real(placement.y.into()),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im1".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    }
    .encode()
    .map_err(|err| PagewerkError::Pdf(format!("cannot encode image page: {}", err)))
}

/// 8-bit image XObject; alpha is dropped, grey images stay grey.
fn image_xobject(image: &DynamicImage) -> Stream {
    let (color_space, pixels): (&[u8], Vec<u8>) = match image {
        DynamicImage::ImageLuma8(gray) => (b"DeviceGray", gray.as_raw().clone()),
        other => (b"DeviceRGB", other.to_rgb8().into_raw()),
    };
    let (width, height) = image.dimensions();
    Stream::new(
        Dictionary::from_iter(vec![
            ("Type", Object::Name(b"XObject".to_vec())),
            ("Subtype", Object::Name(b"Image".to_vec())),
            ("Width", Object::Integer(i64::from(width))),
            ("Height", Object::Integer(i64::from(height))),
            ("ColorSpace", Object::Name(color_space.to_vec())),
            ("BitsPerComponent", Object::Integer(8)),
        ]),
        pixels,
    )
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_IMAGE_EXTENSIONS
                .iter()
                .any(|supported| supported.eq_ignore_ascii_case(ext))
        })
}

fn open_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|err| {
        PagewerkError::Image(format!("failed to open {}: {}", path.display(), err))
    })
}
