// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader: open a source document, split it into single-page handles and
// assemble processed pages back into one document using the `lopdf` crate.

use std::collections::HashMap;
use std::path::Path;

use bleedwerk_core::error::{BleedError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use tracing::{debug, info, instrument};

use super::page::{PdfPage, copy_object_deep};

/// A loaded source document, read-only.
pub struct PdfSource {
    /// The underlying lopdf document.
    document: Document,
    /// Source path, if opened from a file (useful for diagnostics).
    source_path: Option<String>,
}

impl PdfSource {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| {
            BleedError::PdfError(format!("failed to open {}: {}", path_ref.display(), err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded");

        Ok(Self {
            document,
            source_path: Some(path_ref.display().to_string()),
        })
    }

    /// Create a source from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            BleedError::PdfError(format!("failed to load PDF from memory: {}", err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");

        Ok(Self {
            document,
            source_path: None,
        })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Return the source path if the source was created via [`PdfSource::open`].
    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    // -- Extraction -----------------------------------------------------------

    /// Extract a single page (1-indexed) as a standalone handle.
    pub fn page(&self, page_number: u32) -> Result<PdfPage> {
        PdfPage::from_document(&self.document, page_number)
    }

    /// Every page in document order, each extracted independently so one
    /// broken page does not hide the others.
    pub fn pages(&self) -> impl Iterator<Item = (u32, Result<PdfPage>)> + '_ {
        let mut numbers: Vec<u32> = self.document.get_pages().keys().copied().collect();
        numbers.sort();
        numbers
            .into_iter()
            .map(move |number| (number, self.page(number)))
    }
}

// -- Assembly -----------------------------------------------------------------

/// Combine processed pages, in order, into one PDF document.
#[instrument(skip_all)]
pub fn assemble<'a>(pages: impl IntoIterator<Item = &'a PdfPage>) -> Result<Vec<u8>> {
    let mut output = Document::with_version("1.7");
    let pages_id = output.new_object_id();
    output.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => Object::Array(vec![]),
            "Count" => 0,
        }),
    );
    let catalog_id = output.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    output.trailer.set("Root", catalog_id);

    let mut count = 0usize;
    for page in pages {
        clone_page_into(page, &mut output, pages_id)?;
        count += 1;
    }

    output.compress();
    let mut bytes = Vec::new();
    output.save_to(&mut bytes).map_err(|err| {
        BleedError::PdfError(format!("failed to serialise assembled PDF: {}", err))
    })?;

    debug!(pages = count, output_bytes = bytes.len(), "Assembly complete");
    Ok(bytes)
}

/// Deep-copy one page handle into `target`, appending it as the last page.
fn clone_page_into(page: &PdfPage, target: &mut Document, pages_id: ObjectId) -> Result<()> {
    let source = page.document();
    let page_dict = source.get_dictionary(page.page_id()).map_err(|err| {
        BleedError::PdfError(format!("cannot read page object {:?}: {}", page.page_id(), err))
    })?;

    let mut cache = HashMap::new();
    let mut cloned = Dictionary::new();
    for (key, value) in page_dict.iter() {
        if key == b"Parent" {
            continue;
        }
        cloned.set(
            key.clone(),
            copy_object_deep(target, source, value, &mut cache)?,
        );
    }
    cloned.set("Parent", pages_id);
    let cloned_id = target.add_object(cloned);

    if let Ok(Object::Dictionary(pages_dict)) = target.get_object_mut(pages_id) {
        if let Ok(Object::Array(kids)) = pages_dict.get_mut(b"Kids") {
            kids.push(Object::Reference(cloned_id));
        }
        if let Ok(count_obj) = pages_dict.get_mut(b"Count")
            && let Object::Integer(count) = count_obj
        {
            *count += 1;
        }
    }

    Ok(())
}
