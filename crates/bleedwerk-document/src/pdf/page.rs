// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Single-page PDF handle: extraction from a source document, geometry
// queries, and application of overlay instructions using `lopdf`.

use std::collections::HashMap;
use std::path::Path;

use bleedwerk_core::error::{BleedError, Result};
use bleedwerk_core::types::{Color, PageGeometry, Rect, Side};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use tracing::{debug, instrument, warn};

use crate::synth::{DrawOp, OverlayInstructions};

/// US Letter, used when a page declares no MediaBox anywhere in its tree.
pub const DEFAULT_MEDIA_BOX: Rect = Rect {
    x: 0.0,
    y: 0.0,
    width: 612.0,
    height: 792.0,
};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Page-level keys that only make sense inside the source document.
const DROPPED_KEYS: [&[u8]; 3] = [b"Parent", b"Annots", b"B"];

/// Guard against malformed, cyclic page trees.
const MAX_TREE_DEPTH: usize = 64;

/// Resource name of the page's own content wrapped as a Form XObject.
const CONTENT_XOBJECT: &str = "BwContent";

/// Resource name prefix for stretched edge-strip images.
const STRIP_XOBJECT_PREFIX: &str = "BwStrip";

/// Graphics state name for the translucent cutting band.
const CUT_GSTATE: &str = "BwCut";

/// Opacity of the cutting band.
const CUT_BAND_ALPHA: f32 = 0.3;

/// Dash and gap length of the cut line, in points.
const CUT_DASH_PT: f32 = 3.0;

/// One PDF page, held as a self-contained single-page document.
///
/// Owns everything the page references. Composition consumes a snapshot of
/// its geometry and writes the result back with [`PdfPage::apply`].
#[derive(Debug, Clone)]
pub struct PdfPage {
    document: Document,
    page_id: ObjectId,
}

impl PdfPage {
    // -- Construction ---------------------------------------------------------

    /// Copy page `page_number` (1-indexed) out of `source`.
    ///
    /// Inherited attributes are resolved onto the copy, annotations are
    /// dropped, and every referenced object is deep-copied.
    #[instrument(skip(source))]
    pub fn from_document(source: &Document, page_number: u32) -> Result<Self> {
        let pages = source.get_pages();
        let source_id = *pages.get(&page_number).ok_or(BleedError::PageNotFound {
            page: page_number,
            count: pages.len(),
        })?;
        let source_page = source.get_dictionary(source_id).map_err(|err| {
            BleedError::PdfError(format!("cannot read page {}: {}", page_number, err))
        })?;

        let mut document = Document::with_version("1.7");
        let pages_id = document.new_object_id();
        let mut cache = HashMap::new();

        let mut page = Dictionary::new();
        for (key, value) in source_page.iter() {
            if DROPPED_KEYS.contains(&key.as_slice()) {
                continue;
            }
            page.set(
                key.clone(),
                copy_object_deep(&mut document, source, value, &mut cache)?,
            );
        }
        for key in INHERITABLE {
            if page.has(key) {
                continue;
            }
            if let Some(value) = inherited(source, source_page, key) {
                let copied = copy_object_deep(&mut document, source, value, &mut cache)?;
                page.set(key, copied);
            }
        }
        page.set("Parent", pages_id);

        let page_id = document.add_object(page);
        finish_single_page_tree(&mut document, pages_id, page_id);

        debug!(page_number, objects = document.objects.len(), "Page extracted");
        Ok(Self { document, page_id })
    }

    /// First page of an in-memory PDF.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let source = Document::load_mem(data).map_err(|err| {
            BleedError::PdfError(format!("failed to load PDF from memory: {}", err))
        })?;
        Self::from_document(&source, 1)
    }

    /// First page of a PDF file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = Document::load(path).map_err(|err| {
            BleedError::PdfError(format!("failed to open {}: {}", path.display(), err))
        })?;
        Self::from_document(&source, 1)
    }

    /// An empty page of the given size.
    pub fn blank(width_pt: f32, height_pt: f32) -> Self {
        let mut document = Document::with_version("1.7");
        let pages_id = document.new_object_id();
        let content_id = document.add_object(Stream::new(Dictionary::new(), Vec::new()));
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => rect_array(Rect::new(0.0, 0.0, width_pt, height_pt)),
            "Contents" => content_id,
            "Resources" => Dictionary::new(),
        });
        finish_single_page_tree(&mut document, pages_id, page_id);
        Self { document, page_id }
    }

    // -- Inspection -----------------------------------------------------------

    /// Visible size in points, honoring `/Rotate`.
    pub fn geometry(&self) -> PageGeometry {
        let visible = self.visible_box();
        let geometry = PageGeometry::new(visible.width, visible.height);
        match self.rotation() {
            90 | 270 => geometry.swapped(),
            _ => geometry,
        }
    }

    /// CropBox, else MediaBox, else US Letter; in unrotated page space.
    pub fn visible_box(&self) -> Rect {
        self.page_box(b"CropBox")
            .or_else(|| self.page_box(b"MediaBox"))
            .unwrap_or(DEFAULT_MEDIA_BOX)
    }

    /// Clockwise display rotation, normalized to 0, 90, 180 or 270.
    pub fn rotation(&self) -> i64 {
        let rotate = self
            .page_dictionary()
            .ok()
            .and_then(|page| page.get(b"Rotate").ok())
            .and_then(|value| value.as_i64().ok())
            .unwrap_or(0);
        rotate.rem_euclid(360) / 90 * 90
    }

    /// A page box such as `MediaBox` or `TrimBox`, normalized so width and
    /// height are positive. `None` when absent or malformed.
    pub fn page_box(&self, key: &[u8]) -> Option<Rect> {
        let page = self.page_dictionary().ok()?;
        let value = match page.get(key).ok()? {
            Object::Reference(id) => self.document.get_object(*id).ok()?,
            other => other,
        };
        let values = value
            .as_array()
            .ok()?
            .iter()
            .map(number)
            .collect::<Option<Vec<f32>>>()?;
        let [x0, y0, x1, y1] = values.as_slice() else {
            return None;
        };
        let rect = Rect::new(x0.min(*x1), y0.min(*y1), (x1 - x0).abs(), (y1 - y0).abs());
        rect.is_drawable().then_some(rect)
    }

    pub(crate) fn document(&self) -> &Document {
        &self.document
    }

    pub(crate) fn page_id(&self) -> ObjectId {
        self.page_id
    }

    fn page_dictionary(&self) -> Result<&Dictionary> {
        self.document
            .get_dictionary(self.page_id)
            .map_err(|err| BleedError::PdfError(format!("page dictionary missing: {}", err)))
    }

    fn page_dictionary_mut(&mut self) -> Result<&mut Dictionary> {
        self.document
            .get_dictionary_mut(self.page_id)
            .map_err(|err| BleedError::PdfError(format!("page dictionary missing: {}", err)))
    }

    // -- Composition ----------------------------------------------------------

    /// Rebuild the page as `overlay` describes.
    ///
    /// The existing content becomes a Form XObject placed with one transform
    /// (scale, rotation, translation), followed by the padding artwork. All
    /// page boxes are reset to the new page rectangle and `/Rotate` is
    /// removed because the rotation is now baked into the transform.
    #[instrument(skip_all, fields(
        width = overlay.page_width_pt,
        height = overlay.page_height_pt,
        operations = overlay.operations.len()
    ))]
    pub fn apply(&mut self, overlay: &OverlayInstructions) -> Result<()> {
        let bbox = self.visible_box();
        let rotation = (self.rotation() + overlay.placement.rotation_degrees).rem_euclid(360);

        let page = self.page_dictionary()?;
        let content = page_content(&self.document, page);
        let resources = page.get(b"Resources").ok().cloned();

        let mut form = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "FormType" => 1,
            "BBox" => rect_array(bbox),
        };
        if let Some(resources) = resources {
            form.set("Resources", resources);
        }
        let form_id = self.document.add_object(Stream::new(form, content));

        let placement = overlay.placement;
        let matrix = placement_matrix(
            bbox,
            rotation,
            placement.scale,
            placement.rect.x,
            placement.rect.y,
        );

        let mut xobjects = Dictionary::new();
        xobjects.set(CONTENT_XOBJECT, form_id);
        let mut operations = Vec::with_capacity(4 + 5 * overlay.operations.len());
        draw_xobject(&mut operations, CONTENT_XOBJECT, matrix);

        for (index, op) in overlay.operations.iter().enumerate() {
            match op {
                DrawOp::FillRect { rect, color } | DrawOp::CornerPatch { rect, color, .. } => {
                    fill_rect(&mut operations, *rect, *color);
                }
                DrawOp::StretchedStrip { side, rect, pixels } => {
                    if !rect.is_drawable() || pixels.is_empty() {
                        continue;
                    }
                    let name = format!("{}{}", STRIP_XOBJECT_PREFIX, index);
                    let image_id = self.document.add_object(strip_image(*side, pixels));
                    xobjects.set(name.clone(), image_id);
                    let matrix = [rect.width, 0.0, 0.0, rect.height, rect.x, rect.y];
                    draw_xobject(&mut operations, &name, matrix);
                }
            }
        }

        let encoded = Content { operations }
            .encode()
            .map_err(|err| BleedError::PdfError(format!("cannot encode page content: {}", err)))?;
        let content_id = self.document.add_object(Stream::new(Dictionary::new(), encoded));

        let page = self.page_dictionary_mut()?;
        page.set("Contents", content_id);
        page.set("Resources", dictionary! { "XObject" => xobjects });
        page.remove(b"Rotate");
        self.set_page_size(overlay.page_width_pt, overlay.page_height_pt)?;

        let pruned = self.document.prune_objects();
        debug!(pruned = pruned.len(), "Overlay applied");
        Ok(())
    }

    /// Make every page box exactly `width_pt` x `height_pt` at the origin.
    pub fn set_page_size(&mut self, width_pt: f32, height_pt: f32) -> Result<()> {
        let page_rect = rect_array(Rect::new(0.0, 0.0, width_pt, height_pt));
        let page = self.page_dictionary_mut()?;
        for key in ["MediaBox", "CropBox", "BleedBox", "TrimBox"] {
            page.set(key, page_rect.clone());
        }
        page.remove(b"ArtBox");
        Ok(())
    }

    /// Mark the final trim rectangle, e.g. the nominal size inside the bleed.
    pub fn set_trim_box(&mut self, trim: Rect) -> Result<()> {
        let page = self.page_dictionary_mut()?;
        page.set("TrimBox", rect_array(trim));
        Ok(())
    }

    /// Draw the cutting guide on top of the page: a translucent gray band
    /// `tolerance_pt` wide centered on every TrimBox edge, and a dashed line
    /// on the edge itself. Without a TrimBox the page edge is used.
    #[instrument(skip(self))]
    pub fn mark_cutting_area(&mut self, tolerance_pt: f32) -> Result<()> {
        let media = self.page_box(b"MediaBox").unwrap_or(DEFAULT_MEDIA_BOX);
        let trim = self.page_box(b"TrimBox").unwrap_or(media);
        let half = tolerance_pt / 2.0;

        let mut operations = vec![
            Operation::new("Q", vec![]),
            Operation::new("q", vec![]),
            Operation::new("gs", vec![Object::Name(CUT_GSTATE.as_bytes().to_vec())]),
        ];
        if half > 0.0 {
            let gray = Color::Gray(128);
            for band in [
                Rect::new(media.x, trim.y - half, media.width, tolerance_pt),
                Rect::new(media.x, trim.top() - half, media.width, tolerance_pt),
                Rect::new(trim.x - half, media.y, tolerance_pt, media.height),
                Rect::new(trim.right() - half, media.y, tolerance_pt, media.height),
            ] {
                fill_rect(&mut operations, band, gray);
            }
        }
        operations.push(Operation::new("Q", vec![]));
        operations.push(Operation::new("q", vec![]));
        operations.push(Operation::new("G", vec![Object::Real(0.0)]));
        operations.push(Operation::new("w", vec![Object::Real(0.5)]));
        operations.push(Operation::new(
            "d",
            vec![
                Object::Array(vec![Object::Real(CUT_DASH_PT), Object::Real(CUT_DASH_PT)]),
                Object::Integer(0),
            ],
        ));
        for y in [trim.y, trim.top()] {
            stroke_line(&mut operations, (media.x, y), (media.right(), y));
        }
        for x in [trim.x, trim.right()] {
            stroke_line(&mut operations, (x, media.y), (x, media.top()));
        }
        operations.push(Operation::new("Q", vec![]));

        let encoded = Content { operations }
            .encode()
            .map_err(|err| BleedError::PdfError(format!("cannot encode cut marks: {}", err)))?;
        let opening = self
            .document
            .add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let marks = self.document.add_object(Stream::new(Dictionary::new(), encoded));

        let page = self.page_dictionary()?;
        let mut contents = vec![Object::Reference(opening)];
        match page.get(b"Contents") {
            Ok(Object::Array(parts)) => contents.extend(parts.iter().cloned()),
            Ok(other) => contents.push(other.clone()),
            Err(_) => {}
        }
        contents.push(Object::Reference(marks));

        let mut resources = match page.get(b"Resources") {
            Ok(Object::Reference(id)) => self
                .document
                .get_dictionary(*id)
                .cloned()
                .unwrap_or_else(|_| Dictionary::new()),
            Ok(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        };
        let mut states = match resources.get(b"ExtGState") {
            Ok(Object::Reference(id)) => self
                .document
                .get_dictionary(*id)
                .cloned()
                .unwrap_or_else(|_| Dictionary::new()),
            Ok(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        };
        states.set(
            CUT_GSTATE,
            dictionary! {
                "Type" => "ExtGState",
                "ca" => Object::Real(CUT_BAND_ALPHA),
                "CA" => Object::Real(CUT_BAND_ALPHA),
            },
        );
        resources.set("ExtGState", states);

        let page = self.page_dictionary_mut()?;
        page.set("Contents", contents);
        page.set("Resources", resources);
        debug!(?trim, tolerance_pt, "Cutting area marked");
        Ok(())
    }

    // -- Serialisation --------------------------------------------------------

    /// Serialise as a standalone single-page PDF.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut document = self.document.clone();
        document.compress();
        let mut output = Vec::new();
        document
            .save_to(&mut output)
            .map_err(|err| BleedError::PdfError(format!("failed to serialise page: {}", err)))?;
        Ok(output)
    }

    /// Write as a standalone single-page PDF file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_bytes()?)?;
        Ok(())
    }
}

// -- Placement ----------------------------------------------------------------

/// Content-stream matrix that maps `bbox` (turned clockwise by `rotation`
/// degrees and scaled by `scale`) onto a rectangle whose lower-left corner is
/// `(tx, ty)`.
pub fn placement_matrix(bbox: Rect, rotation: i64, scale: f32, tx: f32, ty: f32) -> [f32; 6] {
    let s = scale;
    let (x0, y0, w, h) = (bbox.x, bbox.y, bbox.width, bbox.height);
    match rotation.rem_euclid(360) {
        90 => [0.0, -s, s, 0.0, tx - s * y0, ty + s * (w + x0)],
        180 => [-s, 0.0, 0.0, -s, tx + s * (w + x0), ty + s * (h + y0)],
        270 => [0.0, s, -s, 0.0, tx + s * (h + y0), ty - s * x0],
        _ => [s, 0.0, 0.0, s, tx - s * x0, ty - s * y0],
    }
}

// -- Helpers ------------------------------------------------------------------

fn finish_single_page_tree(document: &mut Document, pages_id: ObjectId, page_id: ObjectId) {
    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );
    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);
}

/// Look `key` up on the page, then on each ancestor.
fn inherited<'a>(doc: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut node = page;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// Deep-copy `obj` from `source` into `output`, following references.
///
/// Target ids are reserved before recursing so reference cycles terminate.
/// Nested `/Parent` links are not followed.
pub(crate) fn copy_object_deep(
    output: &mut Document,
    source: &Document,
    obj: &Object,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Object> {
    match obj {
        Object::Reference(id) => {
            if let Some(&new_id) = cache.get(id) {
                return Ok(Object::Reference(new_id));
            }
            let referenced = match source.get_object(*id) {
                Ok(referenced) => referenced,
                Err(err) => {
                    warn!(?id, %err, "Cannot resolve reference, using Null");
                    return Ok(Object::Null);
                }
            };
            let new_id = output.new_object_id();
            cache.insert(*id, new_id);
            let copied = copy_object_deep(output, source, referenced, cache)?;
            output.objects.insert(new_id, copied);
            Ok(Object::Reference(new_id))
        }
        Object::Dictionary(dict) => Ok(Object::Dictionary(copy_dictionary(
            output, source, dict, cache,
        )?)),
        Object::Array(items) => {
            let copied = items
                .iter()
                .map(|item| copy_object_deep(output, source, item, cache))
                .collect::<Result<Vec<_>>>()?;
            Ok(Object::Array(copied))
        }
        Object::Stream(stream) => {
            let dict = copy_dictionary(output, source, &stream.dict, cache)?;
            let mut copied = Stream::new(dict, stream.content.clone());
            copied.allows_compression = stream.allows_compression;
            Ok(Object::Stream(copied))
        }
        other => Ok(other.clone()),
    }
}

fn copy_dictionary(
    output: &mut Document,
    source: &Document,
    dict: &Dictionary,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Dictionary> {
    let mut copied = Dictionary::new();
    for (key, value) in dict.iter() {
        if key == b"Parent" {
            continue;
        }
        copied.set(key.clone(), copy_object_deep(output, source, value, cache)?);
    }
    Ok(copied)
}

/// Decompressed page content, multiple streams joined by newlines.
fn page_content(doc: &Document, page: &Dictionary) -> Vec<u8> {
    let stream_bytes = |id: ObjectId| -> Option<Vec<u8>> {
        let stream = doc.get_object(id).ok()?.as_stream().ok()?;
        Some(
            stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone()),
        )
    };

    match page.get(b"Contents") {
        Ok(Object::Reference(id)) => stream_bytes(*id).unwrap_or_default(),
        Ok(Object::Array(parts)) => {
            let mut joined = Vec::new();
            for part in parts {
                if let Object::Reference(id) = part
                    && let Some(bytes) = stream_bytes(*id)
                {
                    joined.extend_from_slice(&bytes);
                    joined.push(b'\n');
                }
            }
            joined
        }
        _ => Vec::new(),
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn rect_array(rect: Rect) -> Object {
    Object::Array(rect.to_box().iter().map(|&v| Object::Real(v)).collect())
}

fn stroke_line(operations: &mut Vec<Operation>, from: (f32, f32), to: (f32, f32)) {
    operations.push(Operation::new("m", vec![Object::Real(from.0), Object::Real(from.1)]));
    operations.push(Operation::new("l", vec![Object::Real(to.0), Object::Real(to.1)]));
    operations.push(Operation::new("S", vec![]));
}

fn draw_xobject(operations: &mut Vec<Operation>, name: &str, matrix: [f32; 6]) {
    operations.push(Operation::new("q", vec![]));
    operations.push(Operation::new(
        "cm",
        matrix.iter().map(|&v| Object::Real(v)).collect(),
    ));
    operations.push(Operation::new(
        "Do",
        vec![Object::Name(name.as_bytes().to_vec())],
    ));
    operations.push(Operation::new("Q", vec![]));
}

fn fill_rect(operations: &mut Vec<Operation>, rect: Rect, color: Color) {
    if !rect.is_drawable() {
        return;
    }
    let operator = match color {
        Color::Gray(_) => "g",
        Color::Rgb(_) => "rg",
    };
    let components = color.components().into_iter().map(Object::Real).collect();
    let color_op = Operation::new(operator, components);
    operations.push(Operation::new("q", vec![]));
    operations.push(color_op);
    operations.push(Operation::new(
        "re",
        vec![
            Object::Real(rect.x),
            Object::Real(rect.y),
            Object::Real(rect.width),
            Object::Real(rect.height),
        ],
    ));
    operations.push(Operation::new("f", vec![]));
    operations.push(Operation::new("Q", vec![]));
}

/// A 1-pixel-thick image for a stretched edge strip. Top and bottom strips
/// are one row; left and right strips are one column, top pixel first.
fn strip_image(side: Side, pixels: &[Color]) -> Stream {
    let (width, height) = if side.is_horizontal() {
        (pixels.len(), 1)
    } else {
        (1, pixels.len())
    };
    let gray = pixels.iter().all(|c| matches!(c, Color::Gray(_)));
    let data: Vec<u8> = if gray {
        pixels.iter().map(|c| c.to_rgb()[0]).collect()
    } else {
        pixels.iter().flat_map(|c| c.to_rgb()).collect()
    };
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => if gray { "DeviceGray" } else { "DeviceRGB" },
        "BitsPerComponent" => 8,
        "Interpolate" => false,
    };
    Stream::new(dict, data)
}
