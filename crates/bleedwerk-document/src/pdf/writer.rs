// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Test card writer: millimetre-grid pages with a solid colored border, built
// with `printpdf` 0.8, for exercising border detection end to end.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`. printpdf writes whole-point page boxes, so the saved
// card is reopened with lopdf and given its exact size.

use bleedwerk_core::error::Result;
use bleedwerk_core::types::{Color, mm_to_pt};
use printpdf::graphics::{LinePoint, PaintMode, Polygon, PolygonRing, WindingOrder};
use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfSaveOptions, PdfWarnMsg, Point, Pt, Rgb, TextItem,
};
use tracing::{debug, info, instrument};

use super::page::PdfPage;

/// Grid line spacing in millimetres.
const GRID_STEP_MM: f32 = 1.0;

/// Every n-th grid line is drawn heavier.
const MAJOR_EVERY: u32 = 10;

/// A single-page calibration card: optional millimetre grid on a background,
/// framed by a solid border of known width and color.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCard {
    pub width_mm: f32,
    pub height_mm: f32,
    pub border_mm: f32,
    pub border_color: Color,
    pub background: Color,
    pub grid: bool,
    /// Print the card size in the middle of the card.
    pub label: bool,
}

impl TestCard {
    /// A gridded white card with a green border.
    pub fn new(width_mm: f32, height_mm: f32, border_mm: f32) -> Self {
        Self {
            width_mm,
            height_mm,
            border_mm,
            border_color: Color::Rgb([0, 160, 80]),
            background: Color::WHITE,
            grid: true,
            label: true,
        }
    }

    pub fn with_border_color(mut self, color: Color) -> Self {
        self.border_color = color;
        self
    }

    pub fn without_grid(mut self) -> Self {
        self.grid = false;
        self
    }

    /// Render the card to PDF bytes.
    #[instrument(skip(self), fields(width_mm = self.width_mm, height_mm = self.height_mm))]
    pub fn to_pdf_bytes(&self) -> Result<Vec<u8>> {
        let (w, h) = (mm_to_pt(self.width_mm), mm_to_pt(self.height_mm));
        let border = mm_to_pt(self.border_mm).min(w / 2.0).min(h / 2.0);

        info!(border_mm = self.border_mm, grid = self.grid, "Creating test card");

        let mut ops: Vec<Op> = Vec::new();
        ops.push(Op::SetFillColor {
            col: pdf_color(self.background),
        });
        ops.push(fill(0.0, 0.0, w, h));

        if self.grid {
            self.grid_ops(&mut ops, w, h);
        }

        if border > 0.0 {
            ops.push(Op::SetFillColor {
                col: pdf_color(self.border_color),
            });
            ops.push(fill(0.0, 0.0, border, h));
            ops.push(fill(w - border, 0.0, border, h));
            ops.push(fill(0.0, 0.0, w, border));
            ops.push(fill(0.0, h - border, w, border));
        }

        if self.label {
            let text = format!("{} x {} mm", self.width_mm, self.height_mm);
            ops.push(Op::SetFillColor {
                col: pdf_color(Color::Gray(0)),
            });
            ops.push(Op::StartTextSection);
            ops.push(Op::SetTextCursor {
                pos: Point {
                    x: Pt(w / 2.0 - 30.0),
                    y: Pt(h / 2.0),
                },
            });
            ops.push(Op::SetFontSizeBuiltinFont {
                size: Pt(10.0),
                font: BuiltinFont::Helvetica,
            });
            ops.push(Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(text)],
                font: BuiltinFont::Helvetica,
            });
            ops.push(Op::EndTextSection);
        }

        let mut doc = PdfDocument::new("Bleedwerk Test Card");
        doc.with_pages(vec![printpdf::PdfPage::new(
            Mm(self.width_mm),
            Mm(self.height_mm),
            ops,
        )]);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);

        let mut card = PdfPage::from_bytes(&output)?;
        card.set_page_size(w, h)?;
        let output = card.to_bytes()?;
        debug!(output_bytes = output.len(), warnings = warnings.len(), "Test card written");
        Ok(output)
    }

    fn grid_ops(&self, ops: &mut Vec<Op>, w: f32, h: f32) {
        let step = mm_to_pt(GRID_STEP_MM);
        for major in [false, true] {
            let (gray, thickness) = if major { (0.55, 0.4) } else { (0.8, 0.1) };
            ops.push(Op::SetOutlineColor {
                col: printpdf::color::Color::Rgb(Rgb::new(gray, gray, gray, None)),
            });
            ops.push(Op::SetOutlineThickness { pt: Pt(thickness) });

            let columns = (self.width_mm / GRID_STEP_MM) as u32;
            for i in (0..=columns).filter(|i| (i % MAJOR_EVERY == 0) == major) {
                let x = i as f32 * step;
                ops.push(line(x, 0.0, x, h));
            }
            let rows = (self.height_mm / GRID_STEP_MM) as u32;
            for i in (0..=rows).filter(|i| (i % MAJOR_EVERY == 0) == major) {
                let y = i as f32 * step;
                ops.push(line(0.0, y, w, y));
            }
        }
    }
}

fn pdf_color(color: Color) -> printpdf::color::Color {
    let [r, g, b] = color.to_rgb();
    printpdf::color::Color::Rgb(Rgb::new(
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
        None,
    ))
}

fn point(x: f32, y: f32) -> LinePoint {
    LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    }
}

fn fill(x: f32, y: f32, width: f32, height: f32) -> Op {
    Op::DrawPolygon {
        polygon: Polygon {
            rings: vec![PolygonRing {
                points: vec![
                    point(x, y),
                    point(x + width, y),
                    point(x + width, y + height),
                    point(x, y + height),
                ],
            }],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::EvenOdd,
        },
    }
}

fn line(x0: f32, y0: f32, x1: f32, y1: f32) -> Op {
    Op::DrawPolygon {
        polygon: Polygon {
            rings: vec![PolygonRing {
                points: vec![point(x0, y0), point(x1, y1)],
            }],
            mode: PaintMode::Stroke,
            winding_order: WindingOrder::EvenOdd,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bleedwerk_core::types::Rect;

    #[test]
    fn card_has_requested_size() {
        let bytes = TestCard::new(100.0, 70.0, 5.0).to_pdf_bytes().unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        let page = PdfPage::from_bytes(&bytes).unwrap();
        let geometry = page.geometry();
        assert!((geometry.width_mm() - 100.0).abs() < 0.01);
        assert!((geometry.height_mm() - 70.0).abs() < 0.01);
    }

    #[test]
    fn page_boxes_are_not_rounded_to_whole_points() {
        let bytes = TestCard::new(100.0, 70.0, 5.0).to_pdf_bytes().unwrap();
        let page = PdfPage::from_bytes(&bytes).unwrap();
        let (w, h) = (mm_to_pt(100.0), mm_to_pt(70.0));
        for key in [&b"MediaBox"[..], b"CropBox", b"TrimBox"] {
            let Rect { x, y, width, height } = page.page_box(key).unwrap();
            assert_eq!((x, y), (0.0, 0.0));
            assert!((width - w).abs() < 0.01, "width {width}");
            assert!((height - h).abs() < 0.01, "height {height}");
        }
    }

    #[test]
    fn plain_card_still_renders() {
        let card = TestCard::new(50.0, 50.0, 0.0)
            .without_grid()
            .with_border_color(Color::Rgb([200, 0, 0]));
        assert!(!card.grid);
        let page = PdfPage::from_bytes(&card.to_pdf_bytes().unwrap()).unwrap();
        assert!((page.geometry().width_mm() - 50.0).abs() < 0.01);
    }
}
