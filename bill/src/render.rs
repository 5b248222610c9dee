use printpdf::{BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point};
use thiserror::Error;
use tracing::debug;

use crate::{
    layout::{BillDocument, Element, FontStyle},
    PAGE_HEIGHT_MM, PAGE_WIDTH_MM,
};

const LAYER: &str = "Layer 1";
const MM_TO_PT: f32 = 72.0 / 25.4;

#[derive(Debug, Error)]
pub enum BillError {
    #[error("failed to render bill: {0}")]
    Pdf(String),
}

fn pdf_error(err: printpdf::Error) -> BillError {
    BillError::Pdf(format!("{:?}", err))
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

impl Fonts {
    fn get(&self, style: FontStyle) -> &IndirectFontRef {
        match style {
            FontStyle::Regular => &self.regular,
            FontStyle::Bold => &self.bold,
            FontStyle::Italic => &self.italic,
        }
    }
}

/// The built-in fonts only cover WinAnsi, so anything outside printable
/// ASCII is shown as `?`.
fn printable(text: &str) -> String {
    text.chars()
        .map(|c| if c == ' ' || c.is_ascii_graphic() { c } else { '?' })
        .collect()
}

fn draw(layer: &PdfLayerReference, element: &Element, fonts: &Fonts) {
    match element {
        Element::Text {
            x,
            y,
            size,
            style,
            content,
        } => {
            layer.use_text(
                printable(content),
                *size,
                Mm(*x),
                Mm(PAGE_HEIGHT_MM - *y),
                fonts.get(*style),
            );
        }
        Element::Rule { x1, x2, y, thickness } => {
            let y = Mm(PAGE_HEIGHT_MM - *y);
            layer.set_outline_thickness(*thickness * MM_TO_PT);
            layer.add_line(Line {
                points: vec![(Point::new(Mm(*x1), y), false), (Point::new(Mm(*x2), y), false)],
                is_closed: false,
            });
        }
    }
}

/// Renders a laid-out bill to PDF bytes.
pub fn render_pdf(bill: &BillDocument) -> Result<Vec<u8>, BillError> {
    let (doc, first_page, first_layer) =
        PdfDocument::new(&bill.title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), LAYER);
    let fonts = Fonts {
        regular: doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?,
        bold: doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?,
        italic: doc.add_builtin_font(BuiltinFont::HelveticaOblique).map_err(pdf_error)?,
    };

    for (index, page) in bill.pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_index, layer_index) =
                doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), LAYER);
            doc.get_page(page_index).get_layer(layer_index)
        };
        for element in &page.elements {
            draw(&layer, element, &fonts);
        }
    }

    let bytes = doc.save_to_bytes().map_err(pdf_error)?;
    debug!(
        "Rendered bill {} ({} pages, {} bytes)",
        bill.file_name,
        bill.pages.len(),
        bytes.len()
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Page;

    #[test]
    fn replaces_characters_outside_the_builtin_fonts() {
        assert_eq!(printable("Amit: 40 1/4"), "Amit: 40 1/4");
        assert_eq!(printable("Ravi\u{2014}कुमार"), "Ravi??????");
    }

    #[test]
    fn renders_every_page() {
        let page = |text: &str| Page {
            elements: vec![
                Element::Text {
                    x: 15.0,
                    y: 15.0,
                    size: 12.0,
                    style: FontStyle::Bold,
                    content: text.to_string(),
                },
                Element::Rule {
                    x1: 15.0,
                    x2: 195.0,
                    y: 20.0,
                    thickness: 0.5,
                },
            ],
        };
        let bill = BillDocument {
            title: "Measurement bill - Amit".to_string(),
            file_name: "Amit_10-01-2024.pdf".to_string(),
            pages: vec![page("first"), page("second")],
        };

        let bytes = render_pdf(&bill).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
