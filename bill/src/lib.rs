//! Printable measurement bills.
//!
//! [`layout`] places every line of a bill on A4 pages in millimetres, and
//! [`render_pdf`] turns that layout into a PDF using the built-in Helvetica
//! faces.

mod layout;
mod render;

pub use layout::{layout, BillDocument, BillSettings, Element, FontStyle, Page};
pub use render::{render_pdf, BillError};

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
