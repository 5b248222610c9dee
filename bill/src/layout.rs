use chrono::{NaiveDate, NaiveDateTime};
use common::{
    measurement,
    models::{CustomerRecord, Garment},
};

use crate::{PAGE_HEIGHT_MM, PAGE_WIDTH_MM};

const MARGIN: f32 = 15.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH_MM - 2.0 * MARGIN;
const RIGHT_COLUMN: f32 = PAGE_WIDTH_MM / 2.0 + 5.0;
const TOP: f32 = 15.0;
const NOTES_TOP: f32 = 20.0;
/// Content never runs into the footer band at the bottom of the page.
const BOTTOM_LIMIT: f32 = PAGE_HEIGHT_MM - 20.0;
const NOTES_LIMIT: f32 = PAGE_HEIGHT_MM - 25.0;

const GRID_COLUMNS: usize = 4;
const ROW_HEIGHT: f32 = 8.0;
const ROW_BASELINE: f32 = 5.5;

const PT_TO_MM: f32 = 25.4 / 72.0;
/// Average Helvetica advance as a fraction of the font size.
const AVERAGE_ADVANCE: f32 = 0.5;

const DATE_FORMAT: &str = "%d/%m/%Y";

/// Shop branding printed in the header and footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillSettings {
    pub shop_name: String,
    pub tagline: String,
}

impl Default for BillSettings {
    fn default() -> Self {
        Self {
            shop_name: "RK DATA ENTRY".to_string(),
            tagline: "PROFESSIONAL TAILORING SOLUTIONS".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
}

/// Something drawn on a page. Coordinates are millimetres from the top-left
/// corner; `y` of a text element is its baseline.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Text {
        x: f32,
        y: f32,
        size: f32,
        style: FontStyle,
        content: String,
    },
    Rule {
        x1: f32,
        x2: f32,
        y: f32,
        thickness: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub elements: Vec<Element>,
}

impl Page {
    /// Every text element in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|element| match element {
            Element::Text { content, .. } => Some(content.as_str()),
            Element::Rule { .. } => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BillDocument {
    pub title: String,
    pub file_name: String,
    pub pages: Vec<Page>,
}

enum Align {
    Left,
    Center,
    Right,
}

fn estimated_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * PT_TO_MM * AVERAGE_ADVANCE
}

struct Builder {
    pages: Vec<Page>,
    y: f32,
}

impl Builder {
    fn new() -> Self {
        Self {
            pages: vec![Page::default()],
            y: TOP,
        }
    }

    fn page(&mut self) -> &mut Page {
        if self.pages.is_empty() {
            self.pages.push(Page::default());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn text(&mut self, content: impl Into<String>, x: f32, size: f32, style: FontStyle, align: Align) {
        let content = content.into();
        let x = match align {
            Align::Left => x,
            Align::Center => x - estimated_width(&content, size) / 2.0,
            Align::Right => x - estimated_width(&content, size),
        };
        let y = self.y;
        self.page().elements.push(Element::Text {
            x,
            y,
            size,
            style,
            content,
        });
    }

    fn rule_at(&mut self, y: f32, thickness: f32) {
        self.page().elements.push(Element::Rule {
            x1: MARGIN,
            x2: PAGE_WIDTH_MM - MARGIN,
            y,
            thickness,
        });
    }

    fn new_page(&mut self, top: f32) {
        self.pages.push(Page::default());
        self.y = top;
    }

    fn ensure_room(&mut self, needed: f32) {
        if self.y + needed > BOTTOM_LIMIT {
            self.new_page(TOP);
        }
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// `"Amit Kumar"` measured on 10 Jan 2024 → `Amit_Kumar_10-01-2024.pdf`.
pub fn file_name(record: &CustomerRecord) -> String {
    let safe_name: String = record
        .name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{}_{}.pdf", safe_name, record.date.format("%d-%m-%Y"))
}

/// Greedy word wrap. Explicit line breaks are kept and words longer than a
/// line are cut.
fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }

            let needed = if line.is_empty() {
                word.len()
            } else {
                line.chars().count() + 1 + word.len()
            };
            if needed > max_chars && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.extend(word);
        }
        lines.push(line);
    }
    lines
}

fn header(builder: &mut Builder, settings: &BillSettings, generated_at: NaiveDateTime) {
    let center = PAGE_WIDTH_MM / 2.0;
    builder.text(&settings.shop_name, center, 22.0, FontStyle::Bold, Align::Center);
    builder.y += 10.0;
    builder.text("MEASUREMENT BILL", center, 14.0, FontStyle::Bold, Align::Center);
    builder.y += 5.0;
    builder.rule_at(builder.y, 0.5);

    builder.y += 10.0;
    builder.text(
        format!("Bill Generated: {}", generated_at.format("%d/%m/%Y %I:%M %p")),
        PAGE_WIDTH_MM - MARGIN,
        10.0,
        FontStyle::Regular,
        Align::Right,
    );
}

fn customer_details(builder: &mut Builder, record: &CustomerRecord) {
    builder.y += 2.0;
    builder.text("CUSTOMER INFORMATION", MARGIN, 12.0, FontStyle::Bold, Align::Left);

    let rows = [
        (
            format!("Name: {}", record.name),
            Some(format!("Phone: {}", record.phone)),
        ),
        (
            format!("Measurement Date: {}", format_date(record.date)),
            Some(format!("Trial Date: {}", format_date(record.trial_date))),
        ),
        (
            format!("Delivery Date: {}", format_date(record.delivery_date)),
            record.dob.map(|dob| format!("DOB: {}", format_date(dob))),
        ),
    ];
    for (left, right) in rows {
        builder.y += 7.0;
        builder.text(left, MARGIN, 11.0, FontStyle::Regular, Align::Left);
        if let Some(right) = right {
            builder.text(right, RIGHT_COLUMN, 11.0, FontStyle::Regular, Align::Left);
        }
    }

    builder.y += 10.0;
    builder.rule_at(builder.y, 0.2);
}

fn measurements(builder: &mut Builder, record: &CustomerRecord) {
    builder.y += 10.0;
    builder.text("MEASUREMENTS (IN POINTS)", MARGIN, 12.0, FontStyle::Bold, Align::Left);
    builder.y += 5.0;

    let garments: Vec<Garment> = Garment::ALL
        .iter()
        .copied()
        .filter(|garment| record.selected_garments.contains(garment))
        .collect();

    if garments.is_empty() {
        builder.text("No measurements recorded.", MARGIN, 11.0, FontStyle::Italic, Align::Left);
        builder.y += 10.0;
        return;
    }

    let column_width = CONTENT_WIDTH / GRID_COLUMNS as f32;
    for garment in garments {
        builder.ensure_room(15.0);
        builder.text(garment.as_str().to_uppercase(), MARGIN, 11.0, FontStyle::Bold, Align::Left);
        builder.y += 2.0;

        let cells: Vec<String> = garment
            .fields()
            .iter()
            .map(|&field| {
                let value = record
                    .measurements
                    .get(garment, field)
                    .map_or_else(|| "-".to_string(), measurement::encode_decimal);
                format!("{}: {}", field.label(), value)
            })
            .collect();

        for row in cells.chunks(GRID_COLUMNS) {
            builder.ensure_room(ROW_HEIGHT);
            let baseline = builder.y + ROW_BASELINE;
            for (column, cell) in row.iter().enumerate() {
                let x = MARGIN + column as f32 * column_width + 2.0;
                builder.page().elements.push(Element::Text {
                    x,
                    y: baseline,
                    size: 10.0,
                    style: FontStyle::Regular,
                    content: cell.clone(),
                });
            }
            builder.y += ROW_HEIGHT;
        }
        builder.y += 6.0;
    }
}

fn notes(builder: &mut Builder, notes: &str) {
    builder.ensure_room(20.0);
    builder.y += 4.0;
    builder.text("ADDITIONAL NOTES", MARGIN, 12.0, FontStyle::Bold, Align::Left);
    builder.y += 6.0;

    let max_chars = (CONTENT_WIDTH / estimated_width("n", 10.0)) as usize;
    for line in wrap(notes, max_chars) {
        if builder.y > NOTES_LIMIT {
            builder.new_page(NOTES_TOP);
        }
        builder.text(line, MARGIN, 10.0, FontStyle::Regular, Align::Left);
        builder.y += 5.0;
    }
}

fn footer(builder: &mut Builder, settings: &BillSettings) {
    builder.rule_at(PAGE_HEIGHT_MM - 20.0, 0.5);
    builder.y = PAGE_HEIGHT_MM - 14.0;
    builder.text(
        format!("{} - {}", settings.shop_name, settings.tagline),
        PAGE_WIDTH_MM / 2.0,
        10.0,
        FontStyle::Bold,
        Align::Center,
    );
}

/// Lays out the bill for one customer. The footer goes on the last page only.
pub fn layout(
    record: &CustomerRecord,
    settings: &BillSettings,
    generated_at: NaiveDateTime,
) -> BillDocument {
    let mut builder = Builder::new();
    header(&mut builder, settings, generated_at);
    customer_details(&mut builder, record);
    measurements(&mut builder, record);
    if let Some(text) = record.notes.as_deref().filter(|text| !text.trim().is_empty()) {
        notes(&mut builder, text);
    }
    footer(&mut builder, settings);

    BillDocument {
        title: format!("Measurement bill - {}", record.name),
        file_name: file_name(record),
        pages: builder.pages,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use common::models::{MeasurementField, Measurements};
    use uuid::Uuid;

    use super::*;

    fn day(text: &str) -> NaiveDate {
        NaiveDate::parse_from_str(text, "%Y-%m-%d").unwrap()
    }

    fn record(name: &str) -> CustomerRecord {
        CustomerRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            phone: "9876543210".to_string(),
            date: day("2024-01-10"),
            trial_date: day("2024-01-15"),
            delivery_date: day("2024-01-20"),
            dob: None,
            notes: None,
            selected_garments: Vec::new(),
            measurements: Measurements::new(),
            is_trialed: None,
            is_delivered: None,
            recorded_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn generated() -> NaiveDateTime {
        day("2024-01-10").and_hms_opt(16, 5, 0).unwrap()
    }

    fn all_texts(document: &BillDocument) -> Vec<String> {
        document
            .pages
            .iter()
            .flat_map(|page| page.texts().map(str::to_string))
            .collect()
    }

    #[test]
    fn header_and_customer_block() {
        let document = layout(&record("Amit Kumar"), &BillSettings::default(), generated());
        let texts = all_texts(&document);

        assert_eq!(document.pages.len(), 1);
        assert_eq!(texts[0], "RK DATA ENTRY");
        assert!(texts.contains(&"Bill Generated: 10/01/2024 04:05 PM".to_string()));
        assert!(texts.contains(&"Name: Amit Kumar".to_string()));
        assert!(texts.contains(&"Trial Date: 15/01/2024".to_string()));
        assert!(!texts.iter().any(|text| text.starts_with("DOB")));
        assert!(texts.contains(&"No measurements recorded.".to_string()));
        assert_eq!(
            texts.last().map(String::as_str),
            Some("RK DATA ENTRY - PROFESSIONAL TAILORING SOLUTIONS")
        );
    }

    #[test]
    fn garments_print_in_canonical_order_with_placeholders() {
        let mut customer = record("Amit");
        customer.dob = Some(day("1990-05-01"));
        customer.selected_garments = vec![Garment::Pant, Garment::Shirt];
        customer
            .measurements
            .insert(Garment::Shirt, MeasurementField::Chest, 40.25)
            .unwrap();
        customer
            .measurements
            .insert(Garment::Pant, MeasurementField::Waist, 32.0)
            .unwrap();

        let texts = all_texts(&layout(&customer, &BillSettings::default(), generated()));
        let shirt = texts.iter().position(|text| text == "SHIRT").unwrap();
        let pant = texts.iter().position(|text| text == "PANT").unwrap();

        assert!(shirt < pant);
        assert!(texts.contains(&"DOB: 01/05/1990".to_string()));
        assert!(texts.contains(&"Chest: 40 1/4".to_string()));
        assert!(texts.contains(&"Length: -".to_string()));
        assert!(texts.contains(&"Waist: 32".to_string()));
        assert!(!texts.contains(&"No measurements recorded.".to_string()));
    }

    #[test]
    fn long_notes_continue_on_a_new_page() {
        let mut customer = record("Amit");
        customer.selected_garments = Garment::ALL.to_vec();
        customer.notes = Some("loose fit around the shoulders please ".repeat(60));

        let document = layout(&customer, &BillSettings::default(), generated());
        assert!(document.pages.len() > 1);

        for page in &document.pages {
            for element in &page.elements {
                if let Element::Text { y, .. } = element {
                    assert!(*y <= PAGE_HEIGHT_MM - 14.0);
                }
            }
        }

        let footer = "RK DATA ENTRY - PROFESSIONAL TAILORING SOLUTIONS";
        let last = document.pages.len() - 1;
        for (index, page) in document.pages.iter().enumerate() {
            assert_eq!(page.texts().any(|text| text == footer), index == last);
        }
    }

    #[test]
    fn file_name_is_filesystem_safe() {
        assert_eq!(file_name(&record("Amit Kumar")), "Amit_Kumar_10-01-2024.pdf");
        assert_eq!(file_name(&record("A.K. (Jr)")), "A_K___Jr__10-01-2024.pdf");
    }

    #[test]
    fn wrap_keeps_words_and_cuts_long_ones() {
        assert_eq!(wrap("one two three", 7), ["one two", "three"]);
        assert_eq!(wrap("abcdefghij", 4), ["abcd", "efgh", "ij"]);
        assert_eq!(wrap("first\nsecond", 20), ["first", "second"]);
    }
}
