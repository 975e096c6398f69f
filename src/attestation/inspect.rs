//! Read back what a produced certificate shows.
//!
//! Lists every text run drawn on each page with its text-space anchor, plus
//! the document information entries. Enough to check a certificate without
//! rendering it; font programs and the current transformation matrix are
//! not interpreted.

use lopdf::content::Content;
use lopdf::{Document, Object};
use std::collections::BTreeMap;

use super::document::decode_text_string;
use super::text::decode_win_ansi;

/// Coordinates closer than this are considered the same anchor.
const COORD_TOLERANCE: f32 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedText {
    pub page: usize,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct InspectReport {
    pub page_count: usize,
    pub texts: Vec<PlacedText>,
    pub info: BTreeMap<String, String>,
}

impl InspectReport {
    /// Text of the run anchored at (`x`, `y`) on `page`.
    pub fn text_at(&self, page: usize, x: f32, y: f32) -> Option<&str> {
        self.texts
            .iter()
            .find(|t| {
                t.page == page
                    && (t.x - x).abs() < COORD_TOLERANCE
                    && (t.y - y).abs() < COORD_TOLERANCE
            })
            .map(|t| t.text.as_str())
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.texts.iter().any(|t| t.text.contains(needle))
    }

    pub fn texts_on(&self, page: usize) -> impl Iterator<Item = &PlacedText> + '_ {
        self.texts.iter().filter(move |t| t.page == page)
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.info.get(key).map(String::as_str)
    }
}

pub fn inspect_pdf_bytes(bytes: &[u8]) -> Result<InspectReport, lopdf::Error> {
    let doc = Document::load_mem(bytes)?;
    let pages = doc.get_pages();

    let mut texts = Vec::new();
    for (index, page_id) in pages.values().enumerate() {
        let content = Content::decode(&doc.get_page_content(*page_id)?)?;
        collect_runs(index, &content, &mut texts);
    }

    Ok(InspectReport {
        page_count: pages.len(),
        texts,
        info: read_info(&doc),
    })
}

fn read_info(doc: &Document) -> BTreeMap<String, String> {
    let dict = doc
        .trailer
        .get(b"Info")
        .and_then(Object::as_reference)
        .and_then(|id| doc.get_object(id))
        .and_then(Object::as_dict);
    let Ok(dict) = dict else {
        return BTreeMap::new();
    };

    dict.iter()
        .filter_map(|(key, value)| match value {
            Object::String(bytes, _) => Some((
                String::from_utf8_lossy(key).into_owned(),
                decode_text_string(bytes),
            )),
            _ => None,
        })
        .collect()
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn string_bytes(obj: &Object) -> Option<&[u8]> {
    match obj {
        Object::String(bytes, _) => Some(bytes),
        _ => None,
    }
}

fn collect_runs(page: usize, content: &Content, out: &mut Vec<PlacedText>) {
    let (mut x, mut y) = (0.0_f32, 0.0_f32);
    let mut size = 0.0_f32;
    let mut leading = 0.0_f32;

    for op in &content.operations {
        let operands = &op.operands;
        let mut shown: Option<String> = None;

        match op.operator.as_str() {
            "BT" => {
                x = 0.0;
                y = 0.0;
            }
            "Tf" => {
                if let Some(s) = operands.get(1).and_then(number) {
                    size = s;
                }
            }
            "TL" => {
                if let Some(l) = operands.first().and_then(number) {
                    leading = l;
                }
            }
            "Td" | "TD" => {
                if let (Some(tx), Some(ty)) = (
                    operands.first().and_then(number),
                    operands.get(1).and_then(number),
                ) {
                    x += tx;
                    y += ty;
                    if op.operator == "TD" {
                        leading = -ty;
                    }
                }
            }
            "Tm" => {
                if let (Some(e), Some(f)) = (
                    operands.get(4).and_then(number),
                    operands.get(5).and_then(number),
                ) {
                    x = e;
                    y = f;
                }
            }
            "T*" => y -= leading,
            "Tj" => {
                shown = operands.first().and_then(string_bytes).map(decode_win_ansi);
            }
            "'" => {
                y -= leading;
                shown = operands.first().and_then(string_bytes).map(decode_win_ansi);
            }
            "\"" => {
                y -= leading;
                shown = operands.get(2).and_then(string_bytes).map(decode_win_ansi);
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    let bytes: Vec<u8> = items
                        .iter()
                        .filter_map(string_bytes)
                        .flatten()
                        .copied()
                        .collect();
                    shown = Some(decode_win_ansi(&bytes));
                }
            }
            _ => {}
        }

        if let Some(text) = shown {
            out.push(PlacedText {
                page,
                x,
                y,
                size,
                text,
            });
        }
    }
}
