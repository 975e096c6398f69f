//! Owned handle over a decoded PDF document.
//!
//! A `DocumentModel` is created from template bytes for exactly one render,
//! mutated in place and consumed by `save`. Drawn text is buffered per page
//! and appended as a separate content stream when the document is encoded.
//! The template's own content is wrapped in `q`/`Q` so its graphics state
//! cannot leak into the overlay.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::BTreeMap;

use super::layout::WrapBox;
use super::text::{decode_win_ansi, encode_win_ansi, wrap_lines};
use super::{AttestationError, LayoutError};

/// Line spacing for multi-line text drawn without a wrap box, as a factor of the font size.
const DEFAULT_LINE_SPACING: f32 = 1.2;
/// Guard against cyclic page trees when looking up inherited resources.
const MAX_TREE_DEPTH: usize = 32;

/// Standard 14 fonts available without embedding a font program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    HelveticaBold,
}

impl StandardFont {
    pub fn base_name(&self) -> &'static str {
        match self {
            StandardFont::HelveticaBold => "Helvetica-Bold",
        }
    }
}

/// A font registered in the document.
#[derive(Debug, Clone)]
pub struct FontHandle {
    id: ObjectId,
    resource_name: String,
    font: StandardFont,
}

impl FontHandle {
    pub fn font(&self) -> StandardFont {
        self.font
    }

    /// Name under which the font appears in page resources.
    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHandle {
    index: usize,
    id: ObjectId,
}

impl PageHandle {
    pub fn index(&self) -> usize {
        self.index
    }
}

/// RGB fill color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };
}

pub struct TextStyle<'a> {
    pub font: &'a FontHandle,
    pub size: f32,
    pub color: Color,
    /// Wrapped-box constraints; `None` draws line by line at the anchor.
    pub wrap: Option<WrapBox>,
}

/// Values written to the document information dictionary.
#[derive(Debug, Clone, Copy)]
pub struct DocumentInfo<'a> {
    pub title: &'a str,
    pub subject: &'a str,
    pub keywords: &'a str,
    pub producer: &'a str,
    pub creator: &'a str,
    pub author: &'a str,
}

#[derive(Clone, Copy)]
enum Resources {
    /// Resources dictionary stored as its own object.
    Shared(ObjectId),
    /// Resources dictionary stored inline in the page.
    Inline,
}

pub struct DocumentModel {
    doc: Document,
    pages: Vec<ObjectId>,
    pending: BTreeMap<ObjectId, Vec<Operation>>,
}

impl DocumentModel {
    /// Decode a document. Malformed bytes fail with `AttestationError::Decode`.
    pub fn load(bytes: &[u8]) -> Result<Self, AttestationError> {
        let doc = Document::load_mem(bytes).map_err(AttestationError::Decode)?;
        let pages = doc.get_pages().into_values().collect();
        Ok(Self {
            doc,
            pages,
            pending: BTreeMap::new(),
        })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn get_page(&self, index: usize) -> Result<PageHandle, LayoutError> {
        self.pages
            .get(index)
            .map(|&id| PageHandle { index, id })
            .ok_or(LayoutError::PageOutOfRange {
                page: index,
                page_count: self.pages.len(),
            })
    }

    /// Register a standard font with WinAnsi encoding.
    pub fn embed_font(&mut self, font: StandardFont) -> FontHandle {
        let id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_name(),
            "Encoding" => "WinAnsiEncoding",
        });
        FontHandle {
            id,
            resource_name: format!("AttF{}", id.0),
            font,
        }
    }

    /// Draw `text` with its first baseline at (`x`, `y`).
    ///
    /// With a wrap box the text is broken between words so no line exceeds
    /// `max_width`, each following line `line_height` lower. Text that does
    /// not fit below the box is still drawn.
    pub fn draw_text(
        &mut self,
        page: PageHandle,
        text: &str,
        x: f32,
        y: f32,
        style: &TextStyle<'_>,
    ) -> Result<(), AttestationError> {
        let (lines, line_height) = match style.wrap {
            Some(wrap) => (
                wrap_lines(text, style.size, wrap.max_width),
                wrap.line_height,
            ),
            None => {
                let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
                if lines.is_empty() {
                    lines.push(String::new());
                }
                (lines, style.size * DEFAULT_LINE_SPACING)
            }
        };

        let encoded = lines
            .iter()
            .map(|line| encode_win_ansi(line))
            .collect::<Result<Vec<_>, char>>()
            .map_err(|ch| AttestationError::Unencodable { ch })?;

        self.register_font(page.id, style.font)?;

        let font_name = Object::Name(style.font.resource_name.as_bytes().to_vec());
        let ops = self.pending.entry(page.id).or_default();
        ops.push(Operation::new(
            "rg",
            vec![
                Object::Real(style.color.r),
                Object::Real(style.color.g),
                Object::Real(style.color.b),
            ],
        ));
        for (i, bytes) in encoded.into_iter().enumerate() {
            let line_y = y - i as f32 * line_height;
            ops.push(Operation::new("BT", vec![]));
            ops.push(Operation::new(
                "Tf",
                vec![font_name.clone(), Object::Real(style.size)],
            ));
            ops.push(Operation::new(
                "Td",
                vec![Object::Real(x), Object::Real(line_y)],
            ));
            let format = if bytes.is_empty() {
                StringFormat::Literal
            } else {
                StringFormat::Hexadecimal
            };
            ops.push(Operation::new("Tj", vec![Object::String(bytes, format)]));
            ops.push(Operation::new("ET", vec![]));
        }
        Ok(())
    }

    /// Overwrite the document information dictionary fields.
    pub fn set_metadata(&mut self, info: &DocumentInfo<'_>) -> Result<(), AttestationError> {
        let existing = self
            .doc
            .trailer
            .get(b"Info")
            .and_then(Object::as_reference)
            .ok();
        let info_id = match existing {
            Some(id) => id,
            None => {
                let id = self.doc.add_object(Dictionary::new());
                self.doc.trailer.set("Info", Object::Reference(id));
                id
            }
        };

        let dict = self.dict_mut(info_id)?;
        for (key, value) in [
            ("Title", info.title),
            ("Subject", info.subject),
            ("Keywords", info.keywords),
            ("Producer", info.producer),
            ("Creator", info.creator),
            ("Author", info.author),
        ] {
            dict.set(key, text_string(value));
        }
        Ok(())
    }

    /// Encode the document, consuming the model.
    pub fn save(mut self) -> Result<Vec<u8>, AttestationError> {
        self.flush_overlays()?;
        let mut out = Vec::new();
        self.doc
            .save_to(&mut out)
            .map_err(|e| AttestationError::Encode(e.to_string()))?;
        Ok(out)
    }

    fn flush_overlays(&mut self) -> Result<(), AttestationError> {
        let pending = std::mem::take(&mut self.pending);
        for (page_id, operations) in pending {
            let mut contents = match self.dict(page_id)?.get(b"Contents") {
                Ok(Object::Reference(id)) => match self.doc.get_object(*id) {
                    Ok(Object::Array(items)) => items.clone(),
                    _ => vec![Object::Reference(*id)],
                },
                Ok(Object::Array(items)) => items.clone(),
                _ => Vec::new(),
            };

            let mut ops = Vec::with_capacity(operations.len() + 3);
            if !contents.is_empty() {
                let save_id = self
                    .doc
                    .add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
                contents.insert(0, Object::Reference(save_id));
                ops.push(Operation::new("Q", vec![]));
            }
            ops.push(Operation::new("q", vec![]));
            ops.extend(operations);
            ops.push(Operation::new("Q", vec![]));

            let mut overlay = b"\n".to_vec();
            overlay.extend(
                Content { operations: ops }
                    .encode()
                    .map_err(|e| AttestationError::Encode(e.to_string()))?,
            );
            let overlay_id = self
                .doc
                .add_object(Stream::new(Dictionary::new(), overlay));
            contents.push(Object::Reference(overlay_id));

            self.dict_mut(page_id)?
                .set("Contents", Object::Array(contents));
        }
        Ok(())
    }

    fn register_font(
        &mut self,
        page_id: ObjectId,
        font: &FontHandle,
    ) -> Result<(), AttestationError> {
        let resources = self.page_resources(page_id)?;
        let name = font.resource_name.as_bytes().to_vec();
        let entry = Object::Reference(font.id);

        let shared_fonts = {
            let dict = match resources {
                Resources::Shared(id) => self.dict(id)?,
                Resources::Inline => self
                    .dict(page_id)?
                    .get(b"Resources")
                    .and_then(Object::as_dict)
                    .map_err(AttestationError::Decode)?,
            };
            dict.get(b"Font").and_then(Object::as_reference).ok()
        };
        if let Some(fonts_id) = shared_fonts {
            self.dict_mut(fonts_id)?.set(name, entry);
            return Ok(());
        }

        let dict = match resources {
            Resources::Shared(id) => self.dict_mut(id)?,
            Resources::Inline => self
                .dict_mut(page_id)?
                .get_mut(b"Resources")
                .and_then(Object::as_dict_mut)
                .map_err(AttestationError::Decode)?,
        };
        match dict.get_mut(b"Font") {
            Ok(Object::Dictionary(fonts)) => {
                fonts.set(name, entry);
            }
            _ => {
                let mut fonts = Dictionary::new();
                fonts.set(name, entry);
                dict.set("Font", fonts);
            }
        }
        Ok(())
    }

    /// Locate the page's resources, copying inherited ones onto the page if needed.
    fn page_resources(&mut self, page_id: ObjectId) -> Result<Resources, AttestationError> {
        match self.dict(page_id)?.get(b"Resources") {
            Ok(Object::Reference(id)) => return Ok(Resources::Shared(*id)),
            Ok(Object::Dictionary(_)) => return Ok(Resources::Inline),
            _ => {}
        }
        let inherited = self.inherited_resources(page_id)?;
        self.dict_mut(page_id)?.set("Resources", inherited);
        Ok(Resources::Inline)
    }

    fn inherited_resources(&self, page_id: ObjectId) -> Result<Dictionary, AttestationError> {
        let mut parent = self
            .dict(page_id)?
            .get(b"Parent")
            .and_then(Object::as_reference)
            .ok();
        for _ in 0..MAX_TREE_DEPTH {
            let Some(node_id) = parent else { break };
            let node = self.dict(node_id)?;
            match node.get(b"Resources") {
                Ok(Object::Dictionary(dict)) => return Ok(dict.clone()),
                Ok(Object::Reference(id)) => return Ok(self.dict(*id)?.clone()),
                _ => {}
            }
            parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        }
        Ok(Dictionary::new())
    }

    fn dict(&self, id: ObjectId) -> Result<&Dictionary, AttestationError> {
        self.doc
            .get_object(id)
            .and_then(Object::as_dict)
            .map_err(AttestationError::Decode)
    }

    fn dict_mut(&mut self, id: ObjectId) -> Result<&mut Dictionary, AttestationError> {
        self.doc
            .get_object_mut(id)
            .and_then(Object::as_dict_mut)
            .map_err(AttestationError::Decode)
    }
}

/// Encode a PDF text string: plain literal for ASCII, UTF-16BE with BOM otherwise.
pub fn text_string(value: &str) -> Object {
    if value.is_ascii() {
        return Object::string_literal(value);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in value.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Decode a PDF text string written as UTF-16BE with BOM or in a single-byte encoding.
pub fn decode_text_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => decode_win_ansi(bytes),
    }
}
