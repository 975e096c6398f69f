//! Glyph metrics and encoding for the standard Helvetica-Bold font.
//!
//! Overlay text is drawn with a standard 14 font referenced by name, so the
//! document carries no font program. Text is encoded with WinAnsiEncoding and
//! measured with the Adobe advance widths (1/1000 em) to flow wrapped boxes.

/// Advance widths for WinAnsi codes 0x20..=0x7E.
const ASCII_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // 0x20
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // 0x30
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // 0x40
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 0x50
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // 0x60
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 0x70
];

/// Advance widths for WinAnsi codes 0xA0..=0xFF (Latin-1 supplement).
const LATIN1_WIDTHS: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 280, 556, 333, 737, 370, 556, 584, 333, 737, 333, // 0xA0
    400, 584, 333, 333, 333, 611, 556, 278, 333, 333, 365, 556, 834, 834, 834, 611, // 0xB0
    722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278, // 0xC0
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611, // 0xD0
    556, 556, 556, 556, 556, 556, 889, 556, 556, 556, 556, 556, 278, 278, 278, 278, // 0xE0
    611, 611, 611, 611, 611, 611, 611, 584, 611, 611, 611, 611, 611, 556, 611, 556, // 0xF0
];

/// WinAnsi codes 0x80..=0x9F that differ from Latin-1: (code, char, width).
const WIN_ANSI_EXTRAS: [(u8, char, u16); 27] = [
    (0x80, '\u{20AC}', 556),
    (0x82, '\u{201A}', 278),
    (0x83, '\u{0192}', 556),
    (0x84, '\u{201E}', 500),
    (0x85, '\u{2026}', 1000),
    (0x86, '\u{2020}', 556),
    (0x87, '\u{2021}', 556),
    (0x88, '\u{02C6}', 333),
    (0x89, '\u{2030}', 1000),
    (0x8A, '\u{0160}', 667),
    (0x8B, '\u{2039}', 333),
    (0x8C, '\u{0152}', 1000),
    (0x8E, '\u{017D}', 611),
    (0x91, '\u{2018}', 278),
    (0x92, '\u{2019}', 278),
    (0x93, '\u{201C}', 500),
    (0x94, '\u{201D}', 500),
    (0x95, '\u{2022}', 350),
    (0x96, '\u{2013}', 556),
    (0x97, '\u{2014}', 1000),
    (0x98, '\u{02DC}', 333),
    (0x99, '\u{2122}', 1000),
    (0x9A, '\u{0161}', 556),
    (0x9B, '\u{203A}', 333),
    (0x9C, '\u{0153}', 944),
    (0x9E, '\u{017E}', 500),
    (0x9F, '\u{0178}', 667),
];

/// Map one character to its WinAnsi code, if the encoding has it.
pub fn win_ansi_code(ch: char) -> Option<u8> {
    let cp = ch as u32;
    match cp {
        0x20..=0x7E | 0xA0..=0xFF => Some(cp as u8),
        _ => WIN_ANSI_EXTRAS
            .iter()
            .find(|(_, c, _)| *c == ch)
            .map(|(code, _, _)| *code),
    }
}

/// Encode text as WinAnsi bytes. Returns the first character the encoding cannot represent.
pub fn encode_win_ansi(text: &str) -> Result<Vec<u8>, char> {
    text.chars()
        .map(|ch| win_ansi_code(ch).ok_or(ch))
        .collect()
}

/// Decode WinAnsi bytes back into text. Undefined codes decode to U+FFFD.
pub fn decode_win_ansi(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| match b {
            0x20..=0x7E | 0xA0..=0xFF => b as char,
            _ => WIN_ANSI_EXTRAS
                .iter()
                .find(|(code, _, _)| *code == b)
                .map(|(_, ch, _)| *ch)
                .unwrap_or(char::REPLACEMENT_CHARACTER),
        })
        .collect()
}

fn code_width(code: u8) -> u16 {
    match code {
        0x20..=0x7E => ASCII_WIDTHS[(code - 0x20) as usize],
        0xA0..=0xFF => LATIN1_WIDTHS[(code - 0xA0) as usize],
        _ => WIN_ANSI_EXTRAS
            .iter()
            .find(|(c, _, _)| *c == code)
            .map(|(_, _, w)| *w)
            .unwrap_or(0),
    }
}

/// Width of `text` in points when set at `size`. Unencodable characters count as zero.
pub fn text_width(text: &str, size: f32) -> f32 {
    let units: u32 = text
        .chars()
        .filter_map(win_ansi_code)
        .map(|code| u32::from(code_width(code)))
        .sum();
    units as f32 * size / 1000.0
}

/// Split `text` into lines that fit `max_width` at `size`.
///
/// Explicit newlines always start a new line. Lines break between words; a
/// single word wider than the box is split between characters.
pub fn wrap_lines(text: &str, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();

        for word in paragraph.split_whitespace() {
            if !current.is_empty() {
                let candidate = format!("{current} {word}");
                if text_width(&candidate, size) <= max_width {
                    current = candidate;
                    continue;
                }
                lines.push(std::mem::take(&mut current));
            }
            current = break_word(word, size, max_width, &mut lines);
        }
        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Pushes full-width slices of a word wider than the box and returns the rest.
fn break_word(word: &str, size: f32, max_width: f32, lines: &mut Vec<String>) -> String {
    let mut rest = String::new();
    for ch in word.chars() {
        rest.push(ch);
        if text_width(&rest, size) > max_width && rest.chars().count() > 1 {
            rest.pop();
            lines.push(std::mem::replace(&mut rest, ch.to_string()));
        }
    }
    rest
}
