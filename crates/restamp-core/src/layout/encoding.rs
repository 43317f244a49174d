//! Single-byte WinAnsi (CP1252) text codec.
//!
//! The layout pass decodes show-text operands with it and the rewriter
//! encodes replacement text with it. Multibyte/CID fonts are out of
//! scope; their bytes decode to best-effort Latin-1.

/// The 0x80..0x9F block, where CP1252 diverges from Latin-1.
const CP1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{FFFD}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}',
    '\u{2021}', '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{FFFD}',
    '\u{017D}', '\u{FFFD}', '\u{FFFD}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}',
    '\u{2022}', '\u{2013}', '\u{2014}', '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}',
    '\u{0153}', '\u{FFFD}', '\u{017E}', '\u{0178}',
];

pub fn decode_byte(b: u8) -> char {
    match b {
        0x80..=0x9F => CP1252_HIGH[(b - 0x80) as usize],
        _ => b as char,
    }
}

/// Encode one character, or `None` if it has no WinAnsi code point.
pub fn encode_char(c: char) -> Option<u8> {
    let code = c as u32;
    match code {
        0x00..=0x7F => Some(code as u8),
        0xA0..=0xFF => Some(code as u8),
        _ => CP1252_HIGH
            .iter()
            .position(|&h| h == c && c != '\u{FFFD}')
            .map(|i| 0x80 + i as u8),
    }
}
