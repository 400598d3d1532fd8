//! Character map for flat-bank text. Bytes without a mapping decode to a
//! `\xNN` escape so every string survives a decode/encode round trip.

use std::collections::HashMap;
use std::sync::OnceLock;

pub const TERMINATOR: u8 = 0x50;

const SPECIALS: &[(u8, &str)] = &[
    (0x7F, " "),
    (0x9A, "("),
    (0x9B, ")"),
    (0x9C, ":"),
    (0x9D, ";"),
    (0x9E, "["),
    (0x9F, "]"),
    (0xC0, "Ä"),
    (0xC1, "Ö"),
    (0xC2, "Ü"),
    (0xC3, "ä"),
    (0xC4, "ö"),
    (0xC5, "ü"),
    (0xE0, "'"),
    (0xE1, "<PK>"),
    (0xE2, "<MN>"),
    (0xE3, "-"),
    (0xE6, "?"),
    (0xE7, "!"),
    (0xE8, "."),
    (0xE9, "&"),
    (0xEA, "é"),
    (0xEF, "♂"),
    (0xF0, "¥"),
    (0xF1, "×"),
    (0xF3, "/"),
    (0xF4, ","),
    (0xF5, "♀"),
];

struct Tables {
    decode: [Option<&'static str>; 256],
    encode: HashMap<&'static str, u8>,
    longest: usize,
}

static TABLES: OnceLock<Tables> = OnceLock::new();

const LETTERS_UPPER: [&str; 26] = [
    "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q", "R",
    "S", "T", "U", "V", "W", "X", "Y", "Z",
];
const LETTERS_LOWER: [&str; 26] = [
    "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r",
    "s", "t", "u", "v", "w", "x", "y", "z",
];
const DIGITS: [&str; 10] = ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"];

fn tables() -> &'static Tables {
    TABLES.get_or_init(|| {
        let mut decode: [Option<&'static str>; 256] = [None; 256];
        for (i, s) in LETTERS_UPPER.iter().enumerate() {
            decode[0x80 + i] = Some(*s);
        }
        for (i, s) in LETTERS_LOWER.iter().enumerate() {
            decode[0xA0 + i] = Some(*s);
        }
        for (i, s) in DIGITS.iter().enumerate() {
            decode[0xF6 + i] = Some(*s);
        }
        for &(byte, s) in SPECIALS {
            decode[byte as usize] = Some(s);
        }

        let mut encode = HashMap::new();
        let mut longest = 1;
        for (byte, entry) in decode.iter().enumerate() {
            if let Some(s) = entry {
                encode.insert(*s, byte as u8);
                longest = longest.max(s.chars().count());
            }
        }
        Tables {
            decode,
            encode,
            longest,
        }
    })
}

/// Decodes `bytes` up to (not including) the first terminator.
pub fn decode(bytes: &[u8]) -> String {
    let t = tables();
    let mut out = String::new();
    for &b in bytes {
        if b == TERMINATOR {
            break;
        }
        match t.decode[b as usize] {
            Some(s) => out.push_str(s),
            None => out.push_str(&format!("\\x{:02X}", b)),
        }
    }
    out
}

/// Encodes `text` without a terminator. Characters with no mapping are
/// replaced with `?`.
pub fn encode(text: &str) -> Vec<u8> {
    let t = tables();
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::with_capacity(chars.len());
    let mut i = 0usize;

    while i < chars.len() {
        if chars[i] == '\\' && i + 3 < chars.len() && chars[i + 1] == 'x' {
            let hex: String = chars[i + 2..i + 4].iter().collect();
            if let Ok(b) = u8::from_str_radix(&hex, 16) {
                out.push(b);
                i += 4;
                continue;
            }
        }

        let mut matched = false;
        let max_len = t.longest.min(chars.len() - i);
        for len in (1..=max_len).rev() {
            let candidate: String = chars[i..i + len].iter().collect();
            if let Some(&b) = t.encode.get(candidate.as_str()) {
                out.push(b);
                i += len;
                matched = true;
                break;
            }
        }

        if !matched {
            out.push(0xE6);
            i += 1;
        }
    }

    out
}
