//! Encrypted text files. A file is one section of UTF-16 lines; each line is
//! XORed with a rolling 16-bit key seeded from the line index.

use crate::container::{read_u16, read_u32};
use crate::{RomDataError, Result};

const KEY_BASE: u16 = 0x7C89;
const KEY_ADVANCE: u16 = 0x2983;
const HEADER_SIZE: usize = 0x10;
const LINE_ENTRY_SIZE: usize = 8;

fn line_key(index: usize) -> u16 {
    KEY_BASE.wrapping_add(KEY_ADVANCE.wrapping_mul(index as u16))
}

fn crypt(words: &mut [u16], index: usize) {
    let mut key = line_key(index);
    for w in words {
        *w ^= key;
        key = key.rotate_left(3);
    }
}

pub fn decode_file(data: &[u8]) -> Result<Vec<String>> {
    let sections = read_u16(data, 0)?;
    if sections != 1 {
        return Err(RomDataError::malformed(
            0,
            format!("text file has {} sections", sections),
        ));
    }
    let line_count = read_u16(data, 2)? as usize;
    let section = read_u32(data, 0xC)? as usize;

    let mut lines = Vec::with_capacity(line_count);
    for i in 0..line_count {
        let entry = section + 4 + i * LINE_ENTRY_SIZE;
        let start = section + read_u32(data, entry)? as usize;
        let chars = read_u16(data, entry + 4)? as usize;
        let raw = data
            .get(start..start + chars * 2)
            .ok_or_else(|| RomDataError::malformed(entry, format!("line {} out of range", i)))?;

        let mut words: Vec<u16> = raw
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        crypt(&mut words, i);
        // Variable codes may carry zero arguments; only the last word ends the line.
        if words.last() == Some(&0) {
            words.pop();
        }
        lines.push(String::from_utf16_lossy(&words));
    }
    Ok(lines)
}

pub fn encode_file(lines: &[String]) -> Vec<u8> {
    // Line offsets count from the section start, which opens with its length.
    let table_len = 4 + lines.len() * LINE_ENTRY_SIZE;
    let mut table = Vec::with_capacity(table_len - 4);
    let mut body = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let mut words: Vec<u16> = line.encode_utf16().collect();
        words.push(0);
        let offset = table_len + body.len();
        table.extend_from_slice(&(offset as u32).to_le_bytes());
        table.extend_from_slice(&(words.len() as u16).to_le_bytes());
        table.extend_from_slice(&0u16.to_le_bytes());

        crypt(&mut words, i);
        for w in words {
            body.extend_from_slice(&w.to_le_bytes());
        }
        if body.len() % 4 != 0 {
            body.extend_from_slice(&[0, 0]);
        }
    }

    let section_len = table_len + body.len();
    let mut out = Vec::with_capacity(HEADER_SIZE + section_len);
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&(lines.len() as u16).to_le_bytes());
    out.extend_from_slice(&(section_len as u32).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(HEADER_SIZE as u32).to_le_bytes());
    out.extend_from_slice(&(section_len as u32).to_le_bytes());
    out.extend_from_slice(&table);
    out.extend_from_slice(&body);
    out
}
