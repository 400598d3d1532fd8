//! LZ11 (type 0x11) codec used for compressed sub-files.

use crate::{RomDataError, Result};

const LZ11_TYPE: u8 = 0x11;
const WINDOW: usize = 0x1000;
const MAX_MATCH: usize = 0x10110;

fn truncated(pos: usize) -> RomDataError {
    RomDataError::malformed(pos, "LZ11 stream ends before the declared size")
}

/// Decompressed size declared by the header, and the header length.
fn read_header(data: &[u8]) -> Result<(usize, usize)> {
    if data.len() < 4 || data[0] != LZ11_TYPE {
        return Err(RomDataError::malformed(0, "not an LZ11 stream"));
    }
    let size = u32::from_le_bytes([data[1], data[2], data[3], 0]) as usize;
    if size != 0 {
        return Ok((size, 4));
    }
    if data.len() < 8 {
        return Err(truncated(data.len()));
    }
    Ok((
        u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize,
        8,
    ))
}

pub fn is_compressed(data: &[u8]) -> bool {
    read_header(data).is_ok()
}

pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let (size, mut pos) = read_header(data)?;
    let mut out: Vec<u8> = Vec::with_capacity(size);

    while out.len() < size {
        let flags = *data.get(pos).ok_or_else(|| truncated(pos))?;
        pos += 1;

        for bit in (0..8).rev() {
            if out.len() >= size {
                break;
            }
            if flags & (1 << bit) == 0 {
                out.push(*data.get(pos).ok_or_else(|| truncated(pos))?);
                pos += 1;
                continue;
            }

            let b0 = *data.get(pos).ok_or_else(|| truncated(pos))? as usize;
            let b1 = *data.get(pos + 1).ok_or_else(|| truncated(pos + 1))? as usize;
            let (len, disp) = match b0 >> 4 {
                0 => {
                    let b2 = *data.get(pos + 2).ok_or_else(|| truncated(pos + 2))? as usize;
                    pos += 3;
                    ((((b0 & 0xF) << 4) | (b1 >> 4)) + 0x11, (((b1 & 0xF) << 8) | b2) + 1)
                }
                1 => {
                    let b2 = *data.get(pos + 2).ok_or_else(|| truncated(pos + 2))? as usize;
                    let b3 = *data.get(pos + 3).ok_or_else(|| truncated(pos + 3))? as usize;
                    pos += 4;
                    (
                        (((b0 & 0xF) << 12) | (b1 << 4) | (b2 >> 4)) + 0x111,
                        (((b2 & 0xF) << 8) | b3) + 1,
                    )
                }
                n => {
                    pos += 2;
                    (n + 1, (((b0 & 0xF) << 8) | b1) + 1)
                }
            };

            if disp > out.len() {
                return Err(RomDataError::malformed(
                    pos,
                    format!("LZ11 back-reference {} reaches before the output start", disp),
                ));
            }
            for _ in 0..len {
                if out.len() >= size {
                    break;
                }
                out.push(out[out.len() - disp]);
            }
        }
    }

    Ok(out)
}

fn longest_match(input: &[u8], pos: usize) -> (usize, usize) {
    let start = pos.saturating_sub(WINDOW);
    let max_len = (input.len() - pos).min(MAX_MATCH);
    let mut best = (0usize, 0usize);
    for candidate in (start..pos).rev() {
        let mut len = 0;
        while len < max_len && input[candidate + len] == input[pos + len] {
            len += 1;
        }
        if len > best.0 {
            best = (len, pos - candidate);
            if len == max_len {
                break;
            }
        }
    }
    best
}

/// Greedy LZ11 compressor.
pub fn compress(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() / 2 + 8);
    out.push(LZ11_TYPE);
    if input.len() < 0x100_0000 && !input.is_empty() {
        out.extend_from_slice(&(input.len() as u32).to_le_bytes()[..3]);
    } else {
        out.extend_from_slice(&[0, 0, 0]);
        out.extend_from_slice(&(input.len() as u32).to_le_bytes());
    }

    let mut pos = 0;
    while pos < input.len() {
        let flag_at = out.len();
        out.push(0);
        for bit in (0..8).rev() {
            if pos >= input.len() {
                break;
            }
            let (len, disp) = longest_match(input, pos);
            if len < 3 {
                out.push(input[pos]);
                pos += 1;
                continue;
            }
            out[flag_at] |= 1 << bit;
            let d = disp - 1;
            if len <= 0x10 {
                out.push((((len - 1) << 4) | (d >> 8)) as u8);
                out.push(d as u8);
            } else if len <= 0x110 {
                let l = len - 0x11;
                out.push((l >> 4) as u8);
                out.push((((l & 0xF) << 4) | (d >> 8)) as u8);
                out.push(d as u8);
            } else {
                let l = len - 0x111;
                out.push((0x10 | (l >> 12)) as u8);
                out.push((l >> 4) as u8);
                out.push((((l & 0xF) << 4) | (d >> 8)) as u8);
                out.push(d as u8);
            }
            pos += len;
        }
    }

    while out.len() % 4 != 0 {
        out.push(0);
    }
    out
}
