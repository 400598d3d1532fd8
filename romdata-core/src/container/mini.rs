//! Mini containers: a two-character tag, a sub-stream count and count+1
//! offsets, each sub-stream padded to four bytes with zeros.

use super::{read_u16, read_u32};
use crate::{RomDataError, Result};

pub fn unpack(data: &[u8], tag: &str) -> Result<Vec<Vec<u8>>> {
    let tag = tag.as_bytes();
    if data.len() < 4 || &data[0..2] != tag {
        return Err(RomDataError::malformed(
            0,
            format!("mini container tag is not '{}'", String::from_utf8_lossy(tag)),
        ));
    }
    let count = read_u16(data, 2)? as usize;
    let mut streams = Vec::with_capacity(count);
    for i in 0..count {
        let start = read_u32(data, 4 + i * 4)? as usize;
        let end = read_u32(data, 8 + i * 4)? as usize;
        let stream = data
            .get(start..end)
            .ok_or_else(|| RomDataError::malformed(4 + i * 4, "mini sub-stream out of range"))?;
        streams.push(stream.to_vec());
    }
    Ok(streams)
}

pub fn pack(streams: &[Vec<u8>], tag: &str) -> Vec<u8> {
    let header_len = 4 + (streams.len() + 1) * 4;
    let mut out = Vec::with_capacity(header_len + streams.iter().map(Vec::len).sum::<usize>());
    out.extend_from_slice(&tag.as_bytes()[..2]);
    out.extend_from_slice(&(streams.len() as u16).to_le_bytes());

    let mut body = Vec::new();
    let mut offsets = Vec::with_capacity(streams.len() + 1);
    for stream in streams {
        offsets.push((header_len + body.len()) as u32);
        body.extend_from_slice(stream);
        while body.len() % 4 != 0 {
            body.push(0);
        }
    }
    offsets.push((header_len + body.len()) as u32);

    for offset in offsets {
        out.extend_from_slice(&offset.to_le_bytes());
    }
    out.extend_from_slice(&body);
    out
}
