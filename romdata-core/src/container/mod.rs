//! Container formats used by the archive-based titles.

pub mod garc;
pub mod lz11;
pub mod mini;
pub mod pic;

use crate::{RomDataError, Result};

pub(crate) fn read_u16(data: &[u8], offset: usize) -> Result<u16> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or(RomDataError::OutOfBounds {
            offset,
            len: 2,
            size: data.len(),
        })
}

pub(crate) fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(RomDataError::OutOfBounds {
            offset,
            len: 4,
            size: data.len(),
        })
}

pub(crate) fn expect_magic(data: &[u8], offset: usize, magic: &[u8]) -> Result<()> {
    match data.get(offset..offset + magic.len()) {
        Some(found) if found == magic => Ok(()),
        _ => Err(RomDataError::malformed(
            offset,
            format!("expected '{}' section", String::from_utf8_lossy(magic)),
        )),
    }
}
