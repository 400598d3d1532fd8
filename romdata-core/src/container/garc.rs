//! GARC archives: a header followed by FATO (entry offsets), FATB (per-entry
//! sub-file bit vectors and ranges) and FIMB (file data) sections.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::debug;

use super::{expect_magic, read_u16, read_u32};
use crate::fsutil;
use crate::{RomDataError, Result};

const GARC_MAGIC: &[u8; 4] = b"CRAG";
const FATO_MAGIC: &[u8; 4] = b"OTAF";
const FATB_MAGIC: &[u8; 4] = b"BTAF";
const FIMB_MAGIC: &[u8; 4] = b"BMIF";

const HEADER_SIZE_V4: usize = 0x1C;
const HEADER_SIZE_V6: usize = 0x24;
const SECTION_HEADER_SIZE: usize = 0xC;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GarcVersion {
    V4,
    V6,
}

impl GarcVersion {
    fn header_size(self) -> usize {
        match self {
            GarcVersion::V4 => HEADER_SIZE_V4,
            GarcVersion::V6 => HEADER_SIZE_V6,
        }
    }

    fn code(self) -> u16 {
        match self {
            GarcVersion::V4 => 0x0400,
            GarcVersion::V6 => 0x0600,
        }
    }
}

/// Decoded archive: entry index -> sub-file index -> bytes.
#[derive(Clone, Debug, PartialEq)]
pub struct Archive {
    pub version: GarcVersion,
    pub pad_to: usize,
    pad_byte: u8,
    files: BTreeMap<usize, BTreeMap<usize, Vec<u8>>>,
}

impl Archive {
    pub fn new(version: GarcVersion) -> Self {
        Self {
            version,
            pad_to: 4,
            pad_byte: 0xFF,
            files: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn entries(&self) -> &BTreeMap<usize, BTreeMap<usize, Vec<u8>>> {
        &self.files
    }

    /// Sub-file 0 of entry `index`.
    pub fn get_file(&self, index: usize) -> Option<&[u8]> {
        self.get_sub_file(index, 0)
    }

    pub fn get_sub_file(&self, index: usize, sub: usize) -> Option<&[u8]> {
        self.files
            .get(&index)
            .and_then(|subs| subs.get(&sub))
            .map(Vec::as_slice)
    }

    pub fn file(&self, index: usize) -> Result<&[u8]> {
        self.get_file(index).ok_or_else(|| {
            RomDataError::Precondition(format!(
                "archive has no file {} ({} entries)",
                index,
                self.files.len()
            ))
        })
    }

    /// Replaces sub-file 0 of an existing entry; any length is accepted.
    pub fn set_file(&mut self, index: usize, bytes: Vec<u8>) -> Result<()> {
        self.set_sub_file(index, 0, bytes)
    }

    pub fn set_sub_file(&mut self, index: usize, sub: usize, bytes: Vec<u8>) -> Result<()> {
        if sub >= 32 {
            return Err(RomDataError::Precondition(format!(
                "sub-file index {} does not fit the 32-bit entry vector",
                sub
            )));
        }
        match self.files.get_mut(&index) {
            Some(subs) => {
                subs.insert(sub, bytes);
                Ok(())
            }
            None => Err(RomDataError::Precondition(format!(
                "archive has no entry {} ({} entries)",
                index,
                self.files.len()
            ))),
        }
    }

    /// Appends a new single-file entry and returns its index.
    pub fn push_file(&mut self, bytes: Vec<u8>) -> usize {
        let index = self.files.len();
        let mut subs = BTreeMap::new();
        subs.insert(0, bytes);
        self.files.insert(index, subs);
        index
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        expect_magic(data, 0, GARC_MAGIC)?;
        let header_size = read_u32(data, 4)? as usize;
        let version = match (read_u16(data, 0xA)?, header_size) {
            (0x0400, HEADER_SIZE_V4) => GarcVersion::V4,
            (0x0600, HEADER_SIZE_V6) => GarcVersion::V6,
            (code, size) => {
                return Err(RomDataError::malformed(
                    0xA,
                    format!("unsupported GARC version 0x{:04X} with header size 0x{:X}", code, size),
                ))
            }
        };
        let data_offset = read_u32(data, 0x10)? as usize;
        let pad_to = match version {
            GarcVersion::V4 => 4,
            GarcVersion::V6 => (read_u32(data, 0x20)? as usize).max(1),
        };

        let fato = header_size;
        expect_magic(data, fato, FATO_MAGIC)?;
        let fato_size = read_u32(data, fato + 4)? as usize;
        let entry_count = read_u16(data, fato + 8)? as usize;

        let fatb = fato + fato_size;
        expect_magic(data, fatb, FATB_MAGIC)?;
        let fatb_size = read_u32(data, fatb + 4)? as usize;
        let fatb_count = read_u32(data, fatb + 8)? as usize;
        if fatb_count != entry_count {
            return Err(RomDataError::malformed(
                fatb + 8,
                format!("FATB lists {} entries, FATO {}", fatb_count, entry_count),
            ));
        }

        let fimb = fatb + fatb_size;
        expect_magic(data, fimb, FIMB_MAGIC)?;

        let mut files = BTreeMap::new();
        let mut pad_byte = None;
        for i in 0..entry_count {
            let mut pos = fatb + SECTION_HEADER_SIZE + read_u32(data, fato + 0xC + i * 4)? as usize;
            let vector = read_u32(data, pos)?;
            pos += 4;

            let mut subs = BTreeMap::new();
            for bit in 0..32 {
                if vector & (1 << bit) == 0 {
                    continue;
                }
                let start = data_offset + read_u32(data, pos)? as usize;
                let end = data_offset + read_u32(data, pos + 4)? as usize;
                let length = read_u32(data, pos + 8)? as usize;
                pos += 12;

                let body = data.get(start..start + length).ok_or(RomDataError::OutOfBounds {
                    offset: start,
                    len: length,
                    size: data.len(),
                })?;
                if pad_byte.is_none() && end > start + length {
                    pad_byte = data.get(start + length).copied();
                }
                subs.insert(bit, body.to_vec());
            }
            files.insert(i, subs);
        }

        debug!("GARC {:?}: {} entries", version, entry_count);
        Ok(Archive {
            version,
            pad_to,
            pad_byte: pad_byte.unwrap_or(0xFF),
            files,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let header_size = self.version.header_size();
        let pad_to = self.pad_to.max(1);

        let mut fatb_entries = Vec::new();
        let mut fato_offsets = Vec::with_capacity(self.files.len());
        let mut body = Vec::new();
        let mut largest_padded = 0usize;
        let mut largest_unpadded = 0usize;

        for subs in self.files.values() {
            fato_offsets.push(fatb_entries.len() as u32);
            let vector = subs.keys().fold(0u32, |v, &bit| v | (1 << bit));
            fatb_entries.extend_from_slice(&vector.to_le_bytes());
            for bytes in subs.values() {
                let start = body.len();
                body.extend_from_slice(bytes);
                while body.len() % pad_to != 0 {
                    body.push(self.pad_byte);
                }
                largest_unpadded = largest_unpadded.max(bytes.len());
                largest_padded = largest_padded.max(body.len() - start);
                fatb_entries.extend_from_slice(&(start as u32).to_le_bytes());
                fatb_entries.extend_from_slice(&(body.len() as u32).to_le_bytes());
                fatb_entries.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
            }
        }

        let fato_size = SECTION_HEADER_SIZE + 4 * fato_offsets.len();
        let fatb_size = SECTION_HEADER_SIZE + fatb_entries.len();
        let data_offset = header_size + fato_size + fatb_size + SECTION_HEADER_SIZE;
        let total = data_offset + body.len();

        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(GARC_MAGIC);
        out.extend_from_slice(&(header_size as u32).to_le_bytes());
        out.extend_from_slice(&0xFEFFu16.to_le_bytes());
        out.extend_from_slice(&self.version.code().to_le_bytes());
        out.extend_from_slice(&4u32.to_le_bytes());
        out.extend_from_slice(&(data_offset as u32).to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        match self.version {
            GarcVersion::V4 => {
                out.extend_from_slice(&(largest_unpadded as u32).to_le_bytes());
            }
            GarcVersion::V6 => {
                out.extend_from_slice(&(largest_padded as u32).to_le_bytes());
                out.extend_from_slice(&(largest_unpadded as u32).to_le_bytes());
                out.extend_from_slice(&(pad_to as u32).to_le_bytes());
            }
        }

        out.extend_from_slice(FATO_MAGIC);
        out.extend_from_slice(&(fato_size as u32).to_le_bytes());
        out.extend_from_slice(&(fato_offsets.len() as u16).to_le_bytes());
        out.extend_from_slice(&0xFFFFu16.to_le_bytes());
        for offset in &fato_offsets {
            out.extend_from_slice(&offset.to_le_bytes());
        }

        out.extend_from_slice(FATB_MAGIC);
        out.extend_from_slice(&(fatb_size as u32).to_le_bytes());
        out.extend_from_slice(&(fato_offsets.len() as u32).to_le_bytes());
        out.extend_from_slice(&fatb_entries);

        out.extend_from_slice(FIMB_MAGIC);
        out.extend_from_slice(&(SECTION_HEADER_SIZE as u32).to_le_bytes());
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(&body);
        out
    }
}

pub fn read_archive(path: &Path) -> Result<Archive> {
    let data = fs::read(path)?;
    Archive::from_bytes(&data).map_err(|e| match e {
        RomDataError::Malformed { offset, reason } => RomDataError::Malformed {
            offset,
            reason: format!("{}: {}", path.display(), reason),
        },
        other => other,
    })
}

pub fn write_archive(path: &Path, archive: &Archive) -> Result<()> {
    fsutil::write_atomic(path, &archive.to_bytes())
}
