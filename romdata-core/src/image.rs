use crate::charmap::{self, TERMINATOR};
use crate::{RomDataError, Result};

pub const BANK_SIZE: usize = 0x4000;

pub fn bank_of(offset: usize) -> usize {
    offset / BANK_SIZE
}

/// Byte surface of a flat-bank cartridge. Owned by exactly one loaded ROM;
/// writes go straight into the buffer.
#[derive(Clone, Debug)]
pub struct RomImage {
    data: Vec<u8>,
}

impl RomImage {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    fn check(&self, offset: usize, len: usize) -> Result<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(()),
            _ => Err(RomDataError::OutOfBounds {
                offset,
                len,
                size: self.data.len(),
            }),
        }
    }

    pub fn slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.check(offset, len)?;
        Ok(&self.data[offset..offset + len])
    }

    pub fn read_byte(&self, offset: usize) -> Result<u8> {
        self.check(offset, 1)?;
        Ok(self.data[offset])
    }

    pub fn write_byte(&mut self, offset: usize, value: u8) -> Result<()> {
        self.check(offset, 1)?;
        self.data[offset] = value;
        Ok(())
    }

    /// Little-endian 16-bit word.
    pub fn read_word(&self, offset: usize) -> Result<u16> {
        self.check(offset, 2)?;
        Ok(u16::from_le_bytes([self.data[offset], self.data[offset + 1]]))
    }

    pub fn write_word(&mut self, offset: usize, value: u16) -> Result<()> {
        self.check(offset, 2)?;
        self.data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        self.check(offset, bytes.len())?;
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Resolves the 2-byte pointer stored at `offset` against the bank the
    /// pointer itself lives in.
    pub fn read_pointer(&self, offset: usize) -> Result<usize> {
        self.read_pointer_in_bank(offset, bank_of(offset))
    }

    pub fn read_pointer_in_bank(&self, offset: usize, bank: usize) -> Result<usize> {
        let ptr = self.read_word(offset)? as usize;
        if bank > 0 && !(BANK_SIZE..2 * BANK_SIZE).contains(&ptr) {
            return Err(RomDataError::malformed(
                offset,
                format!("pointer 0x{:04X} is outside the switchable bank window", ptr),
            ));
        }
        Ok(bank * BANK_SIZE + (ptr % BANK_SIZE))
    }

    /// Stores `target` as a bank-relative pointer. The caller guarantees the
    /// target lives in the bank the pointer is resolved against.
    pub fn write_pointer(&mut self, offset: usize, target: usize) -> Result<()> {
        let bank = bank_of(target);
        let mut ptr = target % BANK_SIZE;
        if bank > 0 {
            ptr += BANK_SIZE;
        }
        self.write_word(offset, ptr as u16)
    }

    pub fn read_fixed_length_string(&self, offset: usize, length: usize) -> Result<String> {
        Ok(charmap::decode(self.slice(offset, length)?))
    }

    /// Writes `text` truncated or padded with terminators to `length` bytes.
    pub fn write_fixed_length_string(
        &mut self,
        offset: usize,
        text: &str,
        length: usize,
    ) -> Result<()> {
        let mut bytes = charmap::encode(text);
        bytes.resize(length, TERMINATOR);
        self.write_bytes(offset, &bytes)
    }

    /// Byte length of the terminated string at `offset`, terminator included.
    pub fn variable_length_string_size(&self, offset: usize) -> Result<usize> {
        let mut end = offset;
        while self.read_byte(end)? != TERMINATOR {
            end += 1;
        }
        Ok(end - offset + 1)
    }

    pub fn read_variable_length_string(&self, offset: usize) -> Result<String> {
        let size = self.variable_length_string_size(offset)?;
        Ok(charmap::decode(self.slice(offset, size)?))
    }

    /// Writes `text` plus terminator and returns the number of bytes written.
    pub fn write_variable_length_string(&mut self, offset: usize, text: &str) -> Result<usize> {
        let mut bytes = charmap::encode(text);
        bytes.push(TERMINATOR);
        self.write_bytes(offset, &bytes)?;
        Ok(bytes.len())
    }

    /// Reads `count` consecutive terminated strings. Returns the strings and
    /// the total byte footprint.
    pub fn read_string_list(&self, offset: usize, count: usize) -> Result<(Vec<String>, usize)> {
        let mut strings = Vec::with_capacity(count);
        let mut pos = offset;
        for _ in 0..count {
            let size = self.variable_length_string_size(pos)?;
            strings.push(charmap::decode(self.slice(pos, size)?));
            pos += size;
        }
        Ok((strings, pos - offset))
    }

    /// Rewrites a string list in place. The list may not outgrow
    /// `capacity`, the footprint it had when it was read.
    pub fn write_string_list(
        &mut self,
        offset: usize,
        strings: &[String],
        capacity: usize,
        label: &str,
    ) -> Result<()> {
        let mut bytes = Vec::with_capacity(capacity);
        for s in strings {
            bytes.extend(charmap::encode(s));
            bytes.push(TERMINATOR);
        }
        if bytes.len() > capacity {
            return Err(RomDataError::FreeSpace {
                record: label.to_string(),
                requested: bytes.len(),
                bank: bank_of(offset),
            });
        }
        self.write_bytes(offset, &bytes)
    }
}
