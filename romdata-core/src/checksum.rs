use flate2::Crc;

use crate::image::RomImage;
use crate::Result;

pub const HEADER_CHECKSUM_OFFSET: usize = 0x14D;
pub const GLOBAL_CHECKSUM_OFFSET: usize = 0x14E;
const HEADER_START: usize = 0x134;

/// Cartridge header check byte over 0x134..=0x14C.
pub fn header_checksum(rom: &[u8]) -> u8 {
    rom[HEADER_START..HEADER_CHECKSUM_OFFSET]
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_sub(b).wrapping_sub(1))
}

/// 16-bit sum of every byte except the two global checksum bytes.
pub fn global_checksum(rom: &[u8]) -> u16 {
    rom.iter()
        .enumerate()
        .filter(|(i, _)| *i != GLOBAL_CHECKSUM_OFFSET && *i != GLOBAL_CHECKSUM_OFFSET + 1)
        .fold(0u16, |acc, (_, &b)| acc.wrapping_add(b as u16))
}

/// Stamps both cartridge checksums. The global checksum is stored big-endian
/// and covers the freshly written header byte.
pub fn finalize_cartridge(image: &mut RomImage) -> Result<()> {
    image.slice(0, GLOBAL_CHECKSUM_OFFSET + 2)?;
    let header = header_checksum(image.as_bytes());
    image.write_byte(HEADER_CHECKSUM_OFFSET, header)?;
    let global = global_checksum(image.as_bytes());
    image.write_bytes(GLOBAL_CHECKSUM_OFFSET, &global.to_be_bytes())?;
    Ok(())
}

pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = Crc::new();
    crc.update(data);
    crc.sum()
}
