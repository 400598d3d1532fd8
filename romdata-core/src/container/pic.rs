//! Sprite pixel data: LZ11-compressed 4bpp 8x8 tiles plus BGR555 palettes.

use super::lz11;
use crate::{RomDataError, Result};

const TILE: usize = 8;

/// Decompresses a tiled 4bpp sprite into one palette index per pixel, row by
/// row. `width` and `height` must be multiples of 8.
pub fn decompress(data: &[u8], width: usize, height: usize) -> Result<Vec<u8>> {
    if width % TILE != 0 || height % TILE != 0 {
        return Err(RomDataError::Precondition(format!(
            "sprite size {}x{} is not a whole number of tiles",
            width, height
        )));
    }
    let raw = lz11::decompress(data)?;
    let needed = width * height / 2;
    if raw.len() < needed {
        return Err(RomDataError::malformed(
            0,
            format!("sprite holds {} bytes, {}x{} needs {}", raw.len(), width, height, needed),
        ));
    }

    let tiles_per_row = width / TILE;
    let mut pixels = vec![0u8; width * height];
    for (i, &byte) in raw[..needed].iter().enumerate() {
        for (half, index) in [(0, byte & 0x0F), (1, byte >> 4)] {
            let n = i * 2 + half;
            let tile = n / (TILE * TILE);
            let within = n % (TILE * TILE);
            let x = (tile % tiles_per_row) * TILE + within % TILE;
            let y = (tile / tiles_per_row) * TILE + within / TILE;
            pixels[y * width + x] = index;
        }
    }
    Ok(pixels)
}

pub fn bgr555_to_rgba(color: u16) -> [u8; 4] {
    let expand = |c: u16| ((c << 3) | (c >> 2)) as u8;
    [
        expand(color & 0x1F),
        expand((color >> 5) & 0x1F),
        expand((color >> 10) & 0x1F),
        0xFF,
    ]
}

pub fn decode_palette(data: &[u8]) -> Vec<[u8; 4]> {
    data.chunks_exact(2)
        .map(|c| bgr555_to_rgba(u16::from_le_bytes([c[0], c[1]])))
        .collect()
}
