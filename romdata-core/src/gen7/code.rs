//! Move id tables patched straight into the executable: tutor lists and,
//! when catalogued, the TM list. Both are runs of little-endian u16 ids.

use crate::catalog::RomEntry;
use crate::container::read_u16;
use crate::{RomDataError, Result};

/// Empty when the entry does not catalogue the table.
pub fn read_move_table(
    code: &[u8],
    entry: &RomEntry,
    offset_key: &str,
    count_key: &str,
) -> Result<Vec<u16>> {
    let (offset, count) = match (entry.opt_int(offset_key)?, entry.opt_int(count_key)?) {
        (Some(offset), Some(count)) => (offset, count),
        _ => return Ok(Vec::new()),
    };
    (0..count).map(|i| read_u16(code, offset + i * 2)).collect()
}

pub fn write_move_table(
    code: &mut [u8],
    entry: &RomEntry,
    offset_key: &str,
    count_key: &str,
    moves: &[u16],
) -> Result<()> {
    let (offset, count) = match (entry.opt_int(offset_key)?, entry.opt_int(count_key)?) {
        (Some(offset), Some(count)) => (offset, count),
        _ if moves.is_empty() => return Ok(()),
        _ => {
            return Err(RomDataError::Precondition(format!(
                "{} does not catalogue {}",
                entry.name, count_key
            )))
        }
    };
    if moves.len() != count {
        return Err(RomDataError::Precondition(format!(
            "{} expects {} moves, got {}",
            count_key,
            count,
            moves.len()
        )));
    }
    let size = code.len();
    let region = code
        .get_mut(offset..offset + count * 2)
        .ok_or(RomDataError::OutOfBounds {
            offset,
            len: count * 2,
            size,
        })?;
    for (slot, id) in region.chunks_exact_mut(2).zip(moves) {
        slot.copy_from_slice(&id.to_le_bytes());
    }
    Ok(())
}
