//! In-game trades: file 0 of the trade archive is a packed array of
//! fixed-size records. Nicknames come first in the trade text file, OT names
//! follow them.

use log::debug;

use crate::container::garc::Archive;
use crate::container::{read_u16, read_u32};
use crate::model::IngameTrade;
use crate::{RomDataError, Result};

pub const TRADE_SIZE: usize = 0x34;

const GIVEN: usize = 0x00;
const FORM: usize = 0x02;
const IVS: usize = 0x04;
const OT_ID: usize = 0x0C;
const ITEM: usize = 0x10;
const REQUESTED: usize = 0x14;

pub fn read_trades(archive: &Archive, strings: &[String]) -> Result<Vec<IngameTrade>> {
    let data = archive.file(0)?;
    let count = data.len() / TRADE_SIZE;
    let text = |i: usize| strings.get(i).cloned().unwrap_or_default();

    let trades = data
        .chunks_exact(TRADE_SIZE)
        .enumerate()
        .map(|(i, rec)| -> Result<IngameTrade> {
            let mut ivs = [0u8; 6];
            ivs.copy_from_slice(&rec[IVS..IVS + 6]);
            Ok(IngameTrade {
                requested_species: read_u16(rec, REQUESTED)?,
                given_species: read_u16(rec, GIVEN)?,
                given_form: rec[FORM],
                nickname: text(i),
                ot_name: text(count + i),
                ot_id: read_u32(rec, OT_ID)?,
                ivs,
                held_item: read_u16(rec, ITEM)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    debug!("read {} in-game trades", trades.len());
    Ok(trades)
}

/// Patches the trade records and returns the trade text lines to store.
/// Lines past the nickname and OT name blocks are carried over.
pub fn write_trades(
    archive: &mut Archive,
    strings: &[String],
    trades: &[IngameTrade],
) -> Result<Vec<String>> {
    let mut data = archive.file(0)?.to_vec();
    let count = data.len() / TRADE_SIZE;
    if trades.len() != count {
        return Err(RomDataError::Precondition(format!(
            "expected {} trades, got {}",
            count,
            trades.len()
        )));
    }

    for (t, rec) in trades.iter().zip(data.chunks_exact_mut(TRADE_SIZE)) {
        rec[GIVEN..GIVEN + 2].copy_from_slice(&t.given_species.to_le_bytes());
        rec[FORM] = t.given_form;
        rec[IVS..IVS + 6].copy_from_slice(&t.ivs);
        rec[OT_ID..OT_ID + 4].copy_from_slice(&t.ot_id.to_le_bytes());
        rec[ITEM..ITEM + 2].copy_from_slice(&t.held_item.to_le_bytes());
        rec[REQUESTED..REQUESTED + 2].copy_from_slice(&t.requested_species.to_le_bytes());
    }
    if data != archive.file(0)? {
        archive.set_file(0, data)?;
    }

    let mut lines = strings.to_vec();
    if lines.len() < 2 * count {
        lines.resize(2 * count, String::new());
    }
    for (i, t) in trades.iter().enumerate() {
        lines[i] = t.nickname.clone();
        lines[count + i] = t.ot_name.clone();
    }
    Ok(lines)
}
