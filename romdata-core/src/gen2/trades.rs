//! In-game trades: fixed-size records holding the requested and offered
//! species, a nickname, packed DVs, the held item and the original trainer.

use log::debug;

use super::byte_id;
use crate::catalog::RomEntry;
use crate::image::RomImage;
use crate::model::IngameTrade;
use crate::{RomDataError, Result};

// dialog, requested, given, nickname
const REQUESTED: usize = 1;
const GIVEN: usize = 2;
const NICKNAME: usize = 3;

struct Layout {
    offset: usize,
    count: usize,
    name_len: usize,
    ot_len: usize,
}

impl Layout {
    fn from_entry(entry: &RomEntry) -> Result<Self> {
        Ok(Layout {
            offset: entry.int("TradeTableOffset")?,
            count: entry.int("TradeTableSize")?,
            name_len: entry.int("TradeNameLength")?,
            ot_len: entry.int("TradeOTLength")?,
        })
    }

    fn dvs(&self) -> usize {
        NICKNAME + self.name_len
    }

    fn item(&self) -> usize {
        self.dvs() + 2
    }

    fn ot_id(&self) -> usize {
        self.item() + 1
    }

    fn ot_name(&self) -> usize {
        self.ot_id() + 2
    }

    fn record_size(&self) -> usize {
        self.ot_name() + self.ot_len + 2
    }
}

/// Unpacks the two DV bytes (Atk|Def, Spe|Spc) into HP, Atk, Def, Spe,
/// SpA, SpD. HP is made of the low bit of each of the other four.
pub fn unpack_dvs(hi: u8, lo: u8) -> [u8; 6] {
    let atk = hi >> 4;
    let def = hi & 0x0F;
    let spe = lo >> 4;
    let spc = lo & 0x0F;
    let hp = ((atk & 1) << 3) | ((def & 1) << 2) | ((spe & 1) << 1) | (spc & 1);
    [hp, atk, def, spe, spc, spc]
}

/// Inverse of [`unpack_dvs`]; the HP and special-defense values are
/// derived and therefore ignored.
pub fn pack_dvs(ivs: &[u8; 6]) -> Result<(u8, u8)> {
    if let Some(bad) = ivs.iter().find(|&&v| v > 0x0F) {
        return Err(RomDataError::Precondition(format!(
            "DV {} does not fit in four bits",
            bad
        )));
    }
    Ok(((ivs[1] << 4) | ivs[2], (ivs[3] << 4) | ivs[4]))
}

pub fn read_trades(image: &RomImage, entry: &RomEntry) -> Result<Vec<IngameTrade>> {
    let layout = Layout::from_entry(entry)?;
    let mut trades = Vec::with_capacity(layout.count);
    for i in 0..layout.count {
        let base = layout.offset + i * layout.record_size();
        let rec = image.slice(base, layout.record_size())?;
        let at = layout.ot_id();
        trades.push(IngameTrade {
            requested_species: rec[REQUESTED] as u16,
            given_species: rec[GIVEN] as u16,
            given_form: 0,
            nickname: image.read_fixed_length_string(base + NICKNAME, layout.name_len)?,
            ot_name: image.read_fixed_length_string(base + layout.ot_name(), layout.ot_len)?,
            ot_id: u16::from_be_bytes([rec[at], rec[at + 1]]) as u32,
            ivs: unpack_dvs(rec[layout.dvs()], rec[layout.dvs() + 1]),
            held_item: rec[layout.item()] as u16,
        });
    }
    debug!("read {} in-game trades", trades.len());
    Ok(trades)
}

/// Overwrites the modelled fields of each record; the dialog byte and the
/// trailing gender/padding bytes keep their loaded values.
pub fn write_trades(image: &mut RomImage, entry: &RomEntry, trades: &[IngameTrade]) -> Result<()> {
    let layout = Layout::from_entry(entry)?;
    if trades.len() != layout.count {
        return Err(RomDataError::Precondition(format!(
            "expected {} trades, got {}",
            layout.count,
            trades.len()
        )));
    }

    for (i, t) in trades.iter().enumerate() {
        let base = layout.offset + i * layout.record_size();
        image.write_byte(base + REQUESTED, byte_id("traded species", t.requested_species)?)?;
        image.write_byte(base + GIVEN, byte_id("traded species", t.given_species)?)?;

        let nickname_at = base + NICKNAME;
        if image.read_fixed_length_string(nickname_at, layout.name_len)? != t.nickname {
            image.write_fixed_length_string(nickname_at, &t.nickname, layout.name_len)?;
        }

        let (hi, lo) = pack_dvs(&t.ivs)?;
        image.write_bytes(base + layout.dvs(), &[hi, lo])?;
        image.write_byte(base + layout.item(), byte_id("held item", t.held_item)?)?;

        let ot_id = u16::try_from(t.ot_id).map_err(|_| {
            RomDataError::Precondition(format!("OT id {} does not fit in 16 bits", t.ot_id))
        })?;
        image.write_bytes(base + layout.ot_id(), &ot_id.to_be_bytes())?;

        let ot_at = base + layout.ot_name();
        if image.read_fixed_length_string(ot_at, layout.ot_len)? != t.ot_name {
            image.write_fixed_length_string(ot_at, &t.ot_name, layout.ot_len)?;
        }
    }
    Ok(())
}
