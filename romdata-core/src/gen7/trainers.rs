//! Trainers: one fixed-size file per trainer in the trainer-data archive and
//! one party file (fixed-size entries) per trainer in the party archive.

use log::debug;

use super::u8_field;
use crate::container::garc::Archive;
use crate::container::{read_u16, read_u32};
use crate::model::{BattleType, PartyFormat, Trainer, TrainerPokemon};
use crate::{RomDataError, Result};

pub const TRAINER_SIZE: usize = 0x14;
pub const PARTY_ENTRY_SIZE: usize = 0x20;

const CLASS: usize = 0x00;
const BATTLE_TYPE: usize = 0x01;
const PARTY_COUNT: usize = 0x02;
const FORMAT: usize = 0x03;
const AI: usize = 0x0C;

const GENDER_ABILITY: usize = 0x00;
const NATURE: usize = 0x01;
const EVS: usize = 0x02;
const IVS: usize = 0x08;
const LEVEL: usize = 0x0C;
const SPECIES: usize = 0x0E;
const FORM: usize = 0x10;
const ITEM: usize = 0x12;
const MOVES: usize = 0x14;

const IV_BITS: u32 = 5;
const IV_MASK: u32 = 0x1F;

const BATTLE_TYPES: [BattleType; 5] = [
    BattleType::Single,
    BattleType::Double,
    BattleType::Triple,
    BattleType::Rotation,
    BattleType::Multi,
];

fn decode_pokemon(rec: &[u8]) -> Result<TrainerPokemon> {
    let mut p = TrainerPokemon::new(read_u16(rec, SPECIES)?, read_u16(rec, LEVEL)?);
    p.gender = rec[GENDER_ABILITY] & 0x0F;
    p.ability_slot = (rec[GENDER_ABILITY] >> 4) & 0x03;
    p.nature = rec[NATURE];
    p.evs.copy_from_slice(&rec[EVS..EVS + 6]);
    let ivs = read_u32(rec, IVS)?;
    for (i, iv) in p.ivs.iter_mut().enumerate() {
        *iv = ((ivs >> (IV_BITS * i as u32)) & IV_MASK) as u8;
    }
    p.form = read_u16(rec, FORM)? as u8;
    p.held_item = read_u16(rec, ITEM)?;
    for (i, m) in p.moves.iter_mut().enumerate() {
        *m = read_u16(rec, MOVES + i * 2)?;
    }
    Ok(p)
}

/// Patches `p` over `rec`; bits and bytes the model does not cover are kept.
fn encode_pokemon(p: &TrainerPokemon, rec: &mut [u8]) -> Result<()> {
    if p.gender > 0x0F || p.ability_slot > 0x03 {
        return Err(RomDataError::Precondition(format!(
            "gender {} / ability slot {} out of range",
            p.gender, p.ability_slot
        )));
    }
    rec[GENDER_ABILITY] = (rec[GENDER_ABILITY] & 0xC0) | (p.ability_slot << 4) | p.gender;
    rec[NATURE] = p.nature;
    rec[EVS..EVS + 6].copy_from_slice(&p.evs);

    let mut ivs = read_u32(rec, IVS)? & !((1 << (IV_BITS * 6)) - 1);
    for (i, &iv) in p.ivs.iter().enumerate() {
        if iv as u32 > IV_MASK {
            return Err(RomDataError::Precondition(format!("IV {} out of range", iv)));
        }
        ivs |= (iv as u32) << (IV_BITS * i as u32);
    }
    rec[IVS..IVS + 4].copy_from_slice(&ivs.to_le_bytes());
    rec[LEVEL..LEVEL + 2].copy_from_slice(&p.level.to_le_bytes());
    rec[SPECIES..SPECIES + 2].copy_from_slice(&p.species.to_le_bytes());
    rec[FORM..FORM + 2].copy_from_slice(&(p.form as u16).to_le_bytes());
    rec[ITEM..ITEM + 2].copy_from_slice(&p.held_item.to_le_bytes());
    for (i, m) in p.moves.iter().enumerate() {
        rec[MOVES + i * 2..MOVES + i * 2 + 2].copy_from_slice(&m.to_le_bytes());
    }
    Ok(())
}

pub fn read_trainers(trdata: &Archive, trpoke: &Archive, names: &[String]) -> Result<Vec<Trainer>> {
    let mut trainers = Vec::with_capacity(trdata.len());
    for index in 0..trdata.len() {
        let rec = trdata.file(index)?;
        if rec.len() < TRAINER_SIZE {
            return Err(RomDataError::malformed(
                0,
                format!("trainer {} record is {} bytes", index, rec.len()),
            ));
        }
        let count = rec[PARTY_COUNT] as usize;
        let party_file = trpoke.file(index)?;
        let party = (0..count)
            .map(|j| {
                party_file
                    .get(j * PARTY_ENTRY_SIZE..(j + 1) * PARTY_ENTRY_SIZE)
                    .ok_or_else(|| {
                        RomDataError::malformed(
                            j * PARTY_ENTRY_SIZE,
                            format!("trainer {} party is shorter than {} entries", index, count),
                        )
                    })
                    .and_then(decode_pokemon)
            })
            .collect::<Result<Vec<_>>>()?;

        let battle_type = *BATTLE_TYPES.get(rec[BATTLE_TYPE] as usize).ok_or_else(|| {
            RomDataError::malformed(
                BATTLE_TYPE,
                format!("trainer {}: battle type {}", index, rec[BATTLE_TYPE]),
            )
        })?;
        trainers.push(Trainer {
            index,
            trainer_class: rec[CLASS] as u16,
            name: names.get(index).cloned().unwrap_or_default(),
            party,
            format: PartyFormat::from_poke_type(rec[FORMAT]),
            battle_type,
            ai_level: read_u32(rec, AI)?,
        });
    }
    debug!("read {} trainers", trainers.len());
    Ok(trainers)
}

pub fn write_trainers(trdata: &mut Archive, trpoke: &mut Archive, trainers: &[Trainer]) -> Result<()> {
    if trainers.len() != trdata.len() {
        return Err(RomDataError::Precondition(format!(
            "expected {} trainers, got {}",
            trdata.len(),
            trainers.len()
        )));
    }

    for t in trainers {
        let mut rec = trdata.file(t.index)?.to_vec();
        rec[CLASS] = u8_field("trainer class", t.trainer_class)?;
        rec[BATTLE_TYPE] = BATTLE_TYPES
            .iter()
            .position(|&b| b == t.battle_type)
            .unwrap_or_default() as u8;
        rec[PARTY_COUNT] = u8_field("party size", t.party.len() as u16)?;
        rec[FORMAT] = (rec[FORMAT] & !0x03) | t.effective_format().poke_type();
        rec[AI..AI + 4].copy_from_slice(&t.ai_level.to_le_bytes());
        if rec != trdata.file(t.index)? {
            trdata.set_file(t.index, rec)?;
        }

        let old = trpoke.file(t.index)?;
        let mut party = vec![0u8; t.party.len() * PARTY_ENTRY_SIZE];
        let entries = party.chunks_exact_mut(PARTY_ENTRY_SIZE);
        for (j, (p, entry)) in t.party.iter().zip(entries).enumerate() {
            if let Some(template) = old.get(j * PARTY_ENTRY_SIZE..(j + 1) * PARTY_ENTRY_SIZE) {
                entry.copy_from_slice(template);
            }
            encode_pokemon(p, entry)?;
        }
        if party != old {
            trpoke.set_file(t.index, party)?;
        }
    }
    Ok(())
}
