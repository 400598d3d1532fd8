//! Move records: file 0 of the move archive is a "WD" mini container with one
//! 0x28-byte record per move id.

use log::debug;

use super::{type_from_byte, type_to_byte};
use crate::container::garc::Archive;
use crate::container::{mini, read_u16, read_u32};
use crate::model::{
    Move, MoveCategory, StatChange, StatChangeMoveType, StatType, StatusMoveType, StatusType,
};
use crate::{RomDataError, Result};

pub const MOVE_SIZE: usize = 0x28;
const MINI_TAG: &str = "WD";

const TYPE: usize = 0x00;
const QUALITY: usize = 0x01;
const CATEGORY: usize = 0x02;
const POWER: usize = 0x03;
const ACCURACY: usize = 0x04;
const PP: usize = 0x05;
const PRIORITY: usize = 0x06;
const INFLICT: usize = 0x08;
const INFLICT_PERCENT: usize = 0x0A;
const FLINCH: usize = 0x0F;
const EFFECT: usize = 0x10;
const RECOIL: usize = 0x12;
const TARGET: usize = 0x14;
const STATS: usize = 0x15;
const STAT_STAGES: usize = 0x18;
const STAT_CHANCES: usize = 0x1B;
const FLAGS: usize = 0x24;

const QUALITY_STATUS: u8 = 1;
const QUALITY_STAT_CHANGE: u8 = 2;
const QUALITY_DAMAGE_STATUS: u8 = 4;
const QUALITY_DAMAGE_LOWER: u8 = 6;
const QUALITY_DAMAGE_RAISE: u8 = 7;

const TARGET_USER: u8 = 7;
const INFLICT_TRAP: u16 = 8;
const FLAG_CHARGE: u32 = 1 << 1;
const FLAG_RECHARGE: u32 = 1 << 2;

const CATEGORIES: [MoveCategory; 3] = [
    MoveCategory::Status,
    MoveCategory::Physical,
    MoveCategory::Special,
];

const STAT_IDS: [StatType; 8] = [
    StatType::Attack,
    StatType::Defense,
    StatType::SpecialAttack,
    StatType::SpecialDefense,
    StatType::Speed,
    StatType::Accuracy,
    StatType::Evasion,
    StatType::All,
];

fn status_from_inflict(code: u16) -> StatusType {
    match code {
        1 => StatusType::Paralyze,
        2 => StatusType::Sleep,
        3 => StatusType::Freeze,
        4 => StatusType::Burn,
        5 => StatusType::Poison,
        6 => StatusType::Confusion,
        _ => StatusType::None,
    }
}

fn inflict_code(status: StatusType) -> Option<u16> {
    Some(match status {
        StatusType::None => 0,
        StatusType::Paralyze => 1,
        StatusType::Sleep => 2,
        StatusType::Freeze => 3,
        StatusType::Burn => 4,
        StatusType::Poison => 5,
        StatusType::Confusion => 6,
        StatusType::ToxicPoison => return None,
    })
}

pub fn decode_move(id: u16, name: String, rec: &[u8]) -> Result<Move> {
    if rec.len() < MOVE_SIZE {
        return Err(RomDataError::malformed(
            0,
            format!("move {} record is {} bytes", id, rec.len()),
        ));
    }
    let move_type = type_from_byte(rec[TYPE])
        .ok_or_else(|| RomDataError::malformed(TYPE, format!("move {}: type {}", id, rec[TYPE])))?;
    let mut m = Move::new(id, name, move_type);

    m.category = *CATEGORIES.get(rec[CATEGORY] as usize).ok_or_else(|| {
        RomDataError::malformed(CATEGORY, format!("move {}: category {}", id, rec[CATEGORY]))
    })?;
    m.power = rec[POWER];
    m.hit_ratio = rec[ACCURACY] as f64;
    m.pp = rec[PP];
    m.priority = rec[PRIORITY] as i8;
    m.effect_index = read_u16(rec, EFFECT)?;

    let inflict = read_u16(rec, INFLICT)?;
    let chance = rec[INFLICT_PERCENT] as f64;
    m.secondary_effect_chance = chance;
    m.status_type = status_from_inflict(inflict);
    m.status_move_type = match rec[QUALITY] {
        QUALITY_STATUS => StatusMoveType::NoDamage,
        QUALITY_DAMAGE_STATUS => StatusMoveType::Damage,
        _ => StatusMoveType::None,
    };
    if m.status_type != StatusType::None {
        m.status_percent_chance = if chance == 0.0 { 100.0 } else { chance };
    }
    m.is_trap_move = inflict == INFLICT_TRAP;

    m.stat_change_move_type = match rec[QUALITY] {
        QUALITY_STAT_CHANGE if rec[TARGET] == TARGET_USER => StatChangeMoveType::NoDamageUser,
        QUALITY_STAT_CHANGE => StatChangeMoveType::NoDamageTarget,
        QUALITY_DAMAGE_LOWER => StatChangeMoveType::DamageTarget,
        QUALITY_DAMAGE_RAISE => StatChangeMoveType::DamageUser,
        _ => StatChangeMoveType::None,
    };
    for i in 0..3 {
        let stat = rec[STATS + i];
        if stat == 0 {
            continue;
        }
        let stat = *STAT_IDS.get(stat as usize - 1).ok_or_else(|| {
            RomDataError::malformed(STATS + i, format!("move {}: stat id {}", id, stat))
        })?;
        m.stat_changes.push(StatChange {
            stat,
            stages: rec[STAT_STAGES + i] as i8,
            percent_chance: rec[STAT_CHANCES + i] as f64,
        });
    }

    m.flinch_percent_chance = rec[FLINCH] as f64;
    let recoil = rec[RECOIL] as i8;
    if recoil < 0 {
        m.recoil_percent = recoil.unsigned_abs();
    } else {
        m.absorb_percent = recoil as u8;
    }

    let flags = read_u32(rec, FLAGS)?;
    m.is_charge_move = flags & FLAG_CHARGE != 0;
    m.is_recharge_move = flags & FLAG_RECHARGE != 0;
    Ok(m)
}

fn percent(what: &str, value: f64) -> Result<u8> {
    if !(0.0..=255.0).contains(&value) || value.fract() != 0.0 {
        return Err(RomDataError::Precondition(format!(
            "{} {} is not a whole byte",
            what, value
        )));
    }
    Ok(value as u8)
}

/// Patches `m` into an existing record. Effect groups whose decoded value
/// already matches the model are left untouched.
pub fn encode_move(m: &Move, rec: &mut [u8]) -> Result<()> {
    let current = decode_move(m.id, String::new(), rec)?;

    rec[TYPE] = type_to_byte(m.move_type)?;
    rec[CATEGORY] = CATEGORIES
        .iter()
        .position(|&c| c == m.category)
        .unwrap_or_default() as u8;
    rec[POWER] = m.power;
    rec[ACCURACY] = percent("accuracy", m.hit_ratio)?;
    rec[PP] = m.pp;
    rec[PRIORITY] = m.priority as u8;
    rec[EFFECT..EFFECT + 2].copy_from_slice(&m.effect_index.to_le_bytes());
    rec[FLINCH] = percent("flinch chance", m.flinch_percent_chance)?;

    // Inflict codes outside the status set (trap, infatuation) survive
    // unless the status or trap flag itself is edited.
    if current.status_type != m.status_type || current.is_trap_move != m.is_trap_move {
        let code = match inflict_code(m.status_type) {
            Some(0) if m.is_trap_move => INFLICT_TRAP,
            Some(code) => code,
            None => {
                return Err(RomDataError::Precondition(format!(
                    "move {}: {:?} is not encodable",
                    m.id, m.status_type
                )))
            }
        };
        rec[INFLICT..INFLICT + 2].copy_from_slice(&code.to_le_bytes());
    }
    if current.secondary_effect_chance != m.secondary_effect_chance {
        rec[INFLICT_PERCENT] = percent("status chance", m.secondary_effect_chance)?;
    }

    if current.stat_changes != m.stat_changes {
        if m.stat_changes.len() > 3 {
            return Err(RomDataError::Precondition(format!(
                "move {} has {} stat changes",
                m.id,
                m.stat_changes.len()
            )));
        }
        for i in 0..3 {
            let (stat, stages, chance) = match m.stat_changes.get(i) {
                Some(c) => {
                    let stat = STAT_IDS.iter().position(|&s| s == c.stat).unwrap_or_default() + 1;
                    (stat as u8, c.stages as u8, percent("stat chance", c.percent_chance)?)
                }
                None => (0, 0, 0),
            };
            rec[STATS + i] = stat;
            rec[STAT_STAGES + i] = stages;
            rec[STAT_CHANCES + i] = chance;
        }
    }

    if current.recoil_percent != m.recoil_percent || current.absorb_percent != m.absorb_percent {
        let recoil = if m.absorb_percent > 0 {
            i16::from(m.absorb_percent)
        } else {
            -i16::from(m.recoil_percent)
        };
        let recoil = i8::try_from(recoil).map_err(|_| {
            RomDataError::Precondition(format!(
                "move {}: recoil/absorb {} out of range",
                m.id, recoil
            ))
        })?;
        rec[RECOIL] = recoil as u8;
    }

    let mut flags = read_u32(rec, FLAGS)?;
    flags &= !(FLAG_CHARGE | FLAG_RECHARGE);
    if m.is_charge_move {
        flags |= FLAG_CHARGE;
    }
    if m.is_recharge_move {
        flags |= FLAG_RECHARGE;
    }
    rec[FLAGS..FLAGS + 4].copy_from_slice(&flags.to_le_bytes());
    Ok(())
}

/// Moves `1..=MoveCount`; record 0 is the empty move and is not exposed.
pub fn read_moves(archive: &Archive, names: &[String], count: usize) -> Result<Vec<Move>> {
    let records = mini::unpack(archive.file(0)?, MINI_TAG)?;
    if records.len() <= count {
        return Err(RomDataError::malformed(
            2,
            format!("move container holds {} records, need {}", records.len(), count + 1),
        ));
    }
    let moves = (1..=count)
        .map(|id| {
            let name = names.get(id).cloned().unwrap_or_default();
            decode_move(id as u16, name, &records[id])
        })
        .collect::<Result<Vec<_>>>()?;
    debug!("read {} moves", moves.len());
    Ok(moves)
}

pub fn write_moves(archive: &mut Archive, moves: &[Move]) -> Result<()> {
    let mut records = mini::unpack(archive.file(0)?, MINI_TAG)?;
    for m in moves {
        let rec = records.get_mut(m.id as usize).ok_or_else(|| {
            RomDataError::Precondition(format!("move {} has no record", m.id))
        })?;
        encode_move(m, rec)?;
    }
    archive.set_file(0, mini::pack(&records, MINI_TAG))
}
