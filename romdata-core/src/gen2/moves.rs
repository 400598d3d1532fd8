use log::debug;

use super::{byte_id, is_special_type_byte, type_from_byte, type_to_byte};
use crate::catalog::RomEntry;
use crate::image::RomImage;
use crate::model::{
    Move, MoveCategory, StatChange, StatChangeMoveType, StatType, StatusMoveType, StatusType,
};
use crate::{RomDataError, Result};

pub const MOVE_SIZE: usize = 7;

pub const EFFECT_NORMAL_HIT: u8 = 0x00;
pub const EFFECT_LEECH_HIT: u8 = 0x03;
pub const EFFECT_DREAM_EATER: u8 = 0x08;
pub const EFFECT_BIDE: u8 = 0x1A;
pub const EFFECT_FORCE_SWITCH: u8 = 0x1C;
pub const EFFECT_FLINCH_HIT: u8 = 0x1F;
pub const EFFECT_RAZOR_WIND: u8 = 0x27;
pub const EFFECT_SUPER_FANG: u8 = 0x28;
pub const EFFECT_STATIC_DAMAGE: u8 = 0x29;
pub const EFFECT_TRAP_TARGET: u8 = 0x2A;
pub const EFFECT_RECOIL_HIT: u8 = 0x30;
pub const EFFECT_PARALYZE: u8 = 0x43;
pub const EFFECT_SKY_ATTACK: u8 = 0x4B;
pub const EFFECT_HYPER_BEAM: u8 = 0x50;
pub const EFFECT_LEVEL_DAMAGE: u8 = 0x57;
pub const EFFECT_PSYWAVE: u8 = 0x58;
pub const EFFECT_COUNTER: u8 = 0x59;
pub const EFFECT_SNORE: u8 = 0x5C;
pub const EFFECT_PRIORITY_HIT: u8 = 0x67;
pub const EFFECT_PROTECT: u8 = 0x6E;
pub const EFFECT_ENDURE: u8 = 0x73;
pub const EFFECT_SWAGGER: u8 = 0x75;
pub const EFFECT_FAKE_OUT: u8 = 0x8C;
pub const EFFECT_MIRROR_COAT: u8 = 0x8F;
pub const EFFECT_SKULL_BASH: u8 = 0x90;
pub const EFFECT_TWISTER: u8 = 0x91;
pub const EFFECT_STOMP: u8 = 0x95;
pub const EFFECT_SOLARBEAM: u8 = 0x96;
pub const EFFECT_FLY: u8 = 0x9A;
pub const EFFECT_DEFENSE_CURL: u8 = 0x9B;

/// Everything an effect index implies about a move.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EffectInfo {
    /// Power 0 on disk but the move still deals damage.
    pub damaging_without_power: bool,
    /// Relative to an ordinary move.
    pub priority: i8,
    pub stat_change: Option<(StatType, i8)>,
    pub stat_change_move_type: StatChangeMoveType,
    pub status: StatusType,
    pub status_move_type: StatusMoveType,
    pub flinch: bool,
    pub recoil_percent: u8,
    pub absorb_percent: u8,
    pub trap: bool,
    pub charge: bool,
    pub recharge: bool,
}

const PLAIN: EffectInfo = EffectInfo {
    damaging_without_power: false,
    priority: 0,
    stat_change: None,
    stat_change_move_type: StatChangeMoveType::None,
    status: StatusType::None,
    status_move_type: StatusMoveType::None,
    flinch: false,
    recoil_percent: 0,
    absorb_percent: 0,
    trap: false,
    charge: false,
    recharge: false,
};

const STAT_ORDER: [StatType; 7] = [
    StatType::Attack,
    StatType::Defense,
    StatType::Speed,
    StatType::SpecialAttack,
    StatType::SpecialDefense,
    StatType::Accuracy,
    StatType::Evasion,
];

fn stat(kind: StatChangeMoveType, stat: StatType, stages: i8) -> EffectInfo {
    EffectInfo {
        stat_change: Some((stat, stages)),
        stat_change_move_type: kind,
        ..PLAIN
    }
}

fn status(kind: StatusMoveType, status: StatusType) -> EffectInfo {
    EffectInfo {
        status,
        status_move_type: kind,
        ..PLAIN
    }
}

/// Lookup table from the engine's effect index to move behaviour.
pub fn effect_info(effect: u8) -> EffectInfo {
    use crate::model::StatChangeMoveType as S;
    use crate::model::StatusMoveType as M;

    match effect {
        0x01 => status(M::NoDamage, StatusType::Sleep),
        0x02 => status(M::Damage, StatusType::Poison),
        EFFECT_LEECH_HIT | EFFECT_DREAM_EATER => EffectInfo {
            absorb_percent: 50,
            ..PLAIN
        },
        0x04 => status(M::Damage, StatusType::Burn),
        0x05 => status(M::Damage, StatusType::Freeze),
        0x06 => status(M::Damage, StatusType::Paralyze),
        0x0A..=0x10 => stat(S::NoDamageUser, STAT_ORDER[(effect - 0x0A) as usize], 1),
        0x12..=0x18 => stat(S::NoDamageTarget, STAT_ORDER[(effect - 0x12) as usize], -1),
        EFFECT_BIDE | EFFECT_SUPER_FANG | EFFECT_STATIC_DAMAGE | EFFECT_LEVEL_DAMAGE
        | EFFECT_PSYWAVE => EffectInfo {
            damaging_without_power: true,
            ..PLAIN
        },
        EFFECT_FORCE_SWITCH => EffectInfo {
            priority: -1,
            ..PLAIN
        },
        EFFECT_FLINCH_HIT | EFFECT_SNORE | EFFECT_FAKE_OUT | EFFECT_TWISTER | EFFECT_STOMP => {
            EffectInfo {
                flinch: true,
                ..PLAIN
            }
        }
        0x21 => status(M::NoDamage, StatusType::ToxicPoison),
        EFFECT_RAZOR_WIND | EFFECT_SKY_ATTACK | EFFECT_SKULL_BASH | EFFECT_SOLARBEAM
        | EFFECT_FLY => EffectInfo {
            charge: true,
            ..PLAIN
        },
        EFFECT_TRAP_TARGET => EffectInfo {
            trap: true,
            ..PLAIN
        },
        EFFECT_RECOIL_HIT => EffectInfo {
            recoil_percent: 25,
            ..PLAIN
        },
        0x31 => status(M::NoDamage, StatusType::Confusion),
        0x32..=0x38 => stat(S::NoDamageUser, STAT_ORDER[(effect - 0x32) as usize], 2),
        0x3A..=0x40 => stat(S::NoDamageTarget, STAT_ORDER[(effect - 0x3A) as usize], -2),
        0x42 => status(M::NoDamage, StatusType::Poison),
        EFFECT_PARALYZE => status(M::NoDamage, StatusType::Paralyze),
        0x44..=0x4A => stat(S::DamageTarget, STAT_ORDER[(effect - 0x44) as usize], -1),
        0x4C => status(M::Damage, StatusType::Confusion),
        0x4D => status(M::Damage, StatusType::Poison),
        EFFECT_HYPER_BEAM => EffectInfo {
            recharge: true,
            ..PLAIN
        },
        EFFECT_COUNTER | EFFECT_MIRROR_COAT => EffectInfo {
            damaging_without_power: true,
            priority: -1,
            ..PLAIN
        },
        EFFECT_PRIORITY_HIT => EffectInfo {
            priority: 1,
            ..PLAIN
        },
        0x6C | 0x7C => status(M::Damage, StatusType::Burn),
        EFFECT_PROTECT | EFFECT_ENDURE => EffectInfo {
            priority: 2,
            ..PLAIN
        },
        EFFECT_SWAGGER => EffectInfo {
            status: StatusType::Confusion,
            status_move_type: M::NoDamage,
            ..stat(S::NoDamageTarget, StatType::Attack, 2)
        },
        0x89 => stat(S::DamageUser, StatType::Defense, 1),
        0x8A => stat(S::DamageUser, StatType::Attack, 1),
        0x8B => stat(S::DamageUser, StatType::All, 1),
        0x97 => status(M::Damage, StatusType::Paralyze),
        EFFECT_DEFENSE_CURL => stat(S::NoDamageUser, StatType::Defense, 1),
        _ => PLAIN,
    }
}

fn byte_to_percent(value: u8) -> f64 {
    value as f64 / 255.0 * 100.0
}

fn percent_to_byte(value: f64) -> u8 {
    (value * 255.0 / 100.0).round().clamp(0.0, 255.0) as u8
}

/// Decodes one 7-byte record: animation, effect, power, type, accuracy, PP,
/// effect chance.
pub fn decode_move(id: u16, name: String, rec: &[u8], offset: usize) -> Result<Move> {
    let move_type = type_from_byte(rec[3]).ok_or_else(|| {
        RomDataError::malformed(offset + 3, format!("unknown move type 0x{:02X}", rec[3]))
    })?;
    let mut m = Move::new(id, name, move_type);
    let info = effect_info(rec[1]);

    m.effect_index = rec[1] as u16;
    m.power = rec[2];
    m.hit_ratio = byte_to_percent(rec[4]);
    m.pp = rec[5];
    m.secondary_effect_chance = byte_to_percent(rec[6]);
    // a zero chance byte means the effect always applies
    let chance = if rec[6] == 0 {
        100.0
    } else {
        m.secondary_effect_chance
    };

    m.category = if m.power == 0 && !info.damaging_without_power {
        MoveCategory::Status
    } else if is_special_type_byte(rec[3]) {
        MoveCategory::Special
    } else {
        MoveCategory::Physical
    };
    m.priority = info.priority;

    if let Some((stat, stages)) = info.stat_change {
        let percent_chance = match info.stat_change_move_type {
            StatChangeMoveType::NoDamageTarget | StatChangeMoveType::NoDamageUser => 100.0,
            _ => chance,
        };
        m.stat_changes.push(StatChange {
            stat,
            stages,
            percent_chance,
        });
    }
    m.stat_change_move_type = info.stat_change_move_type;

    m.status_type = info.status;
    m.status_move_type = info.status_move_type;
    if info.status != StatusType::None {
        m.status_percent_chance = chance;
    }
    if info.flinch {
        m.flinch_percent_chance = chance;
    }
    m.recoil_percent = info.recoil_percent;
    m.absorb_percent = info.absorb_percent;
    m.is_trap_move = info.trap;
    m.is_charge_move = info.charge;
    m.is_recharge_move = info.recharge;
    Ok(m)
}

/// Writes the stored fields of `m` over bytes 1..7 of its record. The
/// derived fields are never written; the effect index is authoritative.
pub fn encode_move(m: &Move, rec: &mut [u8]) -> Result<()> {
    rec[1] = byte_id("effect index", m.effect_index)?;
    rec[2] = m.power;
    rec[3] = type_to_byte(m.move_type)?;
    rec[4] = percent_to_byte(m.hit_ratio);
    rec[5] = m.pp;
    rec[6] = percent_to_byte(m.secondary_effect_chance);
    Ok(())
}

/// Returns the moves and the byte footprint of the move name list.
pub fn read_moves(image: &RomImage, entry: &RomEntry) -> Result<(Vec<Move>, usize)> {
    let count = entry.int("MoveCount")?;
    let table = entry.int("MoveDataOffset")?;
    let (names, footprint) = image.read_string_list(entry.int("MoveNamesOffset")?, count)?;

    let mut moves = Vec::with_capacity(count);
    for (i, name) in names.into_iter().enumerate() {
        let offset = table + i * MOVE_SIZE;
        let rec = image.slice(offset, MOVE_SIZE)?;
        moves.push(decode_move((i + 1) as u16, name, rec, offset)?);
    }
    debug!("read {} moves", moves.len());
    Ok((moves, footprint))
}

pub fn write_moves(
    image: &mut RomImage,
    entry: &RomEntry,
    moves: &[Move],
    names_footprint: usize,
) -> Result<()> {
    let table = entry.int("MoveDataOffset")?;
    for (i, m) in moves.iter().enumerate() {
        let offset = table + i * MOVE_SIZE;
        let mut rec = image.slice(offset, MOVE_SIZE)?.to_vec();
        encode_move(m, &mut rec)?;
        image.write_bytes(offset, &rec)?;
    }

    let names: Vec<String> = moves.iter().map(|m| m.name.clone()).collect();
    image.write_string_list(
        entry.int("MoveNamesOffset")?,
        &names,
        names_footprint,
        "move names",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Type;
    use crate::testutil::{gen2_entry, gen2_rom_bytes};

    #[test]
    fn paralyze_without_damage_always_applies() {
        let rec = [0x56, EFFECT_PARALYZE, 0, 0x17, 0xFF, 20, 0x00];
        let m = decode_move(86, "THUNDER WAVE".to_string(), &rec, 0).unwrap();
        assert_eq!(m.status_type, StatusType::Paralyze);
        assert_eq!(m.status_move_type, StatusMoveType::NoDamage);
        assert_eq!(m.status_percent_chance, 100.0);
        assert_eq!(m.secondary_effect_chance, 0.0);
        assert_eq!(m.category, MoveCategory::Status);
        assert_eq!(m.hit_ratio, 100.0);
    }

    #[test]
    fn category_follows_power_type_and_exceptions() {
        let decode = |effect: u8, power: u8, ty: u8| {
            decode_move(1, String::new(), &[1, effect, power, ty, 0xFF, 10, 0], 0)
                .unwrap()
                .category
        };
        assert_eq!(decode(EFFECT_NORMAL_HIT, 40, 0x00), MoveCategory::Physical);
        assert_eq!(decode(EFFECT_NORMAL_HIT, 40, 0x14), MoveCategory::Special);
        assert_eq!(decode(EFFECT_NORMAL_HIT, 0, 0x14), MoveCategory::Status);
        assert_eq!(decode(EFFECT_COUNTER, 0, 0x01), MoveCategory::Physical);
        assert_eq!(decode(EFFECT_MIRROR_COAT, 0, 0x18), MoveCategory::Special);
        assert_eq!(decode(EFFECT_PSYWAVE, 0, 0x18), MoveCategory::Special);
        assert_eq!(decode(EFFECT_SUPER_FANG, 0, 0x00), MoveCategory::Physical);
    }

    #[test]
    fn table_drives_priority_and_flags() {
        assert_eq!(effect_info(EFFECT_PRIORITY_HIT).priority, 1);
        assert_eq!(effect_info(EFFECT_PROTECT).priority, 2);
        assert_eq!(effect_info(EFFECT_COUNTER).priority, -1);
        assert_eq!(effect_info(EFFECT_FORCE_SWITCH).priority, -1);
        assert_eq!(effect_info(EFFECT_NORMAL_HIT), PLAIN);
        assert!(effect_info(EFFECT_HYPER_BEAM).recharge);
        assert!(effect_info(EFFECT_SOLARBEAM).charge);
        assert!(effect_info(EFFECT_TRAP_TARGET).trap);
        assert_eq!(effect_info(EFFECT_RECOIL_HIT).recoil_percent, 25);
        assert_eq!(
            effect_info(0x3B).stat_change,
            Some((StatType::Defense, -2))
        );
        assert_eq!(
            effect_info(0x8B).stat_change_move_type,
            StatChangeMoveType::DamageUser
        );
    }

    #[test]
    fn hit_effects_use_the_chance_byte() {
        let rec = [0x34, 0x04, 40, 0x14, 0xFF, 25, 0x19];
        let m = decode_move(52, "EMBER".to_string(), &rec, 0).unwrap();
        assert_eq!(m.move_type, Type::Fire);
        assert_eq!(m.status_type, StatusType::Burn);
        assert!((m.status_percent_chance - 9.8).abs() < 0.1);

        let rec = [0x1D, 0x45, 65, 0x00, 0xFF, 20, 0x4C];
        let m = decode_move(1, String::new(), &rec, 0).unwrap();
        assert_eq!(m.stat_changes.len(), 1);
        assert!((m.stat_changes[0].percent_chance - 29.8).abs() < 0.1);
    }

    #[test]
    fn every_accuracy_and_chance_byte_round_trips() {
        for b in 0u8..=255 {
            let rec = [1, 0x44, 60, 0x00, b, 10, b];
            let m = decode_move(1, String::new(), &rec, 0).unwrap();
            let mut out = rec;
            out[1..].fill(0);
            encode_move(&m, &mut out).unwrap();
            assert_eq!(out, rec);
        }
    }

    #[test]
    fn table_round_trips_and_renames_in_place() {
        let mut image = RomImage::new(gen2_rom_bytes());
        let entry = gen2_entry();
        let before = image.as_bytes().to_vec();
        let (mut moves, footprint) = read_moves(&image, &entry).unwrap();
        assert_eq!(moves[2].name, "THUNDER WAVE");
        write_moves(&mut image, &entry, &moves, footprint).unwrap();
        assert_eq!(image.as_bytes(), &before[..]);

        moves[0].name = "SLAP".to_string();
        moves[0].power = 45;
        write_moves(&mut image, &entry, &moves, footprint).unwrap();
        let (reread, _) = read_moves(&image, &entry).unwrap();
        assert_eq!(reread[0].name, "SLAP");
        assert_eq!(reread[0].power, 45);
        assert_eq!(reread[3], moves[3]);

        moves[1].name = "A MUCH LONGER MOVE NAME".to_string();
        assert!(write_moves(&mut image, &entry, &moves, footprint).is_err());
    }
}
