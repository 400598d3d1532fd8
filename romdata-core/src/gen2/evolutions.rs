//! Evolution and level-up move records. Each species has one pointer into a
//! shared bank; the record is an evolution list ending in 0 followed by
//! (level, move) pairs ending in 0.

use log::debug;

use super::byte_id;
use crate::catalog::RomEntry;
use crate::image::RomImage;
use crate::model::{mark_split_evolutions, Evolution, EvolutionType, LevelUpMove, Species};
use crate::rewriter::{self, FreeSpace};
use crate::{RomDataError, Result};

pub const EVOLVE_LEVEL: u8 = 1;
pub const EVOLVE_ITEM: u8 = 2;
pub const EVOLVE_TRADE: u8 = 3;
pub const EVOLVE_HAPPINESS: u8 = 4;
pub const EVOLVE_STAT: u8 = 5;

const TRADE_NO_ITEM: u8 = 0xFF;

const HAPPINESS_ANYTIME: u8 = 1;
const HAPPINESS_DAY: u8 = 2;
const HAPPINESS_NIGHT: u8 = 3;

const ATK_GT_DEF: u8 = 1;
const ATK_LT_DEF: u8 = 2;
const ATK_EQ_DEF: u8 = 3;

fn bad_record(offset: usize, what: &str, value: u8) -> RomDataError {
    RomDataError::malformed(offset, format!("unknown {} 0x{:02X}", what, value))
}

/// Decodes one evolution entry starting at `offset`; returns the edge and
/// the entry's byte length.
pub fn decode_evolution(image: &RomImage, offset: usize, from: u16) -> Result<(Evolution, usize)> {
    let method = image.read_byte(offset)?;
    let arg = image.read_byte(offset + 1)?;
    let mut evo = Evolution {
        from,
        to: 0,
        method: EvolutionType::Level,
        extra_info: 0,
        level: 0,
        to_form: None,
        carry_stats: true,
    };

    let len = match method {
        EVOLVE_LEVEL => {
            evo.extra_info = arg as u16;
            evo.level = arg;
            3
        }
        EVOLVE_ITEM => {
            evo.method = EvolutionType::Stone;
            evo.extra_info = arg as u16;
            3
        }
        EVOLVE_TRADE => {
            if arg == TRADE_NO_ITEM {
                evo.method = EvolutionType::Trade;
            } else {
                evo.method = EvolutionType::TradeItem;
                evo.extra_info = arg as u16;
            }
            3
        }
        EVOLVE_HAPPINESS => {
            evo.method = match arg {
                HAPPINESS_ANYTIME => EvolutionType::Happiness,
                HAPPINESS_DAY => EvolutionType::HappinessDay,
                HAPPINESS_NIGHT => EvolutionType::HappinessNight,
                other => return Err(bad_record(offset + 1, "happiness condition", other)),
            };
            3
        }
        EVOLVE_STAT => {
            let cond = image.read_byte(offset + 2)?;
            evo.method = match cond {
                ATK_GT_DEF => EvolutionType::LevelAttackHigher,
                ATK_LT_DEF => EvolutionType::LevelDefenseHigher,
                ATK_EQ_DEF => EvolutionType::LevelAtkDefSame,
                other => return Err(bad_record(offset + 2, "stat condition", other)),
            };
            evo.extra_info = arg as u16;
            evo.level = arg;
            4
        }
        other => return Err(bad_record(offset, "evolution method", other)),
    };

    evo.to = image.read_byte(offset + len - 1)? as u16;
    Ok((evo, len))
}

pub fn encode_evolution(evo: &Evolution) -> Result<Vec<u8>> {
    let to = byte_id("evolution target", evo.to)?;
    let arg = byte_id("evolution parameter", evo.extra_info)?;
    Ok(match evo.method {
        EvolutionType::Level => vec![EVOLVE_LEVEL, arg, to],
        EvolutionType::Stone => vec![EVOLVE_ITEM, arg, to],
        EvolutionType::Trade => vec![EVOLVE_TRADE, TRADE_NO_ITEM, to],
        EvolutionType::TradeItem => vec![EVOLVE_TRADE, arg, to],
        EvolutionType::Happiness => vec![EVOLVE_HAPPINESS, HAPPINESS_ANYTIME, to],
        EvolutionType::HappinessDay => vec![EVOLVE_HAPPINESS, HAPPINESS_DAY, to],
        EvolutionType::HappinessNight => vec![EVOLVE_HAPPINESS, HAPPINESS_NIGHT, to],
        EvolutionType::LevelAttackHigher => vec![EVOLVE_STAT, arg, ATK_GT_DEF, to],
        EvolutionType::LevelDefenseHigher => vec![EVOLVE_STAT, arg, ATK_LT_DEF, to],
        EvolutionType::LevelAtkDefSame => vec![EVOLVE_STAT, arg, ATK_EQ_DEF, to],
        other => {
            return Err(RomDataError::Precondition(format!(
                "evolution method {:?} has no flat-bank encoding",
                other
            )))
        }
    })
}

/// Parses one species record; returns the edges, the learnset and the
/// record's total byte length.
fn parse_record(
    image: &RomImage,
    offset: usize,
    from: u16,
) -> Result<(Vec<Evolution>, Vec<LevelUpMove>, usize)> {
    let mut pos = offset;
    let mut evolutions = Vec::new();
    while image.read_byte(pos)? != 0 {
        let (evo, len) = decode_evolution(image, pos, from)?;
        evolutions.push(evo);
        pos += len;
    }
    pos += 1;

    let mut learnset = Vec::new();
    loop {
        let level = image.read_byte(pos)?;
        if level == 0 {
            pos += 1;
            break;
        }
        let move_id = image.read_byte(pos + 1)? as u16;
        learnset.push(LevelUpMove { level, move_id });
        pos += 2;
    }
    Ok((evolutions, learnset, pos - offset))
}

fn encode_record(species: &Species) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for evo in &species.evolutions {
        out.extend(encode_evolution(evo)?);
    }
    out.push(0);
    for m in &species.learnset {
        if m.level == 0 {
            return Err(RomDataError::Precondition(format!(
                "species {} has a level 0 learnset entry",
                species.id
            )));
        }
        out.push(m.level);
        out.push(byte_id("learnset move", m.move_id)?);
    }
    out.push(0);
    Ok(out)
}

pub fn read_evolutions_and_learnsets(
    image: &RomImage,
    entry: &RomEntry,
    species: &mut [Species],
) -> Result<()> {
    let table = entry.int("PokemonMovesetsTableOffset")?;
    for (i, s) in species.iter_mut().enumerate() {
        let record = image.read_pointer(table + i * 2)?;
        let (mut evolutions, learnset, _) = parse_record(image, record, s.id)?;
        mark_split_evolutions(&mut evolutions);
        s.evolutions = evolutions;
        s.learnset = learnset;
    }
    debug!("read evolutions and learnsets for {} species", species.len());
    Ok(())
}

pub fn write_evolutions_and_learnsets(
    image: &mut RomImage,
    free_space: &mut FreeSpace,
    entry: &RomEntry,
    species: &[Species],
) -> Result<()> {
    let table = entry.int("PokemonMovesetsTableOffset")?;
    for (i, s) in species.iter().enumerate() {
        let bytes = encode_record(s)?;
        rewriter::rewrite(
            image,
            free_space,
            table + i * 2,
            &bytes,
            |b: &Vec<u8>| b.clone(),
            |img: &RomImage, at: usize| parse_record(img, at, s.id).map(|(_, _, len)| len),
            &format!("moveset of species {}", s.id),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{gen2_entry, gen2_rom_bytes, GEN2_MOVESETS};

    fn loaded() -> (RomImage, RomEntry, Vec<Species>) {
        let image = RomImage::new(gen2_rom_bytes());
        let entry = gen2_entry();
        let mut species = crate::gen2::pokemon::read_species(&image, &entry).unwrap();
        read_evolutions_and_learnsets(&image, &entry, &mut species).unwrap();
        (image, entry, species)
    }

    #[test]
    fn every_method_code_round_trips() {
        let records: [&[u8]; 10] = [
            &[EVOLVE_LEVEL, 16, 2],
            &[EVOLVE_ITEM, 0x18, 3],
            &[EVOLVE_TRADE, 0xFF, 4],
            &[EVOLVE_TRADE, 0x8F, 5],
            &[EVOLVE_HAPPINESS, 1, 6],
            &[EVOLVE_HAPPINESS, 2, 7],
            &[EVOLVE_HAPPINESS, 3, 8],
            &[EVOLVE_STAT, 20, 1, 9],
            &[EVOLVE_STAT, 20, 2, 10],
            &[EVOLVE_STAT, 20, 3, 11],
        ];
        for rec in records {
            let image = RomImage::new(rec.to_vec());
            let (evo, len) = decode_evolution(&image, 0, 1).unwrap();
            assert_eq!(len, rec.len());
            assert_eq!(encode_evolution(&evo).unwrap(), rec);
        }
    }

    #[test]
    fn methods_specialise() {
        let image = RomImage::new(vec![EVOLVE_TRADE, 0x8F, 5, EVOLVE_HAPPINESS, 3, 6]);
        let (trade, _) = decode_evolution(&image, 0, 1).unwrap();
        assert_eq!(trade.method, EvolutionType::TradeItem);
        assert_eq!(trade.extra_info, 0x8F);
        let (night, _) = decode_evolution(&image, 3, 1).unwrap();
        assert_eq!(night.method, EvolutionType::HappinessNight);
    }

    #[test]
    fn unknown_codes_are_malformed() {
        let image = RomImage::new(vec![9, 1, 2, EVOLVE_HAPPINESS, 7, 2]);
        assert!(matches!(
            decode_evolution(&image, 0, 1),
            Err(RomDataError::Malformed { offset: 0, .. })
        ));
        assert!(matches!(
            decode_evolution(&image, 3, 1),
            Err(RomDataError::Malformed { offset: 4, .. })
        ));
    }

    #[test]
    fn decodes_records_and_split_evolutions() {
        let (_, _, species) = loaded();
        assert_eq!(species[0].evolutions.len(), 1);
        assert_eq!(species[0].evolutions[0].to, 2);
        assert!(species[0].evolutions[0].carry_stats);
        assert_eq!(
            species[0].learnset,
            vec![
                LevelUpMove { level: 1, move_id: 1 },
                LevelUpMove { level: 4, move_id: 2 }
            ]
        );
        assert!(species[1].evolutions.is_empty());
        assert_eq!(species[2].evolutions.len(), 2);
        assert!(species[2].evolutions.iter().all(|e| !e.carry_stats));
        assert_eq!(species[3].evolutions[0].method, EvolutionType::LevelAttackHigher);
        assert_eq!(species[3].evolutions[1].method, EvolutionType::Stone);
    }

    #[test]
    fn unchanged_records_are_rewritten_in_place() {
        let (mut image, entry, species) = loaded();
        let before = image.as_bytes().to_vec();
        let mut free = FreeSpace::new(0);
        write_evolutions_and_learnsets(&mut image, &mut free, &entry, &species).unwrap();
        assert_eq!(image.as_bytes(), &before[..]);
        assert!(free.claimed().is_empty());
    }

    #[test]
    fn grown_learnset_moves_and_shrunk_one_stays() {
        let (mut image, entry, mut species) = loaded();
        species[1].learnset.push(LevelUpMove { level: 30, move_id: 4 });
        species[3].evolutions.pop();
        let mut free = FreeSpace::new(0);
        write_evolutions_and_learnsets(&mut image, &mut free, &entry, &species).unwrap();

        let table = entry.int("PokemonMovesetsTableOffset").unwrap();
        assert_ne!(image.read_pointer(table + 2).unwrap(), GEN2_MOVESETS[1]);
        assert_eq!(image.read_pointer(table + 6).unwrap(), GEN2_MOVESETS[3]);

        let mut reread = crate::gen2::pokemon::read_species(&image, &entry).unwrap();
        read_evolutions_and_learnsets(&image, &entry, &mut reread).unwrap();
        assert_eq!(reread[1].learnset.len(), 2);
        assert_eq!(reread[3].evolutions.len(), 1);
        assert!(reread[3].evolutions[0].carry_stats);
        assert_eq!(reread[0], species[0]);
    }
}
