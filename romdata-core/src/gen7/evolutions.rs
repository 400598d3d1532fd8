//! Evolution files (eight 8-byte slots per species file) and learnset files
//! ((move, level) u16 pairs closed by 0xFFFFFFFF).

use log::debug;

use crate::container::garc::Archive;
use crate::container::read_u16;
use crate::model::{mark_split_evolutions, Evolution, EvolutionType, LevelUpMove, Species};
use crate::{RomDataError, Result};

const SLOTS: usize = 8;
const SLOT_SIZE: usize = 8;
const EVOLUTION_FILE_SIZE: usize = SLOTS * SLOT_SIZE;
const ANY_FORM: u8 = 0xFF;
const LEARNSET_END: [u8; 4] = [0xFF; 4];

/// Method codes 1..=42 in order.
const METHODS: [EvolutionType; 42] = [
    EvolutionType::Happiness,
    EvolutionType::HappinessDay,
    EvolutionType::HappinessNight,
    EvolutionType::Level,
    EvolutionType::Trade,
    EvolutionType::TradeItem,
    EvolutionType::TradeSpecial,
    EvolutionType::Stone,
    EvolutionType::LevelAttackHigher,
    EvolutionType::LevelAtkDefSame,
    EvolutionType::LevelDefenseHigher,
    EvolutionType::LevelLowPv,
    EvolutionType::LevelHighPv,
    EvolutionType::LevelCreateExtra,
    EvolutionType::LevelIsExtra,
    EvolutionType::LevelHighBeauty,
    EvolutionType::StoneMaleOnly,
    EvolutionType::StoneFemaleOnly,
    EvolutionType::LevelItemDay,
    EvolutionType::LevelItemNight,
    EvolutionType::LevelWithMove,
    EvolutionType::LevelWithOther,
    EvolutionType::LevelMaleOnly,
    EvolutionType::LevelFemaleOnly,
    EvolutionType::LevelElectrifiedArea,
    EvolutionType::LevelMossRock,
    EvolutionType::LevelIcyRock,
    EvolutionType::LevelUpsideDown,
    EvolutionType::FairyAffection,
    EvolutionType::LevelWithDark,
    EvolutionType::LevelRain,
    EvolutionType::LevelDay,
    EvolutionType::LevelNight,
    EvolutionType::LevelFemaleEspurr,
    EvolutionType::Unused,
    EvolutionType::LevelGame,
    EvolutionType::LevelDayGame,
    EvolutionType::LevelNightGame,
    EvolutionType::LevelSnowy,
    EvolutionType::LevelDusk,
    EvolutionType::LevelNightUltra,
    EvolutionType::StoneUltra,
];

pub fn method_from_code(code: u16) -> Option<EvolutionType> {
    (code as usize)
        .checked_sub(1)
        .and_then(|i| METHODS.get(i))
        .copied()
}

pub fn method_code(method: EvolutionType) -> u16 {
    METHODS.iter().position(|&m| m == method).map_or(0, |i| i as u16 + 1)
}

pub fn decode_evolutions(data: &[u8], from: u16) -> Result<Vec<Evolution>> {
    let mut evolutions = Vec::new();
    for slot in data.chunks_exact(SLOT_SIZE).take(SLOTS) {
        let code = read_u16(slot, 0)?;
        if code == 0 {
            continue;
        }
        let method = method_from_code(code).ok_or_else(|| {
            RomDataError::malformed(0, format!("species {}: evolution method {}", from, code))
        })?;
        evolutions.push(Evolution {
            from,
            to: read_u16(slot, 4)?,
            method,
            extra_info: read_u16(slot, 2)?,
            level: slot[7],
            to_form: (slot[6] != ANY_FORM).then_some(slot[6]),
            carry_stats: true,
        });
    }
    mark_split_evolutions(&mut evolutions);
    Ok(evolutions)
}

/// Patches `evolutions` into `original`. Occupied slots are reused in order,
/// so an edge keeps its slot even when empty slots precede it; new edges take
/// the first free slots and leftover occupied slots are cleared.
pub fn encode_evolutions(original: &[u8], evolutions: &[Evolution]) -> Result<Vec<u8>> {
    if evolutions.len() > SLOTS {
        return Err(RomDataError::Precondition(format!(
            "{} evolutions do not fit {} slots",
            evolutions.len(),
            SLOTS
        )));
    }
    let mut out = original.to_vec();
    if out.len() < EVOLUTION_FILE_SIZE {
        out.resize(EVOLUTION_FILE_SIZE, 0);
    }
    let (used, free): (Vec<usize>, Vec<usize>) =
        (0..SLOTS).partition(|&i| out[i * SLOT_SIZE] != 0 || out[i * SLOT_SIZE + 1] != 0);

    for (n, &i) in used.iter().chain(&free).enumerate() {
        let slot = &mut out[i * SLOT_SIZE..(i + 1) * SLOT_SIZE];
        match evolutions.get(n) {
            Some(evo) => {
                slot[0..2].copy_from_slice(&method_code(evo.method).to_le_bytes());
                slot[2..4].copy_from_slice(&evo.extra_info.to_le_bytes());
                slot[4..6].copy_from_slice(&evo.to.to_le_bytes());
                slot[6] = evo.to_form.unwrap_or(ANY_FORM);
                slot[7] = evo.level;
            }
            None if n < used.len() => slot.fill(0),
            None => {}
        }
    }
    Ok(out)
}

pub fn decode_learnset(data: &[u8], species: u16) -> Result<Vec<LevelUpMove>> {
    let mut learnset = Vec::new();
    for (i, pair) in data.chunks_exact(4).enumerate() {
        if pair == LEARNSET_END {
            return Ok(learnset);
        }
        let level = read_u16(pair, 2)?;
        let level = u8::try_from(level).map_err(|_| {
            RomDataError::malformed(i * 4 + 2, format!("species {}: level {}", species, level))
        })?;
        learnset.push(LevelUpMove {
            level,
            move_id: read_u16(pair, 0)?,
        });
    }
    Err(RomDataError::malformed(
        data.len(),
        format!("species {}: learnset has no terminator", species),
    ))
}

pub fn encode_learnset(learnset: &[LevelUpMove]) -> Vec<u8> {
    let mut out = Vec::with_capacity(learnset.len() * 4 + 4);
    for m in learnset {
        out.extend_from_slice(&m.move_id.to_le_bytes());
        out.extend_from_slice(&(m.level as u16).to_le_bytes());
    }
    out.extend_from_slice(&LEARNSET_END);
    out
}

pub fn read_evolutions_and_learnsets(
    evolutions: &Archive,
    learnsets: &Archive,
    species: &mut [Species],
) -> Result<()> {
    for s in species.iter_mut() {
        let index = s.id as usize;
        s.evolutions = decode_evolutions(evolutions.file(index)?, s.id)?;
        s.learnset = decode_learnset(learnsets.file(index)?, s.id)?;
    }
    debug!("read evolutions and learnsets for {} species", species.len());
    Ok(())
}

/// Re-encodes every species' files. A file whose encoding is unchanged keeps
/// its original bytes, including anything past the terminator.
pub fn write_evolutions_and_learnsets(
    evolutions: &mut Archive,
    learnsets: &mut Archive,
    species: &[Species],
) -> Result<()> {
    for s in species {
        let index = s.id as usize;

        let current = evolutions.file(index)?;
        if decode_evolutions(current, s.id)? != s.evolutions {
            let encoded = encode_evolutions(current, &s.evolutions)?;
            evolutions.set_file(index, encoded)?;
        }

        if decode_learnset(learnsets.file(index)?, s.id)? != s.learnset {
            learnsets.set_file(index, encode_learnset(&s.learnset))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evo(method: EvolutionType, extra_info: u16, level: u8, to_form: Option<u8>) -> Evolution {
        Evolution {
            from: 1,
            to: 2,
            method,
            extra_info,
            level,
            to_form,
            carry_stats: true,
        }
    }

    #[test]
    fn all_method_codes_round_trip() {
        for code in 1..=42u16 {
            let method = method_from_code(code).unwrap();
            assert_eq!(method_code(method), code);

            let evos = vec![evo(method, code * 3, 17, Some(1))];
            let bytes = encode_evolutions(&[], &evos).unwrap();
            assert_eq!(u16::from_le_bytes([bytes[0], bytes[1]]), code);
            assert_eq!(decode_evolutions(&bytes, 1).unwrap(), evos);
        }
        assert_eq!(method_from_code(0), None);
        assert_eq!(method_from_code(43), None);
    }

    #[test]
    fn split_evolutions_and_any_form() {
        let evos = vec![
            evo(EvolutionType::Stone, 80, 0, None),
            evo(EvolutionType::LevelDay, 0, 20, Some(0)),
        ];
        let bytes = encode_evolutions(&[], &evos).unwrap();
        assert_eq!(bytes.len(), EVOLUTION_FILE_SIZE);
        assert_eq!(bytes[6], ANY_FORM);

        let decoded = decode_evolutions(&bytes, 1).unwrap();
        assert_eq!(decoded[0].to_form, None);
        assert_eq!(decoded[1].to_form, Some(0));
        assert!(decoded.iter().all(|e| !e.carry_stats));
    }

    #[test]
    fn unknown_method_is_malformed() {
        let mut bytes = vec![0u8; EVOLUTION_FILE_SIZE];
        bytes[0] = 60;
        assert!(matches!(
            decode_evolutions(&bytes, 1),
            Err(RomDataError::Malformed { .. })
        ));
        let too_many = vec![evo(EvolutionType::Level, 0, 5, None); 9];
        assert!(encode_evolutions(&[], &too_many).is_err());
    }

    #[test]
    fn edges_keep_their_slots() {
        let mut file = vec![0u8; EVOLUTION_FILE_SIZE];
        file[SLOT_SIZE * 2..SLOT_SIZE * 3].copy_from_slice(&[8, 0, 80, 0, 2, 0, 0xFF, 0]);
        file[SLOT_SIZE * 5..SLOT_SIZE * 6].copy_from_slice(&[4, 0, 0, 0, 3, 0, 0xFF, 30]);

        let mut evos = decode_evolutions(&file, 1).unwrap();
        assert_eq!(encode_evolutions(&file, &evos).unwrap(), file);

        evos[1].level = 32;
        evos.push(evo(EvolutionType::Trade, 0, 0, None));
        let bytes = encode_evolutions(&file, &evos).unwrap();
        assert_eq!(bytes[SLOT_SIZE * 5 + 7], 32);
        assert_eq!(read_u16(&bytes, 0).unwrap(), method_code(EvolutionType::Trade));
        assert_eq!(&bytes[SLOT_SIZE * 2..SLOT_SIZE * 3], &file[SLOT_SIZE * 2..SLOT_SIZE * 3]);

        let bytes = encode_evolutions(&file, &evos[..1]).unwrap();
        assert!(bytes[SLOT_SIZE * 5..SLOT_SIZE * 6].iter().all(|&b| b == 0));
        assert_eq!(decode_evolutions(&bytes, 1).unwrap().len(), 1);
    }

    #[test]
    fn learnset_terminator() {
        let learnset = vec![
            LevelUpMove { level: 1, move_id: 33 },
            LevelUpMove { level: 1, move_id: 45 },
            LevelUpMove { level: 100, move_id: 719 },
        ];
        let bytes = encode_learnset(&learnset);
        assert_eq!(&bytes[bytes.len() - 4..], &LEARNSET_END);
        assert_eq!(decode_learnset(&bytes, 1).unwrap(), learnset);
        assert!(decode_learnset(&bytes[..bytes.len() - 4], 1).is_err());
        assert!(decode_learnset(&[1, 0, 0, 1, 0xFF, 0xFF, 0xFF, 0xFF], 1).is_err());
    }
}
