//! Trainer parties. One pointer per trainer class; each class record is the
//! class's trainers back to back, every trainer being a terminated name, a
//! party-format byte and party entries closed by 0xFF.

use log::debug;

use super::byte_id;
use crate::catalog::RomEntry;
use crate::image::RomImage;
use crate::model::{BattleType, PartyFormat, Trainer, TrainerPokemon};
use crate::charmap;
use crate::rewriter::{self, FreeSpace};
use crate::{RomDataError, Result};

const PARTY_END: u8 = 0xFF;

struct Layout {
    table: usize,
    class_counts: Vec<usize>,
}

impl Layout {
    fn from_entry(entry: &RomEntry) -> Result<Self> {
        let classes = entry.int("TrainerClassAmount")?;
        let class_counts = entry.array("TrainerDataClassCounts")?;
        if class_counts.len() < classes {
            return Err(RomDataError::Config(format!(
                "{}: TrainerDataClassCounts lists {} classes, expected {}",
                entry.name,
                class_counts.len(),
                classes
            )));
        }
        Ok(Layout {
            table: entry.int("TrainerDataTableOffset")?,
            class_counts: class_counts[..classes].to_vec(),
        })
    }
}

fn entry_size(format: PartyFormat) -> usize {
    2 + format.held_items as usize + if format.custom_moves { 4 } else { 0 }
}

/// Decodes one trainer at `offset`; returns it with its byte length.
fn decode_trainer(
    image: &RomImage,
    offset: usize,
    index: usize,
    trainer_class: u16,
) -> Result<(Trainer, usize)> {
    let name = image.read_variable_length_string(offset)?;
    let mut pos = offset + image.variable_length_string_size(offset)?;
    let format = PartyFormat::from_poke_type(image.read_byte(pos)?);
    pos += 1;

    let mut party = Vec::new();
    loop {
        let level = image.read_byte(pos)?;
        if level == PARTY_END {
            pos += 1;
            break;
        }
        let rec = image.slice(pos, entry_size(format))?;
        let mut p = TrainerPokemon::new(rec[1] as u16, level as u16);
        let mut at = 2;
        if format.held_items {
            p.held_item = rec[at] as u16;
            at += 1;
        }
        if format.custom_moves {
            for (slot, &m) in p.moves.iter_mut().zip(&rec[at..at + 4]) {
                *slot = m as u16;
            }
        }
        party.push(p);
        pos += rec.len();
    }

    let trainer = Trainer {
        index,
        trainer_class,
        name,
        party,
        format,
        battle_type: BattleType::Single,
        ai_level: 0,
    };
    Ok((trainer, pos - offset))
}

pub fn encode_trainer(trainer: &Trainer) -> Result<Vec<u8>> {
    let format = trainer.effective_format();
    let mut out = charmap::encode(&trainer.name);
    out.push(charmap::TERMINATOR);
    out.push(format.poke_type());
    for p in &trainer.party {
        let level = byte_id("trainer pokemon level", p.level)?;
        if level == PARTY_END {
            return Err(RomDataError::Precondition(format!(
                "trainer {} has a level {} pokemon",
                trainer.index, level
            )));
        }
        out.push(level);
        out.push(byte_id("trainer pokemon species", p.species)?);
        if format.held_items {
            out.push(byte_id("held item", p.held_item)?);
        }
        if format.custom_moves {
            for &m in &p.moves {
                out.push(byte_id("trainer pokemon move", m)?);
            }
        }
    }
    out.push(PARTY_END);
    Ok(out)
}

fn measure_class(image: &RomImage, offset: usize, count: usize) -> Result<usize> {
    let mut pos = offset;
    for _ in 0..count {
        let (_, len) = decode_trainer(image, pos, 0, 0)?;
        pos += len;
    }
    Ok(pos - offset)
}

pub fn read_trainers(image: &RomImage, entry: &RomEntry) -> Result<Vec<Trainer>> {
    let layout = Layout::from_entry(entry)?;
    let mut trainers = Vec::new();
    for (class, &count) in layout.class_counts.iter().enumerate() {
        let mut pos = image.read_pointer(layout.table + class * 2)?;
        for _ in 0..count {
            let (trainer, len) = decode_trainer(image, pos, trainers.len(), (class + 1) as u16)?;
            trainers.push(trainer);
            pos += len;
        }
    }
    debug!("read {} trainers", trainers.len());
    Ok(trainers)
}

/// Rewrites every class record. Trainers must be in load order; a class
/// whose record no longer fits is moved into free space in its bank.
pub fn write_trainers(
    image: &mut RomImage,
    free_space: &mut FreeSpace,
    entry: &RomEntry,
    trainers: &[Trainer],
) -> Result<()> {
    let layout = Layout::from_entry(entry)?;
    let total: usize = layout.class_counts.iter().sum();
    if trainers.len() != total {
        return Err(RomDataError::Precondition(format!(
            "expected {} trainers, got {}",
            total,
            trainers.len()
        )));
    }

    let mut rest = trainers;
    for (class, &count) in layout.class_counts.iter().enumerate() {
        let (members, tail) = rest.split_at(count);
        rest = tail;
        if count == 0 {
            continue;
        }

        let mut bytes = Vec::new();
        for t in members {
            bytes.extend(encode_trainer(t)?);
        }
        rewriter::rewrite(
            image,
            free_space,
            layout.table + class * 2,
            &bytes,
            |b: &Vec<u8>| b.clone(),
            |img: &RomImage, at: usize| measure_class(img, at, count),
            &format!("trainer class {}", class + 1),
        )?;
    }
    Ok(())
}

pub fn read_class_names(image: &RomImage, entry: &RomEntry) -> Result<(Vec<String>, usize)> {
    let offset = entry.int("TrainerClassNamesOffset")?;
    let count = entry.int("TrainerClassAmount")?;
    image.read_string_list(offset, count)
}

pub fn write_class_names(
    image: &mut RomImage,
    entry: &RomEntry,
    names: &[String],
    footprint: usize,
) -> Result<()> {
    let offset = entry.int("TrainerClassNamesOffset")?;
    let count = entry.int("TrainerClassAmount")?;
    if names.len() != count {
        return Err(RomDataError::Precondition(format!(
            "expected {} trainer class names, got {}",
            count,
            names.len()
        )));
    }
    image.write_string_list(offset, names, footprint, "trainer class names")
}
