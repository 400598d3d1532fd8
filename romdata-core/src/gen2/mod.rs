//! Flat-bank cartridge handler (Gold, Silver, Crystal).

use std::path::Path;

use log::{debug, info};

use crate::catalog::RomEntry;
use crate::checksum;
use crate::fsutil;
use crate::image::RomImage;
use crate::model::{ExpCurve, GameData, StringTable, Type};
use crate::rewriter::FreeSpace;
use crate::{Feature, RomDataError, RomDataSource, Result};

pub mod encounters;
pub mod evolutions;
pub mod items;
pub mod moves;
pub mod pokemon;
pub mod shops;
pub mod trades;
pub mod trainers;

pub(crate) fn type_from_byte(value: u8) -> Option<Type> {
    Some(match value {
        0x00 => Type::Normal,
        0x01 => Type::Fighting,
        0x02 => Type::Flying,
        0x03 => Type::Poison,
        0x04 => Type::Ground,
        0x05 => Type::Rock,
        0x06 => Type::Bird,
        0x07 => Type::Bug,
        0x08 => Type::Ghost,
        0x09 => Type::Steel,
        0x13 => Type::Curse,
        0x14 => Type::Fire,
        0x15 => Type::Water,
        0x16 => Type::Grass,
        0x17 => Type::Electric,
        0x18 => Type::Psychic,
        0x19 => Type::Ice,
        0x1A => Type::Dragon,
        0x1B => Type::Dark,
        _ => return None,
    })
}

pub(crate) fn type_to_byte(t: Type) -> Result<u8> {
    Ok(match t {
        Type::Normal => 0x00,
        Type::Fighting => 0x01,
        Type::Flying => 0x02,
        Type::Poison => 0x03,
        Type::Ground => 0x04,
        Type::Rock => 0x05,
        Type::Bird => 0x06,
        Type::Bug => 0x07,
        Type::Ghost => 0x08,
        Type::Steel => 0x09,
        Type::Curse => 0x13,
        Type::Fire => 0x14,
        Type::Water => 0x15,
        Type::Grass => 0x16,
        Type::Electric => 0x17,
        Type::Psychic => 0x18,
        Type::Ice => 0x19,
        Type::Dragon => 0x1A,
        Type::Dark => 0x1B,
        Type::Fairy => {
            return Err(RomDataError::Precondition(
                "the Fairy type has no flat-bank encoding".to_string(),
            ))
        }
    })
}

/// Special-type moves are the ones whose type byte is at or above Fire.
pub(crate) fn is_special_type_byte(value: u8) -> bool {
    value >= 0x14
}

pub(crate) fn growth_from_byte(value: u8) -> Option<ExpCurve> {
    Some(match value {
        0 => ExpCurve::MediumFast,
        1 => ExpCurve::SlightlyFast,
        2 => ExpCurve::SlightlySlow,
        3 => ExpCurve::MediumSlow,
        4 => ExpCurve::Fast,
        5 => ExpCurve::Slow,
        _ => return None,
    })
}

pub(crate) fn growth_to_byte(curve: ExpCurve) -> Result<u8> {
    match curve {
        ExpCurve::MediumFast => Ok(0),
        ExpCurve::SlightlyFast => Ok(1),
        ExpCurve::SlightlySlow => Ok(2),
        ExpCurve::MediumSlow => Ok(3),
        ExpCurve::Fast => Ok(4),
        ExpCurve::Slow => Ok(5),
        other => Err(RomDataError::Precondition(format!(
            "growth curve {:?} has no flat-bank encoding",
            other
        ))),
    }
}

/// Narrows a model id to the single byte the flat-bank tables store.
pub(crate) fn byte_id(what: &str, value: u16) -> Result<u8> {
    u8::try_from(value).map_err(|_| {
        RomDataError::Precondition(format!("{} {} does not fit in one byte", what, value))
    })
}

/// Byte footprints of the in-place string lists, measured at load.
#[derive(Clone, Debug, Default)]
struct StringFootprints {
    move_names: usize,
    item_names: usize,
    trainer_class_names: usize,
}

pub struct Gen2Rom {
    entry: RomEntry,
    image: RomImage,
    free_space: FreeSpace,
    data: GameData,
    footprints: StringFootprints,
    atomic_save: bool,
}

impl Gen2Rom {
    /// Decodes every supported table of a catalogued cartridge image.
    pub fn from_bytes(entry: RomEntry, bytes: Vec<u8>) -> Result<Self> {
        let image = RomImage::new(bytes);
        let fill = entry.int_or("FreeSpaceFill", 0)? as u8;

        let mut species = pokemon::read_species(&image, &entry)?;
        evolutions::read_evolutions_and_learnsets(&image, &entry, &mut species)?;
        let (moves, move_names_len) = moves::read_moves(&image, &entry)?;
        let trainers = trainers::read_trainers(&image, &entry)?;
        let map_names = encounters::read_map_names(&image, &entry)?;
        let encounters = encounters::read_encounters(&image, &entry, &map_names)?;
        let shops = shops::read_shops(&image, &entry)?;
        let trades = trades::read_trades(&image, &entry)?;
        let tm_moves = items::read_tm_moves(&image, &entry)?;
        let tutor_moves = items::read_tutor_moves(&image, &entry)?;
        let (item_names, item_names_len) = items::read_item_names(&image, &entry)?;
        let (class_names, class_names_len) = trainers::read_class_names(&image, &entry)?;

        let mut data = GameData {
            species,
            moves,
            trainers,
            encounters,
            shops,
            trades,
            tm_moves,
            tutor_moves,
            ..GameData::default()
        };
        data.strings.insert(StringTable::Items, item_names);
        data.strings.insert(StringTable::TrainerClasses, class_names);
        data.strings
            .insert(StringTable::Locations, map_names.landmarks().to_vec());

        info!(
            "loaded {}: {} species, {} moves, {} trainers, {} encounter areas",
            entry.name,
            data.species.len(),
            data.moves.len(),
            data.trainers.len(),
            data.encounters.len()
        );

        Ok(Gen2Rom {
            entry,
            image,
            free_space: FreeSpace::new(fill),
            data,
            footprints: StringFootprints {
                move_names: move_names_len,
                item_names: item_names_len,
                trainer_class_names: class_names_len,
            },
            atomic_save: true,
        })
    }

    pub fn set_atomic_save(&mut self, atomic: bool) {
        self.atomic_save = atomic;
    }

    pub fn image(&self) -> &RomImage {
        &self.image
    }

    pub fn free_space(&self) -> &FreeSpace {
        &self.free_space
    }

    fn strings_or_empty(&self, table: StringTable) -> &[String] {
        self.data
            .strings
            .get(&table)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl RomDataSource for Gen2Rom {
    fn entry(&self) -> &RomEntry {
        &self.entry
    }

    /// Cartridges carry no known-base-image check.
    fn is_rom_valid(&self) -> bool {
        true
    }

    fn supports(&self, feature: Feature) -> bool {
        match feature {
            Feature::MoveTutors => self.entry.has("MoveTutorCount"),
            Feature::TimeOfDayEncounters => true,
            Feature::SosEncounters
            | Feature::Abilities
            | Feature::HeldItemSlotThree
            | Feature::TrainerPokemonDetails
            | Feature::PokemonIcons => false,
        }
    }

    fn data(&self) -> &GameData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut GameData {
        &mut self.data
    }

    fn write_data(&mut self) -> Result<()> {
        let entry = &self.entry;
        let image = &mut self.image;
        let free = &mut self.free_space;
        let data = &self.data;

        pokemon::write_species(image, entry, &data.species)?;
        evolutions::write_evolutions_and_learnsets(image, free, entry, &data.species)?;
        moves::write_moves(image, entry, &data.moves, self.footprints.move_names)?;
        trainers::write_trainers(image, free, entry, &data.trainers)?;
        encounters::write_encounters(image, entry, &data.encounters)?;
        shops::write_shops(image, free, entry, &data.shops)?;
        trades::write_trades(image, entry, &data.trades)?;
        items::write_tm_moves(image, entry, &data.tm_moves)?;
        items::write_tutor_moves(image, entry, &data.tutor_moves)?;

        let item_names = self.strings_or_empty(StringTable::Items).to_vec();
        let class_names = self.strings_or_empty(StringTable::TrainerClasses).to_vec();
        let landmarks = self.strings_or_empty(StringTable::Locations).to_vec();
        items::write_item_names(
            &mut self.image,
            &self.entry,
            &item_names,
            self.footprints.item_names,
        )?;
        trainers::write_class_names(
            &mut self.image,
            &self.entry,
            &class_names,
            self.footprints.trainer_class_names,
        )?;
        encounters::write_landmark_names(
            &mut self.image,
            &mut self.free_space,
            &self.entry,
            &landmarks,
        )?;

        checksum::finalize_cartridge(&mut self.image)?;
        debug!(
            "{}: {} relocated records",
            self.entry.name,
            self.free_space.claimed().len()
        );
        Ok(())
    }

    fn save(&mut self, dest: &Path) -> Result<()> {
        self.write_data()?;
        fsutil::write_file(dest, self.image.as_bytes(), self.atomic_save)?;
        info!("saved {} to {}", self.entry.name, dest.display());
        Ok(())
    }
}
