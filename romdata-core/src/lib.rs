//! ROM data access layer: per-generation codecs that decode game data tables
//! into a uniform model and write edited data back onto the ROM.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod catalog;
pub mod charmap;
pub mod checksum;
pub mod container;
pub mod fsutil;
pub mod gen2;
pub mod gen7;
pub mod image;
pub mod model;
pub mod rewriter;

#[cfg(test)]
mod testutil;

pub use catalog::{Catalog, CatalogError, Generation, RomEntry};
pub use gen2::Gen2Rom;
pub use gen7::Gen7Rom;
pub use image::RomImage;
pub use model::*;

#[derive(Debug, Error)]
pub enum RomDataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("malformed ROM data at 0x{offset:06X}: {reason}")]
    Malformed { offset: usize, reason: String },

    #[error("offset 0x{offset:06X} (+{len}) is outside the {size}-byte buffer")]
    OutOfBounds { offset: usize, len: usize, size: usize },

    #[error("no free space for {record}: needed {requested} bytes in bank 0x{bank:02X}")]
    FreeSpace {
        record: String,
        requested: usize,
        bank: usize,
    },

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl RomDataError {
    pub(crate) fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        RomDataError::Malformed {
            offset,
            reason: reason.into(),
        }
    }

    /// I/O-class failures abort the whole save; the on-disk file keeps its
    /// last successfully written state.
    pub fn is_io_class(&self) -> bool {
        matches!(self, RomDataError::Io(_) | RomDataError::FreeSpace { .. })
    }
}

pub type Result<T> = std::result::Result<T, RomDataError>;

/// Optional capabilities that differ between titles. Read paths for an
/// unsupported feature return empty data; write paths reject it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Feature {
    MoveTutors,
    TimeOfDayEncounters,
    SosEncounters,
    Abilities,
    HeldItemSlotThree,
    TrainerPokemonDetails,
    PokemonIcons,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Replaces the embedded catalog when set.
    pub catalog_path: Option<PathBuf>,
    pub atomic_save: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            catalog_path: None,
            atomic_save: true,
        }
    }
}

impl LoadOptions {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(|e| {
            RomDataError::Config(format!("{}: {}", path.display(), e))
        })
    }

    fn catalog(&self) -> Result<Catalog> {
        match &self.catalog_path {
            Some(path) => Ok(Catalog::from_file(path)?),
            None => Ok(catalog::builtin()?.clone()),
        }
    }
}

fn ensure_same_len(what: &str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(RomDataError::Precondition(format!(
            "{} count mismatch: expected {}, got {}",
            what, expected, got
        )));
    }
    Ok(())
}

/// Uniform access to one loaded ROM. One implementation per hardware
/// generation; the byte surface is owned exclusively by the implementation.
pub trait RomDataSource {
    fn entry(&self) -> &RomEntry;

    fn generation(&self) -> Generation {
        self.entry().generation
    }

    /// False when the input failed its known-base-image checksum check.
    fn is_rom_valid(&self) -> bool;

    fn supports(&self, feature: Feature) -> bool;

    fn data(&self) -> &GameData;

    fn data_mut(&mut self) -> &mut GameData;

    /// Re-derives every encoded region from the in-memory model and stamps
    /// integrity fields.
    fn write_data(&mut self) -> Result<()>;

    /// `write_data` followed by writing the output to `dest`.
    fn save(&mut self, dest: &Path) -> Result<()>;

    fn species(&self) -> &[Species] {
        &self.data().species
    }

    fn species_mut(&mut self) -> &mut [Species] {
        &mut self.data_mut().species
    }

    fn set_species(&mut self, species: Vec<Species>) -> Result<()> {
        ensure_same_len("species", self.data().species.len(), species.len())?;
        self.data_mut().species = species;
        Ok(())
    }

    fn moves(&self) -> &[Move] {
        &self.data().moves
    }

    fn set_moves(&mut self, moves: Vec<Move>) -> Result<()> {
        ensure_same_len("move", self.data().moves.len(), moves.len())?;
        self.data_mut().moves = moves;
        Ok(())
    }

    fn trainers(&self) -> &[Trainer] {
        &self.data().trainers
    }

    fn set_trainers(&mut self, trainers: Vec<Trainer>) -> Result<()> {
        ensure_same_len("trainer", self.data().trainers.len(), trainers.len())?;
        self.data_mut().trainers = trainers;
        Ok(())
    }

    fn encounters(&self) -> &[EncounterArea] {
        &self.data().encounters
    }

    /// Encounter tables are rewritten positionally, so the replacement must
    /// keep the area count and every area's slot count.
    fn set_encounters(&mut self, areas: Vec<EncounterArea>) -> Result<()> {
        let current = &self.data().encounters;
        ensure_same_len("encounter area", current.len(), areas.len())?;
        for (old, new) in current.iter().zip(&areas) {
            ensure_same_len(
                &format!("encounter slot ({})", old.display_name),
                old.encounters.len(),
                new.encounters.len(),
            )?;
        }
        self.data_mut().encounters = areas;
        Ok(())
    }

    fn shops(&self) -> &[Shop] {
        &self.data().shops
    }

    fn set_shops(&mut self, shops: Vec<Shop>) -> Result<()> {
        ensure_same_len("shop", self.data().shops.len(), shops.len())?;
        self.data_mut().shops = shops;
        Ok(())
    }

    fn trades(&self) -> &[IngameTrade] {
        &self.data().trades
    }

    fn set_trades(&mut self, trades: Vec<IngameTrade>) -> Result<()> {
        ensure_same_len("trade", self.data().trades.len(), trades.len())?;
        self.data_mut().trades = trades;
        Ok(())
    }

    fn tm_moves(&self) -> &[u16] {
        &self.data().tm_moves
    }

    fn set_tm_moves(&mut self, moves: Vec<u16>) -> Result<()> {
        ensure_same_len("TM", self.data().tm_moves.len(), moves.len())?;
        self.data_mut().tm_moves = moves;
        Ok(())
    }

    /// Empty when the title has no move tutors.
    fn tutor_moves(&self) -> &[u16] {
        &self.data().tutor_moves
    }

    fn set_tutor_moves(&mut self, moves: Vec<u16>) -> Result<()> {
        if !self.supports(Feature::MoveTutors) {
            return Err(RomDataError::Precondition(format!(
                "{} has no move tutors",
                self.entry().name
            )));
        }
        ensure_same_len("tutor move", self.data().tutor_moves.len(), moves.len())?;
        self.data_mut().tutor_moves = moves;
        Ok(())
    }

    fn strings(&self, table: StringTable) -> &[String] {
        self.data()
            .strings
            .get(&table)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn set_strings(&mut self, table: StringTable, strings: Vec<String>) -> Result<()> {
        let expected = match self.data().strings.get(&table) {
            Some(current) => current.len(),
            None => {
                return Err(RomDataError::Precondition(format!(
                    "{:?} strings are not available for {}",
                    table,
                    self.entry().name
                )))
            }
        };
        ensure_same_len(&format!("{:?} string", table), expected, strings.len())?;
        self.data_mut().strings.insert(table, strings);
        Ok(())
    }
}

/// Identifies and loads the ROM at `path`: a cartridge image file for the
/// flat-bank generation or an extracted folder for the archive generation.
/// Returns `Ok(None)` when no catalog entry matches.
pub fn open_rom(path: &Path, options: &LoadOptions) -> Result<Option<Box<dyn RomDataSource>>> {
    let catalog = options.catalog()?;

    if path.is_dir() {
        let layout = match gen7::ExtractedLayout::locate(path) {
            Some(layout) => layout,
            None => {
                log::info!("{}: no extracted RomFS layout found", path.display());
                return Ok(None);
            }
        };
        let ident = layout.identify()?;
        return match catalog.find_archive_title(&ident.product_code, ident.title_id) {
            Some(entry) => {
                let rom = Gen7Rom::load(entry.clone(), layout, options.atomic_save)?;
                Ok(Some(Box::new(rom)))
            }
            None => {
                log::info!(
                    "{}: title {:016X} is not in the catalog",
                    path.display(),
                    ident.title_id
                );
                Ok(None)
            }
        };
    }

    let bytes = fs::read(path)?;
    match catalog.find_cartridge(&bytes) {
        Some(entry) => {
            let mut rom = Gen2Rom::from_bytes(entry.clone(), bytes)?;
            rom.set_atomic_save(options.atomic_save);
            Ok(Some(Box::new(rom)))
        }
        None => {
            log::info!("{}: cartridge header not recognised", path.display());
            Ok(None)
        }
    }
}
