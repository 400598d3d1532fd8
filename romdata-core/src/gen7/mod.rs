//! Archive-based handler (Sun, Moon, Ultra Sun, Ultra Moon). Works on an
//! extracted title: a RomFS folder of GARC archives, the exheader and the
//! decompressed executable.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::catalog::RomEntry;
use crate::checksum;
use crate::container::garc::Archive;
use crate::container::{lz11, pic};
use crate::fsutil;
use crate::model::{GameData, StringTable, Type};
use crate::{Feature, RomDataError, RomDataSource, Result};

pub mod code;
pub mod encounters;
pub mod evolutions;
pub mod moves;
pub mod pokemon;
pub mod shops;
pub mod text;
pub mod trades;
pub mod trainers;

const TYPES: [Type; 18] = [
    Type::Normal,
    Type::Fighting,
    Type::Flying,
    Type::Poison,
    Type::Ground,
    Type::Rock,
    Type::Bug,
    Type::Ghost,
    Type::Steel,
    Type::Fire,
    Type::Water,
    Type::Grass,
    Type::Electric,
    Type::Psychic,
    Type::Ice,
    Type::Dragon,
    Type::Dark,
    Type::Fairy,
];

pub(crate) fn type_from_byte(value: u8) -> Option<Type> {
    TYPES.get(value as usize).copied()
}

pub(crate) fn type_to_byte(t: Type) -> Result<u8> {
    TYPES
        .iter()
        .position(|&known| known == t)
        .map(|i| i as u8)
        .ok_or_else(|| {
            RomDataError::Precondition(format!("type {:?} has no archive-title encoding", t))
        })
}

pub(crate) fn u8_field(what: &str, value: u16) -> Result<u8> {
    u8::try_from(value).map_err(|_| {
        RomDataError::Precondition(format!("{} {} does not fit in one byte", what, value))
    })
}

const EXHEADER_TITLE_ID: usize = 0x200;
const NCCH_PRODUCT_CODE: usize = 0x150;
const PRODUCT_CODE_LEN: usize = 0x10;
const ICON_PALETTE_SIZE: usize = 0x20;

pub struct TitleIdent {
    pub product_code: Option<String>,
    pub title_id: u64,
}

/// File locations of one extracted title.
#[derive(Clone, Debug)]
pub struct ExtractedLayout {
    pub root: PathBuf,
    pub romfs: PathBuf,
    pub exheader: PathBuf,
    pub code: Option<PathBuf>,
    pub ncch_header: Option<PathBuf>,
}

impl ExtractedLayout {
    /// Finds `romfs/` and `exheader.bin` directly below `root`, plus the
    /// optional executable (`code.bin`) and NCCH header one level deeper.
    pub fn locate(root: &Path) -> Option<Self> {
        let mut romfs = None;
        let mut exheader = None;
        let mut code = None;
        let mut ncch_header = None;

        for entry in WalkDir::new(root)
            .max_depth(2)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let slot = match (entry.file_type().is_dir(), entry.file_name().to_str()) {
                (true, Some("romfs")) => &mut romfs,
                (false, Some("exheader.bin")) => &mut exheader,
                (false, Some("code.bin")) => &mut code,
                (false, Some("ncch_header.bin")) => &mut ncch_header,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(entry.into_path());
            }
        }

        Some(ExtractedLayout {
            root: root.to_path_buf(),
            romfs: romfs?,
            exheader: exheader?,
            code,
            ncch_header,
        })
    }

    pub fn identify(&self) -> Result<TitleIdent> {
        let exheader = fs::read(&self.exheader)?;
        let id = exheader
            .get(EXHEADER_TITLE_ID..EXHEADER_TITLE_ID + 8)
            .ok_or_else(|| RomDataError::malformed(EXHEADER_TITLE_ID, "exheader is truncated"))?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(id);

        let product_code = match &self.ncch_header {
            Some(path) => {
                let header = fs::read(path)?;
                header
                    .get(NCCH_PRODUCT_CODE..NCCH_PRODUCT_CODE + PRODUCT_CODE_LEN)
                    .map(|b| {
                        String::from_utf8_lossy(b)
                            .trim_end_matches('\0')
                            .to_string()
                    })
                    .filter(|code| !code.is_empty())
            }
            None => None,
        };
        Ok(TitleIdent {
            product_code,
            title_id: u64::from_le_bytes(raw),
        })
    }
}

/// Reads one catalogued archive and checks it against its `<Key>Crc32`
/// entry when the catalog has one. Returns the parsed archive and the bytes
/// it was read from.
fn read_checked(
    romfs: &Path,
    entry: &RomEntry,
    key: &str,
    valid: &mut bool,
) -> Result<(Archive, Vec<u8>)> {
    let path = romfs.join(entry.string(key)?);
    let bytes = fs::read(&path)?;
    *valid &= crc_matches(entry, key, &bytes)?;
    let archive = Archive::from_bytes(&bytes).map_err(|e| match e {
        RomDataError::Malformed { offset, reason } => RomDataError::Malformed {
            offset,
            reason: format!("{}: {}", path.display(), reason),
        },
        other => other,
    })?;
    Ok((archive, bytes))
}

fn crc_matches(entry: &RomEntry, key: &str, bytes: &[u8]) -> Result<bool> {
    let expected = match entry.opt_u64(&format!("{}Crc32", key))? {
        Some(crc) => crc as u32,
        None => return Ok(true),
    };
    let found = checksum::crc32(bytes);
    if found != expected {
        warn!(
            "{}: {} CRC32 is {:08X}, expected {:08X}",
            entry.name, key, found, expected
        );
    }
    Ok(found == expected)
}

struct Archives {
    personal: Archive,
    evolutions: Archive,
    learnsets: Archive,
    moves: Archive,
    text: Archive,
    wild: Archive,
    trainer_data: Archive,
    trainer_pokemon: Archive,
    trades: Archive,
    /// Input bytes by catalog key.
    raw: BTreeMap<&'static str, Vec<u8>>,
}

impl Archives {
    fn load(romfs: &Path, entry: &RomEntry, valid: &mut bool) -> Result<Self> {
        let mut raw = BTreeMap::new();
        let mut read = |key: &'static str| -> Result<Archive> {
            let (archive, bytes) = read_checked(romfs, entry, key, valid)?;
            raw.insert(key, bytes);
            Ok(archive)
        };
        let personal = read("PersonalGarc")?;
        let evolutions = read("EvolutionsGarc")?;
        let learnsets = read("LearnsetsGarc")?;
        let moves = read("MoveDataGarc")?;
        let text = read("TextStringsGarc")?;
        let wild = read("WildPokemonGarc")?;
        let trainer_data = read("TrainerDataGarc")?;
        let trainer_pokemon = read("TrainerPokemonGarc")?;
        let trades = read("InGameTradesGarc")?;
        Ok(Archives {
            personal,
            evolutions,
            learnsets,
            moves,
            text,
            wild,
            trainer_data,
            trainer_pokemon,
            trades,
            raw,
        })
    }

    /// The input bytes while `archive` still parses to the same contents,
    /// a fresh serialisation otherwise.
    fn serialize(&self, key: &str, archive: &Archive) -> Result<Vec<u8>> {
        if let Some(raw) = self.raw.get(key) {
            if Archive::from_bytes(raw)? == *archive {
                return Ok(raw.clone());
            }
        }
        Ok(archive.to_bytes())
    }

    fn by_key(&self) -> [(&'static str, &Archive); 9] {
        [
            ("PersonalGarc", &self.personal),
            ("EvolutionsGarc", &self.evolutions),
            ("LearnsetsGarc", &self.learnsets),
            ("MoveDataGarc", &self.moves),
            ("TextStringsGarc", &self.text),
            ("WildPokemonGarc", &self.wild),
            ("TrainerDataGarc", &self.trainer_data),
            ("TrainerPokemonGarc", &self.trainer_pokemon),
            ("InGameTradesGarc", &self.trades),
        ]
    }
}

/// Text files the handler reads, by catalog key.
const TEXT_KEYS: [&str; 8] = [
    "PokemonNamesTextIndex",
    "MoveNamesTextIndex",
    "ItemNamesTextIndex",
    "AbilityNamesTextIndex",
    "TrainerNamesTextIndex",
    "TrainerClassNamesTextIndex",
    "MapNamesTextIndex",
    "TradeStringsTextIndex",
];

/// A decoded menu icon: one palette index per pixel plus the RGBA palette.
#[derive(Clone, Debug, PartialEq)]
pub struct Icon {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
    pub palette: Vec<[u8; 4]>,
}

impl Icon {
    pub fn to_rgba(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|&p| self.palette.get(p as usize).copied().unwrap_or([0; 4]))
            .collect()
    }
}

pub struct Gen7Rom {
    entry: RomEntry,
    layout: ExtractedLayout,
    archives: Archives,
    code: Option<Vec<u8>>,
    shop_cro: Option<Vec<u8>>,
    /// Text lines as last read from or written to the text archive.
    text: BTreeMap<usize, Vec<String>>,
    data: GameData,
    valid: bool,
    atomic_save: bool,
    saved: Vec<(PathBuf, u32)>,
}

impl Gen7Rom {
    pub fn load(entry: RomEntry, layout: ExtractedLayout, atomic_save: bool) -> Result<Self> {
        let mut valid = true;
        let archives = Archives::load(&layout.romfs, &entry, &mut valid)?;

        let code = match &layout.code {
            Some(path) => {
                let bytes = fs::read(path)?;
                valid &= crc_matches(&entry, "Code", &bytes)?;
                Some(bytes)
            }
            None => None,
        };
        let shop_cro = match entry.opt_string("ShopCro")? {
            Some(name) if layout.romfs.join(name).is_file() => {
                Some(fs::read(layout.romfs.join(name))?)
            }
            _ => None,
        };

        let mut text_files = BTreeMap::new();
        for key in TEXT_KEYS {
            let index = entry.int(key)?;
            text_files.insert(index, text::decode_file(archives.text.file(index)?)?);
        }

        let mut rom = Gen7Rom {
            entry,
            layout,
            archives,
            code,
            shop_cro,
            text: text_files,
            data: GameData::default(),
            valid,
            atomic_save,
            saved: Vec::new(),
        };
        rom.data = rom.decode()?;

        info!(
            "loaded {}: {} species, {} moves, {} trainers, {} encounter areas{}",
            rom.entry.name,
            rom.data.species.len(),
            rom.data.moves.len(),
            rom.data.trainers.len(),
            rom.data.encounters.len(),
            if rom.valid { "" } else { " (unrecognised base image)" }
        );
        Ok(rom)
    }

    fn lines(&self, key: &str) -> Result<&[String]> {
        let index = self.entry.int(key)?;
        Ok(self.text.get(&index).map(Vec::as_slice).unwrap_or(&[]))
    }

    fn decode(&self) -> Result<GameData> {
        let entry = &self.entry;
        let a = &self.archives;

        let species_names = self.lines("PokemonNamesTextIndex")?;
        let mut species = pokemon::read_species(&a.personal, species_names, entry)?;
        evolutions::read_evolutions_and_learnsets(&a.evolutions, &a.learnsets, &mut species)?;
        let move_names = self.lines("MoveNamesTextIndex")?;
        let moves = moves::read_moves(&a.moves, move_names, entry.int("MoveCount")?)?;
        let trainers = trainers::read_trainers(
            &a.trainer_data,
            &a.trainer_pokemon,
            self.lines("TrainerNamesTextIndex")?,
        )?;
        let encounters = encounters::read_encounters(
            &a.wild,
            self.lines("MapNamesTextIndex")?,
            entry.flag("TimeOfDayEncounters"),
        )?;
        let shops = match &self.shop_cro {
            Some(cro) => shops::read_shops(cro, entry)?,
            None => Vec::new(),
        };
        let trades = trades::read_trades(&a.trades, self.lines("TradeStringsTextIndex")?)?;
        let (tm_moves, tutor_moves) = match &self.code {
            Some(code) => (
                code::read_move_table(code, entry, "TMMovesOffset", "TMCount")?,
                code::read_move_table(code, entry, "TutorMovesOffset", "TutorMoveCount")?,
            ),
            None => (Vec::new(), Vec::new()),
        };

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
        for (table, key) in [
            (StringTable::Items, "ItemNamesTextIndex"),
            (StringTable::Abilities, "AbilityNamesTextIndex"),
            (StringTable::TrainerClasses, "TrainerClassNamesTextIndex"),
            (StringTable::TrainerNames, "TrainerNamesTextIndex"),
            (StringTable::Locations, "MapNamesTextIndex"),
        ] {
            data.strings.insert(table, self.lines(key)?.to_vec());
        }
        Ok(data)
    }

    /// Text lines implied by the current model, keyed by text file index.
    fn pending_text(&mut self) -> Result<Vec<(usize, Vec<String>)>> {
        let mut pending = Vec::new();

        let mut names = self.lines("PokemonNamesTextIndex")?.to_vec();
        for s in self.data.species.iter().filter(|s| s.base_species.is_none()) {
            if let Some(line) = names.get_mut(s.id as usize) {
                line.clone_from(&s.name);
            }
        }
        pending.push((self.entry.int("PokemonNamesTextIndex")?, names));

        let mut names = self.lines("MoveNamesTextIndex")?.to_vec();
        for m in &self.data.moves {
            if let Some(line) = names.get_mut(m.id as usize) {
                line.clone_from(&m.name);
            }
        }
        pending.push((self.entry.int("MoveNamesTextIndex")?, names));

        let mut names = self
            .data
            .strings
            .get(&StringTable::TrainerNames)
            .cloned()
            .unwrap_or_default();
        for t in &self.data.trainers {
            if let Some(line) = names.get_mut(t.index) {
                line.clone_from(&t.name);
            }
        }
        self.data.strings.insert(StringTable::TrainerNames, names.clone());
        pending.push((self.entry.int("TrainerNamesTextIndex")?, names));

        for (table, key) in [
            (StringTable::Items, "ItemNamesTextIndex"),
            (StringTable::Abilities, "AbilityNamesTextIndex"),
            (StringTable::TrainerClasses, "TrainerClassNamesTextIndex"),
            (StringTable::Locations, "MapNamesTextIndex"),
        ] {
            if let Some(lines) = self.data.strings.get(&table) {
                pending.push((self.entry.int(key)?, lines.clone()));
            }
        }

        let trade_strings = self.lines("TradeStringsTextIndex")?.to_vec();
        let trade_lines =
            trades::write_trades(&mut self.archives.trades, &trade_strings, &self.data.trades)?;
        pending.push((self.entry.int("TradeStringsTextIndex")?, trade_lines));
        Ok(pending)
    }

    /// Decodes a species' menu icon. `None` when the title has no icon
    /// archive or no icon file for `species`.
    pub fn pokemon_icon(&self, species: u16) -> Result<Option<Icon>> {
        let path = match self.entry.opt_string("PokemonIconsGarc")? {
            Some(rel) => self.layout.romfs.join(rel),
            None => return Ok(None),
        };
        let archive = crate::container::garc::read_archive(&path)?;
        let data = match archive.get_file(species as usize) {
            Some(data) if data.len() > ICON_PALETTE_SIZE => data,
            _ => return Ok(None),
        };
        let (palette, sprite) = data.split_at(ICON_PALETTE_SIZE);
        if !lz11::is_compressed(sprite) {
            return Err(RomDataError::malformed(
                ICON_PALETTE_SIZE,
                format!("icon {} is not LZ11-compressed", species),
            ));
        }
        let width = self.entry.int("IconWidth")?;
        let height = self.entry.int("IconHeight")?;
        Ok(Some(Icon {
            width,
            height,
            pixels: pic::decompress(sprite, width, height)?,
            palette: pic::decode_palette(palette),
        }))
    }

    pub fn layout(&self) -> &ExtractedLayout {
        &self.layout
    }

    /// Output path and CRC32 of every file written by the last save.
    pub fn saved_files(&self) -> &[(PathBuf, u32)] {
        &self.saved
    }

    pub fn set_atomic_save(&mut self, atomic: bool) {
        self.atomic_save = atomic;
    }

    fn write_output(&mut self, dest: &Path, bytes: &[u8]) -> Result<()> {
        fsutil::write_file(dest, bytes, self.atomic_save)?;
        self.saved.push((dest.to_path_buf(), checksum::crc32(bytes)));
        Ok(())
    }
}

impl RomDataSource for Gen7Rom {
    fn entry(&self) -> &RomEntry {
        &self.entry
    }

    fn is_rom_valid(&self) -> bool {
        self.valid
    }

    fn supports(&self, feature: Feature) -> bool {
        match feature {
            Feature::MoveTutors => self.entry.has("TutorMoveCount") && self.code.is_some(),
            Feature::TimeOfDayEncounters => self.entry.flag("TimeOfDayEncounters"),
            Feature::PokemonIcons => self.entry.has("PokemonIconsGarc"),
            Feature::SosEncounters
            | Feature::Abilities
            | Feature::HeldItemSlotThree
            | Feature::TrainerPokemonDetails => true,
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
        let a = &mut self.archives;
        let data = &self.data;

        pokemon::write_species(&mut a.personal, &data.species)?;
        evolutions::write_evolutions_and_learnsets(
            &mut a.evolutions,
            &mut a.learnsets,
            &data.species,
        )?;
        moves::write_moves(&mut a.moves, &data.moves)?;
        encounters::write_encounters(&mut a.wild, &data.encounters)?;
        trainers::write_trainers(&mut a.trainer_data, &mut a.trainer_pokemon, &data.trainers)?;

        match &mut self.shop_cro {
            Some(cro) => shops::write_shops(cro, entry, &data.shops)?,
            None if data.shops.is_empty() => {}
            None => {
                return Err(RomDataError::Precondition(format!(
                    "{} has no shop module to write",
                    entry.name
                )))
            }
        }
        match &mut self.code {
            Some(code) => {
                code::write_move_table(code, entry, "TMMovesOffset", "TMCount", &data.tm_moves)?;
                code::write_move_table(
                    code,
                    entry,
                    "TutorMovesOffset",
                    "TutorMoveCount",
                    &data.tutor_moves,
                )?;
            }
            None if data.tm_moves.is_empty() && data.tutor_moves.is_empty() => {}
            None => {
                return Err(RomDataError::Precondition(format!(
                    "{} has no executable to patch",
                    entry.name
                )))
            }
        }

        let mut rewritten = 0;
        for (index, lines) in self.pending_text()? {
            if self.text.get(&index) != Some(&lines) {
                self.archives.text.set_file(index, text::encode_file(&lines))?;
                self.text.insert(index, lines);
                rewritten += 1;
            }
        }
        debug!("{}: {} text files rewritten", self.entry.name, rewritten);
        Ok(())
    }

    /// Writes every managed file under `dest` in the same layout as the
    /// input: `romfs/<archive path>`, `exefs/code.bin` and the headers.
    fn save(&mut self, dest: &Path) -> Result<()> {
        self.write_data()?;
        self.saved.clear();

        let romfs = dest.join("romfs");
        let mut outputs = Vec::new();
        for (key, archive) in self.archives.by_key() {
            let bytes = self.archives.serialize(key, archive)?;
            outputs.push((romfs.join(self.entry.string(key)?), bytes));
        }
        if let (Some(cro), Some(name)) = (&self.shop_cro, self.entry.opt_string("ShopCro")?) {
            outputs.push((romfs.join(name), cro.clone()));
        }
        if let Some(code) = &self.code {
            outputs.push((dest.join("exefs").join("code.bin"), code.clone()));
        }
        outputs.push((dest.join("exheader.bin"), fs::read(&self.layout.exheader)?));
        if let Some(path) = &self.layout.ncch_header {
            outputs.push((dest.join("ncch_header.bin"), fs::read(path)?));
        }

        for (path, bytes) in outputs {
            self.write_output(&path, &bytes)?;
        }
        info!(
            "saved {} to {} ({} files)",
            self.entry.name,
            dest.display(),
            self.saved.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::testutil::{gen7_entry, write_gen7_layout, GEN7_TEST_CATALOG};
    use crate::{open_rom, LoadOptions};

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("romdata-gen7-{}-{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn load(root: &Path) -> Gen7Rom {
        let layout = ExtractedLayout::locate(root).unwrap();
        Gen7Rom::load(gen7_entry(), layout, true).unwrap()
    }

    fn file_tree(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
        WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                let rel = e.path().strip_prefix(root).unwrap().to_path_buf();
                (rel, fs::read(e.path()).unwrap())
            })
            .collect()
    }

    #[test]
    fn type_ids_are_dense() {
        for b in 0u8..18 {
            assert_eq!(type_to_byte(type_from_byte(b).unwrap()).unwrap(), b);
        }
        assert_eq!(type_from_byte(18), None);
        assert!(type_to_byte(Type::Bird).is_err());
        assert!(type_to_byte(Type::Curse).is_err());
    }

    #[test]
    fn layout_is_found_and_identified() {
        let root = temp_dir("layout");
        write_gen7_layout(&root);
        let layout = ExtractedLayout::locate(&root).unwrap();
        assert_eq!(layout.romfs, root.join("romfs"));
        assert_eq!(layout.code, Some(root.join("exefs").join("code.bin")));

        let ident = layout.identify().unwrap();
        assert_eq!(ident.title_id, 0x0004_0000_001F_FF00);
        assert_eq!(ident.product_code.as_deref(), Some("CTR-P-TEST"));

        assert!(ExtractedLayout::locate(&root.join("romfs")).is_none());
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn loads_every_table() {
        let root = temp_dir("load");
        write_gen7_layout(&root);
        let rom = load(&root);

        assert!(rom.is_rom_valid());
        assert_eq!(rom.species().len(), 4);
        assert_eq!(rom.species()[0].evolutions[0].to, 2);
        assert_eq!(rom.species()[0].learnset.len(), 2);
        assert_eq!(rom.moves().len(), 3);
        assert_eq!(rom.trainers()[1].name, "Hau");
        assert_eq!(rom.encounters().len(), 3);
        assert_eq!(rom.shops().len(), 2);
        assert_eq!(rom.trades()[0].nickname, "Bubbles");
        assert_eq!(rom.tutor_moves(), &[7, 8, 9]);
        assert!(rom.tm_moves().is_empty());
        assert_eq!(rom.strings(StringTable::Abilities)[1], "Overgrow");
        assert_eq!(rom.strings(StringTable::Locations)[1], "Route 1");
        assert!(rom.supports(Feature::MoveTutors));
        assert!(rom.supports(Feature::SosEncounters));

        let icon = rom.pokemon_icon(1).unwrap().unwrap();
        assert_eq!((icon.width, icon.height), (16, 8));
        assert_eq!(icon.pixels[0], 1);
        assert_eq!(icon.to_rgba().len(), 16 * 8 * 4);
        assert!(rom.pokemon_icon(60).unwrap().is_none());
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn unmodified_save_is_byte_identical() {
        let root = temp_dir("identity");
        write_gen7_layout(&root);
        let out = temp_dir("identity-out");

        let mut rom = load(&root);
        rom.save(&out).unwrap();
        let input = file_tree(&root);
        let written = file_tree(&out);
        assert_eq!(written.len(), rom.saved_files().len());
        assert!(written.contains_key(Path::new("romfs/a/0/1/7")));
        assert!(written.contains_key(Path::new("exefs/code.bin")));
        for (rel, bytes) in &written {
            assert_eq!(input.get(rel), Some(bytes), "{}", rel.display());
        }
        let _ = fs::remove_dir_all(&root);
        let _ = fs::remove_dir_all(&out);
    }

    #[test]
    fn untouched_archives_keep_their_input_bytes() {
        let root = temp_dir("raw");
        write_gen7_layout(&root);
        let personal = root.join("romfs/a/0/1/7");
        let mut padded = fs::read(&personal).unwrap();
        padded.extend_from_slice(&[0xFF; 16]);
        fs::write(&personal, &padded).unwrap();
        let moves_path = root.join("romfs/a/0/1/1");
        let mut moves_padded = fs::read(&moves_path).unwrap();
        moves_padded.extend_from_slice(&[0xFF; 16]);
        fs::write(&moves_path, &moves_padded).unwrap();
        let out = temp_dir("raw-out");

        let mut rom = load(&root);
        let mut moves = rom.moves().to_vec();
        moves[0].power = 90;
        rom.set_moves(moves).unwrap();
        rom.save(&out).unwrap();

        assert_eq!(fs::read(out.join("romfs/a/0/1/7")).unwrap(), padded);
        let written_moves = fs::read(out.join("romfs/a/0/1/1")).unwrap();
        assert_ne!(written_moves, moves_padded);
        assert_eq!(load(&out).moves()[0].power, 90);
        let _ = fs::remove_dir_all(&root);
        let _ = fs::remove_dir_all(&out);
    }

    #[test]
    fn edits_survive_a_reload() {
        let root = temp_dir("edit");
        write_gen7_layout(&root);
        let out = temp_dir("edit-out");

        let mut rom = load(&root);
        let mut species = rom.species().to_vec();
        species[0].name = "Hootling".to_string();
        species[1].special_attack = 99;
        rom.set_species(species).unwrap();
        let mut trainers = rom.trainers().to_vec();
        trainers[1].name = "Gladion".to_string();
        trainers[1].party[0].level = 70;
        rom.set_trainers(trainers).unwrap();
        rom.set_tutor_moves(vec![3, 2, 1]).unwrap();
        let mut shops = rom.shops().to_vec();
        shops[0].items = vec![5, 6];
        rom.set_shops(shops).unwrap();
        rom.save(&out).unwrap();

        let reloaded = load(&out);
        assert_eq!(reloaded.species()[..3], rom.species()[..3]);
        // alternate forms take their base species' name
        assert_eq!(reloaded.species()[3].name, "Hootling");
        assert_eq!(reloaded.trainers()[1].name, "Gladion");
        assert_eq!(reloaded.trainers(), rom.trainers());
        assert_eq!(reloaded.strings(StringTable::TrainerNames)[1], "Gladion");
        assert_eq!(reloaded.tutor_moves(), &[3, 2, 1]);
        assert_eq!(reloaded.shops()[0].items, vec![5, 6]);
        assert_eq!(reloaded.encounters(), rom.encounters());
        assert_eq!(reloaded.moves(), rom.moves());
        let _ = fs::remove_dir_all(&root);
        let _ = fs::remove_dir_all(&out);
    }

    #[test]
    fn catalogued_crc_decides_validity() {
        let root = temp_dir("crc");
        write_gen7_layout(&root);
        let personal = fs::read(root.join("romfs/a/0/1/7")).unwrap();
        let src = format!(
            "{}\n[Good]\nCopyFrom=Test Sun\nPersonalGarcCrc32=0x{:08X}\n\n[Bad]\nCopyFrom=Test Sun\nCodeCrc32=0x1\n",
            GEN7_TEST_CATALOG,
            checksum::crc32(&personal)
        );
        let catalog = Catalog::parse(&src).unwrap();

        let layout = ExtractedLayout::locate(&root).unwrap();
        let good = Gen7Rom::load(catalog.get("Good").unwrap().clone(), layout.clone(), true).unwrap();
        assert!(good.is_rom_valid());
        let bad = Gen7Rom::load(catalog.get("Bad").unwrap().clone(), layout, true).unwrap();
        assert!(!bad.is_rom_valid());
        assert_eq!(bad.species(), good.species());
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn open_rom_identifies_an_extracted_folder() {
        let root = temp_dir("open");
        write_gen7_layout(&root);
        let catalog_path = root.join("catalog.ini");
        fs::write(&catalog_path, GEN7_TEST_CATALOG).unwrap();
        let options = LoadOptions {
            catalog_path: Some(catalog_path),
            atomic_save: false,
        };

        let rom = open_rom(&root, &options).unwrap().unwrap();
        assert_eq!(rom.entry().name, "Test Sun");
        assert_eq!(rom.generation(), crate::Generation::Gen7);

        let empty = temp_dir("open-empty");
        assert!(open_rom(&empty, &options).unwrap().is_none());
        let _ = fs::remove_dir_all(&root);
        let _ = fs::remove_dir_all(&empty);
    }
}
