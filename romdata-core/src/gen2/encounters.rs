//! Wild encounter tables and the map → landmark name lookup used to label
//! them.
//!
//! Six tables sit back to back: Johto grass, Johto water, Kanto grass, Kanto
//! water, swarm grass and swarm water. Each is a run of records closed by
//! 0xFF. A grass record is (group, map, three per-time rates, 21 level /
//! species pairs); a water record is (group, map, rate, 3 pairs).

use std::collections::HashMap;

use log::debug;

use super::byte_id;
use crate::catalog::RomEntry;
use crate::charmap;
use crate::image::RomImage;
use crate::model::{Encounter, EncounterArea};
use crate::rewriter::{self, FreeSpace};
use crate::{RomDataError, Result};

const TABLE_END: u8 = 0xFF;
const TIMES_OF_DAY: [&str; 3] = ["Morning", "Day", "Night"];
const GRASS_SLOTS: usize = 7;
const WATER_SLOTS: usize = 3;
const MAP_HEADER_SIZE: usize = 9;
const MAP_HEADER_LANDMARK: usize = 5;
const LANDMARK_SIZE: usize = 4;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum TableKind {
    Grass,
    Water,
}

impl TableKind {
    fn rate_count(self) -> usize {
        match self {
            TableKind::Grass => TIMES_OF_DAY.len(),
            TableKind::Water => 1,
        }
    }

    fn slots_per_rate(self) -> usize {
        match self {
            TableKind::Grass => GRASS_SLOTS,
            TableKind::Water => WATER_SLOTS,
        }
    }

    fn record_size(self) -> usize {
        2 + self.rate_count() + 2 * self.rate_count() * self.slots_per_rate()
    }
}

const TABLES: [(TableKind, &str); 6] = [
    (TableKind::Grass, "Grass/Cave"),
    (TableKind::Water, "Surfing"),
    (TableKind::Grass, "Grass/Cave"),
    (TableKind::Water, "Surfing"),
    (TableKind::Grass, "Swarm"),
    (TableKind::Water, "Swarm Surfing"),
];

/// Landmark names plus the landmark each (group, map) pair belongs to.
#[derive(Clone, Debug, Default)]
pub struct MapNames {
    landmarks: Vec<String>,
    by_map: HashMap<(u8, u8), usize>,
}

impl MapNames {
    pub fn landmarks(&self) -> &[String] {
        &self.landmarks
    }

    pub fn name(&self, group: u8, map: u8) -> Option<&str> {
        self.by_map
            .get(&(group, map))
            .and_then(|&i| self.landmarks.get(i))
            .map(String::as_str)
    }

    fn label(&self, group: u8, map: u8) -> String {
        match self.name(group, map) {
            Some(name) => name.to_string(),
            None => format!("Map {}.{}", group, map),
        }
    }
}

pub fn read_map_names(image: &RomImage, entry: &RomEntry) -> Result<MapNames> {
    let landmark_table = entry.int("LandmarkTableOffset")?;
    let landmark_count = entry.int("LandmarkCount")?;
    let mut landmarks = Vec::with_capacity(landmark_count);
    for i in 0..landmark_count {
        let name_at = image.read_pointer(landmark_table + i * LANDMARK_SIZE + 2)?;
        landmarks.push(image.read_variable_length_string(name_at)?);
    }

    let headers = entry.int("MapHeaders")?;
    let mut by_map = HashMap::new();
    for (g, &maps) in entry.array("MapGroupSizes")?.iter().enumerate() {
        let group_at = image.read_pointer(headers + g * 2)?;
        for m in 0..maps {
            let landmark = image.read_byte(group_at + m * MAP_HEADER_SIZE + MAP_HEADER_LANDMARK)?;
            by_map.insert(((g + 1) as u8, (m + 1) as u8), landmark as usize);
        }
    }

    debug!(
        "read {} landmarks for {} maps",
        landmarks.len(),
        by_map.len()
    );
    Ok(MapNames { landmarks, by_map })
}

/// Rewrites landmark names whose text changed; a longer name is relocated
/// within the landmark bank.
pub fn write_landmark_names(
    image: &mut RomImage,
    free_space: &mut FreeSpace,
    entry: &RomEntry,
    names: &[String],
) -> Result<()> {
    let table = entry.int("LandmarkTableOffset")?;
    let count = entry.int("LandmarkCount")?;
    if names.len() != count {
        return Err(RomDataError::Precondition(format!(
            "expected {} landmark names, got {}",
            count,
            names.len()
        )));
    }

    for (i, name) in names.iter().enumerate() {
        let slot = table + i * LANDMARK_SIZE + 2;
        let current = image.read_pointer(slot)?;
        if image.read_variable_length_string(current)? == *name {
            continue;
        }
        rewriter::rewrite(
            image,
            free_space,
            slot,
            name.as_str(),
            |s: &str| {
                let mut bytes = charmap::encode(s);
                bytes.push(charmap::TERMINATOR);
                bytes
            },
            |img: &RomImage, at: usize| img.variable_length_string_size(at),
            &format!("landmark {}", i),
        )?;
    }
    Ok(())
}

fn decode_record(
    image: &RomImage,
    offset: usize,
    kind: TableKind,
    label: &str,
    names: &MapNames,
    areas: &mut Vec<EncounterArea>,
) -> Result<()> {
    let rec = image.slice(offset, kind.record_size())?;
    let name = names.label(rec[0], rec[1]);
    let rates = &rec[2..2 + kind.rate_count()];
    let mut pairs = rec[2 + kind.rate_count()..].chunks_exact(2);

    for (i, &rate) in rates.iter().enumerate() {
        let display_name = match kind {
            TableKind::Grass => format!("{} {} ({})", name, label, TIMES_OF_DAY[i]),
            TableKind::Water => format!("{} {}", name, label),
        };
        let encounters = pairs
            .by_ref()
            .take(kind.slots_per_rate())
            .map(|p| Encounter::at_level(p[1] as u16, p[0]))
            .collect();
        areas.push(EncounterArea {
            display_name,
            rate,
            offset,
            encounters,
        });
    }
    Ok(())
}

pub fn read_encounters(
    image: &RomImage,
    entry: &RomEntry,
    names: &MapNames,
) -> Result<Vec<EncounterArea>> {
    let mut pos = entry.int("WildPokemonOffset")?;
    let mut areas = Vec::new();
    for &(kind, label) in TABLES.iter() {
        while image.read_byte(pos)? != TABLE_END {
            decode_record(image, pos, kind, label, names, &mut areas)?;
            pos += kind.record_size();
        }
        pos += 1;
    }
    debug!("read {} encounter areas", areas.len());
    Ok(areas)
}

/// Writes the areas back positionally. The model cursor and the table
/// cursor advance together and must run out at the same time. Every record
/// is encoded before the first byte is written, so a rejected list leaves
/// the image untouched.
pub fn write_encounters(
    image: &mut RomImage,
    entry: &RomEntry,
    areas: &[EncounterArea],
) -> Result<()> {
    let mut pos = entry.int("WildPokemonOffset")?;
    let mut cursor = areas.iter();
    let mut records = Vec::new();

    for &(kind, _) in TABLES.iter() {
        while image.read_byte(pos)? != TABLE_END {
            let mut rates = Vec::with_capacity(kind.rate_count());
            let mut pairs = Vec::with_capacity(2 * kind.rate_count() * kind.slots_per_rate());
            for _ in 0..kind.rate_count() {
                let area = cursor.next().ok_or_else(|| {
                    RomDataError::Precondition(format!(
                        "ran out of encounter areas at table record 0x{:06X}",
                        pos
                    ))
                })?;
                if area.encounters.len() != kind.slots_per_rate() {
                    return Err(RomDataError::Precondition(format!(
                        "area '{}' has {} slots, the table record holds {}",
                        area.display_name,
                        area.encounters.len(),
                        kind.slots_per_rate()
                    )));
                }
                rates.push(area.rate);
                for enc in &area.encounters {
                    pairs.push(enc.level);
                    pairs.push(byte_id("encounter species", enc.species)?);
                }
            }
            rates.extend(pairs);
            records.push((pos + 2, rates));
            pos += kind.record_size();
        }
        pos += 1;
    }

    let leftover = cursor.count();
    if leftover > 0 {
        return Err(RomDataError::Precondition(format!(
            "{} encounter areas left over after the last table",
            leftover
        )));
    }
    for (at, bytes) in records {
        image.write_bytes(at, &bytes)?;
    }
    Ok(())
}
