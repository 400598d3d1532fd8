//! Wild encounter tables. Every file but the last is an "EA" mini container
//! with one stream per zone; a zone stream is a run of fixed-size tables.
//! The last file holds one zone record per zone, in the same traversal
//! order, carrying the zone's location name index.
//!
//! Table layout: min level, max level, ten slot rates, ten regular slots,
//! seven groups of ten SOS slots and ten weather SOS slots. A slot is a
//! u16 (species | form << 11) followed by two bytes kept as loaded.

use log::debug;

use crate::container::garc::Archive;
use crate::container::{mini, read_u16};
use crate::model::{Encounter, EncounterArea};
use crate::{RomDataError, Result};

pub const TABLE_SIZE: usize = 0x174;
pub const ZONE_RECORD_SIZE: usize = 0x54;
const ZONE_LOCATION: usize = 0x1C;
const MINI_TAG: &str = "EA";

const SLOTS: usize = 10;
const SLOT_SIZE: usize = 4;
const FIRST_SLOT: usize = 0x0C;
const SOS_GROUPS: usize = 8;
const SLOT_COUNT: usize = SLOTS * (1 + SOS_GROUPS);
const SPECIES_MASK: u16 = 0x7FF;
const FORM_SHIFT: u16 = 11;

fn decode_table(table: &[u8], display_name: String, offset: usize) -> Result<EncounterArea> {
    let (min, max) = (table[0], table[1]);
    let mut encounters = Vec::with_capacity(SLOT_COUNT);
    for i in 0..SLOT_COUNT {
        let raw = read_u16(table, FIRST_SLOT + i * SLOT_SIZE)?;
        let form = (raw >> FORM_SHIFT) as u8;
        let mut enc = Encounter::at_level(raw & SPECIES_MASK, min);
        enc.max_level = max;
        enc.form = (form != 0).then_some(form);
        if i >= SLOTS {
            enc.sos = true;
            enc.sos_type = Some((i / SLOTS - 1) as u8);
        }
        encounters.push(enc);
    }
    Ok(EncounterArea {
        display_name,
        rate: 0,
        offset,
        encounters,
    })
}

fn encode_table(area: &EncounterArea, table: &mut [u8]) -> Result<()> {
    if area.encounters.len() != SLOT_COUNT {
        return Err(RomDataError::Precondition(format!(
            "area '{}' has {} slots, tables hold {}",
            area.display_name,
            area.encounters.len(),
            SLOT_COUNT
        )));
    }
    table[0] = area.encounters.iter().map(|e| e.level).min().unwrap_or(table[0]);
    table[1] = area.encounters.iter().map(|e| e.max_level).max().unwrap_or(table[1]);

    for (i, enc) in area.encounters.iter().enumerate() {
        let form = enc.form.unwrap_or(0) as u16;
        if enc.species > SPECIES_MASK || form > u16::MAX >> FORM_SHIFT {
            return Err(RomDataError::Precondition(format!(
                "species {} form {} does not fit an encounter slot",
                enc.species, form
            )));
        }
        let raw = enc.species | (form << FORM_SHIFT);
        let at = FIRST_SLOT + i * SLOT_SIZE;
        table[at..at + 2].copy_from_slice(&raw.to_le_bytes());
    }
    Ok(())
}

fn zone_location(zones: &[u8], zone: usize) -> Option<u16> {
    read_u16(zones, zone * ZONE_RECORD_SIZE + ZONE_LOCATION).ok()
}

fn table_label(index: usize, tables: usize, time_of_day: bool) -> String {
    if time_of_day && tables % 2 == 0 {
        let half = if index % 2 == 0 { "Day" } else { "Night" };
        format!("#{} ({})", index / 2 + 1, half)
    } else {
        format!("#{}", index + 1)
    }
}

fn island_count(wild: &Archive) -> Result<usize> {
    wild.len().checked_sub(1).ok_or_else(|| {
        RomDataError::malformed(0, "encounter archive has no zone data file")
    })
}

pub fn read_encounters(
    wild: &Archive,
    locations: &[String],
    time_of_day: bool,
) -> Result<Vec<EncounterArea>> {
    let islands = island_count(wild)?;
    let zones = wild.file(islands)?;

    let mut areas = Vec::new();
    let mut zone = 0;
    for island in 0..islands {
        for stream in mini::unpack(wild.file(island)?, MINI_TAG)? {
            let location = zone_location(zones, zone)
                .and_then(|i| locations.get(i as usize))
                .cloned()
                .unwrap_or_else(|| format!("Zone {}", zone));
            let tables = stream.len() / TABLE_SIZE;
            for t in 0..tables {
                let offset = t * TABLE_SIZE;
                let name = format!("{} {}", location, table_label(t, tables, time_of_day));
                areas.push(decode_table(&stream[offset..offset + TABLE_SIZE], name, offset)?);
            }
            zone += 1;
        }
    }
    debug!("read {} encounter areas over {} zones", areas.len(), zone);
    Ok(areas)
}

/// Positional write-back; the area cursor must run out exactly when the
/// last table has been written.
pub fn write_encounters(wild: &mut Archive, areas: &[EncounterArea]) -> Result<()> {
    let islands = island_count(wild)?;
    let mut cursor = areas.iter();

    for island in 0..islands {
        let original = mini::unpack(wild.file(island)?, MINI_TAG)?;
        let mut streams = original.clone();
        for stream in streams.iter_mut() {
            let tables = stream.len() / TABLE_SIZE;
            for table in stream.chunks_exact_mut(TABLE_SIZE).take(tables) {
                let area = cursor.next().ok_or_else(|| {
                    RomDataError::Precondition(format!(
                        "ran out of encounter areas in island file {}",
                        island
                    ))
                })?;
                encode_table(area, table)?;
            }
        }
        if streams != original {
            wild.set_file(island, mini::pack(&streams, MINI_TAG))?;
        }
    }

    let leftover = cursor.count();
    if leftover > 0 {
        return Err(RomDataError::Precondition(format!(
            "{} encounter areas left over after the last table",
            leftover
        )));
    }
    Ok(())
}
