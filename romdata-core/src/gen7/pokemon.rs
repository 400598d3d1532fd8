//! Personal records: one fixed-size file per species or alternate form.
//! Alternate forms with their own file are exposed as species with a
//! `base_species`. Cosmetic forms are listed by number on the base species.

use log::debug;

use super::{type_from_byte, type_to_byte, u8_field};
use crate::catalog::RomEntry;
use crate::container::garc::Archive;
use crate::container::read_u16;
use crate::model::{validate_form_chains, ExpCurve, HeldItems, Species};
use crate::{RomDataError, Result};

pub const PERSONAL_SIZE: usize = 0x54;

const STATS: usize = 0x00;
const TYPES: usize = 0x06;
const CATCH_RATE: usize = 0x08;
const ITEM_COMMON: usize = 0x0C;
const ITEM_RARE: usize = 0x0E;
const ITEM_DARK_GRASS: usize = 0x10;
const GROWTH: usize = 0x15;
const ABILITIES: usize = 0x18;
const FORM_STATS: usize = 0x1C;
const FORM_COUNT: usize = 0x20;

const GROWTH_CURVES: [ExpCurve; 6] = [
    ExpCurve::MediumFast,
    ExpCurve::Erratic,
    ExpCurve::Fluctuating,
    ExpCurve::MediumSlow,
    ExpCurve::Fast,
    ExpCurve::Slow,
];

fn personal_record(personal: &Archive, index: usize) -> Result<&[u8]> {
    let rec = personal.file(index)?;
    if rec.len() < PERSONAL_SIZE {
        return Err(RomDataError::malformed(
            0,
            format!("personal file {} is {} bytes", index, rec.len()),
        ));
    }
    Ok(rec)
}

fn decode_species(rec: &[u8], id: u16, name: String) -> Result<Species> {
    let mut s = Species::new(id, name);
    s.hp = rec[STATS];
    s.attack = rec[STATS + 1];
    s.defense = rec[STATS + 2];
    s.speed = rec[STATS + 3];
    s.special_attack = rec[STATS + 4];
    s.special_defense = rec[STATS + 5];

    let ty = |at: usize| {
        type_from_byte(rec[at]).ok_or_else(|| {
            RomDataError::malformed(at, format!("species {}: unknown type {}", id, rec[at]))
        })
    };
    s.set_types(ty(TYPES)?, ty(TYPES + 1)?);

    s.catch_rate = rec[CATCH_RATE];
    s.held_items = HeldItems::from_slots(read_u16(rec, ITEM_COMMON)?, read_u16(rec, ITEM_RARE)?);
    s.dark_grass_held_item = read_u16(rec, ITEM_DARK_GRASS)?;
    s.growth_curve = *GROWTH_CURVES.get(rec[GROWTH] as usize).ok_or_else(|| {
        RomDataError::malformed(GROWTH, format!("species {}: growth rate {}", id, rec[GROWTH]))
    })?;
    for (slot, &a) in s.abilities.iter_mut().zip(&rec[ABILITIES..ABILITIES + 3]) {
        *slot = a as u16;
    }
    s.icon_index = Some(id);
    Ok(s)
}

fn encode_species(s: &Species, rec: &mut [u8]) -> Result<()> {
    rec[STATS..STATS + 6].copy_from_slice(&[
        s.hp,
        s.attack,
        s.defense,
        s.speed,
        s.special_attack,
        s.special_defense,
    ]);
    rec[TYPES] = type_to_byte(s.primary_type)?;
    rec[TYPES + 1] = type_to_byte(s.secondary_or_primary())?;
    rec[CATCH_RATE] = s.catch_rate;

    let (common, rare) = s.held_items.to_slots();
    rec[ITEM_COMMON..ITEM_COMMON + 2].copy_from_slice(&common.to_le_bytes());
    rec[ITEM_RARE..ITEM_RARE + 2].copy_from_slice(&rare.to_le_bytes());
    rec[ITEM_DARK_GRASS..ITEM_DARK_GRASS + 2]
        .copy_from_slice(&s.dark_grass_held_item.to_le_bytes());

    rec[GROWTH] = GROWTH_CURVES
        .iter()
        .position(|&c| c == s.growth_curve)
        .ok_or_else(|| {
            RomDataError::Precondition(format!("growth curve {:?} is not encodable", s.growth_curve))
        })? as u8;
    for (i, &a) in s.abilities.iter().enumerate() {
        rec[ABILITIES + i] = u8_field("ability", a)?;
    }
    Ok(())
}

/// Reads species `1..=PokemonCount` followed by their full alternate forms.
pub fn read_species(personal: &Archive, names: &[String], entry: &RomEntry) -> Result<Vec<Species>> {
    let count = entry.int("PokemonCount")?;
    let cosmetic = entry.opt_form_list("CosmeticForms")?.unwrap_or_default();
    let is_cosmetic = |id: usize, form: usize| {
        cosmetic
            .iter()
            .any(|&(species, f)| species == id && f.map_or(true, |f| f == form))
    };
    let name_of = |id: usize| names.get(id).cloned().unwrap_or_default();

    let mut species = Vec::with_capacity(count);
    let mut forms = Vec::new();
    for id in 1..=count {
        let rec = personal_record(personal, id)?;
        let mut s = decode_species(rec, id as u16, name_of(id))?;

        let form_count = rec[FORM_COUNT] as usize;
        let form_stats = read_u16(rec, FORM_STATS)? as usize;
        for f in 1..form_count {
            if form_stats == 0 || is_cosmetic(id, f) {
                s.cosmetic_forms.push(f as u8);
            } else {
                forms.push((form_stats + f - 1, id, f));
            }
        }
        species.push(s);
    }

    for (index, base, form) in forms {
        let rec = personal_record(personal, index)?;
        let mut s = decode_species(rec, index as u16, name_of(base))?;
        s.base_species = Some(base as u16);
        s.form_number = form as u8;
        species.push(s);
    }

    validate_form_chains(&species)?;
    debug!(
        "read {} species records ({} alternate forms)",
        species.len(),
        species.len() - count
    );
    Ok(species)
}

/// Patches every modelled field into the species' own personal file.
pub fn write_species(personal: &mut Archive, species: &[Species]) -> Result<()> {
    validate_form_chains(species)?;
    for s in species {
        let index = s.id as usize;
        let mut rec = personal_record(personal, index)?.to_vec();
        encode_species(s, &mut rec)?;
        personal.set_file(index, rec)?;
    }
    Ok(())
}
