use log::debug;

use super::{byte_id, growth_from_byte, growth_to_byte, type_from_byte, type_to_byte};
use crate::catalog::RomEntry;
use crate::image::RomImage;
use crate::model::{HeldItems, Species};
use crate::{RomDataError, Result};

pub const BASE_STATS_SIZE: usize = 0x20;

const STATS: usize = 1;
const TYPES: usize = 7;
const CATCH_RATE: usize = 9;
const ITEMS: usize = 11;
const GROWTH: usize = 22;

struct Layout {
    count: usize,
    names: usize,
    name_len: usize,
    stats: usize,
}

impl Layout {
    fn from_entry(entry: &RomEntry) -> Result<Self> {
        Ok(Layout {
            count: entry.int("PokemonCount")?,
            names: entry.int("PokemonNamesOffset")?,
            name_len: entry.int("PokemonNamesLength")?,
            stats: entry.int("PokemonStatsOffset")?,
        })
    }
}

pub fn read_species(image: &RomImage, entry: &RomEntry) -> Result<Vec<Species>> {
    let layout = Layout::from_entry(entry)?;
    let mut species = Vec::with_capacity(layout.count);

    for i in 0..layout.count {
        let name = image.read_fixed_length_string(layout.names + i * layout.name_len, layout.name_len)?;
        let mut s = Species::new((i + 1) as u16, name);
        let base = layout.stats + i * BASE_STATS_SIZE;
        let rec = image.slice(base, BASE_STATS_SIZE)?;

        s.hp = rec[STATS];
        s.attack = rec[STATS + 1];
        s.defense = rec[STATS + 2];
        s.speed = rec[STATS + 3];
        s.special_attack = rec[STATS + 4];
        s.special_defense = rec[STATS + 5];

        let primary = type_from_byte(rec[TYPES]).ok_or_else(|| {
            RomDataError::malformed(base + TYPES, format!("unknown type byte 0x{:02X}", rec[TYPES]))
        })?;
        let secondary = type_from_byte(rec[TYPES + 1]).ok_or_else(|| {
            RomDataError::malformed(
                base + TYPES + 1,
                format!("unknown type byte 0x{:02X}", rec[TYPES + 1]),
            )
        })?;
        s.set_types(primary, secondary);

        s.catch_rate = rec[CATCH_RATE];
        s.held_items = HeldItems::from_slots(rec[ITEMS] as u16, rec[ITEMS + 1] as u16);
        s.growth_curve = growth_from_byte(rec[GROWTH]).ok_or_else(|| {
            RomDataError::malformed(base + GROWTH, format!("unknown growth rate {}", rec[GROWTH]))
        })?;

        species.push(s);
    }

    debug!("read {} species", species.len());
    Ok(species)
}

/// Patches the modelled bytes of every base-stat record; the rest of each
/// record is left as loaded.
pub fn write_species(image: &mut RomImage, entry: &RomEntry, species: &[Species]) -> Result<()> {
    let layout = Layout::from_entry(entry)?;
    if species.len() != layout.count {
        return Err(RomDataError::Precondition(format!(
            "expected {} species, got {}",
            layout.count,
            species.len()
        )));
    }

    for (i, s) in species.iter().enumerate() {
        let name_at = layout.names + i * layout.name_len;
        if image.read_fixed_length_string(name_at, layout.name_len)? != s.name {
            image.write_fixed_length_string(name_at, &s.name, layout.name_len)?;
        }

        let base = layout.stats + i * BASE_STATS_SIZE;
        image.write_bytes(
            base + STATS,
            &[
                s.hp,
                s.attack,
                s.defense,
                s.speed,
                s.special_attack,
                s.special_defense,
            ],
        )?;
        image.write_byte(base + TYPES, type_to_byte(s.primary_type)?)?;
        image.write_byte(base + TYPES + 1, type_to_byte(s.secondary_or_primary())?)?;
        image.write_byte(base + CATCH_RATE, s.catch_rate)?;

        let (common, rare) = s.held_items.to_slots();
        image.write_byte(base + ITEMS, byte_id("held item", common)?)?;
        image.write_byte(base + ITEMS + 1, byte_id("held item", rare)?)?;
        image.write_byte(base + GROWTH, growth_to_byte(s.growth_curve)?)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Type;
    use crate::testutil::{gen2_entry, gen2_rom_bytes};

    #[test]
    fn decodes_stats_types_and_items() {
        let image = RomImage::new(gen2_rom_bytes());
        let species = read_species(&image, &gen2_entry()).unwrap();
        assert_eq!(species.len(), 4);

        let first = &species[0];
        assert_eq!(first.id, 1);
        assert_eq!(first.name, "BULBASAUR");
        assert_eq!(
            (first.hp, first.attack, first.defense, first.speed),
            (45, 49, 49, 45)
        );
        assert_eq!(first.primary_type, Type::Grass);
        assert_eq!(first.secondary_type, Some(Type::Poison));
        assert_eq!(first.held_items.guaranteed, 0);

        let second = &species[1];
        assert_eq!(second.secondary_type, None);
        assert_eq!(second.held_items.guaranteed, 0x20);
    }

    #[test]
    fn write_expands_guaranteed_items_and_keeps_other_bytes() {
        let mut image = RomImage::new(gen2_rom_bytes());
        let entry = gen2_entry();
        let mut species = read_species(&image, &entry).unwrap();
        let stats = entry.int("PokemonStatsOffset").unwrap();
        let before = image.slice(stats, BASE_STATS_SIZE).unwrap().to_vec();

        species[0].held_items = HeldItems {
            guaranteed: 0x30,
            common: 0,
            rare: 0,
        };
        write_species(&mut image, &entry, &species).unwrap();

        let after = image.slice(stats, BASE_STATS_SIZE).unwrap();
        assert_eq!(after[ITEMS], 0x30);
        assert_eq!(after[ITEMS + 1], 0x30);
        for i in (0..BASE_STATS_SIZE).filter(|&i| i != ITEMS && i != ITEMS + 1) {
            assert_eq!(after[i], before[i]);
        }
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let mut image = RomImage::new(gen2_rom_bytes());
        let entry = gen2_entry();
        let mut species = read_species(&image, &entry).unwrap();
        species[2].primary_type = Type::Fairy;
        assert!(write_species(&mut image, &entry, &species).is_err());

        species[2].primary_type = Type::Fire;
        species[2].held_items.common = 300;
        assert!(write_species(&mut image, &entry, &species).is_err());
    }
}
