//! Shop inventories live in a relocatable code module as consecutive u16
//! item ids; the catalog gives the table offset and every shop's size.

use crate::catalog::RomEntry;
use crate::container::read_u16;
use crate::model::Shop;
use crate::{RomDataError, Result};

fn layout(entry: &RomEntry) -> Result<(usize, Vec<usize>)> {
    Ok((entry.int("ShopItemsOffset")?, entry.array("ShopItemSizes")?))
}

pub fn read_shops(cro: &[u8], entry: &RomEntry) -> Result<Vec<Shop>> {
    let (mut pos, sizes) = layout(entry)?;
    let mut shops = Vec::with_capacity(sizes.len());
    for (i, size) in sizes.into_iter().enumerate() {
        let items = (0..size)
            .map(|j| read_u16(cro, pos + j * 2))
            .collect::<Result<Vec<_>>>()?;
        shops.push(Shop {
            name: format!("Shop {}", i + 1),
            items,
        });
        pos += size * 2;
    }
    Ok(shops)
}

/// Shop sizes are fixed; each replacement list must keep its length.
pub fn write_shops(cro: &mut [u8], entry: &RomEntry, shops: &[Shop]) -> Result<()> {
    let (mut pos, sizes) = layout(entry)?;
    if shops.len() != sizes.len() {
        return Err(RomDataError::Precondition(format!(
            "expected {} shops, got {}",
            sizes.len(),
            shops.len()
        )));
    }
    for (shop, size) in shops.iter().zip(sizes) {
        if shop.items.len() != size {
            return Err(RomDataError::Precondition(format!(
                "{} holds {} items, got {}",
                shop.name,
                size,
                shop.items.len()
            )));
        }
        let end = pos + size * 2;
        let total = cro.len();
        let region = cro.get_mut(pos..end).ok_or(RomDataError::OutOfBounds {
            offset: pos,
            len: size * 2,
            size: total,
        })?;
        for (slot, item) in region.chunks_exact_mut(2).zip(&shop.items) {
            slot.copy_from_slice(&item.to_le_bytes());
        }
        pos = end;
    }
    Ok(())
}
