//! Mart inventories: a pointer table of (count, items..., 0xFF) records.

use log::debug;

use super::byte_id;
use crate::catalog::RomEntry;
use crate::image::RomImage;
use crate::model::Shop;
use crate::rewriter::{self, FreeSpace};
use crate::{RomDataError, Result};

const SHOP_END: u8 = 0xFF;

fn shop_table(entry: &RomEntry) -> Result<(usize, usize)> {
    Ok((entry.int("ShopPointersOffset")?, entry.int("ShopCount")?))
}

fn decode_shop(image: &RomImage, offset: usize) -> Result<Vec<u16>> {
    let count = image.read_byte(offset)? as usize;
    let items = image.slice(offset + 1, count)?;
    let end = offset + 1 + count;
    if image.read_byte(end)? != SHOP_END {
        return Err(RomDataError::malformed(
            end,
            format!("shop of {} items is not closed by 0xFF", count),
        ));
    }
    Ok(items.iter().map(|&i| i as u16).collect())
}

fn encode_shop(shop: &Shop) -> Result<Vec<u8>> {
    let count = u8::try_from(shop.items.len())
        .ok()
        .filter(|&c| c != SHOP_END)
        .ok_or_else(|| {
            RomDataError::Precondition(format!("{} has {} items", shop.name, shop.items.len()))
        })?;
    let mut out = Vec::with_capacity(shop.items.len() + 2);
    out.push(count);
    for &item in &shop.items {
        out.push(byte_id("shop item", item)?);
    }
    out.push(SHOP_END);
    Ok(out)
}

pub fn read_shops(image: &RomImage, entry: &RomEntry) -> Result<Vec<Shop>> {
    let (table, count) = shop_table(entry)?;
    let mut shops = Vec::with_capacity(count);
    for i in 0..count {
        let at = image.read_pointer(table + i * 2)?;
        shops.push(Shop {
            name: format!("Shop {}", i + 1),
            items: decode_shop(image, at)?,
        });
    }
    debug!("read {} shops", shops.len());
    Ok(shops)
}

pub fn write_shops(
    image: &mut RomImage,
    free_space: &mut FreeSpace,
    entry: &RomEntry,
    shops: &[Shop],
) -> Result<()> {
    let (table, count) = shop_table(entry)?;
    if shops.len() != count {
        return Err(RomDataError::Precondition(format!(
            "expected {} shops, got {}",
            count,
            shops.len()
        )));
    }
    for (i, shop) in shops.iter().enumerate() {
        let bytes = encode_shop(shop)?;
        rewriter::rewrite(
            image,
            free_space,
            table + i * 2,
            &bytes,
            |b: &Vec<u8>| b.clone(),
            |img: &RomImage, at: usize| Ok(img.read_byte(at)? as usize + 2),
            &shop.name,
        )?;
    }
    Ok(())
}
