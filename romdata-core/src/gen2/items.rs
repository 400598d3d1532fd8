//! Item names, the TM/HM move list and the move tutor list.

use log::debug;

use super::byte_id;
use crate::catalog::RomEntry;
use crate::image::RomImage;
use crate::{RomDataError, Result};

fn machine_count(entry: &RomEntry) -> Result<usize> {
    Ok(entry.int("TMCount")? + entry.int_or("HMCount", 0)?)
}

fn read_move_list(image: &RomImage, offset: usize, count: usize) -> Result<Vec<u16>> {
    Ok(image
        .slice(offset, count)?
        .iter()
        .map(|&m| m as u16)
        .collect())
}

fn write_move_list(
    image: &mut RomImage,
    offset: usize,
    count: usize,
    moves: &[u16],
    what: &str,
) -> Result<()> {
    if moves.len() != count {
        return Err(RomDataError::Precondition(format!(
            "expected {} {} moves, got {}",
            count,
            what,
            moves.len()
        )));
    }
    let bytes = moves
        .iter()
        .map(|&m| byte_id(what, m))
        .collect::<Result<Vec<u8>>>()?;
    image.write_bytes(offset, &bytes)
}

/// TMs followed by HMs, in machine order.
pub fn read_tm_moves(image: &RomImage, entry: &RomEntry) -> Result<Vec<u16>> {
    let moves = read_move_list(image, entry.int("TMMovesOffset")?, machine_count(entry)?)?;
    debug!("read {} TM/HM moves", moves.len());
    Ok(moves)
}

pub fn write_tm_moves(image: &mut RomImage, entry: &RomEntry, moves: &[u16]) -> Result<()> {
    let offset = entry.int("TMMovesOffset")?;
    write_move_list(image, offset, machine_count(entry)?, moves, "TM")
}

/// Empty on titles without a catalogued tutor list.
pub fn read_tutor_moves(image: &RomImage, entry: &RomEntry) -> Result<Vec<u16>> {
    match entry.opt_int("MoveTutorCount")? {
        Some(count) => read_move_list(image, entry.int("MoveTutorMovesOffset")?, count),
        None => Ok(Vec::new()),
    }
}

pub fn write_tutor_moves(image: &mut RomImage, entry: &RomEntry, moves: &[u16]) -> Result<()> {
    match entry.opt_int("MoveTutorCount")? {
        Some(count) => {
            let offset = entry.int("MoveTutorMovesOffset")?;
            write_move_list(image, offset, count, moves, "tutor")
        }
        None if moves.is_empty() => Ok(()),
        None => Err(RomDataError::Precondition(format!(
            "{} has no move tutors",
            entry.name
        ))),
    }
}

pub fn read_item_names(image: &RomImage, entry: &RomEntry) -> Result<(Vec<String>, usize)> {
    image.read_string_list(entry.int("ItemNamesOffset")?, entry.int("ItemCount")?)
}

pub fn write_item_names(
    image: &mut RomImage,
    entry: &RomEntry,
    names: &[String],
    footprint: usize,
) -> Result<()> {
    let count = entry.int("ItemCount")?;
    if names.len() != count {
        return Err(RomDataError::Precondition(format!(
            "expected {} item names, got {}",
            count,
            names.len()
        )));
    }
    image.write_string_list(entry.int("ItemNamesOffset")?, names, footprint, "item names")
}
