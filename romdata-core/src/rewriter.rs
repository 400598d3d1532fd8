//! Variable-length record mutation for flat-bank images: overwrite in place
//! when the new encoding fits, otherwise move the record into free space and
//! repatch the pointer that owns it.

use log::{debug, warn};

use crate::image::{bank_of, RomImage, BANK_SIZE};
use crate::{RomDataError, Result};

/// Free-space allocator for one loaded image. Free bytes are runs of the
/// catalogued fill byte; every allocation keeps one fill byte of guard on
/// each side and is remembered so later allocations never overlap it.
#[derive(Clone, Debug)]
pub struct FreeSpace {
    fill: u8,
    claimed: Vec<(usize, usize)>,
}

impl FreeSpace {
    pub fn new(fill: u8) -> Self {
        Self {
            fill,
            claimed: Vec::new(),
        }
    }

    pub fn fill(&self) -> u8 {
        self.fill
    }

    /// Claimed `[start, end)` ranges, guards included.
    pub fn claimed(&self) -> &[(usize, usize)] {
        &self.claimed
    }

    fn claimed_end_at(&self, pos: usize) -> Option<usize> {
        self.claimed
            .iter()
            .find(|&&(start, end)| pos >= start && pos < end)
            .map(|&(_, end)| end)
    }

    /// First-fit search confined to `bank`. Returns the offset the record
    /// should be written at.
    pub fn allocate(
        &mut self,
        image: &RomImage,
        bank: usize,
        len: usize,
        label: &str,
    ) -> Result<usize> {
        let needed = len + 2;
        let bank_start = bank * BANK_SIZE;
        let bank_end = ((bank + 1) * BANK_SIZE).min(image.len());
        let bytes = image.as_bytes();

        let mut run_start = bank_start;
        let mut pos = bank_start;
        while pos < bank_end {
            if let Some(end) = self.claimed_end_at(pos) {
                pos = end;
                run_start = end;
                continue;
            }
            if bytes[pos] != self.fill {
                pos += 1;
                run_start = pos;
                continue;
            }
            pos += 1;
            if pos - run_start >= needed {
                self.claimed.push((run_start, pos));
                debug!(
                    "allocated {} bytes for {} at 0x{:06X}",
                    len,
                    label,
                    run_start + 1
                );
                return Ok(run_start + 1);
            }
        }

        Err(RomDataError::FreeSpace {
            record: label.to_string(),
            requested: len,
            bank,
        })
    }
}

/// Where a rewritten record ended up.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Placement {
    InPlace(usize),
    Relocated { from: usize, to: usize },
}

impl Placement {
    pub fn offset(&self) -> usize {
        match *self {
            Placement::InPlace(at) => at,
            Placement::Relocated { to, .. } => to,
        }
    }
}

/// Re-encodes `value` into the record the pointer at `slot` refers to.
///
/// `measure_old_len` must walk the existing record to its terminator(s).
/// Slack left behind by a shorter encoding is not cleared; nothing points
/// at it any more.
pub fn rewrite<V, E, M>(
    image: &mut RomImage,
    free_space: &mut FreeSpace,
    slot: usize,
    value: &V,
    encode: E,
    measure_old_len: M,
    label: &str,
) -> Result<Placement>
where
    V: ?Sized,
    E: FnOnce(&V) -> Vec<u8>,
    M: FnOnce(&RomImage, usize) -> Result<usize>,
{
    let old = image.read_pointer(slot)?;
    let old_len = measure_old_len(image, old)?;
    let bytes = encode(value);

    if bytes.len() <= old_len {
        image.write_bytes(old, &bytes)?;
        return Ok(Placement::InPlace(old));
    }

    let bank = bank_of(old);
    let to = free_space.allocate(image, bank, bytes.len(), label)?;
    image.write_bytes(to, &bytes)?;
    image.write_pointer(slot, to)?;
    warn!(
        "{} grew from {} to {} bytes; moved 0x{:06X} -> 0x{:06X}",
        label,
        old_len,
        bytes.len(),
        old,
        to
    );
    Ok(Placement::Relocated { from: old, to })
}

/// Length of a record ending at the first `terminator`, inclusive.
pub fn measure_until(image: &RomImage, offset: usize, terminator: u8) -> Result<usize> {
    let mut pos = offset;
    while image.read_byte(pos)? != terminator {
        pos += 1;
    }
    Ok(pos - offset + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const SLOT: usize = BANK_SIZE + 0x10;
    const RECORD: usize = BANK_SIZE + 0x100;
    const NEIGHBOUR: usize = BANK_SIZE + 0x105;

    fn image_with_record() -> RomImage {
        let mut image = RomImage::new(vec![0xAA; 3 * BANK_SIZE]);
        // free run in bank 1
        for b in &mut image.as_bytes_mut()[BANK_SIZE + 0x2000..BANK_SIZE + 0x2100] {
            *b = 0x00;
        }
        image.write_pointer(SLOT, RECORD).unwrap();
        image.write_bytes(RECORD, &[1, 2, 3, 4, 0xFF]).unwrap();
        image.write_bytes(NEIGHBOUR, &[9, 9, 9, 0xFF]).unwrap();
        image
    }

    fn measure(image: &RomImage, offset: usize) -> Result<usize> {
        measure_until(image, offset, 0xFF)
    }

    fn encode(bytes: &Vec<u8>) -> Vec<u8> {
        let mut out = bytes.clone();
        out.push(0xFF);
        out
    }

    #[test]
    fn growth_relocates_and_repatches() {
        let mut image = image_with_record();
        let before = image.as_bytes().to_vec();
        let mut free = FreeSpace::new(0x00);
        let value = vec![1u8, 2, 3, 4, 5, 6];

        let placement =
            rewrite(&mut image, &mut free, SLOT, &value, encode, measure, "test").unwrap();

        let new_at = image.read_pointer(SLOT).unwrap();
        assert_ne!(new_at, RECORD);
        assert_eq!(placement, Placement::Relocated { from: RECORD, to: new_at });
        assert_eq!(image.slice(new_at, 7).unwrap(), &encode(&value)[..]);
        assert_eq!(image.slice(RECORD, 5).unwrap(), &before[RECORD..RECORD + 5]);
        assert_eq!(image.slice(NEIGHBOUR, 4).unwrap(), &[9, 9, 9, 0xFF]);

        for (i, (&a, &b)) in before.iter().zip(image.as_bytes()).enumerate() {
            let in_slot = (SLOT..SLOT + 2).contains(&i);
            let in_new = (new_at..new_at + 7).contains(&i);
            if !in_slot && !in_new {
                assert_eq!(a, b, "byte 0x{:06X} changed", i);
            }
        }
    }

    #[test]
    fn shrink_or_equal_stays_in_place() {
        for value in [vec![7u8, 8], vec![7u8, 8, 9, 10]] {
            let mut image = image_with_record();
            let mut free = FreeSpace::new(0x00);
            let placement =
                rewrite(&mut image, &mut free, SLOT, &value, encode, measure, "test").unwrap();
            assert_eq!(placement, Placement::InPlace(RECORD));
            assert_eq!(image.read_pointer(SLOT).unwrap(), RECORD);
            let expected = encode(&value);
            assert_eq!(image.slice(RECORD, expected.len()).unwrap(), &expected[..]);
            assert_eq!(image.slice(NEIGHBOUR, 4).unwrap(), &[9, 9, 9, 0xFF]);
            assert!(free.claimed().is_empty());
        }
    }

    #[test]
    fn exhausted_bank_reports_size_and_record() {
        let mut image = image_with_record();
        let mut free = FreeSpace::new(0x00);
        let value = vec![0x11u8; 0x200];
        let err = rewrite(&mut image, &mut free, SLOT, &value, encode, measure, "class 3")
            .unwrap_err();
        match err {
            RomDataError::FreeSpace {
                record,
                requested,
                bank,
            } => {
                assert_eq!(record, "class 3");
                assert_eq!(requested, 0x201);
                assert_eq!(bank, 1);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(image.slice(RECORD, 5).unwrap() == [1, 2, 3, 4, 0xFF]);
    }

    #[test]
    fn allocations_never_overlap() {
        let image = image_with_record();
        let mut free = FreeSpace::new(0x00);
        let mut rng = StdRng::seed_from_u64(0x5EED);
        let mut taken: Vec<(usize, usize)> = Vec::new();

        loop {
            let len = rng.gen_range(1..24);
            match free.allocate(&image, 1, len, "random") {
                Ok(at) => {
                    assert!(at >= BANK_SIZE + 0x2001 && at + len < BANK_SIZE + 0x2100);
                    for &(s, e) in &taken {
                        assert!(at + len <= s || at >= e, "overlap at 0x{:06X}", at);
                    }
                    taken.push((at, at + len));
                }
                Err(RomDataError::FreeSpace { .. }) => break,
                Err(other) => panic!("unexpected error {:?}", other),
            }
        }
        assert!(!taken.is_empty());
    }
}
