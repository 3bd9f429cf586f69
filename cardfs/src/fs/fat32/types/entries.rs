// SPDX-License-Identifier: MIT

use crate::fs::fat32::{attr::*, constant::*, utils::*};

/// Classification of one 32-byte directory slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// First byte 0x00, no slot after this one is in use.
    EndOfDirectory,
    /// First byte 0xE5.
    Free,
    Entry(Entry),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    Short(ShortEntry),
    LongName(LongNameFragment),
}

/// 8.3 directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortEntry {
    /// Space padded base (8) and extension (3).
    pub name: [u8; FAT_SFN_LEN],
    pub attrs: Fat32Attributes,
    pub first_cluster: u32,
    pub size: u32,
}

impl ShortEntry {
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.attrs.is_dir()
    }

    #[inline]
    pub fn is_volume_label(&self) -> bool {
        self.attrs.is_volume_label()
    }

    /// `.` and `..` in subdirectories.
    #[inline]
    pub fn is_dot_entry(&self) -> bool {
        self.name[0] == b'.'
    }
}

/// One slot of a long file name, 13 UTF-16 code units split in three chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongNameFragment {
    pub ordinal: u8,
    pub name1: [u16; LFN_NAME1_UNITS],
    pub name2: [u16; LFN_NAME2_UNITS],
    pub name3: [u16; LFN_NAME3_UNITS],
    pub checksum: u8,
}

impl LongNameFragment {
    /// Position of this fragment in the name, starting at 1.
    #[inline]
    pub fn sequence(&self) -> u8 {
        self.ordinal & LFN_SEQUENCE_MASK
    }

    #[inline]
    pub fn is_last(&self) -> bool {
        self.ordinal & LFN_LAST_ENTRY != 0
    }

    #[inline]
    pub fn chunks(&self) -> [&[u16]; 3] {
        [&self.name1, &self.name2, &self.name3]
    }
}

/// Classifies a raw directory slot and decodes its fields.
///
/// The first byte decides end-of-directory (0x00) and free (0xE5) before the
/// attribute byte is looked at. An attribute of 0x0F marks a long-name slot.
pub fn decode_slot(bytes: &[u8; FAT_DIR_ENTRY_SIZE]) -> Slot {
    match bytes[0] {
        FAT_ENTRY_END_OF_DIR => return Slot::EndOfDirectory,
        FAT_ENTRY_DELETED => return Slot::Free,
        _ => {}
    }

    let attrs = Fat32Attributes::from_bits_retain(bytes[DIR_ATTR]);
    if attrs.is_lfn() {
        return Slot::Entry(Entry::LongName(LongNameFragment {
            ordinal: bytes[LDIR_ORD],
            name1: utf16_units(bytes, LDIR_NAME1),
            name2: utf16_units(bytes, LDIR_NAME2),
            name3: utf16_units(bytes, LDIR_NAME3),
            checksum: bytes[LDIR_CHECKSUM],
        }));
    }

    let mut name = [0u8; FAT_SFN_LEN];
    name.copy_from_slice(&bytes[..FAT_SFN_LEN]);
    let high = le_u16(bytes, DIR_CLUSTER_HIGH) as u32;
    let low = le_u16(bytes, DIR_CLUSTER_LOW) as u32;

    Slot::Entry(Entry::Short(ShortEntry {
        name,
        attrs,
        first_cluster: (high << 16) | low,
        size: le_u32(bytes, DIR_FILE_SIZE),
    }))
}

fn utf16_units<const N: usize>(bytes: &[u8], at: usize) -> [u16; N] {
    let mut units = [0u16; N];
    for (i, unit) in units.iter_mut().enumerate() {
        *unit = le_u16(bytes, at + 2 * i);
    }
    units
}
