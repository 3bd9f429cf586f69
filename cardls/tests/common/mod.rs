// SPDX-License-Identifier: MIT
#![allow(dead_code)]

//! A tiny MBR + FAT32 image for driving the CLI.
//!
//! One sector per cluster, every directory fits in its first cluster.

pub const SECTOR: usize = 512;
pub const PART_LBA: u32 = 64;
pub const RESERVED: u16 = 4;
pub const NUM_FATS: u8 = 2;
pub const FAT_SECTORS: u32 = 1;
pub const TOTAL_SECTORS: u32 = 96;
pub const FAT_LBA: u32 = PART_LBA + RESERVED as u32;
pub const DATA_LBA: u32 = FAT_LBA + NUM_FATS as u32 * FAT_SECTORS;
pub const ROOT: u32 = 2;

const EOC: u32 = 0x0FFF_FFFF;
const ATTR_LABEL: u8 = 0x08;
const ATTR_DIR: u8 = 0x10;
const ATTR_ARCHIVE: u8 = 0x20;
const SLOTS_PER_CLUSTER: usize = SECTOR / 32;

pub struct FatImage {
    image: Vec<u8>,
    next_free: u32,
    /// (directory cluster, used slots)
    fill: Vec<(u32, usize)>,
}

impl FatImage {
    pub fn new(label: &[u8; 11]) -> Self {
        let mut img = Self {
            image: vec![0u8; (PART_LBA + TOTAL_SECTORS) as usize * SECTOR],
            next_free: ROOT,
            fill: Vec::new(),
        };

        let rec = 446;
        img.image[rec] = 0x80;
        img.image[rec + 4] = 0x0C;
        img.image[rec + 8..rec + 12].copy_from_slice(&PART_LBA.to_le_bytes());
        img.image[rec + 12..rec + 16].copy_from_slice(&TOTAL_SECTORS.to_le_bytes());
        img.image[510..512].copy_from_slice(&[0x55, 0xAA]);

        let at = PART_LBA as usize * SECTOR;
        let boot = &mut img.image[at..at + SECTOR];
        boot[0x0B..0x0D].copy_from_slice(&(SECTOR as u16).to_le_bytes());
        boot[0x0D] = 1;
        boot[0x0E..0x10].copy_from_slice(&RESERVED.to_le_bytes());
        boot[0x10] = NUM_FATS;
        boot[0x20..0x24].copy_from_slice(&TOTAL_SECTORS.to_le_bytes());
        boot[0x24..0x28].copy_from_slice(&FAT_SECTORS.to_le_bytes());
        boot[0x2C..0x30].copy_from_slice(&ROOT.to_le_bytes());
        boot[0x43..0x47].copy_from_slice(&0xCAFE_F00Du32.to_le_bytes());
        boot[0x47..0x52].copy_from_slice(label);
        boot[0x52..0x5A].copy_from_slice(b"FAT32   ");
        boot[510..512].copy_from_slice(&[0x55, 0xAA]);

        img.set_fat(0, 0x0FFF_FFF8);
        img.set_fat(1, EOC);
        let root = img.alloc(1);
        img.fill.push((root, 0));
        img.push_slot(root, entry(label, ATTR_LABEL, 0, 0));
        img
    }

    fn set_fat(&mut self, cluster: u32, value: u32) {
        for fat in 0..NUM_FATS as u32 {
            let at = (FAT_LBA + fat * FAT_SECTORS) as usize * SECTOR + cluster as usize * 4;
            self.image[at..at + 4].copy_from_slice(&value.to_le_bytes());
        }
    }

    fn offset(cluster: u32) -> usize {
        (DATA_LBA + cluster - ROOT) as usize * SECTOR
    }

    /// First cluster of a fresh contiguous chain of `n` clusters.
    fn alloc(&mut self, n: u32) -> u32 {
        let first = self.next_free;
        for c in first..first + n {
            self.set_fat(c, if c + 1 == first + n { EOC } else { c + 1 });
        }
        self.next_free += n;
        first
    }

    fn push_slot(&mut self, dir: u32, slot: [u8; 32]) {
        let Some(fill) = self.fill.iter_mut().find(|(c, _)| *c == dir) else {
            panic!("no directory at cluster {dir}");
        };
        assert!(fill.1 < SLOTS_PER_CLUSTER, "directory {dir} is full");
        let at = Self::offset(dir) + fill.1 * 32;
        fill.1 += 1;
        self.image[at..at + 32].copy_from_slice(&slot);
    }

    fn push_named(&mut self, dir: u32, long: &str, short: [u8; 32]) {
        let mut name = [0u8; 11];
        name.copy_from_slice(&short[..11]);
        for slot in long_name(long, &name) {
            self.push_slot(dir, slot);
        }
        self.push_slot(dir, short);
    }

    pub fn add_file(&mut self, dir: u32, short: &[u8; 11], long: &str, data: &[u8]) {
        let clusters = data.len().div_ceil(SECTOR) as u32;
        let first = if clusters == 0 { 0 } else { self.alloc(clusters) };
        if clusters > 0 {
            let at = Self::offset(first);
            self.image[at..at + data.len()].copy_from_slice(data);
        }
        self.push_named(dir, long, entry(short, ATTR_ARCHIVE, first, data.len() as u32));
    }

    pub fn add_dir(&mut self, parent: u32, short: &[u8; 11], long: &str) -> u32 {
        let cluster = self.alloc(1);
        self.fill.push((cluster, 0));
        self.push_slot(cluster, entry(b".          ", ATTR_DIR, cluster, 0));
        let up = if parent == ROOT { 0 } else { parent };
        self.push_slot(cluster, entry(b"..         ", ATTR_DIR, up, 0));
        self.push_named(parent, long, entry(short, ATTR_DIR, cluster, 0));
        cluster
    }

    pub fn build(self) -> Vec<u8> {
        self.image
    }
}

fn entry(name: &[u8; 11], attr: u8, cluster: u32, size: u32) -> [u8; 32] {
    let mut slot = [0u8; 32];
    slot[..11].copy_from_slice(name);
    slot[11] = attr;
    slot[20..22].copy_from_slice(&((cluster >> 16) as u16).to_le_bytes());
    slot[26..28].copy_from_slice(&(cluster as u16).to_le_bytes());
    slot[28..32].copy_from_slice(&size.to_le_bytes());
    slot
}

/// Long-name slots, highest ordinal first.
fn long_name(long: &str, short: &[u8; 11]) -> Vec<[u8; 32]> {
    const UNIT_OFFSETS: [usize; 13] = [1, 3, 5, 7, 9, 14, 16, 18, 20, 22, 24, 28, 30];
    let units: Vec<u16> = long.encode_utf16().collect();
    let count = units.len().div_ceil(13).max(1);
    let checksum = short.iter().fold(0u8, |sum, &b| sum.rotate_right(1).wrapping_add(b));

    (0..count)
        .rev()
        .map(|i| {
            let part = &units[i * 13..((i + 1) * 13).min(units.len())];
            let mut chunk = [0xFFFFu16; 13];
            chunk[..part.len()].copy_from_slice(part);
            if part.len() < 13 {
                chunk[part.len()] = 0;
            }
            let mut slot = [0u8; 32];
            slot[0] = (i + 1) as u8 | if i + 1 == count { 0x40 } else { 0 };
            slot[11] = 0x0F;
            slot[13] = checksum;
            for (unit, at) in chunk.iter().zip(UNIT_OFFSETS) {
                slot[at..at + 2].copy_from_slice(&unit.to_le_bytes());
            }
            slot
        })
        .collect()
}

pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}
