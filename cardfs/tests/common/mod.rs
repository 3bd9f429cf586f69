// SPDX-License-Identifier: MIT
#![allow(dead_code)]

use std::collections::HashMap;

use cardfs::fat32::*;

pub const SECTOR: usize = 512;
pub const PART_LBA: u32 = 64;
pub const RESERVED: u16 = 4;
pub const NUM_FATS: u8 = 2;
pub const FAT_SECTORS: u32 = 4;
pub const TOTAL_SECTORS: u32 = 212;
pub const FAT_LBA: u32 = PART_LBA + RESERVED as u32;
pub const DATA_LBA: u32 = FAT_LBA + NUM_FATS as u32 * FAT_SECTORS;
pub const ROOT: u32 = 2;
pub const EOC: u32 = 0x0FFF_FFFF;

const ATTR_DIR: u8 = 0x10;
const ATTR_ARCHIVE: u8 = 0x20;
const ATTR_LABEL: u8 = 0x08;

/// Builds a small MBR + FAT32 image, one sector per cluster.
pub struct ImageBuilder {
    image: Vec<u8>,
    next_free: u32,
    /// Directory first cluster to (cluster chain, used slots).
    dirs: HashMap<u32, (Vec<u32>, usize)>,
}

impl ImageBuilder {
    pub fn new(label: &[u8; 11]) -> Self {
        let total = (PART_LBA + TOTAL_SECTORS) as usize * SECTOR;
        let mut b = Self { image: vec![0u8; total], next_free: ROOT, dirs: HashMap::new() };

        // MBR, partition 1
        let rec = 446;
        b.image[rec] = 0x80;
        b.image[rec + 4] = 0x0C;
        b.image[rec + 8..rec + 12].copy_from_slice(&PART_LBA.to_le_bytes());
        b.image[rec + 12..rec + 16].copy_from_slice(&TOTAL_SECTORS.to_le_bytes());
        b.image[510] = 0x55;
        b.image[511] = 0xAA;

        // Boot sector
        let bs = PART_LBA as usize * SECTOR;
        let s = &mut b.image[bs..bs + SECTOR];
        s[0..3].copy_from_slice(&[0xEB, 0x58, 0x90]);
        s[3..11].copy_from_slice(b"MSWIN4.1");
        s[0x0B..0x0D].copy_from_slice(&(SECTOR as u16).to_le_bytes());
        s[0x0D] = 1;
        s[0x0E..0x10].copy_from_slice(&RESERVED.to_le_bytes());
        s[0x10] = NUM_FATS;
        s[0x15] = 0xF8;
        s[0x20..0x24].copy_from_slice(&TOTAL_SECTORS.to_le_bytes());
        s[0x24..0x28].copy_from_slice(&FAT_SECTORS.to_le_bytes());
        s[0x2C..0x30].copy_from_slice(&ROOT.to_le_bytes());
        s[0x42] = 0x29;
        s[0x43..0x47].copy_from_slice(&0x1234_5678u32.to_le_bytes());
        s[0x47..0x52].copy_from_slice(label);
        s[0x52..0x5A].copy_from_slice(b"FAT32   ");
        s[510] = 0x55;
        s[511] = 0xAA;

        b.set_fat(0, 0x0FFF_FFF8);
        b.set_fat(1, EOC);
        let root = b.alloc_chain(1, 1)[0];
        assert_eq!(root, ROOT);
        b.dirs.insert(ROOT, (vec![ROOT], 0));
        b.push_slot(ROOT, short_slot(label, ATTR_LABEL, 0, 0));
        b
    }

    pub fn set_fat(&mut self, cluster: u32, value: u32) {
        for fat in 0..NUM_FATS as u32 {
            let at = (FAT_LBA + fat * FAT_SECTORS) as usize * SECTOR + cluster as usize * 4;
            self.image[at..at + 4].copy_from_slice(&value.to_le_bytes());
        }
    }

    pub fn cluster_offset(cluster: u32) -> usize {
        (DATA_LBA + cluster - ROOT) as usize * SECTOR
    }

    /// Allocates `n` linked clusters, leaving `stride - 1` free clusters between them.
    pub fn alloc_chain(&mut self, n: usize, stride: u32) -> Vec<u32> {
        let chain: Vec<u32> = (0..n as u32).map(|i| self.next_free + i * stride).collect();
        self.next_free = chain.last().map_or(self.next_free, |c| c + 1);
        for pair in chain.windows(2) {
            self.set_fat(pair[0], pair[1]);
        }
        if let Some(&last) = chain.last() {
            self.set_fat(last, EOC);
        }
        chain
    }

    pub fn push_slot(&mut self, dir: u32, slot: [u8; 32]) {
        let per_cluster = SECTOR / 32;
        let (chain, used) = self.dirs.get(&dir).cloned().expect("unknown directory");
        let mut chain = chain;
        if used / per_cluster >= chain.len() {
            let next = self.alloc_chain(1, 1)[0];
            self.set_fat(*chain.last().unwrap(), next);
            chain.push(next);
        }
        let cluster = chain[used / per_cluster];
        let at = Self::cluster_offset(cluster) + (used % per_cluster) * 32;
        self.image[at..at + 32].copy_from_slice(&slot);
        self.dirs.insert(dir, (chain, used + 1));
    }

    fn push_entry(&mut self, dir: u32, long: Option<&str>, short: [u8; 32]) {
        if let Some(long) = long {
            let mut name = [0u8; 11];
            name.copy_from_slice(&short[..11]);
            for slot in long_slots(long, &name) {
                self.push_slot(dir, slot);
            }
        }
        self.push_slot(dir, short);
    }

    pub fn add_file(&mut self, dir: u32, short: &[u8; 11], long: Option<&str>, data: &[u8]) -> u32 {
        self.add_file_with_stride(dir, short, long, data, 1)
    }

    pub fn add_file_with_stride(
        &mut self,
        dir: u32,
        short: &[u8; 11],
        long: Option<&str>,
        data: &[u8],
        stride: u32,
    ) -> u32 {
        let chain = self.alloc_chain(data.len().div_ceil(SECTOR), stride);
        for (cluster, chunk) in chain.iter().zip(data.chunks(SECTOR)) {
            let at = Self::cluster_offset(*cluster);
            self.image[at..at + chunk.len()].copy_from_slice(chunk);
        }
        let first = chain.first().copied().unwrap_or(0);
        self.push_entry(dir, long, short_slot(short, ATTR_ARCHIVE, first, data.len() as u32));
        first
    }

    pub fn add_dir(&mut self, parent: u32, short: &[u8; 11], long: Option<&str>) -> u32 {
        let cluster = self.alloc_chain(1, 1)[0];
        self.dirs.insert(cluster, (vec![cluster], 0));
        self.push_slot(cluster, short_slot(b".          ", ATTR_DIR, cluster, 0));
        let up = if parent == ROOT { 0 } else { parent };
        self.push_slot(cluster, short_slot(b"..         ", ATTR_DIR, up, 0));
        self.push_entry(parent, long, short_slot(short, ATTR_DIR, cluster, 0));
        cluster
    }

    /// Marks a slot as deleted.
    pub fn push_deleted(&mut self, dir: u32, short: &[u8; 11]) {
        let mut slot = short_slot(short, ATTR_ARCHIVE, 0, 0);
        slot[0] = 0xE5;
        self.push_slot(dir, slot);
    }

    pub fn image_mut(&mut self) -> &mut [u8] {
        &mut self.image
    }

    pub fn build(self) -> Vec<u8> {
        self.image
    }
}

pub fn short_slot(name: &[u8; 11], attr: u8, cluster: u32, size: u32) -> [u8; 32] {
    let mut slot = [0u8; 32];
    slot[..11].copy_from_slice(name);
    slot[11] = attr;
    slot[20..22].copy_from_slice(&((cluster >> 16) as u16).to_le_bytes());
    slot[26..28].copy_from_slice(&(cluster as u16).to_le_bytes());
    slot[28..32].copy_from_slice(&size.to_le_bytes());
    slot
}

fn sfn_checksum(name: &[u8; 11]) -> u8 {
    name.iter().fold(0u8, |sum, &b| sum.rotate_right(1).wrapping_add(b))
}

/// Long-name slots in on-disk order (highest ordinal first).
pub fn long_slots(long: &str, short: &[u8; 11]) -> Vec<[u8; 32]> {
    let units: Vec<u16> = long.encode_utf16().collect();
    let count = units.len().div_ceil(13).max(1);
    let checksum = sfn_checksum(short);
    let offsets = [1, 3, 5, 7, 9, 14, 16, 18, 20, 22, 24, 28, 30];

    let mut slots: Vec<[u8; 32]> = (0..count)
        .map(|i| {
            let mut chunk = [0xFFFFu16; 13];
            let part = &units[i * 13..((i + 1) * 13).min(units.len())];
            chunk[..part.len()].copy_from_slice(part);
            if part.len() < 13 {
                chunk[part.len()] = 0;
            }
            let mut slot = [0u8; 32];
            slot[0] = (i + 1) as u8 | if i + 1 == count { 0x40 } else { 0 };
            slot[11] = 0x0F;
            slot[13] = checksum;
            for (unit, at) in chunk.iter().zip(offsets) {
                slot[at..at + 2].copy_from_slice(&unit.to_le_bytes());
            }
            slot
        })
        .collect();
    slots.reverse();
    slots
}

pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

pub fn session(image: Vec<u8>) -> CardSession<MemCard> {
    let card = MemCard::new(image, CardProfile::sdhc().with_busy_polls(1));
    CardSession::open(card, &BringUpConfig::default()).expect("bring-up")
}

pub fn mount(image: Vec<u8>) -> Volume<CardSession<MemCard>> {
    Volume::mount(session(image), 1).expect("mount")
}
