// SPDX-License-Identifier: MIT

use cardio::prelude::*;

use crate::errors::*;
use crate::types::MbrPartitionKind;

/// Boot code precedes the partition table.
pub const MBR_TABLE_OFFSET: usize = 446;
pub const MBR_RECORD_SIZE: usize = 16;
pub const MBR_RECORD_COUNT: u8 = 4;
pub const MBR_SIGNATURE_OFFSET: usize = 0x1FE;
pub const MBR_SIGNATURE: u16 = 0xAA55;
pub const MBR_LEN: usize = 512;

/// Record field offsets.
pub const RECORD_STATUS: usize = 0;
pub const RECORD_TYPE: usize = 4;
pub const RECORD_START_LBA: usize = 8;
pub const RECORD_TOTAL_SECTORS: usize = 12;

pub const BOOTABLE: u8 = 0x80;

#[inline]
fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// The 16-byte record slot of partition `n` (1..=4) in block 0.
pub fn get_partition_data(block0: &[u8], n: u8) -> PartResult<&[u8; MBR_RECORD_SIZE]> {
    if !(1..=MBR_RECORD_COUNT).contains(&n) {
        return Err(PartError::InvalidIndex(n));
    }
    let start = MBR_TABLE_OFFSET + MBR_RECORD_SIZE * (n as usize - 1);
    block0
        .get(start..start + MBR_RECORD_SIZE)
        .and_then(|s| s.try_into().ok())
        .ok_or(PartError::Invalid("MBR: block too short for partition table"))
}

/// Starting LBA, LE at +8.
#[inline]
pub fn get_partition_lba(record: &[u8; MBR_RECORD_SIZE]) -> u32 {
    le_u32(record, RECORD_START_LBA)
}

/// LE u32 at +4.
///
/// Offset 4 is also the type byte; this is the legacy reading of the same
/// field as a count. Prefer [`get_partition_total_sectors`] for sizes.
#[inline]
pub fn get_partition_sector_count(record: &[u8; MBR_RECORD_SIZE]) -> u32 {
    le_u32(record, RECORD_TYPE)
}

/// Type byte at +4.
#[inline]
pub fn get_partition_type(record: &[u8; MBR_RECORD_SIZE]) -> u8 {
    record[RECORD_TYPE]
}

/// Sector count, LE at +12.
#[inline]
pub fn get_partition_total_sectors(record: &[u8; MBR_RECORD_SIZE]) -> u32 {
    le_u32(record, RECORD_TOTAL_SECTORS)
}

/// One decoded partition record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionRecord {
    /// 1..=4
    pub index: u8,
    pub status: u8,
    pub part_type: u8,
    pub start_lba: u32,
    /// Legacy reading of offset 4, see [`get_partition_sector_count`].
    pub sector_count: u32,
    pub total_sectors: u32,
}

impl PartitionRecord {
    pub fn decode(block0: &[u8], n: u8) -> PartResult<Self> {
        let data = get_partition_data(block0, n)?;
        Ok(Self {
            index: n,
            status: data[RECORD_STATUS],
            part_type: get_partition_type(data),
            start_lba: get_partition_lba(data),
            sector_count: get_partition_sector_count(data),
            total_sectors: get_partition_total_sectors(data),
        })
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.part_type == 0
    }

    #[inline]
    pub fn is_bootable(&self) -> bool {
        self.status == BOOTABLE
    }

    #[inline]
    pub fn kind(&self) -> MbrPartitionKind {
        MbrPartitionKind::from_byte(self.part_type)
    }

    /// Byte offset of the partition start.
    #[inline]
    pub fn byte_offset(&self) -> u64 {
        self.start_lba as u64 * crate::DEFAULT_SECTOR_SIZE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mbr {
    pub records: [PartitionRecord; MBR_RECORD_COUNT as usize],
    pub signature: u16,
}

impl Mbr {
    /// Decodes the table and signature of a 512-byte block 0.
    pub fn decode(block0: &[u8]) -> PartResult<Self> {
        if block0.len() < MBR_LEN {
            return Err(PartError::Invalid("MBR: block too short"));
        }
        let records = [
            PartitionRecord::decode(block0, 1)?,
            PartitionRecord::decode(block0, 2)?,
            PartitionRecord::decode(block0, 3)?,
            PartitionRecord::decode(block0, 4)?,
        ];
        let signature =
            u16::from_le_bytes([block0[MBR_SIGNATURE_OFFSET], block0[MBR_SIGNATURE_OFFSET + 1]]);
        Ok(Self { records, signature })
    }

    #[inline]
    pub fn has_valid_signature(&self) -> bool {
        self.signature == MBR_SIGNATURE
    }

    /// Record `n` (1..=4).
    pub fn record(&self, n: u8) -> PartResult<&PartitionRecord> {
        if !(1..=MBR_RECORD_COUNT).contains(&n) {
            return Err(PartError::InvalidIndex(n));
        }
        Ok(&self.records[n as usize - 1])
    }

    #[inline]
    pub fn first_non_empty(&self) -> Option<&PartitionRecord> {
        self.records.iter().find(|r| !r.is_empty())
    }

    #[inline]
    pub fn first_fat32(&self) -> Option<&PartitionRecord> {
        self.records.iter().find(|r| r.kind().is_fat32())
    }
}

/// Reads and decodes the first 512 bytes of `source`.
///
/// A missing signature is only logged; the records are returned as found.
pub fn read_mbr<S: BlockSource + ?Sized>(source: &mut S) -> PartResult<Mbr> {
    let mut block0 = [0u8; MBR_LEN];
    source.read_bytes(&mut block0, 0)?;
    let mbr = Mbr::decode(&block0)?;
    if !mbr.has_valid_signature() {
        log::warn!("MBR signature missing (found {:#06X})", mbr.signature);
    }
    Ok(mbr)
}
