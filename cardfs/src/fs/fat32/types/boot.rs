// SPDX-License-Identifier: MIT

use crate::core::errors::*;
use crate::fs::fat32::{constant::*, utils::*};

/// FAT32 boot sector fields, decoded field by field from the first sector
/// of the partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fat32Bpb {
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub num_fats: u8,
    pub total_sectors: u32,
    pub sectors_per_fat: u32,
    pub root_cluster: u32,
    pub volume_id: u32,
    pub volume_label: [u8; 11],
    pub fs_type: [u8; 8],
    pub signature: u16,
}

impl Fat32Bpb {
    pub fn decode(sector: &[u8]) -> FsParsingResult<Self> {
        crate::ensure!(
            sector.len() >= FAT_BOOT_SECTOR_LEN,
            FsParsingError::Invalid("Boot sector too short")
        );

        let mut volume_label = [0u8; 11];
        volume_label.copy_from_slice(&sector[BPB_VOLUME_LABEL..BPB_VOLUME_LABEL + 11]);
        let mut fs_type = [0u8; 8];
        fs_type.copy_from_slice(&sector[BPB_FS_TYPE..BPB_FS_TYPE + 8]);

        Ok(Self {
            bytes_per_sector: le_u16(sector, BPB_BYTES_PER_SECTOR),
            sectors_per_cluster: sector[BPB_SECTORS_PER_CLUSTER],
            reserved_sectors: le_u16(sector, BPB_RESERVED_SECTORS),
            num_fats: sector[BPB_NUM_FATS],
            total_sectors: le_u32(sector, BPB_TOTAL_SECTORS_32),
            sectors_per_fat: le_u32(sector, BPB_SECTORS_PER_FAT),
            root_cluster: le_u32(sector, BPB_ROOT_CLUSTER),
            volume_id: le_u32(sector, BPB_VOLUME_ID),
            volume_label,
            fs_type,
            signature: le_u16(sector, BPB_SIGNATURE),
        })
    }

    #[inline]
    pub fn has_valid_signature(&self) -> bool {
        self.signature == FAT_SIGNATURE
    }

    /// Volume label with trailing spaces removed, `None` if not ASCII.
    pub fn label(&self) -> Option<&str> {
        trimmed_ascii(&self.volume_label)
    }

    pub fn fs_type(&self) -> Option<&str> {
        trimmed_ascii(&self.fs_type)
    }
}

fn trimmed_ascii(bytes: &[u8]) -> Option<&str> {
    if !bytes.is_ascii() {
        return None;
    }
    core::str::from_utf8(bytes).ok().map(|s| s.trim_end_matches(' '))
}
