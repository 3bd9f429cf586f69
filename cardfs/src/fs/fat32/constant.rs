// SPDX-License-Identifier: MIT

// === Disk Layout Parameters ===

/// LBAs from the partition table and the BPB count 512-byte sectors.
pub const FAT_SECTOR_SIZE: u64 = 512;
pub const FAT_BOOT_SECTOR_LEN: usize = 512;

// === Boot Sector (BPB) Offsets ===

pub const BPB_BYTES_PER_SECTOR: usize = 0x0B; // BPB_BytsPerSec, u16
pub const BPB_SECTORS_PER_CLUSTER: usize = 0x0D; // BPB_SecPerClus, u8
pub const BPB_RESERVED_SECTORS: usize = 0x0E; // BPB_RsvdSecCnt, u16
pub const BPB_NUM_FATS: usize = 0x10; // BPB_NumFATs, u8
pub const BPB_TOTAL_SECTORS_32: usize = 0x20; // BPB_TotSec32, u32
pub const BPB_SECTORS_PER_FAT: usize = 0x24; // BPB_FATSz32, u32
pub const BPB_ROOT_CLUSTER: usize = 0x2C; // BPB_RootClus, u32
pub const BPB_VOLUME_ID: usize = 0x43; // BS_VolID, u32
pub const BPB_VOLUME_LABEL: usize = 0x47; // BS_VolLab, 11 bytes
pub const BPB_FS_TYPE: usize = 0x52; // BS_FilSysType, 8 bytes
pub const BPB_SIGNATURE: usize = 0x1FE;

pub const FAT_SIGNATURE: u16 = 0xAA55;

// === FAT Region Parameters ===

pub const FAT_ENTRY_SIZE: u64 = 4;
/// Upper four bits of a FAT32 entry are reserved.
pub const FAT_ENTRY_MASK: u32 = 0x0FFF_FFFF;
pub const FAT_FREE: u32 = 0;
pub const FAT_BAD_CLUSTER: u32 = 0x0FFF_FFF7;
pub const FAT_EOC_MIN: u32 = 0x0FFF_FFF8;
pub const FAT_EOC: u32 = 0x0FFF_FFFF;
pub const FAT_FIRST_CLUSTER: u32 = 2;

// === Directory Slots ===

pub const FAT_DIR_ENTRY_SIZE: usize = 32;
pub const FAT_ENTRY_END_OF_DIR: u8 = 0x00;
pub const FAT_ENTRY_DELETED: u8 = 0xE5;
pub const FAT_SFN_LEN: usize = 11;

pub const DIR_ATTR: usize = 11;
pub const DIR_CLUSTER_HIGH: usize = 20;
pub const DIR_CLUSTER_LOW: usize = 26;
pub const DIR_FILE_SIZE: usize = 28;

// === Long Name Slots ===

pub const LDIR_ORD: usize = 0;
pub const LDIR_NAME1: usize = 1; // 5 units
pub const LDIR_CHECKSUM: usize = 13;
pub const LDIR_NAME2: usize = 14; // 6 units
pub const LDIR_NAME3: usize = 28; // 2 units

pub const LFN_NAME1_UNITS: usize = 5;
pub const LFN_NAME2_UNITS: usize = 6;
pub const LFN_NAME3_UNITS: usize = 2;
pub const LFN_UNITS_PER_ENTRY: usize = LFN_NAME1_UNITS + LFN_NAME2_UNITS + LFN_NAME3_UNITS;

pub const LFN_SEQUENCE_MASK: u8 = 0x1F;
pub const LFN_LAST_ENTRY: u8 = 0x40;

/// Terminator and padding code units inside a name chunk.
pub const LFN_TERMINATOR: u16 = 0x0000;
pub const LFN_PADDING: u16 = 0xFFFF;
