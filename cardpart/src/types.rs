// SPDX-License-Identifier: MIT

define_partition_types! {
    EMPTY => "Empty", 0x00,
    FAT12 => "FAT12", 0x01,
    FAT16_SMALL => "FAT16 (<32M)", 0x04,
    EXTENDED => "Extended (CHS)", 0x05,
    FAT16 => "FAT16", 0x06,
    NTFS => "NTFS/exFAT", 0x07,
    FAT32 => "FAT32 (CHS)", 0x0B,
    FAT32_LBA => "FAT32 (LBA)", 0x0C,
    FAT16_LBA => "FAT16 (LBA)", 0x0E,
    EXTENDED_LBA => "Extended (LBA)", 0x0F,
    LINUX => "Linux", 0x83,
    PROTECTIVE_GPT => "GPT protective", 0xEE,
}

impl MbrPartitionKind {
    /// Both FAT32 type bytes.
    #[inline]
    pub fn is_fat32(&self) -> bool {
        matches!(self, Self::FAT32 | Self::FAT32_LBA)
    }
}
