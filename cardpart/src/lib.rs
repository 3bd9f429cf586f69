// SPDX-License-Identifier: MIT
#![cfg_attr(not(feature = "std"), no_std)]

#[macro_use]
mod macros;

pub mod errors;
/// Master Boot Record (MBR) partition records.
pub mod mbr;
/// Common MBR partition type bytes.
pub mod types;

pub use mbr::{
    Mbr, PartitionRecord, get_partition_data, get_partition_lba, get_partition_sector_count,
    get_partition_total_sectors, get_partition_type, read_mbr,
};
pub use types::MbrPartitionKind;

pub const DEFAULT_SECTOR_SIZE: u64 = 512;
