// SPDX-License-Identifier: MIT

use cardio::prelude::*;
use cardpart::{PartitionRecord, read_mbr};

use crate::core::errors::*;
use crate::fs::fat32::{constant::*, types::*};

/// Region layout of a mounted FAT32 volume, in 512-byte LBAs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fat32Geometry {
    pub partition_lba: u32,
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub num_fats: u8,
    pub sectors_per_fat: u32,
    pub total_sectors: u32,
    pub root_cluster: u32,
    /// `partition_lba + reserved_sectors`
    pub fat_region_lba: u32,
    /// `fat_region_lba + num_fats * sectors_per_fat`
    pub data_region_lba: u32,
}

impl Fat32Geometry {
    pub fn new(partition_lba: u32, bpb: &Fat32Bpb) -> FsMountResult<Self> {
        crate::ensure!(
            bpb.sectors_per_cluster != 0,
            FsMountError::InvalidGeometry("Zero sectors per cluster")
        );
        crate::ensure!(bpb.num_fats != 0, FsMountError::InvalidGeometry("Zero FAT copies"));

        let fat_region_lba = partition_lba
            .checked_add(bpb.reserved_sectors as u32)
            .ok_or(FsMountError::InvalidGeometry("FAT region beyond 32-bit LBA"))?;
        let data_region_lba = (bpb.num_fats as u32)
            .checked_mul(bpb.sectors_per_fat)
            .and_then(|fats| fats.checked_add(fat_region_lba))
            .ok_or(FsMountError::InvalidGeometry("Data region beyond 32-bit LBA"))?;

        Ok(Self {
            partition_lba,
            sectors_per_cluster: bpb.sectors_per_cluster,
            reserved_sectors: bpb.reserved_sectors,
            num_fats: bpb.num_fats,
            sectors_per_fat: bpb.sectors_per_fat,
            total_sectors: bpb.total_sectors,
            root_cluster: bpb.root_cluster,
            fat_region_lba,
            data_region_lba,
        })
    }

    /// First LBA of `cluster`; clusters 0 and 1 do not exist.
    pub fn cluster_to_lba(&self, cluster: u32) -> FsCursorResult<u32> {
        if cluster < FAT_FIRST_CLUSTER {
            return Err(FsCursorError::InvalidCluster(cluster));
        }
        (cluster - FAT_FIRST_CLUSTER)
            .checked_mul(self.sectors_per_cluster as u32)
            .and_then(|offset| offset.checked_add(self.data_region_lba))
            .ok_or(FsCursorError::InvalidCluster(cluster))
    }

    #[inline]
    pub fn bytes_per_cluster(&self) -> usize {
        self.sectors_per_cluster as usize * FAT_SECTOR_SIZE as usize
    }

    /// Data clusters addressable by both the FAT and the volume size.
    pub fn cluster_count(&self) -> u32 {
        let by_fat = (self.sectors_per_fat as u64 * FAT_SECTOR_SIZE / FAT_ENTRY_SIZE)
            .saturating_sub(FAT_FIRST_CLUSTER as u64);
        let end = self.partition_lba as u64 + self.total_sectors as u64;
        let by_size = end.saturating_sub(self.data_region_lba as u64) / self.sectors_per_cluster as u64;
        let count = if self.total_sectors == 0 { by_fat } else { by_fat.min(by_size) };
        count.min((FAT_ENTRY_MASK - FAT_FIRST_CLUSTER) as u64) as u32
    }

    #[inline]
    pub fn contains_cluster(&self, cluster: u32) -> bool {
        (FAT_FIRST_CLUSTER..FAT_FIRST_CLUSTER + self.cluster_count()).contains(&cluster)
    }

    /// Byte address of the first-FAT entry for `cluster`.
    #[inline]
    pub fn fat_entry_address(&self, cluster: u32) -> u64 {
        lba_address(self.fat_region_lba) + cluster as u64 * FAT_ENTRY_SIZE
    }
}

#[inline]
pub fn lba_address(lba: u32) -> u64 {
    lba as u64 * FAT_SECTOR_SIZE
}

/// A mounted FAT32 partition over a block source.
#[derive(Debug)]
pub struct Volume<S: BlockSource> {
    source: S,
    partition: PartitionRecord,
    bpb: Fat32Bpb,
    geometry: Fat32Geometry,
}

impl<S: BlockSource> Volume<S> {
    /// Mounts partition `index` (1..=4) of the card's MBR.
    ///
    /// The boot sector signature is checked before any geometry is derived.
    pub fn mount(mut source: S, index: u8) -> FsMountResult<Self> {
        let mbr = read_mbr(&mut source)?;
        let partition = *mbr.record(index)?;
        crate::ensure!(!partition.is_empty(), FsMountError::EmptyPartition(index));
        if !partition.kind().is_fat32() {
            log::warn!("partition {index} has type {}, mounting as FAT32", partition.kind());
        }

        let mut sector = [0u8; FAT_BOOT_SECTOR_LEN];
        source.read_bytes(&mut sector, partition.byte_offset())?;
        let bpb = Fat32Bpb::decode(&sector)?;
        crate::ensure!(
            bpb.has_valid_signature(),
            FsMountError::BadSignature { found: bpb.signature }
        );
        if u64::from(bpb.bytes_per_sector) != FAT_SECTOR_SIZE {
            log::warn!(
                "boot sector reports {} bytes per sector, addressing in 512-byte sectors",
                bpb.bytes_per_sector
            );
        }

        let geometry = Fat32Geometry::new(partition.start_lba, &bpb)?;
        log::info!(
            "FAT32 at LBA {}: {} sectors/cluster, {} reserved, {} FATs of {} sectors, root cluster {}",
            geometry.partition_lba,
            geometry.sectors_per_cluster,
            geometry.reserved_sectors,
            geometry.num_fats,
            geometry.sectors_per_fat,
            geometry.root_cluster
        );
        log::debug!(
            "FAT region at LBA {}, data region at LBA {}",
            geometry.fat_region_lba,
            geometry.data_region_lba
        );

        Ok(Self { source, partition, bpb, geometry })
    }

    #[inline]
    pub fn partition(&self) -> &PartitionRecord {
        &self.partition
    }

    #[inline]
    pub fn bpb(&self) -> &Fat32Bpb {
        &self.bpb
    }

    #[inline]
    pub fn geometry(&self) -> &Fat32Geometry {
        &self.geometry
    }

    #[inline]
    pub fn root_cluster(&self) -> u32 {
        self.geometry.root_cluster
    }

    #[inline]
    pub fn cluster_to_lba(&self, cluster: u32) -> FsCursorResult<u32> {
        self.geometry.cluster_to_lba(cluster)
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}
