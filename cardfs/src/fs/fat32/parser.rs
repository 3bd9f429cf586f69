// SPDX-License-Identifier: MIT
#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::{vec, vec::Vec};

use cardio::prelude::*;

use crate::core::errors::*;
use crate::fs::fat32::{constant::*, dir::*, volume::*};

/// Walks a FAT chain one cluster at a time.
///
/// A chain stops at an end-of-chain marker. Free, bad or out-of-range links
/// are reported as invalid clusters. Cycles are caught by remembering the
/// cluster seen at steps 1, 2, 4, 8, ... and watching for it to come back.
#[derive(Debug, Clone)]
pub struct ClusterCursor {
    current: Option<u32>,
    seen: u32,
    mark: Option<u32>,
    next_mark: u32,
}

impl ClusterCursor {
    pub fn new(start: u32) -> Self {
        Self { current: Some(start), seen: 0, mark: None, next_mark: 1 }
    }

    pub fn next_with<S: BlockSource>(
        &mut self,
        volume: &mut Volume<S>,
    ) -> Option<FsCursorResult<u32>> {
        let cluster = self.current.take()?;
        let geometry = volume.geometry();
        if !geometry.contains_cluster(cluster) {
            return Some(Err(FsCursorError::InvalidCluster(cluster)));
        }
        if self.mark == Some(cluster) || self.seen >= geometry.cluster_count() {
            return Some(Err(FsCursorError::LoopDetected));
        }
        self.seen += 1;
        if self.seen == self.next_mark {
            self.mark = Some(cluster);
            self.next_mark = self.next_mark.saturating_mul(2);
        }

        match volume.read_fat_entry(cluster) {
            Ok(next) if next >= FAT_EOC_MIN => {}
            Ok(next) => self.current = Some(next),
            Err(e) => return Some(Err(e)),
        }
        Some(Ok(cluster))
    }
}

impl<S: BlockSource> Volume<S> {
    /// Next-cluster link of `cluster` in the first FAT, top four bits cleared.
    pub fn read_fat_entry(&mut self, cluster: u32) -> FsCursorResult<u32> {
        crate::ensure!(
            self.geometry().contains_cluster(cluster),
            FsCursorError::InvalidCluster(cluster)
        );
        let mut raw = [0u8; FAT_ENTRY_SIZE as usize];
        let address = self.geometry().fat_entry_address(cluster);
        self.source_mut().read_bytes(&mut raw, address)?;
        Ok(u32::from_le_bytes(raw) & FAT_ENTRY_MASK)
    }

    /// Every cluster of the chain starting at `start`.
    pub fn cluster_chain(&mut self, start: u32) -> FsCursorResult<Vec<u32>> {
        let mut chain = Vec::new();
        let mut cursor = ClusterCursor::new(start);
        while let Some(cluster) = cursor.next_with(self) {
            chain.push(cluster?);
        }
        Ok(chain)
    }

    /// Reads the start of `cluster` into `out` (at most one cluster long).
    pub fn read_cluster(&mut self, cluster: u32, out: &mut [u8]) -> FsCursorResult {
        crate::ensure!(
            out.len() <= self.geometry().bytes_per_cluster(),
            FsCursorError::Other("Buffer larger than a cluster")
        );
        let lba = self.cluster_to_lba(cluster)?;
        self.source_mut().read_bytes(out, lba_address(lba))?;
        Ok(())
    }

    /// Entries of the directory starting at `cluster`, up to its end marker.
    pub fn read_dir(&mut self, cluster: u32) -> FsResolverResult<Vec<DirEntry>> {
        let mut buf = vec![0u8; self.geometry().bytes_per_cluster()];
        let mut decoder = DirDecoder::new();
        let mut entries = Vec::new();

        let mut cursor = ClusterCursor::new(cluster);
        while let Some(next) = cursor.next_with(self) {
            let next = next?;
            log::trace!("directory cluster {next}");
            self.read_cluster(next, &mut buf)?;
            decoder.extend_from(&buf, &mut entries);
            if decoder.is_finished() {
                break;
            }
        }
        Ok(entries)
    }

    pub fn root_dir(&mut self) -> FsResolverResult<Vec<DirEntry>> {
        self.read_dir(self.root_cluster())
    }

    /// Contents of a file entry, `size` bytes taken from its cluster chain.
    pub fn read_file(&mut self, entry: &DirEntry) -> FsResolverResult<Vec<u8>> {
        crate::ensure!(!entry.is_dir(), FsResolverError::IsADirectory);
        let mut out = vec![0u8; entry.size as usize];
        if out.is_empty() {
            return Ok(out);
        }

        let cluster_bytes = self.geometry().bytes_per_cluster();
        let mut written = 0usize;
        let mut cursor = ClusterCursor::new(entry.first_cluster);
        while written < out.len() {
            let Some(cluster) = cursor.next_with(self) else {
                crate::bail!(FsResolverError::Invalid("Cluster chain shorter than file size"));
            };
            let take = cluster_bytes.min(out.len() - written);
            self.read_cluster(cluster?, &mut out[written..written + take])?;
            written += take;
        }
        Ok(out)
    }

    /// Looks up `name` (long or 8.3, ASCII case-insensitive) in a directory.
    pub fn find(&mut self, dir_cluster: u32, name: &str) -> FsResolverResult<DirEntry> {
        self.read_dir(dir_cluster)?
            .into_iter()
            .find(|e| !e.is_volume_label() && e.matches(name))
            .ok_or(FsResolverError::NotFound)
    }

    /// Resolves a `/`-separated path from the root; `None` is the root itself.
    pub fn lookup(&mut self, path: &str) -> FsResolverResult<Option<DirEntry>> {
        let mut current: Option<DirEntry> = None;
        for part in path.split('/').filter(|p| !p.is_empty()) {
            let dir = match &current {
                None => self.root_cluster(),
                Some(entry) => {
                    crate::ensure!(entry.is_dir(), FsResolverError::NotADirectory);
                    self.dir_cluster(entry)
                }
            };
            current = Some(self.find(dir, part)?);
        }
        Ok(current)
    }

    /// First cluster of the directory at `path`.
    pub fn resolve_dir(&mut self, path: &str) -> FsResolverResult<u32> {
        match self.lookup(path)? {
            None => Ok(self.root_cluster()),
            Some(entry) => {
                crate::ensure!(entry.is_dir(), FsResolverError::NotADirectory);
                Ok(self.dir_cluster(&entry))
            }
        }
    }

    pub fn read_dir_path(&mut self, path: &str) -> FsResolverResult<Vec<DirEntry>> {
        let cluster = self.resolve_dir(path)?;
        self.read_dir(cluster)
    }

    pub fn read_file_path(&mut self, path: &str) -> FsResolverResult<Vec<u8>> {
        let entry = self.lookup(path)?.ok_or(FsResolverError::IsADirectory)?;
        self.read_file(&entry)
    }

    /// `..` entries pointing at the root store cluster 0.
    #[inline]
    fn dir_cluster(&self, entry: &DirEntry) -> u32 {
        if entry.first_cluster == 0 {
            self.root_cluster()
        } else {
            entry.first_cluster
        }
    }
}
