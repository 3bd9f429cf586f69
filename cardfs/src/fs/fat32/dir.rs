// SPDX-License-Identifier: MIT
#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::{string::String, vec::Vec};

use core::slice::ChunksExact;

use crate::fs::fat32::{attr::*, constant::*, types::*, utils::*};

/// A file or directory with its name resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Long name when fragments preceded the short entry, else the decoded 8.3 name.
    pub name: String,
    pub short_name: [u8; FAT_SFN_LEN],
    pub attrs: Fat32Attributes,
    pub first_cluster: u32,
    pub size: u32,
}

impl DirEntry {
    fn new(name: String, entry: &ShortEntry) -> Self {
        Self {
            name,
            short_name: entry.name,
            attrs: entry.attrs,
            first_cluster: entry.first_cluster,
            size: entry.size,
        }
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.attrs.is_dir()
    }

    #[inline]
    pub fn is_volume_label(&self) -> bool {
        self.attrs.is_volume_label()
    }

    #[inline]
    pub fn is_dot_entry(&self) -> bool {
        self.short_name[0] == b'.'
    }

    /// Matches either the resolved name or the 8.3 name in `BASE.EXT` form.
    pub fn matches(&self, target: &str) -> bool {
        name_matches(&self.name, target) || name_matches(&sfn_dotted(&self.short_name), target)
    }
}

/// Pairs long-name fragments with the short entry that follows them.
///
/// Feed slots in on-disk order. Free slots drop pending fragments, and
/// nothing is produced after the end-of-directory marker.
#[derive(Debug, Default)]
pub struct DirDecoder {
    fragments: Vec<LongNameFragment>,
    finished: bool,
}

impl DirDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn push_slot(&mut self, slot: Slot) -> Option<DirEntry> {
        if self.finished {
            return None;
        }
        match slot {
            Slot::EndOfDirectory => {
                self.finished = true;
                self.fragments.clear();
                None
            }
            Slot::Free => {
                self.fragments.clear();
                None
            }
            Slot::Entry(Entry::LongName(fragment)) => {
                if self.fragments.len() < MAX_LFN_CHARS.div_ceil(LFN_UNITS_PER_ENTRY) {
                    self.fragments.push(fragment);
                } else {
                    log::warn!("dropping long-name fragment {}", fragment.sequence());
                }
                None
            }
            Slot::Entry(Entry::Short(entry)) => {
                let name = if self.fragments.is_empty() {
                    decode_sfn(&entry.name)
                } else {
                    decode_lfn(&self.fragments)
                };
                self.fragments.clear();
                Some(DirEntry::new(name, &entry))
            }
        }
    }

    #[inline]
    pub fn push(&mut self, bytes: &[u8; FAT_DIR_ENTRY_SIZE]) -> Option<DirEntry> {
        self.push_slot(decode_slot(bytes))
    }

    /// Feeds every whole slot of `bytes`, appending produced entries to `out`.
    pub fn extend_from(&mut self, bytes: &[u8], out: &mut Vec<DirEntry>) {
        for slot in bytes.chunks_exact(FAT_DIR_ENTRY_SIZE) {
            if self.finished {
                break;
            }
            if let Ok(slot) = slot.try_into() {
                out.extend(self.push(slot));
            }
        }
    }
}

/// Lazy iterator over the short entries of a directory region.
#[derive(Debug)]
pub struct DirEntries<'a> {
    slots: ChunksExact<'a, u8>,
    decoder: DirDecoder,
}

impl Iterator for DirEntries<'_> {
    type Item = DirEntry;

    fn next(&mut self) -> Option<DirEntry> {
        while !self.decoder.is_finished() {
            let slot: &[u8; FAT_DIR_ENTRY_SIZE] = self.slots.next()?.try_into().ok()?;
            if let Some(entry) = self.decoder.push(slot) {
                return Some(entry);
            }
        }
        None
    }
}

/// Walks `bytes` in 32-byte slots and yields every short entry with its name.
///
/// Stops at the first end-of-directory slot. A trailing partial slot is ignored.
pub fn decode_directory(bytes: &[u8]) -> DirEntries<'_> {
    DirEntries {
        slots: bytes.chunks_exact(FAT_DIR_ENTRY_SIZE),
        decoder: DirDecoder::new(),
    }
}
