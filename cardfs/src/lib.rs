// SPDX-License-Identifier: MIT
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
#[macro_use]
extern crate alloc;

// Core Modules
pub mod core;
pub mod fs;

// Reusable error types
pub use core::errors::*;

// Filesystem APIs
#[cfg(feature = "fat32")]
/// FAT32 volume reader.
///
/// See [`fat32::Volume`], [`fat32::decode_slot`] and [`fat32::decode_directory`].
pub mod fat32 {
    pub use super::fs::fat32::prelude::*;
}
