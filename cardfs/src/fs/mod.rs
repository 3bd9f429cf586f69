// SPDX-License-Identifier: MIT

#[cfg(feature = "fat32")]
pub mod fat32;
