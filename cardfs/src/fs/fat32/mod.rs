// SPDX-License-Identifier: MIT

pub mod attr;
pub mod constant;
pub mod dir;
pub mod parser;
pub mod types;
pub mod utils;
pub mod volume;

// === Public Interface ===
pub mod prelude {
    pub use super::attr::Fat32Attributes;
    pub use super::dir::{DirDecoder, DirEntries, DirEntry, decode_directory};
    pub use super::parser::ClusterCursor;
    pub use super::types::*;
    pub use super::utils::{decode_lfn, decode_sfn, utf16_to_utf8};
    pub use super::volume::{Fat32Geometry, Volume, lba_address};
    pub use crate::core::errors::*;
    pub use cardio::prelude::*;
}
