// SPDX-License-Identifier: MIT

// === Sub-modules ===
pub mod macros;
pub mod errors;

// === Error types ===
pub use errors::*;
