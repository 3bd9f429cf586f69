// SPDX-License-Identifier: MIT
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[macro_use]
mod macros;

// Core modules
pub mod block;
pub mod card;
pub mod command;
pub mod errors;
pub mod response;
pub mod stats;
pub mod utils;

// Backend modules
#[cfg(feature = "mem")]
pub mod mem;

#[cfg(feature = "std")]
mod std;

#[cfg(feature = "hal")]
mod hal;

// Prelude re-exports (central entrypoint)
pub mod prelude {
    pub use super::CardTransport;
    pub use super::block::{BlockSource, BlockSourceExt};
    pub use super::card::*;
    pub use super::command::{Command, CommandExt};
    pub use super::errors::*;
    pub use super::response::*;
    pub use super::stats::*;

    #[cfg(feature = "mem")]
    pub use super::mem::{CardImage, CardProfile, MemCard};

    #[cfg(feature = "std")]
    pub use super::std::StdImage;

    #[cfg(feature = "hal")]
    pub use super::hal::{ClockSetter, HalTransport};
}

use errors::*;

/// Byte the host clocks out while it only wants to read, and the line level of an idle card.
pub const FILLER: u8 = 0xFF;

/// Byte-level link to a card.
///
/// Implementations may target an SPI peripheral, an emulator, a capture replay, etc.
pub trait CardTransport {
    /// Full duplex exchange: `buf` is sent and replaced with what was received.
    fn exchange(&mut self, buf: &mut [u8]) -> TransportResult;

    /// Clocks `n_bytes` of filler with the card deselected.
    fn idle_clock(&mut self, n_bytes: usize) -> TransportResult;

    /// Changes the bus clock. Not every transport can.
    fn reconfigure(&mut self, clock_hz: u32) -> TransportResult {
        let _ = clock_hz;
        Err(TransportError::Unsupported)
    }
}

impl<T: CardTransport + ?Sized> CardTransport for &mut T {
    #[inline]
    fn exchange(&mut self, buf: &mut [u8]) -> TransportResult {
        (**self).exchange(buf)
    }

    #[inline]
    fn idle_clock(&mut self, n_bytes: usize) -> TransportResult {
        (**self).idle_clock(n_bytes)
    }

    #[inline]
    fn reconfigure(&mut self, clock_hz: u32) -> TransportResult {
        (**self).reconfigure(clock_hz)
    }
}
