// SPDX-License-Identifier: MIT

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

use crate::{CardTransport, FILLER, TransportError, TransportResult};

/// Changes the bus clock of an SPI peripheral; embedded-hal has no portable way.
pub type ClockSetter<SPI> = fn(&mut SPI, u32) -> TransportResult;

/// Transport over an embedded-hal SPI bus and a chip select pin.
///
/// The card is selected for every exchange and released for idle clocking.
pub struct HalTransport<SPI: SpiBus<u8>, CS: OutputPin> {
    spi: SPI,
    cs: CS,
    set_clock: Option<ClockSetter<SPI>>,
}

impl<SPI: SpiBus<u8>, CS: OutputPin> HalTransport<SPI, CS> {
    pub fn new(spi: SPI, cs: CS) -> Self {
        Self {
            spi,
            cs,
            set_clock: None,
        }
    }

    pub fn with_clock_setter(mut self, set_clock: ClockSetter<SPI>) -> Self {
        self.set_clock = Some(set_clock);
        self
    }

    #[inline]
    pub fn release(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }

    fn select(&mut self) -> TransportResult {
        self.cs
            .set_low()
            .map_err(|_| TransportError::Bus("chip select failed"))
    }

    fn deselect(&mut self) -> TransportResult {
        self.cs
            .set_high()
            .map_err(|_| TransportError::Bus("chip select failed"))
    }
}

impl<SPI: SpiBus<u8>, CS: OutputPin> CardTransport for HalTransport<SPI, CS> {
    fn exchange(&mut self, buf: &mut [u8]) -> TransportResult {
        self.select()?;
        self.spi
            .transfer_in_place(buf)
            .map_err(|_| TransportError::Bus("spi transfer failed"))
    }

    fn idle_clock(&mut self, n_bytes: usize) -> TransportResult {
        self.deselect()?;
        let filler = [FILLER; 16];
        let mut left = n_bytes;
        while left > 0 {
            let n = left.min(filler.len());
            self.spi
                .write(&filler[..n])
                .map_err(|_| TransportError::Bus("spi write failed"))?;
            left -= n;
        }
        self.spi
            .flush()
            .map_err(|_| TransportError::Bus("spi flush failed"))
    }

    fn reconfigure(&mut self, clock_hz: u32) -> TransportResult {
        match self.set_clock {
            Some(set_clock) => set_clock(&mut self.spi, clock_hz),
            None => Err(TransportError::Unsupported),
        }
    }
}
