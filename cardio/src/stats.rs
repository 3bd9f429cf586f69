// SPDX-License-Identifier: MIT

use crate::command::{COMMAND_LEN, COMMAND_PREFIX};
use crate::{CardTransport, TransportResult};

/// Simple counters, no_std friendly.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct TransportStats {
    pub exchanges: u64,
    pub bytes: u64,
    /// Filler bytes clocked with the card deselected.
    pub idle_bytes: u64,
    /// Exchanges shaped like a command frame.
    pub commands: u64,
    pub reconfigures: u64,
    pub max_exchange: u64,
}

impl TransportStats {
    #[inline] pub fn reset(&mut self) { *self = TransportStats::default(); }
}

/// Transparent instrumentation wrapper.
pub struct CountingTransport<'a, T: CardTransport + ?Sized> {
    inner: &'a mut T,
    pub stats: TransportStats,
}

impl<'a, T: CardTransport + ?Sized> CountingTransport<'a, T> {
    #[inline]
    pub fn new(inner: &'a mut T) -> Self {
        Self { inner, stats: TransportStats::default() }
    }

    #[inline] pub fn snapshot(&self) -> TransportStats { self.stats }
    #[inline] pub fn into_inner(self) -> &'a mut T { self.inner }
}

impl<'a, T: CardTransport + ?Sized> CardTransport for CountingTransport<'a, T> {
    #[inline]
    fn exchange(&mut self, buf: &mut [u8]) -> TransportResult {
        let len = buf.len() as u64;
        if buf.len() == COMMAND_LEN && buf[0] & 0xC0 == COMMAND_PREFIX {
            self.stats.commands += 1;
        }
        self.stats.exchanges += 1;
        self.stats.bytes += len;
        if self.stats.max_exchange < len { self.stats.max_exchange = len; }

        self.inner.exchange(buf)
    }

    #[inline]
    fn idle_clock(&mut self, n_bytes: usize) -> TransportResult {
        self.stats.idle_bytes += n_bytes as u64;
        self.inner.idle_clock(n_bytes)
    }

    #[inline]
    fn reconfigure(&mut self, clock_hz: u32) -> TransportResult {
        self.stats.reconfigures += 1;
        self.inner.reconfigure(clock_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::tests::ScriptedTransport;
    use crate::command::{Command, CommandExt};
    use crate::response::Response;

    #[test]
    fn counts_frames_polls_and_idle_clocks() {
        let mut inner = ScriptedTransport::new(&[0xFF; 6]);
        let mut counter = CountingTransport::new(&mut inner);

        counter.idle_clock(10).unwrap();
        counter.send_command(Command::app_cmd(0)).unwrap();
        let mut poll = [0xFF; 6];
        counter.exchange(&mut poll).unwrap();

        let stats = counter.snapshot();
        assert_eq!(stats.idle_bytes, 10);
        assert_eq!(stats.commands, 1);
        assert_eq!(stats.exchanges, 2);
        assert_eq!(stats.bytes, 12);
        assert_eq!(stats.max_exchange, 6);
    }

    #[test]
    fn reconfigure_is_counted_even_when_refused() {
        let mut inner = ScriptedTransport::new(&[]);
        let mut counter = CountingTransport::new(&mut inner);
        assert!(counter.reconfigure(1_000_000).is_err());
        assert_eq!(counter.stats.reconfigures, 1);
        counter.stats.reset();
        assert_eq!(counter.stats, TransportStats::default());
    }

    #[test]
    fn wrapper_is_transparent() {
        // Six bytes answer the frame itself, then one poll of filler.
        let mut inner = ScriptedTransport::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]);
        let mut counter = CountingTransport::new(&mut inner);
        let resp: Response<1> = counter.command(Command::go_idle_state(0), 5).unwrap();
        assert!(resp.is_idle());
        let inner = counter.into_inner();
        assert_eq!(&inner.sent[..6], &Command::go_idle_state(0).encode());
    }
}
